use super::declaration::Declaration;
use super::handle::{FileKey, Handle, HandleKey, HandleKind, name_hash};
use super::range::TextRange;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::Arc;

/// An `#include` directive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub file: FileKey,
    pub range: TextRange,
    /// The include target as written, e.g. `<vector>` or `"util.h"`.
    pub target: SmolStr,
    /// File the directive resolved to, if any.
    pub resolved: Option<FileKey>,
}

impl Include {
    pub fn new(file: FileKey, target: &str, range: TextRange) -> Self {
        Self {
            file,
            range,
            target: SmolStr::new(target),
            resolved: None,
        }
    }

    pub fn resolved_to(mut self, target: FileKey) -> Self {
        self.resolved = Some(target);
        self
    }

    pub fn is_system(&self) -> bool {
        self.target.starts_with('<')
    }

    pub fn handle(&self) -> Handle {
        Handle::new(
            HandleKind::Include,
            HandleKey::new(self.file, self.range.start),
            name_hash(&self.target),
        )
    }
}

/// A concrete realization of a template caused by one file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Instantiation {
    pub file: FileKey,
    pub range: TextRange,
    pub template: SmolStr,
    /// Rendered template argument list, e.g. `<int, char>`.
    pub arguments: SmolStr,
}

impl Instantiation {
    pub fn new(file: FileKey, template: &str, arguments: &str, range: TextRange) -> Self {
        Self {
            file,
            range,
            template: SmolStr::new(template),
            arguments: SmolStr::new(arguments),
        }
    }

    pub fn signature(&self) -> String {
        format!("{}{}", self.template, self.arguments)
    }

    pub fn handle(&self) -> Handle {
        Handle::new(
            HandleKind::Instantiation,
            HandleKey::new(self.file, self.range.start),
            name_hash(&self.signature()),
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub key: FileKey,
    pub path: SmolStr,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Declaration,
    Definition,
    Usage,
    Unknown,
}

/// One occurrence of a referenced symbol; the containing file travels alongside.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub range: TextRange,
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn new(start: i32, end: i32, kind: ReferenceKind) -> Self {
        Self {
            range: TextRange::new(start, end),
            kind,
        }
    }
}

/// Anything the handle layer can hold.
#[derive(Debug, Clone)]
pub enum ModelObject {
    File(Arc<FileInfo>),
    Declaration(Arc<Declaration>),
    Include(Arc<Include>),
    Instantiation(Arc<Instantiation>),
}

impl ModelObject {
    /// The identity handle of this object.
    pub fn handle(&self) -> Handle {
        match self {
            ModelObject::File(f) => f.key.handle(),
            ModelObject::Declaration(d) => d.handle(),
            ModelObject::Include(i) => i.handle(),
            ModelObject::Instantiation(i) => i.handle(),
        }
    }
}

impl From<Declaration> for ModelObject {
    fn from(value: Declaration) -> Self {
        ModelObject::Declaration(Arc::new(value))
    }
}

impl From<Include> for ModelObject {
    fn from(value: Include) -> Self {
        ModelObject::Include(Arc::new(value))
    }
}

impl From<Instantiation> for ModelObject {
    fn from(value: Instantiation) -> Self {
        ModelObject::Instantiation(Arc::new(value))
    }
}

impl From<FileInfo> for ModelObject {
    fn from(value: FileInfo) -> Self {
        ModelObject::File(Arc::new(value))
    }
}
