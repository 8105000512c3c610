use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Hash of a declaration (or include/instantiation) name as used in ordering keys.
pub fn name_hash(name: &str) -> i32 {
    xxh3_64(name.as_bytes()) as u32 as i32
}

/// Identifies one source file inside one project.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKey {
    pub project_id: u32,
    pub file_id: u32,
}

impl FileKey {
    pub fn new(project_id: u32, file_id: u32) -> Self {
        Self {
            project_id,
            file_id,
        }
    }

    /// The handle standing in for the file itself.
    pub fn handle(&self) -> Handle {
        Handle::file(self.project_id, self.file_id)
    }
}

/// The resolvable (project, file, start-offset) triple every handle carries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleKey {
    pub project_id: u32,
    pub file_id: u32,
    pub start_offset: i32,
}

impl HandleKey {
    pub fn new(file: FileKey, start_offset: i32) -> Self {
        Self {
            project_id: file.project_id,
            file_id: file.file_id,
            start_offset,
        }
    }

    pub fn file(&self) -> FileKey {
        FileKey::new(self.project_id, self.file_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    File,
    Declaration,
    Include,
    Instantiation,
}

/// Opaque stand-in for a model object.
///
/// Handles are small, `Copy` and totally ordered: first by their
/// [`HandleKey`], then by kind and discriminator. Two handles are equal
/// exactly when they denote the same object identity, so re-putting an
/// object with the same identity yields an equal handle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    key: HandleKey,
    kind: HandleKind,
    discriminator: i32,
}

impl Handle {
    pub fn new(kind: HandleKind, key: HandleKey, discriminator: i32) -> Self {
        Self {
            key,
            kind,
            discriminator,
        }
    }

    pub fn file(project_id: u32, file_id: u32) -> Self {
        Self::new(
            HandleKind::File,
            HandleKey {
                project_id,
                file_id,
                start_offset: 0,
            },
            0,
        )
    }

    pub fn key(&self) -> HandleKey {
        self.key
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn discriminator(&self) -> i32 {
        self.discriminator
    }

    pub fn project_id(&self) -> u32 {
        self.key.project_id
    }

    pub fn file_id(&self) -> u32 {
        self.key.file_id
    }

    pub fn start_offset(&self) -> i32 {
        self.key.start_offset
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            HandleKind::File => "file",
            HandleKind::Declaration => "decl",
            HandleKind::Include => "incl",
            HandleKind::Instantiation => "inst",
        };
        write!(
            f,
            "{}:{}/{}@{}#{:08x}",
            tag,
            self.key.project_id,
            self.key.file_id,
            self.key.start_offset,
            self.discriminator as u32
        )
    }
}
