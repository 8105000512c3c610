use super::handle::{FileKey, Handle, HandleKey, HandleKind, name_hash};
use super::range::TextRange;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Namespace,
    NamespaceAlias,
    UsingDeclaration,
    UsingDirective,
    Class,
    Struct,
    Union,
    Enum,
    Enumerator,
    ClassForwardDeclaration,
    Typedef,
    TypeAlias,
    Function,
    FunctionDefinition,
    FunctionFriend,
    Variable,
    VariableDefinition,
    Field,
    Template,
    Asm,
}

impl DeclarationKind {
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            DeclarationKind::Function | DeclarationKind::FunctionDefinition
        )
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            DeclarationKind::Variable | DeclarationKind::VariableDefinition
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Namespace => "namespace",
            DeclarationKind::NamespaceAlias => "namespace_alias",
            DeclarationKind::UsingDeclaration => "using_declaration",
            DeclarationKind::UsingDirective => "using_directive",
            DeclarationKind::Class => "class",
            DeclarationKind::Struct => "struct",
            DeclarationKind::Union => "union",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Enumerator => "enumerator",
            DeclarationKind::ClassForwardDeclaration => "class_forward_declaration",
            DeclarationKind::Typedef => "typedef",
            DeclarationKind::TypeAlias => "type_alias",
            DeclarationKind::Function => "function",
            DeclarationKind::FunctionDefinition => "function_definition",
            DeclarationKind::FunctionFriend => "function_friend",
            DeclarationKind::Variable => "variable",
            DeclarationKind::VariableDefinition => "variable_definition",
            DeclarationKind::Field => "field",
            DeclarationKind::Template => "template",
            DeclarationKind::Asm => "asm",
        }
    }
}

/// A named program entity with a source position, as produced by the parser.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub file: FileKey,
    pub name: SmolStr,
    pub kind: DeclarationKind,
    pub range: TextRange,
    /// `static` storage class / internal linkage.
    pub is_static: bool,
    /// Qualified name of the enclosing namespace, `None` at global scope.
    pub namespace: Option<SmolStr>,
}

impl Declaration {
    pub fn new(file: FileKey, name: &str, kind: DeclarationKind, range: TextRange) -> Self {
        Self {
            file,
            name: SmolStr::new(name),
            kind,
            range,
            is_static: false,
            namespace: None,
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(SmolStr::new(namespace));
        self
    }

    pub fn name_hash(&self) -> i32 {
        name_hash(&self.name)
    }

    pub fn start_offset(&self) -> i32 {
        self.range.start
    }

    pub fn end_offset(&self) -> i32 {
        self.range.end
    }

    pub fn handle(&self) -> Handle {
        Handle::new(
            HandleKind::Declaration,
            HandleKey::new(self.file, self.range.start),
            self.name_hash(),
        )
    }

    /// File-scope static symbols are not reachable from any namespace-level index.
    fn is_file_static(&self) -> bool {
        self.is_static && self.namespace.is_none()
    }

    pub fn is_file_static_function(&self) -> bool {
        self.is_file_static() && self.kind.is_function()
    }

    pub fn is_file_static_variable(&self) -> bool {
        self.is_file_static() && self.kind.is_variable()
    }
}
