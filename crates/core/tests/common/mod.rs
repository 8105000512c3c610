#![allow(dead_code)]

use std::sync::Arc;
use symdex_api::{Declaration, DeclarationKind, FileKey, Include, Instantiation, TextRange};
use symdex_core::ObjectTable;

pub const UNIT: &str = "proj";
pub const FILE: FileKey = FileKey {
    project_id: 1,
    file_id: 7,
};

pub fn table() -> Arc<ObjectTable> {
    Arc::new(ObjectTable::new())
}

pub fn decl(name: &str, kind: DeclarationKind, start: i32, end: i32) -> Declaration {
    Declaration::new(FILE, name, kind, TextRange::new(start, end))
}

pub fn function(name: &str, start: i32, end: i32) -> Declaration {
    decl(name, DeclarationKind::FunctionDefinition, start, end)
}

pub fn include(target: &str, start: i32) -> Include {
    Include::new(FILE, target, TextRange::new(start, start + target.len() as i32 + 10))
}

pub fn instantiation(template: &str, args: &str, start: i32) -> Instantiation {
    Instantiation::new(FILE, template, args, TextRange::new(start, start + 10))
}
