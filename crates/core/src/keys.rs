use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use symdex_api::{Declaration, name_hash};

/// Primary key of a file's declaration index: start offset, then name hash.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OffsetKey {
    pub start_offset: i32,
    pub name_hash: i32,
}

impl OffsetKey {
    pub fn new(start_offset: i32, name: &str) -> Self {
        Self {
            start_offset,
            name_hash: name_hash(name),
        }
    }

    pub fn of(declaration: &Declaration) -> Self {
        Self {
            start_offset: declaration.start_offset(),
            name_hash: declaration.name_hash(),
        }
    }

    /// Smallest key at `start_offset`.
    pub fn lower_bound(start_offset: i32) -> Self {
        Self {
            start_offset,
            name_hash: i32::MIN,
        }
    }
}

/// Secondary key for prefix search: name (case-sensitive), then start offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameKey {
    pub name: SmolStr,
    pub start_offset: i32,
}

impl NameKey {
    pub fn new(name: &str, start_offset: i32) -> Self {
        Self {
            name: SmolStr::new(name),
            start_offset,
        }
    }

    /// Smallest key whose name is `prefix` or starts with it.
    pub fn prefix_start(prefix: &str) -> Self {
        Self::new(prefix, i32::MIN)
    }
}
