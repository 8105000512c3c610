use crate::error::RepositoryResult;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Declarations,
    Includes,
    Instantiations,
    References,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Declarations => "declarations",
            ContainerKind::Includes => "includes",
            ContainerKind::Instantiations => "instantiations",
            ContainerKind::References => "references",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "declarations" => Some(ContainerKind::Declarations),
            "includes" => Some(ContainerKind::Includes),
            "instantiations" => Some(ContainerKind::Instantiations),
            "references" => Some(ContainerKind::References),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured key of one persisted container.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerKey {
    pub unit: SmolStr,
    pub file_id: u32,
    pub kind: ContainerKind,
}

impl ContainerKey {
    pub fn new(unit: &str, file_id: u32, kind: ContainerKind) -> Self {
        Self {
            unit: SmolStr::new(unit),
            file_id,
            kind,
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.unit, self.kind, self.file_id)
    }
}

/// Keyed binary store partitioned into units (typically one per project).
pub trait Repository: Send + Sync {
    fn open_unit(&self, unit: &str) -> RepositoryResult<()>;

    fn close_unit(&self, unit: &str) -> RepositoryResult<()>;

    fn is_open(&self, unit: &str) -> bool;

    /// Read a stored payload; `Ok(None)` when nothing was stored under `key`.
    fn get(&self, key: &ContainerKey) -> RepositoryResult<Option<Vec<u8>>>;

    fn put(&self, key: &ContainerKey, bytes: Vec<u8>) -> RepositoryResult<()>;

    fn remove(&self, key: &ContainerKey) -> RepositoryResult<()>;

    /// Keys stored in an open unit.
    fn keys(&self, unit: &str) -> RepositoryResult<Vec<ContainerKey>>;
}
