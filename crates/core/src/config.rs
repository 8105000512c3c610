use crate::error::Result;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::{Path, PathBuf};

pub const ENV_TRACK_REFERENCES: &str = "SYMDEX_TRACK_REFERENCES";
pub const ENV_TRACE: &str = "SYMDEX_TRACE";
pub const ENV_INDEX_DIR: &str = "SYMDEX_INDEX_DIR";

/// Repository unit holding the process-wide reference index.
pub const DEFAULT_REFERENCE_UNIT: &str = "__references__";

/// `~/.symdex`, falling back to the working directory when there is no home.
pub fn symdex_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".symdex")
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Record reference occurrences in the global reference index.
    /// Off by default: it changes memory and time trade-offs materially.
    pub track_references: bool,
    /// Dump container contents to the log whenever they are stored or loaded.
    pub trace: bool,
    pub index_dir: PathBuf,
    pub reference_unit: SmolStr,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            track_references: false,
            trace: false,
            index_dir: symdex_home().join("index"),
            reference_unit: SmolStr::new(DEFAULT_REFERENCE_UNIT),
        }
    }
}

impl IndexConfig {
    /// Defaults overridden by `SYMDEX_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(flag) = lookup(ENV_TRACK_REFERENCES).as_deref().and_then(parse_flag) {
            self.track_references = flag;
        }
        if let Some(flag) = lookup(ENV_TRACE).as_deref().and_then(parse_flag) {
            self.trace = flag;
        }
        if let Some(dir) = lookup(ENV_INDEX_DIR).filter(|d| !d.is_empty()) {
            self.index_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn with_reference_tracking(mut self, enabled: bool) -> Self {
        self.track_references = enabled;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
