use symdex_api::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymdexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("MSGPACK encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("MSGPACK decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Format version mismatch (found {found}, expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SymdexError>;
