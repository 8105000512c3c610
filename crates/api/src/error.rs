#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unit is not open: {0}")]
    UnitClosed(String),
    #[error("Corrupt entry: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
