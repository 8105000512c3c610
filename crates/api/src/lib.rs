pub mod error;
pub mod layer;
pub mod models;
pub mod repository;

// Re-export commonly used types
pub use error::{RepositoryError, RepositoryResult};
pub use layer::HandleLayer;
pub use models::*;
pub use repository::{ContainerKey, ContainerKind, Repository};
