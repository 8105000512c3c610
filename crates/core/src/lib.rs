pub mod config;
pub mod error;
pub mod guarded;
pub mod handles;
pub mod index;
pub mod keys;
pub mod logging;
pub mod repository;
pub mod storage;

pub use config::IndexConfig;
pub use error::{Result, SymdexError};
pub use handles::ObjectTable;
pub use index::{
    FileDeclarations, FileIncludes, FileInstantiations, IndexState, ReferenceEntry,
    ReferenceIndex, ReferenceRegistry,
};
pub use keys::{NameKey, OffsetKey};
pub use repository::{FileRepository, MemoryRepository};
