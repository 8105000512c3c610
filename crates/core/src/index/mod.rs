pub mod declarations;
pub mod includes;
pub mod instantiations;
pub mod references;

pub use declarations::{FileDeclarations, StoredDeclarations};
pub use includes::{FileIncludes, StoredIncludes};
pub use instantiations::{FileInstantiations, StoredInstantiations};
pub use references::{
    IndexState, ReferenceEntry, ReferenceIndex, ReferenceRegistry, StoredReferences,
};
