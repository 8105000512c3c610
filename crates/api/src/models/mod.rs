pub mod declaration;
pub mod handle;
pub mod objects;
pub mod range;

pub use declaration::{Declaration, DeclarationKind};
pub use handle::{FileKey, Handle, HandleKey, HandleKind, name_hash};
pub use objects::{FileInfo, Include, Instantiation, ModelObject, Reference, ReferenceKind};
pub use range::TextRange;
