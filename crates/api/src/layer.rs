use crate::models::{Declaration, Handle, Include, Instantiation, ModelObject};
use std::sync::Arc;

/// Identity layer that maps handles to model objects.
///
/// Implementations must make each operation individually atomic. Index
/// containers call into the layer while holding their own read lock, so an
/// implementation must never call back into a container.
pub trait HandleLayer: Send + Sync {
    /// Register (or replace) an object and return its identity handle.
    fn put(&self, object: ModelObject) -> Handle;

    fn resolve(&self, handle: &Handle) -> Option<ModelObject>;

    /// Release the object behind `handle`. Unknown handles are ignored.
    fn remove(&self, handle: &Handle);

    fn resolve_declaration(&self, handle: &Handle) -> Option<Arc<Declaration>> {
        match self.resolve(handle)? {
            ModelObject::Declaration(d) => Some(d),
            _ => None,
        }
    }

    fn resolve_include(&self, handle: &Handle) -> Option<Arc<Include>> {
        match self.resolve(handle)? {
            ModelObject::Include(i) => Some(i),
            _ => None,
        }
    }

    fn resolve_instantiation(&self, handle: &Handle) -> Option<Arc<Instantiation>> {
        match self.resolve(handle)? {
            ModelObject::Instantiation(i) => Some(i),
            _ => None,
        }
    }
}
