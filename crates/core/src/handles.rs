//! In-process handle layer: a concurrent arena of model objects keyed by handle.

use dashmap::DashMap;
use std::sync::Arc;
use symdex_api::{Handle, HandleLayer, ModelObject};

#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: Arc<DashMap<Handle, ModelObject>>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.objects.contains_key(handle)
    }
}

impl HandleLayer for ObjectTable {
    fn put(&self, object: ModelObject) -> Handle {
        let handle = object.handle();
        self.objects.insert(handle, object);
        handle
    }

    fn resolve(&self, handle: &Handle) -> Option<ModelObject> {
        self.objects.get(handle).map(|entry| entry.value().clone())
    }

    fn remove(&self, handle: &Handle) {
        self.objects.remove(handle);
    }
}
