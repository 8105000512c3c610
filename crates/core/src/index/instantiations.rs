use crate::guarded::Guarded;
use crate::storage::Persistent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use symdex_api::{ContainerKey, ContainerKind, Handle, HandleLayer, Instantiation};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredInstantiations {
    pub instantiations: Vec<Handle>,
}

/// Owns the template instantiations a file caused. Nothing else disposes
/// them, so `clear` releases the whole generation at once.
pub struct FileInstantiations {
    key: ContainerKey,
    layer: Arc<dyn HandleLayer>,
    handles: Guarded<HashSet<Handle>>,
}

impl FileInstantiations {
    pub fn new(unit: &str, file_id: u32, layer: Arc<dyn HandleLayer>) -> Self {
        Self::with_handles(
            ContainerKey::new(unit, file_id, ContainerKind::Instantiations),
            layer,
            HashSet::new(),
        )
    }

    fn with_handles(key: ContainerKey, layer: Arc<dyn HandleLayer>, handles: HashSet<Handle>) -> Self {
        Self {
            key,
            layer,
            handles: Guarded::new(handles),
        }
    }

    pub fn empty_copy(&self) -> Self {
        Self::with_handles(self.key.clone(), self.layer.clone(), HashSet::new())
    }

    pub fn full_copy(&self) -> Self {
        Self::with_handles(self.key.clone(), self.layer.clone(), self.handles.snapshot())
    }

    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    pub fn add(&self, instantiation: Instantiation) -> Handle {
        let handle = self.layer.put(instantiation.into());
        self.handles.write(|h| h.insert(handle));
        handle
    }

    /// Snapshot of the current generation, sorted for stable output.
    pub fn instantiations(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.handles.read(|h| h.iter().copied().collect());
        handles.sort();
        handles
    }

    pub fn len(&self) -> usize {
        self.handles.read(|h| h.len())
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read(|h| h.is_empty())
    }

    /// Drop every instantiation and release it from the handle layer.
    pub fn clear(&self) {
        let released = self.handles.write(std::mem::take);
        tracing::debug!("{}: releasing {} instantiations", self.key, released.len());
        for handle in &released {
            self.layer.remove(handle);
        }
    }
}

impl Persistent for FileInstantiations {
    type Stored = StoredInstantiations;

    fn container_key(&self) -> ContainerKey {
        self.key.clone()
    }

    fn to_stored(&self) -> StoredInstantiations {
        StoredInstantiations {
            instantiations: self.instantiations(),
        }
    }

    fn from_stored(
        key: ContainerKey,
        stored: StoredInstantiations,
        layer: Arc<dyn HandleLayer>,
    ) -> Self {
        Self::with_handles(key, layer, stored.instantiations.into_iter().collect())
    }
}
