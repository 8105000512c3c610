use dashmap::{DashMap, DashSet};
use smol_str::SmolStr;
use symdex_api::{ContainerKey, Repository, RepositoryError, RepositoryResult};

/// Repository kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    open: DashSet<SmolStr>,
    entries: DashMap<ContainerKey, Vec<u8>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self, unit: &str) -> RepositoryResult<()> {
        if self.open.contains(unit) {
            Ok(())
        } else {
            Err(RepositoryError::UnitClosed(unit.to_string()))
        }
    }
}

impl Repository for MemoryRepository {
    fn open_unit(&self, unit: &str) -> RepositoryResult<()> {
        self.open.insert(SmolStr::new(unit));
        Ok(())
    }

    fn close_unit(&self, unit: &str) -> RepositoryResult<()> {
        self.open.remove(unit);
        Ok(())
    }

    fn is_open(&self, unit: &str) -> bool {
        self.open.contains(unit)
    }

    fn get(&self, key: &ContainerKey) -> RepositoryResult<Option<Vec<u8>>> {
        self.ensure_open(&key.unit)?;
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn put(&self, key: &ContainerKey, bytes: Vec<u8>) -> RepositoryResult<()> {
        self.ensure_open(&key.unit)?;
        self.entries.insert(key.clone(), bytes);
        Ok(())
    }

    fn remove(&self, key: &ContainerKey) -> RepositoryResult<()> {
        self.ensure_open(&key.unit)?;
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self, unit: &str) -> RepositoryResult<Vec<ContainerKey>> {
        self.ensure_open(unit)?;
        let mut keys: Vec<ContainerKey> = self
            .entries
            .iter()
            .filter(|e| e.key().unit == unit)
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
