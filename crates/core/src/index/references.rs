//! Process-wide reference index backing "find usages".
//!
//! Maps a referenced object's handle to every occurrence across the
//! workspace and to the set of files holding at least one of them. The whole
//! structure is persisted as a single repository entry.

use crate::config::IndexConfig;
use crate::error::Result;
use crate::guarded::Guarded;
use crate::storage::{decode_payload, encode_payload, trace_dump};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use symdex_api::{ContainerKey, ContainerKind, Handle, Reference, Repository, RepositoryError};

/// One occurrence: the containing file plus the reference payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceEntry {
    pub file: Handle,
    pub reference: Reference,
}

impl ReferenceEntry {
    fn order_key(&self) -> OccurrenceKey {
        OccurrenceKey {
            project_id: self.file.project_id(),
            file_id: self.file.file_id(),
            start_offset: self.reference.range.start,
            end_offset: self.reference.range.end,
        }
    }
}

/// Storage order of occurrences: containing file, then range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct OccurrenceKey {
    project_id: u32,
    file_id: u32,
    start_offset: i32,
    end_offset: i32,
}

#[derive(Debug, Clone, Default)]
struct ReferenceTable {
    occurrences: HashMap<Handle, BTreeMap<OccurrenceKey, ReferenceEntry>>,
    files: HashMap<Handle, BTreeSet<Handle>>,
    /// Bumped on every mutation; orders concurrent write-throughs.
    generation: u64,
}

impl ReferenceTable {
    fn to_stored(&self) -> StoredReferences {
        let mut references: Vec<(Handle, Vec<ReferenceEntry>)> = self
            .occurrences
            .iter()
            .map(|(h, entries)| (*h, entries.values().copied().collect()))
            .collect();
        references.sort_by_key(|(h, _)| *h);

        let mut files: Vec<(Handle, Vec<Handle>)> = self
            .files
            .iter()
            .map(|(h, set)| (*h, set.iter().copied().collect()))
            .collect();
        files.sort_by_key(|(h, _)| *h);

        StoredReferences { references, files }
    }

    fn from_stored(stored: StoredReferences) -> Self {
        let occurrences = stored
            .references
            .into_iter()
            .map(|(h, entries)| (h, entries.into_iter().map(|e| (e.order_key(), e)).collect()))
            .collect();
        let files = stored
            .files
            .into_iter()
            .map(|(h, set)| (h, set.into_iter().collect()))
            .collect();
        Self {
            occurrences,
            files,
            generation: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredReferences {
    pub references: Vec<(Handle, Vec<ReferenceEntry>)>,
    pub files: Vec<(Handle, Vec<Handle>)>,
}

pub struct ReferenceIndex {
    key: ContainerKey,
    repository: Arc<dyn Repository>,
    track_references: bool,
    trace: bool,
    table: Guarded<ReferenceTable>,
    /// Generation of the last snapshot written to the repository.
    persisted: Mutex<u64>,
}

impl ReferenceIndex {
    pub fn container_key(config: &IndexConfig) -> ContainerKey {
        ContainerKey::new(&config.reference_unit, 0, ContainerKind::References)
    }

    fn with_table(repository: Arc<dyn Repository>, config: &IndexConfig, table: ReferenceTable) -> Self {
        Self {
            key: Self::container_key(config),
            repository,
            track_references: config.track_references,
            trace: config.trace,
            table: Guarded::new(table),
            persisted: Mutex::new(0),
        }
    }

    pub fn empty(repository: Arc<dyn Repository>, config: &IndexConfig) -> Self {
        Self::with_table(repository, config, ReferenceTable::default())
    }

    /// Read the persisted index, falling back to an empty one when there is
    /// nothing to read or the entry cannot be decoded. A closed unit is an
    /// error: an empty index written through later would replace what is stored.
    pub fn load(repository: Arc<dyn Repository>, config: &IndexConfig) -> Result<Self> {
        if !config.track_references {
            return Ok(Self::empty(repository, config));
        }
        let key = Self::container_key(config);
        let table = match repository.get(&key) {
            Ok(Some(bytes)) => match decode_payload::<StoredReferences>(&bytes, &key) {
                Ok(stored) => {
                    if config.trace {
                        trace_dump(&key, &stored);
                    }
                    tracing::info!("Loaded {} referenced symbols from {}", stored.references.len(), key);
                    ReferenceTable::from_stored(stored)
                }
                Err(e) => {
                    tracing::warn!("Failed to decode {}: {}. Will rebuild.", key, e);
                    ReferenceTable::default()
                }
            },
            Ok(None) => ReferenceTable::default(),
            Err(e @ RepositoryError::UnitClosed(_)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}. Will rebuild.", key, e);
                ReferenceTable::default()
            }
        };
        Ok(Self::with_table(repository, config, table))
    }

    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    pub fn tracks_references(&self) -> bool {
        self.track_references
    }

    /// Record that `file` references `referenced` at `reference`.
    ///
    /// With reference tracking on, the whole index is written through to the
    /// repository before returning; a failed write is reported while the
    /// in-memory insertion stands. With tracking off only the file-set is kept.
    pub fn add_reference(&self, referenced: Handle, file: Handle, reference: Reference) -> Result<()> {
        let entry = ReferenceEntry { file, reference };
        let snapshot = self.table.write(|t| {
            t.files.entry(referenced).or_default().insert(file);
            t.generation += 1;
            if !self.track_references {
                return None;
            }
            t.occurrences
                .entry(referenced)
                .or_default()
                .insert(entry.order_key(), entry);
            Some((t.generation, encode_payload(&self.key, &t.to_stored())))
        });

        match snapshot {
            Some((generation, bytes)) => self.persist(generation, bytes?),
            None => Ok(()),
        }
    }

    /// Occurrences of `referenced`, ordered by containing file then range.
    pub fn references_for(&self, referenced: &Handle) -> Vec<ReferenceEntry> {
        self.table.read(|t| {
            t.occurrences
                .get(referenced)
                .map(|entries| entries.values().copied().collect())
                .unwrap_or_default()
        })
    }

    pub fn files_referencing(&self, referenced: &Handle) -> Vec<Handle> {
        self.table.read(|t| {
            t.files
                .get(referenced)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        })
    }

    /// Every handle with at least one recorded file, in handle order.
    pub fn referenced_handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.table.read(|t| t.files.keys().copied().collect());
        handles.sort();
        handles
    }

    pub fn len(&self) -> usize {
        self.table.read(|t| t.files.len())
    }

    pub fn is_empty(&self) -> bool {
        self.table.read(|t| t.files.is_empty())
    }

    /// Drop everything (index rebuild) and persist the empty state.
    pub fn clear(&self) -> Result<()> {
        let snapshot = self.table.write(|t| {
            t.occurrences.clear();
            t.files.clear();
            t.generation += 1;
            (t.generation, encode_payload(&self.key, &t.to_stored()))
        });
        tracing::info!("Cleared reference index {}", self.key);
        if self.trace {
            trace_dump(&self.key, &StoredReferences::default());
        }
        if !self.track_references {
            return Ok(());
        }
        let (generation, bytes) = snapshot;
        self.persist(generation, bytes?)
    }

    /// Human-readable dump of the whole index.
    pub fn dump(&self, out: &mut dyn Write) -> Result<()> {
        let stored = self.table.read(ReferenceTable::to_stored);
        serde_json::to_writer_pretty(&mut *out, &stored)?;
        writeln!(out)?;
        Ok(())
    }

    pub fn to_stored(&self) -> StoredReferences {
        self.table.read(ReferenceTable::to_stored)
    }

    /// Called without the table lock. Only a newer generation may
    /// overwrite what is in the repository.
    fn persist(&self, generation: u64, bytes: Vec<u8>) -> Result<()> {
        let mut persisted = self.persisted.lock().unwrap_or_else(PoisonError::into_inner);
        if *persisted >= generation {
            return Ok(());
        }
        self.repository.put(&self.key, bytes)?;
        *persisted = generation;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    Ready,
}

/// Owner of the process-wide [`ReferenceIndex`].
///
/// Construct one per process and share it. The index itself is read from
/// the repository on first access after [`startup`](Self::startup), exactly
/// once. Access before startup fails and leaves the registry uninitialized.
pub struct ReferenceRegistry {
    repository: Arc<dyn Repository>,
    config: IndexConfig,
    index: OnceCell<Arc<ReferenceIndex>>,
}

impl ReferenceRegistry {
    pub fn new(repository: Arc<dyn Repository>, config: IndexConfig) -> Self {
        Self {
            repository,
            config,
            index: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Open the backing repository unit. No-op with reference tracking off.
    pub fn startup(&self) -> Result<()> {
        if !self.config.track_references {
            return Ok(());
        }
        self.repository.open_unit(&self.config.reference_unit)?;
        tracing::info!("Reference index unit {} opened", self.config.reference_unit);
        Ok(())
    }

    /// Close the backing repository unit. No-op with reference tracking off.
    pub fn shutdown(&self) -> Result<()> {
        if !self.config.track_references {
            return Ok(());
        }
        self.repository.close_unit(&self.config.reference_unit)?;
        tracing::info!("Reference index unit {} closed", self.config.reference_unit);
        Ok(())
    }

    pub fn state(&self) -> IndexState {
        if self.index.get().is_some() {
            IndexState::Ready
        } else {
            IndexState::Uninitialized
        }
    }

    pub fn index(&self) -> Result<Arc<ReferenceIndex>> {
        self.index
            .get_or_try_init(|| ReferenceIndex::load(self.repository.clone(), &self.config).map(Arc::new))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SymdexError;
    use crate::repository::MemoryRepository;
    use symdex_api::{FileKey, HandleKey, HandleKind, ReferenceKind};

    fn symbol(start: i32) -> Handle {
        Handle::new(HandleKind::Declaration, HandleKey::new(FileKey::new(1, 1), start), 42)
    }

    fn tracking() -> IndexConfig {
        IndexConfig::default().with_reference_tracking(true)
    }

    #[test]
    fn test_occurrences_sorted_by_file_then_range() {
        let repo = Arc::new(MemoryRepository::new());
        let registry = ReferenceRegistry::new(repo, tracking());
        registry.startup().unwrap();
        let index = registry.index().unwrap();

        let target = symbol(0);
        let f2 = Handle::file(1, 2);
        let f1 = Handle::file(1, 1);
        index.add_reference(target, f2, Reference::new(5, 8, ReferenceKind::Usage)).unwrap();
        index.add_reference(target, f1, Reference::new(30, 33, ReferenceKind::Usage)).unwrap();
        index.add_reference(target, f1, Reference::new(10, 13, ReferenceKind::Definition)).unwrap();

        let order: Vec<(u32, i32)> = index
            .references_for(&target)
            .iter()
            .map(|e| (e.file.file_id(), e.reference.range.start))
            .collect();
        assert_eq!(order, vec![(1, 10), (1, 30), (2, 5)]);
        assert_eq!(index.files_referencing(&target), vec![f1, f2]);
    }

    #[test]
    fn test_same_range_collapses() {
        let repo = Arc::new(MemoryRepository::new());
        let registry = ReferenceRegistry::new(repo, tracking());
        registry.startup().unwrap();
        let index = registry.index().unwrap();
        let file = Handle::file(1, 1);

        index.add_reference(symbol(0), file, Reference::new(1, 2, ReferenceKind::Usage)).unwrap();
        index.add_reference(symbol(0), file, Reference::new(1, 2, ReferenceKind::Declaration)).unwrap();
        let refs = index.references_for(&symbol(0));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].reference.kind, ReferenceKind::Declaration);
    }

    #[test]
    fn test_degraded_mode_tracks_files_only() {
        let repo = Arc::new(MemoryRepository::new());
        let registry = ReferenceRegistry::new(repo.clone(), IndexConfig::default());
        registry.startup().unwrap();
        assert!(!repo.is_open(DEFAULT_UNIT));

        let index = registry.index().unwrap();
        index
            .add_reference(symbol(0), Handle::file(1, 3), Reference::new(1, 2, ReferenceKind::Usage))
            .unwrap();
        assert!(index.references_for(&symbol(0)).is_empty());
        assert_eq!(index.files_referencing(&symbol(0)), vec![Handle::file(1, 3)]);
        registry.shutdown().unwrap();
    }

    const DEFAULT_UNIT: &str = crate::config::DEFAULT_REFERENCE_UNIT;

    #[test]
    fn test_write_after_shutdown_is_reported() {
        let repo = Arc::new(MemoryRepository::new());
        let registry = ReferenceRegistry::new(repo, tracking());
        registry.startup().unwrap();
        let index = registry.index().unwrap();
        registry.shutdown().unwrap();
        let result = index.add_reference(symbol(0), Handle::file(1, 1), Reference::new(0, 1, ReferenceKind::Usage));
        assert!(result.is_err());
        assert_eq!(index.references_for(&symbol(0)).len(), 1);
    }

    #[test]
    fn test_index_before_startup_keeps_stored_references() {
        let repo = Arc::new(MemoryRepository::new());
        let file = Handle::file(1, 1);
        {
            let registry = ReferenceRegistry::new(repo.clone(), tracking());
            registry.startup().unwrap();
            let index = registry.index().unwrap();
            for i in 0..5 {
                index.add_reference(symbol(0), file, Reference::new(i * 10, i * 10 + 3, ReferenceKind::Usage)).unwrap();
            }
            registry.shutdown().unwrap();
        }

        let registry = ReferenceRegistry::new(repo.clone(), tracking());
        assert!(matches!(
            registry.index(),
            Err(SymdexError::Repository(RepositoryError::UnitClosed(_)))
        ));
        assert_eq!(registry.state(), IndexState::Uninitialized);

        registry.startup().unwrap();
        let index = registry.index().unwrap();
        index.add_reference(symbol(0), file, Reference::new(100, 103, ReferenceKind::Usage)).unwrap();
        registry.shutdown().unwrap();

        let restarted = ReferenceRegistry::new(repo, tracking());
        restarted.startup().unwrap();
        assert_eq!(restarted.index().unwrap().references_for(&symbol(0)).len(), 6);
    }

    #[test]
    fn test_lazy_state() {
        let repo = Arc::new(MemoryRepository::new());
        let registry = ReferenceRegistry::new(repo, tracking());
        registry.startup().unwrap();
        assert_eq!(registry.state(), IndexState::Uninitialized);
        let a = registry.index().unwrap();
        assert_eq!(registry.state(), IndexState::Ready);
        let b = registry.index().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_dump_is_json() {
        let repo = Arc::new(MemoryRepository::new());
        let registry = ReferenceRegistry::new(repo, tracking());
        registry.startup().unwrap();
        let index = registry.index().unwrap();
        index.add_reference(symbol(0), Handle::file(1, 1), Reference::new(0, 1, ReferenceKind::Usage)).unwrap();
        let mut out = Vec::new();
        index.dump(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["references"].as_array().unwrap().len(), 1);
    }
}
