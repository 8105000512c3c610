use crate::guarded::Guarded;
use crate::storage::Persistent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use symdex_api::{ContainerKey, ContainerKind, Handle, HandleLayer, Include};

/// All includes in handle order; `broken` is always a subset of `all`.
#[derive(Debug, Clone, Default)]
struct IncludeSets {
    all: BTreeSet<Handle>,
    broken: BTreeSet<Handle>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredIncludes {
    pub includes: Vec<Handle>,
    pub broken: Vec<Handle>,
}

/// Per-file set of include directives, tracking which are unresolved.
pub struct FileIncludes {
    key: ContainerKey,
    layer: Arc<dyn HandleLayer>,
    sets: Guarded<IncludeSets>,
}

impl FileIncludes {
    pub fn new(unit: &str, file_id: u32, layer: Arc<dyn HandleLayer>) -> Self {
        Self::with_sets(
            ContainerKey::new(unit, file_id, ContainerKind::Includes),
            layer,
            IncludeSets::default(),
        )
    }

    fn with_sets(key: ContainerKey, layer: Arc<dyn HandleLayer>, sets: IncludeSets) -> Self {
        Self {
            key,
            layer,
            sets: Guarded::new(sets),
        }
    }

    pub fn empty_copy(&self) -> Self {
        Self::with_sets(self.key.clone(), self.layer.clone(), IncludeSets::default())
    }

    pub fn full_copy(&self) -> Self {
        Self::with_sets(self.key.clone(), self.layer.clone(), self.sets.snapshot())
    }

    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    /// Record an include. A resolved include leaves the broken subset even
    /// if it was broken before. Returns whether any broken include remains.
    pub fn add_include(&self, include: Include, broken: bool) -> bool {
        let handle = self.layer.put(include.into());
        self.sets.write(|s| {
            s.all.insert(handle);
            if broken {
                s.broken.insert(handle);
            } else {
                s.broken.remove(&handle);
            }
            !s.broken.is_empty()
        })
    }

    /// Includes in their natural (project, file, offset) order.
    pub fn includes(&self) -> Vec<Handle> {
        self.sets.read(|s| s.all.iter().copied().collect())
    }

    pub fn broken_includes(&self) -> Vec<Handle> {
        self.sets.read(|s| s.broken.iter().copied().collect())
    }

    pub fn has_broken(&self) -> bool {
        self.sets.read(|s| !s.broken.is_empty())
    }

    pub fn len(&self) -> usize {
        self.sets.read(|s| s.all.len())
    }

    pub fn is_empty(&self) -> bool {
        self.sets.read(|s| s.all.is_empty())
    }

    /// Union `other` into this index. An include this index already holds
    /// is never marked broken by the merge; one it does not yet hold keeps
    /// its broken state from `other`.
    pub fn append_from(&self, other: &FileIncludes) {
        // Snapshot first so two indices appending from each other cannot deadlock.
        let theirs = other.sets.snapshot();
        self.sets.write(|s| {
            for handle in &theirs.broken {
                if !s.all.contains(handle) {
                    s.broken.insert(*handle);
                }
            }
            s.all.extend(theirs.all);
        });
    }

    /// Includes whose resolved directive satisfies `filter`, in handle order.
    pub fn includes_matching(&self, filter: impl Fn(&Include) -> bool) -> Vec<Handle> {
        self.sets.read(|s| {
            s.all
                .iter()
                .filter(|h| {
                    self.layer
                        .resolve_include(h)
                        .is_some_and(|i| filter(i.as_ref()))
                })
                .copied()
                .collect()
        })
    }

    /// Empty both sets and release every include (prelude to a reparse).
    pub fn clean(&self) {
        let released = self.sets.write(std::mem::take).all;
        tracing::debug!("{}: releasing {} includes", self.key, released.len());
        for handle in &released {
            self.layer.remove(handle);
        }
    }
}

impl Persistent for FileIncludes {
    type Stored = StoredIncludes;

    fn container_key(&self) -> ContainerKey {
        self.key.clone()
    }

    fn to_stored(&self) -> StoredIncludes {
        self.sets.read(|s| StoredIncludes {
            includes: s.all.iter().copied().collect(),
            broken: s.broken.iter().copied().collect(),
        })
    }

    fn from_stored(key: ContainerKey, stored: StoredIncludes, layer: Arc<dyn HandleLayer>) -> Self {
        let all: BTreeSet<Handle> = stored.includes.into_iter().collect();
        let broken = stored
            .broken
            .into_iter()
            .filter(|h| {
                let known = all.contains(h);
                if !known {
                    tracing::warn!("{}: dropping broken include {} missing from the full set", key, h);
                }
                known
            })
            .collect();
        Self::with_sets(key, layer, IncludeSets { all, broken })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::ObjectTable;
    use symdex_api::{FileKey, TextRange};

    const FILE: FileKey = FileKey {
        project_id: 1,
        file_id: 4,
    };

    fn include(target: &str, start: i32) -> Include {
        Include::new(FILE, target, TextRange::new(start, start + 20))
    }

    fn new_index(table: &Arc<ObjectTable>, file_id: u32) -> FileIncludes {
        FileIncludes::new("proj", file_id, table.clone())
    }

    #[test]
    fn test_broken_then_resolved() {
        let table = Arc::new(ObjectTable::new());
        let index = new_index(&table, FILE.file_id);

        assert!(index.add_include(include("\"missing.h\"", 0), true));
        assert!(index.add_include(include("<vector>", 30), false));
        assert_eq!(index.broken_includes(), vec![include("\"missing.h\"", 0).handle()]);

        let fixed = include("\"missing.h\"", 0).resolved_to(FileKey::new(1, 9));
        assert!(!index.add_include(fixed, false));
        assert!(index.broken_includes().is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_order_follows_offsets_not_insertion() {
        let table = Arc::new(ObjectTable::new());
        let index = new_index(&table, FILE.file_id);
        index.add_include(include("<b>", 50), false);
        index.add_include(include("<a>", 10), false);
        let offsets: Vec<i32> = index.includes().iter().map(|h| h.start_offset()).collect();
        assert_eq!(offsets, vec![10, 50]);
    }

    #[test]
    fn test_append_from_merge_rule() {
        let table = Arc::new(ObjectTable::new());
        let ours = new_index(&table, FILE.file_id);
        let theirs = new_index(&table, FILE.file_id);

        ours.add_include(include("<shared>", 0), false);
        theirs.add_include(include("<shared>", 0), true);
        theirs.add_include(include("<only_theirs>", 40), true);

        ours.append_from(&theirs);
        assert_eq!(ours.len(), 2);
        assert_eq!(ours.broken_includes(), vec![include("<only_theirs>", 40).handle()]);
    }

    #[test]
    fn test_clean_and_copies() {
        let table = Arc::new(ObjectTable::new());
        let index = new_index(&table, FILE.file_id);
        index.add_include(include("<a>", 0), true);
        let full = index.full_copy();
        let empty = index.empty_copy();
        index.clean();

        assert!(index.is_empty());
        assert!(!index.has_broken());
        assert_eq!(full.len(), 1);
        assert!(full.has_broken());
        assert!(empty.is_empty());
        assert_eq!(empty.key(), index.key());
    }

    #[test]
    fn test_clean_releases_handles() {
        let table = Arc::new(ObjectTable::new());
        let index = new_index(&table, FILE.file_id);
        index.add_include(include("<a>", 0), false);
        index.add_include(include("\"b.h\"", 30), true);
        assert_eq!(table.len(), 2);

        index.clean();
        assert!(index.is_empty());
        assert!(table.is_empty());
        assert!(table.resolve_include(&include("<a>", 0).handle()).is_none());
    }

    #[test]
    fn test_includes_matching() {
        let table = Arc::new(ObjectTable::new());
        let index = new_index(&table, FILE.file_id);
        let system = index_handle(&index, include("<vector>", 0), false);
        let local = index_handle(&index, include("\"util.h\"", 30), true);

        assert_eq!(index.includes_matching(|i| i.is_system()), vec![system]);
        assert_eq!(index.includes_matching(|i| i.resolved.is_none()), vec![system, local]);
        assert!(index.includes_matching(|i| i.target == "<map>").is_empty());
    }

    fn index_handle(index: &FileIncludes, include: Include, broken: bool) -> Handle {
        let handle = include.handle();
        index.add_include(include, broken);
        handle
    }
}
