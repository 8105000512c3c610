//! Per-file declaration index.
//!
//! Declarations are keyed by [`OffsetKey`] so range queries walk a sorted
//! map. A per-kind name index for prefix search is derived lazily and
//! dropped on every mutation.

use crate::guarded::Guarded;
use crate::keys::{NameKey, OffsetKey};
use crate::storage::Persistent;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use symdex_api::{ContainerKey, ContainerKind, Declaration, DeclarationKind, Handle, HandleLayer};

/// Entries spanning more than this are kept in `DeclarationEntries::long`.
/// Range queries walk back at most this far through the offset map.
const LONG_EXTENT: i32 = 2048;

#[derive(Debug, Clone, Default)]
struct DeclarationEntries {
    by_offset: BTreeMap<OffsetKey, Handle>,
    static_functions: Vec<Handle>,
    static_variables: Vec<Handle>,
    /// Keys of entries wider than `LONG_EXTENT` (or of unknown width).
    long: BTreeSet<OffsetKey>,
}

impl DeclarationEntries {
    fn forget_static(&mut self, handle: &Handle) {
        self.static_functions.retain(|h| h != handle);
        self.static_variables.retain(|h| h != handle);
    }

    /// Entries starting before `start_offset` that may still reach it,
    /// in key order.
    fn preceding_candidates(&self, start_offset: i32) -> Vec<(OffsetKey, Handle)> {
        let window = OffsetKey::lower_bound(start_offset.saturating_sub(LONG_EXTENT));
        let lower = OffsetKey::lower_bound(start_offset);
        let mut candidates: Vec<(OffsetKey, Handle)> = self
            .long
            .range(..window)
            .filter_map(|k| self.by_offset.get_key_value(k))
            .map(|(k, h)| (*k, *h))
            .collect();
        if window < lower {
            candidates.extend(self.by_offset.range(window..lower).map(|(k, h)| (*k, *h)));
        }
        candidates
    }
}

fn extent(declaration: &Declaration) -> i32 {
    declaration
        .end_offset()
        .saturating_sub(declaration.start_offset())
        .max(1)
}

/// kind -> name-ordered declarations, built from one generation of entries.
struct KindNameIndex {
    generation: u64,
    by_kind: HashMap<DeclarationKind, BTreeMap<NameKey, Handle>>,
}

impl KindNameIndex {
    fn build(generation: u64, entries: &DeclarationEntries, layer: &dyn HandleLayer) -> Self {
        let mut by_kind: HashMap<DeclarationKind, BTreeMap<NameKey, Handle>> = HashMap::new();
        for handle in entries.by_offset.values() {
            if let Some(decl) = layer.resolve_declaration(handle) {
                by_kind
                    .entry(decl.kind)
                    .or_default()
                    .insert(NameKey::new(&decl.name, decl.start_offset()), *handle);
            }
        }
        Self {
            generation,
            by_kind,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredDeclarations {
    pub declarations: Vec<(OffsetKey, Handle)>,
    pub static_functions: Vec<Handle>,
    pub static_variables: Vec<Handle>,
}

pub struct FileDeclarations {
    key: ContainerKey,
    layer: Arc<dyn HandleLayer>,
    entries: Guarded<DeclarationEntries>,
    generation: AtomicU64,
    name_index: ArcSwapOption<KindNameIndex>,
}

impl FileDeclarations {
    pub fn new(unit: &str, file_id: u32, layer: Arc<dyn HandleLayer>) -> Self {
        Self::with_entries(
            ContainerKey::new(unit, file_id, ContainerKind::Declarations),
            layer,
            DeclarationEntries::default(),
        )
    }

    fn with_entries(
        key: ContainerKey,
        layer: Arc<dyn HandleLayer>,
        entries: DeclarationEntries,
    ) -> Self {
        Self {
            key,
            layer,
            entries: Guarded::new(entries),
            generation: AtomicU64::new(0),
            name_index: ArcSwapOption::empty(),
        }
    }

    /// Same identity, no entries. Used right before a file is rebuilt.
    pub fn empty_copy(&self) -> Self {
        Self::with_entries(self.key.clone(), self.layer.clone(), DeclarationEntries::default())
    }

    /// Same identity and entries, copied under one read acquisition.
    pub fn full_copy(&self) -> Self {
        Self::with_entries(self.key.clone(), self.layer.clone(), self.entries.snapshot())
    }

    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    /// Must be called with the write lock held.
    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.name_index.store(None);
    }

    /// Insert a declaration, replacing any entry with the same [`OffsetKey`].
    pub fn add(&self, declaration: Declaration) -> Handle {
        let key = OffsetKey::of(&declaration);
        let static_function = declaration.is_file_static_function();
        let static_variable = declaration.is_file_static_variable();
        let long = extent(&declaration) > LONG_EXTENT;

        // Register before taking the lock: readers never see an unresolvable entry.
        let handle = self.layer.put(declaration.into());

        let replaced = self.entries.write(|e| {
            let replaced = e.by_offset.insert(key, handle);
            if let Some(old) = &replaced {
                e.forget_static(old);
            }
            if static_function {
                e.static_functions.push(handle);
            } else if static_variable {
                e.static_variables.push(handle);
            }
            if long {
                e.long.insert(key);
            } else {
                e.long.remove(&key);
            }
            self.invalidate();
            replaced
        });

        if let Some(old) = replaced.filter(|old| *old != handle) {
            tracing::debug!("{}: {} replaced by {}", self.key, old, handle);
            self.layer.remove(&old);
        }
        handle
    }

    /// Remove the entry keyed like `declaration` and release its handle.
    pub fn remove(&self, declaration: &Declaration) -> bool {
        let key = OffsetKey::of(declaration);
        let removed = self.entries.write(|e| {
            let removed = e.by_offset.remove(&key);
            if let Some(handle) = &removed {
                e.forget_static(handle);
                e.long.remove(&key);
                self.invalidate();
            }
            removed
        });

        match removed {
            Some(handle) => {
                if handle != declaration.handle() {
                    tracing::warn!(
                        "{}: removed {} while asked for {}",
                        self.key,
                        handle,
                        declaration.handle()
                    );
                }
                self.layer.remove(&handle);
                true
            }
            None => {
                tracing::debug!("{}: no declaration {} to remove", self.key, declaration.name);
                false
            }
        }
    }

    /// Wipe every entry and release the handles (prelude to a reparse).
    pub fn clean(&self) {
        let released = self.entries.write(|e| {
            let old = std::mem::take(e);
            self.invalidate();
            old.by_offset.into_values().collect::<Vec<_>>()
        });
        for handle in &released {
            self.layer.remove(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read(|e| e.by_offset.len())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read(|e| e.by_offset.is_empty())
    }

    pub fn has_declarations(&self) -> bool {
        !self.is_empty()
    }

    /// Every declaration in start-offset order.
    pub fn declarations(&self) -> Vec<Handle> {
        self.entries.read(|e| e.by_offset.values().copied().collect())
    }

    pub fn declarations_matching(&self, filter: impl Fn(&Declaration) -> bool) -> Vec<Handle> {
        self.entries.read(|e| {
            e.by_offset
                .values()
                .filter(|h| {
                    self.layer
                        .resolve_declaration(h)
                        .is_some_and(|d| filter(d.as_ref()))
                })
                .copied()
                .collect()
        })
    }

    /// Declarations whose own range intersects `[start_offset, end_offset)`,
    /// in ascending start order. Outer declarations that begin before the
    /// query but still cover it come first.
    pub fn declarations_overlapping(&self, start_offset: i32, end_offset: i32) -> Vec<Handle> {
        if end_offset <= start_offset {
            return Vec::new();
        }
        self.entries.read(|e| {
            let lower = OffsetKey::lower_bound(start_offset);
            let upper = OffsetKey::lower_bound(end_offset);

            let mut covering = Vec::new();
            for (_, handle) in e.preceding_candidates(start_offset) {
                match self.layer.resolve_declaration(&handle) {
                    Some(decl) if decl.range.intersects(start_offset, end_offset) => {
                        covering.push(handle)
                    }
                    Some(_) => {}
                    None => tracing::warn!("{}: unresolvable {}", self.key, handle),
                }
            }

            covering.extend(e.by_offset.range(lower..upper).map(|(_, h)| *h));
            covering
        })
    }

    /// Declarations containing `offset`, outermost first.
    pub fn declarations_at(&self, offset: i32) -> Vec<Handle> {
        self.declarations_overlapping(offset, offset.saturating_add(1))
    }

    pub fn declaration_by_exact_range(
        &self,
        start_offset: i32,
        end_offset: i32,
        name: &str,
    ) -> Option<Handle> {
        let handle = self.lookup(start_offset, name)?;
        let decl = self.layer.resolve_declaration(&handle)?;
        (decl.end_offset() == end_offset && decl.name == name).then_some(handle)
    }

    pub fn declaration_by_start_and_kind(
        &self,
        start_offset: i32,
        name: &str,
        kind: DeclarationKind,
    ) -> Option<Handle> {
        let handle = self.lookup(start_offset, name)?;
        let decl = self.layer.resolve_declaration(&handle)?;
        if decl.kind != kind {
            tracing::debug!(
                "{}: {} at {} is a {}, not a {}",
                self.key,
                name,
                start_offset,
                decl.kind.as_str(),
                kind.as_str()
            );
            return None;
        }
        (decl.name == name).then_some(handle)
    }

    fn lookup(&self, start_offset: i32, name: &str) -> Option<Handle> {
        let key = OffsetKey::new(start_offset, name);
        self.entries.read(|e| e.by_offset.get(&key).copied())
    }

    /// Declarations of the given kinds whose name starts with `prefix`,
    /// grouped by kind in the order asked, each group name-ordered.
    pub fn declarations_of_kinds_with_prefix(
        &self,
        kinds: &[DeclarationKind],
        prefix: &str,
    ) -> Vec<Handle> {
        self.entries.read(|e| {
            let index = self.kind_name_index(e);
            let mut seen = HashSet::new();
            let mut result = Vec::new();
            for kind in kinds.iter().filter(|k| seen.insert(**k)) {
                let Some(by_name) = index.by_kind.get(kind) else {
                    continue;
                };
                result.extend(
                    by_name
                        .range(NameKey::prefix_start(prefix)..)
                        .take_while(|(k, _)| k.name.starts_with(prefix))
                        .map(|(_, h)| *h),
                );
            }
            result
        })
    }

    /// Called under the read lock. Concurrent builders may race; the last
    /// one stored wins and every copy is equally valid for this generation.
    fn kind_name_index(&self, entries: &DeclarationEntries) -> Arc<KindNameIndex> {
        let generation = self.generation.load(Ordering::Acquire);
        if let Some(cached) = self.name_index.load_full() {
            if cached.generation == generation {
                return cached;
            }
        }
        tracing::debug!("{}: rebuilding name index", self.key);
        let built = Arc::new(KindNameIndex::build(generation, entries, self.layer.as_ref()));
        self.name_index.store(Some(built.clone()));
        built
    }

    pub fn static_function_declarations(&self) -> Vec<Handle> {
        self.entries.read(|e| e.static_functions.clone())
    }

    pub fn static_variable_declarations(&self) -> Vec<Handle> {
        self.entries.read(|e| e.static_variables.clone())
    }

    pub fn static_functions_matching(&self, filter: impl Fn(&Declaration) -> bool) -> Vec<Handle> {
        self.filter_resolved(self.static_function_declarations(), filter)
    }

    pub fn static_variables_matching(&self, filter: impl Fn(&Declaration) -> bool) -> Vec<Handle> {
        self.filter_resolved(self.static_variable_declarations(), filter)
    }

    fn filter_resolved(
        &self,
        handles: Vec<Handle>,
        filter: impl Fn(&Declaration) -> bool,
    ) -> Vec<Handle> {
        handles
            .into_iter()
            .filter(|h| {
                self.layer
                    .resolve_declaration(h)
                    .is_some_and(|d| filter(d.as_ref()))
            })
            .collect()
    }
}

impl Persistent for FileDeclarations {
    type Stored = StoredDeclarations;

    fn container_key(&self) -> ContainerKey {
        self.key.clone()
    }

    fn to_stored(&self) -> StoredDeclarations {
        self.entries.read(|e| StoredDeclarations {
            declarations: e.by_offset.iter().map(|(k, h)| (*k, *h)).collect(),
            static_functions: e.static_functions.clone(),
            static_variables: e.static_variables.clone(),
        })
    }

    fn from_stored(
        key: ContainerKey,
        stored: StoredDeclarations,
        layer: Arc<dyn HandleLayer>,
    ) -> Self {
        // Unresolvable entries have unknown width and are checked on every query.
        let long = stored
            .declarations
            .iter()
            .filter(|(_, h)| {
                layer
                    .resolve_declaration(h)
                    .is_none_or(|d| extent(&d) > LONG_EXTENT)
            })
            .map(|(k, _)| *k)
            .collect();
        let entries = DeclarationEntries {
            by_offset: stored.declarations.into_iter().collect(),
            static_functions: stored.static_functions,
            static_variables: stored.static_variables,
            long,
        };
        Self::with_entries(key, layer, entries)
    }
}
