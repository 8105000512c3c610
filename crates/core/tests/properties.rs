mod common;

use common::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use symdex_api::{DeclarationKind, name_hash};
use symdex_core::{FileDeclarations, FileIncludes};

const PROPTEST_CASES: u32 = 128;
const NAMES: [&str; 6] = ["a", "ab", "abc", "foo", "food", "bar"];

#[derive(Clone, Debug)]
struct Shape {
    name: &'static str,
    start: i32,
    len: i32,
}

fn arb_decl() -> impl Strategy<Value = Shape> {
    (prop::sample::select(NAMES.to_vec()), 0i32..200, 1i32..80)
        .prop_map(|(name, start, len)| Shape { name, start, len })
}

/// Expected contents keyed like the index: (start, name hash) -> (name, end).
fn model(shapes: &[Shape]) -> BTreeMap<(i32, i32), (&'static str, i32)> {
    let mut map = BTreeMap::new();
    for s in shapes {
        map.insert((s.start, name_hash(s.name)), (s.name, s.start + s.len));
    }
    map
}

fn build(shapes: &[Shape]) -> FileDeclarations {
    let index = FileDeclarations::new(UNIT, FILE.file_id, table());
    for s in shapes {
        index.add(function(s.name, s.start, s.start + s.len));
    }
    index
}

proptest! {
    #![proptest_config(ProptestConfig { cases: PROPTEST_CASES, .. ProptestConfig::default() })]

    #[test]
    fn prop_same_offset_and_name_replaces(shapes in prop::collection::vec(arb_decl(), 0..40)) {
        let index = build(&shapes);
        prop_assert_eq!(index.len(), model(&shapes).len());
    }

    #[test]
    fn prop_overlap_returns_exactly_intersecting_in_start_order(
        shapes in prop::collection::vec(arb_decl(), 0..40),
        a in 0i32..260,
        width in 1i32..60,
    ) {
        let b = a + width;
        let index = build(&shapes);
        let expected: Vec<(i32, i32)> = model(&shapes)
            .into_iter()
            .filter(|((start, _), (_, end))| *start < b && a < *end)
            .map(|((start, _), (_, end))| (start, end))
            .collect();

        let table_view: Vec<(i32, i32)> = index
            .declarations_overlapping(a, b)
            .iter()
            .map(|h| {
                let start = h.start_offset();
                let (_, end) = model(&shapes)[&(start, h.discriminator())];
                (start, end)
            })
            .collect();
        prop_assert_eq!(table_view, expected);
    }

    #[test]
    fn prop_prefix_query_reflects_every_mutation(
        ops in prop::collection::vec((arb_decl(), any::<bool>()), 1..40),
        prefix in prop::sample::select(vec!["", "a", "ab", "fo", "foo", "z"]),
    ) {
        let index = FileDeclarations::new(UNIT, FILE.file_id, table());
        let mut live: BTreeMap<(i32, i32), (&'static str, i32)> = BTreeMap::new();

        for (shape, remove) in ops {
            let d = function(shape.name, shape.start, shape.start + shape.len);
            let key = (shape.start, name_hash(shape.name));
            if remove && live.contains_key(&key) {
                index.remove(&d);
                live.remove(&key);
            } else {
                index.add(d);
                live.insert(key, (shape.name, shape.start + shape.len));
            }

            let mut expected: Vec<(&str, i32)> = live
                .iter()
                .filter(|(_, (name, _))| name.starts_with(prefix))
                .map(|((start, _), (name, _))| (*name, *start))
                .collect();
            expected.sort();

            let got: Vec<(String, i32)> = index
                .declarations_of_kinds_with_prefix(&[DeclarationKind::FunctionDefinition], prefix)
                .iter()
                .map(|h| {
                    let (name, _) = live[&(h.start_offset(), h.discriminator())];
                    (name.to_string(), h.start_offset())
                })
                .collect();
            let expected: Vec<(String, i32)> =
                expected.into_iter().map(|(n, s)| (n.to_string(), s)).collect();
            prop_assert_eq!(got, expected);
        }
    }

    #[test]
    fn prop_broken_includes_subset_of_includes(
        ops in prop::collection::vec((0usize..8, any::<bool>(), any::<bool>()), 0..60),
    ) {
        let table = table();
        let index = FileIncludes::new(UNIT, FILE.file_id, table.clone());
        let mut last_state: BTreeMap<usize, bool> = BTreeMap::new();

        for (target, broken, to_side) in ops {
            let inc = include(&format!("\"h{target}.h\""), target as i32 * 50);
            if to_side {
                let side = FileIncludes::new(UNIT, FILE.file_id, table.clone());
                side.add_include(inc, broken);
                // Merge rule: only unknown includes inherit the side's broken state.
                let merged_broken = broken && !last_state.contains_key(&target);
                index.append_from(&side);
                last_state.entry(target).or_insert(merged_broken);
            } else {
                index.add_include(inc, broken);
                last_state.insert(target, broken);
            }

            let all: BTreeSet<_> = index.includes().into_iter().collect();
            for b in index.broken_includes() {
                prop_assert!(all.contains(&b));
            }
            let expected_broken = last_state.values().filter(|b| **b).count();
            prop_assert_eq!(index.broken_includes().len(), expected_broken);
            prop_assert_eq!(index.has_broken(), expected_broken > 0);
        }
    }
}
