//! Structural guarantees of built and normalized trees over generated input.

use folio::contexts::{create_tree, node, normalize, Node, RepairRule};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const TYPES: [&str; 5] = ["Card", "Text", "List", "ListItem", "Tag"];

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = (0..TYPES.len(), "[a-z]{0,6}")
        .prop_map(|(index, content)| node(TYPES[index]).prop("content", content));
    leaf.prop_recursive(4, 40, 5, |inner| {
        (0..TYPES.len(), prop::collection::vec(inner, 0..5))
            .prop_map(|(index, children)| node(TYPES[index]).children(children))
    })
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e", "f", "root", "el-1"]).prop_map(str::to_string)
}

/// A flat document whose links are arbitrary: dangling, contested, cyclic or missing
fn flat_strategy() -> impl Strategy<Value = Value> {
    let element = (
        prop::option::of(key_strategy()),
        prop::collection::vec(key_strategy(), 0..4),
        prop::bool::weighted(0.9),
    );
    (
        key_strategy(),
        prop::collection::btree_map(key_strategy(), element, 0..7),
    )
        .prop_map(|(root, entries)| {
            let mut elements = Map::new();
            for (key, (parent, children, well_formed)) in entries {
                let value = if well_formed {
                    json!({"type": "Text", "children": children, "parentKey": parent})
                } else {
                    json!("not an element")
                };
                elements.insert(key, value);
            }
            json!({"root": root, "elements": elements})
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn built_trees_have_one_root_and_consistent_links(tree in node_strategy()) {
        let spec = create_tree(&tree);
        prop_assert_eq!(spec.check_invariants(), Ok(()));
        let parentless = spec.elements.values().filter(|e| e.parent_key.is_none()).count();
        prop_assert_eq!(parentless, 1);
    }

    #[test]
    fn normalized_flat_input_is_canonical(value in flat_strategy()) {
        if let Some(normalized) = normalize(&value) {
            prop_assert_eq!(normalized.spec.check_invariants(), Ok(()));
            for element in normalized.spec.elements.values() {
                for child in &element.children {
                    let listed = normalized.spec.get(child).and_then(|c| c.parent_key.as_deref());
                    prop_assert_eq!(listed, Some(element.key.as_str()));
                }
            }
        } else {
            let elements = value["elements"].as_object().cloned().unwrap_or_default();
            prop_assert!(elements.values().all(|entry| !entry.is_object()));
        }
    }

    #[test]
    fn normalizing_canonical_output_changes_nothing(value in flat_strategy()) {
        if let Some(first) = normalize(&value) {
            let reparsed = serde_json::to_value(&first.spec).unwrap();
            let second = normalize(&reparsed).unwrap();
            prop_assert_eq!(&second.spec, &first.spec);
            prop_assert!(second.repairs.is_empty());
        }
    }

    #[test]
    fn nested_input_round_trips_through_the_builder(tree in node_strategy()) {
        let built = create_tree(&tree);
        let reparsed = serde_json::to_value(&built).unwrap();
        let normalized = normalize(&reparsed).unwrap();
        prop_assert_eq!(&normalized.spec, &built);
        prop_assert!(!normalized.applied(RepairRule::WrappedMasterless));
    }
}
