use dotset::path::{flatten, get_path, unflatten};
use dotset::{merge, subset, Document};
use proptest::prelude::*;
use proptest::sample::Index;
use serde_json::{json, Map, Value};

// Keys never contain the separator and are never purely numeric
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]*".prop_map(Value::String),
    ];
    leaf.prop_recursive(
        4,  // 4 levels deep
        64, // Max size 64 nodes
        12, // Items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..12).prop_map(Value::Array),
                prop::collection::btree_map(key_strategy(), inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        },
    )
}

fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..8)
        .prop_map(|m| m.into_iter().collect::<Map<String, Value>>())
}

proptest! {
    #[test]
    fn test_flatten_round_trip(doc in document_strategy()) {
        let flat = flatten(&doc, false);
        prop_assert_eq!(unflatten(&flat).unwrap(), doc.clone());

        let flat = flatten(&doc, true);
        prop_assert_eq!(unflatten(&flat).unwrap(), doc);
    }

    #[test]
    fn test_subset_idempotent(doc in document_strategy(), picks in prop::collection::vec(any::<Index>(), 0..4)) {
        let flat = flatten(&doc, true);
        let keys: Vec<&String> = flat.keys().collect();
        let spec: Vec<String> = if keys.is_empty() {
            Vec::new()
        } else {
            picks.iter().map(|idx| idx.get(&keys).to_string()).collect()
        };

        let once = subset(&doc, spec.clone()).unwrap();
        let twice = subset(&once, spec).unwrap();
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn test_merge_never_overwrites(mut target in document_strategy(), other in document_strategy()) {
        let before = flatten(&target, true);
        merge(&mut target, &other);
        for (path, value) in &before {
            if value == &json!({}) {
                continue;
            }
            prop_assert_eq!(get_path(&target, path), Some(value));
        }
    }
}
