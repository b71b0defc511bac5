//! Schema-tolerant field access over reconciled JSON trees.
//!
//! Historical exporters decorate field names with the tag-tree type id
//! (`completed:1`, `questDatabase:9`, ...). Every lookup in the merge
//! pipeline goes through [`get`] so JSON-shaped and tag-tree-shaped inputs
//! are addressed with the same call sites.

use serde_json::Value;

/// Type-id suffixes appended to key names by some producers, tried in this
/// fixed ascending order. Which integer maps to which type is deliberately
/// not assumed here.
const TYPE_SUFFIXES: std::ops::RangeInclusive<u8> = 1..=12;

/// Resolve `name` on an object node, tolerating `name:<1-12>` spellings.
///
/// Returns `None` on non-objects or when no variant exists; never panics.
#[must_use]
pub fn get<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    let map = node.as_object()?;
    if let Some(found) = map.get(name) {
        return Some(found);
    }
    for suffix in TYPE_SUFFIXES {
        if let Some(found) = map.get(&format!("{name}:{suffix}")) {
            return Some(found);
        }
    }
    None
}

/// Strip any `:N` type suffix from a physical key.
#[must_use]
pub fn base_key(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}

/// Unwrap the `{key, value}` entry shape some exporters emit for list
/// entries. Returns the node itself when no wrapper is present.
#[must_use]
pub fn unwrap_entry(node: &Value) -> &Value {
    match node.get("value") {
        Some(inner) if inner.is_object() => inner,
        _ => node,
    }
}

/// The `key` field of a `{key, value}` wrapper entry, stringified.
#[must_use]
pub fn entry_key(node: &Value) -> Option<String> {
    node.get("key").and_then(id_string)
}

/// Iterate a collection that may be either a list or a map, yielding
/// `(key, element)` pairs. List elements are keyed by their index.
#[must_use]
pub fn entries(node: &Value) -> Vec<(String, &Value)> {
    match node {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        Value::Object(map) => map.iter().map(|(key, item)| (key.clone(), item)).collect(),
        _ => Vec::new(),
    }
}

/// Number of elements in a list-or-map collection; 0 for scalars.
#[must_use]
pub fn collection_len(node: &Value) -> usize {
    match node {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    }
}

/// Canonical string form of a scalar identifier. Integer-valued numbers
/// stringify without a fractional part; containers yield `None`.
#[must_use]
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_bare_and_suffixed_spellings() {
        let node = json!({ "foo": 1, "bar:3": 2, "baz:8": "s" });
        assert_eq!(get(&node, "foo"), Some(&json!(1)));
        assert_eq!(get(&node, "bar"), Some(&json!(2)));
        assert_eq!(get(&node, "baz"), Some(&json!("s")));
        assert_eq!(get(&node, "missing"), None);
    }

    #[test]
    fn exact_key_wins_over_suffixed_variant() {
        let node = json!({ "foo": "plain", "foo:8": "suffixed" });
        assert_eq!(get(&node, "foo"), Some(&json!("plain")));
    }

    #[test]
    fn lower_suffix_wins_when_several_exist() {
        let node = json!({ "foo:9": "list", "foo:3": "int" });
        assert_eq!(get(&node, "foo"), Some(&json!("int")));
    }

    #[test]
    fn non_objects_resolve_to_none() {
        assert_eq!(get(&json!([1, 2]), "foo"), None);
        assert_eq!(get(&json!("str"), "foo"), None);
        assert_eq!(get(&json!(null), "foo"), None);
    }

    #[test]
    fn base_key_strips_suffix() {
        assert_eq!(base_key("completed:1"), "completed");
        assert_eq!(base_key("completed"), "completed");
    }

    #[test]
    fn entry_wrapper_unwraps_only_object_values() {
        let wrapped = json!({ "key": "7", "value": { "questID": 7 } });
        assert_eq!(unwrap_entry(&wrapped), &json!({ "questID": 7 }));
        assert_eq!(entry_key(&wrapped).as_deref(), Some("7"));

        let scalar_value = json!({ "key": "7", "value": 3 });
        assert_eq!(unwrap_entry(&scalar_value), &scalar_value);
    }

    #[test]
    fn entries_iterates_lists_and_maps_uniformly() {
        let list = json!([10, 20]);
        let keys: Vec<String> = entries(&list).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["0", "1"]);

        let map = json!({ "a": 1, "b": 2 });
        assert_eq!(entries(&map).len(), 2);
        assert!(entries(&json!(5)).is_empty());
    }

    #[test]
    fn id_string_normalizes_scalars() {
        assert_eq!(id_string(&json!(5)).as_deref(), Some("5"));
        assert_eq!(id_string(&json!("5")).as_deref(), Some("5"));
        assert_eq!(id_string(&json!({})), None);
        assert_eq!(id_string(&json!([])), None);
    }
}
