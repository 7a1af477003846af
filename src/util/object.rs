//! Deep merge / deep copy helpers over `serde_json::Value`.
//!
//! Merge semantics: when both sides are objects the keys are merged
//! recursively; in every other case (arrays, scalars, null, type mismatch)
//! the overlay replaces the base value wholesale.

use serde_json::{Map, Value};

/// Merge `overlay` into `base` in place.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            merge_maps(base_map, overlay_map);
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merge every overlay into a fresh value, left to right.
pub fn merge_all<I>(overlays: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut merged = Value::Object(Map::new());
    for overlay in overlays {
        deep_merge(&mut merged, overlay);
    }
    merged
}

fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

/// Independent copy of a value that can be mutated without touching the source.
pub fn deep_copy(value: &Value) -> Value {
    value.clone()
}

/// Replace every occurrence of `placeholder` inside string leaves.
pub fn replace_in_strings(value: &mut Value, placeholder: &str, replacement: &str) {
    match value {
        Value::String(s) if s.contains(placeholder) => {
            *s = s.replace(placeholder, replacement);
        }
        Value::Array(items) => {
            for item in items {
                replace_in_strings(item, placeholder, replacement);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                replace_in_strings(item, placeholder, replacement);
            }
        }
        _ => {}
    }
}

/// Walk a dotted path through nested objects.
///
/// A segment that lands on anything other than an object ends the walk with
/// `None`, so `a.b.c` over `{"a": {"b": 5}}` is absent rather than an error.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(part)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Write `new_value` at a dotted path, creating (or replacing non-object)
/// intermediates with empty objects.
pub fn assign(target: &mut Value, path: &str, new_value: Value) {
    let mut parts = path.split('.').peekable();
    let mut current = target;

    while let Some(part) = parts.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };

        if parts.peek().is_none() {
            map.insert(part.to_string(), new_value);
            return;
        }

        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}
