//! Revival of tagged structured-clone values
//!
//! Senders encode values JSON cannot carry as `{"data__type": ..., "data": ...}`.
//! Revival turns them back into plain JSON before payloads are decoded.

use serde_json::{Map, Value};

const TYPE_KEY: &str = "data__type";
const DATA_KEY: &str = "data";

/// Recursively revive tagged `Map`, `Set` and `Date` values
pub fn revive(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(revive).collect()),
        Value::Object(mut object) => {
            let tag = object.get(TYPE_KEY).and_then(Value::as_str).map(str::to_string);
            match tag.as_deref() {
                Some(kind @ ("Map" | "Set" | "Date")) if object.contains_key(DATA_KEY) => {
                    let data = object.remove(DATA_KEY).unwrap_or(Value::Null);
                    match kind {
                        "Map" => revive_map(data),
                        "Set" => revive_set(data),
                        _ => data,
                    }
                }
                _ => Value::Object(object.into_iter().map(|(k, v)| (k, revive(v))).collect()),
            }
        }
        other => other,
    }
}

/// Entries `[[k, v], ...]` become an object when every key is a string,
/// otherwise stay a list of pairs
fn revive_map(data: Value) -> Value {
    let Value::Array(entries) = data else {
        return revive(data);
    };
    let entries: Vec<Value> = entries.into_iter().map(revive).collect();

    let string_keyed = entries.iter().all(|entry| {
        entry.as_array().is_some_and(|pair| pair.len() == 2 && pair[0].is_string())
    });
    if !string_keyed {
        return Value::Array(entries);
    }

    let mut object = Map::new();
    for entry in entries {
        if let Value::Array(mut pair) = entry {
            let value = pair.pop().unwrap_or(Value::Null);
            if let Some(Value::String(key)) = pair.pop() {
                object.insert(key, value);
            }
        }
    }
    Value::Object(object)
}

fn revive_set(data: Value) -> Value {
    let Value::Array(items) = data else {
        return revive(data);
    };
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items.into_iter().map(revive) {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    Value::Array(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_values_untouched() {
        let value = json!({"a": [1, "two", null], "b": {"c": true}});
        assert_eq!(revive(value.clone()), value);
    }

    #[test]
    fn test_map_with_string_keys() {
        let set = json!({"data__type": "Set", "data": [1, 1, 2]});
        let value = json!({"data__type": "Map", "data": [["x", 1], ["y", set]]});
        assert_eq!(revive(value), json!({"x": 1, "y": [1, 2]}));
    }

    #[test]
    fn test_map_with_other_keys_stays_pairs() {
        let value = json!({"data__type": "Map", "data": [[1, "a"], [2, "b"]]});
        assert_eq!(revive(value), json!([[1, "a"], [2, "b"]]));
    }

    #[test]
    fn test_date_and_nesting() {
        let value = json!({
            "action": "fill",
            "when": {"data__type": "Date", "data": "2024-01-02T03:04:05.000Z"},
            "list": [{"data__type": "Set", "data": ["a", "b", "a"]}]
        });
        assert_eq!(
            revive(value),
            json!({"action": "fill", "when": "2024-01-02T03:04:05.000Z", "list": [["a", "b"]]})
        );
    }

    #[test]
    fn test_unknown_tag_is_an_ordinary_object() {
        let value = json!({"data__type": "Blob", "data": 1});
        assert_eq!(revive(value.clone()), value);
    }
}
