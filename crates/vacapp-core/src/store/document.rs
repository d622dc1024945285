//! Dotted-path operations on a JSON object.
//!
//! A path like `user.username` addresses nested objects one segment at a
//! time. Writes create missing intermediate objects and leave sibling keys
//! alone; reads and removals stop quietly at the first missing segment.

use serde_json::{Map, Value};

/// Split a dotted path into its segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Assign `value` at `path`, creating intermediate objects as needed.
///
/// A non-object value sitting where an intermediate object is needed is
/// replaced by an empty object.
pub fn set_path(doc: &mut Map<String, Value>, path: &str, value: Value) {
    let parts = segments(path);
    let Some((leaf, parents)) = parts.split_last() else {
        return;
    };

    let mut obj = doc;
    for key in parents {
        let slot = obj
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        obj = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }

    obj.insert((*leaf).to_string(), value);
}

/// Look up the value at `path`.
pub fn get_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = segments(path).into_iter();
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for key in parts {
        current = current.get(key)?;
    }
    Some(current)
}

/// Delete the key at `path`. Returns whether anything was removed.
pub fn remove_path(doc: &mut Map<String, Value>, path: &str) -> bool {
    let parts = segments(path);
    let Some((leaf, parents)) = parts.split_last() else {
        return false;
    };

    let mut obj = doc;
    for key in parents {
        obj = match obj.get_mut(*key) {
            Some(Value::Object(map)) => map,
            _ => return false,
        };
    }

    obj.remove(*leaf).is_some()
}
