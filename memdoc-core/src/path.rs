// memdoc-core/src/path.rs
// Dotted field paths ("address.city") over document maps.
//
// Paths only walk through objects. Array elements are never addressed, so
// "tags.0" is absent even when `tags` is a non-empty array.

use serde_json::{Map, Value};

use crate::log_warn;
use crate::value::type_name;

/// Resolve `path`; `None` means absent
pub fn get_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = root.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

pub fn get_path_mut<'a>(root: &'a mut Map<String, Value>, path: &str) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = root.get_mut(first)?;

    for segment in segments {
        current = current.as_object_mut()?.get_mut(segment)?;
    }

    Some(current)
}

/// Assign `value` at `path`, creating missing intermediate objects.
///
/// A non-object intermediate value is replaced by an empty object; the old
/// value is lost, so this is logged.
pub fn set_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let (parents, last) = match path.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };

    let mut current = root;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            let slot = current
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));

            if !slot.is_object() {
                log_warn!(
                    "set_path('{}'): replacing {} at segment '{}' with an object",
                    path,
                    type_name(slot),
                    segment
                );
                *slot = Value::Object(Map::new());
            }

            current = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }
    }

    current.insert(last.to_string(), value);
}

/// Remove the value at `path`, keeping the order of the remaining keys
pub fn remove_path(root: &mut Map<String, Value>, path: &str) -> Option<Value> {
    match path.rsplit_once('.') {
        None => root.shift_remove(path),
        Some((parents, last)) => get_path_mut(root, parents)?
            .as_object_mut()?
            .shift_remove(last),
    }
}

/// First segment of a dotted path
pub fn root_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}
