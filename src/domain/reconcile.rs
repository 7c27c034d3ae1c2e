//! Reconciliation engine over untyped JSON documents.
//!
//! Three primitives drive desired/reported convergence:
//!
//! - [`merge`]: fold newly reported data into an existing document, recursing
//!   only where both sides hold nested maps (bounded by [`MAX_JSON_LEVEL`])
//! - [`create_merge_patch`]: the RFC 7396 delta that turns one document into
//!   another, with `null` marking deletions
//! - [`apply_merge_patch`]: evolve a document by an RFC 7396 delta

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};

use super::keys::MAX_JSON_LEVEL;

/// Merge `incoming` into `base`.
///
/// Nested maps present on both sides are merged recursively; any other value
/// in `incoming` replaces the one in `base`. The merge runs against a staged
/// copy and `base` is only replaced once every branch has succeeded, so a
/// depth failure leaves `base` untouched.
pub fn merge(base: &mut Map<String, Value>, incoming: Map<String, Value>) -> Result<()> {
    merge_with_limit(base, incoming, MAX_JSON_LEVEL)
}

/// [`merge`] with an explicit nesting limit.
pub fn merge_with_limit(
    base: &mut Map<String, Value>,
    incoming: Map<String, Value>,
    max_depth: usize,
) -> Result<()> {
    let mut staged = base.clone();
    let mut path = Vec::new();
    merge_level(&mut staged, incoming, 1, max_depth, &mut path)?;
    *base = staged;
    Ok(())
}

fn merge_level(
    left: &mut Map<String, Value>,
    right: Map<String, Value>,
    depth: usize,
    max_depth: usize,
    path: &mut Vec<String>,
) -> Result<()> {
    if depth >= max_depth {
        let path = dotted(path);
        debug!(path = %path, max_depth, "merge exceeded nesting limit");
        return Err(Error::DepthExceeded {
            max: max_depth,
            path,
        });
    }
    for (key, right_value) in right {
        match (left.get_mut(&key), right_value) {
            (Some(Value::Object(left_map)), Value::Object(right_map)) => {
                path.push(key);
                merge_level(left_map, right_map, depth + 1, max_depth, path)?;
                path.pop();
            }
            (_, right_value) => {
                left.insert(key, right_value);
            }
        }
    }
    Ok(())
}

fn dotted(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

/// Compute the RFC 7396 merge patch that turns `original` into `modified`.
///
/// Keys present in `original` but missing from `modified` come back as
/// `null`. Nested maps with no difference below them are left out.
pub fn create_merge_patch(
    original: &Map<String, Value>,
    modified: &Map<String, Value>,
) -> Map<String, Value> {
    let mut delta = Map::new();
    for (key, modified_value) in modified {
        match (original.get(key), modified_value) {
            (None, _) => {
                delta.insert(key.clone(), modified_value.clone());
            }
            (Some(Value::Object(original_map)), Value::Object(modified_map)) => {
                let nested = create_merge_patch(original_map, modified_map);
                if !nested.is_empty() {
                    delta.insert(key.clone(), Value::Object(nested));
                }
            }
            (Some(original_value), _) => {
                if !same_value(original_value, modified_value) {
                    delta.insert(key.clone(), modified_value.clone());
                }
            }
        }
    }
    for key in original.keys() {
        if !modified.contains_key(key) {
            delta.insert(key.clone(), Value::Null);
        }
    }
    delta
}

/// Remove every `null` entry, recursing into nested maps.
pub fn strip_nulls(map: &mut Map<String, Value>) {
    map.retain(|_, value| !value.is_null());
    for value in map.values_mut() {
        if let Value::Object(nested) = value {
            strip_nulls(nested);
        }
    }
}

/// Apply an RFC 7396 merge patch, producing a new document.
pub fn apply_merge_patch(
    document: &Map<String, Value>,
    delta: &Map<String, Value>,
) -> Map<String, Value> {
    let mut target = Value::Object(document.clone());
    json_patch::merge(&mut target, &Value::Object(delta.clone()));
    match target {
        Value::Object(map) => map,
        // An object patch always leaves an object behind.
        _ => Map::new(),
    }
}

/// JSON equality where numbers compare by value, so `1` matches `1.0`.
fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => l == r,
        },
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(l, r)| same_value(l, r))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l
                    .iter()
                    .all(|(key, l)| r.get(key).is_some_and(|r| same_value(l, r)))
        }
        _ => left == right,
    }
}
