//! Diff and merge over records.
//!
//! Pure functions, no IO. Everything the engine sends or folds back into an
//! entity goes through one of these.
//!
//! # Arrays
//!
//! Array values are opaque: [`difference`] never recurses into them and never
//! reports them, in either direction. A changed array is therefore invisible to
//! partial updates and only travels with full updates. Downstream PATCH
//! payloads rely on arrays being absent, so this is kept as is.

use crate::Record;
use serde_json::Value;

/// Copy `old` and overwrite every key present in `new`.
///
/// The overwrite is shallow: a nested record in `new` replaces the one in `old`
/// wholesale. Keys only present in `old` are kept; no key is ever removed.
pub fn merge(old: &Record, new: &Record) -> Record {
    let mut merged = old.clone();
    for (key, value) in new {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Value equality, with numbers compared numerically.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        _ => a == b,
    }
}

/// Minimal set of changes that turns `old` into `new`.
///
/// - keys added or changed in `new` carry the new value
/// - nested records present on both sides are diffed recursively and only
///   included when the nested difference is non-empty
/// - keys dropped from `new` carry `null`
/// - unchanged keys and array values are omitted
///
/// Numbers are compared by value, so `1` and `1.0` are the same.
pub fn difference(old: &Record, new: &Record) -> Record {
    let mut diff = Record::new();

    for (key, value) in new {
        match value {
            Value::Array(_) => continue,
            Value::Object(new_nested) => match old.get(key) {
                Some(Value::Object(old_nested)) => {
                    let nested = difference(old_nested, new_nested);
                    if !nested.is_empty() {
                        diff.insert(key.clone(), Value::Object(nested));
                    }
                }
                _ => {
                    diff.insert(key.clone(), value.clone());
                }
            },
            _ => {
                if !old.get(key).is_some_and(|old| same_value(old, value)) {
                    diff.insert(key.clone(), value.clone());
                }
            }
        }
    }

    for (key, value) in old {
        if value.is_array() {
            continue;
        }
        if !new.contains_key(key) {
            diff.insert(key.clone(), Value::Null);
        }
    }

    diff
}

/// Apply a difference produced by [`difference`] onto `base`.
///
/// Nested records are patched recursively and `null` removes the field. This
/// is the receiving side of a partial update.
pub fn apply_patch(base: &Record, patch: &Record) -> Record {
    let mut patched = base.clone();
    for (key, value) in patch {
        match value {
            Value::Null => {
                patched.remove(key);
            }
            Value::Object(nested) => {
                let next = match patched.get(key) {
                    Some(Value::Object(current)) => apply_patch(current, nested),
                    _ => strip_nulls(nested),
                };
                patched.insert(key.clone(), Value::Object(next));
            }
            _ => {
                patched.insert(key.clone(), value.clone());
            }
        }
    }
    patched
}

fn strip_nulls(record: &Record) -> Record {
    apply_patch(&Record::new(), record)
}
