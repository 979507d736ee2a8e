// memdoc-core/src/value.rs
// Structural equality and ordering over JSON values

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Deep structural equality.
///
/// Primitive values of different types are never equal (no coercion), numbers
/// compare by numeric value (`1 == 1.0`), arrays are order-sensitive and
/// objects are compared by key set, ignoring key order.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| values_equal(l, r)))
        }
        _ => false,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// True when some element of `items` is structurally equal to `needle`
pub fn contains_value(items: &[Value], needle: &Value) -> bool {
    items.iter().any(|item| values_equal(item, needle))
}

/// Ordering for `$gt/$gte/$lt/$lte`.
///
/// Defined only for number/number, string/string and bool/bool pairs;
/// everything else is `None` and the comparison operators evaluate false.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n1), Value::Number(n2)) => compare_numbers(n1, n2),
        (Value::String(s1), Value::String(s2)) => Some(s1.cmp(s2)),
        (Value::Bool(b1), Value::Bool(b2)) => Some(b1.cmp(b2)),
        _ => None,
    }
}

pub(crate) fn compare_numbers(n1: &Number, n2: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (n1.as_i64(), n2.as_i64()) {
        return Some(a.cmp(&b));
    }
    let f1 = n1.as_f64()?;
    let f2 = n2.as_f64()?;
    f1.partial_cmp(&f2)
}

/// Type bucket used to give mixed-type sorts a total order:
/// absent/null < number < string < bool < object < array
pub fn type_priority(val: Option<&Value>) -> u8 {
    match val {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Array(_)) => 5,
    }
}

/// Short type name for log and error messages
pub fn type_name(val: &Value) -> &'static str {
    match val {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
