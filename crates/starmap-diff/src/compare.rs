//! Policy-aware comparison and combination of field values.

use std::collections::BTreeSet;

use serde_json::Value;

use starmap_types::MergePolicy;

/// Returns `true` if `value` carries no information: `null`, an empty
/// string, list or object, or numeric zero.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(_) => false,
    }
}

/// Compare two values of a field under its merge policy.
///
/// Set-valued fields compare as sets, so reordering is not a change and
/// `null` equals the empty list.
pub fn values_equal(policy: MergePolicy, a: &Value, b: &Value) -> bool {
    match policy {
        MergePolicy::SetUnion => set_members(a) == set_members(b),
        _ => a == b,
    }
}

/// The larger of two numeric values, keeping the original representation.
///
/// A missing side yields the other. Returns `None` if either side is
/// present but not a number.
pub fn numeric_max(ours: &Value, theirs: &Value) -> Option<Value> {
    match (ours, theirs) {
        (Value::Null, Value::Null) => None,
        (Value::Null, other) | (other, Value::Null) => other.is_number().then(|| other.clone()),
        (a, b) => {
            let (x, y) = (a.as_f64()?, b.as_f64()?);
            Some(if y > x { b.clone() } else { a.clone() })
        }
    }
}

/// Union of two list values: `ours` in order, then members only `theirs`
/// has. Duplicates are removed. A non-list value counts as a single member.
pub fn set_union(ours: &Value, theirs: &Value) -> Value {
    let mut seen = BTreeSet::new();
    let mut union = Vec::new();
    for item in members(ours).into_iter().chain(members(theirs)) {
        if seen.insert(canonical(&item)) {
            union.push(item);
        }
    }
    Value::Array(union)
}

fn members(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn set_members(value: &Value) -> BTreeSet<String> {
    members(value).iter().map(canonical).collect()
}

fn canonical(value: &Value) -> String {
    value.to_string()
}
