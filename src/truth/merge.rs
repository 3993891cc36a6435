//! "Better value" merge strategy for cross-referenced claims.
//!
//! When the same claim appears in several source datasets, the merged claim
//! keeps the most informative value: non-null over null, non-empty over
//! empty, anything over "unknown", and for objects the one with more real
//! entries (ties merge field-wise, preserving real values from both sides).

use serde_json::{Map, Value};

/// Whether a value carries real information.
pub fn is_real(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => {
            let trimmed = s.trim();
            !trimmed.is_empty()
                && !trimmed.eq_ignore_ascii_case("unknown")
                && !trimmed.eq_ignore_ascii_case("n/a")
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Count of entries carrying real information.
fn real_entry_count(map: &Map<String, Value>) -> usize {
    map.values().filter(|v| is_real(v)).count()
}

/// Pick the better of two values for the same claim. `current` wins ties so
/// merging is stable across dataset order.
pub fn prefer(current: Value, incoming: Value) -> Value {
    match (is_real(&current), is_real(&incoming)) {
        (false, true) => return incoming,
        (_, false) => return current,
        (true, true) => {}
    }

    match (current, incoming) {
        (Value::Object(a), Value::Object(b)) => {
            let (ra, rb) = (real_entry_count(&a), real_entry_count(&b));
            if rb > ra {
                Value::Object(b)
            } else if ra > rb {
                Value::Object(a)
            } else {
                Value::Object(merge_objects(a, b))
            }
        }
        (current, _) => current,
    }
}

/// Field-wise merge of two objects, preferring real values from either side.
pub fn merge_objects(mut a: Map<String, Value>, b: Map<String, Value>) -> Map<String, Value> {
    for (key, incoming) in b {
        match a.remove(&key) {
            Some(current) => {
                a.insert(key, prefer(current, incoming));
            }
            None => {
                a.insert(key, incoming);
            }
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_non_null_beats_null() {
        assert_eq!(prefer(json!(null), json!("$100M")), json!("$100M"));
        assert_eq!(prefer(json!("$100M"), json!(null)), json!("$100M"));
    }

    #[test]
    fn test_real_beats_unknown() {
        assert_eq!(prefer(json!("Unknown"), json!("SaaS")), json!("SaaS"));
        assert_eq!(prefer(json!("SaaS"), json!("unknown")), json!("SaaS"));
        assert_eq!(prefer(json!(""), json!("SaaS")), json!("SaaS"));
        assert_eq!(prefer(json!("N/A"), json!("SaaS")), json!("SaaS"));
    }

    #[test]
    fn test_non_empty_list_beats_empty() {
        assert_eq!(prefer(json!([]), json!(["a"])), json!(["a"]));
        assert_eq!(prefer(json!(["a"]), json!([])), json!(["a"]));
    }

    #[test]
    fn test_richer_object_wins() {
        let sparse = json!({"ceo": "unknown", "founded": 2010});
        let rich = json!({"ceo": "J. Doe", "founded": 2010});
        assert_eq!(prefer(sparse, rich.clone()), rich);
    }

    #[test]
    fn test_tied_objects_merge_field_wise() {
        let a = json!({"ceo": "J. Doe", "founded": null});
        let b = json!({"ceo": "unknown", "founded": 2010});
        assert_eq!(
            prefer(a, b),
            json!({"ceo": "J. Doe", "founded": 2010})
        );
    }

    #[test]
    fn test_first_seen_wins_scalar_ties() {
        assert_eq!(prefer(json!("$100M"), json!("$250M")), json!("$100M"));
    }
}
