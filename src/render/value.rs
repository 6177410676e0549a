use serde_json::Value;

static NULL: Value = Value::Null;

/// Return true if the value is truthy.
///
/// False, null, zero and the empty string are falsy. Every array and object
/// is truthy, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(bo) => *bo,
        Value::Number(nu) => nu.as_f64().map_or(false, |n| n != 0.0),
        Value::String(st) => !st.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// Walk the path from the value.
///
/// Objects are indexed by member name, arrays by numeric segment. Anything
/// that cannot be found is null.
pub fn navigate<'v>(value: &'v Value, path: &[String]) -> &'v Value {
    let mut current = value;

    for segment in path {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.unwrap_or(&NULL);
    }

    current
}

/// Return the keys and values of an array or object, in order.
///
/// Keys are always strings: the index for arrays, the member name for
/// objects.
/// Returns `None` for every other type.
pub fn entries(value: Value) -> Option<Vec<(Value, Value)>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (Value::String(index.to_string()), item))
                .collect(),
        ),
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(key, item)| (Value::String(key), item))
                .collect(),
        ),
        _ => None,
    }
}

/// Describe the type of the value, for use in error messages.
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{entries, is_truthy, navigate};
    use serde_json::{json, Value};

    #[test]
    fn test_is_truthy() {
        for falsy in [json!(false), json!(null), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(-1), json!(0.5), json!(" "), json!([]), json!({}), json!({"a": null})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_navigate() {
        let model = json!({"person": {"names": ["a", "b"]}});
        let path = |p: &str| p.split('.').map(String::from).collect::<Vec<_>>();

        assert_eq!(navigate(&model, &path("person.names.1")), &json!("b"));
        assert_eq!(navigate(&model, &path("person.ghost.name")), &Value::Null);
        assert_eq!(navigate(&model, &path("person.names.x")), &Value::Null);
        assert_eq!(navigate(&model, &[]), &model);
    }

    #[test]
    fn test_entries() {
        assert_eq!(
            entries(json!(["x", "y"])),
            Some(vec![(json!("0"), json!("x")), (json!("1"), json!("y"))])
        );
        assert_eq!(
            entries(json!({"b": 1, "a": 2})),
            Some(vec![(json!("b"), json!(1)), (json!("a"), json!(2))])
        );
        assert_eq!(entries(json!("text")), None);
    }
}
