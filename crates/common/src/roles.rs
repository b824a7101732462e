//! Role extraction from token claims.
//!
//! Identity providers put roles in different places (`roles`,
//! `realm_access.roles`, `resource_access.<client>.roles`), so the location
//! is a configurable dot-separated path. Numeric segments index into arrays.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Extract the role set at `path` from `claims`.
///
/// - An array yields its string elements; non-strings are skipped
/// - A string is split on spaces, dropping empty pieces
/// - Anything else, a missing path or an empty path yields an empty set
#[must_use]
pub fn extract_roles(claims: &Map<String, Value>, path: &str) -> BTreeSet<String> {
    if path.is_empty() {
        return BTreeSet::new();
    }

    match resolve_path(claims, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(' ')
            .filter(|piece| !piece.is_empty())
            .map(ToString::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

fn resolve_path<'a>(claims: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = claims.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("test claims must be an object")
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_nested_array_path() {
        let claims = claims(json!({
            "resource_access": {"kafka": {"roles": ["producer", "consumer"]}}
        }));

        assert_eq!(
            extract_roles(&claims, "resource_access.kafka.roles"),
            set(&["consumer", "producer"])
        );
    }

    #[test]
    fn test_top_level_string_is_split_on_spaces() {
        let claims = claims(json!({"roles": "admin  ops "}));
        assert_eq!(extract_roles(&claims, "roles"), set(&["admin", "ops"]));
    }

    #[test]
    fn test_non_string_array_elements_are_skipped() {
        let claims = claims(json!({"roles": ["admin", 7, null, {"x": 1}, "ops"]}));
        assert_eq!(extract_roles(&claims, "roles"), set(&["admin", "ops"]));
    }

    #[test]
    fn test_array_index_segment() {
        let claims = claims(json!({"groups": [{"roles": ["first"]}, {"roles": ["second"]}]}));
        assert_eq!(extract_roles(&claims, "groups.1.roles"), set(&["second"]));
        assert!(extract_roles(&claims, "groups.5.roles").is_empty());
        assert!(extract_roles(&claims, "groups.x.roles").is_empty());
    }

    #[test]
    fn test_missing_or_unsupported_values_are_empty() {
        let claims = claims(json!({"roles": 42, "flag": true, "obj": {"a": 1}}));

        assert!(extract_roles(&claims, "roles").is_empty());
        assert!(extract_roles(&claims, "flag").is_empty());
        assert!(extract_roles(&claims, "obj").is_empty());
        assert!(extract_roles(&claims, "absent").is_empty());
        assert!(extract_roles(&claims, "roles.deeper").is_empty());
    }

    #[test]
    fn test_empty_path_is_empty() {
        let claims = claims(json!({"": ["ghost"], "roles": ["admin"]}));
        assert!(extract_roles(&claims, "").is_empty());
    }

    proptest! {
        #[test]
        fn prop_string_roles_never_contain_empty_or_spaces(joined in "[a-z ]{0,40}") {
            let claims = claims(json!({"roles": joined}));
            for role in extract_roles(&claims, "roles") {
                prop_assert!(!role.is_empty());
                prop_assert!(!role.contains(' '));
            }
        }
    }
}
