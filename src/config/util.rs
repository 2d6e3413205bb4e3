//! Serde helpers shared by the profile model and the kernel document.
//!
//! These are used with serde's `skip_serializing_if`, `default` and
//! `deserialize_with` attributes.

use serde::{Deserialize, Deserializer};

// ============================================================================
// Boolean Helpers
// ============================================================================

/// Returns `true` if the boolean value is `false`.
///
/// Used with `#[serde(skip_serializing_if = "is_false")]` to omit false values.
#[inline]
pub fn is_false(b: &bool) -> bool {
    !*b
}

/// Serde default for flags that start enabled.
#[inline]
pub fn default_true() -> bool {
    true
}

// ============================================================================
// Numeric Zero Helpers
// ============================================================================

#[inline]
pub fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

// ============================================================================
// String or Vec Deserializer
// ============================================================================

/// Accepts either `"value"` or `["a", "b"]` for list fields.
///
/// Hand-written profiles frequently use the single-string form for rule
/// predicates such as `"target_ips": "geoip:private"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrVec {
    Single(String),
    Multiple(Vec<String>),
}

/// Deserializes a field that can be either a single string or an array of strings.
///
/// Use with `#[serde(default, deserialize_with = "string_or_vec")]`
pub fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<StringOrVec> = Option::deserialize(deserializer)?;
    match opt {
        Some(StringOrVec::Single(s)) => Ok(vec![s]),
        Some(StringOrVec::Multiple(v)) => Ok(v),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "super::string_or_vec")]
        values: Vec<String>,
    }

    #[test]
    fn test_flag_helpers() {
        assert!(is_false(&false));
        assert!(!is_false(&true));
        assert!(default_true());
        assert!(is_zero_u32(&0));
        assert!(!is_zero_u32(&7));
    }

    #[test]
    fn test_string_or_vec_single() {
        let result: Holder = serde_json::from_str(r#"{"values": "geoip:cn"}"#).unwrap();
        assert_eq!(result.values, vec!["geoip:cn"]);
    }

    #[test]
    fn test_string_or_vec_multiple() {
        let result: Holder = serde_json::from_str(r#"{"values": ["a", "b"]}"#).unwrap();
        assert_eq!(result.values, vec!["a", "b"]);
    }

    #[test]
    fn test_string_or_vec_missing_or_null() {
        let missing: Holder = serde_json::from_str("{}").unwrap();
        assert!(missing.values.is_empty());
        let null: Holder = serde_json::from_str(r#"{"values": null}"#).unwrap();
        assert!(null.values.is_empty());
    }
}
