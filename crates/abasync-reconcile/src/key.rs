//! Join keys and field fallbacks over schema-less rows.

pub use abasync_core::is_blank;
use abasync_core::ReportRow;
use serde_json::Value;

/// String form of a join key.
///
/// Strings are trimmed, integral numbers lose their fraction (`123.0` and
/// `123` both give `"123"`). Null, empty strings and nested values yield no
/// key.
#[must_use]
pub fn normalize_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.is_finite() && f.fract() == 0.0 {
                        format!("{f:.0}")
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Normalized key of `field` in `row`, if present and usable.
#[must_use]
pub fn row_key(row: &ReportRow, field: &str) -> Option<String> {
    row.get(field).and_then(normalize_key)
}


/// First non-blank value among `candidates`, in order.
#[must_use]
pub fn first_non_blank<'a>(row: &'a ReportRow, candidates: &[String]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|field| row.get(field))
        .find(|value| !is_blank(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(&json!(" 42 ")), Some("42".into()));
        assert_eq!(normalize_key(&json!(42)), Some("42".into()));
        assert_eq!(normalize_key(&json!(42.0)), Some("42".into()));
        assert_eq!(normalize_key(&json!(4.5)), Some("4.5".into()));
        assert_eq!(normalize_key(&json!("")), None);
        assert_eq!(normalize_key(&json!("   ")), None);
        assert_eq!(normalize_key(&Value::Null), None);
        assert_eq!(normalize_key(&json!([1])), None);
    }

    #[test]
    fn test_first_non_blank() {
        let row = json!({"TEL": "", "TEL2": null, "NATEL": "079 123 45 67"});
        let row = row.as_object().unwrap();
        let candidates = vec!["TEL".to_string(), "TEL2".to_string(), "NATEL".to_string()];

        assert_eq!(
            first_non_blank(row, &candidates),
            Some(&json!("079 123 45 67"))
        );
        assert_eq!(first_non_blank(row, &candidates[..2]), None);
    }
}
