//! # JSON
//!
//! Parsing goes through simd-json, serialization through serde_json.
//! Used by the `json` column cast and by mapper serialization.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parse JSON text into a typed value using simd-json
///
/// simd-json parses in place, so the text is copied into a scratch buffer.
///
/// # Errors
///
/// Returns `Error::JsonParse` if the text is not valid JSON for `T`.
pub fn parse_json<T: DeserializeOwned>(json_str: &str) -> Result<T> {
    let mut bytes = json_str.as_bytes().to_vec();

    simd_json::from_slice(&mut bytes).map_err(|e| Error::JsonParse {
        reason: e.to_string(),
    })
}

/// Serialize a value to a JSON string
///
/// # Errors
///
/// Returns `Error::Json` if the value cannot be represented as JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Serialize a value to a pretty-printed JSON string
///
/// # Errors
///
/// Returns `Error::Json` if the value cannot be represented as JSON.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_parse_json_structure() {
        let value: serde_json::Value = parse_json(r#"{"tags": ["a", "b"], "n": 3}"#).unwrap();
        assert_eq!(value["tags"][1], "b");
        assert_eq!(value["n"], 3);
    }

    #[test]
    fn test_to_json_keeps_insertion_order() {
        let mut row = IndexMap::new();
        row.insert("id", serde_json::json!(1));
        row.insert("name", serde_json::json!("foo"));
        row.insert("hint", serde_json::Value::Null);

        assert_eq!(to_json(&row).unwrap(), r#"{"id":1,"name":"foo","hint":null}"#);
        assert!(to_json_pretty(&row).unwrap().contains('\n'));
    }

    #[test]
    fn test_invalid_json() {
        let result: Result<serde_json::Value> = parse_json("not valid json");
        assert!(matches!(result, Err(Error::JsonParse { .. })));
    }
}
