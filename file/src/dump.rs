//! Serializing defaults to disk.
//!
//! Ported from `core/utils.py`'s `dumps_to_yaml`/`dumps_to_json`.

use std::fs;
use std::path::Path;

use omniconfig_core::value::Value;

use crate::error::{FileError, Result};

/// Render `value` as YAML, optionally writing it to `path` (which must end
/// in `.yaml` or `.yml`).
pub fn dumps_to_yaml(value: &Value, path: Option<&Path>) -> Result<String> {
    let json: serde_json::Value = value.clone().into();
    let s = serde_yaml::to_string(&json)
        .map_err(|e| FileError::Parse { path: "<yaml>".to_string(), message: e.to_string() })?;
    if let Some(path) = path {
        let ok = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e == "yaml" || e == "yml");
        if !ok {
            return Err(FileError::UnsupportedType("path must end with .yaml or .yml".to_string()));
        }
        fs::write(path, &s).map_err(|source| FileError::Io { path: path.display().to_string(), source })?;
    }
    Ok(s)
}

/// Render `value` as JSON, optionally writing it to `path` (which must end
/// in `.json` or `.jsonl`).
pub fn dumps_to_json(value: &Value, path: Option<&Path>, indent: usize) -> Result<String> {
    let json: serde_json::Value = value.clone().into();
    let buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(" ".repeat(indent).as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(buf, formatter);
    use serde::Serialize;
    json.serialize(&mut ser).map_err(|e| FileError::Parse { path: "<json>".to_string(), message: e.to_string() })?;
    let s = String::from_utf8(ser.into_inner()).expect("serde_json emits valid utf-8");
    if let Some(path) = path {
        let ok = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e == "json" || e == "jsonl");
        if !ok {
            return Err(FileError::UnsupportedType("path must end with .json or .jsonl".to_string()));
        }
        fs::write(path, &s).map_err(|source| FileError::Io { path: path.display().to_string(), source })?;
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dumps_json_with_indent() {
        let map: indexmap::IndexMap<String, Value> = [("a".to_string(), Value::Int(1))].into_iter().collect();
        let value = Value::Map(map);
        let s = dumps_to_json(&value, None, 2).unwrap();
        assert_eq!(s, "{\n  \"a\": 1\n}");
    }
}
