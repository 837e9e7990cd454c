//! Layered config merging.
//!
//! Ported from `parsing/merger.py`.

use indexmap::IndexMap;
use omniconfig_core::reference::{is_reference_format, path_to_reference, Segment};
use omniconfig_core::value::Value;

use crate::error::{FileError, Result};

pub struct ConfigMerger;

impl ConfigMerger {
    /// Merge configs in priority order: later configs override earlier ones.
    pub fn merge(configs: &[Value]) -> Result<Value> {
        let mut non_empty = configs.iter().filter(|v| !is_empty(v));
        let Some(first) = non_empty.next() else { return Ok(Value::Map(IndexMap::new())) };
        let mut result = first.clone();
        for config in non_empty {
            result = merge_values(&result, config, &[])?;
        }
        Ok(result)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Map(m) => m.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

fn merge_values(base: &Value, override_value: &Value, path: &[Segment]) -> Result<Value> {
    if let Value::String(s) = override_value {
        if is_reference_format(s) {
            return Ok(override_value.clone());
        }
    }

    if let Value::Map(override_map) = override_value {
        let wants_overwrite = matches!(override_map.get("_overwrite_"), Some(Value::Bool(true)));
        if wants_overwrite || override_map.contains_key("_reference_") {
            let mut result = override_map.clone();
            result.shift_remove("_overwrite_");
            return Ok(Value::Map(result));
        }

        if let Value::Map(base_map) = base {
            let mut result = base_map.clone();
            for (key, value) in override_map {
                if key == "_overwrite_" {
                    continue;
                }
                let mut child_path = path.to_vec();
                child_path.push(Segment::Key(key.clone()));
                match result.get(key) {
                    Some(existing) => {
                        result.insert(key.clone(), merge_values(existing, value, &child_path)?);
                    }
                    None => {
                        result.insert(key.clone(), value.clone());
                    }
                }
            }
            return Ok(Value::Map(result));
        }

        if let Value::List(base_list) = base {
            let mut result = base_list.clone();
            for (key, value) in override_map {
                if key == "_overwrite_" {
                    continue;
                }
                let index: usize = key.parse().map_err(|_| FileError::Merge {
                    path: path_to_reference(path),
                    message: format!("invalid list key '{key}'"),
                })?;
                if index >= result.len() {
                    return Err(FileError::Merge {
                        path: path_to_reference(path),
                        message: format!("list index {index} out of range"),
                    });
                }
                let mut child_path = path.to_vec();
                child_path.push(Segment::Index(index));
                result[index] = merge_values(&result[index], value, &child_path)?;
            }
            return Ok(Value::List(result));
        }
    }

    Ok(override_value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn merges_maps_recursively() {
        let base = map(&[("a", Value::Int(1)), ("b", map(&[("x", Value::Int(1))]))]);
        let over = map(&[("b", map(&[("y", Value::Int(2))]))]);
        let merged = ConfigMerger::merge(&[base, over]).unwrap();
        let m = merged.as_map().unwrap();
        assert_eq!(m.get("a"), Some(&Value::Int(1)));
        let b = m.get("b").unwrap().as_map().unwrap();
        assert_eq!(b.get("x"), Some(&Value::Int(1)));
        assert_eq!(b.get("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn overwrite_flag_replaces_base() {
        let base = map(&[("b", map(&[("x", Value::Int(1))]))]);
        let over = map(&[("b", map(&[("_overwrite_", Value::Bool(true)), ("y", Value::Int(2))]))]);
        let merged = ConfigMerger::merge(&[base, over]).unwrap();
        let b = merged.as_map().unwrap().get("b").unwrap().as_map().unwrap();
        assert_eq!(b.get("x"), None);
        assert_eq!(b.get("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn reference_string_replaces_base_entirely() {
        let base = map(&[("a", Value::Int(1))]);
        let over = Value::String("::other".to_string());
        let merged = ConfigMerger::merge(&[base, over.clone()]).unwrap();
        assert_eq!(merged, over);
    }

    #[test]
    fn out_of_range_list_index_errors() {
        let base = map(&[("a", Value::List(vec![Value::Int(1)]))]);
        let over = map(&[("a", map(&[("5", Value::Int(9))]))]);
        assert!(matches!(ConfigMerger::merge(&[base, over]), Err(FileError::Merge { .. })));
    }
}
