//! Converting raw CLI argument strings into universal [`Value`] data.
//!
//! Ported from `parsing/cli_parser.py`'s `parse_cli_value`/`parse_cli_values`.
//! Nested updates are built as `Value::Map` trees keyed by string segments
//! (including digit-string segments for list-index patches), the same
//! convention `omniconfig_file::ConfigMerger` and
//! `omniconfig_core::node::ResolutionNode::copy_with_update` already use for
//! map-onto-list overrides — so no separate int/str key representation is
//! needed here.

use indexmap::IndexMap;
use omniconfig_core::reference::is_reference_format;
use omniconfig_core::value::Value;

use crate::error::{CliError, Result};

pub fn is_integer_key(key: &str) -> bool {
    if key.chars().all(|c| c.is_ascii_digit()) && !key.is_empty() {
        return true;
    }
    key.strip_prefix('-').is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Parse a single CLI token as JSON when possible, falling back to a plain
/// string. Reference strings pass through unchanged.
pub fn parse_cli_value(value: &str) -> Value {
    if is_reference_format(value) {
        return Value::String(value.to_string());
    }
    match value.to_lowercase().as_str() {
        "none" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(v) => v.into(),
        Err(_) => Value::String(value.to_string()),
    }
}

/// If `value` looks like a JSON object/array, parse it as a full
/// replacement (`_overwrite_` container). Objects get `_overwrite_: true`
/// stamped on them so the merger replaces rather than merges.
fn try_container_json_syntax(value: &str) -> Option<Value> {
    let looks_like_container =
        (value.starts_with('{') && value.ends_with('}')) || (value.starts_with('[') && value.ends_with(']'));
    if !looks_like_container {
        return None;
    }
    let parsed = serde_json::from_str::<serde_json::Value>(value).ok()?;
    let mut value: Value = parsed.into();
    if let Value::Map(map) = &mut value {
        map.insert("_overwrite_".to_string(), Value::Bool(true));
    }
    Some(value)
}

fn deep_get<'a>(root: &'a Value, parts: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for part in parts {
        current = current.as_map()?.get(*part)?;
    }
    Some(current)
}

fn deep_set(target: &mut Value, parts: &[&str], value: Value, flag: Option<&str>, path: &str) -> Result<()> {
    let (head, rest) = parts.split_first().expect("deep_set called with empty path");
    if rest.is_empty() {
        match target {
            Value::Map(map) => {
                map.insert(head.to_string(), value);
                Ok(())
            }
            Value::List(list) => {
                let index: usize = head
                    .parse()
                    .map_err(|_| CliError::parse(path, flag, format!("cannot use non-integer key '{head}' to update list")))?;
                let slot = list
                    .get_mut(index)
                    .ok_or_else(|| CliError::parse(path, flag, format!("index {index} out of range for list")))?;
                *slot = value;
                Ok(())
            }
            _ => Err(CliError::parse(path, flag, format!("cannot update non-container with key '{head}'"))),
        }
    } else {
        match target {
            Value::Map(map) => {
                let child = map.entry(head.to_string()).or_insert_with(|| Value::Map(IndexMap::new()));
                deep_set(child, rest, value, flag, path)
            }
            Value::List(list) => {
                let index: usize = head
                    .parse()
                    .map_err(|_| CliError::parse(path, flag, format!("cannot use non-integer key '{head}' to update list")))?;
                let child = list
                    .get_mut(index)
                    .ok_or_else(|| CliError::parse(path, flag, format!("index {index} out of range for list")))?;
                deep_set(child, rest, value, flag, path)
            }
            _ => Err(CliError::parse(path, flag, format!("cannot update non-container with key '{head}'"))),
        }
    }
}

/// Parse a flag's matched token list into universal data: a reference
/// string, a nested update map, or (when `allow_list` is set) a plain list.
pub fn parse_cli_values(values: &[String], allow_list: bool, flag: Option<&str>, path: &str) -> Result<Value> {
    let mut content = Vec::new();
    let mut updates = Value::Map(IndexMap::new());
    let mut update_parts: Vec<Vec<String>> = Vec::new();
    let mut references: Vec<String> = Vec::new();
    let mut overwrite: Option<Value> = None;
    let mut duplicate_keys: Vec<String> = Vec::new();
    let mut num_pairs = 0usize;

    for item in values {
        if is_reference_format(item) {
            references.push(item.clone());
            continue;
        }
        if let Some(container) = try_container_json_syntax(item) {
            if overwrite.is_some() {
                return Err(CliError::parse(path, flag, "multiple JSON container syntax found"));
            }
            overwrite = Some(container);
            continue;
        }
        if let Some((key, raw_value)) = item.split_once('=') {
            let parts: Vec<String> = key.split('.').map(String::from).collect();
            let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            if deep_get(&updates, &part_refs).is_some() {
                duplicate_keys.push(key.to_string());
            }
            let value = try_container_json_syntax(raw_value).unwrap_or_else(|| parse_cli_value(raw_value));
            deep_set(&mut updates, &part_refs, value, flag, path)?;
            update_parts.push(parts);
            num_pairs += 1;
        }
        content.push(parse_cli_value(item));
    }

    if references.len() == values.len() {
        if references.len() == 1 {
            return Ok(Value::String(references.into_iter().next().unwrap()));
        }
        if !allow_list {
            return Err(CliError::parse(path, flag, "multiple reference strings not allowed here"));
        }
        return Ok(Value::List(references.into_iter().map(Value::String).collect()));
    }

    if let Some(mut overwrite_value) = overwrite {
        if !references.is_empty() {
            return Err(CliError::parse(path, flag, "cannot have both reference and JSON container; write reference inside JSON"));
        }
        if num_pairs + 1 != values.len() {
            return Err(CliError::parse(path, flag, "cannot have both JSON container and non key=value values"));
        }
        if !duplicate_keys.is_empty() {
            return Err(CliError::parse(path, flag, format!("duplicate keys found: {}", duplicate_keys.join(", "))));
        }
        for parts in &update_parts {
            if parts.first().map(String::as_str) == Some("_overwrite_") {
                return Err(CliError::parse(path, flag, "cannot use '_overwrite_' as a key if a JSON container is used"));
            }
            let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            let leaf = deep_get(&updates, &part_refs).expect("just inserted").clone();
            deep_set(&mut overwrite_value, &part_refs, leaf, flag, path)?;
        }
        return Ok(overwrite_value);
    }

    if !references.is_empty() {
        let has_reference_key = matches!(&updates, Value::Map(m) if m.contains_key("_reference_"));
        if references.len() > 1 || has_reference_key {
            return Err(CliError::parse(path, flag, "multiple reference strings found"));
        }
        if num_pairs + 1 != values.len() {
            return Err(CliError::parse(path, flag, "cannot have both reference and non key=value values"));
        }
        if !duplicate_keys.is_empty() {
            return Err(CliError::parse(path, flag, format!("duplicate keys found: {}", duplicate_keys.join(", "))));
        }
        if num_pairs == 0 {
            return Ok(Value::String(references.into_iter().next().unwrap()));
        }
        if let Value::Map(m) = &mut updates {
            m.insert("_reference_".to_string(), Value::String(references.into_iter().next().unwrap()));
        }
        return Ok(updates);
    }

    if num_pairs == values.len() {
        if !duplicate_keys.is_empty() {
            return Err(CliError::parse(path, flag, format!("duplicate keys found: {}", duplicate_keys.join(", "))));
        }
        return Ok(updates);
    }

    if !allow_list {
        if content.len() > 1 {
            return Err(CliError::parse(path, flag, "multiple values not allowed here"));
        }
        return Ok(content.into_iter().next().unwrap_or(Value::Null));
    }
    Ok(Value::List(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_primitive_tokens() {
        assert_eq!(parse_cli_value("128"), Value::Int(128));
        assert_eq!(parse_cli_value("true"), Value::Bool(true));
        assert_eq!(parse_cli_value("none"), Value::Null);
        assert_eq!(parse_cli_value("hello"), Value::String("hello".to_string()));
        assert_eq!(parse_cli_value("::a"), Value::String("::a".to_string()));
    }

    #[test]
    fn builds_nested_update_map() {
        let values = vec!["a.b=1".to_string(), "a.c=2".to_string()];
        let result = parse_cli_values(&values, false, None, "").unwrap();
        let a = result.as_map().unwrap().get("a").unwrap().as_map().unwrap();
        assert_eq!(a.get("b"), Some(&Value::Int(1)));
        assert_eq!(a.get("c"), Some(&Value::Int(2)));
    }

    #[test]
    fn single_reference_passes_through() {
        let values = vec!["::scope::field".to_string()];
        let result = parse_cli_values(&values, false, None, "").unwrap();
        assert_eq!(result, Value::String("::scope::field".to_string()));
    }

    #[test]
    fn json_container_merges_key_value_overrides() {
        let values = vec![r#"{"x": 1}"#.to_string(), "y=2".to_string()];
        let result = parse_cli_values(&values, false, None, "").unwrap();
        let map = result.as_map().unwrap();
        assert_eq!(map.get("x"), Some(&Value::Int(1)));
        assert_eq!(map.get("y"), Some(&Value::Int(2)));
        assert_eq!(map.get("_overwrite_"), Some(&Value::Bool(true)));
    }

    #[test]
    fn plain_values_become_list_when_allowed() {
        let values = vec!["1".to_string(), "2".to_string()];
        let result = parse_cli_values(&values, true, None, "").unwrap();
        assert_eq!(result, Value::List(vec![Value::Int(1), Value::Int(2)]));
    }
}
