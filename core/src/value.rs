//! Tagged dynamic value, standing in for the source language's native
//! dynamic typing (spec design note: "dynamic typing → tagged variants").

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A dynamically-typed configuration value. Mirrors the closed set a raw
/// (not-yet-factoried) node's content may hold, plus the explicit `Any`
/// terminator used by the type chain machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(_) => f.write_str("[...]"),
            Value::Map(_) => f.write_str("{...}"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(x) => serde_json::Number::from_f64(x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => serde_json::Value::Array(items.into_iter().map(Into::into).collect()),
            Value::Map(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// The result of applying a type chain to a node's raw content.
///
/// `Value` covers raw, not-yet-typed data; `Factoried` covers the engine's
/// output once the Factory System has coerced that data into a concrete
/// typed value. Records and custom scalars are held as `Arc<dyn Any>`
/// (rather than `Box`) because the Factory System needs to read an
/// already-factoried child's value to build its parent without consuming
/// it — the child node keeps its own value live for later reference
/// resolution and splitting.
#[derive(Clone)]
pub enum Factoried {
    Scalar(Value),
    Record(&'static str, Arc<dyn Any + Send + Sync>),
    Custom(&'static str, Arc<dyn Any + Send + Sync>),
    List(Vec<Factoried>),
    Map(IndexMap<String, Factoried>),
}

impl Factoried {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Factoried::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Factoried::Record(_, arc) | Factoried::Custom(_, arc) => arc.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Factoried {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factoried::Scalar(v) => write!(f, "Scalar({v:?})"),
            Factoried::Record(id, _) => write!(f, "Record({id})"),
            Factoried::Custom(id, _) => write!(f, "Custom({id})"),
            Factoried::List(items) => write!(f, "List({items:?})"),
            Factoried::Map(map) => write!(f, "Map({map:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrips_through_json() {
        let json = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let value = Value::from(json.clone());
        let back: serde_json::Value = value.into();
        assert_eq!(back, json);
    }
}
