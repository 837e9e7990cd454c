//! Factory System: turns a node's raw content into a typed [`Factoried`]
//! value by trying its candidate type chains in order.
//!
//! Ported from `resolution/factory.py`.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::node::{NodeContent, ResolutionNode};
use crate::types::{DeclaredType, TypeChain, TypeInfo, TypeSystem};
use crate::value::{Factoried, Value};

/// Apply factories bottom-up: children are factoried before their parent,
/// since a parent's builder needs its children's already-typed values.
pub fn apply(node: &mut ResolutionNode, type_system: &TypeSystem) -> Result<()> {
    if node.is_factoried() {
        return Ok(());
    }
    if node.is_reference() {
        return Err(Error::factory(node.name.clone(), format!("cannot apply factory to reference node '{}'", node.name)));
    }

    match &mut node.content {
        NodeContent::Map(map) => {
            for child in map.values_mut() {
                apply(child, type_system)?;
            }
        }
        NodeContent::List(list) => {
            for child in list.iter_mut() {
                apply(child, type_system)?;
            }
        }
        NodeContent::Scalar(_) => {}
    }

    let value = node.materialize(true);

    if node.type_chains.is_empty() {
        node.value = Some(value);
        return Ok(());
    }

    let mut last_error: Option<Error> = None;
    let mut any_chain: Option<TypeChain> = None;
    for type_chain in node.type_chains.clone() {
        if type_chain.is_empty() {
            continue;
        }
        if type_chain.last().map(|ti| &ti.declared) == Some(&DeclaredType::Any) {
            any_chain = Some(type_chain);
            continue;
        }
        match apply_type_chain(value.clone(), &type_chain, &node.name, type_system) {
            Ok(result) => {
                node.value = Some(result);
                node.type_chains = vec![type_chain];
                return Ok(());
            }
            Err(e) => last_error = Some(e),
        }
    }

    if let Some(err) = last_error {
        if any_chain.is_none() {
            return Err(Error::factory(node.name.clone(), format!("failed to apply any type chain: {err}")));
        }
    }

    node.value = Some(value);
    node.type_chains = any_chain.map(|c| vec![c]).unwrap_or_default();
    Ok(())
}

/// Apply a type chain right-to-left, progressively transforming `value`.
fn apply_type_chain(mut value: Factoried, type_chain: &TypeChain, name: &str, type_system: &TypeSystem) -> Result<Factoried> {
    for type_info in type_chain.iter().rev() {
        value = match &type_info.custom {
            Some(custom) => {
                let raw = factoried_to_raw_value(&value, name)?;
                let built = (custom.factory)(&raw).map_err(|e| {
                    Error::factory(name.to_string(), format!("custom factory failed for '{:?}': {e}", type_info.declared))
                })?;
                Factoried::Custom(custom_name(type_info), built)
            }
            None => apply_builtin_type(value, &type_info.declared, name, type_system)?,
        };
    }
    Ok(value)
}

fn custom_name(type_info: &TypeInfo) -> &'static str {
    match &type_info.declared {
        DeclaredType::Custom(name) => name,
        _ => "custom",
    }
}

fn factoried_to_raw_value(value: &Factoried, name: &str) -> Result<Value> {
    match value {
        Factoried::Scalar(v) => Ok(v.clone()),
        Factoried::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(factoried_to_raw_value(item, name)?);
            }
            Ok(Value::List(out))
        }
        Factoried::Map(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), factoried_to_raw_value(v, name)?);
            }
            Ok(Value::Map(out))
        }
        Factoried::Record(_, _) | Factoried::Custom(_, _) => Err(Error::factory(
            name.to_string(),
            "cannot apply a custom factory to an already-typed value",
        )),
    }
}

fn apply_builtin_type(value: Factoried, target: &DeclaredType, name: &str, type_system: &TypeSystem) -> Result<Factoried> {
    if matches!(value, Factoried::Scalar(Value::Null)) {
        return Ok(Factoried::Scalar(Value::Null));
    }
    if *target == DeclaredType::Any {
        return Ok(value);
    }
    match target {
        DeclaredType::Bool | DeclaredType::Int | DeclaredType::Float | DeclaredType::String => {
            convert_primitive(value, target, name)
        }
        DeclaredType::Enum(def) => convert_enum(value, def, name),
        DeclaredType::Record(id) => {
            let Factoried::Map(map) = value else {
                return Err(Error::factory(name.to_string(), format!("cannot create record '{id}' from non-map value")));
            };
            let built = type_system.build_record(id, &map, name)?;
            Ok(Factoried::Record(id, built))
        }
        DeclaredType::List(_) | DeclaredType::Set(_) | DeclaredType::Tuple(_) => match value {
            Factoried::List(_) => Ok(value),
            _ => Err(Error::factory(name.to_string(), "cannot create list-like value from non-list content")),
        },
        DeclaredType::Map(_) => match value {
            Factoried::Map(_) => Ok(value),
            _ => Err(Error::factory(name.to_string(), "cannot create map value from non-map content")),
        },
        DeclaredType::Null => match value {
            Factoried::Scalar(Value::Null) => Ok(value),
            _ => Err(Error::factory(name.to_string(), "expected null value")),
        },
        DeclaredType::Union(_) | DeclaredType::Custom(_) | DeclaredType::Any => Ok(value),
    }
}

fn convert_primitive(value: Factoried, target: &DeclaredType, name: &str) -> Result<Factoried> {
    let Factoried::Scalar(v) = value else {
        return Err(Error::factory(name.to_string(), "expected a scalar value for a primitive field"));
    };
    let converted = match (target, &v) {
        (DeclaredType::Bool, Value::Bool(_)) => v,
        (DeclaredType::Bool, Value::String(s)) => match s.to_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            _ => return Err(Error::factory(name.to_string(), format!("cannot convert '{s}' to bool"))),
        },
        (DeclaredType::Bool, Value::Int(i)) => Value::Bool(*i != 0),
        (DeclaredType::Bool, Value::Float(f)) => Value::Bool(*f != 0.0),
        (DeclaredType::Int, Value::Int(_)) => v,
        (DeclaredType::Int, Value::String(s)) => Value::Int(
            s.parse::<i64>().map_err(|e| Error::factory(name.to_string(), format!("cannot convert '{s}' to int: {e}")))?,
        ),
        (DeclaredType::Int, Value::Float(f)) => Value::Int(*f as i64),
        (DeclaredType::Int, Value::Bool(b)) => Value::Int(*b as i64),
        (DeclaredType::Float, Value::Float(_)) => v,
        (DeclaredType::Float, Value::Int(i)) => Value::Float(*i as f64),
        (DeclaredType::Float, Value::String(s)) => Value::Float(
            s.parse::<f64>().map_err(|e| Error::factory(name.to_string(), format!("cannot convert '{s}' to float: {e}")))?,
        ),
        (DeclaredType::String, Value::String(_)) => v,
        (DeclaredType::String, other) => Value::String(other.to_string()),
        _ => return Err(Error::factory(name.to_string(), format!("cannot convert {} to {target:?}", v.type_name()))),
    };
    Ok(Factoried::Scalar(converted))
}

fn convert_enum(value: Factoried, def: &crate::types::EnumDef, name: &str) -> Result<Factoried> {
    let Factoried::Scalar(Value::String(s)) = &value else {
        return Err(Error::factory(name.to_string(), format!("cannot convert non-string value to enum '{}'", def.name)));
    };
    if def.variants.contains(&s.as_str()) {
        Ok(value)
    } else {
        Err(Error::factory(name.to_string(), format!("'{s}' is not a variant of enum '{}'", def.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ResolutionNode;
    use crate::reference::{Path, Segment};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn factories_primitive_field_in_place() {
        let ts = TypeSystem::new();
        let mut type_infos = BTreeMap::new();
        type_infos.insert(Vec::<Segment>::new(), TypeInfo::plain(DeclaredType::Int));
        let data = Value::String("42".to_string());
        let mut node = ResolutionNode::build(&data, &type_infos, &[], &[], &ts).unwrap();
        apply(&mut node, &ts).unwrap();
        assert_eq!(node.value.unwrap().as_scalar().unwrap(), &Value::Int(42));
    }

    #[test]
    fn any_chain_passes_value_through_unchanged() {
        let ts = TypeSystem::new();
        let mut node =
            ResolutionNode::new(NodeContent::Scalar(Value::Bool(true)), None, vec![vec![TypeInfo::plain(DeclaredType::Any)]], Path::root())
                .unwrap();
        apply(&mut node, &ts).unwrap();
        assert_eq!(node.value.unwrap().as_scalar().unwrap(), &Value::Bool(true));
    }
}
