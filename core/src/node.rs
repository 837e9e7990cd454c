//! Resolution tree nodes.
//!
//! A node keeps its raw tree shape (`content`) and its factoried value
//! (`value`) separate, so resolution never mutates the data a reference
//! points at. Ported from `resolution/node.py`.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::reference::{is_reference_format, path_to_reference, Path, Segment};
use crate::types::{try_prune_type_chains, DeclaredType, TypeChain, TypeInfo, TypeSystem};
use crate::value::{Factoried, Value};

/// The tree-shaped part of a node: primitives, a map of child nodes, or a
/// list of child nodes.
#[derive(Debug, Clone)]
pub enum NodeContent {
    Scalar(Value),
    Map(IndexMap<String, ResolutionNode>),
    List(Vec<ResolutionNode>),
}

/// One node of the resolution tree.
#[derive(Debug, Clone)]
pub struct ResolutionNode {
    pub content: NodeContent,
    /// The reference string this node points at, if it is a reference.
    pub reference: Option<String>,
    /// The factoried value, once the Factory System has run.
    pub value: Option<Factoried>,
    pub type_chains: Vec<TypeChain>,
    pub path: Path,
    pub name: String,
    pub aliases: std::collections::BTreeSet<String>,
    /// The reference path this node was resolved from, if any.
    pub resolved: Option<String>,
}

impl ResolutionNode {
    pub fn new(content: NodeContent, reference: Option<String>, type_chains: Vec<TypeChain>, path: Path) -> Result<Self> {
        let name = path.to_reference();
        if let Some(r) = &reference {
            if !is_reference_format(r) {
                return Err(Error::reference(name.clone(), format!("invalid reference format: {r}")));
            }
            if r.starts_with(&name) {
                return Err(Error::reference(
                    name.clone(),
                    format!("reference '{r}' cannot start with its own name '{name}'"),
                ));
            }
        }
        Ok(ResolutionNode {
            content,
            reference,
            value: None,
            type_chains,
            path,
            name,
            aliases: std::collections::BTreeSet::new(),
            resolved: None,
        })
    }

    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn is_factoried(&self) -> bool {
        self.value.is_some()
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(name)
    }

    /// Collect every reference string reachable from this node.
    pub fn get_references(&self) -> std::collections::BTreeSet<String> {
        let mut refs = std::collections::BTreeSet::new();
        if let Some(r) = &self.reference {
            refs.insert(r.clone());
        }
        match &self.content {
            NodeContent::Map(map) => {
                for child in map.values() {
                    refs.extend(child.get_references());
                }
            }
            NodeContent::List(list) => {
                for child in list {
                    refs.extend(child.get_references());
                }
            }
            NodeContent::Scalar(_) => {}
        }
        refs
    }

    /// Resolve this reference node against its (already-resolved) target,
    /// returning the node that should take this node's place.
    pub fn resolve_reference(&self, target_node: &ResolutionNode) -> Result<ResolutionNode> {
        let reference = self.reference.as_ref().ok_or_else(|| {
            Error::reference(self.name.clone(), "cannot resolve reference on a non-reference node")
        })?;
        if self.is_factoried() {
            return Err(Error::reference(
                self.name.clone(),
                "cannot resolve reference on a node that has already been factoried",
            ));
        }
        if !target_node.matches_name(reference) {
            return Err(Error::reference(
                self.name.clone(),
                format!(
                    "target path '{}' does not match reference path '{reference}'",
                    target_node.path
                ),
            ));
        }
        if target_node.is_reference() {
            return Err(Error::reference(
                self.name.clone(),
                "cannot resolve reference to a target node that is also a reference",
            ));
        }
        let NodeContent::Map(self_map) = &self.content else {
            let mut resolved = target_node.clone();
            resolved.aliases.insert(self.name.clone());
            return Ok(resolved);
        };
        let update_count = self_map.len()
            - self_map.contains_key("_reference_") as usize
            - self_map.contains_key("_overwrite_") as usize;
        if update_count == 0 {
            let mut resolved = target_node.clone();
            resolved.aliases.insert(self.name.clone());
            return Ok(resolved);
        }
        // self.content is a dict with real update keys beyond this point
        // (the shortcuts above already returned), so copy_with_update always
        // builds a fresh node here rather than handing back target_node.
        let mut resolved_node = target_node.copy_with_update(self)?;
        resolved_node.resolved = Some(reference.clone());
        Ok(resolved_node)
    }

    /// Apply `update_node`'s content as an override on top of `self`,
    /// recursively merging at the node-tree level (distinct from
    /// `ConfigMerger`, which operates on raw data before nodes exist).
    pub fn copy_with_update(&self, update_node: &ResolutionNode) -> Result<ResolutionNode> {
        let NodeContent::Map(update_map) = &update_node.content else {
            if update_node.is_reference() {
                return Err(Error::reference(
                    update_node.name.clone(),
                    "cannot apply a reference node as an update",
                ));
            }
            return Ok(update_node.clone());
        };
        let update_count = update_map.len()
            - update_map.contains_key("_reference_") as usize
            - update_map.contains_key("_overwrite_") as usize;
        if update_count == 0 {
            if update_node.is_reference() {
                return Err(Error::reference(
                    update_node.name.clone(),
                    "cannot apply a reference node as an update",
                ));
            }
            return Ok(update_node.clone());
        }
        let new_content = match &self.content {
            NodeContent::Map(self_map) => {
                let mut new_map = IndexMap::new();
                for (key, value) in self_map {
                    if key == "_reference_" || key == "_overwrite_" {
                        continue;
                    }
                    match update_map.get(key) {
                        None => {
                            let mut value = value.clone();
                            value.aliases.insert(path_to_reference(&update_node.path.child(key.clone()).0));
                            new_map.insert(key.clone(), value);
                        }
                        Some(update_child) => {
                            new_map.insert(key.clone(), value.copy_with_update(update_child)?);
                        }
                    }
                }
                for (key, value) in update_map {
                    if key == "_reference_" || key == "_overwrite_" {
                        continue;
                    }
                    if !self_map.contains_key(key) {
                        new_map.insert(key.clone(), value.clone());
                    }
                }
                NodeContent::Map(new_map)
            }
            NodeContent::List(self_list) => {
                let mut new_list = Vec::new();
                for (index, value) in self_list.iter().enumerate() {
                    let update_child = update_map.get(&index.to_string());
                    match update_child {
                        None => {
                            let mut value = value.clone();
                            value.aliases.insert(path_to_reference(&update_node.path.child(index).0));
                            new_list.push(value);
                        }
                        Some(update_child) => {
                            new_list.push(value.copy_with_update(update_child)?);
                        }
                    }
                }
                let start_index = new_list.len();
                let max_index = update_map
                    .keys()
                    .filter(|k| k.as_str() != "_reference_" && k.as_str() != "_overwrite_")
                    .filter_map(|k| k.parse::<usize>().ok())
                    .max();
                if let Some(max_index) = max_index {
                    for index in start_index..=max_index {
                        let Some(update_child) = update_map.get(&index.to_string()) else {
                            return Err(Error::reference(
                                update_node.name.clone(),
                                format!("key {index} not found in node content"),
                            ));
                        };
                        new_list.push(update_child.clone());
                    }
                }
                NodeContent::List(new_list)
            }
            NodeContent::Scalar(_) => return Ok(update_node.clone()),
        };
        Ok(ResolutionNode {
            content: new_content,
            reference: None,
            value: None,
            type_chains: update_node.type_chains.clone(),
            path: update_node.path.clone(),
            name: update_node.name.clone(),
            aliases: update_node.aliases.clone(),
            resolved: None,
        })
    }

    /// Materialize this node tree into a [`Factoried`] value. When
    /// `after_factory` is true and a node already has a factoried value,
    /// that value is reused in place rather than rebuilt from raw
    /// content — this is how the Factory System feeds an already-typed
    /// child straight into its parent's builder.
    pub fn materialize(&self, after_factory: bool) -> Factoried {
        if after_factory {
            if let Some(value) = &self.value {
                return value.clone();
            }
        }
        match &self.content {
            NodeContent::Map(map) => {
                let mut out = IndexMap::new();
                for (key, value) in map {
                    if key == "_reference_" || key == "_overwrite_" {
                        continue;
                    }
                    out.insert(key.clone(), value.materialize(after_factory));
                }
                if !after_factory {
                    if let Some(r) = &self.reference {
                        out.insert("_reference_".to_string(), Factoried::Scalar(Value::String(r.clone())));
                    }
                }
                Factoried::Map(out)
            }
            NodeContent::List(list) => {
                Factoried::List(list.iter().map(|v| v.materialize(after_factory)).collect())
            }
            NodeContent::Scalar(v) => {
                if !after_factory {
                    if let Some(r) = &self.reference {
                        return Factoried::Scalar(Value::String(r.clone()));
                    }
                }
                Factoried::Scalar(v.clone())
            }
        }
    }

    /// Build a node tree from raw data, propagating type hints downward.
    pub fn build(
        data: &Value,
        type_infos: &BTreeMap<Vec<Segment>, TypeInfo>,
        path: &[Segment],
        parent_type_chains: &[TypeChain],
        type_system: &TypeSystem,
    ) -> Result<ResolutionNode> {
        let mut reference: Option<String> = None;
        if let Value::String(s) = data {
            if is_reference_format(s) {
                reference = Some(s.clone());
            }
        } else if let Value::Map(map) = data {
            if let Some(Value::String(r)) = map.get("_reference_") {
                if !is_reference_format(r) {
                    return Err(Error::parse(
                        path_to_reference(path),
                        format!("invalid reference format: {r}"),
                    ));
                }
                reference = Some(r.clone());
            } else if map.contains_key("_reference_") {
                return Err(Error::parse(path_to_reference(path), "_reference_ must be a string"));
            }
        }

        let mut type_chains: Vec<TypeChain> = if let Some(info) = type_infos.get(path) {
            type_system.flatten(info)
        } else if !parent_type_chains.is_empty() {
            let mut chains = Vec::new();
            let Some(last) = path.last() else {
                return Err(Error::parse(path_to_reference(path), "missing path segment for child node"));
            };
            for parent_chain in parent_type_chains {
                let Some(parent_info) = parent_chain.last() else { continue };
                let element_type =
                    type_system.extract_container_element_type(parent_info.type_hint(), last);
                if element_type == DeclaredType::Any {
                    chains.push(vec![TypeInfo::plain(DeclaredType::Any)]);
                } else {
                    chains.extend(type_system.flatten(&TypeInfo::plain(element_type)));
                }
            }
            chains
        } else if !path.is_empty() {
            return Err(Error::parse(path_to_reference(path), "no type information available"));
        } else {
            Vec::new()
        };

        if reference.is_none() && type_chains.len() > 1 {
            type_chains = try_prune_type_chains(data, type_chains);
        }

        match data {
            Value::Map(map) => {
                let mut content = IndexMap::new();
                for (key, value) in map {
                    if key == "_reference_" || key == "_overwrite_" {
                        continue;
                    }
                    let mut child_path = path.to_vec();
                    child_path.push(Segment::Key(key.clone()));
                    content.insert(
                        key.clone(),
                        ResolutionNode::build(value, type_infos, &child_path, &type_chains, type_system)?,
                    );
                }
                ResolutionNode::new(NodeContent::Map(content), reference, type_chains, Path(path.to_vec()))
            }
            Value::List(items) => {
                let mut content = Vec::new();
                for (i, value) in items.iter().enumerate() {
                    let mut child_path = path.to_vec();
                    child_path.push(Segment::Index(i));
                    content.push(ResolutionNode::build(value, type_infos, &child_path, &type_chains, type_system)?);
                }
                ResolutionNode::new(NodeContent::List(content), reference, type_chains, Path(path.to_vec()))
            }
            _ => ResolutionNode::new(NodeContent::Scalar(data.clone()), reference, type_chains, Path(path.to_vec())),
        }
    }

    /// Split `data` (the raw data this node was built from) into the
    /// portion consumed by the factoried value and the leftover.
    pub fn split(&self, data: &Value, type_system: &TypeSystem) -> Result<(Option<Value>, Option<Value>)> {
        let Some(value) = &self.value else {
            return Err(Error::parse(self.name.clone(), "cannot split used/unused data based on a non-factoried node"));
        };
        if !matches!(data, Value::Map(_) | Value::List(_)) {
            return Ok((Some(data.clone()), None));
        }
        match value {
            Factoried::Record(id, _) => {
                let Value::Map(data_map) = data else {
                    return Err(Error::parse(self.name.clone(), "expected map data for record field"));
                };
                let unused_keys: Vec<&String> = data_map
                    .keys()
                    .filter(|k| k.as_str() != "_reference_" && k.as_str() != "_overwrite_")
                    .collect();
                if unused_keys.is_empty() {
                    return Ok((Some(data.clone()), None));
                }
                let NodeContent::Map(content_map) = &self.content else {
                    return Err(Error::parse(self.name.clone(), "expected map content for record field"));
                };
                let mut used = IndexMap::new();
                let mut unused = IndexMap::new();
                let mut remaining: std::collections::BTreeSet<String> =
                    unused_keys.iter().map(|k| k.to_string()).collect();
                for field in type_system.scan(id)?.values() {
                    if !field.init {
                        continue;
                    }
                    if let Some(field_data) = data_map.get(field.name) {
                        let Some(child) = content_map.get(field.name) else { continue };
                        let (field_used, field_unused) = child.split(field_data, type_system)?;
                        if let Some(u) = field_unused {
                            unused.insert(field.name.to_string(), u);
                        } else {
                            remaining.remove(field.name);
                        }
                        if let Some(u) = field_used {
                            used.insert(field.name.to_string(), u);
                        }
                    }
                }
                for key in remaining {
                    if let Some(v) = data_map.get(&key) {
                        unused.insert(key, v.clone());
                    }
                }
                Ok((
                    if used.is_empty() { None } else { Some(Value::Map(used)) },
                    if unused.is_empty() { None } else { Some(Value::Map(unused)) },
                ))
            }
            Factoried::Map(_) => {
                let Value::Map(data_map) = data else {
                    return Err(Error::parse(self.name.clone(), "expected map data for map field"));
                };
                let keys: Vec<String> = data_map
                    .keys()
                    .filter(|k| k.as_str() != "_reference_" && k.as_str() != "_overwrite_")
                    .cloned()
                    .collect();
                if keys.is_empty() {
                    return Ok((Some(data.clone()), None));
                }
                let NodeContent::Map(content_map) = &self.content else {
                    return Err(Error::parse(self.name.clone(), "expected map content for map field"));
                };
                let mut used = IndexMap::new();
                let mut unused = IndexMap::new();
                for key in keys {
                    let key_data = data_map.get(&key).unwrap();
                    match content_map.get(&key) {
                        Some(child) => {
                            let (key_used, key_unused) = child.split(key_data, type_system)?;
                            if let Some(u) = key_unused {
                                unused.insert(key.clone(), u);
                            }
                            if let Some(u) = key_used {
                                used.insert(key, u);
                            }
                        }
                        None => {
                            unused.insert(key, key_data.clone());
                        }
                    }
                }
                Ok((
                    if used.is_empty() { None } else { Some(Value::Map(used)) },
                    if unused.is_empty() { None } else { Some(Value::Map(unused)) },
                ))
            }
            Factoried::List(_) => {
                let NodeContent::List(content_list) = &self.content else {
                    return Err(Error::parse(self.name.clone(), "expected list content for list field"));
                };
                let mut used_list = IndexMap::new();
                let mut unused_list = IndexMap::new();
                let keys: Vec<String> = match data {
                    Value::Map(m) => m
                        .keys()
                        .filter(|k| k.as_str() != "_reference_" && k.as_str() != "_overwrite_")
                        .cloned()
                        .collect(),
                    Value::List(l) => (0..l.len()).map(|i| i.to_string()).collect(),
                    _ => {
                        return Err(Error::parse(self.name.clone(), "expected map or list data for list field"));
                    }
                };
                if keys.is_empty() {
                    return Ok((Some(data.clone()), None));
                }
                let get = |key: &str| -> Option<Value> {
                    match data {
                        Value::Map(m) => m.get(key).cloned(),
                        Value::List(l) => key.parse::<usize>().ok().and_then(|i| l.get(i).cloned()),
                        _ => None,
                    }
                };
                for key in &keys {
                    let Some(key_data) = get(key) else { continue };
                    let index: Option<usize> = key.parse().ok();
                    match index.and_then(|i| content_list.get(i)) {
                        Some(child) => {
                            let (key_used, key_unused) = child.split(&key_data, type_system)?;
                            if let Some(u) = key_unused {
                                unused_list.insert(key.clone(), u);
                            }
                            if let Some(u) = key_used {
                                used_list.insert(key.clone(), u);
                            }
                        }
                        None => {
                            unused_list.insert(key.clone(), key_data);
                        }
                    }
                }
                let is_list_data = matches!(data, Value::List(_));
                let used = if is_list_data && keys.iter().all(|k| used_list.contains_key(k)) {
                    Value::List(keys.iter().map(|k| used_list.get(k).unwrap().clone()).collect())
                } else {
                    Value::Map(used_list.clone())
                };
                let unused = if is_list_data && keys.iter().all(|k| unused_list.contains_key(k)) {
                    Value::List(keys.iter().map(|k| unused_list.get(k).unwrap().clone()).collect())
                } else {
                    Value::Map(unused_list.clone())
                };
                Ok((
                    if used_list.is_empty() { None } else { Some(used) },
                    if unused_list.is_empty() { None } else { Some(unused) },
                ))
            }
            Factoried::Scalar(_) | Factoried::Custom(_, _) => Ok((Some(data.clone()), None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn build_assigns_plain_chain_to_root() {
        let ts = TypeSystem::new();
        let mut type_infos = BTreeMap::new();
        type_infos.insert(Vec::new(), TypeInfo::plain(DeclaredType::Int));
        let node = ResolutionNode::build(&Value::Int(3), &type_infos, &[], &[], &ts).unwrap();
        assert!(matches!(node.content, NodeContent::Scalar(Value::Int(3))));
        assert!(!node.is_reference());
    }

    #[test]
    fn build_detects_string_reference() {
        let ts = TypeSystem::new();
        let type_infos = BTreeMap::new();
        let data = Value::String("::a::b".to_string());
        let node = ResolutionNode::build(&data, &type_infos, &[Segment::Key("x".into())], &[vec![TypeInfo::plain(DeclaredType::Any)]], &ts).unwrap();
        assert_eq!(node.reference.as_deref(), Some("::a::b"));
    }

    #[test]
    fn get_references_collects_nested() {
        let ts = TypeSystem::new();
        let mut map = IndexMap::new();
        map.insert("x".to_string(), Value::String("::root".to_string()));
        let data = Value::Map(map);
        let mut type_infos = BTreeMap::new();
        type_infos.insert(vec![Segment::Key("x".into())], TypeInfo::plain(DeclaredType::Any));
        let node = ResolutionNode::build(&data, &type_infos, &[], &[vec![TypeInfo::plain(DeclaredType::Any)]], &ts).unwrap();
        assert_eq!(node.get_references(), std::collections::BTreeSet::from(["::root".to_string()]));
    }
}
