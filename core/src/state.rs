//! Central resolution state: builds the node tree and dependency graph
//! for a batch of scopes, then drives the node tree through the
//! precomputed topological order.
//!
//! Ported from `resolution/state.py`.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::factory;
use crate::graph::DependencyGraph;
use crate::node::{NodeContent, ResolutionNode};
use crate::reference::{Path, Segment};
use crate::types::{DeclaredType, RecordId, TypeInfo, TypeSystem};
use crate::value::Value;

pub struct ResolutionState<'a> {
    pub root: ResolutionNode,
    pub graph: DependencyGraph,
    type_system: &'a TypeSystem,
}

impl<'a> ResolutionState<'a> {
    /// Build the node tree for `data` against the registered scopes in
    /// `configs` (scope name -> record id), and precompute its
    /// topological resolution order. Fails immediately if the data
    /// contains a circular reference.
    pub fn new(data: &Value, configs: &IndexMap<String, RecordId>, type_system: &'a TypeSystem) -> Result<Self> {
        for id in configs.values() {
            type_system.scan(id)?;
        }

        let mut type_infos: BTreeMap<Vec<Segment>, TypeInfo> = BTreeMap::new();
        for (scope, id) in configs {
            let path = vec![Segment::Key(scope.clone())];
            type_infos.insert(path.clone(), TypeInfo::plain(DeclaredType::Record(id)));
            type_system.build_type_infos(id, &path, &mut type_infos)?;
        }

        let root = ResolutionNode::build(data, &type_infos, &[], &[], type_system)?;
        let graph = DependencyGraph::build(&root)?;

        Ok(ResolutionState { root, graph, type_system })
    }

    /// The precomputed topological order of node names to process.
    pub fn resolution_queue(&self) -> &[String] {
        &self.graph.order
    }

    fn node_at(&self, path: &Path) -> Result<&ResolutionNode> {
        let mut node = &self.root;
        for seg in &path.0 {
            node = match (&node.content, seg) {
                (NodeContent::Map(map), Segment::Key(k)) => {
                    map.get(k).ok_or_else(|| Error::parse(path.to_reference(), format!("missing key '{k}'")))?
                }
                (NodeContent::List(list), Segment::Index(i)) => list
                    .get(*i)
                    .ok_or_else(|| Error::parse(path.to_reference(), format!("missing index {i}")))?,
                _ => return Err(Error::parse(path.to_reference(), "path does not match node shape")),
            };
        }
        Ok(node)
    }

    fn node_at_mut(&mut self, path: &Path) -> Result<&mut ResolutionNode> {
        let mut node = &mut self.root;
        for seg in &path.0 {
            node = match (&mut node.content, seg) {
                (NodeContent::Map(map), Segment::Key(k)) => {
                    map.get_mut(k).ok_or_else(|| Error::parse(path.to_reference(), format!("missing key '{k}'")))?
                }
                (NodeContent::List(list), Segment::Index(i)) => list
                    .get_mut(*i)
                    .ok_or_else(|| Error::parse(path.to_reference(), format!("missing index {i}")))?,
                _ => return Err(Error::parse(path.to_reference(), "path does not match node shape")),
            };
        }
        Ok(node)
    }

    fn set_node_at(&mut self, path: &Path, node: ResolutionNode) -> Result<()> {
        if path.is_root() {
            self.root = node;
            return Ok(());
        }
        let (last, parent_segments) = path.0.split_last().expect("checked non-root above");
        let mut cursor = &mut self.root;
        for seg in parent_segments {
            cursor = match (&mut cursor.content, seg) {
                (NodeContent::Map(map), Segment::Key(k)) => {
                    map.get_mut(k).ok_or_else(|| Error::parse(path.to_reference(), format!("missing key '{k}'")))?
                }
                (NodeContent::List(list), Segment::Index(i)) => list
                    .get_mut(*i)
                    .ok_or_else(|| Error::parse(path.to_reference(), format!("missing index {i}")))?,
                _ => return Err(Error::parse(path.to_reference(), "path does not match node shape")),
            };
        }
        match (&mut cursor.content, last) {
            (NodeContent::Map(map), Segment::Key(k)) => {
                map.insert(k.clone(), node);
            }
            (NodeContent::List(list), Segment::Index(i)) if *i < list.len() => {
                list[*i] = node;
            }
            _ => return Err(Error::parse(path.to_reference(), "path does not match node shape")),
        }
        Ok(())
    }

    /// Apply the Factory System to a single node, in place.
    pub fn apply_factory(&mut self, name: &str) -> Result<()> {
        let path = self
            .graph
            .paths
            .get(name)
            .cloned()
            .ok_or_else(|| Error::parse(name.to_string(), "node not found in dependency graph"))?;
        let node = self.node_at_mut(&path)?;
        factory::apply(node, self.type_system)
    }

    /// Resolve a reference node, replacing it with its (possibly
    /// override-merged) target and then factorying the result.
    pub fn resolve_reference(&mut self, name: &str) -> Result<()> {
        let path = self
            .graph
            .paths
            .get(name)
            .cloned()
            .ok_or_else(|| Error::parse(name.to_string(), "node not found in dependency graph"))?;
        let node = self.node_at(&path)?.clone();
        let reference = node
            .reference
            .clone()
            .ok_or_else(|| Error::reference(name.to_string(), "node is not a reference"))?;
        let target_path = self
            .graph
            .paths
            .get(&reference)
            .cloned()
            .ok_or_else(|| Error::reference(name.to_string(), format!("reference target '{reference}' not found")))?;
        let target = self.node_at(&target_path)?.clone();
        let mut resolved = node.resolve_reference(&target)?;
        factory::apply(&mut resolved, self.type_system)?;
        self.set_node_at(&path, resolved)
    }

    /// Process a single node according to the precomputed queue: resolve
    /// it if it's a reference, else factory it directly.
    pub fn process(&mut self, name: &str) -> Result<()> {
        let is_reference = self.node_at(
            self.graph
                .paths
                .get(name)
                .ok_or_else(|| Error::parse(name.to_string(), "node not found in dependency graph"))?,
        )?
        .is_reference();
        if is_reference {
            self.resolve_reference(name)
        } else {
            self.apply_factory(name)
        }
    }

    /// Process every node in topological order, fully resolving the tree.
    pub fn resolve_all(&mut self) -> Result<()> {
        for name in self.graph.order.clone() {
            self.process(&name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_simple_reference_chain() {
        let ts = TypeSystem::new();
        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::Int(7));
        map.insert("b".to_string(), Value::String("::a".to_string()));
        let mut type_infos = BTreeMap::new();
        type_infos.insert(vec![Segment::Key("a".into())], TypeInfo::plain(DeclaredType::Int));
        type_infos.insert(vec![Segment::Key("b".into())], TypeInfo::plain(DeclaredType::Any));
        let data = Value::Map(map);
        let root = ResolutionNode::build(&data, &type_infos, &[], &[], &ts).unwrap();
        let graph = DependencyGraph::build(&root).unwrap();
        let mut state = ResolutionState { root, graph, type_system: &ts };
        state.resolve_all().unwrap();
        let b = state.node_at(&Path(vec![Segment::Key("b".into())])).unwrap();
        assert_eq!(b.value.as_ref().unwrap().as_scalar().unwrap(), &Value::Int(7));
    }
}
