//! Dependency graph and topological ordering over a resolution tree.
//!
//! Ported from `resolution/dependency.py`. Nodes are addressed by name
//! (their reference string) rather than by object identity, since Rust
//! trees are owned rather than shared by reference.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::{Error, Result};
use crate::node::{NodeContent, ResolutionNode};
use crate::reference::Path;

/// Dependency edges and a precomputed topological order over every node
/// reachable from a tree's root.
pub struct DependencyGraph {
    pub paths: BTreeMap<String, Path>,
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
    pub dependents: BTreeMap<String, BTreeSet<String>>,
    /// Node names in an order where every dependency precedes its
    /// dependents.
    pub order: Vec<String>,
}

impl DependencyGraph {
    pub fn build(root: &ResolutionNode) -> Result<Self> {
        let mut paths = BTreeMap::new();
        collect_nodes(root, &mut paths)?;

        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        build_dependencies(root, &paths, &mut dependencies, &mut dependents)?;

        let order = topological_order(&paths, &dependencies, &dependents)?;

        Ok(DependencyGraph { paths, dependencies, dependents, order })
    }
}

fn collect_nodes(node: &ResolutionNode, paths: &mut BTreeMap<String, Path>) -> Result<()> {
    if let Some(existing) = paths.get(&node.name) {
        if *existing != node.path {
            return Err(Error::parse(
                node.name.clone(),
                format!(
                    "duplicate node found for path '{}' and '{}'",
                    node.path, existing
                ),
            ));
        }
        return Ok(());
    }
    paths.insert(node.name.clone(), node.path.clone());
    match &node.content {
        NodeContent::Map(map) => {
            for child in map.values() {
                collect_nodes(child, paths)?;
            }
        }
        NodeContent::List(list) => {
            for child in list {
                collect_nodes(child, paths)?;
            }
        }
        NodeContent::Scalar(_) => {}
    }
    Ok(())
}

fn build_dependencies(
    node: &ResolutionNode,
    paths: &BTreeMap<String, Path>,
    dependencies: &mut BTreeMap<String, BTreeSet<String>>,
    dependents: &mut BTreeMap<String, BTreeSet<String>>,
) -> Result<()> {
    if let Some(reference) = &node.reference {
        add_dependency(&node.name, reference, paths, dependencies, dependents)?;
    }
    match &node.content {
        NodeContent::Map(map) => {
            for child in map.values() {
                add_dependency(&node.name, &child.name, paths, dependencies, dependents)?;
                build_dependencies(child, paths, dependencies, dependents)?;
            }
        }
        NodeContent::List(list) => {
            for child in list {
                add_dependency(&node.name, &child.name, paths, dependencies, dependents)?;
                build_dependencies(child, paths, dependencies, dependents)?;
            }
        }
        NodeContent::Scalar(_) => {}
    }
    Ok(())
}

fn add_dependency(
    dependent: &str,
    dependency: &str,
    paths: &BTreeMap<String, Path>,
    dependencies: &mut BTreeMap<String, BTreeSet<String>>,
    dependents: &mut BTreeMap<String, BTreeSet<String>>,
) -> Result<()> {
    if !paths.contains_key(dependency) {
        return Err(Error::reference(
            dependent.to_string(),
            format!("dependency '{dependency}' does not exist for node '{dependent}'"),
        ));
    }
    dependencies.entry(dependent.to_string()).or_default().insert(dependency.to_string());
    dependents.entry(dependency.to_string()).or_default().insert(dependent.to_string());
    Ok(())
}

fn topological_order(
    paths: &BTreeMap<String, Path>,
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    dependents: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>> {
    let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();
    for name in paths.keys() {
        in_degree.insert(name.clone(), dependencies.get(name).map(|d| d.len()).unwrap_or(0));
    }

    let mut queue: VecDeque<String> =
        in_degree.iter().filter(|(_, &deg)| deg == 0).map(|(name, _)| name.clone()).collect();

    let mut processed = Vec::new();
    while let Some(name) = queue.pop_front() {
        processed.push(name.clone());
        if let Some(deps) = dependents.get(&name) {
            for dependent in deps {
                let degree = in_degree.get_mut(dependent).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent.clone());
                }
            }
        }
    }

    if processed.len() != paths.len() {
        let processed_set: BTreeSet<String> = processed.iter().cloned().collect();
        let unprocessed: BTreeSet<String> =
            paths.keys().filter(|name| !processed_set.contains(*name)).cloned().collect();
        let cycle = find_cycle(&unprocessed, dependencies);
        return Err(Error::Circular {
            cycle: cycle
                .map(|c| c.join(" -> "))
                .unwrap_or_else(|| format!("{unprocessed:?}")),
        });
    }

    Ok(processed)
}

fn find_cycle(nodes: &BTreeSet<String>, dependencies: &BTreeMap<String, BTreeSet<String>>) -> Option<Vec<String>> {
    let mut visited = BTreeSet::new();
    let mut rec_stack: Vec<String> = Vec::new();
    let mut rec_stack_set = BTreeSet::new();

    fn dfs(
        name: &str,
        nodes: &BTreeSet<String>,
        dependencies: &BTreeMap<String, BTreeSet<String>>,
        visited: &mut BTreeSet<String>,
        rec_stack: &mut Vec<String>,
        rec_stack_set: &mut BTreeSet<String>,
    ) -> Option<Vec<String>> {
        if rec_stack_set.contains(name) {
            let idx = rec_stack.iter().position(|n| n == name).unwrap();
            let mut cycle = rec_stack[idx..].to_vec();
            cycle.push(name.to_string());
            return Some(cycle);
        }
        if visited.contains(name) {
            return None;
        }
        visited.insert(name.to_string());
        rec_stack.push(name.to_string());
        rec_stack_set.insert(name.to_string());

        if let Some(deps) = dependencies.get(name) {
            for dep in deps {
                if nodes.contains(dep) {
                    if let Some(cycle) = dfs(dep, nodes, dependencies, visited, rec_stack, rec_stack_set) {
                        return Some(cycle);
                    }
                }
            }
        }

        rec_stack.pop();
        rec_stack_set.remove(name);
        None
    }

    for name in nodes {
        if !visited.contains(name) {
            if let Some(cycle) = dfs(name, nodes, dependencies, &mut visited, &mut rec_stack, &mut rec_stack_set) {
                return Some(cycle);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ResolutionNode;
    use crate::reference::Segment;
    use crate::types::{DeclaredType, TypeInfo, TypeSystem};
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap as Map;

    #[test]
    fn orders_dependency_before_dependent() {
        let ts = TypeSystem::new();
        let mut map = indexmap::IndexMap::new();
        map.insert("a".to_string(), Value::Int(1));
        map.insert("b".to_string(), Value::String("::a".to_string()));
        let data = Value::Map(map);
        let mut type_infos = Map::new();
        type_infos.insert(vec![Segment::Key("a".into())], TypeInfo::plain(DeclaredType::Int));
        type_infos.insert(vec![Segment::Key("b".into())], TypeInfo::plain(DeclaredType::Any));
        let root = ResolutionNode::build(&data, &type_infos, &[], &[], &ts).unwrap();
        let graph = DependencyGraph::build(&root).unwrap();
        let pos_a = graph.order.iter().position(|n| n == "::a").unwrap();
        let pos_b = graph.order.iter().position(|n| n == "::b").unwrap();
        assert!(pos_a < pos_b);
    }

    #[test]
    fn detects_cycle() {
        let ts = TypeSystem::new();
        let mut map = indexmap::IndexMap::new();
        map.insert("a".to_string(), Value::String("::b".to_string()));
        map.insert("b".to_string(), Value::String("::a".to_string()));
        let data = Value::Map(map);
        let mut type_infos = Map::new();
        type_infos.insert(vec![Segment::Key("a".into())], TypeInfo::plain(DeclaredType::Any));
        type_infos.insert(vec![Segment::Key("b".into())], TypeInfo::plain(DeclaredType::Any));
        let root = ResolutionNode::build(&data, &type_infos, &[], &[], &ts).unwrap();
        let err = DependencyGraph::build(&root).unwrap_err();
        assert!(matches!(err, Error::Circular { .. }));
    }
}
