use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::types::{NodeId, NodeInfo};

/// Graph of all declared nodes
/// Used to check circular dependencies and enables visualization of the declared nodes
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    map: BTreeMap<NodeId, DependencyGraphEntry>,
}

#[derive(Debug, Clone)]
struct DependencyGraphEntry {
    info: NodeInfo,
    dependencies: Vec<NodeId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path
    Visiting,
    /// Fully explored
    Done,
}

impl DependencyGraph {
    pub fn new<'a>(nodes: impl IntoIterator<Item = (NodeInfo, &'a [NodeId])>) -> Self {
        let mut graph = Self::default();
        for (info, dependencies) in nodes {
            graph.add(info, dependencies.to_vec());
        }
        graph
    }

    /// Adds a node, replacing an earlier entry with the same id
    pub fn add(&mut self, info: NodeInfo, dependencies: Vec<NodeId>) {
        self.map.insert(info.id, DependencyGraphEntry { info, dependencies });
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Declared nodes, ordered by id
    pub fn nodes(&self) -> impl Iterator<Item = NodeInfo> + '_ {
        self.map.values().map(|entry| entry.info)
    }

    /// Declared dependencies of a node, or None if the node is not declared
    pub fn dependencies(&self, id: NodeId) -> Option<&[NodeId]> {
        self.map.get(&id).map(|entry| entry.dependencies.as_slice())
    }

    /// Dependencies which were referenced but never declared, with the node referencing them
    pub fn undeclared_dependencies(&self) -> Vec<(NodeInfo, NodeId)> {
        self.map
            .values()
            .flat_map(|entry| {
                entry
                    .dependencies
                    .iter()
                    .filter(|dependency| !self.map.contains_key(dependency))
                    .map(|dependency| (entry.info, *dependency))
            })
            .collect()
    }

    /// Validate the graph
    ///
    /// Returns a list of all cycles reachable through declared dependencies
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut marks = HashMap::new();
        let mut errors = Vec::new();
        for entry in self.map.values() {
            let mut path = Vec::new();
            visit(self, &mut marks, &mut errors, &mut path, entry);
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn visit(
            graph: &DependencyGraph,
            marks: &mut HashMap<NodeId, Mark>,
            errors: &mut Vec<DependencyGraphError>,
            path: &mut Vec<NodeInfo>,
            entry: &DependencyGraphEntry,
        ) {
            match marks.get(&entry.info.id) {
                Some(Mark::Done) => return,
                Some(Mark::Visiting) => {
                    // The entry is already on the path - everything from there on is the cycle
                    let start = path
                        .iter()
                        .position(|info| info.id == entry.info.id)
                        .unwrap_or_default();
                    let mut chain = path[start..].to_vec();
                    chain.push(entry.info);

                    errors.push(DependencyGraphError::CycleDetected {
                        from: entry.info,
                        chain,
                    });
                    return;
                }
                None => {}
            }

            marks.insert(entry.info.id, Mark::Visiting);
            path.push(entry.info);

            for dependency in &entry.dependencies {
                // Undeclared dependencies surface as NodeNotFound on resolution
                if let Some(next_entry) = graph.map.get(dependency) {
                    visit(graph, marks, errors, path, next_entry);
                }
            }

            path.pop();
            marks.insert(entry.info.id, Mark::Done);
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    #[error("A dependency cycle starts at '{from}' through {chain:?}")]
    CycleDetected { from: NodeInfo, chain: Vec<NodeInfo> },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
