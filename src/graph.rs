//! Dependency graph over provenance nodes.
//!
//! Built fresh from a [Snapshot] for every computation. Nodes live in a petgraph arena in snapshot
//! order, so `NodeIndex::index()` is also the node's creation-order position. An edge points from
//! the dependent node to its dependency (the source of a `Used` or `Generated by` relationship
//! depends on its target).
//!
//! Cycles are data errors, not failures: every node that can reach itself is flagged and the
//! graph stays usable for everything else.

use crate::{
    properties::{Edge, ProvenanceNode, RelationshipType},
    snapshot::Snapshot,
};
use petgraph::{
    algo::kosaraju_scc,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub id: String,
    pub definition_id: String,
    pub study_id: Option<String>,
}

impl From<&ProvenanceNode> for DependencyNode {
    fn from(node: &ProvenanceNode) -> Self {
        DependencyNode {
            id: node.id.clone(),
            definition_id: node.definition_id.clone(),
            study_id: node.study_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, RelationshipType>,
    id_to_index: HashMap<String, NodeIndex>,
    cyclic: Vec<bool>,
    skipped_edges: Vec<String>,
}

impl DependencyGraph {
    pub fn build(nodes: &[ProvenanceNode], edges: &[Edge]) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut id_to_index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if id_to_index.contains_key(&node.id) {
                tracing::warn!(
                    "[DependencyGraph::build] Duplicate node id {} in snapshot, keeping the first",
                    node.id
                );
                continue;
            }
            let idx = graph.add_node(DependencyNode::from(node));
            id_to_index.insert(node.id.clone(), idx);
        }

        let mut skipped_edges = Vec::new();
        for edge in edges.iter().filter(|e| e.relationship.is_dependency()) {
            match (
                id_to_index.get(&edge.source_node_id),
                id_to_index.get(&edge.target_node_id),
            ) {
                (Some(source), Some(target)) => {
                    graph.add_edge(*source, *target, edge.relationship);
                }
                _ => {
                    tracing::warn!(
                        "[DependencyGraph::build] Edge {} ({edge}) references a missing node",
                        edge.id
                    );
                    skipped_edges.push(edge.id.clone());
                }
            }
        }

        let mut dep_graph = DependencyGraph {
            cyclic: vec![false; graph.node_count()],
            graph,
            id_to_index,
            skipped_edges,
        };
        dep_graph.mark_cycles();
        dep_graph
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        DependencyGraph::build(&snapshot.nodes, &snapshot.edges)
    }

    /// A node is cyclic when it shares a strongly connected component with another node, or
    /// depends on itself directly. kosaraju_scc traverses with explicit stacks, so deep chains do
    /// not exhaust the call stack.
    fn mark_cycles(&mut self) {
        for component in kosaraju_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|idx| self.graph.find_edge(*idx, *idx).is_some());
            if is_cycle {
                for idx in component {
                    self.cyclic[idx.index()] = true;
                }
            }
        }
        let cyclic = self.cyclic_nodes();
        if !cyclic.is_empty() {
            tracing::warn!(
                "[DependencyGraph] {} node(s) take part in a dependency cycle and cannot be \
                 versioned: {}",
                cyclic.len(),
                cyclic.join(", ")
            );
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    pub fn node(&self, idx: NodeIndex) -> &DependencyNode {
        &self.graph[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &DependencyNode)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    pub fn is_cyclic(&self, id: &str) -> bool {
        self.index_of(id)
            .is_some_and(|idx| self.is_cyclic_index(idx))
    }

    pub(crate) fn is_cyclic_index(&self, idx: NodeIndex) -> bool {
        self.cyclic[idx.index()]
    }

    pub fn has_cycles(&self) -> bool {
        self.cyclic.iter().any(|c| *c)
    }

    /// Ids of cyclic nodes, in snapshot order.
    pub fn cyclic_nodes(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|idx| self.cyclic[idx.index()])
            .map(|idx| self.graph[idx].id.clone())
            .collect()
    }

    /// Ids of edges left out because an endpoint was not in the snapshot.
    pub fn skipped_edges(&self) -> &[String] {
        &self.skipped_edges
    }

    /// Direct dependencies of `id`.
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Nodes directly depending on `id`.
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<&str> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        found.sort();
        found.dedup();
        found
            .into_iter()
            .map(|n| self.graph[n].id.as_str())
            .collect()
    }

    pub(crate) fn outgoing(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
    }

    /// Non-cyclic nodes ordered so that every node comes after all of its dependencies. Edges into
    /// cyclic nodes are ignored. Ties keep snapshot order.
    pub fn dependency_order(&self) -> Vec<NodeIndex> {
        let mut remaining = vec![0usize; self.graph.node_count()];
        let mut ready = VecDeque::new();
        for idx in self.graph.node_indices() {
            if self.is_cyclic_index(idx) {
                continue;
            }
            remaining[idx.index()] = self
                .outgoing(idx)
                .filter(|dep| !self.is_cyclic_index(*dep))
                .count();
            if remaining[idx.index()] == 0 {
                ready.push_back(idx);
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = ready.pop_front() {
            order.push(idx);
            for edge in self.graph.edges_directed(idx, Direction::Incoming) {
                let dependent = edge.source();
                if self.is_cyclic_index(dependent) {
                    continue;
                }
                remaining[dependent.index()] -= 1;
                if remaining[dependent.index()] == 0 {
                    ready.push_back(dependent);
                }
            }
        }
        order
    }
}
