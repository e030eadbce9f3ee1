//! Version assignment
//!
//! A node's version is its rank among nodes of the same definition (optionally the same
//! definition within the same study), ordered first by depth and then by creation order. Depth
//! counts the most same-definition nodes found along any dependency path below the node; paths may
//! pass through nodes of other definitions. Ranks are dense and start at 1.
//!
//! Nodes on a dependency cycle get version `0` and are left out of the ranking; edges into them
//! are ignored when computing the depth of everything else.

use crate::{
    error::{ProvenanceError, Result},
    graph::DependencyGraph,
    snapshot::Snapshot,
};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Version given to nodes that take part in a dependency cycle.
pub const CYCLIC_VERSION: u32 = 0;

/// How nodes are grouped for numbering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionScope {
    /// One sequence per definition.
    #[default]
    Definition,
    /// One sequence per definition within each study.
    DefinitionAndStudy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeKey<'g> {
    pub definition_id: &'g str,
    pub study_id: Option<&'g str>,
}

/// Versions for every node of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub versions: BTreeMap<String, u32>,
    /// Nodes that received [CYCLIC_VERSION], in snapshot order.
    pub cyclic: Vec<String>,
}

impl Versions {
    pub fn get(&self, id: &str) -> Option<u32> {
        self.versions.get(id).copied()
    }

    pub fn is_cyclic(&self, id: &str) -> bool {
        self.cyclic.iter().any(|c| c == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.versions.iter().map(|(id, v)| (id.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Position of a node in the dependency order, or `UNORDERED` for cyclic nodes.
const UNORDERED: usize = usize::MAX;

pub struct VersionAssigner<'g> {
    graph: &'g DependencyGraph,
    scope: VersionScope,
    order: Vec<NodeIndex>,
    position: Vec<usize>,
    /// Scope group of every node, as an index into `keys`.
    group_of: Vec<usize>,
    keys: Vec<ScopeKey<'g>>,
    group_index: HashMap<ScopeKey<'g>, usize>,
    /// First and last position of each group's non-cyclic members in `order`.
    spans: Vec<Option<(usize, usize)>>,
}

impl<'g> VersionAssigner<'g> {
    pub fn new(graph: &'g DependencyGraph, scope: VersionScope) -> Self {
        let order = graph.dependency_order();
        let mut position = vec![UNORDERED; graph.node_count()];
        for (pos, idx) in order.iter().enumerate() {
            position[idx.index()] = pos;
        }

        let mut keys = Vec::new();
        let mut group_index = HashMap::new();
        let mut group_of = Vec::with_capacity(graph.node_count());
        for (idx, node) in graph.nodes() {
            let key = ScopeKey {
                definition_id: node.definition_id.as_str(),
                study_id: match scope {
                    VersionScope::Definition => None,
                    VersionScope::DefinitionAndStudy => node.study_id.as_deref(),
                },
            };
            let group = *group_index.entry(key).or_insert_with(|| {
                keys.push(key);
                keys.len() - 1
            });
            debug_assert_eq!(group_of.len(), idx.index());
            group_of.push(group);
        }

        let mut spans: Vec<Option<(usize, usize)>> = vec![None; keys.len()];
        for (pos, idx) in order.iter().enumerate() {
            let span = &mut spans[group_of[idx.index()]];
            *span = match *span {
                None => Some((pos, pos)),
                Some((first, _)) => Some((first, pos)),
            };
        }

        VersionAssigner {
            graph,
            scope,
            order,
            position,
            group_of,
            keys,
            group_index,
            spans,
        }
    }

    pub fn scope(&self) -> VersionScope {
        self.scope
    }

    pub fn scope_key(&self, idx: NodeIndex) -> ScopeKey<'g> {
        self.keys[self.group_of[idx.index()]]
    }

    /// Number of node visits a full [VersionAssigner::assign_all] makes.
    pub(crate) fn work(&self) -> usize {
        self.spans
            .iter()
            .flatten()
            .map(|(first, last)| last - first + 1)
            .sum()
    }

    /// Depth of every non-cyclic node in `group`.
    ///
    /// `below[x]` is the largest number of group nodes on any path strictly below `x`. Only the
    /// stretch of the dependency order between the group's first and last member is visited:
    /// nodes ordered before the first member cannot reach any member, and nodes after the last
    /// member are not members themselves.
    fn depths(&self, group: usize) -> Vec<(NodeIndex, u32)> {
        let Some((first, last)) = self.spans[group] else {
            return Vec::new();
        };
        let mut below = vec![0u32; last - first + 1];
        let mut depths = Vec::new();
        for (pos, &idx) in self.order[first..=last].iter().enumerate() {
            let mut deepest = 0;
            for dep in self.graph.outgoing(idx) {
                let dep_pos = self.position[dep.index()];
                if dep_pos == UNORDERED || dep_pos < first {
                    continue;
                }
                let own = u32::from(self.group_of[dep.index()] == group);
                deepest = deepest.max(below[dep_pos - first] + own);
            }
            below[pos] = deepest;
            if self.group_of[idx.index()] == group {
                depths.push((idx, deepest));
            }
        }
        depths
    }

    fn ranked(&self, group: usize) -> Vec<(NodeIndex, u32)> {
        let mut ranked = self.depths(group);
        ranked.sort_by_key(|(idx, depth)| (*depth, idx.index()));
        ranked
            .into_iter()
            .zip(1u32..)
            .map(|((idx, _), version)| (idx, version))
            .collect()
    }

    /// Dense versions for one group, ascending by depth and then creation order.
    pub fn group_versions(&self, key: ScopeKey<'g>) -> Vec<(NodeIndex, u32)> {
        match self.group_index.get(&key) {
            Some(&group) => self.ranked(group),
            None => Vec::new(),
        }
    }

    pub fn compute_version(&self, node_id: &str) -> Result<u32> {
        let idx = self
            .graph
            .index_of(node_id)
            .ok_or_else(|| ProvenanceError::NotFound(format!("provenance node {node_id}")))?;
        if self.graph.is_cyclic_index(idx) {
            return Ok(CYCLIC_VERSION);
        }
        self.ranked(self.group_of[idx.index()])
            .into_iter()
            .find(|(candidate, _)| *candidate == idx)
            .map(|(_, version)| version)
            .ok_or_else(|| ProvenanceError::NotFound(format!("provenance node {node_id}")))
    }

    pub fn assign_all(&self) -> Versions {
        let mut versions = BTreeMap::new();
        for group in 0..self.keys.len() {
            for (idx, version) in self.ranked(group) {
                versions.insert(self.graph.node(idx).id.clone(), version);
            }
        }
        let cyclic = self.graph.cyclic_nodes();
        for id in cyclic.iter() {
            versions.insert(id.clone(), CYCLIC_VERSION);
        }
        tracing::debug!(
            "[VersionAssigner::assign_all] {} versions assigned in {} groups, {} cyclic",
            versions.len(),
            self.keys.len(),
            cyclic.len()
        );
        Versions { versions, cyclic }
    }
}

/// Build the dependency graph for `snapshot` and compute one node's version.
pub fn compute_version(snapshot: &Snapshot, node_id: &str, scope: VersionScope) -> Result<u32> {
    let graph = DependencyGraph::from_snapshot(snapshot);
    VersionAssigner::new(&graph, scope).compute_version(node_id)
}

/// Build the dependency graph for `snapshot` and compute every node's version.
pub fn compute_versions(snapshot: &Snapshot, scope: VersionScope) -> Versions {
    let graph = DependencyGraph::from_snapshot(snapshot);
    VersionAssigner::new(&graph, scope).assign_all()
}
