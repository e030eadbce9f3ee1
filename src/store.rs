//! In-process persistence
//!
//! [MemoryStore] keeps the persisted provenance entities the engine reads through
//! [ProvenanceSource]: nodes, studies, information fields with their HAS_INFORMATION
//! relationships, and dependency edges. It is cheap to clone; clones share the same state.
//!
//! Edges are only ever added through [MemoryStore::commit_edge], which validates and inserts under
//! one write lock, so two conflicting one-to-one edges cannot both be committed.

use crate::{
    error::{ProvenanceError, Result},
    properties::{
        Edge, InformationField, InformationRelationship, ProvenanceNode, RelationshipType, Study,
    },
    rules::RuleTable,
    snapshot::{ProvenanceSource, Snapshot},
    validate::RelationshipValidator,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Everything a [MemoryStore] holds, in the shape of a provenance export file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreContents {
    #[serde(default)]
    pub provenance_nodes: Vec<ProvenanceNode>,
    #[serde(default)]
    pub studies: Vec<Study>,
    #[serde(default)]
    pub information_fields: Vec<InformationField>,
    #[serde(default)]
    pub information_relationships: Vec<InformationRelationship>,
    #[serde(default)]
    pub dependency_relationships: Vec<Edge>,
}

impl StoreContents {
    pub fn from_json(json: &str) -> Result<StoreContents> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The relationships touching one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeEdges {
    pub dependencies: Vec<Edge>,
    pub information: Vec<InformationRelationship>,
}

impl NodeEdges {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.information.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len() + self.information.len()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    // creation order matters for versioning
    nodes: Vec<ProvenanceNode>,
    studies: HashMap<String, Study>,
    information: HashMap<String, InformationField>,
    information_relationships: Vec<InformationRelationship>,
    edges: Vec<Edge>,
}

impl StoreState {
    fn node_position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    fn snapshot(&self) -> Snapshot {
        let mut studies: Vec<Study> = self.studies.values().cloned().collect();
        studies.sort_by(|a, b| a.id.cmp(&b.id));
        Snapshot::new(self.nodes.clone(), self.edges.clone(), studies)
    }

    fn upsert_node(&mut self, node: ProvenanceNode) {
        match self.node_position(&node.id) {
            Some(pos) => self.nodes[pos] = node,
            None => self.nodes.push(node),
        }
    }

    fn upsert_edge(&mut self, edge: Edge) {
        match self.edges.iter().position(|e| e.id == edge.id) {
            Some(pos) => self.edges[pos] = edge,
            None => self.edges.push(edge),
        }
    }

    /// The relationship attaching field `id`, if any. A field belongs to at most one node.
    fn attachment_of(&self, id: &str) -> Option<&InformationRelationship> {
        self.information_relationships.iter().find(|r| r.target == id)
    }

    fn upsert_information_relationship(&mut self, relationship: InformationRelationship) {
        match self
            .information_relationships
            .iter()
            .position(|r| r.id == relationship.id)
        {
            Some(pos) => self.information_relationships[pos] = relationship,
            None => self.information_relationships.push(relationship),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<RwLock<StoreState>>);

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn require_id(kind: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        Err(ProvenanceError::Decode(format!("{kind}: 'id' must not be empty")))
    } else {
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn from_contents(contents: StoreContents) -> Self {
        let store = MemoryStore::new();
        store.reset(contents);
        store
    }

    /// Drop everything and load `contents`. Entries that cannot be stored are logged and skipped.
    /// Dependency edges are loaded as they are, without rule validation.
    pub fn reset(&self, contents: StoreContents) {
        let mut state = self.0.write();
        *state = StoreState::default();
        tracing::info!(
            "[MemoryStore::reset] Creating {} nodes",
            contents.provenance_nodes.len()
        );
        for node in contents.provenance_nodes {
            if node.id.trim().is_empty() || node.definition_id.trim().is_empty() {
                tracing::warn!(
                    "[MemoryStore::reset] Skipping node without id or definition: {node:?}"
                );
                continue;
            }
            state.upsert_node(node);
        }
        for study in contents.studies {
            if study.id.trim().is_empty() {
                tracing::warn!("[MemoryStore::reset] Skipping study without id");
                continue;
            }
            state.studies.insert(study.id.clone(), study);
        }
        for field in contents.information_fields {
            if field.id.trim().is_empty() {
                tracing::warn!("[MemoryStore::reset] Skipping information field without id");
                continue;
            }
            state.information.insert(field.id.clone(), field);
        }
        for relationship in contents.information_relationships {
            if state.node_position(&relationship.source).is_none()
                || !state.information.contains_key(&relationship.target)
            {
                tracing::warn!(
                    "[MemoryStore::reset] Skipping information relationship {} with a missing end",
                    relationship.id
                );
                continue;
            }
            if let Some(existing) = state
                .attachment_of(&relationship.target)
                .filter(|existing| existing.id != relationship.id)
            {
                tracing::warn!(
                    "[MemoryStore::reset] Skipping information relationship {}: field {} is \
                     already attached to node {}",
                    relationship.id,
                    relationship.target,
                    existing.source
                );
                continue;
            }
            state.upsert_information_relationship(relationship);
        }
        for edge in contents.dependency_relationships {
            if state.node_position(&edge.source_node_id).is_none()
                || state.node_position(&edge.target_node_id).is_none()
            {
                tracing::warn!(
                    "[MemoryStore::reset] Skipping edge {} ({edge}) with a missing end",
                    edge.id
                );
                continue;
            }
            state.upsert_edge(edge);
        }
    }

    pub fn contents(&self) -> StoreContents {
        let state = self.0.read();
        let mut studies: Vec<Study> = state.studies.values().cloned().collect();
        studies.sort_by(|a, b| a.id.cmp(&b.id));
        let mut information_fields: Vec<InformationField> =
            state.information.values().cloned().collect();
        information_fields.sort_by(|a, b| a.id.cmp(&b.id));
        StoreContents {
            provenance_nodes: state.nodes.clone(),
            studies,
            information_fields,
            information_relationships: state.information_relationships.clone(),
            dependency_relationships: state.edges.clone(),
        }
    }

    /// A consistent copy of nodes, edges and studies.
    pub fn snapshot(&self) -> Snapshot {
        self.0.read().snapshot()
    }

    pub fn nodes(&self) -> Vec<ProvenanceNode> {
        self.0.read().nodes.clone()
    }

    pub fn get_node(&self, id: &str) -> Option<ProvenanceNode> {
        let state = self.0.read();
        state.node_position(id).map(|pos| state.nodes[pos].clone())
    }

    pub fn upsert_node(&self, node: ProvenanceNode) -> Result<()> {
        require_id("ProvenanceNode", &node.id)?;
        if node.definition_id.trim().is_empty() {
            return Err(ProvenanceError::Decode(
                "ProvenanceNode: 'definitionId' must not be empty".to_string(),
            ));
        }
        tracing::info!("[MemoryStore] Upserting node {node}");
        self.0.write().upsert_node(node);
        Ok(())
    }

    /// Remove a node with everything attached to it: its information fields and their
    /// relationships first, then its dependency edges, then the node.
    pub fn delete_node(&self, id: &str) -> Result<()> {
        let mut state = self.0.write();
        let pos = state
            .node_position(id)
            .ok_or_else(|| ProvenanceError::NotFound(format!("provenance node {id}")))?;

        let (attached, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut state.information_relationships)
                .into_iter()
                .partition(|r| r.source == id);
        state.information_relationships = kept;
        for relationship in attached.iter() {
            state.information.remove(&relationship.target);
        }

        let before = state.edges.len();
        state
            .edges
            .retain(|e| e.source_node_id != id && e.target_node_id != id);
        let removed_edges = before - state.edges.len();

        state.nodes.remove(pos);
        tracing::info!(
            "[MemoryStore] Deleted node {id} with {} information field(s) and {removed_edges} \
             edge(s)",
            attached.len()
        );
        Ok(())
    }

    pub fn studies(&self) -> Vec<Study> {
        self.0.read().snapshot().studies
    }

    pub fn get_study(&self, id: &str) -> Option<Study> {
        self.0.read().studies.get(id).cloned()
    }

    pub fn upsert_study(&self, study: Study) -> Result<()> {
        require_id("Study", &study.id)?;
        tracing::info!("[MemoryStore] Upserting study {}", study.id);
        self.0.write().studies.insert(study.id.clone(), study);
        Ok(())
    }

    /// Nodes keep their `study_id`; a deleted study simply stops resolving.
    pub fn delete_study(&self, id: &str) -> Result<()> {
        match self.0.write().studies.remove(id) {
            Some(_) => {
                tracing::info!("[MemoryStore] Deleted study {id}");
                Ok(())
            }
            None => Err(ProvenanceError::NotFound(format!("study {id}"))),
        }
    }

    pub fn get_information(&self, id: &str) -> Option<InformationField> {
        self.0.read().information.get(id).cloned()
    }

    pub fn upsert_information(&self, field: InformationField) -> Result<()> {
        require_id("InformationField", &field.id)?;
        tracing::info!("[MemoryStore] Upserting information field {}", field.id);
        self.0.write().information.insert(field.id.clone(), field);
        Ok(())
    }

    /// Removes the field and the relationship attaching it.
    pub fn delete_information(&self, id: &str) -> Result<()> {
        let mut state = self.0.write();
        if state.information.remove(id).is_none() {
            return Err(ProvenanceError::NotFound(format!("information field {id}")));
        }
        state.information_relationships.retain(|r| r.target != id);
        tracing::info!("[MemoryStore] Deleted information field {id}");
        Ok(())
    }

    /// Store `field` and attach it to `node_id`. An empty field id is replaced by a fresh one.
    ///
    /// Re-attaching a field to its own node updates it. A field attached to another node is
    /// refused with [ProvenanceError::AlreadyAttached].
    pub fn attach_information(
        &self,
        node_id: &str,
        mut field: InformationField,
    ) -> Result<InformationRelationship> {
        if field.key.trim().is_empty() {
            return Err(ProvenanceError::Decode(
                "InformationField: 'key' must not be empty".to_string(),
            ));
        }
        if field.id.trim().is_empty() {
            field.id = new_id();
        }
        let mut state = self.0.write();
        if state.node_position(node_id).is_none() {
            return Err(ProvenanceError::NotFound(format!("provenance node {node_id}")));
        }
        let existing = state.attachment_of(&field.id).cloned();
        if let Some(owner) = existing.as_ref().filter(|r| r.source != node_id) {
            return Err(ProvenanceError::AlreadyAttached {
                field: field.id.clone(),
                node: owner.source.clone(),
            });
        }
        let relationship = existing.unwrap_or_else(|| InformationRelationship {
            id: new_id(),
            source: node_id.to_string(),
            target: field.id.clone(),
        });
        tracing::info!(
            "[MemoryStore] Attaching information '{}' to node {node_id}",
            field.key
        );
        state.information.insert(field.id.clone(), field);
        state.upsert_information_relationship(relationship.clone());
        Ok(relationship)
    }

    /// Information fields attached to `node_id`, in attachment order.
    pub fn information_of(&self, node_id: &str) -> Vec<InformationField> {
        let state = self.0.read();
        state
            .information_relationships
            .iter()
            .filter(|r| r.source == node_id)
            .filter_map(|r| state.information.get(&r.target).cloned())
            .collect()
    }

    pub fn fetch_edges_for_node(&self, node_id: &str) -> NodeEdges {
        let state = self.0.read();
        NodeEdges {
            dependencies: state
                .edges
                .iter()
                .filter(|e| e.source_node_id == node_id || e.target_node_id == node_id)
                .cloned()
                .collect(),
            information: state
                .information_relationships
                .iter()
                .filter(|r| r.source == node_id)
                .cloned()
                .collect(),
        }
    }

    /// Validate `edge` against `rules` and the stored edges, then insert it, all under one write
    /// lock. Reusing an existing edge id updates that edge. An empty id is replaced by a fresh one.
    pub fn commit_edge(&self, rules: &RuleTable, mut edge: Edge) -> Result<Edge> {
        if edge.id.trim().is_empty() {
            edge.id = new_id();
        }
        let mut state = self.0.write();
        {
            let nodes_by_id: HashMap<&str, &ProvenanceNode> =
                state.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
            let rule =
                RelationshipValidator::new(rules).validate(&edge, &state.edges, &nodes_by_id)?;
            tracing::info!(
                "[MemoryStore] Committing edge {} ({edge}) under rule {}",
                edge.id,
                rule.id
            );
        }
        state.upsert_edge(edge.clone());
        Ok(edge)
    }

    pub fn delete_edge(&self, id: &str) -> Result<()> {
        let mut state = self.0.write();
        let before = state.edges.len();
        state.edges.retain(|e| e.id != id);
        if state.edges.len() == before {
            return Err(ProvenanceError::NotFound(format!("edge {id}")));
        }
        tracing::info!("[MemoryStore] Deleted edge {id}");
        Ok(())
    }
}

impl ProvenanceSource for MemoryStore {
    fn fetch_nodes(&self) -> Result<Vec<ProvenanceNode>> {
        Ok(self.nodes())
    }

    fn fetch_edges(&self, relationship: Option<RelationshipType>) -> Result<Vec<Edge>> {
        Ok(self
            .0
            .read()
            .edges
            .iter()
            .filter(|e| relationship.is_none_or(|r| e.relationship == r))
            .cloned()
            .collect())
    }

    fn fetch_study(&self, id: &str) -> Result<Option<Study>> {
        Ok(self.get_study(id))
    }
}
