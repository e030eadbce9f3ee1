//! Snapshots of the external store
//!
//! The engine never talks to persistence itself. A [ProvenanceSource] is fetched once per request
//! into a [Snapshot], and every read or validation runs against that snapshot.

use crate::{
    error::{ProvenanceError, Result},
    properties::{Edge, ProvenanceNode, RelationshipType, Study},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Read access to the persistence collaborator.
pub trait ProvenanceSource {
    fn fetch_nodes(&self) -> Result<Vec<ProvenanceNode>>;
    /// All dependency edges, or only those of `relationship` when given.
    fn fetch_edges(&self, relationship: Option<RelationshipType>) -> Result<Vec<Edge>>;
    fn fetch_study(&self, id: &str) -> Result<Option<Study>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// In creation order; this order breaks ties between nodes of equal version depth.
    pub nodes: Vec<ProvenanceNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub studies: Vec<Study>,
}

impl Snapshot {
    pub fn new(nodes: Vec<ProvenanceNode>, edges: Vec<Edge>, studies: Vec<Study>) -> Self {
        Snapshot {
            nodes,
            edges,
            studies,
        }
    }

    /// Fetch nodes, edges and every study a node refers to.
    pub fn fetch<S: ProvenanceSource + ?Sized>(source: &S) -> Result<Snapshot> {
        let nodes = source.fetch_nodes()?;
        let edges = source.fetch_edges(None)?;
        let study_ids: BTreeSet<&str> =
            nodes.iter().filter_map(|n| n.study_id.as_deref()).collect();
        let mut studies = Vec::with_capacity(study_ids.len());
        for id in study_ids {
            match source.fetch_study(id)? {
                Some(study) => studies.push(study),
                None => tracing::debug!("[Snapshot::fetch] study {id} referenced but not found"),
            }
        }
        tracing::debug!(
            "[Snapshot::fetch] {} nodes, {} edges, {} studies",
            nodes.len(),
            edges.len(),
            studies.len()
        );
        Ok(Snapshot {
            nodes,
            edges,
            studies,
        })
    }

    pub fn from_json(json: &str) -> Result<Snapshot> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn node(&self, id: &str) -> Option<&ProvenanceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn require_node(&self, id: &str) -> Result<&ProvenanceNode> {
        self.node(id)
            .ok_or_else(|| ProvenanceError::NotFound(format!("provenance node {id}")))
    }

    pub fn study(&self, id: &str) -> Option<&Study> {
        self.studies.iter().find(|s| s.id == id)
    }

    pub fn study_of(&self, node: &ProvenanceNode) -> Option<&Study> {
        node.study_id.as_deref().and_then(|id| self.study(id))
    }

    pub fn nodes_by_id(&self) -> HashMap<&str, &ProvenanceNode> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// Every edge touching `node_id`, in either direction.
    pub fn edges_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source_node_id == node_id || e.target_node_id == node_id)
    }
}

impl ProvenanceSource for Snapshot {
    fn fetch_nodes(&self) -> Result<Vec<ProvenanceNode>> {
        Ok(self.nodes.clone())
    }

    fn fetch_edges(&self, relationship: Option<RelationshipType>) -> Result<Vec<Edge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| relationship.is_none_or(|r| e.relationship == r))
            .cloned()
            .collect())
    }

    fn fetch_study(&self, id: &str) -> Result<Option<Study>> {
        Ok(self.study(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        let mut n1 = ProvenanceNode::new("n1", "Simulation Model");
        n1.study_id = Some("s1".to_string());
        let mut n2 = ProvenanceNode::new("n2", "Building Simulation Model");
        n2.study_id = Some("missing".to_string());
        Snapshot::new(
            vec![n1, n2, ProvenanceNode::new("n3", "Requirement")],
            vec![
                Edge::new("e1", RelationshipType::GeneratedBy, "n1", "n2"),
                Edge::new("e2", RelationshipType::Used, "n2", "n3"),
            ],
            vec![
                Study {
                    id: "s1".to_string(),
                    ..Default::default()
                },
                Study {
                    id: "unused".to_string(),
                    ..Default::default()
                },
            ],
        )
    }

    #[test]
    fn test_fetch_keeps_referenced_studies() {
        let fetched = Snapshot::fetch(&snapshot()).unwrap();
        assert_eq!(fetched.nodes.len(), 3);
        assert_eq!(fetched.edges.len(), 2);
        assert_eq!(fetched.studies.len(), 1);
        assert_eq!(fetched.studies[0].id, "s1");
    }

    #[test]
    fn test_fetch_edges_by_type() {
        let snap = snapshot();
        let used = snap.fetch_edges(Some(RelationshipType::Used)).unwrap();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].id, "e2");
    }

    #[test]
    fn test_lookups() {
        let snap = snapshot();
        let n1 = snap.node("n1").unwrap();
        assert_eq!(snap.study_of(n1).map(|s| s.id.as_str()), Some("s1"));
        assert!(snap.study_of(snap.node("n2").unwrap()).is_none());
        assert!(matches!(
            snap.require_node("n9"),
            Err(ProvenanceError::NotFound(_))
        ));
        assert_eq!(snap.edges_of("n2").count(), 2);
        assert_eq!(snap.nodes_by_id().len(), 3);
    }

    #[test]
    fn test_from_json() {
        let snap = Snapshot::from_json(
            r#"{
                "nodes": [{"id": "a", "definitionId": "A"}],
                "edges": []
            }"#,
        )
        .unwrap();
        assert_eq!(snap.nodes[0].definition_id, "A");
        assert!(snap.studies.is_empty());
    }
}
