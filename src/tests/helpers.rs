//! Shared test utilities for version and label testing

use crate::{
    properties::{Edge, ProvenanceNode, RelationshipType, Study},
    snapshot::Snapshot,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn node(id: &str, definition: &str) -> ProvenanceNode {
    ProvenanceNode::new(id, definition)
}

pub fn node_in_study(id: &str, definition: &str, study: &str) -> ProvenanceNode {
    ProvenanceNode {
        study_id: Some(study.to_string()),
        ..ProvenanceNode::new(id, definition)
    }
}

pub fn study(id: &str, source: &str) -> Study {
    Study {
        id: id.to_string(),
        label: None,
        source: Some(source.to_string()),
    }
}

/// `source` depends on `target`.
pub fn depends(source: &str, target: &str) -> Edge {
    Edge::new(
        &format!("{source}-{target}"),
        RelationshipType::Used,
        source,
        target,
    )
}

/// Two interleaved definitions, `A` and `B`:
///
/// ```text
/// B1 -> A1 <- A2        B2 -> B3 <- A4 <- B4
///       |                     |
///       v                     v
///       A3 <------------------+
/// ```
///
/// Nodes are created `A1..A4` then `B1..B4`. Expected versions:
/// `A3=1 A1=2 A4=3 A2=4` and `B1=1 B3=2 B2=3 B4=4`.
pub fn create_interleaved_snapshot() -> Snapshot {
    init_logging();
    let nodes = ["A1", "A2", "A3", "A4", "B1", "B2", "B3", "B4"]
        .into_iter()
        .map(|id| node(id, &id[..1]))
        .collect();
    let edges = vec![
        depends("B1", "A1"),
        depends("A2", "A1"),
        depends("A1", "A3"),
        depends("B3", "A3"),
        depends("B2", "B3"),
        depends("A4", "B3"),
        depends("B4", "A4"),
    ];
    Snapshot::new(nodes, edges, Vec::new())
}

/// `count` nodes of one definition, each depending on the one created before it. With `closed`
/// the first node also depends on the last.
pub fn create_chain_snapshot(count: usize, closed: bool) -> Snapshot {
    let nodes: Vec<ProvenanceNode> = (0..count).map(|i| node(&format!("n{i}"), "A")).collect();
    let mut edges: Vec<Edge> = (1..count)
        .map(|i| depends(&format!("n{i}"), &format!("n{}", i - 1)))
        .collect();
    if closed && count > 0 {
        edges.push(depends("n0", &format!("n{}", count - 1)));
    }
    Snapshot::new(nodes, edges, Vec::new())
}
