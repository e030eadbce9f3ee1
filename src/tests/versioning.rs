//! Tests for version assignment over whole snapshots

use super::helpers::*;
use crate::{
    graph::DependencyGraph,
    snapshot::Snapshot,
    version::{compute_version, compute_versions, VersionAssigner, VersionScope, CYCLIC_VERSION},
};
use test_log::test;

#[test]
fn test_interleaved_definitions() {
    let snapshot = create_interleaved_snapshot();
    let versions = compute_versions(&snapshot, VersionScope::Definition);

    let expected = [
        ("A3", 1),
        ("A1", 2),
        ("A4", 3),
        ("A2", 4),
        ("B1", 1),
        ("B3", 2),
        ("B2", 3),
        ("B4", 4),
    ];
    for (id, version) in expected {
        assert_eq!(versions.get(id), Some(version), "version of {id}");
    }
    assert!(versions.cyclic.is_empty());
}

#[test]
fn test_single_and_batch_agree() {
    let snapshot = create_interleaved_snapshot();
    let versions = compute_versions(&snapshot, VersionScope::Definition);
    for node in snapshot.nodes.iter() {
        assert_eq!(
            compute_version(&snapshot, &node.id, VersionScope::Definition).unwrap(),
            versions.get(&node.id).unwrap()
        );
    }
}

#[test]
fn test_creation_order_breaks_ties() {
    let mut snapshot = create_interleaved_snapshot();
    // A4 now created before A1; both sit one A-node above A3
    let a4 = snapshot.nodes.remove(3);
    snapshot.nodes.insert(0, a4);
    let versions = compute_versions(&snapshot, VersionScope::Definition);
    assert_eq!(versions.get("A4"), Some(2));
    assert_eq!(versions.get("A1"), Some(3));
    assert_eq!(versions.get("A2"), Some(4));
}

#[test]
fn test_mutual_dependency_is_unversioned() {
    let snapshot = Snapshot::new(
        vec![node("a", "A"), node("b", "A"), node("c", "A"), node("d", "A")],
        vec![depends("a", "b"), depends("b", "a"), depends("c", "a"), depends("d", "c")],
        Vec::new(),
    );
    let versions = compute_versions(&snapshot, VersionScope::Definition);
    assert_eq!(versions.get("a"), Some(CYCLIC_VERSION));
    assert_eq!(versions.get("b"), Some(CYCLIC_VERSION));
    assert_eq!(versions.cyclic, vec!["a".to_string(), "b".to_string()]);

    // Edges into the cycle are ignored, the rest stays dense from 1
    assert_eq!(versions.get("c"), Some(1));
    assert_eq!(versions.get("d"), Some(2));
    assert_eq!(
        compute_version(&snapshot, "b", VersionScope::Definition).unwrap(),
        CYCLIC_VERSION
    );
}

#[test]
fn test_self_dependency_is_unversioned() {
    let snapshot = create_chain_snapshot(1, true);
    assert_eq!(
        compute_version(&snapshot, "n0", VersionScope::Definition).unwrap(),
        CYCLIC_VERSION
    );
}

#[test]
fn test_large_cycle_completes() {
    let snapshot = create_chain_snapshot(10_000, true);
    let versions = compute_versions(&snapshot, VersionScope::Definition);
    assert_eq!(versions.len(), 10_000);
    assert_eq!(versions.cyclic.len(), 10_000);
    assert!(versions.iter().all(|(_, v)| v == CYCLIC_VERSION));
}

#[test]
fn test_large_chain_is_numbered_from_the_leaf() {
    let snapshot = create_chain_snapshot(10_000, false);
    let graph = DependencyGraph::from_snapshot(&snapshot);
    let assigner = VersionAssigner::new(&graph, VersionScope::Definition);
    let versions = assigner.assign_all();
    assert_eq!(versions.get("n0"), Some(1));
    assert_eq!(versions.get("n4999"), Some(5_000));
    assert_eq!(versions.get("n9999"), Some(10_000));
    assert_eq!(assigner.compute_version("n9999").unwrap(), 10_000);
}

#[test]
fn test_per_study_scope() {
    let snapshot = Snapshot::new(
        vec![
            node_in_study("s1-rq1", "Research Question", "s1"),
            node_in_study("s2-rq1", "Research Question", "s2"),
            node_in_study("s1-rq2", "Research Question", "s1"),
            node("loose", "Research Question"),
        ],
        vec![depends("s1-rq2", "s1-rq1")],
        vec![study("s1", "Haack 2015"), study("s2", "Smith 2019")],
    );

    let global = compute_versions(&snapshot, VersionScope::Definition);
    assert_eq!(global.get("s1-rq1"), Some(1));
    assert_eq!(global.get("s2-rq1"), Some(2));
    assert_eq!(global.get("loose"), Some(3));
    assert_eq!(global.get("s1-rq2"), Some(4));

    let per_study = compute_versions(&snapshot, VersionScope::DefinitionAndStudy);
    assert_eq!(per_study.get("s1-rq1"), Some(1));
    assert_eq!(per_study.get("s1-rq2"), Some(2));
    assert_eq!(per_study.get("s2-rq1"), Some(1));
    assert_eq!(per_study.get("loose"), Some(1));
}

#[test]
fn test_unknown_node() {
    let snapshot = create_interleaved_snapshot();
    assert!(compute_version(&snapshot, "C1", VersionScope::Definition).is_err());
}

/// A chain where every node sits in its own study.
fn create_study_chain_snapshot(count: usize) -> Snapshot {
    let nodes = (0..count)
        .map(|i| node_in_study(&format!("n{i}"), "A", &format!("s{i}")))
        .collect();
    let edges = (1..count)
        .map(|i| depends(&format!("n{i}"), &format!("n{}", i - 1)))
        .collect();
    let studies = (0..count)
        .map(|i| study(&format!("s{i}"), "Haack 2015"))
        .collect();
    Snapshot::new(nodes, edges, studies)
}

#[test]
fn test_many_study_groups_visit_each_node_once() {
    let snapshot = create_study_chain_snapshot(20_000);
    let graph = DependencyGraph::from_snapshot(&snapshot);

    let per_study = VersionAssigner::new(&graph, VersionScope::DefinitionAndStudy);
    assert_eq!(per_study.work(), 20_000);
    let versions = per_study.assign_all();
    assert_eq!(versions.len(), 20_000);
    assert!(versions.iter().all(|(_, v)| v == 1));
    assert_eq!(per_study.compute_version("n19999").unwrap(), 1);

    let global = VersionAssigner::new(&graph, VersionScope::Definition);
    assert_eq!(global.work(), 20_000);
    let versions = global.assign_all();
    assert_eq!(versions.get("n0"), Some(1));
    assert_eq!(versions.get("n19999"), Some(20_000));
}

#[test]
fn test_study_groups_read_through_other_studies() {
    // s1 nodes are separated by a chain of s2 nodes
    let snapshot = Snapshot::new(
        vec![
            node_in_study("top", "A", "s1"),
            node_in_study("mid1", "A", "s2"),
            node_in_study("mid2", "A", "s2"),
            node_in_study("leaf", "A", "s1"),
            node_in_study("side", "A", "s1"),
        ],
        vec![
            depends("top", "mid1"),
            depends("mid1", "mid2"),
            depends("mid2", "leaf"),
        ],
        vec![study("s1", "Haack 2015"), study("s2", "Smith 2019")],
    );
    let versions = compute_versions(&snapshot, VersionScope::DefinitionAndStudy);
    assert_eq!(versions.get("leaf"), Some(1));
    assert_eq!(versions.get("side"), Some(2));
    assert_eq!(versions.get("top"), Some(3));
    assert_eq!(versions.get("mid2"), Some(1));
    assert_eq!(versions.get("mid1"), Some(2));
    for node in snapshot.nodes.iter() {
        assert_eq!(
            compute_version(&snapshot, &node.id, VersionScope::DefinitionAndStudy).unwrap(),
            versions.get(&node.id).unwrap(),
            "version of {}",
            node.id
        );
    }
}
