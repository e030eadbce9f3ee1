//! Performance benchmarks for per-request version computation
//!
//! Every read rebuilds the dependency graph from a fresh snapshot, so these measure the full
//! build + assign cost over a 10,000 node provenance graph shaped like a long modelling history:
//! alternating building activities and simulation models, each building activity using the
//! previous model plus a few research questions.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use provenance_core::{
    engine::ProvenanceEngine,
    properties::{Edge, ProvenanceNode, RelationshipType},
    snapshot::Snapshot,
    version::{compute_version, compute_versions, VersionScope},
};
use std::hint::black_box;

const NODE_COUNT: usize = 10_000;

fn modelling_history(count: usize) -> Snapshot {
    let mut nodes = Vec::with_capacity(count);
    let mut edges = Vec::new();
    let questions = count / 10;
    for i in 0..questions {
        nodes.push(ProvenanceNode::new(&format!("rq{i}"), "Research Question"));
    }
    let rounds = (count - questions) / 2;
    for i in 0..rounds {
        let build = format!("build{i}");
        let model = format!("model{i}");
        nodes.push(ProvenanceNode::new(&build, "Building Simulation Model"));
        nodes.push(ProvenanceNode::new(&model, "Simulation Model"));
        edges.push(Edge::new(
            &format!("gen{i}"),
            RelationshipType::GeneratedBy,
            &model,
            &build,
        ));
        if i > 0 {
            edges.push(Edge::new(
                &format!("prev{i}"),
                RelationshipType::Used,
                &build,
                &format!("model{}", i - 1),
            ));
        }
        for q in 0..3 {
            let rq = (i * 7 + q * 13) % questions.max(1);
            edges.push(Edge::new(
                &format!("rq{i}-{q}"),
                RelationshipType::Used,
                &build,
                &format!("rq{rq}"),
            ));
        }
    }
    Snapshot::new(nodes, edges, Vec::new())
}

fn bench_compute_versions(c: &mut Criterion) {
    let snapshot = modelling_history(NODE_COUNT);
    c.bench_function("compute_versions_10k", |b| {
        b.iter(|| compute_versions(black_box(&snapshot), VersionScope::Definition))
    });
}

fn bench_compute_versions_per_study(c: &mut Criterion) {
    let mut snapshot = modelling_history(NODE_COUNT);
    for (i, node) in snapshot.nodes.iter_mut().enumerate() {
        node.study_id = Some(format!("study{}", i / 4));
    }
    c.bench_function("compute_versions_per_study_10k", |b| {
        b.iter(|| compute_versions(black_box(&snapshot), VersionScope::DefinitionAndStudy))
    });
}

fn bench_compute_single_version(c: &mut Criterion) {
    let snapshot = modelling_history(NODE_COUNT);
    let last_model = format!("model{}", (NODE_COUNT - NODE_COUNT / 10) / 2 - 1);
    c.bench_function("compute_version_10k", |b| {
        b.iter(|| compute_version(black_box(&snapshot), &last_model, VersionScope::Definition))
    });
}

fn bench_render_labels(c: &mut Criterion) {
    let engine = ProvenanceEngine::builtin().unwrap();
    let snapshot = modelling_history(NODE_COUNT);
    c.bench_function("render_labels_10k", |b| {
        b.iter(|| engine.render_labels(black_box(&snapshot)))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(30);
    targets =
        bench_compute_versions,
        bench_compute_versions_per_study,
        bench_compute_single_version,
        bench_render_labels
}

criterion_main!(benches);
