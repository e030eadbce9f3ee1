//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use provenance_core::{
    engine::ProvenanceEngine,
    properties::{InformationField, ProvenanceNode},
    store::MemoryStore,
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn builtin_engine() -> ProvenanceEngine {
    ProvenanceEngine::builtin().expect("built-in catalog loads")
}

#[allow(dead_code)]
pub fn info(key: &str, value: &str) -> InformationField {
    InformationField {
        id: String::new(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// A store holding one node for each of the given `(id, definition)` pairs.
#[allow(dead_code)]
pub fn create_store(nodes: &[(&str, &str)]) -> MemoryStore {
    let store = MemoryStore::new();
    for (id, definition) in nodes {
        store
            .upsert_node(ProvenanceNode::new(id, definition))
            .expect("node stored");
    }
    store
}
