//! The entry points offered to an API front end.
//!
//! A [ProvenanceEngine] owns the definition registry and rule table for its whole lifetime and
//! answers every question against a [Snapshot] handed in by the caller. It holds no mutable state,
//! so a single engine can be shared between threads behind an `Arc`.

use crate::{
    catalog::Catalog,
    config::EngineConfig,
    error::Result,
    graph::DependencyGraph,
    label::LabelRenderer,
    properties::{Edge, NodeDefinition, ProvenanceNode, RelationshipRule},
    registry::DefinitionRegistry,
    rules::RuleTable,
    snapshot::Snapshot,
    validate::RelationshipValidator,
    version::{VersionAssigner, VersionScope, Versions},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ProvenanceEngine {
    registry: DefinitionRegistry,
    rules: RuleTable,
    renderer: LabelRenderer,
    scope: VersionScope,
}

impl ProvenanceEngine {
    pub fn new(registry: DefinitionRegistry, rules: RuleTable, scope: VersionScope) -> Self {
        let renderer = LabelRenderer::new(&registry);
        ProvenanceEngine {
            registry,
            rules,
            renderer,
            scope,
        }
    }

    /// Refuses to start when the catalog is inconsistent.
    pub fn from_catalog(catalog: &Catalog, scope: VersionScope) -> Result<Self> {
        let (registry, rules) = catalog.load()?;
        tracing::info!(
            "[ProvenanceEngine] Started with {} definitions and {} rules",
            registry.len(),
            rules.len()
        );
        Ok(ProvenanceEngine::new(registry, rules, scope))
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        ProvenanceEngine::from_catalog(&config.load_catalog()?, config.version_scope)
    }

    /// An engine over the built-in catalog.
    pub fn builtin() -> Result<Self> {
        ProvenanceEngine::from_catalog(&Catalog::builtin()?, VersionScope::default())
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn scope(&self) -> VersionScope {
        self.scope
    }

    pub fn definition(&self, id: &str) -> Result<&NodeDefinition> {
        self.registry.get(id)
    }

    /// Check `proposed` against the rules and the edges already in `snapshot`. Nothing is
    /// committed; the caller must commit against the same snapshot.
    pub fn validate_edge(&self, proposed: &Edge, snapshot: &Snapshot) -> Result<&RelationshipRule> {
        RelationshipValidator::new(&self.rules).validate(
            proposed,
            &snapshot.edges,
            &snapshot.nodes_by_id(),
        )
    }

    pub fn compute_version(&self, node_id: &str, snapshot: &Snapshot) -> Result<u32> {
        let graph = DependencyGraph::from_snapshot(snapshot);
        VersionAssigner::new(&graph, self.scope).compute_version(node_id)
    }

    pub fn compute_versions(&self, snapshot: &Snapshot) -> Versions {
        let graph = DependencyGraph::from_snapshot(snapshot);
        VersionAssigner::new(&graph, self.scope).assign_all()
    }

    /// The display label of `node`, computing its version from `snapshot`. The node itself need
    /// not be part of the snapshot; it is then treated as having no dependencies.
    pub fn render_label(&self, node: &ProvenanceNode, snapshot: &Snapshot) -> String {
        let version = match snapshot.node(&node.id) {
            Some(_) => self.compute_version(&node.id, snapshot),
            None => {
                let mut extended = snapshot.clone();
                extended.nodes.push(node.clone());
                self.compute_version(&node.id, &extended)
            }
        }
        .unwrap_or_else(|e| {
            tracing::debug!("[ProvenanceEngine::render_label] No version for {node}: {e}");
            crate::version::CYCLIC_VERSION
        });
        self.renderer.render(
            node,
            self.registry.find(&node.definition_id),
            version,
            snapshot.study_of(node),
        )
    }

    /// Labels of every node in `snapshot`, keyed by node id.
    pub fn render_labels(&self, snapshot: &Snapshot) -> BTreeMap<String, String> {
        let versions = self.compute_versions(snapshot);
        snapshot
            .nodes
            .iter()
            .map(|node| {
                let version = versions.get(&node.id).unwrap_or_default();
                let label = self.renderer.render(
                    node,
                    self.registry.find(&node.definition_id),
                    version,
                    snapshot.study_of(node),
                );
                (node.id.clone(), label)
            })
            .collect()
    }
}
