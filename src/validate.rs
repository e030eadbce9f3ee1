//! Relationship validation
//!
//! A proposed edge is accepted when a rule allows its `(source definition, target definition,
//! type)` triple and, for one-to-one rules, the source has no other edge of that type to a node of
//! the same target definition. Validation is a pure check; committing the edge is the caller's job
//! and must use the same edge set that was validated.

use crate::{
    error::{ProvenanceError, Result},
    properties::{Cardinality, Edge, ProvenanceNode, RelationshipRule},
    rules::RuleTable,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct RelationshipValidator<'a> {
    rules: &'a RuleTable,
}

impl<'a> RelationshipValidator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        RelationshipValidator { rules }
    }

    /// Returns the rule that admits `proposed`.
    pub fn validate(
        &self,
        proposed: &Edge,
        current_edges: &[Edge],
        nodes_by_id: &HashMap<&str, &ProvenanceNode>,
    ) -> Result<&'a RelationshipRule> {
        let source = resolve(nodes_by_id, &proposed.source_node_id)?;
        let target = resolve(nodes_by_id, &proposed.target_node_id)?;

        let rule = self
            .rules
            .lookup(
                &source.definition_id,
                &target.definition_id,
                proposed.relationship,
            )
            .ok_or_else(|| ProvenanceError::NoMatchingRule {
                source_definition: source.definition_id.clone(),
                target_definition: target.definition_id.clone(),
                relationship: proposed.relationship.to_string(),
            })?;

        if rule.cardinality == Cardinality::OneToOne {
            let conflict = current_edges.iter().find(|existing| {
                existing.id != proposed.id
                    && existing.source_node_id == proposed.source_node_id
                    && existing.relationship == proposed.relationship
                    && existing.target_node_id != proposed.target_node_id
                    && nodes_by_id
                        .get(existing.target_node_id.as_str())
                        .is_some_and(|n| n.definition_id == target.definition_id)
            });
            if let Some(existing) = conflict {
                return Err(ProvenanceError::CardinalityViolation {
                    rule: rule.id.clone(),
                    source_node: proposed.source_node_id.clone(),
                    relationship: proposed.relationship.to_string(),
                    existing_target: existing.target_node_id.clone(),
                });
            }
        }

        Ok(rule)
    }
}

fn resolve<'n>(
    nodes_by_id: &HashMap<&str, &'n ProvenanceNode>,
    id: &str,
) -> Result<&'n ProvenanceNode> {
    nodes_by_id
        .get(id)
        .copied()
        .ok_or_else(|| ProvenanceError::NotFound(format!("provenance node {id}")))
}

/// Free-function form of [RelationshipValidator::validate].
pub fn validate_edge<'a>(
    rules: &'a RuleTable,
    proposed: &Edge,
    current_edges: &[Edge],
    nodes_by_id: &HashMap<&str, &ProvenanceNode>,
) -> Result<&'a RelationshipRule> {
    RelationshipValidator::new(rules).validate(proposed, current_edges, nodes_by_id)
}
