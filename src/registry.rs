//! Definition registry
//!
//! Holds the immutable set of [NodeDefinition]s the engine was started with. Definitions keep the
//! order they were loaded in so listings are stable.

use crate::{
    error::{ProvenanceError, Result},
    properties::{Classification, NodeDefinition},
};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<NodeDefinition>,
    index: HashMap<String, usize>,
}

/// Build a [DefinitionRegistry], refusing any repeated definition id.
pub fn load_definitions(definitions: Vec<NodeDefinition>) -> Result<DefinitionRegistry> {
    DefinitionRegistry::load(definitions)
}

impl DefinitionRegistry {
    pub fn load(definitions: Vec<NodeDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (idx, definition) in definitions.iter().enumerate() {
            if index.insert(definition.id.clone(), idx).is_some() {
                return Err(ProvenanceError::DuplicateDefinition(definition.id.clone()));
            }
        }
        tracing::debug!(
            "[DefinitionRegistry::load] Loaded {} node definitions",
            definitions.len()
        );
        Ok(DefinitionRegistry { definitions, index })
    }

    pub fn get(&self, id: &str) -> Result<&NodeDefinition> {
        self.find(id)
            .ok_or_else(|| ProvenanceError::UnknownDefinition(id.to_string()))
    }

    pub fn find(&self, id: &str) -> Option<&NodeDefinition> {
        self.index.get(id).map(|idx| &self.definitions[*idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.definitions.iter()
    }

    pub fn by_classification(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &NodeDefinition> {
        self.definitions
            .iter()
            .filter(move |d| d.classification == classification)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
