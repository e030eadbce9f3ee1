//! Static configuration: the node definitions and relationship rules an engine starts with.
//!
//! A catalog file holds `definitions` and `rules` arrays in the shape of [NodeDefinition] and
//! [RelationshipRule]. TOML and JSON are both accepted; the format is picked from the file
//! extension.

use crate::{
    error::{ProvenanceError, Result},
    properties::{NodeDefinition, RelationshipRule},
    registry::DefinitionRegistry,
    rules::RuleTable,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path};

const TRACE_CATALOG: &str = include_str!("../assets/trace_catalog.toml");

static BUILTIN: Lazy<Result<Catalog>> = Lazy::new(|| Catalog::from_toml_str(TRACE_CATALOG));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub definitions: Vec<NodeDefinition>,
    #[serde(default)]
    pub rules: Vec<RelationshipRule>,
}

impl Catalog {
    /// The TRACE modelling catalog shipped with the crate.
    pub fn builtin() -> Result<Catalog> {
        Result::clone(&BUILTIN)
    }

    pub fn from_toml_str(content: &str) -> Result<Catalog> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.check_rule_types()?;
        Ok(catalog)
    }

    pub fn from_json_str(content: &str) -> Result<Catalog> {
        let catalog: Catalog = serde_json::from_str(content)?;
        catalog.check_rule_types()?;
        Ok(catalog)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Catalog> {
        let path = path.as_ref();
        tracing::debug!("[Catalog::from_path] Reading {:?}", path);
        let content = read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Catalog::from_json_str(&content),
            Some("toml") => Catalog::from_toml_str(&content),
            _ => Err(ProvenanceError::Decode(format!(
                "{path:?}: catalog files must end in .toml or .json"
            ))),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Build the registry and rule table, failing on any inconsistency.
    pub fn load(&self) -> Result<(DefinitionRegistry, RuleTable)> {
        let registry = DefinitionRegistry::load(self.definitions.clone())?;
        let rules = RuleTable::load(self.rules.clone(), &registry)?;
        Ok((registry, rules))
    }

    fn check_rule_types(&self) -> Result<()> {
        match self.rules.iter().find(|rule| rule.types.is_empty()) {
            Some(rule) => Err(ProvenanceError::Decode(format!(
                "RelationshipRule: '{}' declares no relationship type",
                rule.id
            ))),
            None => Ok(()),
        }
    }
}
