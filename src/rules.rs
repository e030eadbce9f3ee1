//! Relationship rule table
//!
//! Every rule names a source and target definition and the relationship types allowed between
//! them. Rules are checked against the [DefinitionRegistry] once at load time and indexed by
//! `(source definition, target definition, relationship type)`.

use crate::{
    error::{ProvenanceError, Result},
    properties::{EnumSet, RelationshipRule, RelationshipType},
    registry::DefinitionRegistry,
};
use std::collections::{hash_map::Entry, HashMap, HashSet};

type TypeIndex = HashMap<RelationshipType, usize>;

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<RelationshipRule>,
    // source definition -> target definition -> relationship type -> rule
    index: HashMap<String, HashMap<String, TypeIndex>>,
}

/// Build a [RuleTable], failing if a rule names a definition the registry does not hold.
pub fn load_rules(
    rules: Vec<RelationshipRule>,
    registry: &DefinitionRegistry,
) -> Result<RuleTable> {
    RuleTable::load(rules, registry)
}

impl RuleTable {
    pub fn load(rules: Vec<RelationshipRule>, registry: &DefinitionRegistry) -> Result<Self> {
        let mut index: HashMap<String, HashMap<String, TypeIndex>> = HashMap::new();
        let mut ids = HashSet::with_capacity(rules.len());

        for (idx, rule) in rules.iter().enumerate() {
            if !ids.insert(rule.id.as_str()) {
                return Err(ProvenanceError::DuplicateRule(rule.id.clone()));
            }
            registry.get(&rule.source)?;
            registry.get(&rule.target)?;
            if rule.types.is_empty() {
                return Err(ProvenanceError::Decode(format!(
                    "rule '{}' declares no relationship type",
                    rule.id
                )));
            }

            let by_type = index
                .entry(rule.source.clone())
                .or_default()
                .entry(rule.target.clone())
                .or_default();
            for relationship in rule.types.iter() {
                match by_type.entry(relationship) {
                    Entry::Vacant(slot) => {
                        slot.insert(idx);
                    }
                    Entry::Occupied(existing) => {
                        tracing::warn!(
                            "[RuleTable::load] Rule '{}' overlaps rule '{}' for {} --[{}]--> {}; \
                             keeping '{}'",
                            rule.id,
                            rules[*existing.get()].id,
                            rule.source,
                            relationship,
                            rule.target,
                            rules[*existing.get()].id,
                        );
                    }
                }
            }
        }

        tracing::debug!("[RuleTable::load] Indexed {} relationship rules", rules.len());
        Ok(RuleTable { rules, index })
    }

    /// The rule allowing `source --[relationship]--> target`, if any.
    pub fn lookup(
        &self,
        source_definition: &str,
        target_definition: &str,
        relationship: RelationshipType,
    ) -> Option<&RelationshipRule> {
        self.index
            .get(source_definition)?
            .get(target_definition)?
            .get(&relationship)
            .map(|idx| &self.rules[*idx])
    }

    /// All relationship types allowed from one definition to another.
    pub fn allowed_types(
        &self,
        source_definition: &str,
        target_definition: &str,
    ) -> EnumSet<RelationshipType> {
        self.index
            .get(source_definition)
            .and_then(|targets| targets.get(target_definition))
            .map(|by_type| by_type.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn rules_from<'a>(
        &'a self,
        source_definition: &'a str,
    ) -> impl Iterator<Item = &'a RelationshipRule> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.source == source_definition)
    }

    pub fn get(&self, id: &str) -> Option<&RelationshipRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationshipRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
