pub use enumset::EnumSet;
/// [crate::properties] contains the data model shared by every part of the engine: node
/// definitions, relationship rules, and the persisted provenance entities they constrain.
use enumset::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::{ProvenanceError, Result};

pub(crate) mod relationship_type_list {
    // Serialize an EnumSet as a list of names rather than enumset's default bitmask. A bare string
    // is accepted on input as a one-element set.
    use super::RelationshipType;
    use enumset::EnumSet;
    use serde::{Deserializer, Serializer};
    use std::str::FromStr;

    pub(crate) fn serialize<S: Serializer>(
        set: &EnumSet<RelationshipType>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        ser.collect_seq(set.iter())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> core::result::Result<EnumSet<RelationshipType>, D::Error> {
        struct Visitor;
        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = EnumSet<RelationshipType>;
            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                write!(formatter, "A RelationshipType or a list of RelationshipType values")
            }
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                RelationshipType::from_str(v)
                    .map(EnumSet::only)
                    .map_err(|e| E::custom(e.to_string()))
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut accum = EnumSet::<RelationshipType>::new();
                while let Some(val) = seq.next_element::<RelationshipType>()? {
                    accum |= val;
                }
                Ok(accum)
            }
        }
        de.deserialize_any(Visitor)
    }
}

/// Coarse category of a provenance node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Entity,
    Activity,
    Agent,
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Classification::Entity => "entity",
            Classification::Activity => "activity",
            Classification::Agent => "agent",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Classification {
    type Err = ProvenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "entity" => Ok(Classification::Entity),
            "activity" => Ok(Classification::Activity),
            "agent" => Ok(Classification::Agent),
            _ => Err(ProvenanceError::Decode(format!(
                "'{s}' is not a classification (entity, activity, agent)"
            ))),
        }
    }
}

/// The closed vocabulary of relationships between provenance nodes. Rules restrict which of these
/// may actually be formed between two definitions.
///
/// Both types are dependency-bearing: the source of a `Used` or `Generated by` edge depends on its
/// target.
#[derive(EnumSetType, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipType {
    Used,
    #[serde(rename = "Generated by")]
    GeneratedBy,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Used => "Used",
            RelationshipType::GeneratedBy => "Generated by",
        }
    }

    /// Whether edges of this type take part in version computation.
    pub fn is_dependency(&self) -> bool {
        matches!(self, RelationshipType::Used | RelationshipType::GeneratedBy)
    }
}

impl Display for RelationshipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = ProvenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Used" => Ok(RelationshipType::Used),
            "Generated by" => Ok(RelationshipType::GeneratedBy),
            _ => Err(ProvenanceError::Decode(format!(
                "'{s}' is not a relationship type (Used, Generated by)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
}

impl Display for Cardinality {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "one-to-one"),
            Cardinality::OneToMany => write!(f, "one-to-many"),
        }
    }
}

/// A declared information field of a definition.
///
/// Stored as a single string: the field name optionally followed by comma separated options, e.g.
/// `"Type,Explanation,Prediction,Other"`. A field with options is answered from that set; a field
/// without options is free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InformationFieldSpec {
    pub name: String,
    pub options: Vec<String>,
}

impl InformationFieldSpec {
    pub fn text(name: &str) -> Self {
        InformationFieldSpec {
            name: name.to_string(),
            options: Vec::new(),
        }
    }

    pub fn is_choice(&self) -> bool {
        !self.options.is_empty()
    }

    pub fn accepts(&self, value: &str) -> bool {
        !self.is_choice() || self.options.iter().any(|opt| opt == value)
    }
}

impl TryFrom<String> for InformationFieldSpec {
    type Error = ProvenanceError;

    fn try_from(raw: String) -> Result<Self> {
        InformationFieldSpec::from_str(&raw)
    }
}

impl FromStr for InformationFieldSpec {
    type Err = ProvenanceError;

    fn from_str(raw: &str) -> Result<Self> {
        let mut parts = raw.split(',');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ProvenanceError::Decode(format!(
                "information field '{raw}' has no name"
            )));
        }
        Ok(InformationFieldSpec {
            name: name.to_string(),
            options: parts
                .map(str::trim)
                .filter(|opt| !opt.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

impl From<InformationFieldSpec> for String {
    fn from(spec: InformationFieldSpec) -> String {
        spec.to_string()
    }
}

impl Display for InformationFieldSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for opt in self.options.iter() {
            write!(f, ",{opt}")?;
        }
        Ok(())
    }
}

/// The type template of a provenance node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    pub id: String,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// See [crate::label] for the template grammar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_format_string: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub information_fields: Vec<InformationFieldSpec>,
    #[serde(default)]
    pub show_related_to: bool,
}

impl NodeDefinition {
    pub fn new(id: &str, classification: Classification) -> Self {
        NodeDefinition {
            id: id.to_string(),
            classification,
            label: None,
            label_format_string: None,
            information_fields: Vec::new(),
            show_related_to: false,
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.label_format_string = Some(format.to_string());
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn field(&self, name: &str) -> Option<&InformationFieldSpec> {
        self.information_fields.iter().find(|f| f.name == name)
    }
}

/// A declared, allowed `(source definition, target definition, relationship type)` combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRule {
    pub id: String,
    #[serde(rename = "type", with = "relationship_type_list")]
    pub types: EnumSet<RelationshipType>,
    pub cardinality: Cardinality,
    pub source: String,
    pub target: String,
}

impl RelationshipRule {
    pub fn new(
        id: &str,
        types: EnumSet<RelationshipType>,
        cardinality: Cardinality,
        source: &str,
        target: &str,
    ) -> Self {
        RelationshipRule {
            id: id.to_string(),
            types,
            cardinality,
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceNode {
    pub id: String,
    /// Not checked on read: a definition removed after the node was created leaves this dangling.
    pub definition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_id: Option<String>,
    /// Explicit label override, used verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet: Option<String>,
    /// Free text naming the label of another node. Not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_to: Option<String>,
}

impl ProvenanceNode {
    pub fn new(id: &str, definition_id: &str) -> Self {
        ProvenanceNode {
            id: id.to_string(),
            definition_id: definition_id.to_string(),
            ..Default::default()
        }
    }
}

impl Display for ProvenanceNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.definition_id)
    }
}

/// A relationship instance between two provenance nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    #[serde(rename = "type")]
    pub relationship: RelationshipType,
    pub source_node_id: String,
    pub target_node_id: String,
}

impl Edge {
    pub fn new(id: &str, relationship: RelationshipType, source: &str, target: &str) -> Self {
        Edge {
            id: id.to_string(),
            relationship,
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
        }
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} --[{}]--> {}",
            self.source_node_id, self.relationship, self.target_node_id
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Study {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Bibliographic source, e.g. `Haack et al., PLoS comp. bio. 2015`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationField {
    pub id: String,
    pub key: String,
    pub value: String,
}

/// The HAS_INFORMATION relationship attaching an [InformationField] to its node.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationRelationship {
    pub id: String,
    /// Provenance node id
    pub source: String,
    /// Information field id
    pub target: String,
}

fn decode_entity<T: DeserializeOwned>(kind: &str, value: &JsonValue) -> Result<T> {
    T::deserialize(value).map_err(|e| ProvenanceError::Decode(format!("{kind}: {e}")))
}

fn require(kind: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ProvenanceError::Decode(format!(
            "{kind}: '{field}' must not be empty"
        )))
    } else {
        Ok(())
    }
}

pub fn decode_definition(value: &JsonValue) -> Result<NodeDefinition> {
    let definition: NodeDefinition = decode_entity("NodeDefinition", value)?;
    require("NodeDefinition", "id", &definition.id)?;
    Ok(definition)
}

pub fn decode_rule(value: &JsonValue) -> Result<RelationshipRule> {
    let rule: RelationshipRule = decode_entity("RelationshipRule", value)?;
    require("RelationshipRule", "id", &rule.id)?;
    if rule.types.is_empty() {
        return Err(ProvenanceError::Decode(format!(
            "RelationshipRule: '{}' declares no relationship type",
            rule.id
        )));
    }
    Ok(rule)
}

pub fn decode_node(value: &JsonValue) -> Result<ProvenanceNode> {
    let node: ProvenanceNode = decode_entity("ProvenanceNode", value)?;
    require("ProvenanceNode", "id", &node.id)?;
    require("ProvenanceNode", "definitionId", &node.definition_id)?;
    Ok(node)
}

pub fn decode_edge(value: &JsonValue) -> Result<Edge> {
    let edge: Edge = decode_entity("Edge", value)?;
    require("Edge", "id", &edge.id)?;
    require("Edge", "sourceNodeId", &edge.source_node_id)?;
    require("Edge", "targetNodeId", &edge.target_node_id)?;
    Ok(edge)
}

pub fn decode_study(value: &JsonValue) -> Result<Study> {
    let study: Study = decode_entity("Study", value)?;
    require("Study", "id", &study.id)?;
    Ok(study)
}

pub fn decode_information(value: &JsonValue) -> Result<InformationField> {
    let field: InformationField = decode_entity("InformationField", value)?;
    require("InformationField", "id", &field.id)?;
    require("InformationField", "key", &field.key)?;
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_information_field_spec_parsing() {
        let spec: InformationFieldSpec = "Type,Explanation,Prediction,Other".parse().unwrap();
        assert_eq!(spec.name, "Type");
        assert_eq!(spec.options, vec!["Explanation", "Prediction", "Other"]);
        assert!(spec.accepts("Prediction"));
        assert!(!spec.accepts("Guess"));
        assert_eq!(spec.to_string(), "Type,Explanation,Prediction,Other");

        let free: InformationFieldSpec = "Description".parse().unwrap();
        assert!(!free.is_choice());
        assert!(free.accepts("anything at all"));

        assert!(",a,b".parse::<InformationFieldSpec>().is_err());
    }

    #[test]
    fn test_decode_definition() {
        let definition = decode_definition(&json!({
            "id": "Research Question",
            "classification": "entity",
            "labelFormatString": "RQ${version}",
            "informationFields": ["TRACE Tag", "Type,Explanation,Prediction,Other"]
        }))
        .unwrap();
        assert_eq!(definition.classification, Classification::Entity);
        assert_eq!(definition.label_format_string.as_deref(), Some("RQ${version}"));
        assert_eq!(definition.field("Type").map(|f| f.options.len()), Some(3));
        assert!(!definition.show_related_to);

        let err = decode_definition(&json!({"id": "X", "classification": "widget"})).unwrap_err();
        assert!(matches!(err, ProvenanceError::Decode(_)));
    }

    #[test]
    fn test_decode_rule_type_forms() {
        let rule = decode_rule(&json!({
            "id": "sm-generated-by-bsm",
            "type": ["Generated by"],
            "cardinality": "one-to-one",
            "source": "Simulation Model",
            "target": "Building Simulation Model"
        }))
        .unwrap();
        assert!(rule.types.contains(RelationshipType::GeneratedBy));
        assert_eq!(rule.cardinality, Cardinality::OneToOne);

        let single = decode_rule(&json!({
            "id": "single",
            "type": "Used",
            "cardinality": "one-to-many",
            "source": "A",
            "target": "B"
        }))
        .unwrap();
        assert_eq!(single.types, EnumSet::only(RelationshipType::Used));

        let empty = decode_rule(&json!({
            "id": "empty",
            "type": [],
            "cardinality": "one-to-many",
            "source": "A",
            "target": "B"
        }));
        assert!(matches!(empty, Err(ProvenanceError::Decode(_))));

        let unknown = decode_rule(&json!({
            "id": "bad",
            "type": ["Derived from"],
            "cardinality": "one-to-many",
            "source": "A",
            "target": "B"
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_rule_serializes_types_as_list() {
        let rule = RelationshipRule::new(
            "r",
            RelationshipType::Used | RelationshipType::GeneratedBy,
            Cardinality::OneToMany,
            "A",
            "B",
        );
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["type"], json!(["Used", "Generated by"]));
        assert_eq!(value["cardinality"], json!("one-to-many"));
    }

    #[test]
    fn test_decode_node_and_edge() {
        let node = decode_node(&json!({
            "id": "n1",
            "definitionId": "Requirement",
            "studyId": "s1",
            "relatedTo": "WD2"
        }))
        .unwrap();
        assert_eq!(node.study_id.as_deref(), Some("s1"));
        assert_eq!(node.related_to.as_deref(), Some("WD2"));
        assert!(decode_node(&json!({"id": "n2", "definitionId": ""})).is_err());

        let edge = decode_edge(&json!({
            "id": "e1",
            "type": "Generated by",
            "sourceNodeId": "n1",
            "targetNodeId": "n2"
        }))
        .unwrap();
        assert_eq!(edge.relationship, RelationshipType::GeneratedBy);
        assert_eq!(edge.to_string(), "n1 --[Generated by]--> n2");
    }

    #[test]
    fn test_decode_study_and_information() {
        let study = decode_study(&json!({"id": "s1", "source": "Haack et al. 2015"})).unwrap();
        assert_eq!(study.source.as_deref(), Some("Haack et al. 2015"));
        assert!(decode_study(&json!({"label": "no id"})).is_err());

        let field =
            decode_information(&json!({"id": "f1", "key": "Description", "value": ""})).unwrap();
        assert_eq!(field.key, "Description");
        assert!(decode_information(&json!({"id": "f2", "key": "", "value": "x"})).is_err());
    }
}
