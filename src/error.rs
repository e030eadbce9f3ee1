use std::io;

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ProvenanceError {
    #[error("Duplicate node definition: {0}")]
    DuplicateDefinition(String),
    #[error("Unknown node definition: {0}")]
    UnknownDefinition(String),
    #[error("Duplicate relationship rule: {0}")]
    DuplicateRule(String),
    #[error("No rule allows '{source_definition}' --[{relationship}]--> '{target_definition}'")]
    NoMatchingRule {
        source_definition: String,
        target_definition: String,
        relationship: String,
    },
    #[error(
        "Rule '{rule}' is one-to-one: node '{source_node}' already has a '{relationship}' \
         relationship to '{existing_target}'"
    )]
    CardinalityViolation {
        rule: String,
        source_node: String,
        relationship: String,
        existing_target: String,
    },
    #[error("Information field '{field}' is already attached to node '{node}'")]
    AlreadyAttached { field: String, node: String },
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Label template error: {0}")]
    Template(String),
    #[error("File System error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, ProvenanceError>;

impl ProvenanceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProvenanceError::DuplicateDefinition(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProvenanceError::UnknownDefinition(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProvenanceError::DuplicateRule(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProvenanceError::NoMatchingRule { .. } => StatusCode::BAD_REQUEST,
            ProvenanceError::CardinalityViolation { .. } => StatusCode::CONFLICT,
            ProvenanceError::AlreadyAttached { .. } => StatusCode::CONFLICT,
            ProvenanceError::NotFound(_) => StatusCode::NOT_FOUND,
            ProvenanceError::Decode(_) => StatusCode::BAD_REQUEST,
            ProvenanceError::Template(_) => StatusCode::BAD_REQUEST,
            ProvenanceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for the errors produced by relationship validation.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            ProvenanceError::NoMatchingRule { .. } | ProvenanceError::CardinalityViolation { .. }
        )
    }
}

impl From<toml::de::Error> for ProvenanceError {
    fn from(src: toml::de::Error) -> ProvenanceError {
        ProvenanceError::Decode(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for ProvenanceError {
    fn from(src: toml::ser::Error) -> ProvenanceError {
        ProvenanceError::Decode(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for ProvenanceError {
    fn from(src: JsonError) -> ProvenanceError {
        ProvenanceError::Decode(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for ProvenanceError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => ProvenanceError::NotFound(format!("{x}")),
            _ => ProvenanceError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let violation = ProvenanceError::CardinalityViolation {
            rule: "r".to_string(),
            source_node: "a".to_string(),
            relationship: "Used".to_string(),
            existing_target: "b".to_string(),
        };
        assert_eq!(violation.status_code(), StatusCode::CONFLICT);
        assert!(violation.is_rule_violation());

        let missing = ProvenanceError::NotFound("node x".to_string());
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert!(!missing.is_rule_violation());
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err: ProvenanceError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ProvenanceError::NotFound(_)));
    }
}
