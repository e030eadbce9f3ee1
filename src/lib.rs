//! # provenance-core
//!
//! A Rust library for versioning, validating and labelling the provenance graph of a simulation
//! study.
//!
//! ## Overview
//!
//! Scientific artifacts (research questions, assumptions, models, experiments, data) and the
//! activities that connect them are stored as a typed graph. Every node carries a *definition*,
//! every edge a *relationship type*. provenance-core is the logic sitting between that store and
//! an API front end:
//!
//! - **Rule checking**: a proposed edge is accepted only if a relationship rule allows its
//!   `(source definition, target definition, type)` triple and its cardinality holds
//! - **Versioning**: every node gets a per-definition version number derived from the shape of
//!   the dependency graph. Versions are never stored, they are recomputed from each snapshot
//! - **Labelling**: display labels are rendered from small format strings such as
//!   `RQ${version}`
//!
//! ## Architecture
//!
//! - **[`registry`]** and **[`rules`]**: the static configuration, loaded once from a [`catalog`]
//! - **[`snapshot`]**: the [`snapshot::ProvenanceSource`] trait and per-request state
//! - **[`graph`]** and **[`version`]**: the dependency graph and version assignment
//! - **[`validate`]**: relationship rule checks
//! - **[`label`]**: format string grammar and label fallbacks
//! - **[`engine`]**: [`engine::ProvenanceEngine`], the entry points tying it all together
//! - **[`store`]**: an in-process store implementing [`snapshot::ProvenanceSource`]
//!
//! ## Quick Start
//!
//! ```rust
//! use provenance_core::{
//!     engine::ProvenanceEngine,
//!     properties::{Edge, ProvenanceNode, RelationshipType},
//!     snapshot::Snapshot,
//! };
//!
//! # fn main() -> Result<(), provenance_core::ProvenanceError> {
//! let engine = ProvenanceEngine::builtin()?;
//! let snapshot = Snapshot::new(
//!     vec![
//!         ProvenanceNode::new("rq", "Research Question"),
//!         ProvenanceNode::new("build", "Building Simulation Model"),
//!     ],
//!     vec![],
//!     vec![],
//! );
//!
//! let used = Edge::new("e1", RelationshipType::Used, "build", "rq");
//! engine.validate_edge(&used, &snapshot)?;
//!
//! let labels = engine.render_labels(&snapshot);
//! assert_eq!(labels["rq"], "RQ1");
//! assert_eq!(labels["build"], "BSM1");
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `bin`: the `provenance` command line tool for checking catalogs and snapshots

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod label;
pub mod properties;
pub mod registry;
pub mod rules;
pub mod snapshot;
pub mod store;
#[cfg(test)]
mod tests;
pub mod validate;
pub mod version;

pub use error::*;
