//! Display labels for provenance nodes.
//!
//! # Module Organization
//!
//! - [`template`]: Format string grammar and its interpreter
//! - [`render`]: The labelling fallback chain ([`LabelRenderer`])

pub mod render;
pub mod template;

pub use render::{render_label, LabelRenderer};
pub use template::{LabelContext, Template};
