use crate::{
    label::template::{LabelContext, Template},
    properties::{NodeDefinition, ProvenanceNode, Study},
    registry::DefinitionRegistry,
};
use std::collections::HashMap;

/// Renders display labels, holding every definition's format string pre-parsed.
#[derive(Debug, Clone, Default)]
pub struct LabelRenderer {
    templates: HashMap<String, Template>,
}

impl LabelRenderer {
    /// Parse the format string of every definition in `registry`. A malformed format string is
    /// logged and skipped, so labels for that definition fall back to the static label or id.
    pub fn new(registry: &DefinitionRegistry) -> Self {
        let mut templates = HashMap::new();
        for definition in registry.iter() {
            let Some(format) = definition.label_format_string.as_deref() else {
                continue;
            };
            match Template::parse(format) {
                Ok(template) => {
                    templates.insert(definition.id.clone(), template);
                }
                Err(e) => tracing::warn!(
                    "[LabelRenderer::new] Ignoring label format of '{}': {e}",
                    definition.id
                ),
            }
        }
        LabelRenderer { templates }
    }

    /// The first of: the node's own label, the definition's format string, the definition's static
    /// label, the definition id. A missing definition leaves only the node's `definition_id`.
    pub fn render(
        &self,
        node: &ProvenanceNode,
        definition: Option<&NodeDefinition>,
        version: u32,
        study: Option<&Study>,
    ) -> String {
        if let Some(label) = node.label.as_deref().filter(|l| !l.is_empty()) {
            return label.to_string();
        }
        let Some(definition) = definition else {
            return node.definition_id.clone();
        };
        if let Some(template) = self.templates.get(&definition.id) {
            match template.render(&LabelContext {
                version,
                study,
                node,
            }) {
                Ok(label) => return label,
                Err(e) => tracing::debug!(
                    "[LabelRenderer::render] Format '{template}' failed for node {}: {e}",
                    node.id
                ),
            }
        }
        fallback(definition)
    }
}

fn fallback(definition: &NodeDefinition) -> String {
    definition
        .label
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| definition.id.clone())
}

/// Render a label without a [LabelRenderer], parsing the definition's format string on the spot.
pub fn render_label(
    node: &ProvenanceNode,
    definition: &NodeDefinition,
    version: u32,
    study: Option<&Study>,
) -> String {
    if let Some(label) = node.label.as_deref().filter(|l| !l.is_empty()) {
        return label.to_string();
    }
    definition
        .label_format_string
        .as_deref()
        .and_then(|format| Template::parse(format).ok())
        .and_then(|template| {
            template
                .render(&LabelContext {
                    version,
                    study,
                    node,
                })
                .ok()
        })
        .unwrap_or_else(|| fallback(definition))
}
