//! Renders domain objects into anchored Mermaid blocks, and whole initial documents.

use std::sync::Arc;

use atoll_core::config::{BlockKind, LoadedConfig};
use atoll_core::domain::{DomainObject, ParentRef};
use serde_json::{Value, json};

use crate::anchors::{anchor_begin, anchor_end, insertion_marker};
use crate::styles::{
    resolve_attribute_style, resolve_entity_style, resolve_root_style, style_line,
};
use crate::template;
use crate::{Error, Result};

/// Document id of the fixed nested connections region.
pub const CONNECTIONS_ID: &str = "connections";

const CONNECTIONS_LABEL: &str = "*Connections*";

/// Generated blocks are styled with the default theme so rendering stays deterministic
/// without parsing existing document content.
const BLOCK_THEME: &str = "light";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    pub document_id: String,
    pub block: String,
}

#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    config: Arc<LoadedConfig>,
}

impl DocumentGenerator {
    pub fn new(config: Arc<LoadedConfig>) -> Self {
        Self { config }
    }

    /// Derives the document id for an object. Deterministic: the entity's id template only
    /// substitutes the object id, so the same (entity, id) pair always yields the same
    /// document id regardless of attributes.
    pub fn resolve_document_id(&self, entity: &str, object_id: &str) -> Result<String> {
        let mapping = self
            .config
            .mapping
            .entity(entity)
            .ok_or_else(|| Error::MissingEntityMapping {
                entity: entity.to_string(),
            })?;
        Ok(template::apply(
            &mapping.id,
            &json!({ "object": { "id": object_id } }),
        ))
    }

    pub fn root_document_id(&self, root: &str) -> Result<String> {
        let mapping = self
            .config
            .mapping
            .root(root)
            .ok_or_else(|| Error::MissingRootMapping {
                root: root.to_string(),
            })?;
        Ok(mapping.id.clone())
    }

    /// The insertion target for a parent reference: the root's fixed block, or the parent
    /// object's own block.
    pub fn parent_document_id(&self, parent: &ParentRef) -> Result<String> {
        match parent {
            ParentRef::Root(root) => self.root_document_id(root),
            ParentRef::Entity { entity, id } => self.resolve_document_id(entity, id),
        }
    }

    /// Renders an object into its anchored block. Structural entities become subgraphs with
    /// their own insertion marker; leaf entities become single nodes. Decoration (attribute
    /// summary, style lines) lives inside the anchored region so removal stays atomic.
    pub fn render_entity_block(&self, entity: &str, object: &DomainObject) -> Result<RenderedBlock> {
        let mapping = self
            .config
            .mapping
            .entity(entity)
            .ok_or_else(|| Error::MissingEntityMapping {
                entity: entity.to_string(),
            })?;
        let schema_entity =
            self.config
                .schema
                .entity(entity)
                .ok_or_else(|| Error::UnknownEntity {
                    entity: entity.to_string(),
                })?;

        let globals = &self.config.mapping.globals;
        let indent = globals.indentation.as_str();
        let nl = globals.line_separator.as_str();

        let ctx = object_context(object);
        let document_id = template::apply(&mapping.id, &ctx);
        let label = template::apply(&mapping.label, &ctx);

        let status = object.attribute_str("status");
        let entity_style = resolve_entity_style(&self.config.styles, BLOCK_THEME, entity, status);

        let mut lines: Vec<String> = Vec::new();
        lines.push(anchor_begin(&document_id));

        match mapping.kind {
            BlockKind::Structural => {
                lines.push(format!("subgraph {document_id}[{label}]"));

                // Attribute summary: the model's field order, present fields only.
                let mut attr_lines: Vec<String> = Vec::new();
                for field in schema_entity.attributes.keys() {
                    let Some(value) = object.attributes.get(field) else {
                        continue;
                    };
                    let Some(text) = scalar_text(value) else {
                        continue;
                    };
                    attr_lines.push(format!("{field}: {text}"));
                }

                let mut attr_document_id: Option<String> = None;
                if let Some(attr_cfg) = &self.config.mapping.attribute_node {
                    if !attr_lines.is_empty() {
                        let attr_object = json!({
                            "document_id": document_id.as_str(),
                            "id": object.id.as_str(),
                            "name": object.attribute_str("name").unwrap_or(""),
                            "entity": entity,
                        });
                        let attr_id =
                            template::apply(&attr_cfg.id, &json!({ "object": attr_object.clone() }));

                        let attr_label = escape_quotes(&attr_lines.join(nl));
                        let rendered = template::apply(
                            &attr_cfg.template,
                            &json!({
                                "id": attr_id.as_str(),
                                "label": attr_label.as_str(),
                                "object": attr_object,
                            }),
                        );

                        lines.push(indent_block(rendered.trim_end(), indent, nl));
                        attr_document_id = Some(attr_id);
                    }
                }

                lines.push(format!("{indent}{}", insertion_marker(&document_id)));
                lines.push("end".to_string());

                if let Some(line) = style_line(&document_id, &entity_style) {
                    lines.push(line);
                }
                if let Some(attr_id) = attr_document_id {
                    let attr_style =
                        resolve_attribute_style(&self.config.styles, BLOCK_THEME, entity);
                    if let Some(line) = style_line(&attr_id, &attr_style) {
                        lines.push(line);
                    }
                }
            }
            BlockKind::Leaf => {
                lines.push(format!("{document_id}[\"{}\"]", escape_quotes(&label)));
                if let Some(line) = style_line(&document_id, &entity_style) {
                    lines.push(line);
                }
            }
        }

        lines.push(anchor_end(&document_id));

        Ok(RenderedBlock {
            block: lines.join(nl),
            document_id,
        })
    }

    /// Renders a fresh document: front-matter, the flowchart header and the fixed root
    /// blocks (one of which hosts the nested connections region).
    pub fn initial_document(&self, diagram_name: &str, theme: &str) -> Result<String> {
        let globals = &self.config.mapping.globals;
        let indent = globals.indentation.as_str();
        let nl = globals.line_separator.as_str();

        let mut parts: Vec<String> = Vec::new();
        parts.push(self.render_frontmatter(diagram_name));
        parts.push("flowchart TB".to_string());

        for (root_key, root) in &self.config.mapping.roots {
            parts.push(String::new());

            let mut lines: Vec<String> = Vec::new();
            lines.push(anchor_begin(&root.id));
            lines.push(format!("subgraph {}[{}]", root.id, root.label));
            lines.push(format!("{indent}{}", insertion_marker(&root.id)));

            if root.connections {
                lines.push(anchor_begin(CONNECTIONS_ID));
                lines.push(format!(
                    "{indent}subgraph {CONNECTIONS_ID}[{CONNECTIONS_LABEL}]"
                ));
                lines.push(format!(
                    "{indent}{indent}{}",
                    insertion_marker(CONNECTIONS_ID)
                ));
                lines.push(format!("{indent}end"));
                lines.push(anchor_end(CONNECTIONS_ID));
            }

            lines.push("end".to_string());
            lines.push(anchor_end(&root.id));

            // Roots are never removed, so their style line can live outside the anchors.
            let style = resolve_root_style(&self.config.styles, theme, root_key);
            if let Some(line) = style_line(&root.id, &style) {
                lines.push(line);
            }

            parts.push(lines.join(nl));
        }

        parts.push(String::new());
        Ok(parts.join(nl))
    }

    fn render_frontmatter(&self, diagram_name: &str) -> String {
        let Some(frontmatter) = &self.config.styles.frontmatter else {
            return String::new();
        };

        let resolved_title = frontmatter
            .title
            .as_deref()
            .map(|tpl| template::apply(tpl, &json!({ "diagram": { "name": diagram_name } })))
            .unwrap_or_default();
        let title = if resolved_title.trim().is_empty() {
            diagram_name
        } else {
            resolved_title.trim()
        };

        let config = &frontmatter.config;

        let mut lines: Vec<String> = Vec::new();
        lines.push("---".to_string());
        lines.push(format!("title: {}", yaml_scalar_str(title)));
        lines.push("config:".to_string());

        // Stable, human-friendly key ordering: theme, look, themeVariables, then the rest.
        if let Some(theme) = &config.theme {
            lines.push(format!("  theme: {}", yaml_scalar_str(theme)));
        }
        if let Some(look) = &config.look {
            lines.push(format!("  look: {}", yaml_scalar_str(look)));
        }
        if !config.theme_variables.is_empty() {
            lines.push("  themeVariables:".to_string());
            for (key, value) in &config.theme_variables {
                lines.push(format!("    {key}: {}", yaml_scalar(value)));
            }
        }

        let mut extra_keys: Vec<&String> = config.extra.keys().collect();
        extra_keys.sort();
        for key in extra_keys {
            lines.push(format!("  {key}: {}", yaml_scalar(&config.extra[key])));
        }

        lines.push("---".to_string());
        lines.join("\n")
    }
}

fn object_context(object: &DomainObject) -> Value {
    let mut map = object.attributes.clone();
    map.insert("id".to_string(), Value::String(object.id.clone()));
    json!({ "object": map })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn escape_quotes(raw: &str) -> String {
    raw.replace('"', "\\\"")
}

fn indent_block(block: &str, indent: &str, nl: &str) -> String {
    block
        .split(nl)
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join(nl)
}

/// Conservative YAML scalar formatting for front-matter values.
fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => yaml_scalar_str(s),
        other => yaml_scalar_str(&other.to_string()),
    }
}

fn yaml_scalar_str(raw: &str) -> String {
    let safe = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-'));
    let reserved = matches!(raw.to_ascii_lowercase().as_str(), "null" | "true" | "false");

    if safe && !reserved {
        raw.to_string()
    } else {
        // Quote everything else; serde_json string encoding doubles as YAML double-quoting.
        serde_json::Value::String(raw.to_string()).to_string()
    }
}
