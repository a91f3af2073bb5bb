//! Typed configuration for the entity schema, the document mapping and the stylesheet.
//!
//! Three YAML documents drive the whole system:
//! - `domain-model.yaml`: entity types, allowed parents, links, attribute definitions
//! - `mermaid-mapping.yaml`: how each entity/root renders into the generated document
//! - `mermaid-styles.yaml`: front-matter and per-theme style tables
//!
//! Maps are `IndexMap`-backed so YAML declaration order survives deserialization; the CSV
//! column contract depends on it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

pub const MODEL_FILE: &str = "domain-model.yaml";
pub const MAPPING_FILE: &str = "mermaid-mapping.yaml";
pub const STYLES_FILE: &str = "mermaid-styles.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

impl AttributeType {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Integer => "integer",
            AttributeType::Number => "number",
            AttributeType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeDef {
    pub required: bool,
    pub nullable: bool,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    /// Enumerated allowed values (scalars only).
    pub values: Option<Vec<serde_json::Value>>,
    /// Optional display labels, parallel to `values`.
    pub labels: Option<Vec<String>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

/// One allowed placement for an entity: either directly under a root scope, or under a
/// parent entity (with the CSV field name the containment is exported as).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedParent {
    pub root: Option<String>,
    pub entity: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentRule {
    pub required: bool,
    pub allowed: Vec<AllowedParent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDef {
    pub entity: String,
    pub field: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDef {
    pub parent: ParentRule,
    pub links: IndexMap<String, LinkDef>,
    pub attributes: IndexMap<String, AttributeDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RootDef {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySchema {
    pub version: u32,
    pub roots: IndexMap<String, RootDef>,
    pub entities: IndexMap<String, EntityDef>,
}

impl EntitySchema {
    pub fn entity(&self, entity: &str) -> Option<&EntityDef> {
        self.entities.get(entity)
    }

    pub fn has_root(&self, root: &str) -> bool {
        self.roots.contains_key(root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// A nested container carrying its own insertion marker, so children can be spliced in.
    Structural,
    /// A single terminal node.
    Leaf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    pub kind: BlockKind,
    /// Document-id template; substitutes `{{ object.id }}` into a fixed pattern.
    pub id: String,
    /// Label template, resolved against the object's attributes.
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootMapping {
    pub id: String,
    pub label: String,
    /// When set, the root hosts the nested connections region.
    #[serde(default)]
    pub connections: bool,
}

fn default_indentation() -> String {
    "  ".to_string()
}

fn default_line_separator() -> String {
    "\n".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingGlobals {
    pub indentation: String,
    pub line_separator: String,
}

impl Default for MappingGlobals {
    fn default() -> Self {
        Self {
            indentation: default_indentation(),
            line_separator: default_line_separator(),
        }
    }
}

fn default_attribute_node_id() -> String {
    "attr_{{ object.document_id }}".to_string()
}

fn default_attribute_node_template() -> String {
    r#"{{ id }}@{ shape: comment, label: "{{ label }}" }"#.to_string()
}

/// Template for the attribute-summary comment node rendered inside structural blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeNodeMapping {
    pub id: String,
    pub template: String,
}

impl Default for AttributeNodeMapping {
    fn default() -> Self {
        Self {
            id: default_attribute_node_id(),
            template: default_attribute_node_template(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMapping {
    pub version: u32,
    pub globals: MappingGlobals,
    pub roots: IndexMap<String, RootMapping>,
    pub entities: IndexMap<String, EntityMapping>,
    pub attribute_node: Option<AttributeNodeMapping>,
}

impl DocumentMapping {
    pub fn entity(&self, entity: &str) -> Option<&EntityMapping> {
        self.entities.get(entity)
    }

    pub fn root(&self, root: &str) -> Option<&RootMapping> {
        self.roots.get(root)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontmatterConfig {
    pub theme: Option<String>,
    pub look: Option<String>,
    pub theme_variables: IndexMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    /// Title template; `{{ diagram.name }}` resolves to the diagram name.
    pub title: Option<String>,
    pub config: FrontmatterConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleBlock {
    pub style: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityStyle {
    pub style: IndexMap<String, String>,
    /// Overrides for the attribute-summary node rendered under this entity.
    pub attributes: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub roots: IndexMap<String, StyleBlock>,
    pub entities: IndexMap<String, EntityStyle>,
    pub statuses: IndexMap<String, StyleBlock>,
    /// Base style for attribute-summary nodes, before per-entity overrides.
    pub attributes: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSheet {
    pub version: u32,
    pub frontmatter: Option<Frontmatter>,
    pub themes: IndexMap<String, Theme>,
}

impl StyleSheet {
    pub fn theme(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }
}

/// The three configuration documents, loaded and validated together.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub schema: EntitySchema,
    pub mapping: DocumentMapping,
    pub styles: StyleSheet,
}

impl LoadedConfig {
    /// Loads `domain-model.yaml`, `mermaid-mapping.yaml` and `mermaid-styles.yaml` from a
    /// directory. Any problem is fatal.
    pub fn load_dir(dir: &Path) -> ConfigResult<Self> {
        let read = |file: &str| -> ConfigResult<String> {
            let path = dir.join(file);
            std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })
        };

        tracing::info!(dir = %dir.display(), "loading configuration");

        let loaded = Self::from_yaml(&read(MODEL_FILE)?, &read(MAPPING_FILE)?, &read(STYLES_FILE)?)?;

        tracing::info!(
            entities = loaded.schema.entities.len(),
            roots = loaded.schema.roots.len(),
            "configuration loaded"
        );

        Ok(loaded)
    }

    /// Parses the three documents from YAML strings and validates them.
    pub fn from_yaml(model: &str, mapping: &str, styles: &str) -> ConfigResult<Self> {
        let schema: EntitySchema = parse_yaml(model, MODEL_FILE)?;
        let mapping: DocumentMapping = parse_yaml(mapping, MAPPING_FILE)?;
        let styles: StyleSheet = parse_yaml(styles, STYLES_FILE)?;

        let loaded = Self {
            schema,
            mapping,
            styles,
        };
        loaded.validate()?;
        Ok(loaded)
    }

    /// Cross-checks the three documents. All failures are `ConfigError` (fatal at startup).
    pub fn validate(&self) -> ConfigResult<()> {
        let schema = &self.schema;

        if schema.entities.is_empty() {
            return Err(ConfigError::MissingSection {
                section: "entities".to_string(),
                file: MODEL_FILE.to_string(),
            });
        }
        if schema.roots.is_empty() {
            return Err(ConfigError::MissingSection {
                section: "roots".to_string(),
                file: MODEL_FILE.to_string(),
            });
        }

        for (entity, def) in &schema.entities {
            for allowed in &def.parent.allowed {
                if let Some(root) = &allowed.root {
                    if !schema.has_root(root) {
                        return Err(ConfigError::UnknownRoot {
                            entity: entity.clone(),
                            root: root.clone(),
                        });
                    }
                }
                if let Some(parent) = &allowed.entity {
                    if !schema.entities.contains_key(parent) {
                        return Err(ConfigError::UnknownParentEntity {
                            entity: entity.clone(),
                            parent: parent.clone(),
                        });
                    }
                }
            }

            for (link_name, link) in &def.links {
                if !schema.entities.contains_key(&link.entity) {
                    return Err(ConfigError::UnknownLinkTarget {
                        entity: entity.clone(),
                        link: link_name.clone(),
                        target: link.entity.clone(),
                    });
                }
            }

            for (attribute, def) in &def.attributes {
                validate_attribute_def(entity, attribute, def)?;
            }
        }

        if self.mapping.roots.is_empty() {
            return Err(ConfigError::MissingSection {
                section: "roots".to_string(),
                file: MAPPING_FILE.to_string(),
            });
        }
        if self.mapping.entities.is_empty() {
            return Err(ConfigError::MissingSection {
                section: "entities".to_string(),
                file: MAPPING_FILE.to_string(),
            });
        }

        for root in schema.roots.keys() {
            if self.mapping.root(root).is_none() {
                return Err(ConfigError::MissingRootMapping { root: root.clone() });
            }
        }
        for entity in schema.entities.keys() {
            if self.mapping.entity(entity).is_none() {
                return Err(ConfigError::MissingEntityMapping {
                    entity: entity.clone(),
                });
            }
        }

        Ok(())
    }
}

fn parse_yaml<T: serde::de::DeserializeOwned>(raw: &str, file: &str) -> ConfigResult<T> {
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
        path: file.to_string(),
        source,
    })
}

fn invalid_attribute(entity: &str, attribute: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidAttributeDefinition {
        entity: entity.to_string(),
        attribute: attribute.to_string(),
        message: message.into(),
    }
}

fn validate_attribute_def(entity: &str, attribute: &str, def: &AttributeDef) -> ConfigResult<()> {
    if let Some(pattern) = &def.pattern {
        if pattern.is_empty() {
            return Err(invalid_attribute(
                entity,
                attribute,
                "pattern must be a non-empty string",
            ));
        }
        if let Err(err) = regex::Regex::new(pattern) {
            return Err(invalid_attribute(
                entity,
                attribute,
                format!("invalid pattern regex '{pattern}': {err}"),
            ));
        }
    }

    match (&def.minimum, &def.maximum) {
        (Some(min), Some(max)) if min > max => {
            return Err(invalid_attribute(entity, attribute, "minimum > maximum"));
        }
        _ => {}
    }

    if def.labels.is_some() && def.values.is_none() {
        return Err(invalid_attribute(
            entity,
            attribute,
            "'labels' without 'values'",
        ));
    }

    if let Some(values) = &def.values {
        if values.is_empty() {
            return Err(invalid_attribute(
                entity,
                attribute,
                "'values' must be a non-empty list",
            ));
        }
        for value in values {
            if !(value.is_string() || value.is_number() || value.is_boolean()) {
                return Err(invalid_attribute(
                    entity,
                    attribute,
                    format!("enum value contains unsupported item '{value}'"),
                ));
            }
        }
        if let Some(labels) = &def.labels {
            if labels.len() != values.len() {
                return Err(invalid_attribute(
                    entity,
                    attribute,
                    "labels/values length mismatch",
                ));
            }
        }
    }

    Ok(())
}
