//! CSV projection: stable column schemas, deterministic row ordering, reference
//! resolution.
//!
//! Output is a pure function of the schema and the diagram's objects, never of store
//! iteration or creation order.

use std::collections::BTreeSet;

use atoll_core::analysis::closure;
use atoll_core::config::EntitySchema;
use atoll_core::domain::{DomainObject, ParentRef};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::engine::Engine;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSchema {
    /// Columns in export order: parent fields, link fields, then declared attributes.
    pub columns: Vec<String>,
    /// parent entity type -> the column its containment is exported as.
    pub parent_entity_to_field: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeListing {
    pub diagram_id: String,
    pub category: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvElement {
    pub entity: String,
    pub csv: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvDataset {
    pub diagram_id: String,
    pub diagram_name: String,
    pub elements: Vec<CsvElement>,
}

/// Derives the column schema for an entity: one column per distinct allowed-parent field
/// (first-seen order), per distinct link field, per declared attribute; duplicates collapse
/// to the first occurrence. Zero columns degrade to a single `id` column.
pub fn entity_csv_schema(schema: &EntitySchema, entity: &str) -> CsvSchema {
    let Some(def) = schema.entity(entity) else {
        return CsvSchema {
            columns: vec!["id".to_string()],
            parent_entity_to_field: IndexMap::new(),
        };
    };

    let mut parent_fields: Vec<&str> = Vec::new();
    let mut parent_entity_to_field: IndexMap<String, String> = IndexMap::new();
    for allowed in &def.parent.allowed {
        let (Some(parent), Some(field)) = (allowed.entity.as_deref(), allowed.field.as_deref())
        else {
            continue;
        };
        if parent.is_empty() || field.is_empty() {
            continue;
        }
        if !parent_fields.contains(&field) {
            parent_fields.push(field);
        }
        parent_entity_to_field
            .entry(parent.to_string())
            .or_insert_with(|| field.to_string());
    }

    let mut link_fields: Vec<&str> = Vec::new();
    for link in def.links.values() {
        let field = link.field.as_str();
        if field.is_empty() {
            continue;
        }
        if !link_fields.contains(&field) {
            link_fields.push(field);
        }
    }

    let attribute_fields = def.attributes.keys().map(String::as_str);

    let mut columns: Vec<String> = Vec::new();
    for column in parent_fields
        .into_iter()
        .chain(link_fields)
        .chain(attribute_fields)
    {
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }

    if columns.is_empty() {
        columns.push("id".to_string());
    }

    CsvSchema {
        columns,
        parent_entity_to_field,
    }
}

/// Quotes (doubling internal quotes) iff the value contains a comma, quote or newline.
pub fn escape_cell(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// Renders one entity type's objects to CSV text, resolving parent/link references against
/// the diagram-wide object index. Rows sort by (display value, raw id).
pub fn render_entity_csv(
    schema: &EntitySchema,
    entity: &str,
    objects: &[&DomainObject],
    index: &FxHashMap<&str, &DomainObject>,
) -> String {
    let csv_schema = entity_csv_schema(schema, entity);
    let parent_fields: BTreeSet<&str> = csv_schema
        .parent_entity_to_field
        .values()
        .map(String::as_str)
        .collect();

    let mut sorted: Vec<&DomainObject> = objects.to_vec();
    sorted.sort_by(|a, b| {
        a.display_value()
            .cmp(b.display_value())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut lines: Vec<String> = Vec::with_capacity(sorted.len() + 1);
    lines.push(csv_schema.columns.join(","));

    for object in sorted {
        let row: Vec<String> = csv_schema
            .columns
            .iter()
            .map(|column| {
                if parent_fields.contains(column.as_str()) {
                    // Parent columns stay blank when the parent is a root or a different
                    // parent entity type.
                    if let ParentRef::Entity { entity: parent, id } = &object.parent {
                        if csv_schema.parent_entity_to_field.get(parent) == Some(column) {
                            let value = index
                                .get(id.as_str())
                                .map(|referent| referent.display_value())
                                .unwrap_or_default();
                            return escape_cell(value);
                        }
                    }
                    return String::new();
                }

                match object.attributes.get(column) {
                    Some(value) => escape_cell(&resolve_reference(value, index)),
                    None => String::new(),
                }
            })
            .collect();
        lines.push(row.join(","));
    }

    lines.join("\n") + "\n"
}

/// Resolves a parent/link cell value: a bare id string or an id-bearing object resolves to
/// the referent's display value; anything unresolved falls back to the raw string.
fn resolve_reference(value: &Value, index: &FxHashMap<&str, &DomainObject>) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return String::new();
            }
            match index.get(trimmed) {
                Some(target) => target.display_value().to_string(),
                None => trimmed.to_string(),
            }
        }
        Value::Object(map) => {
            if let Some(id) = map.get("id").and_then(Value::as_str) {
                return match index.get(id) {
                    Some(target) => target.display_value().to_string(),
                    None => id.to_string(),
                };
            }
            stable_stringify(value)
        }
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) => stable_stringify(value),
    }
}

/// Deterministic rendering for non-scalar values: arrays keep order, object keys sort.
fn stable_stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(stable_stringify).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{k}:{}", stable_stringify(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

fn is_valid_type_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= 64
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Engine {
    /// The analyzer's ordered list for a category, trimmed to the dependency closure of the
    /// types present in the diagram.
    pub fn list_ordered_types_sync(&self, diagram_id: &str, category: &str) -> Result<TypeListing> {
        let root = self
            .analysis()
            .resolve_category(category)
            .map(str::to_string)
            .ok_or_else(|| Error::UnknownCategory {
                category: category.to_string(),
                allowed: self.analysis().category_names(),
            })?;

        let diagram = self.documents.get(diagram_id)?;
        let state = self.load_state(diagram_id)?;

        let present: BTreeSet<&str> = state
            .objects
            .iter()
            .map(|o| o.entity.as_str())
            .filter(|e| !e.is_empty())
            .collect();

        let analysis = self
            .analysis()
            .for_root(&root)
            .ok_or_else(|| Error::UnknownCategory {
                category: category.to_string(),
                allowed: self.analysis().category_names(),
            })?;

        let needed = closure(analysis, present.iter().copied());

        Ok(TypeListing {
            diagram_id: diagram.id,
            category: self.analysis().category_name(&root),
            types: analysis
                .ordered
                .iter()
                .filter(|t| needed.contains(*t))
                .cloned()
                .collect(),
        })
    }

    pub async fn list_ordered_types(&self, diagram_id: &str, category: &str) -> Result<TypeListing> {
        self.list_ordered_types_sync(diagram_id, category)
    }

    /// One CSV per needed type, in global dependency order. Dependency types are included
    /// (header-only) even when no objects of that type exist, so output stays predictable.
    pub fn csv_dataset_sync(&self, diagram_id: &str) -> Result<CsvDataset> {
        let schema = &self.config().schema;
        let diagram = self.documents.get(diagram_id)?;
        let state = self.load_state(diagram_id)?;

        let index: FxHashMap<&str, &DomainObject> = state
            .objects
            .iter()
            .map(|o| (o.id.as_str(), o))
            .collect();

        let seeds: BTreeSet<&str> = state
            .objects
            .iter()
            .map(|o| o.entity.as_str())
            .filter(|e| !e.is_empty())
            .collect();

        let mut needed = self.analysis().needed_global(seeds.iter().copied());
        needed.extend(seeds.iter().map(|s| s.to_string()));

        let mut elements: Vec<CsvElement> = Vec::new();
        for ty in self.analysis().global_order() {
            if !needed.contains(ty) || schema.entity(ty).is_none() {
                continue;
            }
            if !is_valid_type_token(ty) {
                return Err(Error::InvalidCsvType { ty: ty.clone() });
            }

            let rows: Vec<&DomainObject> = state
                .objects
                .iter()
                .filter(|o| &o.entity == ty)
                .collect();
            elements.push(CsvElement {
                entity: ty.clone(),
                csv: render_entity_csv(schema, ty, &rows, &index),
            });
        }

        if elements.is_empty() {
            tracing::warn!(diagram = diagram_id, "csv dataset is empty");
        } else {
            tracing::info!(
                diagram = diagram_id,
                files = elements.len(),
                "generated csv dataset"
            );
        }

        Ok(CsvDataset {
            diagram_id: diagram.id,
            diagram_name: diagram.name,
            elements,
        })
    }

    pub async fn csv_dataset(&self, diagram_id: &str) -> Result<CsvDataset> {
        self.csv_dataset_sync(diagram_id)
    }

    pub fn csv_element_sync(&self, diagram_id: &str, ty: &str) -> Result<CsvElement> {
        if !is_valid_type_token(ty) {
            return Err(Error::InvalidCsvType { ty: ty.to_string() });
        }

        let dataset = self.csv_dataset_sync(diagram_id)?;
        let allowed = || {
            let mut types: Vec<String> = dataset.elements.iter().map(|e| e.entity.clone()).collect();
            types.sort();
            types
        };

        dataset
            .elements
            .iter()
            .find(|e| e.entity == ty)
            .cloned()
            .ok_or_else(|| Error::CsvTypeNotAvailable {
                ty: ty.to_string(),
                allowed: allowed(),
            })
    }

    pub async fn csv_element(&self, diagram_id: &str, ty: &str) -> Result<CsvElement> {
        self.csv_element_sync(diagram_id, ty)
    }
}
