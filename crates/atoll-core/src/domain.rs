//! Domain objects and per-diagram domain state.
//!
//! The structured state is the source of truth for a diagram; the generated document is a
//! derived rendering. Parent references are a closed two-variant union and every decode
//! validates the shape exhaustively, since persisted state integrity cannot otherwise be
//! guaranteed.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use crate::config::EntitySchema;
use crate::error::ConsistencyError;

pub const DOMAIN_STATE_VERSION: u32 = 1;

/// Where a domain object is attached: directly under a root scope, or under another
/// domain object. Never both, never neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    Root(String),
    Entity { entity: String, id: String },
}

impl ParentRef {
    pub fn root(root: impl Into<String>) -> Self {
        ParentRef::Root(root.into())
    }

    pub fn entity(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ParentRef::Entity {
            entity: entity.into(),
            id: id.into(),
        }
    }

    fn from_raw(raw: RawParentRef) -> Result<Self, String> {
        let has_root = raw.root.is_some();
        let has_entity = raw.entity.is_some();
        let has_id = raw.id.is_some();

        // Ambiguous shapes (root combined with entity/id) are rejected outright.
        if has_root && (has_entity || has_id) {
            return Err("cannot combine root with entity/id".to_string());
        }

        if let Some(root) = raw.root {
            let root = root.trim();
            if root.is_empty() {
                return Err("expected a non-empty root".to_string());
            }
            return Ok(ParentRef::Root(root.to_string()));
        }

        if has_entity || has_id {
            let entity = raw.entity.as_deref().unwrap_or("").trim();
            let id = raw.id.as_deref().unwrap_or("").trim();
            if entity.is_empty() || id.is_empty() {
                return Err("expected non-empty entity and id".to_string());
            }
            return Ok(ParentRef::Entity {
                entity: entity.to_string(),
                id: id.to_string(),
            });
        }

        Err("expected a root or an entity/id reference".to_string())
    }
}

#[derive(Deserialize)]
struct RawParentRef {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    entity: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl<'de> Deserialize<'de> for ParentRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawParentRef::deserialize(deserializer)?;
        ParentRef::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ParentRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ParentRef::Root(root) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("root", root)?;
                map.end()
            }
            ParentRef::Entity { entity, id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("entity", entity)?;
                map.serialize_entry("id", id)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainObject {
    pub id: String,
    pub entity: String,
    pub parent: ParentRef,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl DomainObject {
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// The value this object is shown as when referenced elsewhere: first non-empty of the
    /// `name` attribute, the `slug` attribute, else the raw id.
    pub fn display_value(&self) -> &str {
        for key in ["name", "slug"] {
            if let Some(value) = self.attribute_str(key) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return trimmed;
                }
            }
        }
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramDomainState {
    pub version: u32,
    #[serde(default)]
    pub objects: Vec<DomainObject>,
}

impl Default for DiagramDomainState {
    fn default() -> Self {
        Self::empty()
    }
}

impl DiagramDomainState {
    pub fn empty() -> Self {
        Self {
            version: DOMAIN_STATE_VERSION,
            objects: Vec::new(),
        }
    }

    pub fn find(&self, entity: &str, id: &str) -> Option<&DomainObject> {
        self.objects
            .iter()
            .find(|o| o.entity == entity && o.id == id)
    }

    pub fn find_mut(&mut self, entity: &str, id: &str) -> Option<&mut DomainObject> {
        self.objects
            .iter_mut()
            .find(|o| o.entity == entity && o.id == id)
    }

    pub fn position(&self, entity: &str, id: &str) -> Option<usize> {
        self.objects
            .iter()
            .position(|o| o.entity == entity && o.id == id)
    }

    /// Checks every parent reference against the schema's declared roots. Serde already
    /// rejects ambiguous/malformed shapes; an undeclared root means the persisted state
    /// does not match the running configuration, and the whole diagram is treated as
    /// corrupt.
    pub fn validate_parents(
        &self,
        schema: &EntitySchema,
        diagram_id: &str,
    ) -> Result<(), ConsistencyError> {
        for object in &self.objects {
            if let ParentRef::Root(root) = &object.parent {
                if !schema.has_root(root) {
                    return Err(ConsistencyError {
                        diagram_id: diagram_id.to_string(),
                        message: format!(
                            "invalid parent root '{root}' for '{}:{}'",
                            object.entity, object.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Fresh object id: a short, URL-friendly hex token, unique per diagram in practice.
pub fn generate_object_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..12].to_string()
}
