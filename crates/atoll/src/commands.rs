//! Command orchestration: create / update / delete / move.
//!
//! Sequencing per command: validate, mutate the domain store, persist it, then mutate the
//! document text. A document failure after a successful store write is not rolled back;
//! there is no cross-representation atomicity, and the two converge again on the next
//! structural operation touching that object.

use atoll_core::domain::{DomainObject, ParentRef, generate_object_id};
use atoll_core::validate::{validate_attributes, validate_parent};
use atoll_mermaid::anchors::{insert_before_marker, remove_anchored_block};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::store::Diagram;
use crate::{Error, Result, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Create {
        entity: String,
        #[serde(default)]
        parent: Option<ParentRef>,
        #[serde(default)]
        attributes: serde_json::Map<String, serde_json::Value>,
    },
    Update {
        entity: String,
        id: String,
        #[serde(default)]
        attributes: serde_json::Map<String, serde_json::Value>,
    },
    Delete {
        entity: String,
        id: String,
    },
    Move {
        entity: String,
        id: String,
        #[serde(default)]
        parent: Option<ParentRef>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub diagram_id: String,
    pub diagram_name: String,
    pub content: String,
    /// The created/affected object id.
    pub object_id: Option<String>,
}

impl Engine {
    /// Applies one command against the diagram's domain state and document. Commands on the
    /// same diagram are serialized; a lost update cannot occur.
    ///
    /// `update` persists the domain state only; the document block is not re-rendered, so
    /// a renamed object keeps its previous on-document label until the next structural
    /// operation (move) re-renders it.
    pub fn apply_command_sync(&self, diagram_id: &str, command: Command) -> Result<CommandOutcome> {
        let lock = self.locks.diagram(diagram_id);
        let _guard = lock.lock();

        let diagram = self.documents.get(diagram_id)?;

        match command {
            Command::Create {
                entity,
                parent,
                attributes,
            } => self.apply_create(diagram, entity, parent, attributes),
            Command::Update {
                entity,
                id,
                attributes,
            } => self.apply_update(diagram, entity, id, attributes),
            Command::Delete { entity, id } => self.apply_delete(diagram, entity, id),
            Command::Move { entity, id, parent } => self.apply_move(diagram, entity, id, parent),
        }
    }

    pub async fn apply_command(&self, diagram_id: &str, command: Command) -> Result<CommandOutcome> {
        self.apply_command_sync(diagram_id, command)
    }

    fn apply_create(
        &self,
        diagram: Diagram,
        entity: String,
        parent: Option<ParentRef>,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CommandOutcome> {
        let schema = &self.config().schema;

        validate_parent(schema, &entity, parent.as_ref())?;
        // Every stored object carries a concrete placement, whether or not the schema
        // marks the parent as required.
        let parent = parent.ok_or_else(|| ValidationError::ParentRequired {
            entity: entity.clone(),
        })?;
        validate_attributes(schema, &entity, &attributes)?;

        let mut state = self.load_state(&diagram.id)?;

        let object = DomainObject {
            id: generate_object_id(),
            entity: entity.clone(),
            parent,
            attributes,
        };
        let object_id = object.id.clone();

        state.objects.push(object.clone());
        self.domains.save(&diagram.id, &state)?;

        // Placement never parses the document: the rendered block is spliced in front of
        // the parent's insertion marker.
        let rendered = self.generator().render_entity_block(&entity, &object)?;
        let parent_document_id = self.generator().parent_document_id(&object.parent)?;
        let content = insert_before_marker(&diagram.content, &parent_document_id, &rendered.block)?;

        self.documents.update_content(&diagram.id, &content)?;

        tracing::info!(
            diagram = %diagram.id,
            %entity,
            object = %object_id,
            "applied create"
        );

        Ok(CommandOutcome {
            diagram_id: diagram.id,
            diagram_name: diagram.name,
            content,
            object_id: Some(object_id),
        })
    }

    fn apply_update(
        &self,
        diagram: Diagram,
        entity: String,
        id: String,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CommandOutcome> {
        let schema = &self.config().schema;
        let mut state = self.load_state(&diagram.id)?;

        let object = state
            .find_mut(&entity, &id)
            .ok_or_else(|| Error::ObjectNotFound {
                entity: entity.clone(),
                id: id.clone(),
            })?;

        // Shallow merge, then re-validate the merged map as a whole.
        let mut merged = object.attributes.clone();
        for (key, value) in attributes {
            merged.insert(key, value);
        }
        validate_attributes(schema, &entity, &merged)?;

        object.attributes = merged;
        self.domains.save(&diagram.id, &state)?;

        tracing::info!(diagram = %diagram.id, %entity, object = %id, "applied update");

        Ok(CommandOutcome {
            diagram_id: diagram.id,
            diagram_name: diagram.name,
            content: diagram.content,
            object_id: Some(id),
        })
    }

    fn apply_delete(&self, diagram: Diagram, entity: String, id: String) -> Result<CommandOutcome> {
        let mut state = self.load_state(&diagram.id)?;

        let position = state
            .position(&entity, &id)
            .ok_or_else(|| Error::ObjectNotFound {
                entity: entity.clone(),
                id: id.clone(),
            })?;
        state.objects.remove(position);
        self.domains.save(&diagram.id, &state)?;

        let document_id = self.generator().resolve_document_id(&entity, &id)?;
        let content = remove_anchored_block(&diagram.content, &document_id)?;

        self.documents.update_content(&diagram.id, &content)?;

        tracing::info!(diagram = %diagram.id, %entity, object = %id, "applied delete");

        Ok(CommandOutcome {
            diagram_id: diagram.id,
            diagram_name: diagram.name,
            content,
            object_id: Some(id),
        })
    }

    fn apply_move(
        &self,
        diagram: Diagram,
        entity: String,
        id: String,
        parent: Option<ParentRef>,
    ) -> Result<CommandOutcome> {
        let schema = &self.config().schema;

        validate_parent(schema, &entity, parent.as_ref())?;
        let parent = parent.ok_or_else(|| ValidationError::ParentRequired {
            entity: entity.clone(),
        })?;

        let mut state = self.load_state(&diagram.id)?;
        let object = state
            .find_mut(&entity, &id)
            .ok_or_else(|| Error::ObjectNotFound {
                entity: entity.clone(),
                id: id.clone(),
            })?;

        object.parent = parent;
        let object = object.clone();
        self.domains.save(&diagram.id, &state)?;

        // The document id is stable across moves, so this is remove + re-render + insert.
        let document_id = self.generator().resolve_document_id(&entity, &id)?;
        let without = remove_anchored_block(&diagram.content, &document_id)?;

        let rendered = self.generator().render_entity_block(&entity, &object)?;
        let parent_document_id = self.generator().parent_document_id(&object.parent)?;
        let content = insert_before_marker(&without, &parent_document_id, &rendered.block)?;

        self.documents.update_content(&diagram.id, &content)?;

        tracing::info!(diagram = %diagram.id, %entity, object = %id, "applied move");

        Ok(CommandOutcome {
            diagram_id: diagram.id,
            diagram_name: diagram.name,
            content,
            object_id: Some(id),
        })
    }
}
