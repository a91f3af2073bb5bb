#![forbid(unsafe_code)]

//! Entity schema + diagram domain state for configuration-driven topology diagrams (headless).
//!
//! Design goals:
//! - the YAML configuration is the single source of truth for entity shapes
//! - deterministic, testable outputs (orderings, closures, rendered text)
//! - all configuration problems are fatal at load; no degraded mode

pub mod analysis;
pub mod config;
pub mod domain;
pub mod error;
pub mod validate;

pub use analysis::{Category, CategoryAnalysis, DependencyEdge, ModelAnalysis};
pub use config::{
    AllowedParent, AttributeDef, AttributeType, BlockKind, DocumentMapping, EntityDef,
    EntityMapping, EntitySchema, LinkDef, LoadedConfig, RootMapping, StyleSheet,
};
pub use domain::{DiagramDomainState, DomainObject, ParentRef, generate_object_id};
pub use error::{ConfigError, ConsistencyError, ValidationError};

#[cfg(test)]
mod tests;
