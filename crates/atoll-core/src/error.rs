//! Core error taxonomy.
//!
//! `ConfigError` is fatal at startup. `ValidationError` is per-request and leaves both the
//! domain store and the document untouched. `ConsistencyError` marks a diagram's persisted
//! domain state as corrupt; callers must fail loudly rather than guess placement.

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required section '{section}' in {file}")]
    MissingSection { section: String, file: String },

    #[error("entity '{entity}' allows undeclared root '{root}'")]
    UnknownRoot { entity: String, root: String },

    #[error("entity '{entity}' allows unknown parent entity '{parent}'")]
    UnknownParentEntity { entity: String, parent: String },

    #[error("entity '{entity}' link '{link}' targets unknown entity '{target}'")]
    UnknownLinkTarget {
        entity: String,
        link: String,
        target: String,
    },

    #[error("entity '{entity}', attribute '{attribute}': {message}")]
    InvalidAttributeDefinition {
        entity: String,
        attribute: String,
        message: String,
    },

    #[error("no document mapping for entity '{entity}'")]
    MissingEntityMapping { entity: String },

    #[error("no document mapping for root '{root}'")]
    MissingRootMapping { root: String },

    #[error("root propagation exceeded {passes} passes (possible cycle in parent rules)")]
    RootPropagationDiverged { passes: usize },

    #[error("dependency cycle detected for root '{root}': {}", nodes.join(", "))]
    DependencyCycle { root: String, nodes: Vec<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("parent is required for entity '{entity}'")]
    ParentRequired { entity: String },

    #[error("parent not allowed for '{entity}'")]
    ParentNotAllowed { entity: String },

    #[error("invalid parent root '{root}'")]
    UnknownParentRoot { root: String },

    #[error("missing required attribute '{attribute}' for '{entity}'")]
    MissingRequiredAttribute { entity: String, attribute: String },

    #[error("invalid attribute '{attribute}' for '{entity}': {reason}")]
    InvalidAttribute {
        entity: String,
        attribute: String,
        reason: String,
    },
}

/// A loaded parent reference failed shape validation. The whole diagram's domain state is
/// treated as corrupt.
#[derive(Debug, thiserror::Error)]
#[error("corrupt domain state for diagram '{diagram_id}': {message}")]
pub struct ConsistencyError {
    pub diagram_id: String,
    pub message: String,
}
