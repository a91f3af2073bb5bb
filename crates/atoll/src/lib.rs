#![forbid(unsafe_code)]

//! `atoll` keeps a structured domain graph and its generated Mermaid rendering consistent
//! under incremental edits.
//!
//! The facade wires the pieces together:
//! - [`Engine`] loads and validates the configuration once, analyzes the entity schema into
//!   immutable per-root orderings, and orchestrates commands against a pair of stores
//! - [`store`] defines the [`store::DomainStore`] / [`store::DocumentStore`] contracts with
//!   in-memory and flat-file implementations
//! - [`csv`] projects the domain state into deterministic CSV exports
//!
//! HTTP transport, authentication and process bootstrap are external collaborators; this
//! workspace is the headless core they plug into.

pub mod commands;
pub mod csv;
pub mod engine;
pub mod store;

pub use atoll_core::{
    Category, CategoryAnalysis, ConfigError, ConsistencyError, DiagramDomainState, DomainObject,
    EntitySchema, LoadedConfig, ModelAnalysis, ParentRef, ValidationError, generate_object_id,
};
pub use atoll_mermaid::{DocumentGenerator, RenderedBlock};

pub use commands::{Command, CommandOutcome};
pub use csv::{CsvDataset, CsvElement, CsvSchema, TypeListing};
pub use engine::Engine;
pub use store::{Diagram, DiagramMetadata, DocumentStore, DomainStore, FsStore, MemoryStore};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] atoll_core::ConfigError),

    #[error(transparent)]
    Validation(#[from] atoll_core::ValidationError),

    #[error(transparent)]
    Consistency(#[from] atoll_core::ConsistencyError),

    #[error(transparent)]
    Document(#[from] atoll_mermaid::Error),

    #[error("diagram '{diagram_id}' not found")]
    DiagramNotFound { diagram_id: String },

    #[error("object '{entity}:{id}' not found in diagram domain state")]
    ObjectNotFound { entity: String, id: String },

    #[error("unknown category '{category}'; allowed: {}", allowed.join(", "))]
    UnknownCategory {
        category: String,
        allowed: Vec<String>,
    },

    #[error("invalid csv type '{ty}'")]
    InvalidCsvType { ty: String },

    #[error("csv type '{ty}' not available for this diagram; allowed: {}", allowed.join(", "))]
    CsvTypeNotAvailable { ty: String, allowed: Vec<String> },

    #[error("store I/O error at {path}: {source}")]
    StoreIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store encoding error for '{diagram_id}': {source}")]
    StoreEncoding {
        diagram_id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
