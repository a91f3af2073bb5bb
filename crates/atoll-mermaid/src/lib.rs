#![forbid(unsafe_code)]

//! Mermaid document generation and anchored mutation.
//!
//! The generated document is a derived rendering target; the domain store is the real
//! structure. Anchor markers let the system do the only two structural operations it needs
//! (insert and delete a well-formed subtree) without a grammar for the document language.

pub mod anchors;
pub mod generator;
pub mod styles;
pub mod template;

pub use generator::{DocumentGenerator, RenderedBlock};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no document mapping for entity '{entity}'")]
    MissingEntityMapping { entity: String },

    #[error("no schema entry for entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("no document mapping for root '{root}'")]
    MissingRootMapping { root: String },

    #[error("insertion marker not found for parent '{document_id}'")]
    InsertionMarkerNotFound { document_id: String },

    #[error("anchored block '{document_id}' not found")]
    BlockNotFound { document_id: String },

    #[error("anchor markers for '{document_id}' are missing or out of order")]
    MarkersOutOfOrder { document_id: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
