//! Error types for graph construction and queries

use thiserror::Error;

use crate::model::NodeId;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Graph errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// An edge endpoint is not registered. Edges are never dropped silently.
    #[error("edge {source_id} -> {target_id} references unknown node {missing}")]
    UnknownNode {
        source_id: NodeId,
        target_id: NodeId,
        missing: NodeId,
    },

    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Two records resolved to the same id with different attributes.
    #[error("duplicate identity {id}: {detail}")]
    DuplicateIdentity { id: NodeId, detail: String },
}
