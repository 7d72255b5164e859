//! Error and warning types for the merge stage

use std::path::PathBuf;

use stackmap_core::{GraphError, NodeKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MergeError>;

/// Fatal problems. Any of these aborts the run before output is written.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("malformed input at {record}: {reason}")]
    InputMalformed { record: String, reason: String },

    #[error("{record} conflicts with an already registered node: {detail}")]
    DuplicateIdentity { record: String, detail: String },

    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MergeError {
    pub(crate) fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        MergeError::InputMalformed {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal findings collected during a merge. They are logged and listed in
/// the report but never stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeWarning {
    #[error("function {function} reads {table}, which is not in the table catalog")]
    DanglingReference { function: String, table: String },

    #[error("dependency names function {function}, which is not in the function catalog")]
    UnknownFunction { function: String },

    #[error("workflow {workflow} references unknown {kind} {reference}")]
    UnresolvedReference {
        workflow: String,
        kind: NodeKind,
        reference: String,
    },

    #[error("dependency #{index} skipped: {reason}")]
    MalformedDependency { index: usize, reason: String },

    #[error("no input found at {path}, continuing with an empty extract")]
    MissingInput { path: String },
}
