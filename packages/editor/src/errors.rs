//! Error types for the editor

use quire_model::{Operation, Path};
use thiserror::Error;

use crate::refs::RefId;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] InvalidOperation),

    #[error("Batch rejected at operation {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: InvalidOperation,
    },

    #[error("Reference {0} no longer points into the document")]
    UnreachableReference(RefId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Malformed document: {0}")]
    Document(#[source] serde_json::Error),
}

/// Reasons an operation cannot be applied to the current tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("{op}: no node at {path}")]
    NodeNotFound { op: &'static str, path: Path },

    #[error("{op}: cannot be applied to the root")]
    RootPath { op: &'static str },

    #[error("{op}: expected {expected} at {path}")]
    WrongKind {
        op: &'static str,
        path: Path,
        expected: &'static str,
    },

    #[error("{op}: index {index} is out of range at {path}")]
    IndexOutOfRange {
        op: &'static str,
        path: Path,
        index: usize,
    },

    #[error("{op}: offset {offset} is out of range at {path}")]
    OffsetOutOfRange {
        op: &'static str,
        path: Path,
        offset: usize,
    },

    #[error("{op}: recorded {field} does not match the node at {path}")]
    Mismatch {
        op: &'static str,
        path: Path,
        field: &'static str,
    },

    #[error("{op}: property `{key}` is reserved")]
    ReservedProperty { op: &'static str, key: String },

    #[error("move_node: cannot move {path} into its own subtree at {new_path}")]
    MoveIntoSelf { path: Path, new_path: Path },

    #[error("set_selection: {0}")]
    Selection(&'static str),
}

/// Diagnostics produced while normalizing. These never fail an `apply`;
/// they are handed to the document's error callback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Structural violation `{rule}` at {path}")]
    StructuralViolation {
        rule: &'static str,
        path: Path,
        repair: Vec<Operation>,
    },

    #[error("Repair `{rule}` at {path} was rejected: {source}")]
    RepairRejected {
        rule: &'static str,
        path: Path,
        #[source]
        source: InvalidOperation,
    },

    #[error("Normalization did not settle after {iterations} iterations ({remaining} paths left dirty)")]
    IterationLimit { iterations: usize, remaining: usize },
}
