//! Error types for tree construction and lookup.

use thiserror::Error;

/// Errors raised while validating or querying a tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    /// Lookup of an id with no match.
    #[error("no {kind} with id = {id} found")]
    NotFound {
        /// What was looked up (`"node"`, `"triangle"`, `"octree node"`).
        kind: &'static str,
        /// The missing id.
        id: u32,
    },

    /// Two entries share an id.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Entry kind.
        kind: &'static str,
        /// The repeated id.
        id: u32,
    },

    /// A node whose links break the tree shape.
    #[error("malformed {kind} {id}: {reason}")]
    MalformedNode {
        /// Entry kind.
        kind: &'static str,
        /// Offending node id.
        id: u32,
        /// What is wrong with it.
        reason: String,
    },

    /// A bounding box with `min > max` on some axis or non-finite corners.
    #[error("invalid bounding box on {kind} {id}")]
    InvalidAabb {
        /// Entry kind.
        kind: &'static str,
        /// Offending node id.
        id: u32,
    },

    /// The node list is empty, so there is no root.
    #[error("{0} has no nodes")]
    EmptyTree(&'static str),
}

impl TreeError {
    pub(crate) fn malformed(kind: &'static str, id: u32, reason: impl Into<String>) -> Self {
        Self::MalformedNode {
            kind,
            id,
            reason: reason.into(),
        }
    }
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
