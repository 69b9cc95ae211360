//! Error types for document operations.

use thiserror::Error;

use super::{NodeId, NodeKind};

/// Structured error types for document operations.
///
/// Raised by transaction primitives when they address a node that does not
/// exist or has the wrong shape, and when a remote update cannot be decoded
/// or integrated.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DocError {
    /// No node with this id exists in the document
    #[error("Document node not found: {node}")]
    NodeNotFound { node: NodeId },

    /// A keyed operation was issued against an ordered node
    #[error("Document node is not keyed: {node}")]
    NotKeyed { node: NodeId },

    /// An ordered operation was issued against a keyed node
    #[error("Document node is not ordered: {node}")]
    NotOrdered { node: NodeId },

    /// An ordered operation addressed a position past the end of the node
    #[error("Index {index} out of bounds for node {node} of length {len}")]
    IndexOutOfBounds {
        node: NodeId,
        index: usize,
        len: usize,
    },

    /// A root was requested with a different kind than it was created with
    #[error("Root '{name}' is {actual}, expected {expected}")]
    RootKindMismatch {
        name: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    /// No root with this name exists in the document
    #[error("Document root not found: {name}")]
    RootNotFound { name: String },

    /// An encoded update or state vector could not be decoded
    #[error("Failed to decode document update: {reason}")]
    DecodeFailed { reason: String },

    /// A decoded update could not be integrated into the document
    #[error("Document rejected update: {reason}")]
    UpdateRejected { reason: String },
}

impl DocError {
    /// Check if this error indicates a missing node or root
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocError::NodeNotFound { .. } | DocError::RootNotFound { .. }
        )
    }

    /// Check if this error is a node shape mismatch
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            DocError::NotKeyed { .. }
                | DocError::NotOrdered { .. }
                | DocError::RootKindMismatch { .. }
        )
    }

    /// Check if this error came from decoding or integrating an update
    pub fn is_update_error(&self) -> bool {
        matches!(
            self,
            DocError::DecodeFailed { .. } | DocError::UpdateRejected { .. }
        )
    }

    /// Get the node id if this error concerns a specific node
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            DocError::NodeNotFound { node }
            | DocError::NotKeyed { node }
            | DocError::NotOrdered { node }
            | DocError::IndexOutOfBounds { node, .. } => Some(node),
            _ => None,
        }
    }
}

// Conversion from DocError to the main Error type
impl From<DocError> for crate::Error {
    fn from(err: DocError) -> Self {
        crate::Error::Doc(err)
    }
}
