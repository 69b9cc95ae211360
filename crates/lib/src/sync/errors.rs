//! Error types for synchronization.
//!
//! Most variants are configuration errors: a tag with no registered resolver,
//! a resolver of the wrong kind, or a root value that cannot become a
//! document node. They are deterministic and surface to the caller of the
//! projection or reconstruction that hit them. Mismatched instance ids or
//! tags are never errors; those are resolved by replacing content.

use thiserror::Error;

use crate::{doc::NodeId, value::TypeTag};

/// Structured error types for synchronization.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SyncError {
    /// A value or node carries a tag with no registered resolver
    #[error("No resolver registered for type '{tag}'")]
    UnknownType { tag: TypeTag },

    /// The resolver registered for a tag has the wrong shape
    #[error("Resolver for type '{tag}' is {actual}, expected {expected}")]
    ResolverKindMismatch {
        tag: TypeTag,
        expected: &'static str,
        actual: &'static str,
    },

    /// A resolver received a value it does not govern
    #[error("Resolver for type '{tag}' cannot handle a {found} value")]
    UnexpectedValue { tag: TypeTag, found: &'static str },

    /// The root value does not map to a container node
    #[error("Root value must be a container, found {found}")]
    RootNotContainer { found: &'static str },

    /// The existing root node has a different shape than the root value
    #[error("Root node {node} does not match the shape of the root value")]
    RootShapeMismatch { node: NodeId },

    /// A resolver could not apply a patch
    #[error("Failed to patch '{tag}': {reason}")]
    PatchFailed { tag: TypeTag, reason: String },
}

impl SyncError {
    /// Check if this error indicates a setup or version mismatch
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SyncError::UnknownType { .. }
                | SyncError::ResolverKindMismatch { .. }
                | SyncError::RootNotContainer { .. }
                | SyncError::RootShapeMismatch { .. }
        )
    }

    /// Check if this error is a missing resolver
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, SyncError::UnknownType { .. })
    }

    /// Get the type tag if this error concerns a specific type
    pub fn type_tag(&self) -> Option<&TypeTag> {
        match self {
            SyncError::UnknownType { tag }
            | SyncError::ResolverKindMismatch { tag, .. }
            | SyncError::UnexpectedValue { tag, .. }
            | SyncError::PatchFailed { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

// Conversion from SyncError to the main Error type
impl From<SyncError> for crate::Error {
    fn from(err: SyncError) -> Self {
        crate::Error::Sync(err)
    }
}
