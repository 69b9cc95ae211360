//!
//! Treebind: keeps an immutable application state tree and a replicated document tree in step.
//!
//! ## Core Concepts
//!
//! * **Values (`value::Value`)**: Persistent, structurally shared containers. Tagged containers
//!   (`List`, `Map`, `Set`, `Entity`) carry an instance id that survives edits, which is how the
//!   synchronizer tells an edited value from a replaced one.
//! * **Documents (`doc::Document`)**: A yrs document of keyed and ordered nodes. Mutations happen
//!   in transactions that produce change events and a replication update; replicas exchanging
//!   updates converge under concurrent edits.
//! * **Registry (`registry::Registry`)**: Maps type tags to the resolvers that convert tagged
//!   values to and from their document shape, plus the sync strategy.
//! * **Sync (`sync`)**: Projection writes local values onto the document as minimal edits;
//!   reconstruction folds remote change events back into values while sharing every untouched
//!   subtree. The `Binder` ties both to one state slot and ignores its own writes.

pub mod doc;
pub mod registry;
pub mod sync;
pub mod value;

pub use doc::Document;
pub use registry::Registry;
pub use sync::Binder;
pub use value::Value;

/// Result type used throughout the Treebind library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Treebind library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured document errors from the doc module
    #[error(transparent)]
    Doc(doc::DocError),

    /// Structured synchronization errors from the sync module
    #[error(transparent)]
    Sync(sync::SyncError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Doc(_) => "doc",
            Error::Sync(_) => "sync",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Doc(doc_err) => doc_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a setup or version mismatch.
    ///
    /// Configuration errors are deterministic; retrying the same operation
    /// fails the same way.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_configuration_error(),
            Error::Doc(doc_err) => matches!(doc_err, doc::DocError::RootKindMismatch { .. }),
            _ => false,
        }
    }

    /// Check if this error is document-related.
    pub fn is_doc_error(&self) -> bool {
        matches!(self, Error::Doc(_))
    }

    /// Check if this error is synchronization-related.
    pub fn is_sync_error(&self) -> bool {
        matches!(self, Error::Sync(_))
    }
}
