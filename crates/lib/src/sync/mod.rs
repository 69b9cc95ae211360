//! Bidirectional synchronization between values and the document.
//!
//! - [`project`] writes a new local value onto a document node as the smallest
//!   set of edits the diff can find, inside the caller's transaction.
//! - [`reconstruct`] folds a batch of remote [`ChangeEvent`](crate::doc::ChangeEvent)s
//!   into the prior value, rebuilding only what changed.
//! - [`Binder`] ties both to one state slot and one document root and keeps
//!   its own writes from being reconstructed.
//!
//! [`Links`] is the side-table connecting document nodes to the values last
//! written to or read from them.

pub mod binder;
pub mod errors;
pub mod links;
mod marks;
pub mod materialize;
pub mod project;
pub mod reconstruct;

pub use binder::Binder;
pub use errors::SyncError;
pub use links::Links;
pub use materialize::materialize;
pub use project::{init_root, project};
pub use reconstruct::reconstruct;
