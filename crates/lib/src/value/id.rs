//! Instance id allocation
//!
//! This module provides an [`IdAllocator`] trait that abstracts over how
//! container instance ids are produced, allowing production code to use
//! random UUIDs while tests can inject a deterministic sequence.
//!
//! # Example
//!
//! ```
//! use treebind::value::{IdAllocator, RandomIds};
//!
//! let ids = RandomIds;
//! let a = ids.next_id();
//! let b = ids.next_id();
//! assert_ne!(a, b);
//! ```

use std::{fmt, sync::Arc};

#[cfg(any(test, feature = "testing"))]
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity tag of a container instance.
///
/// Assigned once when a container is constructed and carried unchanged by
/// every value derived from it through `set`, `add`, `remove` or `mutate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(Arc<str>);

impl InstanceId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for InstanceId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// A source of fresh instance ids.
///
/// This trait abstracts over id sources to enable:
/// - Collision-free ids across peers in production
/// - Predictable ids in tests
pub trait IdAllocator: Send + Sync + fmt::Debug {
    /// Returns an id that has not been handed out before.
    fn next_id(&self) -> InstanceId;
}

/// Production allocator issuing random UUID v4 ids.
///
/// This is the allocator used by the plain constructors such as
/// [`List::new`](super::List::new).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdAllocator for RandomIds {
    fn next_id(&self) -> InstanceId {
        InstanceId::from(uuid::Uuid::new_v4().to_string())
    }
}

/// Test allocator issuing `"0"`, `"1"`, `"2"`, ...
///
/// # Example
///
/// ```
/// use treebind::value::{IdAllocator, SequentialIds};
///
/// let ids = SequentialIds::new();
/// assert_eq!(ids.next_id().as_str(), "0");
/// assert_eq!(ids.next_id().as_str(), "1");
/// ```
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

#[cfg(any(test, feature = "testing"))]
impl SequentialIds {
    /// Creates an allocator starting at zero.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an allocator whose first id is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl IdAllocator for SequentialIds {
    fn next_id(&self) -> InstanceId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        InstanceId::from(id.to_string())
    }
}
