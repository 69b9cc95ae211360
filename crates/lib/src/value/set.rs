//! Persistent string set.

use std::{collections::BTreeSet, sync::Arc};

use super::{IdAllocator, InstanceId, RandomIds};

#[derive(Debug)]
pub(crate) struct SetInner {
    pub(crate) id: InstanceId,
    pub(crate) items: BTreeSet<String>,
}

/// Immutable set of strings carrying an instance id.
///
/// In the document a set is a keyed node whose keys are the members.
/// Iteration is in sorted order.
///
/// # Examples
///
/// ```
/// use treebind::value::Set;
///
/// let tags = Set::of(["urgent"]);
/// let more = tags.add("home");
///
/// assert!(more.contains("home"));
/// assert!(!tags.contains("home"));
/// assert!(more.add("home").ptr_eq(&more));
/// ```
#[derive(Debug, Clone)]
pub struct Set {
    pub(crate) inner: Arc<SetInner>,
}

impl Set {
    /// Creates an empty set with a fresh random id.
    pub fn new() -> Self {
        Self::new_in(&RandomIds)
    }

    /// Creates an empty set with an id from `ids`.
    pub fn new_in(ids: &dyn IdAllocator) -> Self {
        Self::with_id(ids.next_id(), BTreeSet::new())
    }

    /// Creates a set holding `items` with a fresh random id.
    pub fn of<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Self::of_in(items, &RandomIds)
    }

    /// Creates a set holding `items` with an id from `ids`.
    pub fn of_in<S: Into<String>>(items: impl IntoIterator<Item = S>, ids: &dyn IdAllocator) -> Self {
        Self::with_id(ids.next_id(), items.into_iter().map(Into::into).collect())
    }

    /// Creates a set with an explicit id.
    pub fn with_id(id: InstanceId, items: BTreeSet<String>) -> Self {
        Self {
            inner: Arc::new(SetInner { id, items }),
        }
    }

    /// Returns the instance id.
    pub fn id(&self) -> &InstanceId {
        &self.inner.id
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    /// Returns true if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// Returns true if `item` is a member.
    pub fn contains(&self, item: &str) -> bool {
        self.inner.items.contains(item)
    }

    /// Iterates members in sorted order.
    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, String> {
        self.inner.items.iter()
    }

    /// Returns a set with `item` added.
    pub fn add(&self, item: impl Into<String>) -> Self {
        let mut builder = self.mutate();
        builder.add(item);
        builder.finish()
    }

    /// Returns a set without `item`.
    pub fn remove(&self, item: &str) -> Self {
        let mut builder = self.mutate();
        builder.remove(item);
        builder.finish()
    }

    /// Starts a batch of edits producing at most one new set.
    pub fn mutate(&self) -> SetBuilder {
        SetBuilder {
            items: self.inner.items.clone(),
            source: self.clone(),
            changed: false,
        }
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Set) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Set {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.items == other.inner.items
    }
}

impl<'a> IntoIterator for &'a Set {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records edits against a [`Set`].
#[derive(Debug)]
pub struct SetBuilder {
    source: Set,
    items: BTreeSet<String>,
    changed: bool,
}

impl SetBuilder {
    /// Adds a member; empty strings are ignored.
    pub fn add(&mut self, item: impl Into<String>) -> &mut Self {
        let item = item.into();
        if !item.is_empty() {
            self.changed |= self.items.insert(item);
        }
        self
    }

    /// Removes a member; ignored when absent.
    pub fn remove(&mut self, item: &str) -> &mut Self {
        self.changed |= self.items.remove(item);
        self
    }

    /// Produces the edited set, or the original instance if nothing changed.
    pub fn finish(self) -> Set {
        if self.changed {
            Set::with_id(self.source.id().clone(), self.items)
        } else {
            self.source
        }
    }
}
