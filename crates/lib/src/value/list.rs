//! Persistent ordered containers: the tagged [`List`] and the plain [`Array`].

use std::sync::Arc;

use super::{IdAllocator, InstanceId, RandomIds, Value};

#[derive(Debug)]
pub(crate) struct ListInner {
    pub(crate) id: InstanceId,
    pub(crate) items: Vec<Value>,
}

/// Immutable list carrying an instance id.
///
/// Every edit returns a new `List` that shares the id of the list it was
/// derived from. Edits that would not change anything return the same
/// instance, so callers can detect unchanged values with [`List::ptr_eq`].
///
/// # Examples
///
/// ```
/// use treebind::value::List;
///
/// let list = List::new().push(13);
/// let longer = list.push(42);
///
/// assert_eq!(list.len(), 1);
/// assert_eq!(longer.len(), 2);
/// assert_eq!(longer.id(), list.id());
///
/// // Out-of-range edits are no-ops
/// assert!(longer.remove_at(10).ptr_eq(&longer));
/// ```
#[derive(Debug, Clone)]
pub struct List {
    pub(crate) inner: Arc<ListInner>,
}

impl List {
    /// Creates an empty list with a fresh random id.
    pub fn new() -> Self {
        Self::new_in(&RandomIds)
    }

    /// Creates an empty list with an id from `ids`.
    pub fn new_in(ids: &dyn IdAllocator) -> Self {
        Self::with_id(ids.next_id(), Vec::new())
    }

    /// Creates a list holding `items` with a fresh random id.
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self::from_vec_in(items, &RandomIds)
    }

    /// Creates a list holding `items` with an id from `ids`.
    pub fn from_vec_in(items: Vec<Value>, ids: &dyn IdAllocator) -> Self {
        Self::with_id(ids.next_id(), items)
    }

    /// Creates a list with an explicit id.
    pub fn with_id(id: InstanceId, items: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(ListInner { id, items }),
        }
    }

    /// Returns the instance id.
    pub fn id(&self) -> &InstanceId {
        &self.inner.id
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    /// Returns true if the list has no items.
    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// Returns the item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.inner.items.get(index)
    }

    /// Iterates the items in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.inner.items.iter()
    }

    /// Returns the items as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.inner.items
    }

    /// Returns a list with `value` appended.
    pub fn push(&self, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.push(value);
        builder.finish()
    }

    /// Returns a list with `value` inserted at `index`.
    ///
    /// An index past the end leaves the list unchanged.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.insert(index, value);
        builder.finish()
    }

    /// Returns a list with the item at `index` replaced.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.set(index, value);
        builder.finish()
    }

    /// Returns a list without the item at `index`.
    pub fn remove_at(&self, index: usize) -> Self {
        let mut builder = self.mutate();
        builder.remove_at(index);
        builder.finish()
    }

    /// Returns a list with the item at `index` replaced by `f(item)`.
    pub fn update(&self, index: usize, f: impl FnOnce(&Value) -> Value) -> Self {
        match self.get(index) {
            Some(item) => self.set(index, f(item)),
            None => self.clone(),
        }
    }

    /// Starts a batch of edits producing at most one new list.
    pub fn mutate(&self) -> ListBuilder {
        ListBuilder {
            items: self.inner.items.clone(),
            source: self.clone(),
            changed: false,
        }
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.items == other.inner.items
    }
}

impl<V: Into<Value>> FromIterator<V> for List {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records edits against a [`List`] and produces the edited list on [`finish`](Self::finish).
#[derive(Debug)]
pub struct ListBuilder {
    source: List,
    items: Vec<Value>,
    changed: bool,
}

impl ListBuilder {
    /// Number of items after the edits recorded so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items remain.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends an item.
    pub fn push(&mut self, value: impl Into<Value>) -> &mut Self {
        self.items.push(value.into());
        self.changed = true;
        self
    }

    /// Inserts an item; ignored when `index` is past the end.
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> &mut Self {
        if index <= self.items.len() {
            self.items.insert(index, value.into());
            self.changed = true;
        }
        self
    }

    /// Replaces an item; ignored when out of range or unchanged.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if let Some(slot) = self.items.get_mut(index)
            && !slot.is_same(&value)
        {
            *slot = value;
            self.changed = true;
        }
        self
    }

    /// Removes an item; ignored when out of range.
    pub fn remove_at(&mut self, index: usize) -> &mut Self {
        if index < self.items.len() {
            self.items.remove(index);
            self.changed = true;
        }
        self
    }

    /// Produces the edited list, or the original instance if nothing changed.
    pub fn finish(self) -> List {
        if self.changed {
            List::with_id(self.source.id().clone(), self.items)
        } else {
            self.source
        }
    }
}

/// Immutable plain array without a type tag or instance id.
///
/// Plain arrays are only diffed structurally under
/// [`SyncStrategy::Always`](crate::registry::SyncStrategy::Always).
#[derive(Debug, Clone, Default)]
pub struct Array {
    pub(crate) items: Arc<Vec<Value>>,
}

impl Array {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an array holding `items`.
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the array has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Iterates the items in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Returns the items as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Returns an array with `value` appended.
    pub fn push(&self, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.push(value);
        builder.finish()
    }

    /// Returns an array with the item at `index` replaced.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.set(index, value);
        builder.finish()
    }

    /// Returns an array without the item at `index`.
    pub fn remove_at(&self, index: usize) -> Self {
        let mut builder = self.mutate();
        builder.remove_at(index);
        builder.finish()
    }

    /// Starts a batch of edits producing at most one new array.
    pub fn mutate(&self) -> ArrayBuilder {
        ArrayBuilder {
            items: self.items.as_ref().clone(),
            source: self.clone(),
            changed: false,
        }
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.items == other.items
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records edits against an [`Array`].
#[derive(Debug)]
pub struct ArrayBuilder {
    source: Array,
    items: Vec<Value>,
    changed: bool,
}

impl ArrayBuilder {
    /// Appends an item.
    pub fn push(&mut self, value: impl Into<Value>) -> &mut Self {
        self.items.push(value.into());
        self.changed = true;
        self
    }

    /// Inserts an item; ignored when `index` is past the end.
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> &mut Self {
        if index <= self.items.len() {
            self.items.insert(index, value.into());
            self.changed = true;
        }
        self
    }

    /// Replaces an item; ignored when out of range or unchanged.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if let Some(slot) = self.items.get_mut(index)
            && !slot.is_same(&value)
        {
            *slot = value;
            self.changed = true;
        }
        self
    }

    /// Removes an item; ignored when out of range.
    pub fn remove_at(&mut self, index: usize) -> &mut Self {
        if index < self.items.len() {
            self.items.remove(index);
            self.changed = true;
        }
        self
    }

    /// Produces the edited array, or the original instance if nothing changed.
    pub fn finish(self) -> Array {
        if self.changed {
            Array::from_vec(self.items)
        } else {
            self.source
        }
    }
}
