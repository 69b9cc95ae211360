//! Persistent keyed containers: the tagged [`Map`] and the plain [`Object`].

use std::sync::Arc;

use indexmap::IndexMap;

use super::{IdAllocator, InstanceId, RandomIds, Value};

#[derive(Debug)]
pub(crate) struct MapInner {
    pub(crate) id: InstanceId,
    pub(crate) entries: IndexMap<String, Value>,
}

/// Immutable string-keyed map carrying an instance id.
///
/// Iteration follows insertion order; equality ignores it.
///
/// # Examples
///
/// ```
/// use treebind::value::Map;
///
/// let map = Map::new().set("title", "Groceries");
/// let renamed = map.set("title", "Errands");
///
/// assert_eq!(renamed.id(), map.id());
/// assert_eq!(map.get("title").and_then(|v| v.as_str()), Some("Groceries"));
///
/// // Removing a missing key returns the same instance
/// assert!(renamed.remove("missing").ptr_eq(&renamed));
/// ```
#[derive(Debug, Clone)]
pub struct Map {
    pub(crate) inner: Arc<MapInner>,
}

impl Map {
    /// Creates an empty map with a fresh random id.
    pub fn new() -> Self {
        Self::new_in(&RandomIds)
    }

    /// Creates an empty map with an id from `ids`.
    pub fn new_in(ids: &dyn IdAllocator) -> Self {
        Self::with_id(ids.next_id(), IndexMap::new())
    }

    /// Creates a map from `entries` with a fresh random id.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_entries_in(entries, &RandomIds)
    }

    /// Creates a map from `entries` with an id from `ids`.
    pub fn from_entries_in<K, V>(
        entries: impl IntoIterator<Item = (K, V)>,
        ids: &dyn IdAllocator,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_id(ids.next_id(), entries)
    }

    /// Creates a map with an explicit id.
    pub fn with_id(id: InstanceId, entries: IndexMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(MapInner { id, entries }),
        }
    }

    /// Returns the instance id.
    pub fn id(&self) -> &InstanceId {
        &self.inner.id
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.entries.get(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.contains_key(key)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.inner.entries.iter()
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.inner.entries.keys()
    }

    /// Borrows the underlying entries.
    pub fn entries(&self) -> &IndexMap<String, Value> {
        &self.inner.entries
    }

    /// Returns a map with `key` set to `value`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.set(key, value);
        builder.finish()
    }

    /// Returns a map without `key`.
    pub fn remove(&self, key: &str) -> Self {
        let mut builder = self.mutate();
        builder.remove(key);
        builder.finish()
    }

    /// Returns a map with the value under `key` replaced by `f(value)`.
    ///
    /// A missing key leaves the map unchanged.
    pub fn update(&self, key: &str, f: impl FnOnce(&Value) -> Value) -> Self {
        match self.get(key) {
            Some(value) => self.set(key, f(value)),
            None => self.clone(),
        }
    }

    /// Starts a batch of edits producing at most one new map.
    pub fn mutate(&self) -> MapBuilder {
        MapBuilder {
            entries: self.inner.entries.clone(),
            source: self.clone(),
            changed: false,
        }
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Map) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.entries == other.inner.entries
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records edits against a [`Map`].
#[derive(Debug)]
pub struct MapBuilder {
    source: Map,
    entries: IndexMap<String, Value>,
    changed: bool,
}

impl MapBuilder {
    /// Sets `key`; ignored when the stored value is already the same.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.changed |= set_entry(&mut self.entries, key.into(), value.into());
        self
    }

    /// Removes `key`; ignored when absent.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.changed |= self.entries.shift_remove(key).is_some();
        self
    }

    /// Produces the edited map, or the original instance if nothing changed.
    pub fn finish(self) -> Map {
        if self.changed {
            Map::with_id(self.source.id().clone(), self.entries)
        } else {
            self.source
        }
    }
}

/// Immutable plain object without a type tag or instance id.
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub(crate) entries: Arc<IndexMap<String, Value>>,
}

impl Object {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object from `entries`.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wraps an existing map of entries.
    pub fn from_map(entries: IndexMap<String, Value>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the object has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Borrows the underlying entries.
    pub fn entries(&self) -> &IndexMap<String, Value> {
        &self.entries
    }

    /// Returns an object with `key` set to `value`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.set(key, value);
        builder.finish()
    }

    /// Returns an object without `key`.
    pub fn remove(&self, key: &str) -> Self {
        let mut builder = self.mutate();
        builder.remove(key);
        builder.finish()
    }

    /// Starts a batch of edits producing at most one new object.
    pub fn mutate(&self) -> ObjectBuilder {
        ObjectBuilder {
            entries: self.entries.as_ref().clone(),
            source: self.clone(),
            changed: false,
        }
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.entries == other.entries
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records edits against an [`Object`].
#[derive(Debug)]
pub struct ObjectBuilder {
    source: Object,
    entries: IndexMap<String, Value>,
    changed: bool,
}

impl ObjectBuilder {
    /// Sets `key`; ignored when the stored value is already the same.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.changed |= set_entry(&mut self.entries, key.into(), value.into());
        self
    }

    /// Removes `key`; ignored when absent.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.changed |= self.entries.shift_remove(key).is_some();
        self
    }

    /// Produces the edited object, or the original instance if nothing changed.
    pub fn finish(self) -> Object {
        if self.changed {
            Object::from_map(self.entries)
        } else {
            self.source
        }
    }
}

/// Stores `value` under `key`, returning whether the entries changed.
pub(crate) fn set_entry(entries: &mut IndexMap<String, Value>, key: String, value: Value) -> bool {
    match entries.get_mut(&key) {
        Some(slot) if slot.is_same(&value) => false,
        Some(slot) => {
            *slot = value;
            true
        }
        None => {
            entries.insert(key, value);
            true
        }
    }
}
