//! Named, keyed records.

use std::sync::Arc;

use indexmap::IndexMap;

use super::{IdAllocator, InstanceId, RandomIds, Value, map::set_entry};

#[derive(Debug)]
pub(crate) struct EntityInner {
    pub(crate) id: InstanceId,
    pub(crate) tag: Arc<str>,
    pub(crate) fields: IndexMap<String, Value>,
}

/// A named record with arbitrary child values.
///
/// The name doubles as the entity's type tag: the registry resolves it to the
/// resolver that creates and patches entities of this kind.
///
/// # Examples
///
/// ```
/// use treebind::value::{Entity, Value};
///
/// let task = Entity::new("TaskItem").set("title", "Write tests");
/// let done = task.set("done", true);
///
/// assert_eq!(done.type_tag(), "TaskItem");
/// assert_eq!(done.id(), task.id());
/// assert_eq!(done.get("done"), Some(&Value::Bool(true)));
/// ```
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) inner: Arc<EntityInner>,
}

impl Entity {
    /// Creates an entity with no fields and a fresh random id.
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self::new_in(tag, &RandomIds)
    }

    /// Creates an entity with no fields and an id from `ids`.
    pub fn new_in(tag: impl Into<Arc<str>>, ids: &dyn IdAllocator) -> Self {
        Self::with_id(ids.next_id(), tag, IndexMap::new())
    }

    /// Creates an entity from `fields` with an id from `ids`.
    pub fn with_fields_in(
        tag: impl Into<Arc<str>>,
        fields: IndexMap<String, Value>,
        ids: &dyn IdAllocator,
    ) -> Self {
        Self::with_id(ids.next_id(), tag, fields)
    }

    /// Creates an entity with an explicit id.
    pub fn with_id(id: InstanceId, tag: impl Into<Arc<str>>, fields: IndexMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(EntityInner {
                id,
                tag: tag.into(),
                fields,
            }),
        }
    }

    /// Returns the instance id.
    pub fn id(&self) -> &InstanceId {
        &self.inner.id
    }

    /// Returns the entity name used as its type tag.
    pub fn type_tag(&self) -> &str {
        &self.inner.tag
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.inner.fields.len()
    }

    /// Returns true if the entity has no fields.
    pub fn is_empty(&self) -> bool {
        self.inner.fields.is_empty()
    }

    /// Returns the field `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.fields.get(key)
    }

    /// Returns true if the field `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.fields.contains_key(key)
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.inner.fields.iter()
    }

    /// Borrows the fields.
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.inner.fields
    }

    /// Returns an entity with the field `key` set.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut builder = self.mutate();
        builder.set(key, value);
        builder.finish()
    }

    /// Returns an entity without the field `key`.
    pub fn remove(&self, key: &str) -> Self {
        let mut builder = self.mutate();
        builder.remove(key);
        builder.finish()
    }

    /// Applies several updates at once; `None` removes the field.
    pub fn set_many<K: Into<String>>(
        &self,
        updates: impl IntoIterator<Item = (K, Option<Value>)>,
    ) -> Self {
        let mut builder = self.mutate();
        for (key, value) in updates {
            let key = key.into();
            match value {
                Some(value) => builder.set(key, value),
                None => builder.remove(&key),
            };
        }
        builder.finish()
    }

    /// Starts a batch of edits producing at most one new entity.
    pub fn mutate(&self) -> EntityBuilder {
        EntityBuilder {
            fields: self.inner.fields.clone(),
            source: self.clone(),
            changed: false,
        }
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.inner.tag == other.inner.tag && self.inner.fields == other.inner.fields)
    }
}

impl<'a> IntoIterator for &'a Entity {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records edits against an [`Entity`].
#[derive(Debug)]
pub struct EntityBuilder {
    source: Entity,
    fields: IndexMap<String, Value>,
    changed: bool,
}

impl EntityBuilder {
    /// Sets a field; ignored when the stored value is already the same.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.changed |= set_entry(&mut self.fields, key.into(), value.into());
        self
    }

    /// Removes a field; ignored when absent.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.changed |= self.fields.shift_remove(key).is_some();
        self
    }

    /// Produces the edited entity, or the original instance if nothing changed.
    pub fn finish(self) -> Entity {
        if self.changed {
            let source = &self.source.inner;
            Entity::with_id(source.id.clone(), source.tag.clone(), self.fields)
        } else {
            self.source
        }
    }
}
