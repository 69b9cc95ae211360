//! Resolvers for the built-in containers and for named entities.

use indexmap::IndexMap;

use super::resolver::{ArrayDiff, ArrayResolver, ObjectDiff, ObjectResolver, RawArray, RawObject};
use crate::{
    Result,
    sync::SyncError,
    value::{Array, Entity, IdAllocator, List, Map, Object, Set, TypeTag, Value},
};

fn unexpected(tag: TypeTag, value: &Value) -> crate::Error {
    SyncError::UnexpectedValue {
        tag,
        found: value.kind_name(),
    }
    .into()
}

/// Resolver for [`List`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListResolver;

impl ArrayResolver for ListResolver {
    fn create(&self, raw: RawArray, ids: &dyn IdAllocator) -> Result<Value> {
        Ok(Value::List(List::from_vec_in(raw, ids)))
    }

    fn to_transport_shape(&self, value: &Value) -> Result<RawArray> {
        let list = value.as_list().ok_or_else(|| unexpected(TypeTag::List, value))?;
        Ok(list.as_slice().to_vec())
    }

    fn apply_patch(&self, value: &Value, diffs: Vec<ArrayDiff>) -> Result<Value> {
        let list = value.as_list().ok_or_else(|| unexpected(TypeTag::List, value))?;
        let mut builder = list.mutate();
        for diff in diffs {
            match diff {
                ArrayDiff::Insert { index, value } => builder.insert(index, value),
                ArrayDiff::Set { index, value } => builder.set(index, value),
                ArrayDiff::Delete { index } => builder.remove_at(index),
            };
        }
        Ok(Value::List(builder.finish()))
    }
}

/// Resolver for [`Map`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapResolver;

impl ObjectResolver for MapResolver {
    fn create(&self, raw: RawObject, ids: &dyn IdAllocator) -> Result<Value> {
        Ok(Value::Map(Map::with_id(ids.next_id(), raw)))
    }

    fn to_transport_shape(&self, value: &Value) -> Result<RawObject> {
        let map = value.as_map().ok_or_else(|| unexpected(TypeTag::Map, value))?;
        Ok(map.entries().clone())
    }

    fn apply_patch(&self, value: &Value, diffs: Vec<ObjectDiff>) -> Result<Value> {
        let map = value.as_map().ok_or_else(|| unexpected(TypeTag::Map, value))?;
        let mut builder = map.mutate();
        for diff in diffs {
            match diff {
                ObjectDiff::Set { key, value } => builder.set(key, value),
                ObjectDiff::Remove { key } => builder.remove(&key),
            };
        }
        Ok(Value::Map(builder.finish()))
    }
}

/// Resolver for [`Set`].
///
/// Members are stored as keys with a `true` leaf.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetResolver;

impl ObjectResolver for SetResolver {
    fn create(&self, raw: RawObject, ids: &dyn IdAllocator) -> Result<Value> {
        Ok(Value::Set(Set::of_in(raw.into_keys(), ids)))
    }

    fn to_transport_shape(&self, value: &Value) -> Result<RawObject> {
        let set = value.as_set().ok_or_else(|| unexpected(TypeTag::Set, value))?;
        Ok(set
            .iter()
            .map(|member| (member.clone(), Value::Bool(true)))
            .collect())
    }

    fn apply_patch(&self, value: &Value, diffs: Vec<ObjectDiff>) -> Result<Value> {
        let set = value.as_set().ok_or_else(|| unexpected(TypeTag::Set, value))?;
        let mut builder = set.mutate();
        for diff in diffs {
            match diff {
                ObjectDiff::Set { key, .. } => builder.add(key),
                ObjectDiff::Remove { key } => builder.remove(&key),
            };
        }
        Ok(Value::Set(builder.finish()))
    }
}

/// Resolver for [`Entity`] values of one tag.
///
/// Fields listed in `defaults` are filled in when an entity is created from
/// a document that lacks them.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    tag: TypeTag,
    defaults: RawObject,
}

impl EntityResolver {
    pub fn new(tag: &str) -> Self {
        Self::with_defaults(tag, IndexMap::new())
    }

    pub fn with_defaults(tag: &str, defaults: RawObject) -> Self {
        Self {
            tag: TypeTag::parse(tag),
            defaults,
        }
    }

    fn entity<'v>(&self, value: &'v Value) -> Result<&'v Entity> {
        match value.as_entity() {
            Some(entity) if entity.type_tag() == self.tag.as_str() => Ok(entity),
            _ => Err(unexpected(self.tag.clone(), value)),
        }
    }
}

impl ObjectResolver for EntityResolver {
    fn create(&self, raw: RawObject, ids: &dyn IdAllocator) -> Result<Value> {
        let mut fields = self.defaults.clone();
        fields.extend(raw);
        Ok(Value::Entity(Entity::with_fields_in(
            self.tag.as_str(),
            fields,
            ids,
        )))
    }

    fn to_transport_shape(&self, value: &Value) -> Result<RawObject> {
        Ok(self.entity(value)?.fields().clone())
    }

    fn apply_patch(&self, value: &Value, diffs: Vec<ObjectDiff>) -> Result<Value> {
        let mut builder = self.entity(value)?.mutate();
        for diff in diffs {
            match diff {
                ObjectDiff::Set { key, value } => builder.set(key, value),
                ObjectDiff::Remove { key } => builder.remove(&key),
            };
        }
        Ok(Value::Entity(builder.finish()))
    }
}

/// Applies keyed edits to a plain object.
pub(crate) fn patch_object(object: &Object, diffs: Vec<ObjectDiff>) -> Object {
    let mut builder = object.mutate();
    for diff in diffs {
        match diff {
            ObjectDiff::Set { key, value } => builder.set(key, value),
            ObjectDiff::Remove { key } => builder.remove(&key),
        };
    }
    builder.finish()
}

/// Applies positional edits to a plain array.
pub(crate) fn patch_array(array: &Array, diffs: Vec<ArrayDiff>) -> Array {
    let mut builder = array.mutate();
    for diff in diffs {
        match diff {
            ArrayDiff::Insert { index, value } => builder.insert(index, value),
            ArrayDiff::Set { index, value } => builder.set(index, value),
            ArrayDiff::Delete { index } => builder.remove_at(index),
        };
    }
    builder.finish()
}
