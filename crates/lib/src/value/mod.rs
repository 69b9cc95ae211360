//! Persistent value model for application state.
//!
//! This module provides the immutable containers an application state tree is
//! built from. Containers share structure: editing one child of a large tree
//! allocates new nodes only along the path to that child, and every other
//! subtree is carried over by reference.
//!
//! # Core Types
//!
//! - [`Value`] - The tagged union every state tree is made of
//! - [`List`], [`Map`], [`Set`], [`Entity`] - Tagged containers with an [`InstanceId`]
//! - [`Array`], [`Object`] - Plain containers without tag or id
//! - [`Opaque`] - Leaf value-objects replaced wholesale on change
//!
//! # Identity
//!
//! Tagged containers get an instance id when constructed. Derived values
//! (`set`, `add`, `remove`, `mutate`) keep it; fresh constructions get a new one.
//! The synchronizer uses this to tell "the same thing, edited" from "replaced".
//!
//! ```
//! use treebind::value::{List, Value};
//!
//! let list = List::from_vec(vec![Value::from(13)]);
//! let edited = list.push(42);
//! let fresh = List::from_vec(vec![Value::from(13), Value::from(42)]);
//!
//! assert_eq!(edited.id(), list.id());
//! assert_ne!(fresh.id(), list.id());
//! assert_eq!(edited, fresh); // equality ignores ids
//! ```

use std::sync::{Arc, Weak};

use indexmap::IndexMap;

pub mod entity;
pub mod id;
pub mod list;
pub mod map;
pub mod opaque;
pub mod set;
pub mod tag;

pub use entity::{Entity, EntityBuilder};
#[cfg(any(test, feature = "testing"))]
pub use id::SequentialIds;
pub use id::{IdAllocator, InstanceId, RandomIds};
pub use list::{Array, ArrayBuilder, List, ListBuilder};
pub use map::{Map, MapBuilder, Object, ObjectBuilder};
pub use opaque::{Opaque, ValueObject};
pub use set::{Set, SetBuilder};
pub use tag::{TYPE_TAG_KEY, TypeTag};

use entity::EntityInner;
use list::ListInner;
use map::MapInner;
use set::SetInner;

/// A node of the application state tree.
///
/// # Value Types
///
/// ## Scalars
/// - [`Value::Null`], [`Value::Bool`], [`Value::Int`], [`Value::Float`], [`Value::String`]
///
/// ## Tagged containers (carry an instance id)
/// - [`Value::List`], [`Value::Map`], [`Value::Set`], [`Value::Entity`]
///
/// ## Plain containers
/// - [`Value::Array`], [`Value::Object`]
///
/// ## Leaf value-objects
/// - [`Value::Opaque`]
///
/// Equality is deep and ignores instance ids. Use [`Value::is_same`] for the
/// cheap reference check the synchronizer relies on.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null/empty value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    String(Arc<str>),
    /// Plain array
    Array(Array),
    /// Plain object
    Object(Object),
    /// Tagged list
    List(List),
    /// Tagged map
    Map(Map),
    /// Tagged set
    Set(Set),
    /// Named record
    Entity(Entity),
    /// Leaf value-object
    Opaque(Opaque),
}

impl Value {
    /// Returns the variant name as a string
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Entity(_) => "entity",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Returns true for values that hold child values or members.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Value::Array(_)
                | Value::Object(_)
                | Value::List(_)
                | Value::Map(_)
                | Value::Set(_)
                | Value::Entity(_)
        )
    }

    /// Returns the type tag of tagged containers and value-objects.
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Value::List(_) => Some(TypeTag::List),
            Value::Map(_) => Some(TypeTag::Map),
            Value::Set(_) => Some(TypeTag::Set),
            Value::Entity(entity) => Some(TypeTag::Named(entity.inner.tag.clone())),
            Value::Opaque(opaque) => Some(TypeTag::parse(opaque.type_tag())),
            _ => None,
        }
    }

    /// Returns the instance id of tagged containers.
    pub fn instance_id(&self) -> Option<&InstanceId> {
        match self {
            Value::List(list) => Some(list.id()),
            Value::Map(map) => Some(map.id()),
            Value::Set(set) => Some(set.id()),
            Value::Entity(entity) => Some(entity.id()),
            _ => None,
        }
    }

    /// Returns true if both values carry the same instance id.
    ///
    /// Values without an id never share one.
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self.instance_id(), other.instance_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Reference check used to skip unchanged subtrees.
    ///
    /// Containers and value-objects compare by pointer; scalars by value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Set(a), Value::Set(b)) => a.ptr_eq(b),
            (Value::Entity(a), Value::Entity(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Attempts to read a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to read an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to read a float; integers are widened
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to read a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Attempts to borrow a plain array
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Attempts to borrow a plain object
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Attempts to borrow a list
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Attempts to borrow a map
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Attempts to borrow a set
    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Attempts to borrow an entity
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Attempts to borrow a value-object handle
    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Value::Opaque(opaque) => Some(opaque),
            _ => None,
        }
    }

    /// Attempts to borrow a value-object as `T`
    pub fn downcast_ref<T: ValueObject>(&self) -> Option<&T> {
        self.as_opaque().and_then(Opaque::downcast_ref)
    }

    /// Looks up a child by key in keyed containers.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(object) => object.get(key),
            Value::Map(map) => map.get(key),
            Value::Entity(entity) => entity.get(key),
            _ => None,
        }
    }

    /// Looks up a child by index in ordered containers.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(array) => array.get(index),
            Value::List(list) => list.get(index),
            _ => None,
        }
    }

    /// Converts a JSON value, mapping arrays and objects to plain containers.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(Arc::from(s.as_str())),
            serde_json::Value::Array(items) => {
                Value::Array(Array::from_vec(items.iter().map(Value::from_json).collect()))
            }
            serde_json::Value::Object(entries) => Value::Object(Object::from_map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            )),
        }
    }

    /// Renders the value as JSON for display and debugging.
    ///
    /// Tagged containers are rendered with their contents only; entities add
    /// their tag under [`TYPE_TAG_KEY`]; value-objects render as their debug
    /// representation.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(array) => array.iter().map(Value::to_json).collect(),
            Value::List(list) => list.iter().map(Value::to_json).collect(),
            Value::Object(object) => entries_to_json(object.iter()),
            Value::Map(map) => entries_to_json(map.iter()),
            Value::Set(set) => set
                .iter()
                .map(|item| serde_json::Value::String(item.clone()))
                .collect(),
            Value::Entity(entity) => {
                let mut json = serde_json::Map::new();
                json.insert(
                    TYPE_TAG_KEY.to_string(),
                    serde_json::Value::String(entity.type_tag().to_string()),
                );
                for (key, value) in entity.iter() {
                    json.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(json)
            }
            Value::Opaque(opaque) => serde_json::Value::String(format!("{opaque:?}")),
        }
    }

    /// Address of the shared allocation backing a container.
    ///
    /// Clones of one container share the key; it identifies the instance in
    /// the synchronizer's side-tables.
    pub(crate) fn container_key(&self) -> Option<usize> {
        match self {
            Value::Array(array) => Some(Arc::as_ptr(&array.items) as *const () as usize),
            Value::Object(object) => Some(Arc::as_ptr(&object.entries) as *const () as usize),
            Value::List(list) => Some(Arc::as_ptr(&list.inner) as *const () as usize),
            Value::Map(map) => Some(Arc::as_ptr(&map.inner) as *const () as usize),
            Value::Set(set) => Some(Arc::as_ptr(&set.inner) as *const () as usize),
            Value::Entity(entity) => Some(Arc::as_ptr(&entity.inner) as *const () as usize),
            _ => None,
        }
    }

    pub(crate) fn downgrade(&self) -> Option<WeakValue> {
        match self {
            Value::Array(array) => Some(WeakValue::Array(Arc::downgrade(&array.items))),
            Value::Object(object) => Some(WeakValue::Object(Arc::downgrade(&object.entries))),
            Value::List(list) => Some(WeakValue::List(Arc::downgrade(&list.inner))),
            Value::Map(map) => Some(WeakValue::Map(Arc::downgrade(&map.inner))),
            Value::Set(set) => Some(WeakValue::Set(Arc::downgrade(&set.inner))),
            Value::Entity(entity) => Some(WeakValue::Entity(Arc::downgrade(&entity.inner))),
            _ => None,
        }
    }
}

fn entries_to_json<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>) -> serde_json::Value {
    serde_json::Value::Object(entries.map(|(k, v)| (k.clone(), v.to_json())).collect())
}

/// Weak handle to a container allocation.
///
/// Holding it keeps the allocation address reserved, so a container key
/// cannot be reused by another value while the handle is alive.
#[derive(Debug, Clone)]
pub(crate) enum WeakValue {
    Array(Weak<Vec<Value>>),
    Object(Weak<IndexMap<String, Value>>),
    List(Weak<ListInner>),
    Map(Weak<MapInner>),
    Set(Weak<SetInner>),
    Entity(Weak<EntityInner>),
}

impl WeakValue {
    pub(crate) fn upgrade(&self) -> Option<Value> {
        match self {
            WeakValue::Array(weak) => weak.upgrade().map(|items| Value::Array(Array { items })),
            WeakValue::Object(weak) => weak
                .upgrade()
                .map(|entries| Value::Object(Object { entries })),
            WeakValue::List(weak) => weak.upgrade().map(|inner| Value::List(List { inner })),
            WeakValue::Map(weak) => weak.upgrade().map(|inner| Value::Map(Map { inner })),
            WeakValue::Set(weak) => weak.upgrade().map(|inner| Value::Set(Set { inner })),
            WeakValue::Entity(weak) => weak.upgrade().map(|inner| Value::Entity(Entity { inner })),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            WeakValue::Array(weak) => weak.strong_count() > 0,
            WeakValue::Object(weak) => weak.strong_count() > 0,
            WeakValue::List(weak) => weak.strong_count() > 0,
            WeakValue::Map(weak) => weak.strong_count() > 0,
            WeakValue::Set(weak) => weak.strong_count() > 0,
            WeakValue::Entity(weak) => weak.strong_count() > 0,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<List> for Value {
    fn from(value: List) -> Self {
        Value::List(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Set> for Value {
    fn from(value: Set) -> Self {
        Value::Set(value)
    }
}

impl From<Entity> for Value {
    fn from(value: Entity) -> Self {
        Value::Entity(value)
    }
}

impl From<Opaque> for Value {
    fn from(value: Opaque) -> Self {
        Value::Opaque(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
