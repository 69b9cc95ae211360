//! Resolver traits and the patch types they apply.

use std::{fmt, marker::PhantomData};

use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Result,
    sync::SyncError,
    value::{IdAllocator, TYPE_TAG_KEY, TypeTag, Value, ValueObject},
};

/// Keyed transport shape of a tagged value, tag excluded.
pub type RawObject = IndexMap<String, Value>;

/// Ordered transport shape of a tagged value, tag excluded.
pub type RawArray = Vec<Value>;

/// JSON shape of a value-object leaf.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// One keyed edit produced by reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectDiff {
    Set { key: String, value: Value },
    Remove { key: String },
}

impl ObjectDiff {
    /// Key the edit applies to.
    pub fn key(&self) -> &str {
        match self {
            ObjectDiff::Set { key, .. } | ObjectDiff::Remove { key } => key,
        }
    }
}

/// One positional edit produced by reconstruction.
///
/// Edits in a list are applied in order, each against the result of the
/// previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayDiff {
    Insert { index: usize, value: Value },
    Set { index: usize, value: Value },
    Delete { index: usize },
}

impl ArrayDiff {
    /// Index the edit applies to.
    pub fn index(&self) -> usize {
        match self {
            ArrayDiff::Insert { index, .. }
            | ArrayDiff::Set { index, .. }
            | ArrayDiff::Delete { index } => *index,
        }
    }
}

/// Converts a keyed tagged value to and from its document shape.
pub trait ObjectResolver: Send + Sync + fmt::Debug {
    /// Builds a fresh value from its transport shape.
    fn create(&self, raw: RawObject, ids: &dyn IdAllocator) -> Result<Value>;

    /// Lists the child values to store in the document.
    fn to_transport_shape(&self, value: &Value) -> Result<RawObject>;

    /// Applies edits, keeping the value's instance id.
    fn apply_patch(&self, value: &Value, diffs: Vec<ObjectDiff>) -> Result<Value>;
}

/// Converts an ordered tagged value to and from its document shape.
pub trait ArrayResolver: Send + Sync + fmt::Debug {
    /// Builds a fresh value from its transport shape.
    fn create(&self, raw: RawArray, ids: &dyn IdAllocator) -> Result<Value>;

    /// Lists the child values to store in the document.
    fn to_transport_shape(&self, value: &Value) -> Result<RawArray>;

    /// Applies edits in order, keeping the value's instance id.
    fn apply_patch(&self, value: &Value, diffs: Vec<ArrayDiff>) -> Result<Value>;
}

/// Converts a leaf value-object to and from a JSON object.
///
/// Value-objects are never diffed; every change replaces the whole leaf.
pub trait ValueResolver: Send + Sync + fmt::Debug {
    /// Builds the value from its stored JSON object.
    ///
    /// `raw` still contains the [`TYPE_TAG_KEY`] entry.
    fn from_transport(&self, raw: &JsonObject) -> Result<Value>;

    /// Produces the JSON object to store; the tag entry is added by the caller.
    fn to_transport(&self, value: &Value) -> Result<JsonObject>;
}

/// [`ValueResolver`] for value-objects that implement serde's traits.
///
/// The value-object must serialize as a JSON object.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use treebind::{
///     registry::{Registry, SerdeValueResolver},
///     value::ValueObject,
/// };
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Color {
///     value: String,
/// }
///
/// impl ValueObject for Color {
///     fn type_tag(&self) -> &str {
///         "Color"
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.register_value("Color", SerdeValueResolver::<Color>::new());
/// assert!(registry.value_resolver("Color").is_some());
/// ```
pub struct SerdeValueResolver<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeValueResolver<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeValueResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeValueResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeValueResolver")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> ValueResolver for SerdeValueResolver<T>
where
    T: ValueObject + Serialize + DeserializeOwned,
{
    fn from_transport(&self, raw: &JsonObject) -> Result<Value> {
        let mut fields = raw.clone();
        fields.remove(TYPE_TAG_KEY);
        let object: T = serde_json::from_value(serde_json::Value::Object(fields))?;
        Ok(Value::Opaque(crate::value::Opaque::new(object)))
    }

    fn to_transport(&self, value: &Value) -> Result<JsonObject> {
        let object = value.downcast_ref::<T>().ok_or_else(|| SyncError::UnexpectedValue {
            tag: value.type_tag().unwrap_or_else(|| TypeTag::parse("?")),
            found: value.kind_name(),
        })?;
        match serde_json::to_value(object)? {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Err(SyncError::UnexpectedValue {
                tag: TypeTag::parse(object.type_tag()),
                found: value.kind_name(),
            }
            .into()),
        }
    }
}
