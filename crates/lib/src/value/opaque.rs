//! Opaque leaf value-objects.
//!
//! A value-object is never diffed structurally: every change replaces it
//! wholesale. Its transport shape is produced by a
//! [`ValueResolver`](crate::registry::ValueResolver) registered under its tag.

use std::{any::Any, fmt, sync::Arc};

/// An application leaf type stored as a single document value.
///
/// # Examples
///
/// ```
/// use treebind::value::{Opaque, ValueObject};
///
/// #[derive(Debug, PartialEq)]
/// struct Color(String);
///
/// impl ValueObject for Color {
///     fn type_tag(&self) -> &str {
///         "Color"
///     }
/// }
///
/// let color = Opaque::new(Color("yellow".into()));
/// assert_eq!(color.type_tag(), "Color");
/// assert_eq!(color.downcast_ref::<Color>(), Some(&Color("yellow".into())));
/// ```
pub trait ValueObject: fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Tag of the value resolver for this type.
    fn type_tag(&self) -> &str;
}

trait ErasedObject: fmt::Debug + Send + Sync {
    fn type_tag(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
    fn eq_erased(&self, other: &dyn ErasedObject) -> bool;
}

impl<T: ValueObject> ErasedObject for T {
    fn type_tag(&self) -> &str {
        ValueObject::type_tag(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_erased(&self, other: &dyn ErasedObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Shared handle to a [`ValueObject`].
#[derive(Clone)]
pub struct Opaque(Arc<dyn ErasedObject>);

impl Opaque {
    /// Wraps a value-object.
    pub fn new<T: ValueObject>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Tag of the value resolver for the wrapped type.
    pub fn type_tag(&self) -> &str {
        self.0.type_tag()
    }

    /// Returns the wrapped value if it is a `T`.
    pub fn downcast_ref<T: ValueObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Returns true if the wrapped value is a `T`.
    pub fn is<T: ValueObject>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.eq_erased(other.0.as_ref())
    }
}
