//! Type tags naming the resolver that governs a tagged value.

use std::{fmt, sync::Arc};

/// Reserved key (keyed nodes) or sentinel field (ordered nodes and
/// value-object leaves) carrying the type tag in the document.
pub const TYPE_TAG_KEY: &str = "__typeName";

/// Identifies which resolver governs a tagged container or leaf.
///
/// The built-in container kinds are a closed set; application entity and
/// value-object types are looked up by name in the
/// [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Persistent list
    List,
    /// Persistent string-keyed map
    Map,
    /// Persistent string set
    Set,
    /// Application-defined entity or value-object type
    Named(Arc<str>),
}

impl TypeTag {
    /// Parses a tag as stored in the document.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "List" => TypeTag::List,
            "Map" => TypeTag::Map,
            "Set" => TypeTag::Set,
            other => TypeTag::Named(Arc::from(other)),
        }
    }

    /// Returns the tag as stored in the document.
    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::List => "List",
            TypeTag::Map => "Map",
            TypeTag::Set => "Set",
            TypeTag::Named(name) => name.as_ref(),
        }
    }

    /// Returns true for the built-in container kinds.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, TypeTag::Named(_))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TypeTag {
    fn from(value: &str) -> Self {
        TypeTag::parse(value)
    }
}
