//! Resolver registry and synchronization strategy.
//!
//! The registry maps each [`TypeTag`] to the resolver that converts tagged
//! values to and from their document shape. Built-in containers
//! ([`List`](crate::value::List), [`Map`](crate::value::Map),
//! [`Set`](crate::value::Set)) resolve without registration; entity and
//! value-object tags are registered by the application at startup.
//!
//! # Example
//!
//! ```
//! use treebind::registry::{Registry, SyncStrategy};
//! use treebind::value::TypeTag;
//!
//! let mut registry = Registry::new().with_strategy(SyncStrategy::Always);
//! registry.register_entity("TaskItem");
//!
//! assert!(registry.resolver(&TypeTag::parse("TaskItem")).is_ok());
//! assert!(registry.resolver(&TypeTag::parse("Unknown")).is_err());
//! ```

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

pub mod builtin;
pub mod resolver;

pub use builtin::{EntityResolver, ListResolver, MapResolver, SetResolver};
pub(crate) use builtin::{patch_array, patch_object};
pub use resolver::{
    ArrayDiff, ArrayResolver, JsonObject, ObjectDiff, ObjectResolver, RawArray, RawObject,
    SerdeValueResolver, ValueResolver,
};

pub use crate::value::TypeTag;
use crate::{
    doc::NodeKind,
    sync::SyncError,
    value::{IdAllocator, RandomIds},
};

/// Which untagged document nodes are diffed structurally.
///
/// Plain [`Array`](crate::value::Array) and [`Object`](crate::value::Object)
/// values are always stored as document nodes. Under `Always` an edited plain
/// container is patched in place; under `IsEntity` only tagged containers are
/// diffed and plain ones are rewritten whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    /// Diff every container
    Always,
    /// Diff only containers carrying a type tag
    #[default]
    IsEntity,
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStrategy::Always => f.write_str("always"),
            SyncStrategy::IsEntity => f.write_str("is-entity"),
        }
    }
}

impl FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(SyncStrategy::Always),
            "is-entity" | "is_entity" | "entity" => Ok(SyncStrategy::IsEntity),
            other => Err(format!(
                "unknown sync strategy '{other}', expected 'always' or 'is-entity'"
            )),
        }
    }
}

/// A registered type resolver.
#[derive(Debug, Clone)]
pub enum TypeResolver {
    Object(Arc<dyn ObjectResolver>),
    Array(Arc<dyn ArrayResolver>),
}

/// Borrowed resolver returned by [`Registry::resolver`].
#[derive(Debug, Clone, Copy)]
pub enum ResolverRef<'a> {
    Object(&'a dyn ObjectResolver),
    Array(&'a dyn ArrayResolver),
}

impl ResolverRef<'_> {
    /// Shape of the document node holding values of this type.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            ResolverRef::Object(_) => NodeKind::Keyed,
            ResolverRef::Array(_) => NodeKind::Ordered,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            ResolverRef::Object(_) => "an object resolver",
            ResolverRef::Array(_) => "an array resolver",
        }
    }
}

/// Configuration shared by projection and reconstruction.
///
/// Populated once at startup and then shared read-only, typically behind an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct Registry {
    types: HashMap<Arc<str>, TypeResolver>,
    values: HashMap<Arc<str>, Arc<dyn ValueResolver>>,
    strategy: SyncStrategy,
    ids: Arc<dyn IdAllocator>,
}

impl Registry {
    /// Creates a registry with only the built-in containers, the default
    /// strategy and random instance ids.
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
            values: HashMap::new(),
            strategy: SyncStrategy::default(),
            ids: Arc::new(RandomIds),
        }
    }

    /// Sets the synchronization strategy.
    pub fn with_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the allocator used for values created during reconstruction.
    pub fn with_ids(mut self, ids: Arc<dyn IdAllocator>) -> Self {
        self.ids = ids;
        self
    }

    /// Registers a keyed resolver for `tag`, replacing any previous one.
    pub fn register_object(
        &mut self,
        tag: &str,
        resolver: impl ObjectResolver + 'static,
    ) -> &mut Self {
        self.types
            .insert(Arc::from(tag), TypeResolver::Object(Arc::new(resolver)));
        self
    }

    /// Registers an ordered resolver for `tag`, replacing any previous one.
    pub fn register_array(
        &mut self,
        tag: &str,
        resolver: impl ArrayResolver + 'static,
    ) -> &mut Self {
        self.types
            .insert(Arc::from(tag), TypeResolver::Array(Arc::new(resolver)));
        self
    }

    /// Registers an [`EntityResolver`] for `tag`.
    pub fn register_entity(&mut self, tag: &str) -> &mut Self {
        self.register_object(tag, EntityResolver::new(tag))
    }

    /// Registers an [`EntityResolver`] for `tag` that fills in `defaults`.
    pub fn register_entity_with_defaults(&mut self, tag: &str, defaults: RawObject) -> &mut Self {
        self.register_object(tag, EntityResolver::with_defaults(tag, defaults))
    }

    /// Registers a value-object resolver for `tag`.
    pub fn register_value(
        &mut self,
        tag: &str,
        resolver: impl ValueResolver + 'static,
    ) -> &mut Self {
        self.values.insert(Arc::from(tag), Arc::new(resolver));
        self
    }

    /// Returns the synchronization strategy.
    pub fn strategy(&self) -> SyncStrategy {
        self.strategy
    }

    /// Returns the allocator for values created during reconstruction.
    pub fn ids(&self) -> &dyn IdAllocator {
        self.ids.as_ref()
    }

    /// Looks up the resolver for a container tag.
    pub fn resolver(&self, tag: &TypeTag) -> Result<ResolverRef<'_>, SyncError> {
        match tag {
            TypeTag::List => Ok(ResolverRef::Array(&ListResolver)),
            TypeTag::Map => Ok(ResolverRef::Object(&MapResolver)),
            TypeTag::Set => Ok(ResolverRef::Object(&SetResolver)),
            TypeTag::Named(name) => match self.types.get(name) {
                Some(TypeResolver::Object(resolver)) => Ok(ResolverRef::Object(resolver.as_ref())),
                Some(TypeResolver::Array(resolver)) => Ok(ResolverRef::Array(resolver.as_ref())),
                None => Err(SyncError::UnknownType { tag: tag.clone() }),
            },
        }
    }

    /// Looks up a keyed resolver, failing if `tag` resolves to an ordered one.
    pub fn object_resolver(&self, tag: &TypeTag) -> Result<&dyn ObjectResolver, SyncError> {
        match self.resolver(tag)? {
            ResolverRef::Object(resolver) => Ok(resolver),
            other => Err(SyncError::ResolverKindMismatch {
                tag: tag.clone(),
                expected: "an object resolver",
                actual: other.kind_name(),
            }),
        }
    }

    /// Looks up an ordered resolver, failing if `tag` resolves to a keyed one.
    pub fn array_resolver(&self, tag: &TypeTag) -> Result<&dyn ArrayResolver, SyncError> {
        match self.resolver(tag)? {
            ResolverRef::Array(resolver) => Ok(resolver),
            other => Err(SyncError::ResolverKindMismatch {
                tag: tag.clone(),
                expected: "an array resolver",
                actual: other.kind_name(),
            }),
        }
    }

    /// Looks up the resolver for a value-object tag.
    pub fn value_resolver(&self, tag: &str) -> Option<&dyn ValueResolver> {
        self.values.get(tag).map(|resolver| resolver.as_ref())
    }

    /// Returns true if `tag` names a registered value-object type.
    pub fn is_value_type(&self, tag: &str) -> bool {
        self.values.contains_key(tag)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
