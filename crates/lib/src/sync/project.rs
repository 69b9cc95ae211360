//! Projection of local values onto the document.

use tracing::{debug, trace};

use super::{Links, SyncError};
use crate::{
    Result,
    doc::{Content, DocError, NodeId, NodeKind, Transaction, sentinel},
    registry::{Registry, ResolverRef, SyncStrategy},
    value::{TYPE_TAG_KEY, TypeTag, Value},
};

/// Writes `current` into `target`, given the value last written there.
///
/// With no `previous` the node's content is replaced by a full serialization
/// of `current`. Otherwise the node is diffed structurally when `current` and
/// `previous` are the same instance and the node's tag matches both, and
/// replaced when they are not. Reference-equal values write nothing.
///
/// Every node written or diffed is linked to the value now stored in it.
pub fn project(
    txn: &mut Transaction<'_>,
    current: &Value,
    previous: Option<&Value>,
    target: &NodeId,
    registry: &Registry,
    links: &mut Links,
) -> Result<()> {
    Projector { registry, links }.project(txn, current, previous, target)
}

/// Creates or reuses the root `name` and fills it with `value`.
pub fn init_root(
    txn: &mut Transaction<'_>,
    name: &str,
    value: &Value,
    registry: &Registry,
    links: &mut Links,
) -> Result<NodeId> {
    let mut projector = Projector { registry, links };
    let Slot::Node(kind) = projector.classify(value)? else {
        return Err(SyncError::RootNotContainer {
            found: value.kind_name(),
        }
        .into());
    };
    let root = txn.root(name, kind)?;
    projector.project(txn, value, None, &root)?;
    Ok(root)
}

/// How a value is stored in a document slot.
enum Slot {
    Leaf(serde_json::Value),
    Node(NodeKind),
}

struct Projector<'a> {
    registry: &'a Registry,
    links: &'a mut Links,
}

impl Projector<'_> {
    fn project(
        &mut self,
        txn: &mut Transaction<'_>,
        current: &Value,
        previous: Option<&Value>,
        target: &NodeId,
    ) -> Result<()> {
        let Some(previous) = previous else {
            return self.replace(txn, target, current);
        };
        if current.is_same(previous) {
            trace!(node = %target, "Value unchanged");
            return Ok(());
        }
        if self.diff(txn, target, current, previous)? {
            return Ok(());
        }
        debug!(node = %target, kind = current.kind_name(), "Replacing node content");
        self.replace(txn, target, current)
    }

    fn classify(&self, value: &Value) -> Result<Slot> {
        Ok(match value {
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::String(_) => Slot::Leaf(value.to_json()),
            Value::Opaque(opaque) => {
                let tag = opaque.type_tag();
                let resolver =
                    self.registry
                        .value_resolver(tag)
                        .ok_or_else(|| SyncError::UnknownType {
                            tag: TypeTag::parse(tag),
                        })?;
                let mut fields = resolver.to_transport(value)?;
                fields.insert(
                    TYPE_TAG_KEY.to_string(),
                    serde_json::Value::String(tag.to_string()),
                );
                Slot::Leaf(serde_json::Value::Object(fields))
            }
            Value::Array(_) => Slot::Node(NodeKind::Ordered),
            Value::Object(_) => Slot::Node(NodeKind::Keyed),
            Value::List(_) | Value::Map(_) | Value::Set(_) | Value::Entity(_) => {
                let tag = tag_of(value)?;
                Slot::Node(self.registry.resolver(&tag)?.node_kind())
            }
        })
    }

    /// Replaces the whole content of an existing node.
    fn replace(&mut self, txn: &mut Transaction<'_>, node: &NodeId, value: &Value) -> Result<()> {
        let Slot::Node(kind) = self.classify(value)? else {
            return Err(SyncError::RootNotContainer {
                found: value.kind_name(),
            }
            .into());
        };
        let actual = txn
            .node(node)
            .ok_or_else(|| DocError::NodeNotFound { node: node.clone() })?
            .kind();
        if actual != kind {
            return Err(SyncError::RootShapeMismatch { node: node.clone() }.into());
        }
        txn.clear(node)?;
        self.fill(txn, node, value)
    }

    /// Serializes a container into an empty node of the matching kind.
    fn fill(&mut self, txn: &mut Transaction<'_>, node: &NodeId, value: &Value) -> Result<()> {
        match value {
            Value::Array(array) => {
                for item in array {
                    self.push(txn, node, item)?;
                }
            }
            Value::Object(object) => {
                for (key, item) in object {
                    self.write_key(txn, node, key, item)?;
                }
            }
            _ => {
                let tag = tag_of(value)?;
                match self.registry.resolver(&tag)? {
                    ResolverRef::Object(resolver) => {
                        txn.set_leaf(
                            node,
                            TYPE_TAG_KEY,
                            serde_json::Value::String(tag.to_string()),
                        )?;
                        for (key, item) in &resolver.to_transport_shape(value)? {
                            self.write_key(txn, node, key, item)?;
                        }
                    }
                    ResolverRef::Array(resolver) => {
                        txn.push_leaf(node, sentinel(tag.as_str()))?;
                        for item in &resolver.to_transport_shape(value)? {
                            self.push(txn, node, item)?;
                        }
                    }
                }
            }
        }
        self.links.link(node, value);
        Ok(())
    }

    fn write_key(
        &mut self,
        txn: &mut Transaction<'_>,
        node: &NodeId,
        key: &str,
        value: &Value,
    ) -> Result<()> {
        match self.classify(value)? {
            Slot::Leaf(json) => txn.set_leaf(node, key, json)?,
            Slot::Node(kind) => {
                let child = txn.set_node(node, key, kind)?;
                self.fill(txn, &child, value)?;
            }
        }
        Ok(())
    }

    fn insert_at(
        &mut self,
        txn: &mut Transaction<'_>,
        node: &NodeId,
        index: usize,
        value: &Value,
    ) -> Result<()> {
        let len = txn.node(node).map_or(0, |n| n.len());
        let index = index.min(len);
        match self.classify(value)? {
            Slot::Leaf(json) => txn.insert_leaf(node, index, json)?,
            Slot::Node(kind) => {
                let child = txn.insert_node(node, index, kind)?;
                self.fill(txn, &child, value)?;
            }
        }
        Ok(())
    }

    fn push(&mut self, txn: &mut Transaction<'_>, node: &NodeId, value: &Value) -> Result<()> {
        self.insert_at(txn, node, usize::MAX, value)
    }

    /// Diffs `node` in place, returning false if it must be replaced instead.
    fn diff(
        &mut self,
        txn: &mut Transaction<'_>,
        node: &NodeId,
        current: &Value,
        previous: &Value,
    ) -> Result<bool> {
        let Some(view) = txn.node(node) else {
            return Ok(false);
        };
        let kind = view.kind();
        let node_tag = view.type_tag().map(TypeTag::parse);

        match node_tag {
            Some(tag) => {
                if !current.same_instance(previous)
                    || current.type_tag().as_ref() != Some(&tag)
                    || previous.type_tag().as_ref() != Some(&tag)
                {
                    return Ok(false);
                }
                match (self.registry.resolver(&tag)?, kind) {
                    (ResolverRef::Object(resolver), NodeKind::Keyed) => {
                        let now = resolver.to_transport_shape(current)?;
                        let before = resolver.to_transport_shape(previous)?;
                        self.diff_keyed(txn, node, &now, &before)?;
                    }
                    (ResolverRef::Array(resolver), NodeKind::Ordered) => {
                        let now = resolver.to_transport_shape(current)?;
                        let before = resolver.to_transport_shape(previous)?;
                        self.diff_ordered(txn, node, &now, &before, 1)?;
                    }
                    _ => return Ok(false),
                }
            }
            None => {
                if self.registry.strategy() != SyncStrategy::Always {
                    return Ok(false);
                }
                match (current, previous, kind) {
                    (Value::Object(now), Value::Object(before), NodeKind::Keyed) => {
                        self.diff_keyed(txn, node, now.entries(), before.entries())?;
                    }
                    (Value::Array(now), Value::Array(before), NodeKind::Ordered) => {
                        self.diff_ordered(txn, node, now.as_slice(), before.as_slice(), 0)?;
                    }
                    _ => return Ok(false),
                }
            }
        }
        self.links.link(node, current);
        Ok(true)
    }

    fn diff_keyed(
        &mut self,
        txn: &mut Transaction<'_>,
        node: &NodeId,
        current: &indexmap::IndexMap<String, Value>,
        previous: &indexmap::IndexMap<String, Value>,
    ) -> Result<()> {
        for (key, value) in current {
            match previous.get(key) {
                None => self.write_key(txn, node, key, value)?,
                Some(old) if old.is_same(value) => {}
                Some(old) => {
                    let child = txn
                        .node(node)
                        .and_then(|n| n.get(key))
                        .and_then(Content::as_node)
                        .cloned();
                    if let Some(child) = child
                        && self.diff(txn, &child, value, old)?
                    {
                        continue;
                    }
                    self.write_key(txn, node, key, value)?;
                }
            }
        }
        for key in previous.keys() {
            if !current.contains_key(key) {
                txn.delete(node, key)?;
            }
        }
        Ok(())
    }

    /// Positional diff; `offset` skips the tag sentinel of tagged nodes.
    fn diff_ordered(
        &mut self,
        txn: &mut Transaction<'_>,
        node: &NodeId,
        current: &[Value],
        previous: &[Value],
        offset: usize,
    ) -> Result<()> {
        let common = current.len().min(previous.len());
        for (i, (value, old)) in current.iter().zip(previous).enumerate() {
            if value.is_same(old) {
                continue;
            }
            let index = i + offset;
            let child = txn
                .node(node)
                .and_then(|n| n.get_index(index))
                .and_then(Content::as_node)
                .cloned();
            if let Some(child) = child
                && self.diff(txn, &child, value, old)?
            {
                continue;
            }
            txn.remove_range(node, index, 1)?;
            self.insert_at(txn, node, index, value)?;
        }
        if current.len() > common {
            for value in &current[common..] {
                self.push(txn, node, value)?;
            }
        } else if previous.len() > common {
            txn.remove_range(node, common + offset, previous.len() - common)?;
        }
        Ok(())
    }
}

fn tag_of(value: &Value) -> Result<TypeTag> {
    value.type_tag().ok_or_else(|| {
        SyncError::UnexpectedValue {
            tag: TypeTag::parse(value.kind_name()),
            found: value.kind_name(),
        }
        .into()
    })
}
