//! Backreference table between document nodes and values.

use std::collections::HashMap;

use tracing::trace;

use crate::{
    doc::{Document, NodeId},
    value::{Value, WeakValue},
};

#[derive(Debug, Clone)]
struct Entry {
    key: usize,
    value: WeakValue,
}

/// Weak bidirectional association `NodeId ⇄ Value`.
///
/// Values are referenced weakly: a link never keeps a value alive, and a
/// link whose value has been dropped reads as absent. Linking either side
/// replaces any association it had before.
#[derive(Debug, Default, Clone)]
pub struct Links {
    by_node: HashMap<NodeId, Entry>,
    by_value: HashMap<usize, NodeId>,
}

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `node` with `value`. Scalars and value-objects are ignored.
    pub fn link(&mut self, node: &NodeId, value: &Value) {
        let (Some(key), Some(weak)) = (value.container_key(), value.downgrade()) else {
            return;
        };
        if let Some(old) = self.by_node.remove(node)
            && self.by_value.get(&old.key) == Some(node)
        {
            self.by_value.remove(&old.key);
        }
        if let Some(old_node) = self.by_value.insert(key, node.clone())
            && &old_node != node
        {
            self.by_node.remove(&old_node);
        }
        self.by_node.insert(node.clone(), Entry { key, value: weak });
        trace!(node = %node, kind = value.kind_name(), "Linked node");
    }

    /// Returns the live value linked to `node`.
    pub fn source_of(&self, node: &NodeId) -> Option<Value> {
        self.by_node.get(node)?.value.upgrade()
    }

    /// Returns the node linked to `value`.
    pub fn node_of(&self, value: &Value) -> Option<&NodeId> {
        let node = self.by_value.get(&value.container_key()?)?;
        let entry = self.by_node.get(node)?;
        entry.value.is_alive().then_some(node)
    }

    /// Moves every live link of `staged` into this table.
    pub fn merge(&mut self, staged: Links) {
        for (node, entry) in staged.by_node {
            if let Some(value) = entry.value.upgrade() {
                self.link(&node, &value);
            }
        }
    }

    /// Removes links whose value was dropped or whose node left `doc`.
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.by_node.len();
        let by_value = &mut self.by_value;
        self.by_node.retain(|node, entry| {
            let keep = entry.value.is_alive() && doc.contains(node);
            if !keep {
                by_value.remove(&entry.key);
            }
            keep
        });
        before - self.by_node.len()
    }

    /// Number of linked nodes, including links not yet pruned.
    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}
