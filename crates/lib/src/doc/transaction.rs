//! Mutation access to a document.

use std::fmt;

use indexmap::IndexMap;
use yrs::{Array as _, ArrayPrelim, ArrayRef, Map as _, MapPrelim, MapRef, TransactionMut};

use super::{
    DocError, NodeId, NodeKind,
    arena::{Arena, Handle, json_to_any},
    event::Origin,
    node::{Body, Content, NodeRef},
    update::Update,
};

/// An open transaction on a [`Document`](super::Document).
///
/// Obtained through [`Document::transact`](super::Document::transact). Every
/// primitive is validated against the node index, written to the replicated
/// document, then mirrored into the index, so reads inside the transaction
/// observe earlier writes.
pub struct Transaction<'doc> {
    txn: TransactionMut<'doc>,
    arena: &'doc mut Arena,
    roots: &'doc MapRef,
    origin: Origin,
    writes: usize,
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("origin", &self.origin)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl<'doc> Transaction<'doc> {
    pub(crate) fn new(
        txn: TransactionMut<'doc>,
        arena: &'doc mut Arena,
        roots: &'doc MapRef,
        origin: Origin,
    ) -> Self {
        Self {
            txn,
            arena,
            roots,
            origin,
            writes: 0,
        }
    }

    /// Origin this transaction was opened with.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Reads a node as of the current point in the transaction.
    pub fn node(&self, id: &NodeId) -> Option<NodeRef<'_>> {
        self.arena
            .nodes
            .get_key_value(id)
            .map(|(id, data)| NodeRef { id, data })
    }

    /// Returns the root named `name`, creating it with `kind` if absent.
    pub fn root(&mut self, name: &str, kind: NodeKind) -> Result<NodeId, DocError> {
        let id = NodeId::root(name);
        if let Some(existing) = self.arena.nodes.get(&id) {
            let actual = existing.body.kind();
            if actual != kind {
                return Err(DocError::RootKindMismatch {
                    name: name.to_string(),
                    expected: kind,
                    actual,
                });
            }
            return Ok(id);
        }
        let handle = match kind {
            NodeKind::Keyed => Handle::Keyed(self.roots.insert(&mut self.txn, name, MapPrelim::default())),
            NodeKind::Ordered => {
                Handle::Ordered(self.roots.insert(&mut self.txn, name, ArrayPrelim::default()))
            }
        };
        let branch = handle
            .branch_id()
            .ok_or_else(|| DocError::RootNotFound { name: name.to_string() })?;
        self.arena.adopt(id.clone(), None, handle, branch);
        self.writes += 1;
        Ok(id)
    }

    /// Stores a JSON leaf under `key` of a keyed node.
    pub fn set_leaf(
        &mut self,
        node: &NodeId,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), DocError> {
        let key = key.into();
        let map = self.map(node)?;
        map.insert(&mut self.txn, key.as_str(), json_to_any(&value));
        let old = self.keyed_mut(node)?.insert(key, Content::Leaf(value));
        self.arena.drop_contents(old);
        self.writes += 1;
        Ok(())
    }

    /// Stores a new empty child node under `key` of a keyed node.
    pub fn set_node(
        &mut self,
        node: &NodeId,
        key: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId, DocError> {
        let key = key.into();
        let map = self.map(node)?;
        let handle = match kind {
            NodeKind::Keyed => Handle::Keyed(map.insert(&mut self.txn, key.as_str(), MapPrelim::default())),
            NodeKind::Ordered => {
                Handle::Ordered(map.insert(&mut self.txn, key.as_str(), ArrayPrelim::default()))
            }
        };
        let id = self.adopt_child(node, handle)?;
        let old = self.keyed_mut(node)?.insert(key, Content::Node(id.clone()));
        self.arena.drop_contents(old);
        self.writes += 1;
        Ok(id)
    }

    /// Deletes `key` from a keyed node, returning whether it was present.
    pub fn delete(&mut self, node: &NodeId, key: &str) -> Result<bool, DocError> {
        let map = self.map(node)?;
        let Some(old) = self.keyed_mut(node)?.shift_remove(key) else {
            return Ok(false);
        };
        map.remove(&mut self.txn, key);
        self.arena.drop_contents([old]);
        self.writes += 1;
        Ok(true)
    }

    /// Inserts a JSON leaf at `index` of an ordered node.
    pub fn insert_leaf(
        &mut self,
        node: &NodeId,
        index: usize,
        value: serde_json::Value,
    ) -> Result<(), DocError> {
        let (array, at) = self.insertion(node, index)?;
        array.insert(&mut self.txn, at, json_to_any(&value));
        self.ordered_mut(node)?.insert(index, Content::Leaf(value));
        self.writes += 1;
        Ok(())
    }

    /// Inserts a new empty child node at `index` of an ordered node.
    pub fn insert_node(
        &mut self,
        node: &NodeId,
        index: usize,
        kind: NodeKind,
    ) -> Result<NodeId, DocError> {
        let (array, at) = self.insertion(node, index)?;
        let handle = match kind {
            NodeKind::Keyed => Handle::Keyed(array.insert(&mut self.txn, at, MapPrelim::default())),
            NodeKind::Ordered => {
                Handle::Ordered(array.insert(&mut self.txn, at, ArrayPrelim::default()))
            }
        };
        let id = self.adopt_child(node, handle)?;
        self.ordered_mut(node)?.insert(index, Content::Node(id.clone()));
        self.writes += 1;
        Ok(id)
    }

    /// Appends a JSON leaf to an ordered node.
    pub fn push_leaf(&mut self, node: &NodeId, value: serde_json::Value) -> Result<(), DocError> {
        let index = self.ordered(node)?.len();
        self.insert_leaf(node, index, value)
    }

    /// Appends a new empty child node to an ordered node.
    pub fn push_node(&mut self, node: &NodeId, kind: NodeKind) -> Result<NodeId, DocError> {
        let index = self.ordered(node)?.len();
        self.insert_node(node, index, kind)
    }

    /// Removes up to `len` slots starting at `index`, returning how many were removed.
    ///
    /// The range is clamped to the node's length.
    pub fn remove_range(
        &mut self,
        node: &NodeId,
        index: usize,
        len: usize,
    ) -> Result<usize, DocError> {
        let array = self.array(node)?;
        let available = self.ordered(node)?.len().saturating_sub(index);
        let len = len.min(available);
        if len == 0 {
            return Ok(0);
        }
        array.remove_range(&mut self.txn, position(node, index)?, position(node, len)?);
        let removed: Vec<Content> = self.ordered_mut(node)?.drain(index..index + len).collect();
        self.arena.drop_contents(removed);
        self.writes += 1;
        Ok(len)
    }

    /// Removes every slot of a node, keeping the node itself.
    pub fn clear(&mut self, node: &NodeId) -> Result<(), DocError> {
        let data = self
            .arena
            .nodes
            .get_mut(node)
            .ok_or_else(|| DocError::NodeNotFound { node: node.clone() })?;
        let removed: Vec<Content> = match &mut data.body {
            Body::Keyed(entries) => entries.drain(..).map(|(_, content)| content).collect(),
            Body::Ordered(items) => items.drain(..).collect(),
        };
        if removed.is_empty() {
            return Ok(());
        }
        match data.handle.clone() {
            Handle::Keyed(map) => map.clear(&mut self.txn),
            Handle::Ordered(array) => {
                array.remove_range(&mut self.txn, 0, position(node, removed.len())?)
            }
        }
        self.arena.drop_contents(removed);
        self.writes += 1;
        Ok(())
    }

    /// Encodes everything written by this transaction.
    pub(crate) fn finish(self) -> Update {
        if self.writes == 0 {
            return Update::default();
        }
        Update::from_bytes(self.txn.encode_update_v1())
    }

    fn adopt_child(&mut self, parent: &NodeId, handle: Handle) -> Result<NodeId, DocError> {
        let id = handle.branch_id().ok_or_else(|| DocError::NodeNotFound {
            node: parent.clone(),
        })?;
        self.arena
            .adopt(id.clone(), Some(parent.clone()), handle, id.clone());
        Ok(id)
    }

    fn map(&self, id: &NodeId) -> Result<MapRef, DocError> {
        match self.arena.nodes.get(id).map(|data| &data.handle) {
            Some(Handle::Keyed(map)) => Ok(map.clone()),
            Some(Handle::Ordered(_)) => Err(DocError::NotKeyed { node: id.clone() }),
            None => Err(DocError::NodeNotFound { node: id.clone() }),
        }
    }

    fn array(&self, id: &NodeId) -> Result<ArrayRef, DocError> {
        match self.arena.nodes.get(id).map(|data| &data.handle) {
            Some(Handle::Ordered(array)) => Ok(array.clone()),
            Some(Handle::Keyed(_)) => Err(DocError::NotOrdered { node: id.clone() }),
            None => Err(DocError::NodeNotFound { node: id.clone() }),
        }
    }

    /// Checks an insertion point and returns the array with the position to write at.
    fn insertion(&self, node: &NodeId, index: usize) -> Result<(ArrayRef, u32), DocError> {
        let array = self.array(node)?;
        let len = self.ordered(node)?.len();
        if index > len {
            return Err(DocError::IndexOutOfBounds {
                node: node.clone(),
                index,
                len,
            });
        }
        Ok((array, position(node, index)?))
    }

    fn ordered(&self, id: &NodeId) -> Result<&Vec<Content>, DocError> {
        match self.arena.nodes.get(id).map(|data| &data.body) {
            Some(Body::Ordered(items)) => Ok(items),
            Some(Body::Keyed(_)) => Err(DocError::NotOrdered { node: id.clone() }),
            None => Err(DocError::NodeNotFound { node: id.clone() }),
        }
    }

    fn keyed_mut(&mut self, id: &NodeId) -> Result<&mut IndexMap<String, Content>, DocError> {
        match self.arena.nodes.get_mut(id).map(|data| &mut data.body) {
            Some(Body::Keyed(entries)) => Ok(entries),
            Some(Body::Ordered(_)) => Err(DocError::NotKeyed { node: id.clone() }),
            None => Err(DocError::NodeNotFound { node: id.clone() }),
        }
    }

    fn ordered_mut(&mut self, id: &NodeId) -> Result<&mut Vec<Content>, DocError> {
        match self.arena.nodes.get_mut(id).map(|data| &mut data.body) {
            Some(Body::Ordered(items)) => Ok(items),
            Some(Body::Keyed(_)) => Err(DocError::NotOrdered { node: id.clone() }),
            None => Err(DocError::NodeNotFound { node: id.clone() }),
        }
    }
}

/// Narrows a slot index to the width used by the replicated document.
fn position(node: &NodeId, index: usize) -> Result<u32, DocError> {
    u32::try_from(index).map_err(|_| DocError::IndexOutOfBounds {
        node: node.clone(),
        index,
        len: u32::MAX as usize,
    })
}
