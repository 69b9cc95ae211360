//! Read index over the replicated document.
//!
//! The [`Arena`] mirrors every map and array reachable from the document's
//! roots as a [`NodeData`] entry keyed by [`NodeId`]. Local transactions keep
//! it current as they write; remote updates refresh the nodes their events
//! name.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use yrs::{
    Any, Array as _, ArrayRef, Map as _, MapRef, Out, ReadTxn,
    branch::{Branch, BranchID},
};

use super::{
    NodeId, NodeKind,
    node::{Body, Content, NodeData},
};

/// Shared type backing one document node.
#[derive(Clone)]
pub(crate) enum Handle {
    Keyed(MapRef),
    Ordered(ArrayRef),
}

impl Handle {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Handle::Keyed(_) => NodeKind::Keyed,
            Handle::Ordered(_) => NodeKind::Ordered,
        }
    }

    /// Block id of the shared type, `None` for top-level types.
    pub(crate) fn branch_id(&self) -> Option<NodeId> {
        match self {
            Handle::Keyed(map) => branch_id(map),
            Handle::Ordered(array) => branch_id(array),
        }
    }

    fn from_out(out: Out) -> Result<Self, Out> {
        match out {
            Out::YMap(map) => Ok(Handle::Keyed(map)),
            Out::YArray(array) => Ok(Handle::Ordered(array)),
            other => Err(other),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.kind())
    }
}

/// Node id derived from the block that introduced a shared type.
pub(crate) fn branch_id<B: AsRef<Branch>>(shared: &B) -> Option<NodeId> {
    match shared.as_ref().id() {
        BranchID::Nested(id) => Some(NodeId::Child {
            client: id.client.into(),
            clock: id.clock,
        }),
        BranchID::Root(_) => None,
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct Arena {
    pub(crate) nodes: HashMap<NodeId, NodeData>,
    /// Root name by block id of the root's shared type
    roots: HashMap<NodeId, String>,
}

impl Arena {
    /// Maps a block id to the node it backs.
    pub(crate) fn resolve(&self, branch: &NodeId) -> Option<NodeId> {
        if let Some(name) = self.roots.get(branch) {
            return Some(NodeId::root(name.as_str()));
        }
        self.nodes.contains_key(branch).then(|| branch.clone())
    }

    /// Registers a freshly created, still empty shared type.
    pub(crate) fn adopt(&mut self, id: NodeId, parent: Option<NodeId>, handle: Handle, branch: NodeId) {
        if let NodeId::Root(name) = &id {
            self.roots.insert(branch.clone(), name.clone());
        }
        self.nodes.insert(
            id,
            NodeData {
                parent,
                body: Body::new(handle.kind()),
                handle,
                branch,
            },
        );
    }

    /// Removes the subtrees rooted at any node slots in `contents`.
    pub(crate) fn drop_contents(&mut self, contents: impl IntoIterator<Item = Content>) {
        for id in contents.into_iter().filter_map(Content::into_node) {
            self.drop_subtree(&id);
        }
    }

    pub(crate) fn drop_subtree(&mut self, id: &NodeId) {
        let mut stack = vec![id.clone()];
        while let Some(id) = stack.pop() {
            let Some(data) = self.nodes.remove(&id) else {
                continue;
            };
            if id.is_root() {
                self.roots.remove(&data.branch);
            }
            stack.extend(data.body.child_ids());
        }
    }

    /// Re-reads the slots of `id`, loading new children and dropping
    /// detached ones.
    pub(crate) fn refresh<T: ReadTxn>(&mut self, txn: &T, id: &NodeId) {
        let Some(handle) = self.nodes.get(id).map(|data| data.handle.clone()) else {
            return;
        };
        let body = self.read_body(txn, id, &handle);
        let Some(data) = self.nodes.get_mut(id) else {
            return;
        };
        let old = std::mem::replace(&mut data.body, body);
        let kept: HashSet<NodeId> = data.body.child_ids().into_iter().collect();
        for child in old.child_ids() {
            if !kept.contains(&child) {
                self.drop_subtree(&child);
            }
        }
    }

    /// Brings the set of roots in line with the top-level container.
    pub(crate) fn refresh_roots<T: ReadTxn>(&mut self, txn: &T, roots: &MapRef) {
        let entries: Vec<(String, Out)> = roots
            .iter(txn)
            .map(|(name, out)| (name.to_string(), out))
            .collect();
        let mut present = HashSet::with_capacity(entries.len());
        for (name, out) in entries {
            let Ok(handle) = Handle::from_out(out) else {
                continue;
            };
            let Some(branch) = handle.branch_id() else {
                continue;
            };
            let id = NodeId::root(name.as_str());
            present.insert(id.clone());
            match self.nodes.get(&id) {
                Some(data) if data.branch == branch => continue,
                Some(_) => self.drop_subtree(&id),
                None => {}
            }
            self.load(txn, id, None, handle, branch);
        }
        let stale: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| id.is_root() && !present.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            self.drop_subtree(&id);
        }
    }

    fn load<T: ReadTxn>(
        &mut self,
        txn: &T,
        id: NodeId,
        parent: Option<NodeId>,
        handle: Handle,
        branch: NodeId,
    ) {
        self.adopt(id.clone(), parent, handle.clone(), branch);
        let body = self.read_body(txn, &id, &handle);
        if let Some(data) = self.nodes.get_mut(&id) {
            data.body = body;
        }
    }

    fn read_body<T: ReadTxn>(&mut self, txn: &T, id: &NodeId, handle: &Handle) -> Body {
        match handle {
            Handle::Keyed(map) => {
                let mut entries: Vec<(String, Out)> =
                    map.iter(txn).map(|(key, out)| (key.to_string(), out)).collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                Body::Keyed(
                    entries
                        .into_iter()
                        .map(|(key, out)| (key, self.content(txn, id, out)))
                        .collect(),
                )
            }
            Handle::Ordered(array) => {
                let items: Vec<Out> = array.iter(txn).collect();
                Body::Ordered(
                    items
                        .into_iter()
                        .map(|out| self.content(txn, id, out))
                        .collect(),
                )
            }
        }
    }

    fn content<T: ReadTxn>(&mut self, txn: &T, parent: &NodeId, out: Out) -> Content {
        let handle = match Handle::from_out(out) {
            Ok(handle) => handle,
            Err(Out::Any(any)) => return Content::Leaf(any_to_json(&any)),
            Err(_) => return Content::Leaf(serde_json::Value::Null),
        };
        let Some(id) = handle.branch_id() else {
            return Content::Leaf(serde_json::Value::Null);
        };
        if !self.nodes.contains_key(&id) {
            self.load(txn, id.clone(), Some(parent.clone()), handle, id.clone());
        }
        Content::Node(id)
    }
}

/// Converts a JSON leaf to its replicated representation.
///
/// Integers are stored as 64-bit integers so they read back as integers.
pub(crate) fn json_to_any(value: &serde_json::Value) -> Any {
    match value {
        serde_json::Value::Null => Any::Null,
        serde_json::Value::Bool(b) => Any::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Any::BigInt(i),
            None => Any::Number(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Any::String(Arc::from(s.as_str())),
        serde_json::Value::Array(items) => Any::Array(items.iter().map(json_to_any).collect()),
        serde_json::Value::Object(fields) => Any::Map(Arc::new(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), json_to_any(value)))
                .collect(),
        )),
    }
}

pub(crate) fn any_to_json(any: &Any) -> serde_json::Value {
    match any {
        Any::Null | Any::Undefined => serde_json::Value::Null,
        Any::Bool(b) => serde_json::Value::Bool(*b),
        Any::Number(f) => serde_json::Number::from_f64(*f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Any::BigInt(i) => serde_json::Value::from(*i),
        Any::String(s) => serde_json::Value::String(s.to_string()),
        Any::Buffer(bytes) => bytes.iter().copied().collect(),
        Any::Array(items) => items.iter().map(any_to_json).collect(),
        Any::Map(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), any_to_json(value)))
                .collect(),
        ),
    }
}
