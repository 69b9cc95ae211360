//! Document node storage and read access.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::arena::Handle;
use crate::value::TYPE_TAG_KEY;

/// Stable handle of a document node.
///
/// Roots are addressed by name. Every other node is named by the id of the
/// block that introduced it: the creating client and that client's clock at
/// creation time. Every replica derives the same id for the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeId {
    /// Named top-level node
    Root(String),
    /// Node created inside a transaction
    Child { client: u64, clock: u32 },
}

impl NodeId {
    /// Returns the id of the root named `name`.
    pub fn root(name: impl Into<String>) -> Self {
        NodeId::Root(name.into())
    }

    /// Returns true for root ids.
    pub fn is_root(&self) -> bool {
        matches!(self, NodeId::Root(_))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Root(name) => write!(f, "root:{name}"),
            NodeId::Child { client, clock } => write!(f, "{client}:{clock}"),
        }
    }
}

/// Shape of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// String-keyed slots
    Keyed,
    /// Index-addressed slots
    Ordered,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Keyed => f.write_str("keyed"),
            NodeKind::Ordered => f.write_str("ordered"),
        }
    }
}

/// Content of a node slot: a JSON leaf or a child node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Content {
    Leaf(serde_json::Value),
    Node(NodeId),
}

impl Content {
    /// Returns the leaf value, if this slot holds one.
    pub fn as_leaf(&self) -> Option<&serde_json::Value> {
        match self {
            Content::Leaf(value) => Some(value),
            Content::Node(_) => None,
        }
    }

    /// Returns the child id, if this slot holds a node.
    pub fn as_node(&self) -> Option<&NodeId> {
        match self {
            Content::Node(id) => Some(id),
            Content::Leaf(_) => None,
        }
    }

    pub(crate) fn into_node(self) -> Option<NodeId> {
        match self {
            Content::Node(id) => Some(id),
            Content::Leaf(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Keyed(IndexMap<String, Content>),
    Ordered(Vec<Content>),
}

impl Body {
    pub(crate) fn new(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Keyed => Body::Keyed(IndexMap::new()),
            NodeKind::Ordered => Body::Ordered(Vec::new()),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Body::Keyed(_) => NodeKind::Keyed,
            Body::Ordered(_) => NodeKind::Ordered,
        }
    }

    pub(crate) fn child_ids(&self) -> Vec<NodeId> {
        let slots: Box<dyn Iterator<Item = &Content>> = match self {
            Body::Keyed(entries) => Box::new(entries.values()),
            Body::Ordered(items) => Box::new(items.iter()),
        };
        slots.filter_map(|c| c.as_node().cloned()).collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) parent: Option<NodeId>,
    pub(crate) body: Body,
    /// Shared type holding this node in the replicated document
    pub(crate) handle: Handle,
    /// Block id of the shared type; differs from the node id only for roots
    pub(crate) branch: NodeId,
}

/// Read-only view of one document node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub(crate) id: &'a NodeId,
    pub(crate) data: &'a NodeData,
}

impl<'a> NodeRef<'a> {
    /// Returns the node id.
    pub fn id(&self) -> &'a NodeId {
        self.id
    }

    /// Returns the node shape.
    pub fn kind(&self) -> NodeKind {
        self.data.body.kind()
    }

    /// Returns the parent node, `None` for roots.
    pub fn parent(&self) -> Option<&'a NodeId> {
        self.data.parent.as_ref()
    }

    /// Number of slots, including the tag slot of tagged nodes.
    pub fn len(&self) -> usize {
        match &self.data.body {
            Body::Keyed(entries) => entries.len(),
            Body::Ordered(items) => items.len(),
        }
    }

    /// Returns true if the node has no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the slot under `key` of a keyed node.
    pub fn get(&self, key: &str) -> Option<&'a Content> {
        self.entries()?.get(key)
    }

    /// Returns the slot at `index` of an ordered node.
    pub fn get_index(&self, index: usize) -> Option<&'a Content> {
        self.items()?.get(index)
    }

    /// Returns the slots of a keyed node.
    pub fn entries(&self) -> Option<&'a IndexMap<String, Content>> {
        match &self.data.body {
            Body::Keyed(entries) => Some(entries),
            Body::Ordered(_) => None,
        }
    }

    /// Returns the slots of an ordered node.
    pub fn items(&self) -> Option<&'a [Content]> {
        match &self.data.body {
            Body::Ordered(items) => Some(items),
            Body::Keyed(_) => None,
        }
    }

    /// Returns the type tag stored on the node, if any.
    ///
    /// Keyed nodes store it under [`TYPE_TAG_KEY`]; ordered nodes in a
    /// sentinel leaf at index 0.
    pub fn type_tag(&self) -> Option<&'a str> {
        match &self.data.body {
            Body::Keyed(entries) => entries.get(TYPE_TAG_KEY)?.as_leaf()?.as_str(),
            Body::Ordered(items) => tag_of_sentinel(items.first()?),
        }
    }
}

/// Reads the tag out of an ordered node's sentinel slot.
fn tag_of_sentinel(content: &Content) -> Option<&str> {
    let object = content.as_leaf()?.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get(TYPE_TAG_KEY)?.as_str()
}

/// Builds the sentinel leaf marking an ordered node with `tag`.
pub(crate) fn sentinel(tag: &str) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    object.insert(
        TYPE_TAG_KEY.to_string(),
        serde_json::Value::String(tag.to_string()),
    );
    serde_json::Value::Object(object)
}
