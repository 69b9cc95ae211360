//! Building values from document content.

use super::{Links, SyncError};
use crate::{
    Result,
    doc::{Content, DocError, Document, NodeId},
    registry::{RawArray, RawObject, Registry},
    value::{Array, Object, TYPE_TAG_KEY, TypeTag, Value},
};

/// Builds a fresh value from the subtree rooted at `node`.
///
/// Tagged nodes are created through their resolver; untagged nodes become
/// plain [`Object`] or [`Array`] values. Every node visited is linked to the
/// value built for it.
pub fn materialize(
    doc: &Document,
    node: &NodeId,
    registry: &Registry,
    links: &mut Links,
) -> Result<Value> {
    let view = doc
        .node(node)
        .ok_or_else(|| DocError::NodeNotFound { node: node.clone() })?;
    let tag = view.type_tag().map(TypeTag::parse);

    let value = if let Some(entries) = view.entries() {
        let mut raw = RawObject::with_capacity(entries.len());
        for (key, content) in entries {
            if tag.is_some() && key == TYPE_TAG_KEY {
                continue;
            }
            raw.insert(key.clone(), materialize_content(doc, content, registry, links)?);
        }
        match &tag {
            Some(tag) => registry.object_resolver(tag)?.create(raw, registry.ids())?,
            None => Value::Object(Object::from_map(raw)),
        }
    } else {
        let items = view.items().unwrap_or_default();
        let skip = usize::from(tag.is_some()).min(items.len());
        let mut raw = RawArray::with_capacity(items.len() - skip);
        for content in &items[skip..] {
            raw.push(materialize_content(doc, content, registry, links)?);
        }
        match &tag {
            Some(tag) => registry.array_resolver(tag)?.create(raw, registry.ids())?,
            None => Value::Array(Array::from_vec(raw)),
        }
    };

    links.link(node, &value);
    Ok(value)
}

/// Builds a value from one slot.
pub(crate) fn materialize_content(
    doc: &Document,
    content: &Content,
    registry: &Registry,
    links: &mut Links,
) -> Result<Value> {
    match content {
        Content::Node(node) => materialize(doc, node, registry, links),
        Content::Leaf(json) => leaf_value(json, registry),
    }
}

/// Converts a JSON leaf, routing tagged objects to their value resolver.
pub(crate) fn leaf_value(json: &serde_json::Value, registry: &Registry) -> Result<Value> {
    if let serde_json::Value::Object(fields) = json
        && let Some(tag) = fields.get(TYPE_TAG_KEY).and_then(|t| t.as_str())
    {
        let resolver = registry
            .value_resolver(tag)
            .ok_or_else(|| SyncError::UnknownType {
                tag: TypeTag::parse(tag),
            })?;
        return resolver.from_transport(fields);
    }
    Ok(Value::from_json(json))
}
