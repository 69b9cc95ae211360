//! Reconstruction of local values from remote change events.

use tracing::debug;

use super::{Links, marks::Marks, materialize::materialize, materialize::materialize_content};
use crate::{
    Result,
    doc::{ChangeAction, ChangeEvent, ChangeKey, Document, NodeId, NodeKind, NodeRef},
    registry::{ArrayDiff, ObjectDiff, Registry, patch_array, patch_object},
    value::{TYPE_TAG_KEY, TypeTag, Value},
};

/// Rebuilds `prior` after `events` were applied to `doc`.
///
/// Only values whose nodes changed, and their ancestors, are rebuilt; every
/// other subtree of the result is the same instance as in `prior`. Rebuilt
/// values are linked to the node their predecessor was linked to. Links are
/// staged while rebuilding and only written to `links` once the whole pass
/// succeeded.
pub fn reconstruct(
    doc: &Document,
    prior: &Value,
    events: &[ChangeEvent],
    registry: &Registry,
    links: &mut Links,
) -> Result<Value> {
    let mut marks = Marks::new();
    for event in events {
        marks.invalidate(doc, links, &event.target, Some(event));
    }
    if !marks.is_dirty(prior) {
        debug!(events = events.len(), "No linked value affected by events");
        return Ok(prior.clone());
    }

    let dirty = marks.dirty_count();
    let mut rebuilder = Rebuilder {
        doc,
        registry,
        links,
        staged: Links::new(),
        marks: &marks,
    };
    let rebuilt = rebuilder.rebuild(prior)?;
    let staged = rebuilder.staged;
    links.merge(staged);
    debug!(events = events.len(), dirty, "Reconstructed state");
    Ok(rebuilt)
}

struct Rebuilder<'a, 'e> {
    doc: &'a Document,
    registry: &'a Registry,
    /// Links as of before the pass
    links: &'a Links,
    /// Links of values built during the pass
    staged: Links,
    marks: &'a Marks<'e>,
}

impl Rebuilder<'_, '_> {
    fn rebuild(&mut self, value: &Value) -> Result<Value> {
        if !self.marks.is_dirty(value) {
            return Ok(value.clone());
        }
        let node = self.links.node_of(value).cloned();
        let event = self.marks.event(value);

        let mut result = self.rebuild_children(value)?;
        if let (Some(node), Some(event)) = (&node, event) {
            result = self.apply_event(&result, node, event)?;
        }
        if let Some(node) = &node {
            self.staged.link(node, &result);
        }
        Ok(result)
    }

    /// Substitutes rebuilt children for dirty ones.
    fn rebuild_children(&mut self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::List(list) => {
                let mut builder = list.mutate();
                for (index, item) in list.iter().enumerate() {
                    if self.marks.is_dirty(item) {
                        builder.set(index, self.rebuild(item)?);
                    }
                }
                Value::List(builder.finish())
            }
            Value::Array(array) => {
                let mut builder = array.mutate();
                for (index, item) in array.iter().enumerate() {
                    if self.marks.is_dirty(item) {
                        builder.set(index, self.rebuild(item)?);
                    }
                }
                Value::Array(builder.finish())
            }
            Value::Map(map) => {
                let mut builder = map.mutate();
                for (key, item) in map {
                    if self.marks.is_dirty(item) {
                        builder.set(key.clone(), self.rebuild(item)?);
                    }
                }
                Value::Map(builder.finish())
            }
            Value::Object(object) => {
                let mut builder = object.mutate();
                for (key, item) in object {
                    if self.marks.is_dirty(item) {
                        builder.set(key.clone(), self.rebuild(item)?);
                    }
                }
                Value::Object(builder.finish())
            }
            Value::Entity(entity) => {
                let mut builder = entity.mutate();
                for (key, item) in entity {
                    if self.marks.is_dirty(item) {
                        builder.set(key.clone(), self.rebuild(item)?);
                    }
                }
                Value::Entity(builder.finish())
            }
            _ => value.clone(),
        })
    }

    /// Translates an event into diffs and applies them to `value`.
    fn apply_event(&mut self, value: &Value, node: &NodeId, event: &ChangeEvent) -> Result<Value> {
        let doc = self.doc;
        let Some(view) = doc.node(node) else {
            return Ok(value.clone());
        };
        let tag = view.type_tag().map(TypeTag::parse);

        if !matches_node(value, &view, tag.as_ref()) || touches_tag(event, &view, tag.is_some()) {
            debug!(node = %node, "Type changed, rebuilding node");
            return materialize(doc, node, self.registry, &mut self.staged);
        }

        match view.kind() {
            NodeKind::Keyed => {
                let mut diffs = Vec::with_capacity(event.changes.len());
                for change in &event.changes {
                    let ChangeKey::Key(key) = &change.key else {
                        continue;
                    };
                    match change.action {
                        ChangeAction::Add | ChangeAction::Update => {
                            let Some(content) = view.get(key) else {
                                continue;
                            };
                            let child =
                                materialize_content(doc, content, self.registry, &mut self.staged)?;
                            diffs.push(ObjectDiff::Set {
                                key: key.clone(),
                                value: child,
                            });
                        }
                        ChangeAction::Delete => diffs.push(ObjectDiff::Remove { key: key.clone() }),
                    }
                }
                match (&tag, value) {
                    (Some(tag), _) => self
                        .registry
                        .object_resolver(tag)?
                        .apply_patch(value, diffs),
                    (None, Value::Object(object)) => Ok(Value::Object(patch_object(object, diffs))),
                    (None, _) => Ok(value.clone()),
                }
            }
            NodeKind::Ordered => {
                let offset = usize::from(tag.is_some());
                let mut diffs = Vec::with_capacity(event.changes.len());
                for change in &event.changes {
                    let ChangeKey::Index(position) = change.key else {
                        continue;
                    };
                    let Some(index) = position.checked_sub(offset) else {
                        continue;
                    };
                    match change.action {
                        ChangeAction::Add | ChangeAction::Update => {
                            let Some(content) = view.get_index(position) else {
                                continue;
                            };
                            let child =
                                materialize_content(doc, content, self.registry, &mut self.staged)?;
                            diffs.push(match change.action {
                                ChangeAction::Add => ArrayDiff::Insert { index, value: child },
                                _ => ArrayDiff::Set { index, value: child },
                            });
                        }
                        ChangeAction::Delete => diffs.push(ArrayDiff::Delete { index }),
                    }
                }
                match (&tag, value) {
                    (Some(tag), _) => self
                        .registry
                        .array_resolver(tag)?
                        .apply_patch(value, diffs),
                    (None, Value::Array(array)) => Ok(Value::Array(patch_array(array, diffs))),
                    (None, _) => Ok(value.clone()),
                }
            }
        }
    }
}

/// Returns true if `value` has the shape and tag of `view`.
fn matches_node(value: &Value, view: &NodeRef<'_>, tag: Option<&TypeTag>) -> bool {
    match tag {
        Some(tag) => value.type_tag().as_ref() == Some(tag),
        None => matches!(
            (value, view.kind()),
            (Value::Object(_), NodeKind::Keyed) | (Value::Array(_), NodeKind::Ordered)
        ),
    }
}

/// Returns true if the event rewrote the slot holding the node's tag.
fn touches_tag(event: &ChangeEvent, view: &NodeRef<'_>, tagged: bool) -> bool {
    event.changes.iter().any(|change| match (&change.key, view.kind()) {
        (ChangeKey::Key(key), NodeKind::Keyed) => key == TYPE_TAG_KEY,
        (ChangeKey::Index(0), NodeKind::Ordered) => tagged,
        _ => false,
    })
}
