//! Per-pass dirty marks for reconstruction.

use std::collections::HashMap;

use crate::{
    doc::{ChangeEvent, Document, NodeId},
    value::Value,
};

use super::Links;

#[derive(Debug, Default)]
struct Mark<'e> {
    dirty: bool,
    event: Option<&'e ChangeEvent>,
}

/// Dirty flags and attached events for one reconstruction pass.
///
/// Keyed by container identity. Dropped at the end of the pass.
#[derive(Debug, Default)]
pub(crate) struct Marks<'e> {
    marks: HashMap<usize, Mark<'e>>,
}

impl<'e> Marks<'e> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Attaches `event` to the value linked to its target and marks that
    /// value and its ancestors dirty.
    ///
    /// The upward walk stops at the first ancestor already dirty or without a
    /// linked value.
    pub(crate) fn invalidate(
        &mut self,
        doc: &Document,
        links: &Links,
        node: &NodeId,
        event: Option<&'e ChangeEvent>,
    ) {
        let mut current = Some(node.clone());
        let mut event = event;
        while let Some(node) = current.take() {
            let Some(key) = links.source_of(&node).and_then(|v| v.container_key()) else {
                return;
            };
            let mark = self.marks.entry(key).or_default();
            if let Some(event) = event.take() {
                mark.event = Some(event);
            }
            if mark.dirty {
                return;
            }
            mark.dirty = true;
            current = doc.node(&node).and_then(|n| n.parent().cloned());
        }
    }

    pub(crate) fn is_dirty(&self, value: &Value) -> bool {
        value
            .container_key()
            .and_then(|key| self.marks.get(&key))
            .is_some_and(|mark| mark.dirty)
    }

    pub(crate) fn event(&self, value: &Value) -> Option<&'e ChangeEvent> {
        self.marks.get(&value.container_key()?)?.event
    }

    pub(crate) fn dirty_count(&self) -> usize {
        self.marks.values().filter(|mark| mark.dirty).count()
    }
}
