//! Change events and commits produced by document transactions.

use serde::Serialize;
use yrs::{
    TransactionMut,
    types::{Change as Delta, EntryChange, Event, Events},
};

use super::{NodeId, arena::branch_id, update::Update};

/// Who issued a transaction.
///
/// Local transactions are written by this peer's own projection; remote
/// transactions replay updates received from other peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    /// Origin label attached to the underlying document transaction.
    pub(crate) fn tag(self) -> &'static str {
        match self {
            Origin::Local => "treebind:local",
            Origin::Remote => "treebind:remote",
        }
    }
}

/// Address of a changed slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChangeKey {
    Key(String),
    Index(usize),
}

/// What happened to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeAction {
    Add,
    Update,
    Delete,
}

/// One slot change of a [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub key: ChangeKey,
    pub action: ChangeAction,
}

impl Change {
    pub fn key(key: impl Into<String>, action: ChangeAction) -> Self {
        Self {
            key: ChangeKey::Key(key.into()),
            action,
        }
    }

    pub fn index(index: usize, action: ChangeAction) -> Self {
        Self {
            key: ChangeKey::Index(index),
            action,
        }
    }
}

/// Everything that changed at one node during one transaction.
///
/// Keyed changes are sorted by key. Ordered changes are sequential: applying
/// them in order to the node's old slots, reading added content from the
/// node's current slots at the same index, reproduces the current slots.
/// Ordered nodes never report [`ChangeAction::Update`]; a replaced slot shows
/// up as a delete and an add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub target: NodeId,
    pub changes: Vec<Change>,
}

/// Result of one committed transaction.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Origin the transaction was opened with
    pub origin: Origin,
    /// One event per pre-existing node whose content changed
    pub events: Vec<ChangeEvent>,
    /// Encoded changes to replicate to other peers
    pub update: Update,
}

impl Commit {
    /// Returns true if the transaction changed nothing.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.update.is_empty()
    }

    /// Returns true if the transaction was issued by this peer.
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    /// Returns the event targeting `node`, if any.
    pub fn event_for(&self, node: &NodeId) -> Option<&ChangeEvent> {
        self.events.iter().find(|event| &event.target == node)
    }
}

/// Change list captured from a deep observer callback.
///
/// `branch` is the block id of the changed shared type, `None` for the
/// top-level container holding the roots.
#[derive(Debug, Clone)]
pub(crate) struct RawEvent {
    pub(crate) branch: Option<NodeId>,
    pub(crate) changes: Vec<Change>,
}

pub(crate) fn capture(txn: &TransactionMut, events: &Events) -> Vec<RawEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Map(map) => Some(RawEvent {
                branch: branch_id(map.target()),
                changes: keyed_changes(map.keys(txn).iter().map(|(key, change)| {
                    (key.to_string(), change)
                })),
            }),
            Event::Array(array) => Some(RawEvent {
                branch: branch_id(array.target()),
                changes: ordered_changes(array.delta(txn)),
            }),
            _ => None,
        })
        .collect()
}

fn keyed_changes<'a>(entries: impl Iterator<Item = (String, &'a EntryChange)>) -> Vec<Change> {
    let mut changes: Vec<Change> = entries
        .map(|(key, change)| {
            let action = match change {
                EntryChange::Inserted(_) => ChangeAction::Add,
                EntryChange::Updated(..) => ChangeAction::Update,
                EntryChange::Removed(_) => ChangeAction::Delete,
            };
            Change::key(key, action)
        })
        .collect();
    changes.sort_by(|a, b| a.key.cmp(&b.key));
    changes
}

/// Flattens a sequence delta into per-slot changes.
///
/// The cursor tracks the index in the node's current slots; removals happen
/// at the cursor without advancing it.
fn ordered_changes(delta: &[Delta]) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut cursor = 0usize;
    for step in delta {
        match step {
            Delta::Retain(n) => cursor += *n as usize,
            Delta::Added(items) => {
                for _ in items {
                    changes.push(Change::index(cursor, ChangeAction::Add));
                    cursor += 1;
                }
            }
            Delta::Removed(n) => {
                changes.extend((0..*n).map(|_| Change::index(cursor, ChangeAction::Delete)));
            }
        }
    }
    changes
}
