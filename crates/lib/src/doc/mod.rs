//! Replicated document tree.
//!
//! A [`Document`] wraps a yrs document whose roots live in one top-level map.
//! Keyed nodes are yrs maps and ordered nodes are yrs arrays; both are
//! addressed by stable [`NodeId`] handles derived from the block that created
//! them, so every replica names a node the same way. A side index mirrors the
//! tree for reads and records each node's parent, so the tree can be walked
//! upward without owning back-pointers.
//!
//! All local mutation happens inside [`Document::transact`]. A transaction
//! yields a [`Commit`] carrying the [`Origin`] it was opened with, one
//! [`ChangeEvent`] per changed pre-existing node, and an [`Update`] that
//! merges the same changes into another replica through
//! [`Document::apply_update`]. Concurrent updates converge: replicas that have
//! seen the same updates hold the same tree in any delivery order.
//!
//! # Usage
//!
//! ```
//! use treebind::doc::{Document, NodeKind, Origin};
//! use serde_json::json;
//!
//! let mut local = Document::new();
//! let (_, commit) = local
//!     .transact(Origin::Local, |txn| {
//!         let root = txn.root("state", NodeKind::Keyed)?;
//!         txn.set_leaf(&root, "title", json!("Groceries"))
//!     })
//!     .unwrap();
//!
//! let mut peer = Document::new();
//! peer.apply_update(&commit.update).unwrap();
//! assert_eq!(peer.to_json(&"state".into()), Some(json!({"title": "Groceries"})));
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use tracing::{debug, error};
use yrs::{
    DeepObservable, MapRef, ReadTxn, StateVector, Subscription, Transact,
    updates::{decoder::Decode, encoder::Encode},
};

mod arena;
pub mod errors;
pub mod event;
mod node;
mod transaction;
pub mod update;

pub use errors::DocError;
pub use event::{Change, ChangeAction, ChangeEvent, ChangeKey, Commit, Origin};
pub use node::{Content, NodeId, NodeKind, NodeRef};
pub(crate) use node::sentinel;
pub use transaction::Transaction;
pub use update::Update;

use arena::Arena;
use event::{RawEvent, capture};
use node::Body;

/// Name of the top-level map holding every root.
const ROOTS: &str = "roots";

/// The yrs document with its deep observer.
struct Replica {
    doc: yrs::Doc,
    roots: MapRef,
    pending: Arc<Mutex<Vec<RawEvent>>>,
    _events: Subscription,
}

impl Replica {
    fn open(client_id: u64) -> Self {
        let doc = yrs::Doc::with_client_id(client_id.into());
        let roots = doc.get_or_insert_map(ROOTS);
        let pending = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&pending);
        let events = roots.observe_deep(move |txn, events| {
            if let Ok(mut sink) = sink.lock() {
                sink.extend(capture(txn, events));
            }
        });
        Self {
            doc,
            roots,
            pending,
            _events: events,
        }
    }

    /// Takes the events captured since the last call.
    fn drain(&self) -> Vec<RawEvent> {
        self.pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }
}

/// A replicated document tree.
pub struct Document {
    client_id: u64,
    replica: Replica,
    arena: Arena,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("client_id", &self.client_id)
            .field("nodes", &self.arena.nodes.len())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Creates an empty document with a random client id.
    pub fn new() -> Self {
        Self::with_client_id(u64::from(rand::random::<u32>()))
    }

    /// Creates an empty document with an explicit client id.
    ///
    /// Replicas exchanging updates must use distinct client ids.
    pub fn with_client_id(client_id: u64) -> Self {
        Self {
            client_id,
            replica: Replica::open(client_id),
            arena: Arena::default(),
        }
    }

    /// Returns the id used for nodes created by this replica.
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Number of nodes, roots included.
    pub fn node_count(&self) -> usize {
        self.arena.nodes.len()
    }

    /// Returns true if a node with this id exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.arena.nodes.contains_key(id)
    }

    /// Reads a node.
    pub fn node(&self, id: &NodeId) -> Option<NodeRef<'_>> {
        self.arena
            .nodes
            .get_key_value(id)
            .map(|(id, data)| NodeRef { id, data })
    }

    /// Reads the root named `name`.
    pub fn root(&self, name: &str) -> Option<NodeRef<'_>> {
        self.node(&NodeId::root(name))
    }

    /// Runs `f` inside a transaction.
    ///
    /// On success the transaction commits and its [`Commit`] is returned with
    /// the closure's value. If `f` fails, the document is restored to its
    /// state before the transaction and no commit is produced.
    pub fn transact<T, E>(
        &mut self,
        origin: Origin,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<(T, Commit), E> {
        let snapshot = self
            .replica
            .doc
            .transact()
            .encode_state_as_update_v1(&StateVector::default());
        self.replica.drain();

        let result = {
            let txn = self.replica.doc.transact_mut_with(origin.tag());
            let mut txn = Transaction::new(txn, &mut self.arena, &self.replica.roots, origin);
            match f(&mut txn) {
                Ok(value) => Ok((value, txn.finish())),
                Err(err) => Err(err),
            }
        };

        match result {
            Ok((value, update)) => {
                let raw = self.replica.drain();
                let events = self.resolve(&raw);
                debug!(
                    origin = ?origin,
                    bytes = update.len(),
                    events = events.len(),
                    "Committed document transaction"
                );
                Ok((
                    value,
                    Commit {
                        origin,
                        events,
                        update,
                    },
                ))
            }
            Err(err) => {
                match self.restore(&snapshot) {
                    Ok(()) => debug!(origin = ?origin, "Rolled back document transaction"),
                    Err(restore) => error!(error = %restore, "Failed to roll back document transaction"),
                }
                Err(err)
            }
        }
    }

    /// Merges an update received from another replica.
    ///
    /// Events are reported for nodes that existed before the update. Updates
    /// this replica has already seen change nothing.
    pub fn apply_update(&mut self, update: &Update) -> Result<Commit, DocError> {
        if update.is_empty() {
            return Ok(Commit {
                origin: Origin::Remote,
                events: Vec::new(),
                update: Update::default(),
            });
        }
        let decoded = Update::decode_v1(update.as_bytes())?;
        debug!(bytes = update.len(), "Applying remote update");
        self.replica.drain();

        let applied = {
            let mut txn = self.replica.doc.transact_mut_with(Origin::Remote.tag());
            txn.apply_update(decoded)
        };
        let raw = self.replica.drain();
        if let Err(err) = applied {
            self.reindex();
            return Err(DocError::UpdateRejected {
                reason: err.to_string(),
            });
        }

        let events = self.resolve(&raw);
        let txn = self.replica.doc.transact();
        let mut roots_changed = false;
        for event in &raw {
            match &event.branch {
                None => roots_changed = true,
                Some(branch) => {
                    if let Some(id) = self.arena.resolve(branch) {
                        self.arena.refresh(&txn, &id);
                    }
                }
            }
        }
        if roots_changed {
            self.arena.refresh_roots(&txn, &self.replica.roots);
        }

        Ok(Commit {
            origin: Origin::Remote,
            events,
            update: update.clone(),
        })
    }

    /// Encoded state vector summarizing which changes this replica has seen.
    pub fn state_vector(&self) -> Vec<u8> {
        self.replica.doc.transact().state_vector().encode_v1()
    }

    /// Encodes the whole document as one update.
    pub fn encode_state(&self) -> Update {
        self.encode_from(&StateVector::default())
    }

    /// Encodes the changes missing from a replica with the given state vector.
    pub fn encode_diff(&self, state_vector: &[u8]) -> Result<Update, DocError> {
        let remote = StateVector::decode_v1(state_vector).map_err(|err| DocError::DecodeFailed {
            reason: err.to_string(),
        })?;
        Ok(self.encode_from(&remote))
    }

    /// Renders a subtree as JSON for display and debugging.
    ///
    /// Type tags appear as stored: under `__typeName` in keyed nodes and as
    /// the leading element of ordered nodes.
    pub fn to_json(&self, id: &NodeId) -> Option<serde_json::Value> {
        let data = self.arena.nodes.get(id)?;
        let render = |content: &Content| match content {
            Content::Leaf(value) => Some(value.clone()),
            Content::Node(child) => self.to_json(child),
        };
        Some(match &data.body {
            Body::Keyed(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, content)| Some((key.clone(), render(content)?)))
                    .collect::<Option<_>>()?,
            ),
            Body::Ordered(items) => serde_json::Value::Array(
                items.iter().map(render).collect::<Option<_>>()?,
            ),
        })
    }

    fn encode_from(&self, state_vector: &StateVector) -> Update {
        let txn = self.replica.doc.transact();
        Update::from_bytes(txn.encode_state_as_update_v1(state_vector))
    }

    /// Maps captured events onto indexed nodes, skipping the roots container
    /// and nodes the index does not know.
    fn resolve(&self, raw: &[RawEvent]) -> Vec<ChangeEvent> {
        raw.iter()
            .filter(|event| !event.changes.is_empty())
            .filter_map(|event| {
                let target = self.arena.resolve(event.branch.as_ref()?)?;
                Some(ChangeEvent {
                    target,
                    changes: event.changes.clone(),
                })
            })
            .collect()
    }

    /// Reopens the replica from a full-state snapshot.
    fn restore(&mut self, snapshot: &[u8]) -> Result<(), DocError> {
        let replica = Replica::open(self.client_id);
        let update = Update::decode_v1(snapshot)?;
        {
            let mut txn = replica.doc.transact_mut();
            txn.apply_update(update)
                .map_err(|err| DocError::UpdateRejected {
                    reason: err.to_string(),
                })?;
        }
        replica.drain();
        self.replica = replica;
        self.reindex();
        Ok(())
    }

    /// Rebuilds the node index from the replicated document.
    fn reindex(&mut self) {
        let mut arena = Arena::default();
        arena.refresh_roots(&self.replica.doc.transact(), &self.replica.roots);
        self.arena = arena;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        NodeId::root(name)
    }
}
