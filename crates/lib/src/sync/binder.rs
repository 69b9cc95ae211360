//! Binding of one application state slot to one document root.

use std::sync::Arc;

use tracing::{debug, info, trace};

use super::{Links, init_root, materialize, project, reconstruct};
use crate::{
    Result,
    doc::{Commit, DocError, Document, NodeId, Origin},
    registry::Registry,
    value::Value,
};

/// Couples an application state tree to a named document root.
///
/// Local transitions are pushed with [`Binder::apply_local`], which projects
/// the new state in one local transaction. Commits observed on the document
/// are passed to [`Binder::observe`]; only remote ones are reconstructed,
/// so the binder never feeds its own writes back into the state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use treebind::{doc::Document, registry::Registry, sync::Binder, value::{List, Map, Value}};
///
/// let registry = Arc::new(Registry::new());
/// let state = Value::from(Map::new().set("items", List::new()));
///
/// let mut local = Document::new();
/// let (mut binder, init) = Binder::init(&mut local, "state", state, registry.clone())?;
///
/// let mut remote = Document::new();
/// remote.apply_update(&init.update)?;
/// let mut peer = Binder::attach(&remote, "state", registry)?;
///
/// let items = binder.state().get("items").and_then(Value::as_list).unwrap().push(42);
/// let next = Value::from(binder.state().as_map().unwrap().set("items", items));
/// let commit = binder.apply_local(&mut local, next)?;
///
/// let remote_commit = remote.apply_update(&commit.update)?;
/// let synced = peer.observe(&remote, &remote_commit)?.unwrap();
/// assert_eq!(&synced, binder.state());
/// # Ok::<(), treebind::Error>(())
/// ```
#[derive(Debug)]
pub struct Binder {
    registry: Arc<Registry>,
    links: Links,
    root: NodeId,
    state: Value,
}

impl Binder {
    /// Writes `state` into the root `name` and binds to it.
    pub fn init(
        doc: &mut Document,
        name: &str,
        state: Value,
        registry: Arc<Registry>,
    ) -> Result<(Self, Commit)> {
        let mut links = Links::new();
        let (root, commit) = doc.transact(Origin::Local, |txn| {
            init_root(txn, name, &state, &registry, &mut links)
        })?;
        info!(root = %root, nodes = links.len(), "Initialized document root");
        Ok((
            Self {
                registry,
                links,
                root,
                state,
            },
            commit,
        ))
    }

    /// Binds to the existing root `name`, materializing its content.
    pub fn attach(doc: &Document, name: &str, registry: Arc<Registry>) -> Result<Self> {
        let root = NodeId::root(name);
        if !doc.contains(&root) {
            return Err(DocError::RootNotFound {
                name: name.to_string(),
            }
            .into());
        }
        let mut links = Links::new();
        let state = materialize(doc, &root, &registry, &mut links)?;
        info!(root = %root, nodes = links.len(), "Attached to document root");
        Ok(Self {
            registry,
            links,
            root,
            state,
        })
    }

    /// Current state tree.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Root node this binder writes to.
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    /// Node/value links maintained by this binder.
    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Projects `state` onto the document in one local transaction.
    ///
    /// On error nothing is written and the previous state is kept.
    pub fn apply_local(&mut self, doc: &mut Document, state: Value) -> Result<Commit> {
        let (_, commit) = doc.transact(Origin::Local, |txn| {
            project(
                txn,
                &state,
                Some(&self.state),
                &self.root,
                &self.registry,
                &mut self.links,
            )
        })?;
        debug!(
            root = %self.root,
            bytes = commit.update.len(),
            "Projected local state"
        );
        self.state = state;
        Ok(commit)
    }

    /// Folds a document commit into the state.
    ///
    /// Returns the new state if the commit was remote and changed it. Local
    /// commits are ignored.
    pub fn observe(&mut self, doc: &Document, commit: &Commit) -> Result<Option<Value>> {
        if commit.origin == Origin::Local {
            trace!(root = %self.root, "Ignoring local commit");
            return Ok(None);
        }
        if commit.events.is_empty() {
            return Ok(None);
        }
        let next = reconstruct(
            doc,
            &self.state,
            &commit.events,
            &self.registry,
            &mut self.links,
        )?;
        if next.is_same(&self.state) {
            return Ok(None);
        }
        self.state = next.clone();
        let pruned = self.links.prune(doc);
        debug!(root = %self.root, pruned, "Applied remote commit");
        Ok(Some(next))
    }
}
