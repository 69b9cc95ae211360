use std::sync::Arc;

use serde::{Deserialize, Serialize};
use treebind::{
    doc::{Commit, Document},
    registry::{Registry, SerdeValueResolver, SyncStrategy},
    sync::Binder,
    value::{Entity, List, Opaque, Value, ValueObject},
};

pub const ROOT: &str = "state";

/// Value-object stored as a single leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub value: String,
}

impl ValueObject for Color {
    fn type_tag(&self) -> &str {
        "Color"
    }
}

pub fn color(value: &str) -> Value {
    Value::from(Opaque::new(Color {
        value: value.to_string(),
    }))
}

/// Registry with the task-list entities and the `Color` value-object.
pub fn test_registry(strategy: SyncStrategy) -> Arc<Registry> {
    let mut registry = Registry::new().with_strategy(strategy);
    registry
        .register_entity("TaskList")
        .register_entity("TaskItem")
        .register_value("Color", SerdeValueResolver::<Color>::new());
    Arc::new(registry)
}

pub fn task(title: &str, done: bool) -> Value {
    Value::from(Entity::new("TaskItem").set("title", title).set("done", done))
}

pub fn task_list(name: &str, tasks: Vec<Value>) -> Value {
    Value::from(
        Entity::new("TaskList")
            .set("name", name)
            .set("tasks", List::from_vec(tasks)),
    )
}

/// Two replicas of one document, each with a binder on the same root.
///
/// `a` is the writer; every commit it produces is shipped to `b` and
/// observed there.
pub struct Peers {
    pub a_doc: Document,
    pub a: Binder,
    pub b_doc: Document,
    pub b: Binder,
}

impl Peers {
    pub fn new(state: Value, registry: Arc<Registry>) -> Self {
        let mut a_doc = Document::with_client_id(1);
        let (a, init) = Binder::init(&mut a_doc, ROOT, state, registry.clone()).unwrap();

        let mut b_doc = Document::with_client_id(2);
        b_doc.apply_update(&init.update).unwrap();
        let b = Binder::attach(&b_doc, ROOT, registry).unwrap();

        Self { a_doc, a, b_doc, b }
    }

    /// Projects `next` on `a` and delivers the commit to `b`.
    ///
    /// Returns the local commit and what `b` observed.
    pub fn push(&mut self, next: Value) -> (Commit, Option<Value>) {
        let local = self.a.apply_local(&mut self.a_doc, next).unwrap();
        let remote = self.b_doc.apply_update(&local.update).unwrap();
        let observed = self.b.observe(&self.b_doc, &remote).unwrap();
        (local, observed)
    }

    /// Asserts both replicas hold the same document and equal states.
    pub fn assert_converged(&self) {
        let root = ROOT.into();
        assert_eq!(self.a_doc.to_json(&root), self.b_doc.to_json(&root));
        assert_eq!(self.a.state(), self.b.state());
    }
}
