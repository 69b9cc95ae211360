//! Task-list application model used by the demo.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use treebind::{
    Registry,
    registry::{SerdeValueResolver, SyncStrategy},
    value::{Entity, List, Opaque, Value, ValueObject},
};

/// Display color of a task list, stored as a single leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub value: String,
}

impl ValueObject for Color {
    fn type_tag(&self) -> &str {
        "Color"
    }
}

/// Registry with the task-list entity types and the `Color` value-object.
pub fn registry(strategy: SyncStrategy) -> Arc<Registry> {
    let mut defaults = IndexMap::new();
    defaults.insert("done".to_string(), Value::from(false));

    let mut registry = Registry::new().with_strategy(strategy);
    registry
        .register_entity("TaskList")
        .register_entity_with_defaults("TaskItem", defaults)
        .register_value("Color", SerdeValueResolver::<Color>::new());
    Arc::new(registry)
}

pub fn task(title: &str) -> Value {
    Value::from(Entity::new("TaskItem").set("title", title).set("done", false))
}

pub fn task_list(name: &str, task_count: usize) -> Value {
    let tasks: List = (1..=task_count).map(|i| task(&format!("task {i}"))).collect();
    Value::from(
        Entity::new("TaskList")
            .set("name", name)
            .set("color", Opaque::new(Color {
                value: "red".to_string(),
            }))
            .set("tasks", tasks),
    )
}

fn tasks(state: &Value) -> Option<&List> {
    state.get("tasks").and_then(Value::as_list)
}

fn with_tasks(state: &Value, tasks: List) -> Option<Value> {
    Some(Value::from(state.as_entity()?.set("tasks", tasks)))
}

/// Marks the task at `index` done.
pub fn complete(state: &Value, index: usize) -> Option<Value> {
    let item = tasks(state)?.get(index)?.as_entity()?.set("done", true);
    with_tasks(state, tasks(state)?.set(index, item))
}

/// Appends a new task.
pub fn add_task(state: &Value, title: &str) -> Option<Value> {
    with_tasks(state, tasks(state)?.push(task(title)))
}

/// Removes the task at `index`.
pub fn remove_task(state: &Value, index: usize) -> Option<Value> {
    with_tasks(state, tasks(state)?.remove_at(index))
}

/// Replaces the list color.
pub fn recolor(state: &Value, color: &str) -> Option<Value> {
    let color = Opaque::new(Color {
        value: color.to_string(),
    });
    Some(Value::from(state.as_entity()?.set("color", color)))
}
