use serde_json::json;
use treebind::{
    doc::{Change, ChangeAction, Document, NodeId},
    registry::SyncStrategy,
    value::{Array, List, Map, Object, Value},
};

use crate::helpers::*;

fn child_node(doc: &Document, key: &str) -> NodeId {
    doc.root(ROOT)
        .and_then(|root| root.get(key))
        .and_then(|content| content.as_node())
        .cloned()
        .unwrap()
}

fn list_of(values: &[i64]) -> List {
    values.iter().map(|v| Value::from(*v)).collect()
}

/// Binds `{list: [..previous]}`, then pushes `{list: current}` where
/// `current` is derived from the same list instance.
fn sync_list(previous: &[i64], edit: impl FnOnce(&List) -> List) -> (Peers, Option<Value>, Vec<Change>) {
    let list = list_of(previous);
    let state = Map::new().set("list", list.clone());
    let mut peers = Peers::new(Value::from(state.clone()), test_registry(SyncStrategy::IsEntity));
    let node = child_node(&peers.a_doc, "list");

    let (commit, observed) = peers.push(Value::from(state.set("list", edit(&list))));
    let changes = commit
        .event_for(&node)
        .map(|event| event.changes.clone())
        .unwrap_or_default();
    (peers, observed, changes)
}

fn sync_map(previous: &[(&str, &str)], edit: impl FnOnce(&Map) -> Map) -> (Peers, Option<Value>, Vec<Change>) {
    let inner = Map::from_entries(previous.iter().map(|(k, v)| (*k, Value::from(*v))));
    let state = Map::new().set("map", inner.clone());
    let mut peers = Peers::new(Value::from(state.clone()), test_registry(SyncStrategy::IsEntity));
    let node = child_node(&peers.a_doc, "map");

    let (commit, observed) = peers.push(Value::from(state.set("map", edit(&inner))));
    assert_eq!(child_node(&peers.a_doc, "map"), node, "map node was recreated");
    let changes = commit
        .event_for(&node)
        .map(|event| event.changes.clone())
        .unwrap_or_default();
    (peers, observed, changes)
}

#[test]
fn test_scenario_a_push_onto_list() {
    let (peers, observed, changes) = sync_list(&[13], |list| list.push(42));

    let node = child_node(&peers.b_doc, "list");
    assert_eq!(
        peers.b_doc.to_json(&node),
        Some(json!([{"__typeName": "List"}, 13, 42]))
    );
    assert_eq!(changes, vec![Change::index(2, ChangeAction::Add)]);

    let observed = observed.unwrap();
    assert_eq!(observed.get("list"), Some(&Value::from(list_of(&[13, 42]))));
    peers.assert_converged();
}

#[test]
fn test_scenario_b_push_onto_empty_list() {
    let (peers, observed, changes) = sync_list(&[], |list| list.push(42));

    let node = child_node(&peers.b_doc, "list");
    assert_eq!(
        peers.b_doc.to_json(&node),
        Some(json!([{"__typeName": "List"}, 42]))
    );
    assert_eq!(changes, vec![Change::index(1, ChangeAction::Add)]);
    assert_eq!(
        observed.unwrap().get("list"),
        Some(&Value::from(list_of(&[42])))
    );
    peers.assert_converged();
}

#[test]
fn test_scenario_c_remove_head_of_list() {
    let (peers, observed, changes) = sync_list(&[13, 42], |list| list.remove_at(0));

    let node = child_node(&peers.b_doc, "list");
    assert_eq!(
        peers.b_doc.to_json(&node),
        Some(json!([{"__typeName": "List"}, 42]))
    );
    assert!(changes.contains(&Change::index(1, ChangeAction::Add)));
    assert_eq!(
        changes
            .iter()
            .filter(|change| change.action == ChangeAction::Delete)
            .count(),
        2
    );
    assert_eq!(
        observed.unwrap().get("list"),
        Some(&Value::from(list_of(&[42])))
    );
    peers.assert_converged();
}

#[test]
fn test_scenario_d_add_key() {
    let (peers, observed, changes) = sync_map(&[], |map| map.set("newKey", "Hello World"));

    assert_eq!(changes, vec![Change::key("newKey", ChangeAction::Add)]);
    let observed = observed.unwrap();
    assert_eq!(
        observed.get("map").and_then(|m| m.get("newKey")).and_then(Value::as_str),
        Some("Hello World")
    );
    peers.assert_converged();
}

#[test]
fn test_scenario_e_update_key_in_place() {
    let (peers, observed, changes) = sync_map(&[("updatedKey", "Hello World")], |map| {
        map.set("updatedKey", "Hello YJS")
    });

    assert_eq!(changes, vec![Change::key("updatedKey", ChangeAction::Update)]);
    let node = child_node(&peers.b_doc, "map");
    assert_eq!(
        peers.b_doc.to_json(&node),
        Some(json!({"__typeName": "Map", "updatedKey": "Hello YJS"}))
    );
    assert_eq!(
        observed
            .unwrap()
            .get("map")
            .and_then(|m| m.get("updatedKey"))
            .and_then(Value::as_str),
        Some("Hello YJS")
    );
    peers.assert_converged();
}

#[test]
fn test_scenario_f_remove_key() {
    let (peers, observed, changes) =
        sync_map(&[("removedKey", "Hello World")], |map| map.remove("removedKey"));

    assert_eq!(changes, vec![Change::key("removedKey", ChangeAction::Delete)]);
    let observed = observed.unwrap();
    let map = observed.get("map").and_then(Value::as_map).unwrap();
    assert!(map.is_empty());
    peers.assert_converged();
}

/// Binds `{array: [..previous]}` as a plain array under the `Always`
/// strategy and pushes an edit of the same array. The array node must be
/// patched in place on both replicas.
fn sync_plain_array(previous: &[i64], edit: impl FnOnce(&Array) -> Array) -> (Peers, Option<Value>, Vec<Change>) {
    let array = Array::from_vec(previous.iter().map(|v| Value::from(*v)).collect());
    let state = Map::new().set("array", array.clone());
    let mut peers = Peers::new(Value::from(state.clone()), test_registry(SyncStrategy::Always));
    let node = child_node(&peers.a_doc, "array");
    assert_eq!(child_node(&peers.b_doc, "array"), node);

    let (commit, observed) = peers.push(Value::from(state.set("array", edit(&array))));
    assert_eq!(child_node(&peers.a_doc, "array"), node, "array node was recreated");
    assert_eq!(child_node(&peers.b_doc, "array"), node, "array node was recreated remotely");
    let changes = commit
        .event_for(&node)
        .map(|event| event.changes.clone())
        .unwrap_or_default();
    (peers, observed, changes)
}

fn sync_plain_object(
    previous: &[(&str, &str)],
    edit: impl FnOnce(&Object) -> Object,
) -> (Peers, Option<Value>, Vec<Change>) {
    let object = Object::from_entries(previous.iter().map(|(k, v)| (*k, Value::from(*v))));
    let state = Map::new().set("object", object.clone());
    let mut peers = Peers::new(Value::from(state.clone()), test_registry(SyncStrategy::Always));
    let node = child_node(&peers.a_doc, "object");

    let (commit, observed) = peers.push(Value::from(state.set("object", edit(&object))));
    assert_eq!(child_node(&peers.a_doc, "object"), node, "object node was recreated");
    assert_eq!(child_node(&peers.b_doc, "object"), node, "object node was recreated remotely");
    let changes = commit
        .event_for(&node)
        .map(|event| event.changes.clone())
        .unwrap_or_default();
    (peers, observed, changes)
}

fn plain_array(values: &[i64]) -> Value {
    Value::from(Array::from_vec(values.iter().map(|v| Value::from(*v)).collect()))
}

#[test]
fn test_plain_array_push() {
    let (peers, observed, changes) = sync_plain_array(&[13], |array| array.push(42));

    let node = child_node(&peers.b_doc, "array");
    assert_eq!(peers.b_doc.to_json(&node), Some(json!([13, 42])));
    assert_eq!(changes, vec![Change::index(1, ChangeAction::Add)]);
    assert_eq!(observed.unwrap().get("array"), Some(&plain_array(&[13, 42])));
    peers.assert_converged();
}

#[test]
fn test_plain_array_push_onto_empty() {
    let (peers, observed, changes) = sync_plain_array(&[], |array| array.push(42));

    let node = child_node(&peers.b_doc, "array");
    assert_eq!(peers.b_doc.to_json(&node), Some(json!([42])));
    assert_eq!(changes, vec![Change::index(0, ChangeAction::Add)]);
    assert_eq!(observed.unwrap().get("array"), Some(&plain_array(&[42])));
    peers.assert_converged();
}

#[test]
fn test_plain_array_remove_head() {
    let (peers, observed, changes) = sync_plain_array(&[13, 42], |array| array.remove_at(0));

    let node = child_node(&peers.b_doc, "array");
    assert_eq!(peers.b_doc.to_json(&node), Some(json!([42])));
    assert!(changes.contains(&Change::index(0, ChangeAction::Add)));
    assert_eq!(
        changes
            .iter()
            .filter(|change| change.action == ChangeAction::Delete)
            .count(),
        2
    );
    assert_eq!(observed.unwrap().get("array"), Some(&plain_array(&[42])));
    peers.assert_converged();
}

#[test]
fn test_plain_object_add_key() {
    let (peers, observed, changes) =
        sync_plain_object(&[], |object| object.set("newKey", "Hello World"));

    let node = child_node(&peers.b_doc, "object");
    assert_eq!(peers.b_doc.to_json(&node), Some(json!({"newKey": "Hello World"})));
    assert_eq!(changes, vec![Change::key("newKey", ChangeAction::Add)]);
    assert_eq!(
        observed
            .unwrap()
            .get("object")
            .and_then(|o| o.get("newKey"))
            .and_then(Value::as_str),
        Some("Hello World")
    );
    peers.assert_converged();
}

#[test]
fn test_plain_object_update_key() {
    let (peers, observed, changes) = sync_plain_object(&[("updatedKey", "Hello World")], |object| {
        object.set("updatedKey", "Hello YJS")
    });

    let node = child_node(&peers.b_doc, "object");
    assert_eq!(peers.b_doc.to_json(&node), Some(json!({"updatedKey": "Hello YJS"})));
    assert_eq!(changes, vec![Change::key("updatedKey", ChangeAction::Update)]);
    assert_eq!(
        observed
            .unwrap()
            .get("object")
            .and_then(|o| o.get("updatedKey"))
            .and_then(Value::as_str),
        Some("Hello YJS")
    );
    peers.assert_converged();
}

#[test]
fn test_plain_object_remove_key() {
    let (peers, observed, changes) =
        sync_plain_object(&[("removedKey", "Hello World")], |object| object.remove("removedKey"));

    let node = child_node(&peers.b_doc, "object");
    assert_eq!(peers.b_doc.to_json(&node), Some(json!({})));
    assert_eq!(changes, vec![Change::key("removedKey", ChangeAction::Delete)]);
    let observed = observed.unwrap();
    let object = observed.get("object").and_then(Value::as_object).unwrap();
    assert!(object.is_empty());
    peers.assert_converged();
}

#[test]
fn test_scenario_g_value_object_leaf() {
    let state = Map::new().set("name", "palette");
    let mut peers = Peers::new(Value::from(state.clone()), test_registry(SyncStrategy::IsEntity));

    let (commit, observed) = peers.push(Value::from(state.set("color", color("yellow"))));

    assert_eq!(
        commit.event_for(&NodeId::root(ROOT)).unwrap().changes,
        vec![Change::key("color", ChangeAction::Add)]
    );
    assert_eq!(
        peers.b_doc.to_json(&ROOT.into()).unwrap()["color"],
        json!({"__typeName": "Color", "value": "yellow"})
    );

    let observed = observed.unwrap();
    let color = observed.get("color").unwrap();
    assert!(color.as_object().is_none());
    assert_eq!(
        color.downcast_ref::<Color>(),
        Some(&Color {
            value: "yellow".into()
        })
    );
    peers.assert_converged();
}

#[test]
fn test_value_object_is_replaced_wholesale() {
    let state = Map::new().set("color", color("red"));
    let mut peers = Peers::new(Value::from(state.clone()), test_registry(SyncStrategy::IsEntity));

    let (commit, observed) = peers.push(Value::from(state.set("color", color("green"))));

    assert_eq!(commit.events.len(), 1);
    assert_eq!(
        commit.events[0].changes,
        vec![Change::key("color", ChangeAction::Update)]
    );
    let observed = observed.unwrap();
    assert_eq!(
        observed.get("color").and_then(|c| c.downcast_ref::<Color>()),
        Some(&Color {
            value: "green".into()
        })
    );
    peers.assert_converged();
}
