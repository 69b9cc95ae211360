use std::sync::Arc;

use treebind::{
    registry::{Registry, SyncStrategy},
    value::{Array, Entity, List, Map, Object, SequentialIds, Set, Value},
};

use crate::helpers::*;

fn sample_states() -> Vec<Value> {
    vec![
        Value::from(Map::new()),
        Value::from(Map::new().set("count", 3).set("ratio", 0.5).set("flag", false)),
        Value::from(List::from_vec(vec![
            Value::from("a"),
            Value::Null,
            Value::from(List::from_vec(vec![Value::from(1), Value::from(2)])),
        ])),
        Value::from(
            Map::new()
                .set("tags", Set::of(["red", "blue"]))
                .set("palette", List::from_vec(vec![color("red"), color("blue")]))
                .set("owner", Entity::new("TaskItem").set("title", "paint")),
        ),
        Value::from(
            Map::new()
                .set("raw", Object::new().set("nested", Array::from_vec(vec![Value::from(1)])))
                .set("rows", Array::from_vec(vec![Value::from(Object::new().set("x", 1))])),
        ),
        task_list(
            "Groceries",
            vec![task("milk", false), task("eggs", true)],
        ),
    ]
}

#[test]
fn test_local_mutations_keep_instance_id() {
    let list = List::from_vec(vec![Value::from(1)]);
    let mut builder = list.mutate();
    builder.push(3).insert(0, 2);
    for derived in [
        list.push(2),
        list.insert(0, 0),
        list.set(0, 9),
        list.remove_at(0),
        builder.finish(),
    ] {
        assert_eq!(derived.id(), list.id());
    }

    let map = Map::new().set("a", 1);
    let mut builder = map.mutate();
    builder.set("c", 3);
    for derived in [map.set("b", 2), map.remove("a"), builder.finish()] {
        assert_eq!(derived.id(), map.id());
    }

    let set = Set::of(["x"]);
    assert_eq!(set.add("y").id(), set.id());
    assert_eq!(set.remove("x").id(), set.id());

    let entity = Entity::new("TaskItem");
    assert_eq!(entity.set("title", "t").id(), entity.id());
    assert_eq!(entity.set("title", "t").type_tag(), "TaskItem");
}

#[test]
fn test_projecting_unchanged_state_is_a_noop() {
    for state in sample_states() {
        let mut peers = Peers::new(state.clone(), test_registry(SyncStrategy::Always));
        let (commit, observed) = peers.push(state);
        assert!(commit.is_empty());
        assert!(observed.is_none());
    }
}

fn is_keyed(value: &Value) -> bool {
    matches!(
        value,
        Value::Map(_) | Value::Object(_) | Value::Entity(_) | Value::Set(_)
    )
}

#[test]
fn test_replacing_state_round_trips() {
    let states = sample_states();
    for prior in &states {
        for next in states.iter().filter(|next| is_keyed(next) == is_keyed(prior)) {
            for strategy in [SyncStrategy::Always, SyncStrategy::IsEntity] {
                let mut peers = Peers::new(prior.clone(), test_registry(strategy));
                let (_, observed) = peers.push(next.clone());
                if next != prior {
                    assert_eq!(observed.as_ref(), Some(next));
                }
                peers.assert_converged();
            }
        }
    }
}

#[test]
fn test_attach_round_trips_initial_state() {
    for state in sample_states() {
        let peers = Peers::new(state.clone(), test_registry(SyncStrategy::IsEntity));
        assert_eq!(peers.b.state(), &state);
    }
}

#[test]
fn test_untouched_children_are_shared() {
    let state = Map::new()
        .set("edited", List::from_vec(vec![Value::from(1)]))
        .set("kept", List::from_vec(vec![Value::from(2)]))
        .set("nested", Map::new().set("deep", Set::of(["a"])));
    let mut peers = Peers::new(Value::from(state.clone()), test_registry(SyncStrategy::IsEntity));
    let before = peers.b.state().clone();

    let edited = state.get("edited").and_then(Value::as_list).unwrap().push(3);
    let (_, observed) = peers.push(Value::from(state.set("edited", edited)));
    let after = observed.unwrap();

    assert!(!after.is_same(&before));
    assert!(after.same_instance(&before));
    assert!(!after.get("edited").unwrap().is_same(before.get("edited").unwrap()));
    assert!(after.get("kept").unwrap().is_same(before.get("kept").unwrap()));
    assert!(after.get("nested").unwrap().is_same(before.get("nested").unwrap()));
    peers.assert_converged();
}

#[test]
fn test_reconstructed_values_use_registry_ids() {
    let mut registry = Registry::new().with_ids(Arc::new(SequentialIds::starting_at(100)));
    registry.register_entity("TaskItem");
    let registry = Arc::new(registry);

    let state = Value::from(Map::new().set("item", Entity::new("TaskItem").set("title", "a")));
    let mut doc = treebind::Document::with_client_id(1);
    let (_, init) = treebind::Binder::init(&mut doc, ROOT, state.clone(), registry.clone()).unwrap();

    let mut peer = treebind::Document::with_client_id(2);
    peer.apply_update(&init.update).unwrap();
    let binder = treebind::Binder::attach(&peer, ROOT, registry).unwrap();

    assert_eq!(binder.state(), &state);
    let root_id = binder.state().instance_id().unwrap();
    let item_id = binder
        .state()
        .get("item")
        .and_then(Value::instance_id)
        .unwrap();
    for id in [root_id, item_id] {
        let n: u64 = id.as_str().parse().unwrap();
        assert!(n >= 100);
    }
}
