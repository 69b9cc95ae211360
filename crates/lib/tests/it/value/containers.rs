use serde_json::json;
use treebind::value::{
    Array, Entity, IdAllocator, List, Map, Object, Opaque, SequentialIds, Set, TypeTag, Value,
};

use crate::helpers::{Color, color};

#[test]
fn test_equality_ignores_instance_ids() {
    let a = Map::new().set("items", List::from_vec(vec![Value::from(1)]));
    let b = Map::new().set("items", List::from_vec(vec![Value::from(1)]));

    assert_ne!(a.id(), b.id());
    assert_eq!(a, b);
    assert!(!Value::from(a.clone()).is_same(&Value::from(b)));
    assert!(Value::from(a.clone()).is_same(&Value::from(a)));
}

#[test]
fn test_edits_share_untouched_children() {
    let kept = List::from_vec(vec![Value::from("kept")]);
    let root = Map::new().set("kept", kept.clone()).set("count", 1);
    let next = root.set("count", 2);

    assert!(next.get("kept").unwrap().is_same(&Value::from(kept)));
    assert_eq!(root.get("count").and_then(Value::as_int), Some(1));
    assert_eq!(next.get("count").and_then(Value::as_int), Some(2));
}

#[test]
fn test_builder_batches_edits() {
    let list = List::from_vec(vec![Value::from(1), Value::from(2)]);
    let mut builder = list.mutate();
    builder.push(3).remove_at(0).set(0, 20);
    assert_eq!(builder.len(), 2);
    let edited = builder.finish();

    assert_eq!(edited.id(), list.id());
    assert_eq!(edited, List::from_vec(vec![Value::from(20), Value::from(3)]));
    assert_eq!(list.len(), 2);
}

#[test]
fn test_set_members_are_sorted_and_unique() {
    let set = Set::of(["b", "a", "b"]);
    assert_eq!(set.len(), 2);
    let members: Vec<&str> = set.iter().map(String::as_str).collect();
    assert_eq!(members, vec!["a", "b"]);
}

#[test]
fn test_sequential_ids_are_deterministic() {
    let ids = SequentialIds::new();
    let first = List::new_in(&ids);
    let second = Map::new_in(&ids);
    let third = Entity::new_in("TaskItem", &ids);

    assert_eq!(first.id().as_str(), "0");
    assert_eq!(second.id().as_str(), "1");
    assert_eq!(third.id().as_str(), "2");
    assert_eq!(ids.next_id().as_str(), "3");
}

#[test]
fn test_type_tags() {
    assert_eq!(Value::from(List::new()).type_tag(), Some(TypeTag::List));
    assert_eq!(Value::from(Set::new()).type_tag(), Some(TypeTag::Set));
    assert_eq!(
        Value::from(Entity::new("TaskList")).type_tag(),
        Some(TypeTag::parse("TaskList"))
    );
    assert_eq!(color("red").type_tag(), Some(TypeTag::parse("Color")));
    assert_eq!(Value::from(Object::new()).type_tag(), None);
    assert!(TypeTag::Map.is_builtin());
    assert!(!TypeTag::parse("Color").is_builtin());
}

#[test]
fn test_json_conversion() {
    let value = Value::from_json(&json!({"a": [1, 2.5, "x"], "b": null}));
    let object = value.as_object().unwrap();
    let array = object.get("a").and_then(Value::as_array).unwrap();
    assert_eq!(array.get(0).and_then(Value::as_int), Some(1));
    assert_eq!(array.get(1).and_then(Value::as_float), Some(2.5));
    assert_eq!(object.get("b"), Some(&Value::Null));
    assert_eq!(value.to_json(), json!({"a": [1, 2.5, "x"], "b": null}));

    let entity = Value::from(Entity::new("TaskItem").set("title", "milk"));
    assert_eq!(
        entity.to_json(),
        json!({"__typeName": "TaskItem", "title": "milk"})
    );
    assert_eq!(
        Value::from(Array::from_vec(vec![Value::from(Set::of(["x"]))])).to_json(),
        json!([["x"]])
    );
}

#[test]
fn test_value_object_downcast() {
    let value = color("teal");
    let opaque = value.as_opaque().unwrap();
    assert!(opaque.is::<Color>());
    assert_eq!(opaque.type_tag(), "Color");
    assert_eq!(
        value.downcast_ref::<Color>().map(|c| c.value.as_str()),
        Some("teal")
    );
    assert_eq!(value, Value::from(Opaque::new(Color { value: "teal".into() })));
    assert_ne!(value, color("navy"));
}

#[test]
fn test_option_converts_to_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::from("x"));
}
