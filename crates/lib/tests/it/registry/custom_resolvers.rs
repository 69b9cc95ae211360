use std::sync::Arc;

use indexmap::IndexMap;
use treebind::{
    Error, Result,
    doc::Document,
    registry::{EntityResolver, ObjectDiff, ObjectResolver, RawObject, Registry},
    sync::{Binder, SyncError},
    value::{Entity, IdAllocator, Map, TypeTag, Value},
};

use crate::helpers::*;

/// Entity resolver that refuses to grow an entity past `max` fields.
#[derive(Debug)]
struct BoundedResolver {
    inner: EntityResolver,
    max: usize,
}

impl BoundedResolver {
    fn new(tag: &str, max: usize) -> Self {
        Self {
            inner: EntityResolver::new(tag),
            max,
        }
    }
}

impl ObjectResolver for BoundedResolver {
    fn create(&self, raw: RawObject, ids: &dyn IdAllocator) -> Result<Value> {
        self.inner.create(raw, ids)
    }

    fn to_transport_shape(&self, value: &Value) -> Result<RawObject> {
        self.inner.to_transport_shape(value)
    }

    fn apply_patch(&self, value: &Value, diffs: Vec<ObjectDiff>) -> Result<Value> {
        let patched = self.inner.apply_patch(value, diffs)?;
        let len = patched.as_entity().map_or(0, Entity::len);
        if len > self.max {
            return Err(SyncError::PatchFailed {
                tag: TypeTag::parse("Tags"),
                reason: format!("{len} fields exceeds limit of {}", self.max),
            }
            .into());
        }
        Ok(patched)
    }
}

#[test]
fn test_custom_resolver_rejects_patch() {
    let mut writer_registry = Registry::new();
    writer_registry.register_entity("Tags");
    let mut reader_registry = Registry::new();
    reader_registry.register_object("Tags", BoundedResolver::new("Tags", 2));

    let state = Map::new().set("tags", Entity::new("Tags").set("a", true));
    let mut doc = Document::with_client_id(1);
    let (mut writer, init) = Binder::init(
        &mut doc,
        ROOT,
        Value::from(state.clone()),
        Arc::new(writer_registry),
    )
    .unwrap();

    let mut peer = Document::with_client_id(2);
    peer.apply_update(&init.update).unwrap();
    let mut reader = Binder::attach(&peer, ROOT, Arc::new(reader_registry)).unwrap();

    let tags = state.get("tags").and_then(Value::as_entity).unwrap();
    let ok = writer
        .apply_local(&mut doc, Value::from(state.set("tags", tags.set("b", true))))
        .unwrap();
    let remote = peer.apply_update(&ok.update).unwrap();
    assert!(reader.observe(&peer, &remote).unwrap().is_some());

    let tags = writer.state().get("tags").and_then(Value::as_entity).unwrap().clone();
    let next = writer.state().as_map().unwrap().set("tags", tags.set("c", true));
    let too_many = writer.apply_local(&mut doc, Value::from(next)).unwrap();
    let remote = peer.apply_update(&too_many.update).unwrap();
    let err = reader.observe(&peer, &remote).unwrap_err();

    match err {
        Error::Sync(SyncError::PatchFailed { tag, reason }) => {
            assert_eq!(tag.as_str(), "Tags");
            assert!(reason.contains("limit of 2"));
        }
        other => panic!("expected patch failure, got {other:?}"),
    }
    assert_eq!(
        reader
            .state()
            .get("tags")
            .and_then(Value::as_entity)
            .map(Entity::len),
        Some(2)
    );
}

#[test]
fn test_entity_defaults_fill_missing_fields() {
    let mut writer_registry = Registry::new();
    writer_registry.register_entity("TaskItem");
    let mut reader_registry = Registry::new();
    let mut defaults = IndexMap::new();
    defaults.insert("done".to_string(), Value::from(false));
    reader_registry.register_entity_with_defaults("TaskItem", defaults);

    let state = Map::new().set("item", Entity::new("TaskItem").set("title", "milk"));
    let mut doc = Document::with_client_id(1);
    let (_, init) = Binder::init(
        &mut doc,
        ROOT,
        Value::from(state),
        Arc::new(writer_registry),
    )
    .unwrap();

    let mut peer = Document::with_client_id(2);
    peer.apply_update(&init.update).unwrap();
    let reader = Binder::attach(&peer, ROOT, Arc::new(reader_registry)).unwrap();

    let item = reader.state().get("item").unwrap();
    assert_eq!(item.get("title").and_then(Value::as_str), Some("milk"));
    assert_eq!(item.get("done").and_then(Value::as_bool), Some(false));
}

#[test]
fn test_array_resolver_cannot_back_an_entity() {
    let mut registry = Registry::new();
    registry.register_array("TaskItem", treebind::registry::ListResolver);

    let state = Map::new().set("item", Entity::new("TaskItem"));
    let mut doc = Document::with_client_id(1);
    let err = Binder::init(&mut doc, ROOT, Value::from(state), Arc::new(registry)).unwrap_err();

    assert!(err.is_sync_error());
    assert_eq!(doc.node_count(), 0);
}
