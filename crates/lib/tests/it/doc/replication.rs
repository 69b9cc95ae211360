use serde_json::json;
use treebind::{
    Error,
    doc::{Change, ChangeAction, DocError, Document, NodeId, NodeKind, Origin, Update},
};

/// Builds `{"title": .., "items": [..]}` under root "state".
fn seeded(client: u64) -> (Document, NodeId, Update) {
    let mut doc = Document::with_client_id(client);
    let (items, commit) = doc
        .transact(Origin::Local, |txn| {
            let root = txn.root("state", NodeKind::Keyed)?;
            txn.set_leaf(&root, "title", json!("Groceries"))?;
            let items = txn.set_node(&root, "items", NodeKind::Ordered)?;
            txn.push_leaf(&items, json!("milk"))?;
            Ok::<_, DocError>(items)
        })
        .unwrap();
    (doc, items, commit.update)
}

fn replica_of(update: &Update, client: u64) -> Document {
    let mut doc = Document::with_client_id(client);
    doc.apply_update(update).unwrap();
    doc
}

#[test]
fn test_update_replays_on_peer() {
    let (source, _, update) = seeded(1);
    let mut peer = Document::with_client_id(2);
    let commit = peer.apply_update(&update).unwrap();

    assert_eq!(commit.origin, Origin::Remote);
    assert!(!commit.is_local());
    assert_eq!(
        peer.to_json(&"state".into()),
        Some(json!({"title": "Groceries", "items": ["milk"]}))
    );
    assert_eq!(peer.to_json(&"state".into()), source.to_json(&"state".into()));
}

#[test]
fn test_node_ids_survive_replication() {
    let (source, items, update) = seeded(1);
    let peer = replica_of(&update, 2);

    let on_peer = peer.root("state").unwrap().get("items").unwrap().as_node().cloned();
    assert_eq!(on_peer, Some(items.clone()));
    assert_eq!(peer.node(&items).unwrap().parent(), Some(&NodeId::root("state")));
    assert_eq!(source.node(&items).unwrap().kind(), NodeKind::Ordered);
}

#[test]
fn test_remote_edit_events_target_changed_nodes() {
    let (mut source, items, seed) = seeded(1);
    let mut peer = replica_of(&seed, 2);

    let (_, local) = source
        .transact(Origin::Local, |txn| {
            txn.push_leaf(&items, json!("eggs"))?;
            txn.set_leaf(&"state".into(), "title", json!("Shopping"))
        })
        .unwrap();
    let remote = peer.apply_update(&local.update).unwrap();

    assert_eq!(remote.events.len(), 2);
    let root_event = remote.event_for(&NodeId::root("state")).unwrap();
    assert_eq!(
        root_event.changes,
        vec![Change::key("title", ChangeAction::Update)]
    );
    let items_event = remote.event_for(&items).unwrap();
    assert_eq!(
        items_event.changes,
        vec![Change::index(1, ChangeAction::Add)]
    );
}

#[test]
fn test_removal_events_are_sequential() {
    let mut doc = Document::with_client_id(1);
    let (root, _) = doc
        .transact(Origin::Local, |txn| {
            let root = txn.root("list", NodeKind::Ordered)?;
            for v in 0..4 {
                txn.push_leaf(&root, json!(v))?;
            }
            Ok::<_, DocError>(root)
        })
        .unwrap();

    let (_, commit) = doc
        .transact(Origin::Local, |txn| txn.remove_range(&root, 1, 2))
        .unwrap();
    assert_eq!(
        commit.events[0].changes,
        vec![
            Change::index(1, ChangeAction::Delete),
            Change::index(1, ChangeAction::Delete),
        ]
    );
    assert_eq!(doc.to_json(&root), Some(json!([0, 3])));
}

#[test]
fn test_encoded_update_round_trips() {
    let (source, _, update) = seeded(1);
    let decoded = Update::decode(&update.encode()).unwrap();
    assert_eq!(decoded, update);

    let peer = replica_of(&decoded, 2);
    assert_eq!(peer.to_json(&"state".into()), source.to_json(&"state".into()));
}

#[test]
fn test_undecodable_update_leaves_document_untouched() {
    let (source, _, seed) = seeded(1);
    let peer = replica_of(&seed, 2);
    let before = peer.to_json(&"state".into());

    let mut truncated = seed.encode();
    truncated.truncate(truncated.len() / 2);
    let err = Update::decode(&truncated).unwrap_err();
    assert!(matches!(err, Error::Doc(DocError::DecodeFailed { .. })));

    assert_eq!(peer.to_json(&"state".into()), before);
    assert_eq!(before, source.to_json(&"state".into()));
}

#[test]
fn test_replaying_an_update_twice_changes_nothing() {
    let (_, _, seed) = seeded(1);
    let mut peer = replica_of(&seed, 2);
    let before = peer.to_json(&"state".into());
    let nodes = peer.node_count();

    let again = peer.apply_update(&seed).unwrap();
    assert!(again.events.is_empty());
    assert_eq!(peer.to_json(&"state".into()), before);
    assert_eq!(peer.node_count(), nodes);
}

#[test]
fn test_concurrent_key_writes_converge() {
    let (mut a, _, seed) = seeded(1);
    let mut b = replica_of(&seed, 2);

    let (_, from_a) = a
        .transact(Origin::Local, |txn| {
            txn.set_leaf(&"state".into(), "title", json!("from a"))
        })
        .unwrap();
    let (_, from_b) = b
        .transact(Origin::Local, |txn| {
            txn.set_leaf(&"state".into(), "title", json!("from b"))
        })
        .unwrap();

    let on_a = a.apply_update(&from_b.update).unwrap();
    let on_b = b.apply_update(&from_a.update).unwrap();

    let state = a.to_json(&"state".into()).unwrap();
    assert_eq!(Some(state.clone()), b.to_json(&"state".into()));
    assert!(state["title"] == json!("from a") || state["title"] == json!("from b"));
    for event in on_a.events.iter().chain(&on_b.events) {
        assert_eq!(event.target, NodeId::root("state"));
        assert_eq!(event.changes, vec![Change::key("title", ChangeAction::Update)]);
    }
}

#[test]
fn test_concurrent_pushes_keep_both_items() {
    let (mut a, items, seed) = seeded(1);
    let mut b = replica_of(&seed, 2);

    let (_, from_a) = a
        .transact(Origin::Local, |txn| txn.push_leaf(&items, json!("eggs")))
        .unwrap();
    let (_, from_b) = b
        .transact(Origin::Local, |txn| txn.push_leaf(&items, json!("bread")))
        .unwrap();

    a.apply_update(&from_b.update).unwrap();
    let on_b = b.apply_update(&from_a.update).unwrap();

    let merged = a.to_json(&items).unwrap();
    assert_eq!(Some(merged.clone()), b.to_json(&items));
    let merged = merged.as_array().unwrap();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged[0], json!("milk"));
    assert!(merged.contains(&json!("eggs")));
    assert!(merged.contains(&json!("bread")));
    assert_eq!(on_b.event_for(&items).unwrap().changes.len(), 1);
}

#[test]
fn test_out_of_order_updates_converge() {
    let (mut source, items, seed) = seeded(1);
    let (_, second) = source
        .transact(Origin::Local, |txn| txn.push_leaf(&items, json!("eggs")))
        .unwrap();

    let mut peer = Document::with_client_id(2);
    peer.apply_update(&second.update).unwrap();
    assert!(peer.root("state").is_none());
    peer.apply_update(&seed).unwrap();

    assert_eq!(peer.to_json(&"state".into()), source.to_json(&"state".into()));
}

#[test]
fn test_state_vector_diff_catches_up_a_replica() {
    let (mut source, items, seed) = seeded(1);
    let mut peer = replica_of(&seed, 2);

    source
        .transact(Origin::Local, |txn| {
            txn.push_leaf(&items, json!("eggs"))?;
            txn.set_leaf(&"state".into(), "title", json!("Shopping"))
        })
        .unwrap();

    let missing = source.encode_diff(&peer.state_vector()).unwrap();
    let commit = peer.apply_update(&missing).unwrap();
    assert_eq!(commit.events.len(), 2);
    assert_eq!(peer.to_json(&"state".into()), source.to_json(&"state".into()));

    let fresh = replica_of(&source.encode_state(), 3);
    assert_eq!(fresh.to_json(&"state".into()), source.to_json(&"state".into()));
}

#[test]
fn test_bad_state_vector_is_a_decode_error() {
    let (source, _, _) = seeded(1);
    let err = source.encode_diff(&[0xff, 0xff, 0xff]).unwrap_err();
    assert!(err.is_update_error());
}

#[test]
fn test_decode_failure_maps_to_doc_error() {
    let err = Update::decode(&[0xff, 0xff, 0xff]).unwrap_err();
    assert!(err.is_doc_error());
    assert!(matches!(err, Error::Doc(DocError::DecodeFailed { .. })));
}
