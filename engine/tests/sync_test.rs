//! Synchronization runs against a scripted remote store.

mod common;

use common::{record, Call, MockRemote, User};
use serde_json::{json, Value};
use std::sync::Arc;
use tidewater_engine::{
    Document, Entity, Error, LocalStore, MemoryStore, Method, Patchable, Predicate, Record,
    Resource, SyncConfig, SyncReport, SyncState, Synchronizer, DEFAULT_ID_KEY,
};

fn synchronizer<E: Entity>(
    local: &Arc<MemoryStore<E>>,
    remote: &Arc<MockRemote>,
) -> Synchronizer<MemoryStore<E>, MockRemote> {
    Synchronizer::new(
        Arc::clone(local),
        Resource::new(Arc::clone(remote), SyncConfig::new("users")),
    )
}

async fn seed<E: Entity>(local: &MemoryStore<E>, records: Vec<Value>) {
    for value in records {
        local.create(record(value), DEFAULT_ID_KEY).await.unwrap();
    }
}

async fn names(local: &MemoryStore<User>) -> Vec<(String, String)> {
    let mut names: Vec<_> = local
        .search(None)
        .await
        .unwrap()
        .into_iter()
        .map(|user| (user.id.clone(), user.first_name.clone()))
        .collect();
    names.sort();
    names
}

/// Bulk upsert assigns sequential identifiers; the pull serves `pulled`.
fn scripted(pulled: Value) -> Arc<MockRemote> {
    MockRemote::new(move |call: &Call| match (call.method, call.path.as_str()) {
        (Method::Post, "users/collection") => {
            let sent = call
                .parameters
                .as_ref()
                .and_then(|p| p.get("data"))
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            let ids: Vec<Value> = (0..sent)
                .map(|i| json!({"_id": format!("pushed-{i}")}))
                .collect();
            Ok(Value::Array(ids))
        }
        (Method::Get, "users") => Ok(pulled.clone()),
        _ => Err(Error::ServerError(404)),
    })
}

#[tokio::test]
async fn full_run_reconciles_both_sides() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(
        &local,
        vec![
            json!({"_id": "firstID", "firstName": "firstFN", "lastName": "firstLN"}),
            json!({"firstName": "secondFN"}),
            json!({"firstName": "thirdFN"}),
        ],
    )
    .await;

    let remote = MockRemote::new(|call: &Call| match (call.method, call.path.as_str()) {
        (Method::Post, "users/collection") => {
            Ok(json!([{"_id": "secondID"}, {"_id": "thirdID"}]))
        }
        (Method::Get, "users") => Ok(json!([
            {"_id": "firstID", "firstName": "Luciano", "lastName": "Polit"},
            {"_id": "secondID", "firstName": "secondFN"},
            {"_id": "fourthID", "firstName": "fourthFN"},
        ])),
        _ => Err(Error::ServerError(404)),
    });

    let report = synchronizer(&local, &remote).synchronize().await.unwrap();

    assert_eq!(
        report,
        SyncReport {
            pushed: 2,
            updated: 2,
            created: 1,
            deleted: 1,
        }
    );
    assert_eq!(
        names(&local).await,
        vec![
            ("firstID".to_string(), "Luciano".to_string()),
            ("fourthID".to_string(), "fourthFN".to_string()),
            ("secondID".to_string(), "secondFN".to_string()),
        ]
    );

    let first = local
        .search(Some(Predicate::IdEquals("firstID".into())))
        .await
        .unwrap();
    assert_eq!(first[0].last_name.as_deref(), Some("Polit"));

    let all = local.search(None).await.unwrap();
    assert!(all.iter().all(|user| user.is_synchronized()));

    let calls = remote.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].path, "users/collection");
    assert_eq!(
        calls[0].parameters,
        Some(record(json!({
            "data": [{"firstName": "secondFN"}, {"firstName": "thirdFN"}]
        })))
    );
    assert_eq!(calls[1].method, Method::Get);
    assert_eq!(calls[1].path, "users");
}

#[tokio::test]
async fn push_is_skipped_when_everything_is_synchronized() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(&local, vec![json!({"_id": "a", "firstName": "Ada"})]).await;

    let remote = scripted(json!([{"_id": "a", "firstName": "Ada"}]));
    let report = synchronizer(&local, &remote).synchronize().await.unwrap();

    assert_eq!(report.pushed, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(remote.call_count(), 1);
    assert_eq!(remote.calls()[0].method, Method::Get);
}

#[tokio::test]
async fn pulled_records_become_synchronized_entities() {
    let local = Arc::new(MemoryStore::<Document>::new());
    let remote = scripted(json!([
        {"_id": "a", "title": "first", "tags": ["x"]},
        {"_id": "b", "title": "second"},
    ]));

    let report = synchronizer(&local, &remote).synchronize().await.unwrap();
    assert_eq!(report.created, 2);

    let docs = local.search(None).await.unwrap();
    assert_eq!(docs.len(), 2);
    for doc in &docs {
        assert!(doc.is_synchronized());
        assert_eq!(doc.snapshot(), &doc.to_record());
    }
}

#[tokio::test]
async fn entities_missing_remotely_are_swept() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(
        &local,
        vec![
            json!({"_id": "kept", "firstName": "Kept"}),
            json!({"_id": "gone", "firstName": "Gone"}),
        ],
    )
    .await;

    let remote = scripted(json!([{"_id": "kept", "firstName": "Kept"}]));
    let report = synchronizer(&local, &remote).synchronize().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(
        names(&local).await,
        vec![("kept".to_string(), "Kept".to_string())]
    );
}

#[tokio::test]
async fn empty_pull_sweeps_everything() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(
        &local,
        vec![
            json!({"_id": "a", "firstName": "A"}),
            json!({"_id": "b", "firstName": "B"}),
        ],
    )
    .await;

    let remote = scripted(json!([]));
    let report = synchronizer(&local, &remote).synchronize().await.unwrap();

    assert_eq!(report.deleted, 2);
    assert!(local.is_empty().await);
}

#[tokio::test]
async fn failed_pull_restores_staged_entities() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(
        &local,
        vec![
            json!({"_id": "a", "firstName": "A"}),
            json!({"_id": "b", "firstName": "B"}),
            json!({"firstName": "pending"}),
        ],
    )
    .await;

    let remote = MockRemote::new(|call: &Call| match call.method {
        Method::Post => Ok(json!([{"_id": "c"}])),
        _ => Err(Error::ServerError(503)),
    });

    let result = synchronizer(&local, &remote).synchronize().await;
    assert!(matches!(result, Err(Error::ServerError(503))));

    let all = local.search(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|user| user.is_synchronized()));
    assert_eq!(
        names(&local).await,
        vec![
            ("a".to_string(), "A".to_string()),
            ("b".to_string(), "B".to_string()),
            ("c".to_string(), "pending".to_string()),
        ]
    );
}

#[tokio::test]
async fn failed_pull_keeps_dirty_entities_dirty() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(&local, vec![json!({"_id": "a", "firstName": "A"})]).await;

    let synchronizer = synchronizer(&local, &MockRemote::failing(Error::ServerError(500)));

    let mut user = local.search(None).await.unwrap().remove(0);
    user.first_name = "Edited".into();
    user.set_synchronized(false);
    local.update(user).await.unwrap();

    let result = synchronizer
        .pull_with(async { Err::<Vec<Record>, _>(Error::BadResponse("offline".into())) })
        .await;
    assert!(matches!(result, Err(Error::BadResponse(_))));

    let dirty = local
        .search(Some(Predicate::Synchronized(false)))
        .await
        .unwrap();
    assert_eq!(dirty.len(), 1);
    assert_eq!(dirty[0].sync_state(), SyncState::Dirty);
}

#[tokio::test]
async fn failed_push_aborts_before_staging() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(
        &local,
        vec![
            json!({"_id": "a", "firstName": "A"}),
            json!({"firstName": "pending"}),
        ],
    )
    .await;

    let remote = MockRemote::failing(Error::ServerError(502));
    let result = synchronizer(&local, &remote).synchronize().await;

    assert!(matches!(result, Err(Error::ServerError(502))));
    assert_eq!(remote.call_count(), 1);

    let synced = local
        .search(Some(Predicate::Synchronized(true)))
        .await
        .unwrap();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].id(), "a");
}

#[tokio::test]
async fn custom_pull_leaves_unreturned_entities_for_the_sweep() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(
        &local,
        vec![
            json!({"_id": "a", "firstName": "A"}),
            json!({"_id": "b", "firstName": "B"}),
        ],
    )
    .await;

    let remote = scripted(json!([]));
    let synchronizer = synchronizer(&local, &remote);

    let filtered = vec![record(json!({"_id": "a", "firstName": "A2"}))];
    let report = synchronizer.pull_with(async { Ok::<_, Error>(filtered) }).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(local.len().await, 2);
    assert_eq!(remote.call_count(), 0);

    let unconfirmed = local
        .search(Some(Predicate::Synchronized(false)))
        .await
        .unwrap();
    assert_eq!(unconfirmed.len(), 1);
    assert_eq!(unconfirmed[0].id(), "b");

    assert_eq!(synchronizer.sweep().await.unwrap(), 1);
    assert_eq!(
        names(&local).await,
        vec![("a".to_string(), "A2".to_string())]
    );
}

#[tokio::test]
async fn custom_search_is_awaited_after_push() {
    let local = Arc::new(MemoryStore::<User>::new());
    seed(&local, vec![json!({"firstName": "pending"})]).await;

    let remote = scripted(json!([]));
    let synchronizer = synchronizer(&local, &remote);

    let resource = Resource::new(Arc::clone(&remote), SyncConfig::new("users"));
    let mut filter = Record::new();
    filter.insert("firstName".into(), json!("pending"));

    let report = synchronizer
        .synchronize_with(resource.search_with(Some(&filter)))
        .await
        .unwrap();

    let calls = remote.calls();
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[1].method, Method::Get);
    assert_eq!(calls[1].parameters, Some(filter));
    assert_eq!(report.pushed, 1);
    assert_eq!(report.deleted, 1);
}

#[tokio::test]
async fn reconcile_skips_unusable_records() {
    let local = Arc::new(MemoryStore::<User>::new());
    let remote = scripted(json!([]));

    let report = synchronizer(&local, &remote)
        .reconcile(vec![
            record(json!({"_id": "a", "firstName": "A"})),
            record(json!({"firstName": "no id"})),
            record(json!({"_id": "b"})),
        ])
        .await
        .unwrap();

    // Both identified records are handed over; the store drops the one it
    // cannot build an entity from.
    assert_eq!(report.created, 2);
    assert_eq!(names(&local).await, vec![("a".to_string(), "A".to_string())]);
}

#[tokio::test]
async fn large_pull_commits_in_batches() {
    let local = Arc::new(MemoryStore::<User>::new());
    let remote = scripted(json!([]));

    let records = (0..250)
        .map(|i| record(json!({"_id": format!("u{i}"), "firstName": "N"})))
        .collect();
    let report = synchronizer(&local, &remote)
        .reconcile(records)
        .await
        .unwrap();

    assert_eq!(report.created, 250);
    assert_eq!(local.len().await, 250);
    assert_eq!(local.commits().await, 3);
}

#[tokio::test]
async fn custom_identifier_key_matches_and_keeps_local_data() {
    let local = Arc::new(MemoryStore::<Document>::new());
    local
        .create(record(json!({"uuid": "a", "n": 1})), "uuid")
        .await
        .unwrap();
    local.create(record(json!({"n": 5})), "uuid").await.unwrap();

    let remote = MockRemote::new(|call: &Call| match (call.method, call.path.as_str()) {
        (Method::Post, "users/collection") => Ok(json!([{"uuid": "b"}])),
        (Method::Get, "users") => Ok(json!([
            {"uuid": "a", "n": 2},
            {"uuid": "b", "n": 5},
            {"uuid": "c", "n": 7},
        ])),
        _ => Err(Error::ServerError(404)),
    });
    let synchronizer = Synchronizer::new(
        Arc::clone(&local),
        Resource::new(
            Arc::clone(&remote),
            SyncConfig::new("users").with_id_key("uuid"),
        ),
    );

    let report = synchronizer.synchronize().await.unwrap();

    assert_eq!(
        report,
        SyncReport {
            pushed: 1,
            updated: 2,
            created: 1,
            deleted: 0,
        }
    );
    assert_eq!(
        remote.calls()[0].parameters,
        Some(record(json!({"data": [{"n": 5}]})))
    );

    let mut docs: Vec<_> = local
        .search(None)
        .await
        .unwrap()
        .into_iter()
        .map(|doc| (doc.id().to_string(), doc.get("n").cloned(), doc.is_synchronized()))
        .collect();
    docs.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        docs,
        vec![
            ("a".to_string(), Some(json!(2)), true),
            ("b".to_string(), Some(json!(5)), true),
            ("c".to_string(), Some(json!(7)), true),
        ]
    );
}
