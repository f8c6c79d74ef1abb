mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use common::*;
use dibantuin::error::{Error, ResolveError};
use dibantuin::models::{CollectionPath, Snapshot};
use dibantuin::services::{enrich_snapshot, RosterDeps, RosterOptions, RosterState, RosterView};
use dibantuin::storage::MemoryStore;

const APP_ID: &str = "test-app";

fn path() -> CollectionPath {
    CollectionPath::vendors(APP_ID)
}

fn view(auth: FakeAuth, store: &MemoryStore, blobs: Arc<FakeBlobs>) -> RosterView {
    let deps = RosterDeps {
        auth: Arc::new(auth),
        store: Arc::new(store.clone()),
        blobs,
    };
    RosterView::new(deps, RosterOptions::new(APP_ID).with_placeholder(PLACEHOLDER))
}

#[tokio::test]
async fn test_resolved_image_becomes_profile_pic() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", Some("img/budi.png"))]);
    let blobs = Arc::new(FakeBlobs::new().with("img/budi.png", Ok("https://cdn/budi.png")));
    let view = view(FakeAuth::ok(), &store, blobs);
    let mut states = view.state();

    let _handle = view.activate().unwrap();
    let state = wait_for(&mut states, |s| matches!(s, RosterState::Populated(_))).await;

    let vendors = state.vendors();
    assert_eq!(vendors.len(), 1);
    assert_eq!(vendors[0].id, "1");
    assert_eq!(vendors[0].name(), "Budi");
    assert_eq!(vendors[0].profile_pic, "https://cdn/budi.png");
}

#[tokio::test]
async fn test_failed_resolution_uses_placeholder_for_that_record_only() {
    let store = MemoryStore::new();
    store.replace(
        &path(),
        vec![
            vendor("1", "Budi", Some("img/budi.png")),
            vendor("2", "Santi", Some("img/santi.png")),
            vendor("3", "Joko", None),
        ],
    );
    let blobs = Arc::new(
        FakeBlobs::new()
            .with("img/budi.png", Err(ResolveError::NotFound("img/budi.png".to_string())))
            .with("img/santi.png", Ok("https://cdn/santi.png")),
    );
    let view = view(FakeAuth::ok(), &store, blobs);
    let mut states = view.state();

    let _handle = view.activate().unwrap();
    let state = wait_for(&mut states, |s| matches!(s, RosterState::Populated(_))).await;

    let pics: Vec<&str> = state.vendors().iter().map(|v| v.profile_pic.as_str()).collect();
    assert_eq!(pics, vec![PLACEHOLDER, "https://cdn/santi.png", PLACEHOLDER]);
    assert!(state.vendors().iter().all(|v| !v.profile_pic.is_empty()));
}

#[tokio::test]
async fn test_loading_until_first_snapshot() {
    let store = MemoryStore::new();
    let view = view(FakeAuth::ok(), &store, Arc::new(FakeBlobs::new()));

    assert_eq!(view.current(), RosterState::Idle);
    let _handle = view.activate().unwrap();
    settle().await;

    assert_eq!(view.current(), RosterState::Loading);
    assert_eq!(store.subscriber_count(&path()), 1);
}

#[tokio::test]
async fn test_zero_records_is_empty_not_loading() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![]);
    let view = view(FakeAuth::ok(), &store, Arc::new(FakeBlobs::new()));
    let mut states = view.state();

    let _handle = view.activate().unwrap();
    let state = wait_for(&mut states, |s| !s.is_loading()).await;

    assert_eq!(state, RosterState::Empty);
}

#[tokio::test]
async fn test_subscription_failure_ends_in_empty() {
    let store = MemoryStore::new();
    let view = view(FakeAuth::ok(), &store, Arc::new(FakeBlobs::new()));
    let mut states = view.state();

    let _handle = view.activate().unwrap();
    settle().await;
    store.fail(&path(), "permission denied");

    let state = wait_for(&mut states, |s| !s.is_loading()).await;
    assert_eq!(state, RosterState::Empty);
}

#[tokio::test]
async fn test_snapshots_reenter_populated_and_empty() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", None)]);
    let view = view(FakeAuth::ok(), &store, Arc::new(FakeBlobs::new()));
    let mut states = view.state();
    let _handle = view.activate().unwrap();

    wait_for(&mut states, |s| s.vendors().len() == 1).await;

    store.replace(&path(), vec![]);
    wait_for(&mut states, |s| *s == RosterState::Empty).await;

    store.replace(&path(), vec![vendor("2", "Santi", None), vendor("3", "Joko", None)]);
    let state = wait_for(&mut states, |s| s.vendors().len() == 2).await;

    let names: Vec<&str> = state.vendors().iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["Santi", "Joko"]);
}

#[tokio::test]
async fn test_snapshot_after_teardown_changes_nothing() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", None)]);
    let view = view(FakeAuth::ok(), &store, Arc::new(FakeBlobs::new()));
    let mut states = view.state();
    let handle = view.activate().unwrap();
    wait_for(&mut states, |s| matches!(s, RosterState::Populated(_))).await;

    handle.deactivate();
    handle.deactivate();
    assert_eq!(view.current(), RosterState::Cancelled);
    assert!(!handle.is_active());

    store.replace(&path(), vec![]);
    settle().await;

    assert_eq!(view.current(), RosterState::Cancelled);
    assert_eq!(store.subscriber_count(&path()), 0);
}

#[tokio::test]
async fn test_in_flight_enrichment_is_discarded_on_teardown() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", Some("img/budi.png"))]);
    let gate = Arc::new(Semaphore::new(0));
    let blobs = Arc::new(
        FakeBlobs::new()
            .with("img/budi.png", Ok("https://cdn/budi.png"))
            .gated(Arc::clone(&gate)),
    );
    let view = view(FakeAuth::ok(), &store, Arc::clone(&blobs));
    let handle = view.activate().unwrap();

    tokio::time::timeout(Duration::from_secs(2), blobs.started.notified())
        .await
        .expect("resolution should start");
    assert!(view.current().is_loading());

    handle.deactivate();
    gate.add_permits(1);
    settle().await;

    assert_eq!(view.current(), RosterState::Cancelled);
}

#[tokio::test]
async fn test_dropping_handle_deactivates() {
    let store = MemoryStore::new();
    let view = view(FakeAuth::ok(), &store, Arc::new(FakeBlobs::new()));

    let handle = view.activate().unwrap();
    drop(handle);

    assert_eq!(view.current(), RosterState::Cancelled);
    store.replace(&path(), vec![vendor("1", "Budi", None)]);
    settle().await;
    assert_eq!(view.current(), RosterState::Cancelled);
}

#[tokio::test]
async fn test_view_activates_once() {
    let store = MemoryStore::new();
    let view = view(FakeAuth::ok(), &store, Arc::new(FakeBlobs::new()));

    let _handle = view.activate().unwrap();
    assert!(matches!(view.activate(), Err(Error::AlreadyActive)));
}

#[tokio::test]
async fn test_auth_failure_still_loads_roster() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", None)]);
    let view = view(FakeAuth::failing(), &store, Arc::new(FakeBlobs::new()));
    let mut states = view.state();

    let _handle = view.activate().unwrap();
    let state = wait_for(&mut states, |s| !s.is_loading()).await;

    assert_eq!(state.vendors().len(), 1);
    assert_eq!(state.vendors()[0].profile_pic, PLACEHOLDER);
}

#[tokio::test]
async fn test_subscribes_only_after_auth_finishes() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", None)]);
    let gate = Arc::new(Semaphore::new(0));
    let auth = FakeAuth::ok().gated(Arc::clone(&gate));
    let deps = RosterDeps {
        auth: Arc::new(auth),
        store: Arc::new(store.clone()),
        blobs: Arc::new(FakeBlobs::new()),
    };
    let view = RosterView::new(deps, RosterOptions::new(APP_ID).with_auth_token("custom-token"));
    let mut states = view.state();
    let _handle = view.activate().unwrap();

    settle().await;
    assert_eq!(store.subscriber_count(&path()), 0);
    assert!(view.current().is_loading());

    gate.add_permits(1);
    wait_for(&mut states, |s| s.vendors().len() == 1).await;
    assert_eq!(store.subscriber_count(&path()), 1);
}

#[tokio::test]
async fn test_store_closing_before_any_snapshot_is_empty() {
    struct ClosedStore;

    impl dibantuin::storage::DocumentStore for ClosedStore {
        fn subscribe(&self, _path: &CollectionPath) -> dibantuin::storage::Subscription {
            let (_sender, subscription) = dibantuin::storage::Subscription::channel();
            subscription
        }
    }

    let deps = RosterDeps {
        auth: Arc::new(FakeAuth::ok()),
        store: Arc::new(ClosedStore),
        blobs: Arc::new(FakeBlobs::new()),
    };
    let view = RosterView::new(deps, RosterOptions::new(APP_ID));
    let mut states = view.state();
    let handle = view.activate().unwrap();

    let state = wait_for(&mut states, |s| !s.is_loading()).await;
    assert_eq!(state, RosterState::Empty);

    handle.finished().await;
    assert_eq!(view.current(), RosterState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_resolutions_run_concurrently_and_keep_order() {
    let blobs = FakeBlobs::new()
        .with("img/slow.png", Ok("https://cdn/slow.png"))
        .with("img/fast.png", Ok("https://cdn/fast.png"))
        .with_delay("img/slow.png", Duration::from_millis(100))
        .with_delay("img/fast.png", Duration::from_millis(100));
    let snapshot = Snapshot::new(vec![
        vendor("1", "Budi", Some("img/slow.png")),
        vendor("2", "Santi", Some("img/fast.png")),
    ]);

    let started = tokio::time::Instant::now();
    let vendors = enrich_snapshot(&blobs, &snapshot, PLACEHOLDER).await;

    assert!(started.elapsed() < Duration::from_millis(150));
    let pics: Vec<&str> = vendors.iter().map(|v| v.profile_pic.as_str()).collect();
    assert_eq!(pics, vec!["https://cdn/slow.png", "https://cdn/fast.png"]);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_sign_in_times_out_and_subscribes() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", None)]);
    let gate = Arc::new(Semaphore::new(0));
    let deps = RosterDeps {
        auth: Arc::new(FakeAuth::ok().gated(Arc::clone(&gate))),
        store: Arc::new(store.clone()),
        blobs: Arc::new(FakeBlobs::new()),
    };
    let options = RosterOptions::new(APP_ID)
        .with_placeholder(PLACEHOLDER)
        .with_auth_timeout(Duration::from_millis(500));
    let view = RosterView::new(deps, options);
    let mut states = view.state();
    let _handle = view.activate().unwrap();

    let state = wait_for(&mut states, |s| !s.is_loading()).await;

    assert_eq!(state.vendors().len(), 1);
    assert_eq!(state.vendors()[0].profile_pic, PLACEHOLDER);
    assert_eq!(store.subscriber_count(&path()), 1);
    assert_eq!(gate.available_permits(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_last_delivered_snapshot_wins_over_slower_earlier_one() {
    let store = MemoryStore::new();
    store.replace(&path(), vec![vendor("1", "Budi", Some("img/slow.png"))]);
    let blobs = Arc::new(
        FakeBlobs::new()
            .with("img/slow.png", Ok("https://cdn/slow.png"))
            .with("img/fresh.png", Ok("https://cdn/fresh.png"))
            .with_delay("img/slow.png", Duration::from_millis(500)),
    );
    let view = view(FakeAuth::ok(), &store, Arc::clone(&blobs));
    let mut states = view.state();
    let _handle = view.activate().unwrap();

    tokio::time::timeout(Duration::from_secs(2), blobs.started.notified())
        .await
        .expect("first resolution should start");
    store.replace(&path(), vec![vendor("2", "Santi", Some("img/fresh.png"))]);

    let mut published = Vec::new();
    let latest = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            states.changed().await.unwrap();
            let state = states.borrow_and_update().clone();
            published.push(state.clone());
            if state.vendors().first().map(|v| v.id.as_str()) == Some("2") {
                return state;
            }
        }
    })
    .await
    .expect("second snapshot should be published");

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(view.current(), latest);
    assert_eq!(latest.vendors()[0].profile_pic, "https://cdn/fresh.png");
    let first_ids: Vec<&str> = published
        .iter()
        .filter_map(|s| s.vendors().first().map(|v| v.id.as_str()))
        .collect();
    assert_eq!(first_ids.last(), Some(&"2"));
    assert!(first_ids.iter().position(|id| *id == "1") < first_ids.iter().position(|id| *id == "2"));
}
