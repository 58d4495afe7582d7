//! Query coordinator behavior: admission, freshness, failures and shutdown

use std::time::Duration;

use kodegen_tools_searchd::search::{CoordinatorState, QueryCoordinator, SearchError};
use kodegen_tools_searchd::store::MemoryStore;
use kodegen_tools_searchd::SearchConfig;
use tempfile::TempDir;
use tokio::sync::watch;

mod common;
use common::{built_engine, refs, settle};

fn coordinator_config(dir: &TempDir, max_queued: usize) -> SearchConfig {
    SearchConfig::builder()
        .index_path(dir.path().join("search.tantivy"))
        .min_sync_age(Duration::ZERO)
        .writer_memory(common::WRITER_MEMORY)
        .max_queued(max_queued)
        .refresh_interval(Duration::from_secs(3600))
        .build()
        .unwrap()
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.upsert("topic/1", r#"{"title": "Budget Meeting"}"#);
    store
}

#[tokio::test]
async fn test_submit_returns_search_results() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) =
        QueryCoordinator::new(engine, &coordinator_config(&dir, 5), shutdown_rx);
    let _task = coordinator.spawn();

    assert_eq!(refs(&handle.submit("budget").await.unwrap()), ["topic/1"]);
    assert!(handle.submit("elections").await.unwrap().is_empty());

    let stats = handle.stats();
    assert_eq!(stats.served, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.state, CoordinatorState::Running);
}

#[tokio::test]
async fn test_query_sees_changes_made_just_before_it() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) =
        QueryCoordinator::new(engine, &coordinator_config(&dir, 5), shutdown_rx);
    let _task = coordinator.spawn();

    settle().await;
    store.upsert("motion/2", r#"{"title": "Parking regulations"}"#);
    assert!(store.delete("topic/1"));

    assert_eq!(refs(&handle.submit("parking").await.unwrap()), ["motion/2"]);
    assert!(handle.submit("budget").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_queue_rejects_immediately() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let capacity = 3;
    let (coordinator, handle) =
        QueryCoordinator::new(engine, &coordinator_config(&dir, capacity), shutdown_rx);

    // The loop is not running yet, so nothing drains the queue.
    let mut waiting = Vec::new();
    for _ in 0..capacity {
        let handle = handle.clone();
        waiting.push(tokio::spawn(async move { handle.submit("budget").await }));
    }
    while handle.queued() < capacity {
        tokio::task::yield_now().await;
    }

    for _ in 0..2 {
        assert!(matches!(
            handle.submit("budget").await,
            Err(SearchError::QueueFull)
        ));
    }
    assert_eq!(handle.stats().rejected, 2);

    let _task = coordinator.spawn();
    for pending in waiting {
        assert_eq!(refs(&pending.await.unwrap().unwrap()), ["topic/1"]);
    }
    assert_eq!(handle.stats().served, capacity);
}

#[tokio::test]
async fn test_store_outage_fails_query_explicitly() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) =
        QueryCoordinator::new(engine, &coordinator_config(&dir, 5), shutdown_rx);
    let _task = coordinator.spawn();

    store.set_unavailable(true);
    let result = handle.submit("budget").await;
    assert!(matches!(result, Err(SearchError::Connection(_))));

    store.set_unavailable(false);
    assert_eq!(refs(&handle.submit("budget").await.unwrap()), ["topic/1"]);

    let stats = handle.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.refresh_failures, 1);
    assert_eq!(stats.served, 1);
}

#[tokio::test]
async fn test_timer_refreshes_without_queries() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let config = SearchConfig::builder()
        .index_path(dir.path().join("search.tantivy"))
        .min_sync_age(Duration::ZERO)
        .writer_memory(common::WRITER_MEMORY)
        .refresh_interval(Duration::from_millis(20))
        .build()
        .unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) = QueryCoordinator::new(engine, &config, shutdown_rx);
    let task = coordinator.spawn();

    settle().await;
    store.upsert("topic/2", r#"{"title": "Elections"}"#);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while handle.stats().refreshes < 2 {
        assert!(tokio::time::Instant::now() < deadline, "timer never refreshed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    let engine = task.await.unwrap();
    assert_eq!(engine.num_docs(), 2);
    assert_eq!(engine.tracker().num_entries(), 2);
}

#[tokio::test]
async fn test_shutdown_returns_engine_and_stops_admission() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) =
        QueryCoordinator::new(engine, &coordinator_config(&dir, 5), shutdown_rx);
    let task = coordinator.spawn();

    assert_eq!(refs(&handle.submit("budget").await.unwrap()), ["topic/1"]);

    shutdown_tx.send(true).unwrap();
    let mut engine = task.await.unwrap();
    assert_eq!(handle.state(), CoordinatorState::Stopped);
    assert!(matches!(
        handle.submit("budget").await,
        Err(SearchError::ServiceStopped)
    ));

    let path = engine.index_path().to_path_buf();
    engine.close().await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_queued_queries_fail_when_shutdown_wins() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) =
        QueryCoordinator::new(engine, &coordinator_config(&dir, 5), shutdown_rx);

    let mut waiting = Vec::new();
    for _ in 0..2 {
        let handle = handle.clone();
        waiting.push(tokio::spawn(async move { handle.submit("budget").await }));
    }
    while handle.queued() < 2 {
        tokio::task::yield_now().await;
    }

    // Cancellation is checked first, so the loop exits before serving anything.
    shutdown_tx.send(true).unwrap();
    coordinator.run().await;

    for pending in waiting {
        assert!(matches!(
            pending.await.unwrap(),
            Err(SearchError::ServiceStopped)
        ));
    }
    assert_eq!(handle.stats().served, 0);
    assert_eq!(handle.state(), CoordinatorState::Stopped);
}

#[tokio::test]
async fn test_loop_keeps_running_after_handles_are_dropped() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let engine = built_engine(&dir, &store).await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) =
        QueryCoordinator::new(engine, &coordinator_config(&dir, 5), shutdown_rx);
    let task = coordinator.spawn();

    drop(handle);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!task.is_finished());

    drop(shutdown_tx);
    let engine = task.await.unwrap();
    assert!(engine.is_open());
}
