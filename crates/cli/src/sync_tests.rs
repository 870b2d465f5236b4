// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use outpost_core::{ManualClock, MemoryStore, RequestDescriptor, Response};
use tokio::time::Instant;

use super::*;
use crate::cache::CacheConfig;
use crate::connectivity::MonitorConfig;
use crate::intercept::Interceptor;
use crate::test_helpers::{get_item, post_order, sink, MockTransport};
use crate::transport::{Transport, TransportError};

struct Fixture {
    orchestrator: SyncOrchestrator,
    monitor: ConnectivityMonitor,
    queue: WriteQueue,
    cache: Arc<ResponseCache>,
    transport: Arc<MockTransport>,
}

async fn fixture(
    transport: MockTransport,
    state: ConnectivityState,
    config: SyncConfig,
) -> Fixture {
    fixture_with_clock(transport, state, config, Arc::new(ManualClock::default())).await
}

async fn fixture_with_clock(
    transport: MockTransport,
    state: ConnectivityState,
    config: SyncConfig,
    clock: Arc<ManualClock>,
) -> Fixture {
    let transport = Arc::new(transport);
    let store = Arc::new(MemoryStore::new());
    let diagnostics = sink();
    let monitor = ConnectivityMonitor::new(
        transport.clone(),
        MonitorConfig::default(),
        state,
        diagnostics.clone(),
    );
    let cache = Arc::new(
        ResponseCache::new(store.clone(), CacheConfig::default(), diagnostics.clone())
            .with_clock(clock),
    );
    let queue = WriteQueue::load(store, transport.clone(), diagnostics)
        .await
        .unwrap();
    let orchestrator =
        SyncOrchestrator::new(monitor.clone(), queue.clone(), cache.clone(), config);
    Fixture {
        orchestrator,
        monitor,
        queue,
        cache,
        transport,
    }
}

fn order(n: u32) -> RequestDescriptor {
    RequestDescriptor::post(format!("/orders/{n}"))
}

async fn wait_for_status(orchestrator: &SyncOrchestrator, expected: SyncStatus) {
    let mut rx = orchestrator.watch_status();
    rx.wait_for(|status| *status == expected).await.unwrap();
}

#[tokio::test]
async fn offline_write_syncs_after_reconnect() {
    let f = fixture(
        MockTransport::offline(),
        ConnectivityState::Offline,
        SyncConfig::default(),
    )
    .await;
    let interceptor = Interceptor::wrap(
        f.transport.clone(),
        f.monitor.clone(),
        f.cache.clone(),
        f.queue.clone(),
    );
    f.orchestrator.attach().await;

    let response = interceptor.send(post_order("x")).await.unwrap();
    assert_eq!(response.json().unwrap()["queued"], true);
    assert_eq!(f.queue.len().await, 1);
    assert_eq!(f.orchestrator.status(), SyncStatus::Offline);

    // Network returns and the probe confirms it
    f.transport.set_online(true);
    f.monitor.notify_online().await;
    wait_for_status(&f.orchestrator, SyncStatus::Online).await;

    assert!(f.queue.is_empty().await);
    assert!(f.transport.sent_urls().contains(&"/orders".to_string()));
    f.orchestrator.detach();
    f.monitor.stop();
}

#[tokio::test(start_paused = true)]
async fn retries_back_off_linearly_until_success() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig::default(),
    )
    .await;
    f.queue.enqueue(order(1)).await.unwrap();
    f.transport
        .push_outcome(Err(TransportError::Unreachable("down".into())));
    f.transport
        .push_outcome(Err(TransportError::Unreachable("down".into())));

    let started = Instant::now();
    let result = f.orchestrator.sync_with_retries().await;

    assert!(result.success);
    // 1 * 2s after the first attempt, 2 * 2s after the second
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(f.transport.sent().len(), 3);
    assert_eq!(f.orchestrator.status(), SyncStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn first_success_stops_retrying() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig::default(),
    )
    .await;
    f.queue.enqueue(order(1)).await.unwrap();

    let started = Instant::now();
    f.orchestrator.sync_with_retries().await;

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(f.transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_error() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig::default(),
    )
    .await;
    f.queue.enqueue(order(1)).await.unwrap();
    f.transport.fail_url("/orders/1");

    let started = Instant::now();
    let result = f.orchestrator.sync_with_retries().await;

    assert!(!result.success);
    // No sleep after the final attempt
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(f.transport.sent().len(), 3);
    match f.orchestrator.status() {
        SyncStatus::Error {
            remaining,
            attempts,
            ..
        } => {
            assert_eq!(remaining, 1);
            assert_eq!(attempts, 3);
        }
        other => unreachable!("unexpected status {other:?}"),
    }
}

#[tokio::test]
async fn sync_now_fails_fast_offline() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Offline,
        SyncConfig::default(),
    )
    .await;
    f.queue.enqueue(order(1)).await.unwrap();

    let result = f.orchestrator.sync_now().await;

    assert_eq!(result, Err(SyncError::Offline));
    assert!(f.transport.sent().is_empty());
    assert_eq!(f.queue.len().await, 1);
}

#[tokio::test]
async fn sync_now_makes_a_single_attempt() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig::default(),
    )
    .await;
    f.queue.enqueue(order(1)).await.unwrap();
    f.queue.enqueue(order(2)).await.unwrap();
    f.transport.fail_url("/orders/2");

    let result = f.orchestrator.sync_now().await.unwrap();

    assert!(!result.success);
    assert_eq!(result.remaining, 1);
    assert_eq!(f.transport.sent().len(), 2);
    assert!(matches!(
        f.orchestrator.status(),
        SyncStatus::Error { attempts: 1, .. }
    ));
}

#[tokio::test]
async fn reconnect_without_auto_sync_only_updates_status() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Offline,
        SyncConfig {
            auto_sync: false,
            ..SyncConfig::default()
        },
    )
    .await;
    f.queue.enqueue(order(1)).await.unwrap();
    f.orchestrator.attach().await;

    f.monitor.probe().await;
    wait_for_status(&f.orchestrator, SyncStatus::Online).await;

    assert_eq!(f.queue.len().await, 1);
    // Only the probe went out
    assert_eq!(f.transport.sent().len(), 1);
    f.orchestrator.detach();
}

#[tokio::test]
async fn offline_transition_is_mirrored() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig::default(),
    )
    .await;
    f.orchestrator.attach().await;

    f.monitor.notify_offline();

    wait_for_status(&f.orchestrator, SyncStatus::Offline).await;
    f.orchestrator.detach();
}

#[tokio::test(start_paused = true)]
async fn periodic_reflush_while_online() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig::default(),
    )
    .await;
    f.orchestrator.attach().await;
    f.queue.enqueue(order(1)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert!(f.queue.is_empty().await);
    assert!(f.transport.sent_urls().contains(&"/orders/1".to_string()));
    f.orchestrator.detach();
}

#[tokio::test(start_paused = true)]
async fn no_periodic_reflush_while_offline() {
    let f = fixture(
        MockTransport::offline(),
        ConnectivityState::Offline,
        SyncConfig::default(),
    )
    .await;
    f.orchestrator.attach().await;
    f.queue.enqueue(order(1)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(125)).await;

    assert_eq!(f.queue.len().await, 1);
    assert!(!f.transport.sent_urls().contains(&"/orders/1".to_string()));
    f.orchestrator.detach();
}

#[tokio::test(start_paused = true)]
async fn zero_interval_disables_reflush() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig {
            resync_interval: Duration::ZERO,
            ..SyncConfig::default()
        },
    )
    .await;
    f.orchestrator.attach().await;
    f.queue.enqueue(order(1)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(f.queue.len().await, 1);
    f.orchestrator.detach();
}

#[tokio::test]
async fn detach_unsubscribes_from_monitor() {
    let f = fixture(
        MockTransport::new(),
        ConnectivityState::Offline,
        SyncConfig::default(),
    )
    .await;
    f.orchestrator.attach().await;
    f.orchestrator.attach().await;
    assert_eq!(f.monitor.listener_count(), 1);
    assert!(f.orchestrator.is_attached());

    f.orchestrator.detach();

    assert_eq!(f.monitor.listener_count(), 0);
    assert!(!f.monitor.timer_running());
    assert!(!f.orchestrator.is_attached());
}

#[tokio::test]
async fn attach_purges_expired_cache_entries() {
    let clock = Arc::new(ManualClock::default());
    let f = fixture_with_clock(
        MockTransport::new(),
        ConnectivityState::Online,
        SyncConfig::default(),
        clock.clone(),
    )
    .await;
    f.cache
        .store(&get_item(1), &Response::new(200, Vec::new(), "old"))
        .await;
    clock.advance(chrono::Duration::hours(25));

    f.orchestrator.attach().await;

    assert!(f.cache.list_keys().await.unwrap().is_empty());
    f.orchestrator.detach();
}

#[yare::parameterized(
    first = { 2_000, 1, Duration::from_secs(2) },
    third = { 2_000, 3, Duration::from_secs(6) },
    saturates = { u64::MAX, 3, Duration::MAX },
)]
fn backoff_is_linear_and_saturating(step_ms: u64, attempt: u32, expected: Duration) {
    assert_eq!(backoff(Duration::from_millis(step_ms), attempt), expected);
}
