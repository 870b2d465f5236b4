// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::commands::testing::TestContext;
use crate::test_helpers::post_order;

#[tokio::test(start_paused = true)]
async fn reconnect_flushes_queue() {
    let t = TestContext::new().await;
    t.transport.set_online(false);
    t.ctx.queue.enqueue(post_order("a")).await.unwrap();

    let transport = Arc::clone(&t.transport);
    let shutdown = async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        transport.set_online(true);
        // the next probe tick is at 30s
        tokio::time::sleep(Duration::from_secs(40)).await;
    };

    let mut seen = Vec::new();
    watch_until(&t.ctx, shutdown, |status| seen.push(status.clone())).await;

    assert_eq!(seen.first(), Some(&SyncStatus::Offline));
    assert_eq!(seen.last(), Some(&SyncStatus::Online));
    assert!(t.ctx.queue.is_empty().await);
    assert!(t.transport.sent_urls().contains(&"/orders".to_string()));
    assert!(!t.ctx.monitor.timer_running());
}

#[tokio::test(start_paused = true)]
async fn leftover_queue_is_flushed_when_already_online() {
    let t = TestContext::new().await;
    t.ctx.queue.enqueue(post_order("a")).await.unwrap();

    let mut seen = Vec::new();
    watch_until(&t.ctx, std::future::ready(()), |status| {
        seen.push(status.clone())
    })
    .await;

    assert_eq!(seen.first(), Some(&SyncStatus::Online));
    assert!(t.ctx.queue.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn shutdown_detaches_listeners() {
    let t = TestContext::new().await;

    watch_until(&t.ctx, std::future::ready(()), |_| {}).await;

    assert_eq!(t.ctx.monitor.listener_count(), 0);
}
