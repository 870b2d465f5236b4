// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync orchestration.
//!
//! Turns reconnect signals into queue flushes. A reconnect starts a bounded
//! retry loop with linear backoff (`attempt * retry_step` between attempts);
//! the loop stops at the first successful flush. While the monitor stays
//! online, a periodic re-flush picks up requests queued after live delivery
//! failures.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState, SubscriptionId};
use crate::queue::{SyncResult, WriteQueue};

/// Error type for sync operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("cannot sync while offline")]
    Offline,
}

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Flush on reconnect. When false a reconnect only updates the status.
    pub auto_sync: bool,
    /// Flush attempts per reconnect.
    pub max_retries: u32,
    /// Backoff unit; the delay after attempt `n` is `n * retry_step`.
    pub retry_step: Duration,
    /// Period of the re-flush while online. Zero disables it.
    pub resync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            auto_sync: true,
            max_retries: 3,
            retry_step: Duration::from_secs(2),
            resync_interval: Duration::from_secs(60),
        }
    }
}

/// What the sync layer is doing, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Online,
    Offline,
    Syncing,
    Error {
        message: String,
        remaining: usize,
        attempts: u32,
    },
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Online => f.write_str("online"),
            SyncStatus::Offline => f.write_str("offline"),
            SyncStatus::Syncing => f.write_str("syncing"),
            SyncStatus::Error { message, .. } => write!(f, "error: {message}"),
        }
    }
}

/// Drives queue flushes from connectivity changes. Cheap to clone.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    monitor: ConnectivityMonitor,
    queue: WriteQueue,
    cache: Arc<ResponseCache>,
    config: SyncConfig,
    status_tx: watch::Sender<SyncStatus>,
    attachment: Mutex<Option<Attachment>>,
}

/// Everything `attach` registered, undone by `detach`.
struct Attachment {
    subscription: SubscriptionId,
    token: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Delay before the attempt following `attempt`: linear in the attempt
/// number, saturating instead of overflowing.
fn backoff(step: Duration, attempt: u32) -> Duration {
    step.checked_mul(attempt).unwrap_or(Duration::MAX)
}

impl SyncOrchestrator {
    pub fn new(
        monitor: ConnectivityMonitor,
        queue: WriteQueue,
        cache: Arc<ResponseCache>,
        config: SyncConfig,
    ) -> Self {
        let initial = match monitor.current_state() {
            ConnectivityState::Online => SyncStatus::Online,
            ConnectivityState::Offline => SyncStatus::Offline,
        };
        let (status_tx, _) = watch::channel(initial);
        SyncOrchestrator {
            inner: Arc::new(SyncInner {
                monitor,
                queue,
                cache,
                config,
                status_tx,
                attachment: Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status_tx.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.inner.attachment).is_some()
    }

    /// Subscribe to reconnects, mirror offline transitions into the status,
    /// start the periodic re-flush and purge expired cache entries.
    ///
    /// Attaching twice is a no-op.
    pub async fn attach(&self) {
        {
            let mut slot = lock(&self.inner.attachment);
            if slot.is_some() {
                return;
            }

            let token = CancellationToken::new();
            let handle = tokio::runtime::Handle::current();
            let weak = Arc::downgrade(&self.inner);
            let reconnect_token = token.clone();

            let subscription = self.inner.monitor.subscribe_reconnect(move || {
                let Some(inner) = weak.upgrade() else { return };
                let orchestrator = SyncOrchestrator { inner };
                let token = reconnect_token.clone();
                handle.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = orchestrator.on_reconnect() => {}
                    }
                });
            });

            self.spawn_offline_mirror(token.clone());
            if !self.inner.config.resync_interval.is_zero() {
                self.spawn_resync(token.clone());
            }

            *slot = Some(Attachment {
                subscription,
                token,
            });
        }
        info!("sync orchestrator attached");

        match self.inner.cache.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "purged expired cache entries"),
            Err(e) => warn!(error = %e, "cache maintenance failed"),
        }
    }

    /// Undo everything `attach` did. In-flight syncs are abandoned.
    pub fn detach(&self) {
        if let Some(attachment) = lock(&self.inner.attachment).take() {
            self.inner.monitor.unsubscribe(attachment.subscription);
            attachment.token.cancel();
            info!("sync orchestrator detached");
        }
    }

    /// Flush with bounded retries. Used on every reconnect.
    pub async fn sync_with_retries(&self) -> SyncResult {
        let max_attempts = self.inner.config.max_retries.max(1);
        self.set_status(SyncStatus::Syncing);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.inner.queue.flush().await;
            if result.success {
                info!(attempt, "sync complete");
                self.set_status(SyncStatus::Online);
                return result;
            }

            warn!(
                attempt,
                max_attempts,
                remaining = result.remaining,
                "sync attempt failed"
            );
            if attempt >= max_attempts {
                self.fail(&result, attempt);
                return result;
            }
            tokio::time::sleep(backoff(self.inner.config.retry_step, attempt)).await;
        }
    }

    /// One flush, no retries. Fails fast when offline.
    pub async fn sync_now(&self) -> Result<SyncResult, SyncError> {
        if !self.inner.monitor.is_online() {
            warn!("cannot sync while offline");
            return Err(SyncError::Offline);
        }

        self.set_status(SyncStatus::Syncing);
        let result = self.inner.queue.flush().await;
        if result.success {
            self.set_status(SyncStatus::Online);
        } else {
            self.fail(&result, 1);
        }
        Ok(result)
    }

    async fn on_reconnect(&self) {
        if !self.inner.config.auto_sync {
            debug!("reconnected, auto sync disabled");
            self.set_status(SyncStatus::Online);
            return;
        }
        self.sync_with_retries().await;
    }

    fn fail(&self, result: &SyncResult, attempts: u32) {
        self.set_status(SyncStatus::Error {
            message: format!(
                "{} requests still queued after {attempts} attempt(s)",
                result.remaining
            ),
            remaining: result.remaining,
            attempts,
        });
    }

    fn set_status(&self, status: SyncStatus) {
        self.inner.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            debug!(from = %current, to = %status, "sync status changed");
            *current = status;
            true
        });
    }

    fn spawn_offline_mirror(&self, token: CancellationToken) {
        let weak: Weak<SyncInner> = Arc::downgrade(&self.inner);
        let mut states = self.inner.monitor.watch_state();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let offline = *states.borrow_and_update() == ConnectivityState::Offline;
                let Some(inner) = weak.upgrade() else { break };
                if offline {
                    SyncOrchestrator { inner }.set_status(SyncStatus::Offline);
                }
            }
        });
    }

    fn spawn_resync(&self, token: CancellationToken) {
        let weak: Weak<SyncInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.resync_interval;
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(inner) = weak.upgrade() else { break };
                if !inner.monitor.is_online() || inner.queue.is_empty().await {
                    continue;
                }
                let orchestrator = SyncOrchestrator { inner };
                debug!("periodic re-flush");
                if let Err(e) = orchestrator.sync_now().await {
                    debug!(error = %e, "periodic re-flush skipped");
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
