// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable write queue.
//!
//! Mutating requests that cannot be delivered are appended here and replayed
//! in insertion order on flush. The whole queue is persisted as one JSON list
//! under a single key of the `queue` namespace, rewritten after every change
//! and reloaded in the same order at startup.
//!
//! The in-memory list is the single critical section: enqueue, the
//! reconciliation step of a flush, and eviction all hold the same lock. A
//! flush does not hold it while replaying, so enqueues made mid-flush land
//! after the retained entries and are never lost.
//!
//! A flush pass runs on its own task. Callers only await its result, so a
//! caller that gives up never leaves the pass suspended while it holds the
//! lock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use futures_util::future::{FutureExt, Shared};
use outpost_core::{
    namespace, BoxFuture, Diagnostic, DiagnosticSink, KvStore, RequestDescriptor, StorageError,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError};

/// Key holding the serialized queue.
pub const QUEUE_KEY: &str = "queue";

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The request cannot be queued.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The replay transport can never send this request.
    #[error("request cannot be replayed: {0}")]
    Unreplayable(TransportError),

    /// The persisted queue could not be read.
    #[error("queue storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// A request awaiting replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    /// Monotonic sequence number, unique within one queue.
    pub id: u64,
    #[serde(flatten)]
    pub request: RequestDescriptor,
    pub queued_at: DateTime<Utc>,
}

/// A replay that failed during a flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub request: RequestDescriptor,
    pub error: String,
}

/// Outcome of one flush pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// True when every replay in the pass was delivered.
    pub success: bool,
    /// Queue length after the pass.
    pub remaining: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncResult {
    fn empty() -> Self {
        SyncResult {
            success: true,
            remaining: 0,
            failures: Vec::new(),
        }
    }
}

type FlushFuture = Shared<BoxFuture<'static, SyncResult>>;

/// Persistent FIFO of deferred mutating requests. Cheap to clone.
#[derive(Clone)]
pub struct WriteQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    store: Arc<dyn KvStore>,
    /// Live network used for replays.
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn DiagnosticSink>,
    state: tokio::sync::Mutex<QueueState>,
    /// The flush currently running, shared by every concurrent caller.
    in_flight: Mutex<Option<FlushFuture>>,
}

struct QueueState {
    entries: Vec<QueuedRequest>,
    last_id: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl WriteQueue {
    /// Restore the queue from the store, in persisted order.
    ///
    /// An unreadable queue is reported and replaced by an empty one; a store
    /// that cannot be reached is an error.
    pub async fn load(
        store: Arc<dyn KvStore>,
        transport: Arc<dyn Transport>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> QueueResult<Self> {
        let entries = match store.get(namespace::QUEUE, QUEUE_KEY).await? {
            Some(raw) => match serde_json::from_slice::<Vec<QueuedRequest>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    diagnostics.emit(Diagnostic::QueueLoadFailed {
                        error: e.to_string(),
                    });
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let last_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
        if !entries.is_empty() {
            info!(count = entries.len(), "restored queued requests");
        }

        Ok(WriteQueue {
            inner: Arc::new(QueueInner {
                store,
                transport,
                diagnostics,
                state: tokio::sync::Mutex::new(QueueState { entries, last_id }),
                in_flight: Mutex::new(None),
            }),
        })
    }

    /// Validate, append and persist a request.
    ///
    /// A rejected request leaves the queue untouched. That includes requests
    /// the replay transport could never build. Persistence failures are
    /// reported as diagnostics, never returned.
    pub async fn enqueue(&self, request: RequestDescriptor) -> QueueResult<()> {
        request.validate()?;
        self.inner
            .transport
            .check(&request)
            .map_err(QueueError::Unreplayable)?;

        let mut state = self.inner.state.lock().await;
        state.last_id += 1;
        let entry = QueuedRequest {
            id: state.last_id,
            request,
            queued_at: Utc::now(),
        };
        info!(id = entry.id, request = %entry.request, "queued request");
        state.entries.push(entry);
        self.inner.persist(&mut state).await;
        Ok(())
    }

    /// Replay every queued request in order.
    ///
    /// Delivered entries are dropped; failed ones stay, in their original
    /// relative order. A call made while a flush is running joins it and gets
    /// the same result.
    pub async fn flush(&self) -> SyncResult {
        let flush = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(running) => {
                    debug!("flush already running, joining it");
                    running.clone()
                }
                None => {
                    let queue = self.clone();
                    let task = tokio::spawn(async move {
                        let result = queue.flush_pass().await;
                        *lock(&queue.inner.in_flight) = None;
                        result
                    });
                    let weak = Arc::downgrade(&self.inner);
                    let pass: BoxFuture<'static, SyncResult> = Box::pin(async move {
                        match task.await {
                            Ok(result) => result,
                            Err(e) => abandoned_pass(weak, e).await,
                        }
                    });
                    let shared = pass.shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };
        flush.await
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of the queued requests, oldest first.
    pub async fn snapshot(&self) -> Vec<QueuedRequest> {
        self.inner.state.lock().await.entries.clone()
    }

    /// Drop every queued request. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut state = self.inner.state.lock().await;
        let removed = state.entries.len();
        state.entries.clear();
        self.inner.persist(&mut state).await;
        if removed > 0 {
            warn!(removed, "cleared write queue");
        }
        removed
    }

    async fn flush_pass(&self) -> SyncResult {
        let pending = self.snapshot().await;
        if pending.is_empty() {
            return SyncResult::empty();
        }

        info!(count = pending.len(), "flushing write queue");
        let mut delivered = HashSet::new();
        let mut dropped = HashSet::new();
        let mut failures = Vec::new();

        for entry in pending {
            match self.inner.transport.send(entry.request.clone()).await {
                Ok(response) => {
                    debug!(id = entry.id, status = response.status, "replayed queued request");
                    delivered.insert(entry.id);
                }
                Err(e @ TransportError::InvalidRequest(_)) => {
                    self.inner.diagnostics.emit(Diagnostic::QueueDropped {
                        request: entry.request.to_string(),
                        error: e.to_string(),
                    });
                    dropped.insert(entry.id);
                    failures.push(SyncFailure {
                        request: entry.request,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(id = entry.id, request = %entry.request, error = %e, "replay failed");
                    failures.push(SyncFailure {
                        request: entry.request,
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut state = self.inner.state.lock().await;
        if !delivered.is_empty() || !dropped.is_empty() {
            state
                .entries
                .retain(|e| !delivered.contains(&e.id) && !dropped.contains(&e.id));
            self.inner.persist(&mut state).await;
        }

        let result = SyncResult {
            success: failures.is_empty(),
            remaining: state.entries.len(),
            failures,
        };
        info!(
            delivered = delivered.len(),
            failed = result.failures.len(),
            remaining = result.remaining,
            "flush finished"
        );
        result
    }
}

/// Result reported when the flush task died before finishing.
async fn abandoned_pass(inner: Weak<QueueInner>, error: tokio::task::JoinError) -> SyncResult {
    warn!(%error, "flush task ended without a result");
    let remaining = match inner.upgrade() {
        Some(inner) => {
            *lock(&inner.in_flight) = None;
            inner.state.lock().await.entries.len()
        }
        None => 0,
    };
    SyncResult {
        success: false,
        remaining,
        failures: Vec::new(),
    }
}

impl QueueInner {
    /// Write the whole list. Under capacity pressure the oldest entries are
    /// evicted one at a time until the write fits or nothing is left.
    async fn persist(&self, state: &mut QueueState) {
        loop {
            let value = match serde_json::to_vec(&state.entries) {
                Ok(value) => value,
                Err(e) => {
                    self.diagnostics.emit(Diagnostic::QueuePersistFailed {
                        error: e.to_string(),
                    });
                    return;
                }
            };

            match self.store.put(namespace::QUEUE, QUEUE_KEY, value).await {
                Ok(()) => return,
                Err(e) if e.is_capacity() && !state.entries.is_empty() => {
                    let evicted = state.entries.remove(0);
                    self.diagnostics.emit(Diagnostic::QueueEvicted {
                        request: evicted.request.to_string(),
                        remaining: state.entries.len(),
                    });
                }
                Err(e) => {
                    self.diagnostics.emit(Diagnostic::QueuePersistFailed {
                        error: e.to_string(),
                    });
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
