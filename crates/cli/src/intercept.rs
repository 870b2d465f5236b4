// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-aware request routing.
//!
//! [`Interceptor`] decorates a transport. Every request is classified as a
//! read or a mutation and routed on the current connectivity state:
//!
//! | State   | Read                                    | Mutation                     |
//! |---------|-----------------------------------------|------------------------------|
//! | Online  | live; cache 2xx; on failure serve cache | live; on failure enqueue     |
//! | Offline | serve cache                             | enqueue, no delivery attempt |
//!
//! The caller always gets a response. When neither the network nor the cache
//! can answer, a placeholder acknowledgement is synthesized instead.

use std::sync::Arc;

use outpost_core::{BoxFuture, RequestDescriptor, Response};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::queue::WriteQueue;
use crate::transport::{Transport, TransportError, TransportResult};

const READ_FAILED: &str = "Request failed";
const WRITE_QUEUED: &str = "Request queued";
const OFFLINE_QUEUED: &str = "Offline. Request queued.";
const OFFLINE_NO_CACHE: &str = "Offline mode, no cached data";

/// Transport decorator that serves reads from the cache and defers writes to
/// the queue when the network is unavailable.
pub struct Interceptor {
    inner: Arc<dyn Transport>,
    monitor: ConnectivityMonitor,
    cache: Arc<ResponseCache>,
    queue: WriteQueue,
    /// Cache writes running in the background.
    writes: TaskTracker,
}

impl Interceptor {
    /// Wrap `inner`. The queue should replay through the same `inner`
    /// transport, never through the interceptor itself.
    pub fn wrap(
        inner: Arc<dyn Transport>,
        monitor: ConnectivityMonitor,
        cache: Arc<ResponseCache>,
        queue: WriteQueue,
    ) -> Self {
        Interceptor {
            inner,
            monitor,
            cache,
            queue,
            writes: TaskTracker::new(),
        }
    }

    /// Wait until every background cache write has finished.
    pub async fn settle(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    /// Finish pending cache writes and hand back the wrapped transport.
    pub async fn teardown(self) -> Arc<dyn Transport> {
        self.settle().await;
        debug!("interceptor removed");
        self.inner
    }

    async fn route(&self, request: RequestDescriptor) -> Response {
        let read = request.method.is_read();
        match (self.monitor.current_state(), read) {
            (ConnectivityState::Online, true) => self.live_read(request).await,
            (ConnectivityState::Online, false) => self.live_write(request).await,
            (ConnectivityState::Offline, true) => self.offline_read(&request).await,
            (ConnectivityState::Offline, false) => {
                debug!(request = %request, "offline, deferring mutation");
                self.defer(request, OFFLINE_QUEUED).await
            }
        }
    }

    async fn live_read(&self, request: RequestDescriptor) -> Response {
        match self.inner.send(request.clone()).await {
            Ok(response) => {
                if response.is_success() {
                    self.cache_in_background(request, &response);
                }
                response
            }
            Err(e) => {
                warn!(request = %request, error = %e, "read failed, trying cache");
                match self.cache.lookup(&request).await {
                    Some(entry) => entry.into_response(),
                    None => Response::placeholder(READ_FAILED, false),
                }
            }
        }
    }

    async fn live_write(&self, request: RequestDescriptor) -> Response {
        match self.inner.send(request.clone()).await {
            Ok(response) => response,
            // Replaying a request that cannot be built would fail forever
            Err(TransportError::InvalidRequest(reason)) => {
                warn!(request = %request, %reason, "invalid request, not queued");
                Response::placeholder(READ_FAILED, false)
            }
            Err(e) => {
                warn!(request = %request, error = %e, "write failed, queueing for sync");
                self.defer(request, WRITE_QUEUED).await
            }
        }
    }

    async fn offline_read(&self, request: &RequestDescriptor) -> Response {
        match self.cache.lookup(request).await {
            Some(entry) => {
                debug!(request = %request, "offline, served from cache");
                entry.into_response()
            }
            None => Response::placeholder(OFFLINE_NO_CACHE, false),
        }
    }

    async fn defer(&self, request: RequestDescriptor, message: &str) -> Response {
        match self.queue.enqueue(request).await {
            Ok(()) => Response::placeholder(message, true),
            Err(e) => {
                warn!(error = %e, "request rejected by write queue");
                Response::placeholder(&format!("Request not queued: {e}"), false)
            }
        }
    }

    /// Store a copy of the response without delaying the caller.
    fn cache_in_background(&self, request: RequestDescriptor, response: &Response) {
        let cache = Arc::clone(&self.cache);
        let response = response.clone();
        self.writes.spawn(async move {
            cache.store(&request, &response).await;
        });
    }
}

impl Transport for Interceptor {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'_, TransportResult<Response>> {
        Box::pin(async move { Ok(self.route(request).await) })
    }
}

#[cfg(test)]
#[path = "intercept_tests.rs"]
mod tests;
