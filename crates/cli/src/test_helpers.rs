// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: a scriptable transport and request builders.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outpost_core::{BoxFuture, RecordingSink, RequestDescriptor, Response};

use crate::transport::{Transport, TransportError, TransportResult};

/// Mock transport for testing without real sockets.
///
/// Outcome of each request, in priority order:
/// 1. the next scripted outcome, if any
/// 2. failure if the url is in the failing set
/// 3. failure if the transport is offline
/// 4. the default response
pub struct MockTransport {
    online: AtomicBool,
    default_response: Mutex<Response>,
    scripted: Mutex<VecDeque<TransportResult<Response>>>,
    failing_urls: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    /// Requests that were sent via send().
    sent: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            online: AtomicBool::new(true),
            default_response: Mutex::new(Response::new(200, Vec::new(), "ok")),
            scripted: Mutex::new(VecDeque::new()),
            failing_urls: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn offline() -> Self {
        let transport = Self::new();
        transport.set_online(false);
        transport
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Response returned when nothing else applies.
    pub fn respond_with(&self, response: Response) {
        *self.default_response.lock().unwrap() = response;
    }

    /// Queue a one-off outcome, consumed by the next request.
    pub fn push_outcome(&self, outcome: TransportResult<Response>) {
        self.scripted.lock().unwrap().push_back(outcome);
    }

    /// Requests to `url` fail until [`MockTransport::heal_url`] is called.
    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn heal_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().remove(url);
    }

    /// Every request sleeps this long before resolving.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_urls(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.url).collect()
    }

    fn outcome_for(&self, request: &RequestDescriptor) -> TransportResult<Response> {
        if let Some(outcome) = self.scripted.lock().unwrap().pop_front() {
            return outcome;
        }
        if self.failing_urls.lock().unwrap().contains(&request.url) {
            return Err(TransportError::Unreachable(format!(
                "mock failure for {}",
                request.url
            )));
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("mock offline".into()));
        }
        Ok(self.default_response.lock().unwrap().clone())
    }
}

impl Transport for MockTransport {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'_, TransportResult<Response>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(request.clone());
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome_for(&request)
        })
    }
}

/// A POST with a small JSON body.
pub fn post_order(item: &str) -> RequestDescriptor {
    RequestDescriptor::post("/orders").with_json(&serde_json::json!({ "item": item }))
}

/// A GET for `/items/<id>`.
pub fn get_item(id: u32) -> RequestDescriptor {
    RequestDescriptor::get(format!("/items/{id}"))
}

pub fn sink() -> Arc<RecordingSink> {
    Arc::new(RecordingSink::new())
}
