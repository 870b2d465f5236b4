// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Response cache for read requests.
//!
//! Entries are keyed by request fingerprint and live in the `cache`
//! namespace of the shared store. Freshness is purely age based: an entry
//! older than `max_age` is deleted the next time it is looked up.
//!
//! Caching is best-effort. Storage errors never reach the caller; they are
//! reported through the diagnostic sink and the entry is simply absent.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use outpost_core::{
    namespace, Clock, Diagnostic, DiagnosticSink, Fingerprint, KvStore, RequestDescriptor,
    Response, StorageResult, SystemClock,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this are treated as absent.
    pub max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// A stored read response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(with = "outpost_core::request::base64_bytes")]
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Rebuild a response for the caller. Cached entries replay as `200 OK`.
    pub fn into_response(self) -> Response {
        Response::new(200, self.headers, self.body)
    }
}

/// Fingerprint-keyed, age-bounded store of read responses.
pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ResponseCache {
    pub fn new(
        store: Arc<dyn KvStore>,
        config: CacheConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        ResponseCache {
            store,
            config,
            clock: Arc::new(SystemClock),
            diagnostics,
        }
    }

    /// Replace the wall clock used for timestamps and expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a response under the request's fingerprint, overwriting any
    /// previous entry. Only borrows the response.
    pub async fn store(&self, request: &RequestDescriptor, response: &Response) {
        let fingerprint = Fingerprint::of(request);
        let entry = CacheEntry {
            body: response.body.clone(),
            headers: response.headers.clone(),
            stored_at: self.clock.now(),
        };

        let result = match serde_json::to_vec(&entry) {
            Ok(value) => self
                .store
                .put(namespace::CACHE, fingerprint.as_str(), value)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => debug!(%fingerprint, url = %request.url, "cached response"),
            Err(error) => self.diagnostics.emit(Diagnostic::CacheWriteFailed {
                fingerprint: fingerprint.to_string(),
                error,
            }),
        }
    }

    /// Look up a fresh entry for the request.
    ///
    /// Expired and unreadable entries are deleted and reported as absent.
    pub async fn lookup(&self, request: &RequestDescriptor) -> Option<CacheEntry> {
        let fingerprint = Fingerprint::of(request);
        let raw = match self.store.get(namespace::CACHE, fingerprint.as_str()).await {
            Ok(raw) => raw?,
            Err(e) => {
                self.read_failed(&fingerprint, e.to_string());
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                self.read_failed(&fingerprint, format!("corrupt entry: {e}"));
                self.delete(&fingerprint).await;
                return None;
            }
        };

        if self.is_expired(&entry) {
            debug!(%fingerprint, stored_at = %entry.stored_at, "cache entry expired");
            self.delete(&fingerprint).await;
            return None;
        }

        debug!(%fingerprint, "cache hit");
        Some(entry)
    }

    /// Remove an entry. Missing entries are ignored.
    pub async fn delete(&self, fingerprint: &Fingerprint) {
        if let Err(e) = self
            .store
            .delete(namespace::CACHE, fingerprint.as_str())
            .await
        {
            self.read_failed(fingerprint, e.to_string());
        }
    }

    /// Fingerprints of every stored entry, fresh or not.
    pub async fn list_keys(&self) -> StorageResult<Vec<Fingerprint>> {
        let keys = self.store.list_keys(namespace::CACHE).await?;
        Ok(keys.into_iter().map(Fingerprint::from_raw).collect())
    }

    /// Delete every expired or unreadable entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> StorageResult<usize> {
        let mut purged = 0;
        for key in self.store.list_keys(namespace::CACHE).await? {
            let fingerprint = Fingerprint::from_raw(key);
            let stale = match self.store.get(namespace::CACHE, fingerprint.as_str()).await {
                Ok(Some(raw)) => serde_json::from_slice::<CacheEntry>(&raw)
                    .map(|entry| self.is_expired(&entry))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    self.read_failed(&fingerprint, e.to_string());
                    false
                }
            };
            if stale {
                self.store
                    .delete(namespace::CACHE, fingerprint.as_str())
                    .await?;
                purged += 1;
            }
        }
        if purged > 0 {
            debug!(purged, "purged expired cache entries");
        }
        Ok(purged)
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let max_age = chrono::Duration::from_std(self.config.max_age)
            .unwrap_or(chrono::Duration::MAX);
        self.clock.now() - entry.stored_at > max_age
    }

    fn read_failed(&self, fingerprint: &Fingerprint, error: String) {
        self.diagnostics.emit(Diagnostic::CacheReadFailed {
            fingerprint: fingerprint.to_string(),
            error,
        });
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
