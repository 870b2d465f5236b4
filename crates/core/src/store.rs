// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent key-value store capability.
//!
//! The cache and the write queue each own one namespace of a shared store.
//! Implementations:
//! - [`MemoryStore`]: process-local, with an optional byte quota and failure
//!   injection for tests
//! - [`SqliteStore`](crate::sqlite::SqliteStore): durable, backed by SQLite

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};

/// Boxed future returned by capability traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Well-known namespaces.
pub mod namespace {
    /// Cached read responses, keyed by fingerprint.
    pub const CACHE: &str = "cache";
    /// The serialized write queue.
    pub const QUEUE: &str = "queue";
    /// Form-field mirroring; owned by an external helper.
    pub const FORMS: &str = "forms";
}

/// Async key-value store, isolated per namespace.
pub trait KvStore: Send + Sync {
    /// Fetch a value. A missing key is `Ok(None)`.
    fn get<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, StorageResult<Option<Vec<u8>>>>;

    /// Insert or overwrite a value.
    fn put<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a str,
        value: Vec<u8>,
    ) -> BoxFuture<'a, StorageResult<()>>;

    /// Remove a value. Removing a missing key is not an error.
    fn delete<'a>(&'a self, namespace: &'a str, key: &'a str) -> BoxFuture<'a, StorageResult<()>>;

    /// All keys in a namespace, in no particular order.
    fn list_keys<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, StorageResult<Vec<String>>>;
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    /// Total byte budget across all namespaces.
    quota: Option<u64>,
    /// Number of upcoming puts that fail with a capacity error.
    failing_puts: AtomicUsize,
    /// Number of upcoming operations of any kind that fail as unavailable.
    unavailable_ops: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of stored values.
    pub fn with_quota(quota: u64) -> Self {
        MemoryStore {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Make the next `count` puts fail with [`StorageError::CapacityExceeded`].
    pub fn fail_next_puts(&self, count: usize) {
        self.failing_puts.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` operations fail with [`StorageError::Unavailable`].
    pub fn fail_next_ops(&self, count: usize) {
        self.unavailable_ops.store(count, Ordering::SeqCst);
    }

    /// Total bytes currently stored.
    pub fn used_bytes(&self) -> u64 {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().map(|v| v.len() as u64).sum()
    }

    fn take_injected(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_available(&self) -> StorageResult<()> {
        if Self::take_injected(&self.unavailable_ops) {
            return Err(StorageError::Unavailable("injected failure".into()));
        }
        Ok(())
    }

    fn put_sync(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let slot = (namespace.to_string(), key.to_string());

        if Self::take_injected(&self.failing_puts) {
            return Err(StorageError::CapacityExceeded {
                needed: value.len() as u64,
                quota: self.quota.unwrap_or(0),
            });
        }

        if let Some(quota) = self.quota {
            let others: u64 = entries
                .iter()
                .filter(|(k, _)| **k != slot)
                .map(|(_, v)| v.len() as u64)
                .sum();
            let needed = others + value.len() as u64;
            if needed > quota {
                return Err(StorageError::CapacityExceeded { needed, quota });
            }
        }

        entries.insert(slot, value);
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn get<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, StorageResult<Option<Vec<u8>>>> {
        Box::pin(async move {
            self.check_available()?;
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            Ok(entries
                .get(&(namespace.to_string(), key.to_string()))
                .cloned())
        })
    }

    fn put<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a str,
        value: Vec<u8>,
    ) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move { self.put_sync(namespace, key, value) })
    }

    fn delete<'a>(&'a self, namespace: &'a str, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            self.check_available()?;
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.remove(&(namespace.to_string(), key.to_string()));
            Ok(())
        })
    }

    fn list_keys<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, StorageResult<Vec<String>>> {
        Box::pin(async move {
            self.check_available()?;
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            Ok(entries
                .keys()
                .filter(|(ns, _)| ns == namespace)
                .map(|(_, key)| key.clone())
                .collect())
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
