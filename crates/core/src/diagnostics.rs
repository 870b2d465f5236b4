// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band channel for non-fatal errors.
//!
//! Best-effort layers (cache writes, queue persistence, connectivity probes)
//! swallow their errors instead of propagating them to the caller. Every
//! swallowed error is reported here so data loss is visible.

use std::fmt;
use std::sync::Mutex;

/// A non-fatal event worth surfacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A response could not be written to the cache.
    CacheWriteFailed { fingerprint: String, error: String },
    /// A cache lookup or delete hit a storage error and was treated as a miss.
    CacheReadFailed { fingerprint: String, error: String },
    /// The write queue could not be persisted; the in-memory list is kept.
    QueuePersistFailed { error: String },
    /// The oldest queued request was dropped to relieve storage pressure.
    QueueEvicted {
        request: String,
        remaining: usize,
    },
    /// A queued request that can never be sent was removed from the queue.
    QueueDropped { request: String, error: String },
    /// The persisted queue could not be read at startup.
    QueueLoadFailed { error: String },
    /// A connectivity probe failed with a transport error.
    ProbeFailed { error: String },
    /// A connectivity probe did not finish before its deadline.
    ProbeTimedOut { timeout_ms: u64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CacheWriteFailed { fingerprint, error } => {
                write!(f, "cache write failed for {fingerprint}: {error}")
            }
            Diagnostic::CacheReadFailed { fingerprint, error } => {
                write!(f, "cache read failed for {fingerprint}: {error}")
            }
            Diagnostic::QueuePersistFailed { error } => {
                write!(f, "queue persistence failed: {error}")
            }
            Diagnostic::QueueEvicted { request, remaining } => write!(
                f,
                "storage full: evicted queued request {request} ({remaining} remaining)"
            ),
            Diagnostic::QueueDropped { request, error } => {
                write!(f, "dropped undeliverable queued request {request}: {error}")
            }
            Diagnostic::QueueLoadFailed { error } => {
                write!(f, "could not load persisted queue: {error}")
            }
            Diagnostic::ProbeFailed { error } => write!(f, "connectivity probe failed: {error}"),
            Diagnostic::ProbeTimedOut { timeout_ms } => {
                write!(f, "connectivity probe timed out after {timeout_ms}ms")
            }
        }
    }
}

/// Receiver of diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Logs every diagnostic through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::QueueEvicted { .. } | Diagnostic::QueueDropped { .. } => {
                tracing::error!("{}", diagnostic)
            }
            Diagnostic::ProbeFailed { .. } | Diagnostic::ProbeTimedOut { .. } => {
                tracing::debug!("{}", diagnostic)
            }
            _ => tracing::warn!("{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory and forwards it to tracing.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Count events matching a predicate.
    pub fn count(&self, pred: impl Fn(&Diagnostic) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|d| pred(d))
            .count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        TracingSink.emit(diagnostic.clone());
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic);
    }
}
