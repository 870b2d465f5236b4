// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outpost-core: Shared data model and capabilities for outpost.
//!
//! This crate provides the request/response values, request fingerprints,
//! the persistent key-value store capability, the clock and the diagnostic
//! sink consumed by the connectivity, cache and queue layers.

pub mod clock;
pub mod diagnostics;
pub mod error;
pub mod fingerprint;
pub mod request;
pub mod sqlite;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use error::{Error, Result, StorageError, StorageResult, ValidationError};
pub use fingerprint::{canonical_form, Fingerprint};
pub use request::{Method, RequestDescriptor, Response, PLACEHOLDER_STATUS};
pub use sqlite::SqliteStore;
pub use store::{namespace, BoxFuture, KvStore, MemoryStore};
