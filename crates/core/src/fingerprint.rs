// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request fingerprints used as cache keys.
//!
//! The fingerprint covers the whole argument set of a request, not just its
//! URL. It is derived from a canonical serialization with a fixed field order:
//!
//! ```text
//! [method, url, [[header-name, header-value], ...], body]
//! ```
//!
//! - `method` is the upper-case method name.
//! - `url` is taken verbatim.
//! - header names are lower-cased; pairs are sorted by name, then value,
//!   so header order and name casing do not matter.
//! - `body` is base64 or `null`.
//!
//! Two descriptors share a fingerprint iff their canonical forms are equal.
//! The fingerprint itself is the hex SHA-256 of the canonical form.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::request::RequestDescriptor;

/// Deterministic identifier of a request's argument set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(request: &RequestDescriptor) -> Self {
        let canonical = canonical_form(request);
        let digest = Sha256::digest(canonical.as_bytes());
        Fingerprint(hex::encode(digest))
    }

    /// Wrap a stored key. No validation is done.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Fingerprint(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The canonical serialization a fingerprint is computed over.
pub fn canonical_form(request: &RequestDescriptor) -> String {
    let mut headers: Vec<(String, &str)> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
        .collect();
    headers.sort();

    let body = request.body.as_ref().map(|b| STANDARD.encode(b));

    serde_json::json!([request.method.as_str(), request.url, headers, body]).to_string()
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
