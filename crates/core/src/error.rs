// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for outpost-core operations.

use thiserror::Error;

/// Errors raised by a persistent key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage capacity exceeded: {needed} bytes needed, {quota} byte quota")]
    CapacityExceeded { needed: u64, quota: u64 },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True when the store refused a write for lack of space.
    pub fn is_capacity(&self) -> bool {
        match self {
            StorageError::CapacityExceeded { .. } => true,
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::DiskFull
            }
            _ => false,
        }
    }
}

/// A request descriptor that cannot be queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request has no method")]
    MissingMethod,

    #[error("invalid request method: '{0}'\n  hint: methods are HTTP tokens such as GET, POST, PUT")]
    InvalidMethod(String),

    #[error("request has no url")]
    MissingUrl,
}

/// All possible errors that can occur in outpost-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for outpost-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for key-value store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
