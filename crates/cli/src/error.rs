// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use outpost_core::{StorageError, ValidationError};

use crate::queue::QueueError;
use crate::sync::SyncError;
use crate::transport::TransportError;

/// All errors surfaced by the `outpost` command line.
///
/// Errors provide user-friendly messages with hints for common issues.
/// Routed requests never produce one of these; only setup and operator
/// commands do.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("config file not found: {0}\n  hint: pass an existing file to --config, or drop the flag to use defaults")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid header '{0}'\n  hint: headers are written as 'Name: value'")]
    InvalidHeader(String),

    #[error("{remaining} request(s) still queued after sync")]
    SyncIncomplete { remaining: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
