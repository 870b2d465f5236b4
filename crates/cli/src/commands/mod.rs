// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cache;
pub mod fetch;
pub mod queue;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
pub mod watch;

use std::sync::Arc;

use outpost_core::{DiagnosticSink, KvStore, SqliteStore, TracingSink};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::error::Result;
use crate::intercept::Interceptor;
use crate::queue::WriteQueue;
use crate::sync::SyncOrchestrator;
use crate::transport::{HttpTransport, Transport};

/// Everything a command needs, wired once per invocation.
///
/// Connectivity starts out `Offline`; commands that route requests run the
/// initial probe themselves.
pub struct Context {
    pub config: Config,
    pub store: Arc<dyn KvStore>,
    /// The live network, never intercepted.
    pub http: Arc<dyn Transport>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub monitor: ConnectivityMonitor,
    pub cache: Arc<ResponseCache>,
    pub queue: WriteQueue,
}

impl Context {
    /// Open the configured SQLite store and HTTP client.
    pub async fn open(config: Config) -> Result<Self> {
        let path = config.storage_path();
        let store = crate::time_phase!("store::open", {
            SqliteStore::open(&path)?.with_quota(config.storage.quota_bytes)
        });
        let http = HttpTransport::new(
            config.network.base_url.as_deref(),
            config.request_timeout(),
        )?;
        Self::with_parts(config, Arc::new(store), Arc::new(http), Arc::new(TracingSink)).await
    }

    /// Wire a context from explicit capabilities.
    pub async fn with_parts(
        config: Config,
        store: Arc<dyn KvStore>,
        http: Arc<dyn Transport>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        let monitor = ConnectivityMonitor::new(
            Arc::clone(&http),
            config.monitor_config(),
            ConnectivityState::Offline,
            Arc::clone(&diagnostics),
        );
        let cache = Arc::new(ResponseCache::new(
            Arc::clone(&store),
            config.cache_config(),
            Arc::clone(&diagnostics),
        ));
        let queue = WriteQueue::load(
            Arc::clone(&store),
            Arc::clone(&http),
            Arc::clone(&diagnostics),
        )
        .await?;

        Ok(Context {
            config,
            store,
            http,
            diagnostics,
            monitor,
            cache,
            queue,
        })
    }

    /// An interceptor over the live network.
    pub fn interceptor(&self) -> Interceptor {
        Interceptor::wrap(
            Arc::clone(&self.http),
            self.monitor.clone(),
            Arc::clone(&self.cache),
            self.queue.clone(),
        )
    }

    pub fn orchestrator(&self) -> SyncOrchestrator {
        SyncOrchestrator::new(
            self.monitor.clone(),
            self.queue.clone(),
            Arc::clone(&self.cache),
            self.config.sync_config(),
        )
    }
}
