// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitor.
//!
//! Owns the process-wide online/offline state and notifies subscribers of
//! confirmed reconnects.
//!
//! # State machine
//!
//! ```text
//!            probe ok (notify reconnect)
//!   Offline ──────────────────────────────► Online
//!      ▲                                      │
//!      └──────────────────────────────────────┘
//!        probe failed / timed out, or offline hint
//! ```
//!
//! Host online hints only trigger a probe; the probe is authoritative.
//! Offline hints are applied at once, without a confirming probe.
//!
//! Probes may overlap. Each probe (and each offline hint) draws a ticket when
//! it is issued, and a result is applied only if its ticket is newer than the
//! last applied one, so a slow stale probe never overwrites a fresher result.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use outpost_core::{Diagnostic, DiagnosticSink};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::transport::{self, Transport, TransportError};

/// Whether the network is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectivityState::Online => f.write_str("online"),
            ConnectivityState::Offline => f.write_str("offline"),
        }
    }
}

/// Handle returned by [`ConnectivityMonitor::subscribe_reconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Configuration for the connectivity monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Url of the lightweight probe endpoint.
    pub probe_url: String,
    /// Deadline for a single probe.
    pub probe_timeout: Duration,
    /// Period of the background probe while anyone is subscribed.
    pub probe_interval: Duration,
}

/// Default probe endpoint; answers `204 No Content`.
pub const DEFAULT_PROBE_URL: &str = "https://www.gstatic.com/generate_204";

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            probe_url: DEFAULT_PROBE_URL.to_string(),
            probe_timeout: Duration::from_secs(5),
            probe_interval: Duration::from_secs(30),
        }
    }
}

type ReconnectCallback = Arc<dyn Fn() + Send + Sync>;

/// Owned connectivity monitor. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    transport: Arc<dyn Transport>,
    config: MonitorConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
    /// Last issued ticket.
    tickets: AtomicU64,
    cell: Mutex<StateCell>,
    state_tx: watch::Sender<ConnectivityState>,
    listeners: Mutex<Listeners>,
    /// Parent of the timer and every probe; cancelled by `stop`.
    shutdown: Mutex<CancellationToken>,
}

struct StateCell {
    state: ConnectivityState,
    applied_ticket: u64,
}

struct Listeners {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, ReconnectCallback)>,
    /// Present while the background probe timer runs.
    timer: Option<CancellationToken>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ConnectivityMonitor {
    /// Create a monitor. `initial` is the host's own guess, used until the
    /// first probe completes.
    pub fn new(
        transport: Arc<dyn Transport>,
        config: MonitorConfig,
        initial: ConnectivityState,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let (state_tx, _) = watch::channel(initial);
        ConnectivityMonitor {
            inner: Arc::new(MonitorInner {
                transport,
                config,
                diagnostics,
                tickets: AtomicU64::new(0),
                cell: Mutex::new(StateCell {
                    state: initial,
                    applied_ticket: 0,
                }),
                state_tx,
                listeners: Mutex::new(Listeners {
                    next_id: 0,
                    callbacks: Vec::new(),
                    timer: None,
                }),
                shutdown: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// Start (or restart after `stop`) and run the initial probe.
    pub async fn start(&self) -> ConnectivityState {
        {
            let mut shutdown = lock(&self.inner.shutdown);
            if shutdown.is_cancelled() {
                *shutdown = CancellationToken::new();
            }
        }
        info!(url = %self.inner.config.probe_url, "connectivity monitor started");
        self.probe().await
    }

    /// Stop the background timer, cancel in-flight probes and drop every
    /// subscriber.
    pub fn stop(&self) {
        lock(&self.inner.shutdown).cancel();
        let mut listeners = lock(&self.inner.listeners);
        listeners.callbacks.clear();
        if let Some(timer) = listeners.timer.take() {
            timer.cancel();
        }
        info!("connectivity monitor stopped");
    }

    /// Non-blocking snapshot of the current state.
    pub fn current_state(&self) -> ConnectivityState {
        lock(&self.inner.cell).state
    }

    pub fn is_online(&self) -> bool {
        self.current_state() == ConnectivityState::Online
    }

    /// Receiver that observes every applied state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectivityState> {
        self.inner.state_tx.subscribe()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Register a callback fired once per confirmed Offline→Online transition.
    ///
    /// The first subscription arms the background probe timer. Arming needs a
    /// Tokio runtime; without one the callback is still registered and fires
    /// on explicit probes.
    pub fn subscribe_reconnect<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.inner.listeners);
        listeners.next_id += 1;
        let id = SubscriptionId(listeners.next_id);
        listeners.callbacks.push((id, Arc::new(callback)));

        if listeners.timer.is_none() {
            listeners.timer = self.arm_timer();
        }
        debug!(listeners = listeners.callbacks.len(), "reconnect listener added");
        id
    }

    /// Remove a callback. Removing the last one stops the background timer.
    ///
    /// Returns false if the handle was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.callbacks.len();
        listeners.callbacks.retain(|(sub, _)| *sub != id);
        let removed = listeners.callbacks.len() != before;

        if listeners.callbacks.is_empty() {
            if let Some(timer) = listeners.timer.take() {
                timer.cancel();
                debug!("last reconnect listener removed, probe timer stopped");
            }
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).callbacks.len()
    }

    pub fn timer_running(&self) -> bool {
        lock(&self.inner.listeners).timer.is_some()
    }

    /// Run one probe and apply its result.
    ///
    /// Returns the state after the result was applied (or discarded as stale).
    pub async fn probe(&self) -> ConnectivityState {
        let ticket = self.inner.next_ticket();
        let parent = lock(&self.inner.shutdown).clone();
        let config = &self.inner.config;

        let observed = match transport::probe(
            &*self.inner.transport,
            &config.probe_url,
            config.probe_timeout,
            &parent,
        )
        .await
        {
            Ok(()) => ConnectivityState::Online,
            Err(TransportError::Cancelled) => {
                debug!("probe cancelled by shutdown");
                return self.current_state();
            }
            Err(TransportError::TimedOut(timeout)) => {
                self.inner.diagnostics.emit(Diagnostic::ProbeTimedOut {
                    timeout_ms: timeout.as_millis() as u64,
                });
                ConnectivityState::Offline
            }
            Err(e) => {
                self.inner.diagnostics.emit(Diagnostic::ProbeFailed {
                    error: e.to_string(),
                });
                ConnectivityState::Offline
            }
        };

        self.inner.apply(ticket, observed);
        self.current_state()
    }

    /// Host reports the network came back. Only a hint: runs a probe.
    pub async fn notify_online(&self) -> ConnectivityState {
        debug!("online hint received, probing");
        self.probe().await
    }

    /// Host reports the network went away. Applied immediately.
    pub fn notify_offline(&self) {
        let ticket = self.inner.next_ticket();
        self.inner.apply(ticket, ConnectivityState::Offline);
    }

    fn arm_timer(&self) -> Option<CancellationToken> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("no runtime, probe timer not armed");
                return None;
            }
        };

        let token = lock(&self.inner.shutdown).child_token();
        let weak: Weak<MonitorInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.probe_interval;
        let task_token = token.clone();

        handle.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(inner) = weak.upgrade() else { break };
                ConnectivityMonitor { inner }.probe().await;
            }
            debug!("probe timer exited");
        });

        debug!(period_secs = period.as_secs(), "probe timer armed");
        Some(token)
    }
}

impl MonitorInner {
    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply an observation unless a newer one already landed.
    fn apply(&self, ticket: u64, observed: ConnectivityState) {
        let reconnected = {
            let mut cell = lock(&self.cell);
            if ticket <= cell.applied_ticket {
                debug!(ticket, applied = cell.applied_ticket, "discarding stale probe result");
                return;
            }
            cell.applied_ticket = ticket;
            let previous = cell.state;
            cell.state = observed;
            if previous != observed {
                info!(from = %previous, to = %observed, "connectivity changed");
                self.state_tx.send_replace(observed);
            }
            previous == ConnectivityState::Offline && observed == ConnectivityState::Online
        };

        if reconnected {
            self.notify_reconnect();
        }
    }

    fn notify_reconnect(&self) {
        let callbacks: Vec<ReconnectCallback> = lock(&self.listeners)
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        debug!(listeners = callbacks.len(), "notifying reconnect");
        for callback in callbacks {
            if std::panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!("reconnect callback panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
