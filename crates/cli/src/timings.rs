// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Phase timing instrumentation.
//!
//! Timings are logged at debug level under the `outpost::timings` target, so
//! `RUST_LOG=outpost::timings=debug` shows them without the rest of the
//! debug output.

use std::time::Instant;

/// Log how long a phase took.
#[inline]
pub fn record_timing(phase: &str, start: Instant) {
    tracing::debug!(
        target: "outpost::timings",
        phase,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "phase finished"
    );
}

/// Macro for timing a block of code.
///
/// Usage:
/// ```rust,ignore
/// let store = time_phase!("store::open", {
///     SqliteStore::open(&path)?
/// });
/// ```
#[macro_export]
macro_rules! time_phase {
    ($phase:expr, $block:expr) => {{
        let __start = std::time::Instant::now();
        let __result = $block;
        $crate::timings::record_timing($phase, __start);
        __result
    }};
}
