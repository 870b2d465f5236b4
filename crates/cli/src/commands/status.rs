// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::connectivity::ConnectivityState;
use crate::error::Result;

use super::Context;

#[derive(Debug, Serialize)]
pub(crate) struct StatusReport {
    pub connectivity: String,
    pub probe_url: String,
    pub queued: usize,
    pub cached: usize,
    /// Oldest queued request, as `METHOD url`.
    pub oldest: Option<String>,
}

pub async fn run(ctx: &Context, output: OutputFormat) -> Result<()> {
    println!("{}", run_impl(ctx, output).await?);
    Ok(())
}

pub(crate) async fn run_impl(ctx: &Context, output: OutputFormat) -> Result<String> {
    let report = collect(ctx).await?;
    match output {
        OutputFormat::Text => Ok(format_text(&report)),
        OutputFormat::Json => Ok(serde_json::to_string(&report)?),
    }
}

pub(crate) async fn collect(ctx: &Context) -> Result<StatusReport> {
    let state = ctx.monitor.start().await;
    ctx.monitor.stop();

    let snapshot = ctx.queue.snapshot().await;
    let cached = ctx.cache.list_keys().await?.len();

    Ok(StatusReport {
        connectivity: state.to_string(),
        probe_url: ctx.monitor.config().probe_url.clone(),
        queued: snapshot.len(),
        cached,
        oldest: snapshot.first().map(|q| q.request.to_string()),
    })
}

fn format_text(report: &StatusReport) -> String {
    let mut out = format!(
        "connectivity: {}\nqueued:       {}\ncached:       {}",
        report.connectivity, report.queued, report.cached
    );
    if let Some(oldest) = &report.oldest {
        out.push_str(&format!("\noldest:       {oldest}"));
    }
    if report.connectivity == ConnectivityState::Offline.to_string() {
        out.push_str(&format!("\n  hint: probe to {} failed", report.probe_url));
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
