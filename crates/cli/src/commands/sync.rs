// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::queue::SyncResult;
use crate::sync::SyncError;

use super::Context;

pub async fn run(ctx: &Context, retry: bool, output: OutputFormat) -> Result<()> {
    let result = run_impl(ctx, retry).await?;
    println!("{}", render(&result, output)?);
    if !result.success {
        return Err(Error::SyncIncomplete {
            remaining: result.remaining,
        });
    }
    Ok(())
}

/// Probe, then replay the queue once or with backoff.
pub(crate) async fn run_impl(ctx: &Context, retry: bool) -> Result<SyncResult> {
    ctx.monitor.start().await;
    let orchestrator = ctx.orchestrator();

    let result = if retry {
        if !ctx.monitor.is_online() {
            ctx.monitor.stop();
            return Err(SyncError::Offline.into());
        }
        Ok(orchestrator.sync_with_retries().await)
    } else {
        orchestrator.sync_now().await
    };
    ctx.monitor.stop();

    Ok(result?)
}

pub(crate) fn render(result: &SyncResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(result)?),
        OutputFormat::Text => {
            let mut out = if result.failures.is_empty() && result.remaining == 0 {
                "queue empty, nothing left to sync".to_string()
            } else {
                format!("{} request(s) still queued", result.remaining)
            };
            for failure in &result.failures {
                out.push_str(&format!("\n  failed: {} ({})", failure.request, failure.error));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
