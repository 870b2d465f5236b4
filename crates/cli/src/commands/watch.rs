// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;

use tracing::info;

use crate::error::Result;
use crate::sync::SyncStatus;

use super::Context;

pub async fn run(ctx: &Context) -> Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    watch_until(ctx, shutdown, |status| println!("{status}")).await;
    Ok(())
}

/// Keep the orchestrator attached, reporting each status change, until
/// `shutdown` resolves.
pub(crate) async fn watch_until<F>(
    ctx: &Context,
    shutdown: F,
    mut report: impl FnMut(&SyncStatus),
) where
    F: Future<Output = ()>,
{
    ctx.monitor.start().await;
    let orchestrator = ctx.orchestrator();
    orchestrator.attach().await;
    info!(queued = ctx.queue.len().await, "watching for reconnects");

    let mut statuses = orchestrator.watch_status();
    let initial = statuses.borrow_and_update().clone();
    report(&initial);

    // Something may be waiting from an earlier run.
    if ctx.monitor.is_online() && !ctx.queue.is_empty().await {
        orchestrator.sync_with_retries().await;
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = statuses.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = statuses.borrow_and_update().clone();
                report(&status);
            }
        }
    }

    orchestrator.detach();
    ctx.monitor.stop();
    info!("stopped watching");
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
