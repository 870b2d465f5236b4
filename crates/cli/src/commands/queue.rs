// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::{OutputFormat, QueueCommand};
use crate::error::Result;
use crate::queue::QueuedRequest;

use super::Context;

pub async fn run(ctx: &Context, command: QueueCommand) -> Result<()> {
    println!("{}", run_impl(ctx, command).await?);
    Ok(())
}

pub(crate) async fn run_impl(ctx: &Context, command: QueueCommand) -> Result<String> {
    match command {
        QueueCommand::List { output } => {
            let entries = ctx.queue.snapshot().await;
            match output {
                OutputFormat::Json => Ok(serde_json::to_string(&entries)?),
                OutputFormat::Text => Ok(format_list(&entries)),
            }
        }
        QueueCommand::Len => Ok(ctx.queue.len().await.to_string()),
        QueueCommand::Clear => {
            let dropped = ctx.queue.clear().await;
            Ok(format!("cleared {dropped} queued request(s)"))
        }
    }
}

fn format_list(entries: &[QueuedRequest]) -> String {
    if entries.is_empty() {
        return "queue is empty".to_string();
    }
    entries
        .iter()
        .map(|q| {
            format!(
                "#{:<4} {}  {}",
                q.id,
                q.queued_at.format("%Y-%m-%d %H:%M:%S"),
                q.request
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
