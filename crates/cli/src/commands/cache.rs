// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use outpost_core::Fingerprint;

use crate::cli::CacheCommand;
use crate::error::Result;

use super::Context;

pub async fn run(ctx: &Context, command: CacheCommand) -> Result<()> {
    let out = run_impl(ctx, command).await?;
    if !out.is_empty() {
        println!("{out}");
    }
    Ok(())
}

pub(crate) async fn run_impl(ctx: &Context, command: CacheCommand) -> Result<String> {
    match command {
        CacheCommand::Keys => {
            let keys = ctx.cache.list_keys().await?;
            Ok(keys
                .iter()
                .map(Fingerprint::as_str)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        CacheCommand::Purge => {
            let purged = ctx.cache.purge_expired().await?;
            Ok(format!("purged {purged} expired entr{}", plural(purged)))
        }
        CacheCommand::Delete { fingerprint } => {
            let fingerprint = Fingerprint::from_raw(fingerprint.trim());
            if !ctx.cache.list_keys().await?.contains(&fingerprint) {
                return Ok(format!("not cached: {fingerprint}"));
            }
            ctx.cache.delete(&fingerprint).await;
            Ok(format!("deleted {fingerprint}"))
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
