// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outpost - An offline-first HTTP layer.
//!
//! Requests go through an [`Interceptor`](intercept::Interceptor) that
//! forwards them while the network is reachable, serves reads from a
//! persistent response cache when it is not, and parks writes in a durable
//! queue that is replayed in order once connectivity returns.
//!
//! # Main Components
//!
//! - [`connectivity`] - Probe-confirmed online/offline state and reconnect listeners
//! - [`cache`] - Response cache keyed by request fingerprint, with max-age expiry
//! - [`queue`] - Durable FIFO of deferred writes and its flush
//! - [`intercept`] - The routing decorator over a [`Transport`](transport::Transport)
//! - [`sync`] - Reconnect-driven flushing with bounded retries
//!
//! # Wiring
//!
//! ```rust,ignore
//! use clap::Parser;
//!
//! let cli = outpost::Cli::parse();
//! outpost::run(cli).await?;
//! ```

mod cli;
mod commands;
pub mod timings;

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod intercept;
pub mod logging;
pub mod queue;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use cli::{CacheCommand, Cli, Command, OutputFormat, QueueCommand};
pub use config::Config;
pub use error::{Error, Result};

use commands::fetch::FetchArgs;
use commands::Context;

/// Load config, set up logging and run one command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    logging::init(config.log_file.as_deref(), cli.verbose);

    let ctx = Context::open(config).await?;
    match cli.command {
        Command::Fetch {
            method,
            url,
            headers,
            data,
            offline,
            output,
        } => {
            let args = FetchArgs {
                method: &method,
                url: &url,
                headers: &headers,
                data: data.as_deref(),
                offline,
                output,
            };
            commands::fetch::run(&ctx, args).await
        }
        Command::Status { output } => commands::status::run(&ctx, output).await,
        Command::Sync { retry, output } => commands::sync::run(&ctx, retry, output).await,
        Command::Watch => commands::watch::run(&ctx).await,
        Command::Queue { command } => commands::queue::run(&ctx, command).await,
        Command::Cache { command } => commands::cache::run(&ctx, command).await,
    }
}
