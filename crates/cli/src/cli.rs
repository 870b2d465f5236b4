// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Custom help template that groups commands into sections
const HELP_TEMPLATE: &str = "{about-with-newline}
{usage-heading} {usage}

{before-help}Options:
{options}{after-help}";

const COMMANDS_HELP: &str = "\
Requests:
  fetch       Send a request through the offline layer
  status      Probe connectivity and summarize local state

Sync:
  sync        Replay queued requests
  watch       Sync automatically on reconnect until interrupted

Local state:
  queue       Inspect or clear the write queue
  cache       Inspect or purge the response cache";

const QUICKSTART_HELP: &str = "\
Get started:
  outpost fetch GET https://api.example.com/items      Read, cached for later
  outpost fetch POST /orders -d '{\"item\":\"x\"}'         Write, queued when offline
  outpost queue list                                   See what is waiting
  outpost sync                                         Replay the queue now";

#[derive(Parser)]
#[command(name = "outpost", version)]
#[command(about = "An offline-first HTTP client with a durable write queue and response cache")]
#[command(help_template = HELP_TEMPLATE)]
#[command(before_help = COMMANDS_HELP)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Config file (default: ./outpost.toml, then the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send a request through the offline layer
    #[command(after_help = "Examples:\n  \
        outpost fetch GET /items/1                 Live read, cached on success\n  \
        outpost fetch GET /items/1 --offline       Served from the cache\n  \
        outpost fetch POST /orders -d '{}'         Queued if delivery fails\n  \
        outpost fetch PUT /items/1 -H 'If-Match: \"v2\"' -d @-")]
    Fetch {
        /// Request method (GET, POST, PUT, ...)
        method: String,

        /// Absolute url, or a path resolved against network.base_url
        url: String,

        /// Request header, as 'Name: value' (repeatable)
        #[arg(long = "header", short = 'H', value_name = "HEADER")]
        headers: Vec<String>,

        /// Request body
        #[arg(long, short = 'd')]
        data: Option<String>,

        /// Treat the network as unavailable without probing
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Probe connectivity and summarize local state
    Status {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Replay queued requests
    Sync {
        /// Retry with backoff instead of a single attempt
        #[arg(long)]
        retry: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Sync automatically on reconnect until interrupted
    Watch,

    /// Inspect or clear the write queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Inspect or purge the response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued requests, oldest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Print the number of queued requests
    Len,

    /// Drop every queued request
    Clear,
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// List cached fingerprints
    Keys,

    /// Delete expired entries
    Purge,

    /// Delete one entry by fingerprint
    Delete {
        /// Fingerprint as printed by 'cache keys'
        fingerprint: String,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
