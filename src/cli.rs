//! Command-line surface for the indexer binary.
//!
//! Mirrors the teacher's `BscCli`/`BscCommands` shape (a top-level `clap`
//! parser wrapping one subcommand per runnable role) but each subcommand
//! here starts a long-running async component instead of a node.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "chainidx - EVM contract indexer and analytics core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the read + admin HTTP API.
    Serve(ServeArgs),
    /// Run one or more background workers.
    Worker(WorkerArgs),
    /// Apply pending database migrations and exit.
    Migrate,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind the HTTP API to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind_addr: String,
}

#[derive(Debug, Args)]
pub struct WorkerArgs {
    #[command(subcommand)]
    pub role: WorkerRole,
}

#[derive(Debug, Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    /// Discovery worker: keeps `transaction_details` complete per contract.
    Discovery,
    /// Realtime enrichment worker (30s poll over the last 5 minutes).
    Enrichment,
    /// Gap-fill worker: scans full history for discovery/enrichment gaps.
    GapFill {
        /// Report gaps without enqueuing backfill/enrich jobs.
        #[arg(long)]
        dry_run: bool,
    },
    /// Job dispatcher: leases and executes queued jobs.
    Dispatcher {
        /// Number of concurrent leases this dispatcher instance holds.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
