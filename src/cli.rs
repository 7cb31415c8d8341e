use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cragcast", version, about = "Rock drying estimates for climbing routes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON snapshot of routes, weather and tree coverage
    #[arg(short, long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Evaluation time (RFC 3339); defaults to now
    #[arg(long, global = true)]
    pub at: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run interactive setup
    Init,
    /// Validate config and snapshot
    Check,
    /// Current drying status of one route
    Status {
        route: String,
    },
    /// Drying forecast for one route
    Forecast {
        route: String,
        /// Show every period without merging same-status neighbours
        #[arg(long)]
        raw: bool,
    },
    /// Drying statistics for an area
    Area {
        area: String,
    },
    /// Drying status for many routes or areas at once
    Batch {
        /// Treat ids as area ids
        #[arg(long)]
        areas: bool,
        /// Give up after this many seconds and report what finished
        #[arg(long)]
        timeout_secs: Option<u64>,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}
