use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "omni-timers")]
#[command(about = "Run timer workloads across windows and wait for them to settle.")]
pub(crate) struct Cli {
    /// Override config directory holding `omni-dev-fusion/timers.yaml`.
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set).
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// One job reschedules itself `length` times, then wait until nothing starts within the horizon.
    Chain {
        /// Number of links in the chain.
        #[arg(long, default_value_t = 51)]
        length: u64,

        /// Delay between links in milliseconds.
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,

        /// Quiescence horizon in milliseconds.
        #[arg(long, default_value_t = 1_000)]
        horizon_ms: u64,

        /// Give up after this many milliseconds.
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },
    /// An interval cancels itself after `ticks` runs, then wait until idle.
    Interval {
        /// Interval period in milliseconds.
        #[arg(long, default_value_t = 100)]
        period_ms: u64,

        /// Runs before the interval clears itself.
        #[arg(long, default_value_t = 5)]
        ticks: u64,

        /// Give up after this many milliseconds.
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },
    /// Spread jobs across windows; every window but the first closes itself mid-flight.
    Burst {
        /// Number of windows.
        #[arg(long, default_value_t = 3)]
        windows: u64,

        /// Jobs per window.
        #[arg(long, default_value_t = 10)]
        jobs: u64,

        /// Latest job delay in milliseconds.
        #[arg(long, default_value_t = 500)]
        max_delay_ms: u64,

        /// Give up after this many milliseconds.
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },
}
