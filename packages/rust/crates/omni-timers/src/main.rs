//! omni-timers CLI: run canned timer workloads and report how the waits settle.
//!
//! Settings come from `timers.yaml` (see `load_timer_settings`); override the
//! config directory with `--conf <dir>`.
//!
//! Logging: set `RUST_LOG=omni_timers=info` (or `debug`, `trace`) to see scheduler logs on stderr.

mod cli;
mod nodes;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_timers::{TimerConfig, load_timer_settings, set_config_home_override};

use crate::cli::{Cli, Command};
use crate::nodes::{
    BurstWorkload, ChainWorkload, IntervalWorkload, run_burst_mode, run_chain_mode,
    run_interval_mode,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_timers=debug"
        } else {
            "omni_timers=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }
    let config = TimerConfig::from_settings(&load_timer_settings());

    let report = match cli.command {
        Command::Chain {
            length,
            delay_ms,
            horizon_ms,
            timeout_ms,
        } => {
            run_chain_mode(
                config,
                ChainWorkload {
                    length,
                    delay_ms,
                    horizon_ms,
                    timeout_ms,
                },
            )
            .await?
        }
        Command::Interval {
            period_ms,
            ticks,
            timeout_ms,
        } => {
            run_interval_mode(
                config,
                IntervalWorkload {
                    period_ms,
                    ticks,
                    timeout_ms,
                },
            )
            .await?
        }
        Command::Burst {
            windows,
            jobs,
            max_delay_ms,
            timeout_ms,
        } => {
            run_burst_mode(
                config,
                BurstWorkload {
                    windows,
                    jobs,
                    max_delay_ms,
                    timeout_ms,
                },
            )
            .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
