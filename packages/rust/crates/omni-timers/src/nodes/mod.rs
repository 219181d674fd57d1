mod burst;
mod chain;
mod interval;
mod report;

pub(crate) use burst::{BurstWorkload, run_burst_mode};
pub(crate) use chain::{ChainWorkload, run_chain_mode};
pub(crate) use interval::{IntervalWorkload, run_interval_mode};
pub(crate) use report::WorkloadReport;
