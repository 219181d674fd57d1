//! Per-window job manager: job table, serial worker loop, queries, single-stepping.

mod core;
mod types;

pub use self::core::JobManager;
pub(crate) use types::ManagerWiring;
pub use types::JobMetricsSnapshot;
