//! Scheduled sync daemon: interval scheduler, signal handling, logging setup,
//! and rotation of the dated log file.

mod error;
pub mod log_rotation;
pub mod logging;
pub mod paths;
mod runtime;

pub use error::DaemonError;
pub use runtime::{
    run, scheduler_loop, scheduler_loop_with_clock, start_blocking, CycleRunner, CycleSummary,
    LiveCycle, Trigger, WallClock,
};
