//! Feed Polling Scheduler
//!
//! Runs one serialized poll loop per monitored feed: fetch, evaluate,
//! notify, persist, sleep. Loops speed up while the engine reports that
//! something is in progress.

mod monitor;
mod schedule;
mod scheduler;

#[cfg(test)]
mod testing;

pub use monitor::{CycleReport, Monitor};
pub use schedule::PollSchedule;
pub use scheduler::Scheduler;
