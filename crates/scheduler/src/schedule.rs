//! Poll intervals

use alerting::Cadence;
use std::time::Duration;

/// Interval selection for one monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Interval used while nothing is in progress
    pub base_interval: Duration,
    /// Shorter interval used after an elevated cycle, if any
    pub fast_interval: Option<Duration>,
}

impl PollSchedule {
    /// Always poll at `base_interval`
    pub fn fixed(base_interval: Duration) -> Self {
        Self {
            base_interval,
            fast_interval: None,
        }
    }

    /// Poll at `fast_interval` while the last cycle was elevated.
    /// A fast interval not shorter than the base one is ignored.
    pub fn adaptive(base_interval: Duration, fast_interval: Duration) -> Self {
        Self {
            base_interval,
            fast_interval: Some(fast_interval).filter(|fast| *fast < base_interval),
        }
    }

    /// Delay before the next cycle given the last cadence hint
    pub fn next_delay(&self, cadence: Cadence) -> Duration {
        match (cadence, self.fast_interval) {
            (Cadence::Elevated, Some(fast)) => fast,
            _ => self.base_interval,
        }
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(15 * 60))
    }
}
