//! Coordinator timing configuration

use std::time::Duration;

/// Default heartbeat interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// A peer is declared failed after this many missed heartbeat intervals
pub const FAILURE_TIMEOUT_FACTOR: u32 = 3;

/// Default round duration before `ROUND_TIMEOUT`
pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(300);

/// Default polling period of the round timer heap
pub const DEFAULT_TIMER_TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Heartbeat emission and failure sweep cadence
    pub heartbeat_interval: Duration,
    /// Silence after which a peer is declared failed
    pub failure_timeout: Duration,
    pub round_timeout: Duration,
    pub timer_tick: Duration,
}

impl CoordinatorConfig {
    /// Build a config whose failure timeout follows the heartbeat interval
    pub fn new(heartbeat_interval: Duration, round_timeout: Duration, timer_tick: Duration) -> Self {
        Self {
            heartbeat_interval,
            failure_timeout: heartbeat_interval * FAILURE_TIMEOUT_FACTOR,
            round_timeout,
            timer_tick,
        }
    }

    pub fn failure_timeout_millis(&self) -> i64 {
        duration_millis(self.failure_timeout)
    }

    pub fn round_timeout_millis(&self) -> i64 {
        duration_millis(self.round_timeout)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_HEARTBEAT_INTERVAL,
            DEFAULT_ROUND_TIMEOUT,
            DEFAULT_TIMER_TICK,
        )
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
