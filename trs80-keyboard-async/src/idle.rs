//! Adaptive scan rate.
//!
//! Scanning runs at the full rate while keys change and backs off in two
//! steps once the keyboard has been idle for a while. The next change brings
//! the full rate back immediately.

use embassy_time::Duration;

/// Scan intervals and the idle tick counts that switch between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    /// Interval while keys are changing.
    pub full_rate: Duration,
    /// Interval after `reduce_after` idle ticks.
    pub reduced_rate: Duration,
    /// Interval after `slow_after` idle ticks.
    pub slow_rate: Duration,
    /// Idle ticks before dropping to `reduced_rate`.
    pub reduce_after: u32,
    /// Idle ticks before dropping to `slow_rate`.
    pub slow_after: u32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            full_rate: Duration::from_hz(60),
            reduced_rate: Duration::from_hz(10),
            slow_rate: Duration::from_hz(5),
            // ~10 s at 60 Hz
            reduce_after: 600,
            // a further ~60 s at 10 Hz
            slow_after: 1200,
        }
    }
}

/// Tracks idle ticks and picks the wait before the next scan.
#[derive(Debug, Clone)]
pub struct IdleRateController {
    config: IdleConfig,
    idle_ticks: u32,
    interval: Duration,
}

impl IdleRateController {
    pub fn new(config: IdleConfig) -> Self {
        Self {
            interval: config.full_rate,
            config,
            idle_ticks: 0,
        }
    }

    /// Wait before the next scan tick.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Consecutive ticks without a transition.
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    /// Records the outcome of a scan tick and returns the next interval.
    pub fn observe(&mut self, changed: bool) -> Duration {
        if changed {
            if self.interval != self.config.full_rate {
                log::debug!("Key activity after {} idle ticks, full scan rate.", self.idle_ticks);
            }
            self.idle_ticks = 0;
            self.interval = self.config.full_rate;
            return self.interval;
        }

        self.idle_ticks = self.idle_ticks.saturating_add(1);
        if self.idle_ticks == self.config.reduce_after {
            log::debug!("Idle for {} ticks, reducing scan rate.", self.idle_ticks);
            self.interval = self.config.reduced_rate;
        } else if self.idle_ticks == self.config.slow_after {
            log::debug!("Idle for {} ticks, slow scan rate.", self.idle_ticks);
            self.interval = self.config.slow_rate;
        }
        self.interval
    }
}
