//! Typematic (auto-repeat) timing.
//!
//! Timing is counted in scan ticks, not wall time: a held key first repeats
//! after [`TypematicConfig::initial_delay`] ticks and then every
//! [`TypematicConfig::repeat_interval`] ticks.

/// Where the elapsed-tick count for repeat decisions comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatClock {
    /// One counter for the whole keyboard, restarted by any key transition.
    ///
    /// A press or release of one key restarts the delay of every other held
    /// key, so overlapping held keys hold back each other's repeats.
    Shared,
    /// Every held key counts its own ticks since press or last repeat.
    PerKey,
}

/// Typematic thresholds, in scan ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypematicConfig {
    /// Ticks from press to the first repeat.
    pub initial_delay: u32,
    /// Ticks between two repeats.
    pub repeat_interval: u32,
}

impl Default for TypematicConfig {
    fn default() -> Self {
        Self {
            initial_delay: 30,
            repeat_interval: 5,
        }
    }
}

/// Ticks elapsed since a key was pressed or last repeated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepeatTimer {
    elapsed: u32,
}

impl RepeatTimer {
    fn advance(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1);
    }

    fn restart(&mut self) {
        self.elapsed = 0;
    }
}

/// Decides when held keys repeat.
#[derive(Debug, Clone)]
pub struct Typematic {
    config: TypematicConfig,
    clock: RepeatClock,
    shared: RepeatTimer,
}

impl Typematic {
    pub fn new(config: TypematicConfig, clock: RepeatClock) -> Self {
        Self {
            config,
            clock,
            shared: RepeatTimer::default(),
        }
    }

    /// Ticks counted by the shared clock, whichever clock is in use.
    pub fn polls_since_change(&self) -> u32 {
        self.shared.elapsed
    }

    /// Called once at the start of every scan tick.
    pub fn begin_tick(&mut self) {
        self.shared.advance();
    }

    /// Called once for every held key whose switch still reads closed.
    ///
    /// Returns `true` if the key is due for a repeat on this tick. The caller
    /// reports the repeat back through [`Typematic::fired`].
    pub fn hold(&self, timer: &mut RepeatTimer, repeating: bool) -> bool {
        let elapsed = match self.clock {
            RepeatClock::Shared => self.shared.elapsed,
            RepeatClock::PerKey => {
                timer.advance();
                timer.elapsed
            }
        };
        let threshold = if repeating {
            self.config.repeat_interval
        } else {
            self.config.initial_delay
        };
        elapsed == threshold
    }

    /// Restarts a key's timer after it repeated.
    pub fn fired(&self, timer: &mut RepeatTimer) {
        timer.restart();
    }

    /// Called once at the end of every scan tick.
    pub fn end_tick(&mut self, changed: bool) {
        if changed {
            self.shared.restart();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Holds one key for `ticks` ticks after the press tick, returning the
    /// ticks (relative to the press) that repeated.
    fn hold_for(clock: RepeatClock, ticks: u32) -> std::vec::Vec<u32> {
        let mut typematic = Typematic::new(TypematicConfig::default(), clock);
        let mut timer = RepeatTimer::default();
        let mut repeating = false;
        let mut fired = std::vec::Vec::new();

        // Press tick.
        typematic.begin_tick();
        typematic.end_tick(true);

        for tick in 1..=ticks {
            typematic.begin_tick();
            let due = typematic.hold(&mut timer, repeating);
            if due {
                typematic.fired(&mut timer);
                repeating = true;
                fired.push(tick);
            }
            typematic.end_tick(due);
        }
        fired
    }

    #[test]
    fn per_key_repeats_after_delay_then_at_rate() {
        assert_eq!(hold_for(RepeatClock::PerKey, 50), [30, 35, 40, 45, 50]);
    }

    #[test]
    fn shared_repeats_after_delay_then_at_rate() {
        assert_eq!(hold_for(RepeatClock::Shared, 50), [30, 35, 40, 45, 50]);
    }

    #[test]
    fn no_repeat_before_delay() {
        assert!(hold_for(RepeatClock::PerKey, 29).is_empty());
        assert!(hold_for(RepeatClock::Shared, 29).is_empty());
    }

    #[test]
    fn shared_clock_restarts_on_any_change() {
        let mut typematic = Typematic::new(TypematicConfig::default(), RepeatClock::Shared);
        let mut timer = RepeatTimer::default();
        for _ in 0..20 {
            typematic.begin_tick();
            assert!(!typematic.hold(&mut timer, false));
            typematic.end_tick(false);
        }
        // Another key changes state.
        typematic.begin_tick();
        typematic.end_tick(true);
        assert_eq!(typematic.polls_since_change(), 0);

        let mut first = None;
        for tick in 1..=40 {
            typematic.begin_tick();
            if typematic.hold(&mut timer, false) {
                first = Some(tick);
                break;
            }
            typematic.end_tick(false);
        }
        assert_eq!(first, Some(30));
    }

    #[test]
    fn per_key_clock_ignores_other_changes() {
        let mut typematic = Typematic::new(TypematicConfig::default(), RepeatClock::PerKey);
        let mut timer = RepeatTimer::default();
        for tick in 1..=30 {
            typematic.begin_tick();
            let due = typematic.hold(&mut timer, false);
            assert_eq!(due, tick == 30);
            // Some other key changes on every tick.
            typematic.end_tick(true);
        }
    }
}
