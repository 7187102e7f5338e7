//! Scanner configuration.

use core::str::FromStr;

use crate::err::ConfigError;
use crate::idle::IdleConfig;
use crate::typematic::{RepeatClock, TypematicConfig};

/// Electrical level that marks a strobed row and a closed switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrobePolarity {
    /// Rows are driven high, columns pulled down and read high when closed.
    ActiveHigh,
    /// Rows are driven low, columns pulled up and read low when closed.
    ActiveLow,
}

/// Configuration of a [`crate::scanner::Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardConfig {
    /// Strobe and sense polarity.
    pub polarity: StrobePolarity,
    /// Typematic delay and rate, in scan ticks.
    pub typematic: TypematicConfig,
    /// Whether typematic timing is shared by all keys or kept per key.
    pub repeat_clock: RepeatClock,
    /// Scan rates and the idle thresholds between them.
    pub idle: IdleConfig,
}

impl KeyboardConfig {
    /// Rejects values the scanner cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.typematic.initial_delay == 0 || self.typematic.repeat_interval == 0 {
            return Err(ConfigError::ZeroRepeatThreshold);
        }
        Ok(())
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            polarity: StrobePolarity::ActiveHigh,
            typematic: TypematicConfig::default(),
            repeat_clock: RepeatClock::PerKey,
            idle: IdleConfig::default(),
        }
    }
}

impl FromStr for RepeatClock {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("shared") => Ok(Self::Shared),
            s if s.eq_ignore_ascii_case("per-key") || s.eq_ignore_ascii_case("perkey") => {
                Ok(Self::PerKey)
            }
            _ => Err(ConfigError::UnknownRepeatClock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = KeyboardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.typematic.initial_delay, 30);
        assert_eq!(config.typematic.repeat_interval, 5);
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let mut config = KeyboardConfig::default();
        config.typematic.repeat_interval = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRepeatThreshold));
    }

    #[test]
    fn parses_repeat_clock() {
        assert_eq!("shared".parse::<RepeatClock>(), Ok(RepeatClock::Shared));
        assert_eq!("Per-Key".parse::<RepeatClock>(), Ok(RepeatClock::PerKey));
        assert_eq!(
            "global".parse::<RepeatClock>(),
            Err(ConfigError::UnknownRepeatClock)
        );
    }
}
