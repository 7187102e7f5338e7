//! Startup configuration read from the environment.

use anyhow::Context;
use trs80_keyboard_async::config::KeyboardConfig;
use trs80_keyboard_async::geometry::PinLayout;

/// Selects the header pin layout, `1`-`4` or a layout name.
pub const LAYOUT_VAR: &str = "TRS80_PIN_LAYOUT";
/// Selects the typematic clock, `shared` or `per-key`.
pub const REPEAT_CLOCK_VAR: &str = "TRS80_REPEAT_CLOCK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    pub layout: PinLayout,
    pub keyboard: KeyboardConfig,
}

impl HostConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let layout = std::env::var(LAYOUT_VAR).ok();
        let repeat_clock = std::env::var(REPEAT_CLOCK_VAR).ok();
        Self::from_values(layout.as_deref(), repeat_clock.as_deref())
    }

    /// Builds the configuration from optional overrides of the defaults.
    pub fn from_values(layout: Option<&str>, repeat_clock: Option<&str>) -> anyhow::Result<Self> {
        let mut config = Self {
            layout: PinLayout::default(),
            keyboard: KeyboardConfig::default(),
        };
        if let Some(value) = layout {
            config.layout = value
                .parse()
                .with_context(|| format!("{LAYOUT_VAR}={value:?}"))?;
        }
        if let Some(value) = repeat_clock {
            config.keyboard.repeat_clock = value
                .parse()
                .with_context(|| format!("{REPEAT_CLOCK_VAR}={value:?}"))?;
        }
        config.keyboard.validate()?;
        Ok(config)
    }
}
