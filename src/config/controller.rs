//! Motion controller configuration from TOML.

use serde::Deserialize;

use crate::error::ConfigError;

use super::units::{StepsPerSec, StepsPerSecSquared};

/// Complete motion controller configuration.
///
/// ```toml
/// max_speed_steps_per_sec = 4000.0
/// acceleration_steps_per_sec2 = 3200.0
/// tick_period_us = 1000
/// microsteps = 16
/// pulse_width_us = 5
/// ```
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Maximum commanded speed; faster command parameters are clamped.
    #[serde(rename = "max_speed_steps_per_sec")]
    pub max_speed: StepsPerSec,

    /// Default acceleration applied at startup. Zero disables ramping.
    #[serde(rename = "acceleration_steps_per_sec2", default)]
    pub acceleration: StepsPerSecSquared,

    /// Hardware timer tick period in microseconds.
    ///
    /// 250-1000 us is the practical range: shorter periods give finer
    /// ramp resolution at the cost of interrupt load.
    #[serde(default = "default_tick_period_us")]
    pub tick_period_us: u32,

    /// Microstep divisor for drivers that support it.
    ///
    /// Unrecognized values fall back to full step rather than failing.
    #[serde(default = "default_microsteps")]
    pub microsteps: u16,

    /// Step pulse width in microseconds.
    #[serde(default = "default_pulse_width_us")]
    pub pulse_width_us: u32,
}

fn default_tick_period_us() -> u32 {
    1000
}

fn default_microsteps() -> u16 {
    1
}

fn default_pulse_width_us() -> u32 {
    5
}

impl ControllerConfig {
    /// Validate the configuration.
    ///
    /// Only values that would make the engine inoperable are rejected;
    /// everything else (including unknown microstep divisors) is
    /// resolved by the clamp/fallback policy at the point of use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_speed.0 > 0.0) {
            return Err(ConfigError::InvalidMaxSpeed(self.max_speed.0));
        }
        if self.tick_period_us == 0 {
            return Err(ConfigError::InvalidTickPeriod(self.tick_period_us));
        }
        if self.pulse_width_us == 0 {
            return Err(ConfigError::InvalidPulseWidth(self.pulse_width_us));
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_speed: StepsPerSec(4000.0),
            acceleration: StepsPerSecSquared(3200.0),
            tick_period_us: default_tick_period_us(),
            microsteps: default_microsteps(),
            pulse_width_us: default_pulse_width_us(),
        }
    }
}
