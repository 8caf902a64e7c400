use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ConfigError;

/// Lowest and highest intensity the slider offers, in percent
///
/// The rumble driver rejects exactly 0.0 and 1.0, so the range stops short.
pub const INTENSITY_PERCENT_MIN: u8 = 1;
pub const INTENSITY_PERCENT_MAX: u8 = 99;

/// Pulse settings for a bilateral stimulation session
///
/// Read by the scheduler on every start or restart. Changing a value on a
/// running session only takes effect through a restart.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// How long each controller vibrates, in milliseconds
    pub duration_ms: u32,
    /// Silence between one side's pulse and the other's, in milliseconds
    pub gap_ms: u32,
    /// Motor strength, strictly between 0 and 1
    pub intensity: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_ms: 500,
            gap_ms: 150,
            intensity: 0.5,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_ms == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if !(self.intensity > 0.0 && self.intensity < 1.0) {
            return Err(ConfigError::IntensityOutOfRange(self.intensity));
        }
        Ok(())
    }

    /// Returns a copy with duration and gap replaced where given
    ///
    /// A `None` keeps the current value, like an empty input field.
    pub fn with_timing(
        &self,
        duration_ms: Option<u32>,
        gap_ms: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let updated = Self {
            duration_ms: duration_ms.unwrap_or(self.duration_ms),
            gap_ms: gap_ms.unwrap_or(self.gap_ms),
            intensity: self.intensity,
        };
        updated.validate()?;
        Ok(updated)
    }

    /// Returns a copy with the intensity taken from a slider percentage
    pub fn with_intensity_percent(&self, percent: u8) -> Result<Self, ConfigError> {
        if !(INTENSITY_PERCENT_MIN..=INTENSITY_PERCENT_MAX).contains(&percent) {
            return Err(ConfigError::IntensityPercentOutOfRange(percent));
        }
        Ok(Self {
            intensity: f32::from(percent) * 0.01,
            ..*self
        })
    }

    pub fn intensity_percent(&self) -> u8 {
        (self.intensity * 100.0).round() as u8
    }

    pub fn duration_label(&self) -> String {
        format!("Duration: {}ms", self.duration_ms)
    }

    pub fn gap_label(&self) -> String {
        format!("Gap: {}ms", self.gap_ms)
    }

    pub fn intensity_label(&self) -> String {
        format!("Intensity (Value: {}%)", self.intensity_percent())
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ms pulse, {}ms gap, {}% intensity",
            self.duration_ms,
            self.gap_ms,
            self.intensity_percent()
        )
    }
}
