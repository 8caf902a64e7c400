use thiserror::Error;

use crate::gamepad::DeviceError;

/// Rejected session settings
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Pulse duration must be greater than 0ms")]
    ZeroDuration,

    #[error("Intensity must be strictly between 0 and 1, got {0}")]
    IntensityOutOfRange(f32),

    #[error("Intensity must be between 1% and 99%, got {0}%")]
    IntensityPercentOutOfRange(u8),
}

/// Errors surfaced to whoever drives the session
///
/// Each of these ends with the session in a well-defined state, usually Off.
/// The message text is what the user gets to see as a notification.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// EMDR needs exactly one controller per side
    #[error("Must have exactly 2 controllers to use EMDR ({found} connected)")]
    InsufficientControllers { found: usize },

    /// A connected controller cannot be driven
    #[error("Controller cannot be used for EMDR: {0}")]
    Device(#[from] DeviceError),

    #[error("Invalid settings: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The session actor is gone
    #[error("Session is no longer running")]
    Closed,
}
