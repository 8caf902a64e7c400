use thiserror::Error;

/// Errors reported by a [`ControllerGateway`](super::ControllerGateway)
///
/// None of these are fatal. A failed refresh keeps the previous controller
/// count and the next poll simply tries again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The input driver could not be brought up
    #[error("Failed to initialize gamepad driver: {0}")]
    InitializationError(String),

    /// Polling the driver for device state failed
    #[error("Failed to refresh gamepad state: {0}")]
    RefreshError(String),

    /// No controller sits at the requested position
    #[error("No controller connected at index {index} ({connected} connected)")]
    NoController { index: usize, connected: usize },

    /// The controller is connected but has no force feedback
    #[error("Controller {index} ({name}) does not support rumble")]
    RumbleUnsupported { index: usize, name: String },

    /// The driver accepted the controller but rejected the effect
    #[error("Failed to play rumble on controller {index}: {reason}")]
    RumbleFailed { index: usize, reason: String },
}
