//! Gamepad subsystem for rumble output
//!
//! Wraps the device driver behind the [`ControllerGateway`] trait so the
//! session never talks to gilrs directly:
//!
//! 1. [`gateway`] - Gateway trait, controller snapshots and pulse parameters
//! 2. [`gilrs_gateway`] - Real hardware through gilrs force feedback
//! 3. [`virtual_gateway`] - In-process pads for running without hardware
//!
//! # Architecture
//!
//! ```text
//! SessionActor ──► ControllerGateway ──► gilrs / virtual pads
//!                  (refresh, count, rumble)
//! ```
//!
//! Controller order is whatever the driver reports on the last refresh.
//! Index 0 is "controller 1", index 1 is "controller 2".

pub mod error;
pub mod gateway;
pub mod gilrs_gateway;
pub mod virtual_gateway;

pub use error::DeviceError;
pub use gateway::{ControllerGateway, ControllerInfo, ControllerSet};
pub use gilrs_gateway::GilrsGateway;
pub use virtual_gateway::{RecordedPulse, VirtualGateway, VirtualPads};
