//! Bilateral stimulation with two rumbling game controllers
//!
//! Alternates rumble pulses between controller 1 and controller 2 at a
//! configurable cadence while EMDR is switched on, and reports the live
//! controller count and elapsed session time.
//!
//! # Architecture
//!
//! ```text
//! Console ──► SessionHandle ──► SessionActor ──► ControllerGateway ──► gilrs
//!    ▲                          ▲    │
//!    │          tick tasks ─────┘    │
//!    └──── SessionView / Notification┘
//! ```

pub mod config;
pub mod emdr;
pub mod gamepad;
pub mod ui;
