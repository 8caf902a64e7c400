//! Bilateral stimulation core
//!
//! Alternates rumble pulses between two controllers while EMDR is on, and
//! keeps the live controller count and elapsed session time up to date.
//!
//! # Modules
//!
//! - [`config`] - Pulse settings and their validation
//! - [`plan`] - Pure timing arithmetic for the alternating pulse train
//! - [`scheduler`] - Typestate scheduler owning the two tick tasks
//! - [`monitor`] - Controller poll and elapsed counter tick tasks
//! - [`session`] - The actor that owns all state, plus its handle
//! - [`elapsed`] - `[H]h Mm Ss` formatting
//! - [`view`] - What the UI gets to see
//!
//! # Timing
//!
//! With pulse duration `d` and gap `g`, controller 1 fires at `0` and
//! controller 2 at `d+g`, both every `2(d+g)`.

pub mod command;
pub mod config;
pub mod elapsed;
pub mod error;
pub mod monitor;
pub mod plan;
pub mod scheduler;
pub mod session;
pub mod view;

pub use config::SessionConfig;
pub use elapsed::format_elapsed;
pub use error::{ConfigError, SessionError};
pub use plan::{Pulse, PulsePlan, Side};
pub use scheduler::{PulseScheduler, REQUIRED_CONTROLLERS};
pub use session::{SessionHandle, SessionSettings};
pub use view::{EmdrStatus, Notification, SessionView};
