//! UI Bridge
//!
//! Connects a front-end to the session: user events go in through
//! [`SessionHandle`](crate::emdr::SessionHandle), display updates come out as
//! [`SessionView`](crate::emdr::SessionView) snapshots and notifications.
//! The only front-end shipped here is a line-based console.

pub mod command;
pub mod console;

pub use command::{ParseError, UiCommand};
pub use console::run_console;
