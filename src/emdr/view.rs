use chrono::{DateTime, Local};
use std::fmt;

use super::elapsed::format_elapsed;
use super::SessionConfig;

/// Whether bilateral stimulation is currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmdrStatus {
    #[default]
    Off,
    On,
}

impl fmt::Display for EmdrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmdrStatus::Off => write!(f, "Off"),
            EmdrStatus::On => write!(f, "On"),
        }
    }
}

/// Snapshot of the session as presented to the user
///
/// Published through a watch channel whenever something visible changes.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub status: EmdrStatus,
    pub controller_count: usize,
    /// Seconds since the session was created, independent of `status`
    pub elapsed_seconds: u64,
    pub config: SessionConfig,
    /// When the current run was switched on
    pub on_since: Option<DateTime<Local>>,
}

impl SessionView {
    pub fn new(config: SessionConfig, controller_count: usize) -> Self {
        Self {
            status: EmdrStatus::Off,
            controller_count,
            elapsed_seconds: 0,
            config,
            on_since: None,
        }
    }

    pub fn elapsed_text(&self) -> String {
        format!("Time Active: {}", format_elapsed(self.elapsed_seconds))
    }

    pub fn controller_count_text(&self) -> String {
        format!("Controller Count: {}", self.controller_count)
    }

    pub fn status_text(&self) -> String {
        format!("EMDR: {}", self.status)
    }
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub raised_at: DateTime<Local>,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raised_at: Local::now(),
        }
    }
}
