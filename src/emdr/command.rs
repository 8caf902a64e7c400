use tokio::sync::oneshot;

use super::plan::{Pulse, Side};
use super::{EmdrStatus, SessionConfig, SessionError};

/// Reply channel for user-triggered commands
pub type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// A due pulse, stamped with the schedule it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseTick {
    pub generation: u64,
    pub side: Side,
    pub pulse: Pulse,
}

/// Everything the session actor reacts to, in arrival order
///
/// User events, scheduler ticks and monitor ticks all share one mailbox so
/// the actor is the only writer of session state.
#[derive(Debug)]
pub enum SessionCommand {
    Toggle {
        reply: Reply<EmdrStatus>,
    },
    UpdateTiming {
        duration_ms: Option<u32>,
        gap_ms: Option<u32>,
        reply: Reply<SessionConfig>,
    },
    SetIntensity {
        percent: u8,
        reply: Reply<SessionConfig>,
    },
    Pulse(PulseTick),
    PollControllers,
    ElapsedTick,
    Shutdown {
        done: oneshot::Sender<()>,
    },
}
