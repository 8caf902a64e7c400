//! Periodic monitors feeding the session mailbox
//!
//! Both monitors run for the whole life of the session, regardless of
//! whether pulses are on. They only enqueue commands; the session actor does
//! the actual work.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::command::SessionCommand;

/// Polls the controller list, first poll right away
///
/// Late polls are skipped rather than bunched up, only the newest count
/// matters.
pub fn spawn_controller_poll(
    mailbox: mpsc::WeakSender<SessionCommand>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Starting controller poll every {:?}", period);
    spawn_ticker("controller poll", mailbox, interval, cancel, || {
        SessionCommand::PollControllers
    })
}

/// Counts session seconds, first tick one period after start
///
/// Missed ticks are delivered in a burst so the counter catches up with
/// wall time after a stall.
pub fn spawn_elapsed_counter(
    mailbox: mpsc::WeakSender<SessionCommand>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let interval = time::interval_at(Instant::now() + period, period);
    info!("Starting elapsed counter every {:?}", period);
    spawn_ticker("elapsed counter", mailbox, interval, cancel, || {
        SessionCommand::ElapsedTick
    })
}

fn spawn_ticker(
    name: &'static str,
    mailbox: mpsc::WeakSender<SessionCommand>,
    mut interval: time::Interval,
    cancel: CancellationToken,
    command: fn() -> SessionCommand,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = interval.tick() => {
                    let Some(sender) = mailbox.upgrade() else { break };
                    if sender.send(command()).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Monitor '{}' finished", name);
    })
}
