//! Session actor - single owner of all EMDR state
//!
//! Every state change runs inside one tokio task that drains the session
//! mailbox in arrival order. User events, pulse ticks and monitor ticks are
//! all [`SessionCommand`]s, so a tick can never observe a half-applied
//! settings update.
//!
//! # State Machine
//!
//! ```text
//!              toggle (2 pads)
//!     Off ───────────────────────► On ──┐
//!      ▲ ◄──────── toggle ─────────┘    │ update settings
//!      │                               (restart)
//!      └──── pads != 2 on poll ◄───────┘
//! ```
//!
//! # Architecture
//!
//! ```text
//! SessionHandle ──┐
//! Tick tasks ─────┼─► mailbox ─► SessionActor ─► ControllerGateway
//! Monitors ───────┘                   │
//!                                     ├─► watch<SessionView>
//!                                     └─► mpsc<Notification>
//! ```

use chrono::Local;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::command::{PulseTick, SessionCommand};
use super::monitor::{spawn_controller_poll, spawn_elapsed_counter};
use super::plan::PulsePlan;
use super::scheduler::{Idle, PulseScheduler, Pulsing, StartRejected, REQUIRED_CONTROLLERS};
use super::{EmdrStatus, Notification, SessionConfig, SessionError, SessionView};
use crate::gamepad::ControllerGateway;

const MAILBOX_CAPACITY: usize = 256;
const NOTIFICATION_CAPACITY: usize = 32;

/// Runtime settings for a session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    /// Pulse settings the session starts out with
    pub initial: SessionConfig,
    /// How often the controller list is refreshed
    pub poll_interval: Duration,
    /// Period of the elapsed-time counter, one second on a real clock
    pub elapsed_interval: Duration,
    /// Switch off when the controller count leaves 2 while running
    pub stop_on_disconnect: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            initial: SessionConfig::default(),
            poll_interval: Duration::from_millis(50),
            elapsed_interval: Duration::from_secs(1),
            stop_on_disconnect: true,
        }
    }
}

enum Scheduler {
    Idle(PulseScheduler<Idle>),
    Pulsing(PulseScheduler<Pulsing>),
}

/// Owns config, status, counters and the gateway
pub struct SessionActor {
    gateway: Box<dyn ControllerGateway>,
    config: SessionConfig,
    scheduler: Option<Scheduler>,
    view: SessionView,
    stop_on_disconnect: bool,
    mailbox: mpsc::WeakSender<SessionCommand>,
    view_tx: watch::Sender<SessionView>,
    notify_tx: mpsc::Sender<Notification>,
    monitors: CancellationToken,
}

impl SessionActor {
    fn status(&self) -> EmdrStatus {
        match self.scheduler {
            Some(Scheduler::Pulsing(_)) => EmdrStatus::On,
            _ => EmdrStatus::Off,
        }
    }

    fn take_scheduler(&mut self) -> Scheduler {
        match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => {
                error!("Scheduler slot was empty, creating a fresh idle scheduler");
                Scheduler::Idle(PulseScheduler::create(self.mailbox.clone()))
            }
        }
    }

    /// Processes commands until shutdown or until every sender is gone
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Session actor running");

        while let Some(command) = commands.recv().await {
            match command {
                SessionCommand::Toggle { reply } => {
                    let result = self.toggle();
                    let _ = reply.send(result);
                }
                SessionCommand::UpdateTiming {
                    duration_ms,
                    gap_ms,
                    reply,
                } => {
                    let result = self.update_timing(duration_ms, gap_ms);
                    let _ = reply.send(result);
                }
                SessionCommand::SetIntensity { percent, reply } => {
                    let result = self.set_intensity(percent);
                    let _ = reply.send(result);
                }
                SessionCommand::Pulse(tick) => self.pulse(tick),
                SessionCommand::PollControllers => self.poll_controllers(),
                SessionCommand::ElapsedTick => self.elapsed_tick(),
                SessionCommand::Shutdown { done } => {
                    self.shutdown();
                    let _ = done.send(());
                    return;
                }
            }
        }

        info!("All session handles dropped");
        self.shutdown();
    }

    fn toggle(&mut self) -> Result<EmdrStatus, SessionError> {
        match self.take_scheduler() {
            Scheduler::Pulsing(running) => {
                self.scheduler = Some(Scheduler::Idle(running.stop()));
                info!("EMDR switched off");
                self.publish();
                Ok(EmdrStatus::Off)
            }
            Scheduler::Idle(idle) => {
                // Start decides on a fresh controller list, not the last poll
                if let Err(e) = self.gateway.refresh() {
                    warn!("Controller refresh before start failed: {}", e);
                }
                self.view.controller_count = self.gateway.count();

                let plan = PulsePlan::new(&self.config);
                let result = idle.start(plan, &*self.gateway);
                self.settle_start(result)?;
                info!("EMDR switched on: {}", self.config);
                Ok(EmdrStatus::On)
            }
        }
    }

    fn update_timing(
        &mut self,
        duration_ms: Option<u32>,
        gap_ms: Option<u32>,
    ) -> Result<SessionConfig, SessionError> {
        let updated = match self.config.with_timing(duration_ms, gap_ms) {
            Ok(updated) => updated,
            Err(e) => return Err(self.reject(e.into())),
        };
        info!(
            "Timing updated: duration {}ms, gap {}ms",
            updated.duration_ms, updated.gap_ms
        );
        self.apply_config(updated)
    }

    fn set_intensity(&mut self, percent: u8) -> Result<SessionConfig, SessionError> {
        let updated = match self.config.with_intensity_percent(percent) {
            Ok(updated) => updated,
            Err(e) => return Err(self.reject(e.into())),
        };
        info!("Intensity updated to {}%", percent);
        self.apply_config(updated)
    }

    /// Stores new settings and restarts the schedule if it is running
    fn apply_config(&mut self, updated: SessionConfig) -> Result<SessionConfig, SessionError> {
        self.config = updated;
        self.view.config = updated;

        match self.take_scheduler() {
            Scheduler::Idle(idle) => {
                self.scheduler = Some(Scheduler::Idle(idle));
                self.publish();
            }
            Scheduler::Pulsing(running) => {
                let result = running.restart(PulsePlan::new(&updated), &*self.gateway);
                self.settle_start(result)?;
            }
        }
        Ok(updated)
    }

    /// Puts the outcome of a start back into the scheduler slot
    fn settle_start(
        &mut self,
        result: Result<PulseScheduler<Pulsing>, StartRejected>,
    ) -> Result<(), SessionError> {
        match result {
            Ok(running) => {
                self.scheduler = Some(Scheduler::Pulsing(running));
                // A restart keeps the time of the original switch-on
                self.view.on_since.get_or_insert_with(Local::now);
                self.publish();
                Ok(())
            }
            Err(StartRejected { scheduler, error }) => {
                self.scheduler = Some(Scheduler::Idle(scheduler));
                self.view.on_since = None;
                self.publish();
                Err(self.reject(error))
            }
        }
    }

    fn pulse(&mut self, tick: PulseTick) {
        let current = match &self.scheduler {
            Some(Scheduler::Pulsing(running)) => running.generation(),
            _ => {
                debug!("Dropping pulse of schedule {}, EMDR is off", tick.generation);
                return;
            }
        };
        if tick.generation != current {
            debug!(
                "Dropping stale pulse of schedule {} (current {})",
                tick.generation, current
            );
            return;
        }

        let index = tick.side.controller_index();
        let pulse = tick.pulse;
        if let Err(e) = self
            .gateway
            .rumble(index, pulse.left, pulse.right, pulse.duration_ms)
        {
            warn!("Skipping pulse on controller {}: {}", index, e);
        }
    }

    fn poll_controllers(&mut self) {
        if let Err(e) = self.gateway.refresh() {
            // Keep showing the last known count, next poll retries
            error!("Controller poll failed: {}", e);
            return;
        }

        let count = self.gateway.count();
        if count != self.view.controller_count {
            info!(
                "Controller count changed: {} -> {}",
                self.view.controller_count, count
            );
            self.view.controller_count = count;
        }

        if self.stop_on_disconnect
            && self.status() == EmdrStatus::On
            && count != REQUIRED_CONTROLLERS
        {
            if let Scheduler::Pulsing(running) = self.take_scheduler() {
                self.scheduler = Some(Scheduler::Idle(running.stop()));
            }
            self.view.on_since = None;
            warn!("EMDR switched off, {} controllers connected", count);
            self.reject(SessionError::InsufficientControllers { found: count });
        }

        self.publish();
    }

    fn elapsed_tick(&mut self) {
        self.view.elapsed_seconds += 1;
        self.publish();
    }

    fn shutdown(&mut self) {
        info!("Shutting down session");
        self.monitors.cancel();
        if let Scheduler::Pulsing(running) = self.take_scheduler() {
            self.scheduler = Some(Scheduler::Idle(running.stop()));
        }
        self.view.on_since = None;
        self.publish();
    }

    /// Notifies the user about `error` and hands it back for the reply
    fn reject(&self, error: SessionError) -> SessionError {
        let notification = Notification::new(error.to_string());
        if let Err(e) = self.notify_tx.try_send(notification) {
            warn!("Dropping notification '{}': {}", error, e);
        }
        error
    }

    fn publish(&mut self) {
        self.view.status = self.status();
        if self.view.status == EmdrStatus::Off {
            self.view.on_since = None;
        }
        let view = self.view.clone();
        self.view_tx.send_if_modified(|current| {
            if *current != view {
                *current = view;
                true
            } else {
                false
            }
        });
    }
}

/// Cloneable handle for driving a session from the UI side
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Spawns the session actor and its two monitors
    ///
    /// Returns the handle, the stream of user notifications and the actor's
    /// join handle. The actor stops on [`SessionHandle::shutdown`] or once
    /// every handle has been dropped.
    pub fn spawn(
        mut gateway: Box<dyn ControllerGateway>,
        settings: SessionSettings,
    ) -> (Self, mpsc::Receiver<Notification>, JoinHandle<()>) {
        info!("Spawning session with settings: {:?}", settings);

        if let Err(e) = gateway.refresh() {
            warn!("Initial controller refresh failed: {}", e);
        }

        let (command_tx, command_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (notify_tx, notify_rx) = mpsc::channel(NOTIFICATION_CAPACITY);
        let initial_view = SessionView::new(settings.initial, gateway.count());
        let (view_tx, view_rx) = watch::channel(initial_view.clone());

        let mailbox = command_tx.downgrade();
        let monitors = CancellationToken::new();
        spawn_controller_poll(mailbox.clone(), settings.poll_interval, monitors.clone());
        spawn_elapsed_counter(mailbox.clone(), settings.elapsed_interval, monitors.clone());

        let actor = SessionActor {
            gateway,
            config: settings.initial,
            scheduler: Some(Scheduler::Idle(PulseScheduler::create(mailbox.clone()))),
            view: initial_view,
            stop_on_disconnect: settings.stop_on_disconnect,
            mailbox,
            view_tx,
            notify_tx,
            monitors,
        };
        let task = tokio::spawn(actor.run(command_rx));

        (
            Self {
                commands: command_tx,
                view: view_rx,
            },
            notify_rx,
            task,
        )
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, SessionError>>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Switches EMDR on or off, returning the new status
    pub async fn toggle(&self) -> Result<EmdrStatus, SessionError> {
        self.request(|reply| SessionCommand::Toggle { reply }).await
    }

    /// Changes duration and/or gap; `None` keeps the current value
    pub async fn update_timing(
        &self,
        duration_ms: Option<u32>,
        gap_ms: Option<u32>,
    ) -> Result<SessionConfig, SessionError> {
        self.request(|reply| SessionCommand::UpdateTiming {
            duration_ms,
            gap_ms,
            reply,
        })
        .await
    }

    /// Sets intensity from a slider percentage in `1..=99`
    pub async fn set_intensity(&self, percent: u8) -> Result<SessionConfig, SessionError> {
        self.request(|reply| SessionCommand::SetIntensity { percent, reply })
            .await
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Stops pulses and monitors, waits for the actor to acknowledge
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Shutdown { done: done_tx })
            .await
            .is_err()
        {
            debug!("Session already gone");
            return;
        }
        let _ = done_rx.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emdr::Side;
    use crate::gamepad::{VirtualGateway, VirtualPads};

    fn idle_actor(
        controllers: usize,
    ) -> (SessionActor, VirtualPads, mpsc::Sender<SessionCommand>) {
        let (gateway, pads) = VirtualGateway::new(controllers);
        let (command_tx, _command_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (notify_tx, _notify_rx) = mpsc::channel(NOTIFICATION_CAPACITY);
        let config = SessionConfig::default();
        let view = SessionView::new(config, gateway.count());
        let (view_tx, _view_rx) = watch::channel(view.clone());
        let mailbox = command_tx.downgrade();

        let actor = SessionActor {
            gateway: Box::new(gateway),
            config,
            scheduler: Some(Scheduler::Idle(PulseScheduler::create(mailbox.clone()))),
            view,
            stop_on_disconnect: true,
            mailbox,
            view_tx,
            notify_tx,
            monitors: CancellationToken::new(),
        };
        (actor, pads, command_tx)
    }

    fn tick(actor: &SessionActor, generation: u64) -> PulseTick {
        PulseTick {
            generation,
            side: Side::First,
            pulse: PulsePlan::new(&actor.config).pulse(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_of_a_replaced_schedule_are_dropped() {
        let (mut actor, pads, _commands) = idle_actor(2);

        assert_eq!(actor.toggle(), Ok(EmdrStatus::On));
        let stale = tick(&actor, 1);
        actor.update_timing(Some(200), None).unwrap();

        // Queued before the restart, handled after it
        actor.pulse(stale);
        assert!(pads.pulses().is_empty());

        actor.pulse(tick(&actor, 2));
        assert_eq!(pads.pulses().len(), 1);
        assert_eq!(pads.pulses()[0].duration_ms, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_dropped_while_off() {
        let (mut actor, pads, _commands) = idle_actor(2);

        actor.pulse(tick(&actor, 0));
        assert!(pads.pulses().is_empty());

        actor.toggle().unwrap();
        let current = tick(&actor, 1);
        assert_eq!(actor.toggle(), Ok(EmdrStatus::Off));
        actor.pulse(current);
        assert!(pads.pulses().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_keeps_switch_on_time() {
        let (mut actor, _pads, _commands) = idle_actor(2);

        actor.toggle().unwrap();
        let on_since = actor.view.on_since;
        assert!(on_since.is_some());

        actor.update_timing(None, Some(300)).unwrap();
        actor.set_intensity(80).unwrap();
        assert_eq!(actor.view.on_since, on_since);

        actor.toggle().unwrap();
        assert_eq!(actor.view.on_since, None);
    }
}
