//! Pulse scheduler with statum state machine
//!
//! Owns the two repeating tick tasks that alternate the controllers. The
//! typestate makes `start` unavailable while pulses are running, so a second
//! schedule can never be stacked on top of the first one.
//!
//! # State Machine
//!
//! ```text
//!        start (2 rumble-capable pads)
//! Idle ─────────────────────────────────► Pulsing
//!  ▲                                         │
//!  └──────────────── stop ◄──────────────────┘
//! ```
//!
//! Ticks are not executed here. Each tick task sends a [`PulseTick`] to the
//! session mailbox, tagged with the generation of the schedule that produced
//! it. A restart bumps the generation, which lets the session drop ticks of
//! the old schedule that were already queued.

use statum::{machine, state};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command::{PulseTick, SessionCommand};
use super::plan::{PulsePlan, Side};
use super::SessionError;
use crate::gamepad::ControllerGateway;

/// Number of controllers a bilateral session runs on
pub const REQUIRED_CONTROLLERS: usize = 2;

#[state]
#[derive(Debug, Clone)]
pub enum SchedulerState {
    Idle,    // No tick tasks alive
    Pulsing, // Both sides ticking
}

/// Handles of a running schedule
#[derive(Debug)]
pub struct RunningTicks {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

#[machine]
pub struct PulseScheduler<S: SchedulerState> {
    mailbox: mpsc::WeakSender<SessionCommand>,
    generation: u64,
    plan: Option<PulsePlan>,
    ticks: Option<RunningTicks>,
}

/// A refused start, handing the idle scheduler back untouched
pub struct StartRejected {
    pub scheduler: PulseScheduler<Idle>,
    pub error: SessionError,
}

impl<S: SchedulerState> PulseScheduler<S> {
    /// Generation of the most recently started schedule, 0 before the first
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn plan(&self) -> Option<&PulsePlan> {
        self.plan.as_ref()
    }
}

impl PulseScheduler<Idle> {
    pub fn create(mailbox: mpsc::WeakSender<SessionCommand>) -> Self {
        Self::new(mailbox, 0, None, None)
    }

    /// Starts alternating pulses if exactly two rumble-capable pads are present
    ///
    /// Uses the controller list as of the gateway's last refresh. On refusal
    /// nothing is spawned and the generation stays where it was.
    pub fn start(
        mut self,
        plan: PulsePlan,
        gateway: &dyn ControllerGateway,
    ) -> Result<PulseScheduler<Pulsing>, StartRejected> {
        let controllers = gateway.controllers();
        if controllers.len() != REQUIRED_CONTROLLERS {
            warn!(
                "Refusing to start pulses with {} controllers connected",
                controllers.len()
            );
            return Err(StartRejected {
                scheduler: self,
                error: SessionError::InsufficientControllers {
                    found: controllers.len(),
                },
            });
        }
        if let Err(e) = controllers.require_rumble(REQUIRED_CONTROLLERS) {
            warn!("Refusing to start pulses: {}", e);
            return Err(StartRejected {
                scheduler: self,
                error: SessionError::Device(e),
            });
        }

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let tasks = Side::BOTH
            .into_iter()
            .map(|side| {
                spawn_side(
                    self.mailbox.clone(),
                    cancel.clone(),
                    plan,
                    side,
                    start,
                    generation,
                )
            })
            .collect();

        info!(
            "Pulse schedule {} started: period {:?}, second side after {:?}",
            generation,
            plan.period(),
            plan.offset(Side::Second)
        );

        self.plan = Some(plan);
        self.ticks = Some(RunningTicks { cancel, tasks });
        Ok(self.transition())
    }
}

impl PulseScheduler<Pulsing> {
    /// Cancels both tick tasks
    ///
    /// A pulse already sent to a controller is not cut short, the motor runs
    /// out its duration on its own.
    pub fn stop(mut self) -> PulseScheduler<Idle> {
        if let Some(ticks) = self.ticks.take() {
            ticks.cancel.cancel();
            debug!(
                "Cancelled {} tick tasks of schedule {}",
                ticks.tasks.len(),
                self.generation
            );
        }
        info!("Pulse schedule {} stopped", self.generation);
        self.plan = None;
        self.transition()
    }

    /// Stops the running schedule and starts a new one from `plan`
    pub fn restart(
        self,
        plan: PulsePlan,
        gateway: &dyn ControllerGateway,
    ) -> Result<PulseScheduler<Pulsing>, StartRejected> {
        self.stop().start(plan, gateway)
    }
}

fn spawn_side(
    mailbox: mpsc::WeakSender<SessionCommand>,
    cancel: CancellationToken,
    plan: PulsePlan,
    side: Side,
    start: Instant,
    generation: u64,
) -> JoinHandle<()> {
    let mut interval = time::interval_at(start + plan.offset(side), plan.period());
    // After a stall, fire once and realign instead of replaying missed pulses
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let tick = PulseTick {
        generation,
        side,
        pulse: plan.pulse(),
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = interval.tick() => {
                    // Session gone means nobody is left to rumble for
                    let Some(sender) = mailbox.upgrade() else { break };
                    if sender.send(SessionCommand::Pulse(tick)).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Tick task for {:?} of schedule {} finished", side, generation);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emdr::SessionConfig;
    use crate::gamepad::VirtualGateway;
    use std::time::Duration;

    fn plan(duration_ms: u32, gap_ms: u32) -> PulsePlan {
        PulsePlan::new(&SessionConfig {
            duration_ms,
            gap_ms,
            intensity: 0.3,
        })
    }

    // Drains pulse ticks that arrive until `until` has passed
    async fn collect_ticks(
        rx: &mut mpsc::Receiver<SessionCommand>,
        origin: Instant,
        until: Duration,
    ) -> Vec<(Duration, PulseTick)> {
        let mut ticks = Vec::new();
        let deadline = origin + until;
        while let Ok(Some(command)) = time::timeout_at(deadline, rx.recv()).await {
            if let SessionCommand::Pulse(tick) = command {
                ticks.push((origin.elapsed(), tick));
            }
        }
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn start_alternates_sides_at_fixed_cadence() {
        let (tx, mut rx) = mpsc::channel(64);
        let (gateway, _pads) = VirtualGateway::new(2);
        let origin = Instant::now();

        let scheduler = PulseScheduler::create(tx.downgrade())
            .start(plan(100, 50), &gateway)
            .ok()
            .unwrap();
        assert_eq!(scheduler.generation(), 1);

        let ticks = collect_ticks(&mut rx, origin, Duration::from_millis(1250)).await;
        let timeline: Vec<(u128, Side)> = ticks
            .iter()
            .map(|(at, tick)| (at.as_millis(), tick.side))
            .collect();
        assert_eq!(
            timeline,
            vec![
                (0, Side::First),
                (150, Side::Second),
                (300, Side::First),
                (450, Side::Second),
                (600, Side::First),
                (750, Side::Second),
                (900, Side::First),
                (1050, Side::Second),
                (1200, Side::First),
            ]
        );
        assert!(ticks.iter().all(|(_, tick)| tick.generation == 1));
        assert!(ticks.iter().all(|(_, tick)| tick.pulse.duration_ms == 100));

        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_clock_delivers_one_pulse_per_side() {
        let (tx, mut rx) = mpsc::channel(64);
        let (gateway, _pads) = VirtualGateway::new(2);
        let origin = Instant::now();

        let scheduler = PulseScheduler::create(tx.downgrade())
            .start(plan(100, 50), &gateway)
            .ok()
            .unwrap();
        let before = collect_ticks(&mut rx, origin, Duration::from_millis(10)).await;
        assert_eq!(before.len(), 1);

        // Ten periods pass without the tick tasks getting to run
        time::advance(Duration::from_millis(3000)).await;

        let after = collect_ticks(&mut rx, origin, Duration::from_millis(3050)).await;
        let first = after.iter().filter(|(_, t)| t.side == Side::First).count();
        let second = after.iter().filter(|(_, t)| t.side == Side::Second).count();
        assert_eq!((first, second), (1, 1));

        // Back on the regular cadence afterwards
        let resumed = collect_ticks(&mut rx, origin, Duration::from_millis(3400)).await;
        assert_eq!(resumed.len(), 2);

        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_refused_without_two_controllers() {
        let (tx, mut rx) = mpsc::channel(64);

        for connected in [0, 1, 3] {
            let (gateway, _pads) = VirtualGateway::new(connected);
            let started = PulseScheduler::create(tx.downgrade()).start(plan(100, 0), &gateway);
            let rejected = match started {
                Ok(_) => panic!("started with {connected} controllers"),
                Err(rejected) => rejected,
            };
            assert_eq!(
                rejected.error,
                SessionError::InsufficientControllers { found: connected }
            );
            assert_eq!(rejected.scheduler.generation(), 0);
        }

        time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_refused_for_pad_without_rumble() {
        let (tx, _rx) = mpsc::channel(64);
        let (mut gateway, pads) = VirtualGateway::new(1);
        pads.connect(false);
        gateway.refresh().unwrap();

        let Err(rejected) = PulseScheduler::create(tx.downgrade()).start(plan(100, 0), &gateway)
        else {
            panic!("started with a pad lacking rumble");
        };
        assert!(matches!(rejected.error, SessionError::Device(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_tick_stream() {
        let (tx, mut rx) = mpsc::channel(64);
        let (gateway, _pads) = VirtualGateway::new(2);
        let origin = Instant::now();

        let scheduler = PulseScheduler::create(tx.downgrade())
            .start(plan(100, 0), &gateway)
            .ok()
            .unwrap();
        let before = collect_ticks(&mut rx, origin, Duration::from_millis(350)).await;
        assert_eq!(before.len(), 4);

        let idle = scheduler.stop();
        assert_eq!(idle.generation(), 1);
        assert!(idle.plan().is_none());

        let after = collect_ticks(&mut rx, origin, Duration::from_secs(3)).await;
        assert!(after.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_bumps_generation_and_uses_new_timing() {
        let (tx, mut rx) = mpsc::channel(64);
        let (gateway, _pads) = VirtualGateway::new(2);

        let scheduler = PulseScheduler::create(tx.downgrade())
            .start(plan(100, 0), &gateway)
            .ok()
            .unwrap();
        time::sleep(Duration::from_millis(50)).await;

        let scheduler = scheduler.restart(plan(300, 100), &gateway).ok().unwrap();
        assert_eq!(scheduler.generation(), 2);

        let origin = Instant::now();
        let ticks = collect_ticks(&mut rx, origin, Duration::from_millis(900)).await;
        let current: Vec<(u128, Side)> = ticks
            .iter()
            .filter(|(_, tick)| tick.generation == 2)
            .map(|(at, tick)| (at.as_millis(), tick.side))
            .collect();
        assert_eq!(
            current,
            vec![(0, Side::First), (400, Side::Second), (800, Side::First)]
        );
        scheduler.stop();
    }
}
