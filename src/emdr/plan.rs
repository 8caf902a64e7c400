//! Timing arithmetic for alternating pulses
//!
//! ```text
//! controller 1: ██████░░░░░░░░░░░░░░░██████░░░░░...
//! controller 2: ░░░░░░░░░░░██████░░░░░░░░░░░░░░██...
//!               |  d  | g  |  d  | g  |
//!               0         d+g       2(d+g)
//! ```

use std::time::Duration;

use super::SessionConfig;

/// Which side of the bilateral pair a pulse goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::First, Side::Second];

    /// Position of the controller in the refreshed controller list
    pub fn controller_index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

/// One rumble command, captured when the schedule starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub left: f32,
    pub right: f32,
    pub duration_ms: u32,
}

/// Fixed cadence derived from a [`SessionConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulsePlan {
    duration: Duration,
    gap: Duration,
    pulse: Pulse,
}

impl PulsePlan {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            duration: Duration::from_millis(u64::from(config.duration_ms)),
            gap: Duration::from_millis(u64::from(config.gap_ms)),
            pulse: Pulse {
                left: config.intensity,
                right: config.intensity,
                duration_ms: config.duration_ms,
            },
        }
    }

    pub fn pulse(&self) -> Pulse {
        self.pulse
    }

    /// Time between two pulses on the same side, `2 * (duration + gap)`
    pub fn period(&self) -> Duration {
        (self.duration + self.gap) * 2
    }

    /// First firing of a side relative to the schedule start
    pub fn offset(&self, side: Side) -> Duration {
        match side {
            Side::First => Duration::ZERO,
            Side::Second => self.duration + self.gap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct PlannedPulse {
        side: Side,
        at: Duration,
    }

    // Pulses starting in `[from, to)`, ordered by start time
    fn pulses_within(plan: &PulsePlan, from: Duration, to: Duration) -> Vec<PlannedPulse> {
        let mut pulses = Vec::new();
        for side in Side::BOTH {
            let mut at = plan.offset(side);
            while at < from {
                at += plan.period();
            }
            while at < to {
                pulses.push(PlannedPulse { side, at });
                at += plan.period();
            }
        }
        pulses.sort_by_key(|p| p.at);
        pulses
    }

    fn plan(duration_ms: u32, gap_ms: u32) -> PulsePlan {
        PulsePlan::new(&SessionConfig {
            duration_ms,
            gap_ms,
            intensity: 0.5,
        })
    }

    #[test]
    fn period_and_offsets_follow_duration_and_gap() {
        let plan = plan(500, 150);
        assert_eq!(plan.period(), Duration::from_millis(1300));
        assert_eq!(plan.offset(Side::First), Duration::ZERO);
        assert_eq!(plan.offset(Side::Second), Duration::from_millis(650));
    }

    #[test]
    fn every_window_holds_one_pulse_per_side() {
        for (d, g) in [(1, 0), (500, 150), (200, 0), (75, 1000), (3, 7)] {
            let plan = plan(d, g);
            let period = plan.period();
            let step = Duration::from_millis(u64::from(d + g) / 3 + 1);
            let mut from = Duration::ZERO;

            while from < period * 4 {
                let pulses = pulses_within(&plan, from, from + period);
                let first = pulses.iter().filter(|p| p.side == Side::First).count();
                let second = pulses.iter().filter(|p| p.side == Side::Second).count();
                assert_eq!((first, second), (1, 1), "d={d} g={g} from={from:?}");
                from += step;
            }
        }
    }

    #[test]
    fn consecutive_pulses_alternate_and_leave_the_gap() {
        for (d, g) in [(1, 0), (500, 150), (250, 40)] {
            let plan = plan(d, g);
            let pulses = pulses_within(&plan, Duration::ZERO, plan.period() * 5);
            let duration = Duration::from_millis(u64::from(d));
            let gap = Duration::from_millis(u64::from(g));

            for pair in pulses.windows(2) {
                assert_ne!(pair[0].side, pair[1].side);
                // previous pulse has finished and the gap has passed
                assert!(pair[1].at >= pair[0].at + duration + gap);
            }
        }
    }

    #[test]
    fn window_start_is_inclusive_and_end_exclusive() {
        let plan = plan(100, 0);
        let pulses = pulses_within(&plan, Duration::from_millis(100), Duration::from_millis(200));
        assert_eq!(
            pulses,
            vec![PlannedPulse {
                side: Side::Second,
                at: Duration::from_millis(100)
            }]
        );
    }

    #[test]
    fn late_windows_stay_on_the_grid() {
        let plan = plan(500, 150);
        let from = plan.period() * 5000 + Duration::from_millis(1);
        let pulses = pulses_within(&plan, from, from + plan.period());
        assert_eq!(
            pulses,
            vec![
                PlannedPulse {
                    side: Side::Second,
                    at: plan.period() * 5000 + plan.offset(Side::Second),
                },
                PlannedPulse {
                    side: Side::First,
                    at: plan.period() * 5001,
                },
            ]
        );
    }
}
