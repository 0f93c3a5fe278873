//! Transit scheduler: named, cancellable "do X after D seconds" timers.
//!
//! Every timer belongs to a [`Purpose`]. At most one timer per purpose is
//! pending; arming a purpose again replaces the previous timer. The
//! scheduler owns the simulation clock and is advanced once per tick.
//! Timers that come due are handed back to the caller, ordered by purpose
//! so that arrival is always handled before launch, launch before
//! round-end, regardless of the order they were armed in.
//!
//! ```
//! use evac_logic::scheduler::{Purpose, TransitScheduler};
//!
//! let mut sched = TransitScheduler::new();
//! sched.arm(Purpose::Launch, 10.0);
//! sched.arm(Purpose::Launch, 20.0); // supersedes the first
//! assert!(sched.advance(15.0).is_empty());
//! let due = sched.advance(5.0);
//! assert_eq!(due.len(), 1);
//! assert_eq!(due[0].duration, 20.0);
//! ```

use crate::ids::VehicleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slack for comparing fire times against the clock.
const TIME_EPSILON: f64 = 1e-9;

/// What a timer is for. Declaration order is dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Evacuation countdown; vehicles materialize when it elapses.
    Arrival,
    /// Hold at the dock; the fleet launches when it elapses.
    Launch,
    /// Staggered departure of a single vehicle.
    Departure(VehicleId),
    /// Automatic evacuation call policy.
    AutoCall,
    /// Buffer between fleet departure and round finalization.
    RoundEnd,
    /// Delay between finalization and the next round.
    Restart,
    /// Call/recall gate on the evacuation commands.
    EvacuationCooldown,
    /// Gate on manual end-of-round.
    RoundEndCooldown,
}

impl Purpose {
    /// Cooldown purposes gate commands and carry no action.
    pub fn is_gate(&self) -> bool {
        matches!(self, Self::EvacuationCooldown | Self::RoundEndCooldown)
    }
}

/// Identifies one specific arming of a purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub purpose: Purpose,
    generation: u64,
}

/// A pending timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmedTimer {
    pub started_at: f64,
    pub duration: f64,
    pub fire_at: f64,
    generation: u64,
    armed_tick: u64,
}

/// A timer that came due during [`TransitScheduler::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elapsed {
    pub handle: TimerHandle,
    pub started_at: f64,
    pub duration: f64,
}

impl Elapsed {
    pub fn purpose(&self) -> Purpose {
        self.handle.purpose
    }
}

/// Single-threaded timer table keyed by purpose.
#[derive(Debug, Clone, Default)]
pub struct TransitScheduler {
    timers: BTreeMap<Purpose, ArmedTimer>,
    now: f64,
    tick: u64,
    next_generation: u64,
}

impl TransitScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of completed [`advance`](Self::advance) calls.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Arm `purpose` to elapse after `duration` seconds, replacing any
    /// pending timer for the same purpose.
    ///
    /// Non-positive durations elapse on the next tick, never during this
    /// call.
    pub fn arm(&mut self, purpose: Purpose, duration: f64) -> TimerHandle {
        let duration = duration.max(0.0);
        let generation = self.next_generation;
        self.next_generation += 1;
        let timer = ArmedTimer {
            started_at: self.now,
            duration,
            fire_at: self.now + duration,
            generation,
            armed_tick: self.tick,
        };
        self.timers.insert(purpose, timer);
        TimerHandle {
            purpose,
            generation,
        }
    }

    /// Cancel the specific arming behind `handle`.
    ///
    /// Returns `false` when that timer already elapsed, was cancelled, or
    /// was superseded by a later arm.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.timers.get(&handle.purpose) {
            Some(t) if t.generation == handle.generation => {
                self.timers.remove(&handle.purpose);
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever is pending for `purpose`.
    pub fn cancel_purpose(&mut self, purpose: Purpose) -> bool {
        self.timers.remove(&purpose).is_some()
    }

    pub fn is_armed(&self, purpose: Purpose) -> bool {
        self.timers.contains_key(&purpose)
    }

    pub fn get(&self, purpose: Purpose) -> Option<&ArmedTimer> {
        self.timers.get(&purpose)
    }

    /// Seconds until `purpose` elapses, if pending.
    pub fn remaining(&self, purpose: Purpose) -> Option<f64> {
        self.timers
            .get(&purpose)
            .map(|t| (t.fire_at - self.now).max(0.0))
    }

    /// Drop every pending timer. The clock keeps running.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Drop every pending timer matching `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&Purpose) -> bool) {
        self.timers.retain(|p, _| !predicate(p));
    }

    /// Move the clock forward and collect the timers that came due, in
    /// purpose order.
    pub fn advance(&mut self, delta_seconds: f64) -> Vec<Elapsed> {
        self.tick += 1;
        self.now += delta_seconds.max(0.0);

        let now = self.now;
        let tick = self.tick;
        let due: Vec<Purpose> = self
            .timers
            .iter()
            .filter(|(_, t)| t.armed_tick < tick && t.fire_at <= now + TIME_EPSILON)
            .map(|(p, _)| *p)
            .collect();

        due.into_iter()
            .filter_map(|purpose| {
                self.timers.remove(&purpose).map(|t| Elapsed {
                    handle: TimerHandle {
                        purpose,
                        generation: t.generation,
                    },
                    started_at: t.started_at,
                    duration: t.duration,
                })
            })
            .collect()
    }
}
