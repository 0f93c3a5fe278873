//! Evacuation and round phases, and which transitions between them are legal.
//!
//! | From | To |
//! |------|----|
//! | `Idle` | `Requested` |
//! | `Requested` | `Idle` (recall), `Arriving`, `Arrived` (vehicles disabled) |
//! | `Arriving` | `Holding` |
//! | `Holding` | `Departing` |
//! | `Departing` | `Arrived` |
//! | any | `Idle` via reset only |

use serde::{Deserialize, Serialize};

/// Evacuation coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvacPhase {
    #[default]
    Idle,
    /// Countdown to vehicle arrival is running.
    Requested,
    /// Vehicles are being materialized and docked.
    Arriving,
    /// Docked; countdown to launch is running.
    Holding,
    /// Fleet has launched and is in transit.
    Departing,
    /// First vehicle reached the safe zone. Terminal until reset.
    Arrived,
}

impl EvacPhase {
    /// Whether a command- or timer-driven transition to `next` is legal.
    pub fn can_transition_to(self, next: EvacPhase) -> bool {
        use EvacPhase::*;
        matches!(
            (self, next),
            (Idle, Requested)
                | (Requested, Idle)
                | (Requested, Arriving)
                | (Requested, Arrived)
                | (Arriving, Holding)
                | (Holding, Departing)
                | (Departing, Arrived)
        )
    }

    /// Recall is only possible before vehicles start arriving.
    pub fn is_recallable(self) -> bool {
        self == EvacPhase::Requested
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requested => "requested",
            Self::Arriving => "arriving",
            Self::Holding => "holding",
            Self::Departing => "departing",
            Self::Arrived => "arrived",
        }
    }
}

/// Round-end orchestrator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    InRound,
    /// Fleet departed; round-end buffer is running.
    Ending,
    /// Round finalized; restart countdown is running.
    Restarting,
}
