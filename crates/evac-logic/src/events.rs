//! Events broadcast to presentation and announcement layers.

use crate::ids::{StationId, VehicleId};
use serde::{Deserialize, Serialize};

/// How a vehicle ended up positioned at its station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalOutcome {
    /// Mated with a free port on the station.
    Docked,
    /// No valid dock; parked beside the station, unlatched.
    NearbyUnlatched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EvacEvent {
    EvacuationRequested {
        /// Seconds until vehicles arrive.
        eta: f64,
    },
    EvacuationCancelled,
    VehicleArrived {
        vehicle: VehicleId,
        station: StationId,
        outcome: ArrivalOutcome,
    },
    /// The arrival countdown elapsed with no station to serve.
    NoStationsAvailable,
    EarlyLaunchAuthorized {
        vehicle: VehicleId,
        remaining: u32,
    },
    EarlyLaunchRepealed {
        vehicle: VehicleId,
        remaining: u32,
    },
    EarlyLaunchRepealedAll {
        vehicle: VehicleId,
        remaining: u32,
    },
    /// Quorum reached; launch moved up.
    EarlyLaunchTriggered {
        vehicle: VehicleId,
        eta: f64,
    },
    FleetLaunched {
        transit_eta: f64,
    },
    FleetDeparted {
        transit_eta: f64,
    },
    RoundEnded,
    RoundWillRestart {
        eta: f64,
    },
    RoundRestarted,
}
