//! Evacuation vehicle components.

use evac_logic::ids::{StationId, VehicleId};
use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Where a vehicle is in its own journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitState {
    /// Spawned, not yet positioned
    Staged,
    /// Latched to a station port
    Docked,
    /// Parked beside the station, unlatched
    Nearby,
    /// Fleet launched; waiting for this vehicle's staggered departure
    Launching,
    InTransit,
    /// Reached the safe zone
    Arrived,
}

/// The port pair a docked vehicle is latched through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockLink {
    /// Station structure entity the vehicle is latched to
    pub target: Entity,
    pub target_port: usize,
    pub vehicle_port: usize,
}

/// Vehicle component - attached to the vehicle's structure entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Station this vehicle was sent to
    pub station: StationId,
    pub state: TransitState,
    #[serde(skip)]
    pub docking: Option<DockLink>,
    /// Reached the transit-target zone
    pub arrived: bool,
}

impl Vehicle {
    pub fn new(id: VehicleId, station: StationId) -> Self {
        Self {
            id,
            station,
            state: TransitState::Staged,
            docking: None,
            arrived: false,
        }
    }

    pub fn is_docked(&self) -> bool {
        self.docking.is_some()
    }
}
