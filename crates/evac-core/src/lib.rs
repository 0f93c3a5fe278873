//! Evac Core - tick-driven evacuation and round-end engine
//!
//! Runs the station evacuation sequence on top of an ECS world: a call
//! starts a countdown, vehicles arrive and dock at every station, crew may
//! vote to launch early, the fleet departs, and the round ends and
//! restarts.
//!
//! # Architecture
//!
//! The map lives in a `hecs` world:
//! - **Entities**: stations, station structures, evacuation vehicles
//! - **Components**: `Station`, `Structure`, `DockPorts`, `Vehicle`
//! - **Systems**: docking placement and departure bookkeeping
//!
//! Two state machines share one [`TransitScheduler`](evac_logic::scheduler::TransitScheduler):
//! the [`EvacuationCoordinator`](coordinator::EvacuationCoordinator) and the
//! [`RoundEndOrchestrator`](round_end::RoundEndOrchestrator). The
//! orchestrator only sees the coordinator's public events.
//!
//! # Example
//!
//! ```rust,no_run
//! use evac_core::prelude::*;
//!
//! let mut engine = EvacuationEngine::default();
//! let station = engine.add_station("Outpost");
//! engine
//!     .add_structure(
//!         station,
//!         Structure::new("Hub", Aabb::centered(20.0, 20.0)),
//!         vec![DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST)],
//!     )
//!     .ok();
//!
//! engine.call_evacuation(None, Some(600.0)).ok();
//! loop {
//!     engine.update(1.0);
//!     for event in engine.drain_events() {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod collaborators;
pub mod components;
pub mod context;
pub mod coordinator;
pub mod engine;
pub mod events;
pub mod round_end;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::collaborators::*;
    pub use crate::components::*;
    pub use crate::engine::EvacuationEngine;
    pub use evac_logic::config::EvacConfig;
    pub use evac_logic::docking::{DockPort, PortTag};
    pub use evac_logic::events::{ArrivalOutcome, EvacEvent};
    pub use evac_logic::geometry::{Aabb, Angle, Transform2, Vec2};
    pub use evac_logic::ids::{AuthorizerId, StationId, VehicleId};
    pub use evac_logic::phase::{EvacPhase, RoundPhase};
    pub use evac_logic::rejection::Rejection;
}
