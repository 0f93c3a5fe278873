//! State shared by the coordinator and the round-end orchestrator.

use crate::collaborators::{AccessPolicy, RoundLifecycle, TransitDrive};
use evac_logic::config::EvacConfig;
use evac_logic::events::EvacEvent;
use evac_logic::scheduler::TransitScheduler;
use hecs::World;
use rand::rngs::StdRng;

/// Everything a state transition may touch, owned by the engine and lent
/// to the coordinator and orchestrator one call at a time.
pub struct EvacContext {
    pub world: World,
    pub scheduler: TransitScheduler,
    pub config: EvacConfig,
    pub access: Box<dyn AccessPolicy>,
    pub transit: Box<dyn TransitDrive>,
    pub lifecycle: Box<dyn RoundLifecycle>,
    pub rng: StdRng,
    /// Events raised since the engine last flushed.
    pub outbox: Vec<EvacEvent>,
}

impl EvacContext {
    pub fn emit(&mut self, event: EvacEvent) {
        self.outbox.push(event);
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }
}
