//! Evacuation engine - main entry point for driving an evacuation round

use crate::collaborators::{
    AccessPolicy, LoggingLifecycle, OpenAccess, RoundLifecycle, SimulatedTransit, TransitDrive,
};
use crate::components::{DockPorts, Station, StationMember, Structure, TransitState, Vehicle};
use crate::context::EvacContext;
use crate::coordinator::{CallSource, EvacuationCoordinator};
use crate::events::{EventBus, Subscriber};
use crate::round_end::RoundEndOrchestrator;
use evac_logic::config::EvacConfig;
use evac_logic::docking::DockPort;
use evac_logic::events::EvacEvent;
use evac_logic::geometry::Transform2;
use evac_logic::ids::{AuthorizerId, StationId, VehicleId};
use evac_logic::phase::{EvacPhase, RoundPhase};
use evac_logic::rejection::{ConfigError, Rejection};
use evac_logic::scheduler::{Elapsed, Purpose, TransitScheduler};
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Owns the world, the scheduler and both state machines
pub struct EvacuationEngine {
    ctx: EvacContext,
    coordinator: EvacuationCoordinator,
    round_end: RoundEndOrchestrator,
    bus: EventBus,
    next_station_id: u32,
}

impl EvacuationEngine {
    /// Create an engine with validated configuration and default
    /// collaborators
    pub fn new(config: EvacConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Parse, validate and build
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(Self::build(EvacConfig::from_json(json)?))
    }

    fn build(config: EvacConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut engine = Self {
            coordinator: EvacuationCoordinator::new(config.required_authorizations),
            round_end: RoundEndOrchestrator::new(),
            bus: EventBus::new(),
            next_station_id: 1,
            ctx: EvacContext {
                world: World::new(),
                scheduler: TransitScheduler::new(),
                config,
                access: Box::new(OpenAccess),
                transit: Box::new(SimulatedTransit::new()),
                lifecycle: Box::new(LoggingLifecycle),
                rng,
                outbox: Vec::new(),
            },
        };
        engine.arm_auto_call();
        engine
    }

    pub fn with_access_policy(mut self, access: impl AccessPolicy + 'static) -> Self {
        self.ctx.access = Box::new(access);
        self
    }

    pub fn with_transit_drive(mut self, transit: impl TransitDrive + 'static) -> Self {
        self.ctx.transit = Box::new(transit);
        self
    }

    pub fn with_round_lifecycle(mut self, lifecycle: impl RoundLifecycle + 'static) -> Self {
        self.ctx.lifecycle = Box::new(lifecycle);
        self
    }

    fn arm_auto_call(&mut self) {
        if let Some(after) = self.ctx.config.auto_call_time {
            self.ctx.scheduler.arm(Purpose::AutoCall, after);
            tracing::debug!("Automatic evacuation call armed for {:.0}s", after);
        }
    }

    /// Advance the simulation by `delta_seconds`.
    ///
    /// Stages run in fixed order: coordinator timers (arrival, launch,
    /// departures, auto-call), transit completions, then round-end and
    /// restart. Events raised in a stage reach the orchestrator and the
    /// bus before the next stage runs.
    pub fn update(&mut self, delta_seconds: f64) {
        let due = self.ctx.scheduler.advance(delta_seconds);
        let (coordinator_due, rest): (Vec<Elapsed>, Vec<Elapsed>) =
            due.into_iter().partition(|e| {
                matches!(
                    e.purpose(),
                    Purpose::Arrival | Purpose::Launch | Purpose::Departure(_) | Purpose::AutoCall
                )
            });

        // Stage 1: coordinator timers
        for elapsed in coordinator_due {
            match elapsed.purpose() {
                Purpose::Arrival => self.coordinator.on_arrival_elapsed(&mut self.ctx),
                Purpose::Launch => self.coordinator.on_launch_elapsed(&mut self.ctx),
                Purpose::Departure(vehicle) => {
                    self.coordinator.on_departure_elapsed(&mut self.ctx, vehicle)
                }
                Purpose::AutoCall => self.coordinator.on_auto_call_elapsed(&mut self.ctx),
                _ => {}
            }
            self.flush();
        }

        // Stage 2: transit completions
        let now = self.ctx.now();
        for vehicle in self.ctx.transit.poll_arrivals(now) {
            self.coordinator.on_transit_complete(&mut self.ctx, vehicle);
        }
        self.flush();

        // Stage 3: round end and restart
        for elapsed in rest {
            match elapsed.purpose() {
                Purpose::RoundEnd => {
                    self.round_end.on_round_end_elapsed(&mut self.ctx);
                    self.flush();
                }
                Purpose::Restart => {
                    self.restart_round();
                    break;
                }
                gate => tracing::debug!("{:?} expired", gate),
            }
        }
    }

    /// Hand queued events to the orchestrator, then to the bus.
    fn flush(&mut self) {
        while !self.ctx.outbox.is_empty() {
            let batch = std::mem::take(&mut self.ctx.outbox);
            for event in batch {
                self.round_end.observe(&mut self.ctx, &event);
                self.bus.publish(event);
            }
        }
    }

    fn restart_round(&mut self) {
        self.ctx.lifecycle.start_new_round();
        self.reset();
        self.ctx.emit(EvacEvent::RoundRestarted);
        self.flush();
    }

    // ── Commands ───────────────────────────────────────────────────────

    /// Crew or console evacuation call, subject to the cooldown gate.
    pub fn call_evacuation(
        &mut self,
        requester: Option<AuthorizerId>,
        duration: Option<f64>,
    ) -> Result<(), Rejection> {
        let result = self.coordinator.call(&mut self.ctx, requester, duration);
        self.flush();
        result
    }

    pub fn cancel_evacuation(&mut self, requester: Option<AuthorizerId>) -> Result<(), Rejection> {
        let result = self.coordinator.cancel_evacuation(&mut self.ctx, requester, false);
        self.flush();
        result
    }

    /// Call that ignores the cooldown gate.
    pub fn admin_call_evacuation(&mut self, duration: Option<f64>) -> Result<(), Rejection> {
        let result = self
            .coordinator
            .request_evacuation(&mut self.ctx, CallSource::Admin, duration);
        self.flush();
        result
    }

    /// Recall that ignores the cooldown gate.
    pub fn admin_cancel_evacuation(&mut self) -> Result<(), Rejection> {
        let result = self.coordinator.cancel_evacuation(&mut self.ctx, None, true);
        self.flush();
        result
    }

    /// The rule system wants the round over: call the evacuation with the
    /// default countdown, ignoring the cooldown gate.
    pub fn request_round_end(&mut self) -> Result<(), Rejection> {
        let result = self
            .coordinator
            .request_evacuation(&mut self.ctx, CallSource::RuleSystem, None);
        self.flush();
        result
    }

    /// Returns the authorizations still needed.
    pub fn authorize_early_launch(
        &mut self,
        vehicle: VehicleId,
        identity: AuthorizerId,
    ) -> Result<u32, Rejection> {
        let result = self
            .coordinator
            .authorize_early_launch(&mut self.ctx, vehicle, identity);
        if let Err(reason) = &result {
            tracing::debug!("{} authorization on {} rejected: {}", identity, vehicle, reason.code());
        }
        self.flush();
        result
    }

    pub fn repeal_early_launch(
        &mut self,
        vehicle: VehicleId,
        identity: AuthorizerId,
    ) -> Result<u32, Rejection> {
        let result = self
            .coordinator
            .repeal_early_launch(&mut self.ctx, vehicle, identity);
        if let Err(reason) = &result {
            tracing::debug!("{} repeal on {} rejected: {}", identity, vehicle, reason.code());
        }
        self.flush();
        result
    }

    pub fn repeal_all(&mut self, vehicle: VehicleId, requester: AuthorizerId) -> Result<u32, Rejection> {
        let result = self.coordinator.repeal_all(&mut self.ctx, vehicle, requester);
        if let Err(reason) = &result {
            tracing::debug!("{} repeal-all on {} rejected: {}", requester, vehicle, reason.code());
        }
        self.flush();
        result
    }

    pub fn end_round_now(&mut self) -> Result<(), Rejection> {
        let result = self.round_end.end_round_now(&mut self.ctx);
        self.flush();
        result
    }

    /// Push-style transit completion, for drives that report arrivals
    /// themselves instead of being polled.
    pub fn complete_transit(&mut self, vehicle: VehicleId) {
        self.coordinator.on_transit_complete(&mut self.ctx, vehicle);
        self.flush();
    }

    /// Return both state machines to the start of a round. Vehicles are
    /// removed and stations kept. Pending timers are dropped except the
    /// cooldown gates, which run out on their own.
    pub fn reset(&mut self) {
        self.ctx.scheduler.cancel_where(|p| !p.is_gate());
        self.ctx.transit.abort_all();
        self.coordinator.reset(&mut self.ctx);
        self.round_end.reset();
        self.arm_auto_call();
        tracing::info!("Evacuation state reset");
    }

    // ── Map ────────────────────────────────────────────────────────────

    pub fn add_station(&mut self, name: impl Into<String>) -> StationId {
        let id = StationId(self.next_station_id);
        self.next_station_id += 1;
        self.ctx.world.spawn((Station {
            id,
            name: name.into(),
        },));
        id
    }

    /// Register a structure (with its dock ports) as part of `station`.
    pub fn add_structure(
        &mut self,
        station: StationId,
        structure: Structure,
        ports: Vec<DockPort>,
    ) -> Result<Entity, Rejection> {
        let known = self
            .ctx
            .world
            .query::<&Station>()
            .iter()
            .any(|(_, s)| s.id == station);
        if !known {
            return Err(Rejection::NotFound);
        }
        Ok(self
            .ctx
            .world
            .spawn((structure, DockPorts(ports), StationMember(station))))
    }

    /// Remove every station and station structure. Vehicles stay.
    pub fn clear_stations(&mut self) {
        let doomed: Vec<Entity> = self
            .ctx
            .world
            .iter()
            .filter(|e| e.has::<Station>() || e.has::<StationMember>())
            .map(|e| e.entity())
            .collect();
        for entity in doomed {
            let _ = self.ctx.world.despawn(entity);
        }
    }

    pub fn station_count(&self) -> usize {
        self.ctx.world.query::<&Station>().iter().count()
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn phase(&self) -> EvacPhase {
        self.coordinator.phase()
    }

    pub fn round_phase(&self) -> RoundPhase {
        self.round_end.phase()
    }

    /// Simulation time in seconds
    pub fn sim_time(&self) -> f64 {
        self.ctx.now()
    }

    pub fn config(&self) -> &EvacConfig {
        &self.ctx.config
    }

    pub fn world(&self) -> &World {
        &self.ctx.world
    }

    pub fn time_until_arrival(&self) -> Option<f64> {
        self.ctx.scheduler.remaining(Purpose::Arrival)
    }

    pub fn time_until_launch(&self) -> Option<f64> {
        self.ctx.scheduler.remaining(Purpose::Launch)
    }

    pub fn time_until_round_end(&self) -> Option<f64> {
        self.ctx.scheduler.remaining(Purpose::RoundEnd)
    }

    pub fn time_until_restart(&self) -> Option<f64> {
        self.ctx.scheduler.remaining(Purpose::Restart)
    }

    pub fn is_cooldown_active(&self) -> bool {
        self.ctx.scheduler.is_armed(Purpose::EvacuationCooldown)
    }

    /// Transit duration drawn at launch
    pub fn transit_eta(&self) -> Option<f64> {
        self.coordinator.transit_eta()
    }

    pub fn remaining_authorizations(&self, vehicle: VehicleId) -> Option<u32> {
        self.coordinator.tracker().remaining(vehicle)
    }

    pub fn is_triggered(&self, vehicle: VehicleId) -> bool {
        self.coordinator.is_triggered(vehicle)
    }

    /// Vehicles of the current round, in id order
    pub fn vehicles(&self) -> Vec<VehicleId> {
        self.coordinator.vehicles().collect()
    }

    pub fn vehicle_for_station(&self, station: StationId) -> Option<VehicleId> {
        self.coordinator.vehicle_for_station(station)
    }

    pub fn vehicle_state(&self, vehicle: VehicleId) -> Option<TransitState> {
        let entity = self.coordinator.vehicle_entity(vehicle)?;
        self.ctx.world.get::<&Vehicle>(entity).ok().map(|v| v.state)
    }

    pub fn vehicle_transform(&self, vehicle: VehicleId) -> Option<Transform2> {
        let entity = self.coordinator.vehicle_entity(vehicle)?;
        self.ctx.world.get::<&Structure>(entity).ok().map(|s| s.transform)
    }

    pub fn is_vehicle_docked(&self, vehicle: VehicleId) -> bool {
        self.coordinator
            .vehicle_entity(vehicle)
            .and_then(|e| self.ctx.world.get::<&Vehicle>(e).ok().map(|v| v.is_docked()))
            .unwrap_or(false)
    }

    // ── Events ─────────────────────────────────────────────────────────

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.bus.subscribe(subscriber);
    }

    /// Take every event published since the last drain.
    pub fn drain_events(&mut self) -> Vec<EvacEvent> {
        self.bus.drain()
    }
}

impl Default for EvacuationEngine {
    fn default() -> Self {
        Self::build(EvacConfig::default())
    }
}

impl std::fmt::Debug for EvacuationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvacuationEngine")
            .field("phase", &self.coordinator.phase())
            .field("round_phase", &self.round_end.phase())
            .field("sim_time", &self.ctx.now())
            .finish()
    }
}
