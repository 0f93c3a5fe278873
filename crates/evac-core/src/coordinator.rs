//! Evacuation coordinator - the call / arrive / hold / launch state machine.
//!
//! The coordinator is the only writer of vehicle transit state and of the
//! authorization sets. Timed transitions are expressed as scheduler
//! purposes (`Arrival`, `Launch`, `Departure`, `AutoCall`); the engine
//! hands elapsed timers back here in stage order.

use crate::components::TransitState;
use crate::context::EvacContext;
use crate::systems::{
    begin_transit, despawn_vehicles, materialize_vehicle, mark_arrived, set_state, stagger_offsets,
    stations,
};
use evac_logic::authorization::AuthorizationTracker;
use evac_logic::events::EvacEvent;
use evac_logic::ids::{AuthorizerId, StationId, VehicleId};
use evac_logic::phase::EvacPhase;
use evac_logic::rejection::Rejection;
use evac_logic::scheduler::Purpose;
use hecs::Entity;
use rand::Rng;
use std::collections::BTreeMap;

/// Who asked for the evacuation, for logs and the auto-call policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSource {
    Crew(AuthorizerId),
    Console,
    Admin,
    /// External rule system decided the round should end.
    RuleSystem,
    AutoPolicy,
}

impl CallSource {
    fn from_requester(requester: Option<AuthorizerId>) -> Self {
        requester.map_or(Self::Console, Self::Crew)
    }

    fn bypasses_cooldown(self) -> bool {
        matches!(self, Self::Admin | Self::RuleSystem | Self::AutoPolicy)
    }
}

#[derive(Debug, Default)]
pub struct EvacuationCoordinator {
    phase: EvacPhase,
    tracker: AuthorizationTracker,
    vehicles: BTreeMap<VehicleId, Entity>,
    vehicle_stations: BTreeMap<StationId, VehicleId>,
    next_vehicle_id: u32,
    transit_eta: Option<f64>,
    call_source: Option<CallSource>,
}

impl EvacuationCoordinator {
    pub fn new(quorum: u32) -> Self {
        Self {
            tracker: AuthorizationTracker::new(quorum),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> EvacPhase {
        self.phase
    }

    pub fn tracker(&self) -> &AuthorizationTracker {
        &self.tracker
    }

    pub fn vehicle_entity(&self, vehicle: VehicleId) -> Option<Entity> {
        self.vehicles.get(&vehicle).copied()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.keys().copied()
    }

    pub fn vehicle_for_station(&self, station: StationId) -> Option<VehicleId> {
        self.vehicle_stations.get(&station).copied()
    }

    /// Transit duration drawn at launch.
    pub fn transit_eta(&self) -> Option<f64> {
        self.transit_eta
    }

    fn transition(&mut self, next: EvacPhase) -> bool {
        let legal = self.phase.can_transition_to(next);
        debug_assert!(legal, "illegal evacuation transition {:?} -> {:?}", self.phase, next);
        if !legal {
            tracing::error!(
                "Refusing illegal evacuation transition {} -> {}",
                self.phase.name(),
                next.name()
            );
            return false;
        }
        tracing::info!("Evacuation phase {} -> {}", self.phase.name(), next.name());
        self.phase = next;
        true
    }

    fn arm_cooldown(ctx: &mut EvacContext) {
        let cooldown = ctx.config.launch_cooldown_duration;
        if cooldown > 0.0 {
            ctx.scheduler.arm(Purpose::EvacuationCooldown, cooldown);
        }
    }

    // ── Commands ───────────────────────────────────────────────────────

    /// Start the arrival countdown.
    pub fn request_evacuation(
        &mut self,
        ctx: &mut EvacContext,
        source: CallSource,
        duration: Option<f64>,
    ) -> Result<(), Rejection> {
        if self.phase != EvacPhase::Idle {
            tracing::debug!("Evacuation call from {:?} rejected: already requested", source);
            return Err(Rejection::AlreadyRequested);
        }
        if !source.bypasses_cooldown() && ctx.scheduler.is_armed(Purpose::EvacuationCooldown) {
            tracing::debug!("Evacuation call from {:?} rejected: cooldown", source);
            return Err(Rejection::CooldownActive);
        }

        let eta = duration.unwrap_or(ctx.config.default_call_duration).max(0.0);
        if !self.transition(EvacPhase::Requested) {
            return Err(Rejection::AlreadyRequested);
        }
        ctx.scheduler.arm(Purpose::Arrival, eta);
        Self::arm_cooldown(ctx);
        self.call_source = Some(source);
        tracing::info!("Evacuation requested by {:?}, arrival in {:.0}s", source, eta);
        ctx.emit(EvacEvent::EvacuationRequested { eta });
        Ok(())
    }

    /// Crew or console call, subject to cooldown.
    pub fn call(
        &mut self,
        ctx: &mut EvacContext,
        requester: Option<AuthorizerId>,
        duration: Option<f64>,
    ) -> Result<(), Rejection> {
        self.request_evacuation(ctx, CallSource::from_requester(requester), duration)
    }

    /// Recall before arrival.
    pub fn cancel_evacuation(
        &mut self,
        ctx: &mut EvacContext,
        requester: Option<AuthorizerId>,
        bypass_cooldown: bool,
    ) -> Result<(), Rejection> {
        if !self.phase.is_recallable() {
            tracing::debug!("Recall rejected in phase {}", self.phase.name());
            return Err(Rejection::NotInRequestedState);
        }
        if !bypass_cooldown && ctx.scheduler.is_armed(Purpose::EvacuationCooldown) {
            tracing::debug!("Recall rejected: cooldown");
            return Err(Rejection::CooldownActive);
        }
        if !self.transition(EvacPhase::Idle) {
            return Err(Rejection::NotInRequestedState);
        }
        ctx.scheduler.cancel_purpose(Purpose::Arrival);
        Self::arm_cooldown(ctx);

        // The policy timer survives other calls; re-arm it only if it was
        // spent (by this call, or by firing while the call was pending).
        let recalled_auto = self.call_source == Some(CallSource::AutoPolicy);
        if ctx.config.auto_call_time.is_some()
            && (recalled_auto || !ctx.scheduler.is_armed(Purpose::AutoCall))
        {
            ctx.scheduler
                .arm(Purpose::AutoCall, ctx.config.auto_call_extension);
        }
        self.call_source = None;

        tracing::info!("Evacuation recalled by {:?}", requester);
        ctx.emit(EvacEvent::EvacuationCancelled);
        Ok(())
    }

    pub fn authorize_early_launch(
        &mut self,
        ctx: &mut EvacContext,
        vehicle: VehicleId,
        identity: AuthorizerId,
    ) -> Result<u32, Rejection> {
        let set = self.tracker.get(vehicle).ok_or(Rejection::NotFound)?;
        if self.phase != EvacPhase::Holding || !ctx.access.can_authorize(identity) {
            return Err(Rejection::NotPermitted);
        }
        if set.authorizers.contains(&identity) {
            return Err(Rejection::AlreadyAuthorized);
        }
        let hold_left = ctx.scheduler.remaining(Purpose::Launch).unwrap_or(0.0);
        if hold_left <= ctx.config.early_launch_grace_window {
            tracing::debug!("{} authorization from {} too late", vehicle, identity);
            return Err(Rejection::NotPermitted);
        }

        let outcome = self
            .tracker
            .authorize(vehicle, identity)
            .ok_or(Rejection::NotFound)?;
        tracing::info!(
            "{} authorized early launch of {}, {} remaining",
            identity,
            vehicle,
            outcome.remaining
        );
        ctx.emit(EvacEvent::EarlyLaunchAuthorized {
            vehicle,
            remaining: outcome.remaining,
        });

        if outcome.newly_triggered {
            let eta = hold_left.min(ctx.config.early_launch_grace_window);
            ctx.scheduler.arm(Purpose::Launch, eta);
            tracing::info!("Early launch triggered by {}, launching in {:.1}s", vehicle, eta);
            ctx.emit(EvacEvent::EarlyLaunchTriggered { vehicle, eta });
        }
        Ok(outcome.remaining)
    }

    pub fn repeal_early_launch(
        &mut self,
        ctx: &mut EvacContext,
        vehicle: VehicleId,
        identity: AuthorizerId,
    ) -> Result<u32, Rejection> {
        if !self.tracker.is_registered(vehicle) {
            return Err(Rejection::NotFound);
        }
        if self.phase != EvacPhase::Holding {
            return Err(Rejection::NotPermitted);
        }
        let outcome = self
            .tracker
            .repeal(vehicle, identity)
            .ok_or(Rejection::NotFound)?;
        if !outcome.removed {
            return Err(Rejection::NotFound);
        }
        tracing::info!("{} repealed early launch of {}", identity, vehicle);
        ctx.emit(EvacEvent::EarlyLaunchRepealed {
            vehicle,
            remaining: outcome.remaining,
        });
        Ok(outcome.remaining)
    }

    /// Clear every authorization on `vehicle`. Requires elevated access.
    /// A launch that already triggered stays triggered. Returns the
    /// authorizations now needed for quorum.
    pub fn repeal_all(
        &mut self,
        ctx: &mut EvacContext,
        vehicle: VehicleId,
        requester: AuthorizerId,
    ) -> Result<u32, Rejection> {
        if !ctx.access.is_elevated(requester) {
            return Err(Rejection::NotPermitted);
        }
        let remaining = self.tracker.repeal_all(vehicle).ok_or(Rejection::NotFound)?;
        tracing::info!("{} repealed all early launch authorizations on {}", requester, vehicle);
        ctx.emit(EvacEvent::EarlyLaunchRepealedAll { vehicle, remaining });
        Ok(remaining)
    }

    pub fn is_triggered(&self, vehicle: VehicleId) -> bool {
        self.tracker.is_triggered(vehicle)
    }

    // ── Timer and collaborator callbacks ───────────────────────────────

    /// Arrival countdown elapsed: send a vehicle to every station.
    pub fn on_arrival_elapsed(&mut self, ctx: &mut EvacContext) {
        if self.phase != EvacPhase::Requested {
            tracing::warn!("Stale arrival timer in phase {}", self.phase.name());
            return;
        }

        if !ctx.config.enabled {
            tracing::info!("Evacuation vehicles disabled; fleet considered departed");
            if self.transition(EvacPhase::Arrived) {
                self.transit_eta = Some(0.0);
                ctx.emit(EvacEvent::FleetDeparted { transit_eta: 0.0 });
            }
            return;
        }

        if !self.transition(EvacPhase::Arriving) {
            return;
        }

        let station_ids = stations(&ctx.world);
        if station_ids.is_empty() {
            tracing::warn!("No stations to evacuate; holding with zero vehicles");
            ctx.emit(EvacEvent::NoStationsAvailable);
        }

        for station in station_ids {
            let vehicle = VehicleId(self.next_vehicle_id);
            self.next_vehicle_id += 1;
            let (entity, outcome) = materialize_vehicle(&mut ctx.world, &ctx.config, station, vehicle);
            self.vehicles.insert(vehicle, entity);
            self.vehicle_stations.insert(station, vehicle);
            self.tracker.register(vehicle);
            ctx.emit(EvacEvent::VehicleArrived {
                vehicle,
                station,
                outcome,
            });
        }

        if self.transition(EvacPhase::Holding) {
            ctx.scheduler
                .arm(Purpose::Launch, ctx.config.dock_timeout_buffer);
        }
    }

    /// Hold elapsed (on schedule or early): launch the fleet.
    pub fn on_launch_elapsed(&mut self, ctx: &mut EvacContext) {
        if self.phase != EvacPhase::Holding {
            tracing::warn!("Stale launch timer in phase {}", self.phase.name());
            return;
        }
        if !self.transition(EvacPhase::Departing) {
            return;
        }

        let (min, max) = (ctx.config.min_transit_time, ctx.config.max_transit_time);
        let transit = if max > min {
            ctx.rng.gen_range(min..=max)
        } else {
            min
        };
        self.transit_eta = Some(transit);
        ctx.emit(EvacEvent::FleetLaunched { transit_eta: transit });

        if self.vehicles.is_empty() {
            tracing::warn!("Launch with no vehicles; fleet considered departed");
            if self.transition(EvacPhase::Arrived) {
                ctx.emit(EvacEvent::FleetDeparted { transit_eta: transit });
            }
            return;
        }

        let offsets = stagger_offsets(
            self.vehicles.len(),
            ctx.config.departure_stagger_step,
            ctx.config.max_departure_stagger,
            &mut ctx.rng,
        );
        for ((&vehicle, &entity), offset) in self.vehicles.iter().zip(offsets) {
            set_state(&mut ctx.world, entity, TransitState::Launching);
            ctx.scheduler.arm(Purpose::Departure(vehicle), offset);
        }
    }

    /// A vehicle's staggered departure came due.
    pub fn on_departure_elapsed(&mut self, ctx: &mut EvacContext, vehicle: VehicleId) {
        let Some(entity) = self.vehicle_entity(vehicle) else {
            tracing::warn!("Departure timer for unknown {}", vehicle);
            return;
        };
        if !matches!(self.phase, EvacPhase::Departing | EvacPhase::Arrived) {
            tracing::warn!("Stale departure timer for {} in phase {}", vehicle, self.phase.name());
            return;
        }
        let duration = self.transit_eta.unwrap_or(ctx.config.min_transit_time);
        if begin_transit(&mut ctx.world, entity) {
            let now = ctx.now();
            ctx.transit.start_transit(vehicle, duration, now);
        }
    }

    /// Transit drive reports a vehicle reached the safe zone. The first
    /// arrival completes the evacuation.
    pub fn on_transit_complete(&mut self, ctx: &mut EvacContext, vehicle: VehicleId) {
        let Some(entity) = self.vehicle_entity(vehicle) else {
            tracing::warn!("Transit completion for unknown {}", vehicle);
            return;
        };
        if !mark_arrived(&mut ctx.world, entity) {
            return;
        }
        if self.phase == EvacPhase::Departing && self.transition(EvacPhase::Arrived) {
            let transit_eta = self.transit_eta.unwrap_or(0.0);
            ctx.emit(EvacEvent::FleetDeparted { transit_eta });
        }
    }

    /// Automatic call policy fired.
    pub fn on_auto_call_elapsed(&mut self, ctx: &mut EvacContext) {
        if self.phase != EvacPhase::Idle {
            return;
        }
        if let Err(reason) = self.request_evacuation(ctx, CallSource::AutoPolicy, None) {
            tracing::debug!("Automatic evacuation call rejected: {}", reason.code());
        }
    }

    /// Return to `Idle` with no vehicles. Timers are cleared by the engine.
    pub fn reset(&mut self, ctx: &mut EvacContext) {
        let entities: Vec<Entity> = self.vehicles.values().copied().collect();
        despawn_vehicles(&mut ctx.world, entities);
        self.vehicles.clear();
        self.vehicle_stations.clear();
        self.tracker.reset();
        self.tracker.set_quorum(ctx.config.required_authorizations);
        self.transit_eta = None;
        self.call_source = None;
        self.phase = EvacPhase::Idle;
    }
}
