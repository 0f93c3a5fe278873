//! Seams to the systems the evacuation engine does not own.
//!
//! - [`AccessPolicy`]: who may authorize an early launch, who may repeal
//!   everyone's authorization.
//! - [`TransitDrive`]: physically moves a vehicle to the safe zone and
//!   reports when it gets there.
//! - [`RoundLifecycle`]: ends the round and starts the next one.

use evac_logic::ids::{AuthorizerId, VehicleId};
use std::collections::{BTreeMap, BTreeSet};

pub trait AccessPolicy {
    /// May `identity` authorize (or repeal their own) early launch?
    fn can_authorize(&self, identity: AuthorizerId) -> bool;
    /// May `identity` clear every authorization on a vehicle?
    fn is_elevated(&self, identity: AuthorizerId) -> bool;
}

pub trait TransitDrive {
    /// Begin moving `vehicle` to the safe zone; it should arrive
    /// `duration` seconds after `now`.
    fn start_transit(&mut self, vehicle: VehicleId, duration: f64, now: f64);
    /// Vehicles that completed transit at or before `now`. Each vehicle is
    /// reported once.
    fn poll_arrivals(&mut self, now: f64) -> Vec<VehicleId>;
    /// Forget every in-flight transit (round reset).
    fn abort_all(&mut self);
}

pub trait RoundLifecycle {
    fn finalize_round(&mut self);
    fn start_new_round(&mut self);
}

/// Everyone may authorize, everyone is elevated.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn can_authorize(&self, _identity: AuthorizerId) -> bool {
        true
    }

    fn is_elevated(&self, _identity: AuthorizerId) -> bool {
        true
    }
}

/// Explicit lists of authorizers and elevated crew.
///
/// Elevated crew may also authorize.
#[derive(Debug, Clone, Default)]
pub struct RosterAccess {
    authorizers: BTreeSet<AuthorizerId>,
    elevated: BTreeSet<AuthorizerId>,
}

impl RosterAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authorizer(mut self, identity: AuthorizerId) -> Self {
        self.authorizers.insert(identity);
        self
    }

    pub fn with_elevated(mut self, identity: AuthorizerId) -> Self {
        self.elevated.insert(identity);
        self
    }

    /// Number of crew eligible to authorize.
    pub fn eligible_count(&self) -> usize {
        self.authorizers.union(&self.elevated).count()
    }
}

impl AccessPolicy for RosterAccess {
    fn can_authorize(&self, identity: AuthorizerId) -> bool {
        self.authorizers.contains(&identity) || self.elevated.contains(&identity)
    }

    fn is_elevated(&self, identity: AuthorizerId) -> bool {
        self.elevated.contains(&identity)
    }
}

/// Completes each transit exactly `duration` seconds after it starts.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransit {
    in_flight: BTreeMap<VehicleId, f64>,
}

impl SimulatedTransit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl TransitDrive for SimulatedTransit {
    fn start_transit(&mut self, vehicle: VehicleId, duration: f64, now: f64) {
        self.in_flight.insert(vehicle, now + duration.max(0.0));
    }

    fn poll_arrivals(&mut self, now: f64) -> Vec<VehicleId> {
        let arrived: Vec<VehicleId> = self
            .in_flight
            .iter()
            .filter(|(_, arrive_at)| **arrive_at <= now)
            .map(|(v, _)| *v)
            .collect();
        for v in &arrived {
            self.in_flight.remove(v);
        }
        arrived
    }

    fn abort_all(&mut self) {
        self.in_flight.clear();
    }
}

/// Logs lifecycle calls and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLifecycle;

impl RoundLifecycle for LoggingLifecycle {
    fn finalize_round(&mut self) {
        tracing::info!("Round finalized");
    }

    fn start_new_round(&mut self) {
        tracing::info!("New round starting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_access_levels() {
        let roster = RosterAccess::new()
            .with_authorizer(AuthorizerId(1))
            .with_elevated(AuthorizerId(2));
        assert!(roster.can_authorize(AuthorizerId(1)));
        assert!(roster.can_authorize(AuthorizerId(2)));
        assert!(!roster.can_authorize(AuthorizerId(3)));
        assert!(!roster.is_elevated(AuthorizerId(1)));
        assert!(roster.is_elevated(AuthorizerId(2)));
        assert_eq!(roster.eligible_count(), 2);
    }

    #[test]
    fn simulated_transit_reports_each_arrival_once() {
        let mut drive = SimulatedTransit::new();
        drive.start_transit(VehicleId(1), 10.0, 0.0);
        drive.start_transit(VehicleId(2), 20.0, 0.0);
        assert!(drive.poll_arrivals(5.0).is_empty());
        assert_eq!(drive.poll_arrivals(10.0), vec![VehicleId(1)]);
        assert!(drive.poll_arrivals(12.0).is_empty());
        assert_eq!(drive.poll_arrivals(25.0), vec![VehicleId(2)]);
        assert_eq!(drive.in_flight(), 0);
    }

    #[test]
    fn abort_forgets_in_flight() {
        let mut drive = SimulatedTransit::new();
        drive.start_transit(VehicleId(1), 1.0, 0.0);
        drive.abort_all();
        assert!(drive.poll_arrivals(100.0).is_empty());
    }
}
