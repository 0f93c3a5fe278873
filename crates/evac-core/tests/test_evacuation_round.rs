//! Integration tests for a full evacuation round.
//!
//! Exercises: call → arrival/docking → hold and early launch → staggered
//! departure → transit completion → round end → restart.
//!
//! Everything runs on simulated time; no real clocks.

use evac_core::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

// ── Helpers ────────────────────────────────────────────────────────────

fn seeded_config() -> EvacConfig {
    EvacConfig {
        rng_seed: Some(42),
        ..EvacConfig::default()
    }
}

fn hub_port() -> DockPort {
    DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST)
}

/// Engine with one station whose hub has the given ports.
fn engine_with_station(config: EvacConfig, ports: Vec<DockPort>) -> (EvacuationEngine, StationId) {
    let mut engine = EvacuationEngine::new(config).expect("valid config");
    let station = engine.add_station("Outpost");
    engine
        .add_structure(station, Structure::new("Hub", Aabb::centered(20.0, 20.0)), ports)
        .expect("station registered");
    (engine, station)
}

fn run_for(engine: &mut EvacuationEngine, seconds: u32) {
    for _ in 0..seconds {
        engine.update(1.0);
    }
}

/// Call with a 600s countdown and run until the vehicles are holding.
fn holding_engine(config: EvacConfig) -> (EvacuationEngine, StationId, VehicleId) {
    let (mut engine, station) = engine_with_station(config, vec![hub_port()]);
    engine.call_evacuation(None, Some(600.0)).expect("idle engine accepts call");
    run_for(&mut engine, 600);
    let vehicle = engine.vehicle_for_station(station).expect("vehicle sent to station");
    (engine, station, vehicle)
}

fn count(events: &[EvacEvent], pred: impl Fn(&EvacEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(*e)).count()
}

// ── Arrival ────────────────────────────────────────────────────────────

#[test]
fn test_countdown_ends_in_holding_with_docked_vehicle() {
    let (mut engine, station) = engine_with_station(seeded_config(), vec![hub_port()]);
    engine.call_evacuation(None, Some(600.0)).expect("accepted");

    run_for(&mut engine, 599);
    assert_eq!(engine.phase(), EvacPhase::Requested, "one second still to go");

    engine.update(1.0);
    assert_eq!(engine.phase(), EvacPhase::Holding);
    let vehicle = engine.vehicle_for_station(station).expect("vehicle");
    assert_eq!(engine.vehicle_state(vehicle), Some(TransitState::Docked));
    assert!(engine.is_vehicle_docked(vehicle));

    let events = engine.drain_events();
    assert!(events.contains(&EvacEvent::VehicleArrived {
        vehicle,
        station,
        outcome: ArrivalOutcome::Docked,
    }));
    let hold = engine.time_until_launch().expect("launch armed");
    assert!((hold - engine.config().dock_timeout_buffer).abs() < 1e-9);
}

#[test]
fn test_station_without_ports_gets_nearby_vehicle() {
    let (mut engine, station) = engine_with_station(seeded_config(), Vec::new());
    engine.call_evacuation(None, Some(10.0)).expect("accepted");
    run_for(&mut engine, 10);

    assert_eq!(engine.phase(), EvacPhase::Holding);
    let vehicle = engine.vehicle_for_station(station).expect("vehicle");
    assert_eq!(engine.vehicle_state(vehicle), Some(TransitState::Nearby));
    assert!(!engine.is_vehicle_docked(vehicle));
    let transform = engine.vehicle_transform(vehicle).expect("placed");
    assert!(transform.position.x > 10.0, "parked clear of the hub");
}

#[test]
fn test_no_stations_still_reaches_holding() {
    let mut engine = EvacuationEngine::new(seeded_config()).expect("valid");
    engine.call_evacuation(None, Some(5.0)).expect("accepted");
    run_for(&mut engine, 5);

    assert_eq!(engine.phase(), EvacPhase::Holding);
    assert!(engine.vehicles().is_empty());
    let events = engine.drain_events();
    assert_eq!(count(&events, |e| *e == EvacEvent::NoStationsAvailable), 1);

    // Launch with nobody aboard still completes the evacuation
    run_for(&mut engine, 180);
    assert_eq!(engine.phase(), EvacPhase::Arrived);
    assert_eq!(engine.round_phase(), RoundPhase::Ending);
}

#[test]
fn test_disabled_vehicles_end_round_without_transit() {
    let config = EvacConfig {
        enabled: false,
        ..seeded_config()
    };
    let (mut engine, _) = engine_with_station(config, vec![hub_port()]);
    engine.call_evacuation(None, Some(3.0)).expect("accepted");
    run_for(&mut engine, 3);

    assert_eq!(engine.phase(), EvacPhase::Arrived);
    assert!(engine.vehicles().is_empty());
    assert!(engine
        .drain_events()
        .contains(&EvacEvent::FleetDeparted { transit_eta: 0.0 }));
    assert_eq!(engine.round_phase(), RoundPhase::Ending);
}

// ── Early launch ───────────────────────────────────────────────────────

#[test]
fn test_quorum_moves_launch_into_grace_window() {
    let (mut engine, _, vehicle) = holding_engine(seeded_config());

    assert_eq!(engine.authorize_early_launch(vehicle, AuthorizerId(1)), Ok(2));
    assert_eq!(engine.authorize_early_launch(vehicle, AuthorizerId(2)), Ok(1));
    assert!(!engine.is_triggered(vehicle));
    assert_eq!(engine.authorize_early_launch(vehicle, AuthorizerId(3)), Ok(0));
    assert!(engine.is_triggered(vehicle));

    let grace = engine.config().early_launch_grace_window;
    let eta = engine.time_until_launch().expect("launch armed");
    assert!((eta - grace).abs() < 1e-9, "launch re-armed to {eta}");

    run_for(&mut engine, 9);
    assert_eq!(engine.phase(), EvacPhase::Holding);
    engine.update(1.0);
    assert_eq!(engine.phase(), EvacPhase::Departing);
    assert_eq!(engine.vehicle_state(vehicle), Some(TransitState::Launching));
}

#[test]
fn test_authorization_rejections() {
    let access = RosterAccess::new()
        .with_authorizer(AuthorizerId(1))
        .with_authorizer(AuthorizerId(2))
        .with_elevated(AuthorizerId(9));
    let (mut engine, station) = engine_with_station(seeded_config(), vec![hub_port()]);
    engine = engine.with_access_policy(access);

    assert_eq!(
        engine.authorize_early_launch(VehicleId(0), AuthorizerId(1)),
        Err(Rejection::NotFound),
        "no vehicles before arrival"
    );

    engine.call_evacuation(None, Some(1.0)).expect("accepted");
    run_for(&mut engine, 1);
    let vehicle = engine.vehicle_for_station(station).expect("vehicle");

    assert_eq!(
        engine.authorize_early_launch(vehicle, AuthorizerId(5)),
        Err(Rejection::NotPermitted)
    );
    assert_eq!(engine.authorize_early_launch(vehicle, AuthorizerId(1)), Ok(2));
    assert_eq!(
        engine.authorize_early_launch(vehicle, AuthorizerId(1)),
        Err(Rejection::AlreadyAuthorized)
    );
    assert_eq!(engine.remaining_authorizations(vehicle), Some(2));

    assert_eq!(
        engine.repeal_early_launch(vehicle, AuthorizerId(2)),
        Err(Rejection::NotFound),
        "identity never authorized"
    );
    assert_eq!(engine.repeal_early_launch(vehicle, AuthorizerId(1)), Ok(3));

    engine.authorize_early_launch(vehicle, AuthorizerId(2)).expect("eligible");
    assert_eq!(engine.repeal_all(vehicle, AuthorizerId(1)), Err(Rejection::NotPermitted));
    engine.drain_events();
    assert_eq!(engine.repeal_all(vehicle, AuthorizerId(9)), Ok(3));
    assert_eq!(engine.remaining_authorizations(vehicle), Some(3));
    assert_eq!(
        engine.drain_events(),
        vec![EvacEvent::EarlyLaunchRepealedAll { vehicle, remaining: 3 }]
    );
}

#[test]
fn test_authorization_closes_inside_grace_window() {
    let (mut engine, _, vehicle) = holding_engine(seeded_config());
    run_for(&mut engine, 171);
    assert_eq!(
        engine.authorize_early_launch(vehicle, AuthorizerId(1)),
        Err(Rejection::NotPermitted)
    );
}

#[test]
fn test_trigger_survives_repeals() {
    let (mut engine, _, vehicle) = holding_engine(seeded_config());
    for id in 1..=3 {
        engine.authorize_early_launch(vehicle, AuthorizerId(id)).expect("accepted");
    }
    engine.repeal_early_launch(vehicle, AuthorizerId(1)).expect("was in set");
    engine.repeal_all(vehicle, AuthorizerId(2)).expect("open access is elevated");
    assert!(engine.is_triggered(vehicle));
}

// ── Recall and cooldown ────────────────────────────────────────────────

#[test]
fn test_cancel_only_while_requested() {
    let (mut engine, _) = engine_with_station(seeded_config(), vec![hub_port()]);
    assert_eq!(engine.cancel_evacuation(None), Err(Rejection::NotInRequestedState));

    engine.call_evacuation(None, Some(600.0)).expect("accepted");
    assert_eq!(
        engine.cancel_evacuation(None),
        Err(Rejection::CooldownActive),
        "recall inside the call cooldown"
    );
    run_for(&mut engine, 30);
    assert_eq!(engine.cancel_evacuation(Some(AuthorizerId(4))), Ok(()));
    assert_eq!(engine.phase(), EvacPhase::Idle);
    assert_eq!(engine.time_until_arrival(), None);

    engine.admin_call_evacuation(Some(1.0)).expect("admin ignores cooldown");
    run_for(&mut engine, 1);
    assert_eq!(engine.phase(), EvacPhase::Holding);
    assert_eq!(engine.admin_cancel_evacuation(), Err(Rejection::NotInRequestedState));
}

#[test]
fn test_cooldown_admits_one_call() {
    let (mut engine, _) = engine_with_station(seeded_config(), vec![hub_port()]);
    engine.call_evacuation(None, None).expect("first call");
    assert_eq!(engine.call_evacuation(None, None), Err(Rejection::AlreadyRequested));

    engine.admin_cancel_evacuation().expect("admin recall");
    assert_eq!(engine.call_evacuation(None, None), Err(Rejection::CooldownActive));
    assert!(engine.is_cooldown_active());

    run_for(&mut engine, 30);
    assert!(!engine.is_cooldown_active());
    assert_eq!(engine.call_evacuation(None, None), Ok(()));

    let requested = count(&engine.drain_events(), |e| {
        matches!(e, EvacEvent::EvacuationRequested { .. })
    });
    assert_eq!(requested, 2);
}

#[test]
fn test_round_end_request_uses_default_countdown() {
    let mut engine = EvacuationEngine::new(seeded_config()).expect("valid");
    engine.request_round_end().expect("idle");
    let eta = engine.time_until_arrival().expect("arrival armed");
    assert!((eta - engine.config().default_call_duration).abs() < 1e-9);
}

// ── Departure and round end ────────────────────────────────────────────

#[test]
fn test_full_round_restarts_to_idle() {
    let (mut engine, _, vehicle) = holding_engine(seeded_config());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine.subscribe(Box::new(move |e: &EvacEvent| sink.borrow_mut().push(e.clone())));

    // Hold, staggered departure, transit, buffer, restart
    run_for(&mut engine, 180);
    assert_eq!(engine.phase(), EvacPhase::Departing);
    let transit = engine.transit_eta().expect("transit drawn at launch");
    let config = engine.config().clone();
    assert!(transit >= config.min_transit_time && transit <= config.max_transit_time);

    run_for(&mut engine, 2);
    assert_eq!(engine.vehicle_state(vehicle), Some(TransitState::InTransit));
    assert!(!engine.is_vehicle_docked(vehicle));

    run_for(&mut engine, 200);
    assert!(matches!(
        engine.phase(),
        EvacPhase::Arrived | EvacPhase::Idle
    ));

    run_for(&mut engine, 100);
    assert_eq!(engine.phase(), EvacPhase::Idle);
    assert_eq!(engine.round_phase(), RoundPhase::InRound);
    assert!(engine.vehicles().is_empty());

    let events = seen.borrow();
    assert_eq!(count(&events, |e| matches!(e, EvacEvent::FleetLaunched { .. })), 1);
    assert!(events.contains(&EvacEvent::FleetDeparted { transit_eta: transit }));
    assert_eq!(count(&events, |e| *e == EvacEvent::RoundEnded), 1);
    assert!(events.contains(&EvacEvent::RoundWillRestart {
        eta: config.restart_duration
    }));
    assert_eq!(events.last(), Some(&EvacEvent::RoundRestarted));
}

#[test]
fn test_end_round_now_mid_holding() {
    let (mut engine, _, _) = holding_engine(seeded_config());
    engine.drain_events();

    assert_eq!(engine.end_round_now(), Ok(()));
    assert_eq!(engine.round_phase(), RoundPhase::Restarting);
    assert_eq!(engine.time_until_round_end(), None);
    assert_eq!(engine.time_until_restart(), Some(engine.config().restart_duration));
    assert_eq!(
        engine.drain_events(),
        vec![
            EvacEvent::RoundEnded,
            EvacEvent::RoundWillRestart {
                eta: engine.config().restart_duration
            }
        ]
    );
    assert_eq!(engine.end_round_now(), Err(Rejection::RoundAlreadyEnded));

    run_for(&mut engine, 30);
    assert_eq!(engine.phase(), EvacPhase::Idle);
    assert_eq!(engine.round_phase(), RoundPhase::InRound);
    let ports_free = engine
        .world()
        .query::<&DockPorts>()
        .iter()
        .all(|(_, ports)| ports.0.iter().all(|p| !p.attached));
    assert!(ports_free, "station ports released on reset");
}

#[test]
fn test_end_round_cooldown_outlives_restart() {
    let config = EvacConfig {
        restart_duration: 0.0,
        ..seeded_config()
    };
    let mut engine = EvacuationEngine::new(config).expect("valid");
    engine.end_round_now().expect("first end");
    engine.update(1.0);
    assert_eq!(engine.round_phase(), RoundPhase::InRound);
    assert_eq!(engine.end_round_now(), Err(Rejection::CooldownActive));

    run_for(&mut engine, 4);
    assert_eq!(engine.end_round_now(), Ok(()));
}

#[test]
fn test_transit_completion_for_unknown_vehicle_is_ignored() {
    let (mut engine, _, _) = holding_engine(seeded_config());
    engine.complete_transit(VehicleId(99));
    assert_eq!(engine.phase(), EvacPhase::Holding);
}

#[test]
fn test_manual_transit_completion() {
    let (mut engine, _, vehicle) = holding_engine(seeded_config());
    engine = engine.with_transit_drive(SimulatedTransit::new());
    engine.authorize_early_launch(vehicle, AuthorizerId(1)).expect("ok");
    engine.authorize_early_launch(vehicle, AuthorizerId(2)).expect("ok");
    engine.authorize_early_launch(vehicle, AuthorizerId(3)).expect("ok");
    run_for(&mut engine, 11);
    assert_eq!(engine.vehicle_state(vehicle), Some(TransitState::InTransit));

    engine.complete_transit(vehicle);
    assert_eq!(engine.phase(), EvacPhase::Arrived);
    assert_eq!(engine.vehicle_state(vehicle), Some(TransitState::Arrived));
    assert_eq!(engine.round_phase(), RoundPhase::Ending);
}
