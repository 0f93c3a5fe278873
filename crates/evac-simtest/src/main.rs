//! Evac Headless Round Harness
//!
//! Drives the evacuation engine through scripted rounds on simulated time
//! and checks the observable outcomes. Runs entirely in-process: no game
//! server, no rendering, no real clock.
//!
//! Usage:
//!   cargo run -p evac-simtest
//!   cargo run -p evac-simtest -- --verbose

use evac_core::prelude::*;
use evac_logic::rejection::ConfigError;
use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ── Data files ──────────────────────────────────────────────────────────
const CONFIG_JSON: &str = include_str!("../../../data/evac_config.json");
const MAP_JSON: &str = include_str!("../../../data/evac_map.json");

#[derive(Debug, Deserialize)]
struct MapSpec {
    stations: Vec<StationSpec>,
}

#[derive(Debug, Deserialize)]
struct StationSpec {
    name: String,
    /// Whether the station's largest structure should accept a dock
    expect_docked: bool,
    structures: Vec<StructureSpec>,
}

#[derive(Debug, Deserialize)]
struct StructureSpec {
    name: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    ports: Vec<PortSpec>,
}

#[derive(Debug, Deserialize)]
struct PortSpec {
    x: f64,
    y: f64,
    facing_deg: f64,
    #[serde(default)]
    evacuation: bool,
}

impl PortSpec {
    fn to_port(&self) -> DockPort {
        let port = DockPort::new(Vec2::new(self.x, self.y), Angle::from_degrees(self.facing_deg));
        if self.evacuation {
            port.with_tag(PortTag::Evacuation)
        } else {
            port
        }
    }
}

// ── Logging ─────────────────────────────────────────────────────────────

/// Install the stderr subscriber. `RUST_LOG` wins when set; otherwise
/// `--verbose` shows debug output and the default is warnings only.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    init_logging(verbose);
    println!("=== Evacuation Round Harness ===\n");

    let mut results = Vec::new();

    // 1. Configuration loading and validation
    results.extend(validate_config(verbose));

    // 2. Docking against the sample map
    results.extend(validate_map_docking(verbose));

    // 3. Countdown to holding
    results.extend(validate_countdown(verbose));

    // 4. Early launch quorum
    results.extend(validate_early_launch(verbose));

    // 5. Recall and cooldown gates
    results.extend(validate_recall_and_cooldown(verbose));

    // 6. Round end and restart
    results.extend(validate_round_end(verbose));

    // 7. Degraded outcomes
    results.extend(validate_degraded(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn base_config() -> Result<EvacConfig, ConfigError> {
    EvacConfig::from_json(CONFIG_JSON)
}

fn base_engine() -> Result<EvacuationEngine, String> {
    let config = base_config().map_err(|e| format!("config: {}", e))?;
    EvacuationEngine::new(config).map_err(|e| format!("engine: {}", e))
}

/// Register every station and structure in the map. Returns each
/// station's id and whether it is expected to dock.
fn load_map(engine: &mut EvacuationEngine, map: &MapSpec) -> Result<Vec<(StationId, bool)>, String> {
    let mut loaded = Vec::new();
    for station in &map.stations {
        let id = engine.add_station(station.name.as_str());
        for s in &station.structures {
            let structure = Structure::new(s.name.as_str(), Aabb::centered(s.width, s.height))
                .with_transform(Transform2::at(s.x, s.y));
            let ports = s.ports.iter().map(PortSpec::to_port).collect();
            engine
                .add_structure(id, structure, ports)
                .map_err(|e| format!("{}: {}", s.name, e))?;
        }
        loaded.push((id, station.expect_docked));
    }
    Ok(loaded)
}

fn run_for(engine: &mut EvacuationEngine, seconds: u32) {
    for _ in 0..seconds {
        engine.update(1.0);
    }
}

fn setup_failure(name: &str, err: String) -> Vec<TestResult> {
    vec![check(name, false, err)]
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_config(verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let config = match base_config() {
        Ok(c) => c,
        Err(e) => return setup_failure("config_parse", format!("{}", e)),
    };
    results.push(check("config_parse", true, "data/evac_config.json loaded"));

    results.push(check(
        "config_transit_range",
        config.min_transit_time <= config.max_transit_time,
        format!(
            "transit {:.0}..{:.0}s",
            config.min_transit_time, config.max_transit_time
        ),
    ));

    results.push(check(
        "config_vehicle_has_ports",
        !config.vehicle.ports.is_empty(),
        format!("{} vehicle ports", config.vehicle.ports.len()),
    ));

    let partial = EvacConfig::from_json(r#"{ "required_authorizations": 5 }"#);
    let partial_ok = partial
        .as_ref()
        .map(|c| c.required_authorizations == 5 && c.dock_timeout_buffer == 180.0)
        .unwrap_or(false);
    results.push(check(
        "config_partial_defaults",
        partial_ok,
        "missing keys fall back to defaults",
    ));

    let cases: [(&str, &str, fn(&ConfigError) -> bool); 4] = [
        ("config_rejects_inverted_range", r#"{ "min_transit_time": 300 }"#, |e| {
            matches!(e, ConfigError::TransitRange { .. })
        }),
        ("config_rejects_zero_quorum", r#"{ "required_authorizations": 0 }"#, |e| {
            matches!(e, ConfigError::ZeroQuorum)
        }),
        ("config_rejects_negative_duration", r#"{ "restart_duration": -1 }"#, |e| {
            matches!(e, ConfigError::InvalidDuration { .. })
        }),
        ("config_rejects_malformed", r#"{ "enabled": "#, |e| {
            matches!(e, ConfigError::Parse(_))
        }),
    ];
    for (name, json, expected) in cases {
        let outcome = EvacConfig::from_json(json);
        let detail = match &outcome {
            Ok(_) => "accepted".to_string(),
            Err(e) => e.to_string(),
        };
        results.push(check(name, outcome.as_ref().err().is_some_and(expected), detail));
    }

    if verbose {
        println!(
            "  hold {:.0}s, grace {:.0}s, quorum {}",
            config.dock_timeout_buffer, config.early_launch_grace_window, config.required_authorizations
        );
    }

    results
}

// ── 2. Map Docking ──────────────────────────────────────────────────────

fn validate_map_docking(verbose: bool) -> Vec<TestResult> {
    println!("--- Map Docking ---");
    let mut results = Vec::new();

    let map: MapSpec = match serde_json::from_str(MAP_JSON) {
        Ok(m) => m,
        Err(e) => return setup_failure("map_parse", format!("JSON parse error: {}", e)),
    };
    let mut engine = match base_engine() {
        Ok(e) => e,
        Err(e) => return setup_failure("map_engine", e),
    };
    let stations = match load_map(&mut engine, &map) {
        Ok(s) => s,
        Err(e) => return setup_failure("map_load", e),
    };
    results.push(check(
        "map_loaded",
        engine.station_count() == map.stations.len(),
        format!("{} stations", engine.station_count()),
    ));

    if let Err(e) = engine.admin_call_evacuation(Some(1.0)) {
        return setup_failure("map_call", e.to_string());
    }
    engine.update(1.0);

    results.push(check(
        "map_reaches_holding",
        engine.phase() == EvacPhase::Holding,
        format!("phase {:?}", engine.phase()),
    ));
    results.push(check(
        "map_one_vehicle_per_station",
        engine.vehicles().len() == stations.len(),
        format!("{} vehicles", engine.vehicles().len()),
    ));

    for ((station, expect_docked), spec) in stations.iter().zip(&map.stations) {
        let Some(vehicle) = engine.vehicle_for_station(*station) else {
            results.push(check("map_vehicle_present", false, format!("none for {}", spec.name)));
            continue;
        };
        let docked = engine.is_vehicle_docked(vehicle);
        let state = engine.vehicle_state(vehicle);
        let expected_state = if *expect_docked {
            TransitState::Docked
        } else {
            TransitState::Nearby
        };
        results.push(check(
            "map_docking_outcome",
            docked == *expect_docked && state == Some(expected_state),
            format!("{}: docked={} state={:?}", spec.name, docked, state),
        ));
        if verbose {
            if let Some(t) = engine.vehicle_transform(vehicle) {
                println!(
                    "  {} at ({:.2}, {:.2}) rot {:.2}",
                    vehicle, t.position.x, t.position.y, t.rotation.0
                );
            }
        }
    }

    // No vehicle hull may intersect any other hull
    let hulls: Vec<_> = engine
        .world()
        .query::<&Structure>()
        .iter()
        .map(|(_, s)| (s.name.clone(), s.bounds.shrunk(0.05).transformed(&s.transform)))
        .collect();
    let mut overlaps = Vec::new();
    for (i, (a_name, a)) in hulls.iter().enumerate() {
        for (b_name, b) in hulls.iter().skip(i + 1) {
            if a.overlaps(b) {
                overlaps.push(format!("{} / {}", a_name, b_name));
            }
        }
    }
    results.push(check(
        "map_no_overlaps",
        overlaps.is_empty(),
        if overlaps.is_empty() {
            "no intersecting hulls".to_string()
        } else {
            overlaps.join(", ")
        },
    ));

    results
}

// ── 3. Countdown ────────────────────────────────────────────────────────

fn single_station_engine() -> Result<(EvacuationEngine, StationId), String> {
    let mut engine = base_engine()?;
    let station = engine.add_station("Harness Station");
    engine
        .add_structure(
            station,
            Structure::new("Harness Hub", Aabb::centered(20.0, 20.0)),
            vec![DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST)],
        )
        .map_err(|e| e.to_string())?;
    Ok((engine, station))
}

fn validate_countdown(_verbose: bool) -> Vec<TestResult> {
    println!("--- Countdown ---");
    let mut results = Vec::new();

    let (mut engine, station) = match single_station_engine() {
        Ok(e) => e,
        Err(e) => return setup_failure("countdown_setup", e),
    };

    let accepted = engine.call_evacuation(Some(AuthorizerId(1)), Some(600.0));
    results.push(check(
        "countdown_call_accepted",
        accepted.is_ok(),
        format!("{:?}", accepted),
    ));

    run_for(&mut engine, 599);
    results.push(check(
        "countdown_not_early",
        engine.phase() == EvacPhase::Requested,
        format!("phase at 599s: {:?}", engine.phase()),
    ));

    engine.update(1.0);
    let vehicle = engine.vehicle_for_station(station);
    let docked = vehicle.is_some_and(|v| engine.is_vehicle_docked(v));
    results.push(check(
        "countdown_holding_docked",
        engine.phase() == EvacPhase::Holding && docked,
        format!("phase {:?}, docked={}", engine.phase(), docked),
    ));

    results
}

// ── 4. Early Launch ─────────────────────────────────────────────────────

fn validate_early_launch(verbose: bool) -> Vec<TestResult> {
    println!("--- Early Launch ---");
    let mut results = Vec::new();

    let (mut engine, station) = match single_station_engine() {
        Ok(e) => e,
        Err(e) => return setup_failure("early_launch_setup", e),
    };
    if let Err(e) = engine.admin_call_evacuation(Some(1.0)) {
        return setup_failure("early_launch_call", e.to_string());
    }
    engine.update(1.0);
    let Some(vehicle) = engine.vehicle_for_station(station) else {
        return setup_failure("early_launch_vehicle", "no vehicle".into());
    };

    let first = engine.authorize_early_launch(vehicle, AuthorizerId(10));
    let repeat = engine.authorize_early_launch(vehicle, AuthorizerId(10));
    results.push(check(
        "early_launch_idempotent",
        first == Ok(2) && repeat == Err(Rejection::AlreadyAuthorized),
        format!("first {:?}, repeat {:?}", first, repeat),
    ));

    let second = engine.authorize_early_launch(vehicle, AuthorizerId(11));
    let third = engine.authorize_early_launch(vehicle, AuthorizerId(12));
    results.push(check(
        "early_launch_quorum",
        second == Ok(1) && third == Ok(0) && engine.is_triggered(vehicle),
        format!("remaining {:?} then {:?}", second, third),
    ));

    let grace = engine.config().early_launch_grace_window;
    let eta = engine.time_until_launch().unwrap_or(f64::INFINITY);
    results.push(check(
        "early_launch_within_grace",
        eta <= grace,
        format!("launch in {:.1}s (grace {:.0}s)", eta, grace),
    ));

    let _ = engine.repeal_all(vehicle, AuthorizerId(10));
    results.push(check(
        "early_launch_latched",
        engine.is_triggered(vehicle),
        "repeal-all keeps the trigger",
    ));

    run_for(&mut engine, grace.ceil() as u32);
    results.push(check(
        "early_launch_departing",
        engine.phase() == EvacPhase::Departing,
        format!("phase {:?}", engine.phase()),
    ));

    if verbose {
        if let Some(transit) = engine.transit_eta() {
            println!("  transit drawn: {:.1}s", transit);
        }
    }

    results
}

// ── 5. Recall & Cooldown ────────────────────────────────────────────────

fn validate_recall_and_cooldown(_verbose: bool) -> Vec<TestResult> {
    println!("--- Recall & Cooldown ---");
    let mut results = Vec::new();

    let (mut engine, _) = match single_station_engine() {
        Ok(e) => e,
        Err(e) => return setup_failure("recall_setup", e),
    };

    let idle_cancel = engine.cancel_evacuation(None);
    results.push(check(
        "recall_rejected_when_idle",
        idle_cancel == Err(Rejection::NotInRequestedState),
        format!("{:?}", idle_cancel),
    ));

    let first = engine.call_evacuation(None, None);
    let second = engine.call_evacuation(None, None);
    results.push(check(
        "cooldown_single_call",
        first.is_ok() && second.is_err(),
        format!("first {:?}, second {:?}", first, second),
    ));

    let early_recall = engine.cancel_evacuation(None);
    results.push(check(
        "cooldown_blocks_recall",
        early_recall == Err(Rejection::CooldownActive),
        format!("{:?}", early_recall),
    ));

    let cooldown = engine.config().launch_cooldown_duration;
    run_for(&mut engine, cooldown.ceil() as u32);
    let recall = engine.cancel_evacuation(None);
    results.push(check(
        "recall_while_requested",
        recall.is_ok() && engine.phase() == EvacPhase::Idle,
        format!("{:?}, phase {:?}", recall, engine.phase()),
    ));

    let admin = engine.admin_call_evacuation(Some(1.0));
    engine.update(1.0);
    let late_recall = engine.admin_cancel_evacuation();
    results.push(check(
        "recall_rejected_after_arrival",
        admin.is_ok() && late_recall == Err(Rejection::NotInRequestedState),
        format!("admin call {:?}, recall {:?}", admin, late_recall),
    ));

    results
}

// ── 6. Round End ────────────────────────────────────────────────────────

fn validate_round_end(verbose: bool) -> Vec<TestResult> {
    println!("--- Round End ---");
    let mut results = Vec::new();

    // Full round on schedule
    let (mut engine, _) = match single_station_engine() {
        Ok(e) => e,
        Err(e) => return setup_failure("round_setup", e),
    };
    if let Err(e) = engine.admin_call_evacuation(Some(1.0)) {
        return setup_failure("round_call", e.to_string());
    }
    let config = engine.config().clone();
    let horizon = 1.0
        + config.dock_timeout_buffer
        + config.max_departure_stagger
        + config.max_transit_time
        + config.round_end_buffer_duration
        + config.restart_duration
        + 5.0;
    let mut events = Vec::new();
    for _ in 0..horizon.ceil() as u32 {
        engine.update(1.0);
        events.extend(engine.drain_events());
    }
    let departed = events
        .iter()
        .any(|e| matches!(e, EvacEvent::FleetDeparted { .. }));
    let ended = events.iter().any(|e| *e == EvacEvent::RoundEnded);
    let restarted = events.iter().any(|e| *e == EvacEvent::RoundRestarted);
    results.push(check(
        "round_full_cycle",
        departed && ended && restarted,
        format!(
            "departed={} ended={} restarted={}",
            departed, ended, restarted
        ),
    ));
    results.push(check(
        "round_reset_to_idle",
        engine.phase() == EvacPhase::Idle && engine.vehicles().is_empty(),
        format!("phase {:?}, {} vehicles", engine.phase(), engine.vehicles().len()),
    ));
    if verbose {
        for e in &events {
            println!("  {}", serde_json::to_string(e).unwrap_or_default());
        }
    }

    // Forced end while holding
    let (mut engine, _) = match single_station_engine() {
        Ok(e) => e,
        Err(e) => return setup_failure("round_force_setup", e),
    };
    let _ = engine.admin_call_evacuation(Some(1.0));
    engine.update(1.0);
    let forced = engine.end_round_now();
    let restart_eta = engine.time_until_restart();
    results.push(check(
        "round_force_mid_holding",
        forced.is_ok()
            && engine.round_phase() == RoundPhase::Restarting
            && restart_eta == Some(config.restart_duration),
        format!("{:?}, restart in {:?}", forced, restart_eta),
    ));
    let again = engine.end_round_now();
    results.push(check(
        "round_force_once",
        again == Err(Rejection::RoundAlreadyEnded),
        format!("{:?}", again),
    ));

    results
}

// ── 7. Degraded Outcomes ────────────────────────────────────────────────

fn validate_degraded(_verbose: bool) -> Vec<TestResult> {
    println!("--- Degraded Outcomes ---");
    let mut results = Vec::new();

    let mut empty = match base_engine() {
        Ok(e) => e,
        Err(e) => return setup_failure("degraded_setup", e),
    };
    let _ = empty.admin_call_evacuation(Some(1.0));
    empty.update(1.0);
    let announced = empty
        .drain_events()
        .iter()
        .any(|e| *e == EvacEvent::NoStationsAvailable);
    results.push(check(
        "degraded_no_stations_holds",
        empty.phase() == EvacPhase::Holding && announced,
        format!("phase {:?}, announced={}", empty.phase(), announced),
    ));

    let disabled_config = match base_config() {
        Ok(c) => EvacConfig {
            enabled: false,
            ..c
        },
        Err(e) => return setup_failure("degraded_disabled_config", e.to_string()),
    };
    let mut disabled = match EvacuationEngine::new(disabled_config) {
        Ok(e) => e,
        Err(e) => return setup_failure("degraded_disabled_engine", e.to_string()),
    };
    let _ = disabled.admin_call_evacuation(Some(1.0));
    disabled.update(1.0);
    results.push(check(
        "degraded_disabled_arrives",
        disabled.phase() == EvacPhase::Arrived && disabled.round_phase() == RoundPhase::Ending,
        format!("phase {:?}, round {:?}", disabled.phase(), disabled.round_phase()),
    ));

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_can_be_installed_twice() {
        init_logging(true);
        init_logging(false);
        tracing::debug!("subscriber installed");
    }
}
