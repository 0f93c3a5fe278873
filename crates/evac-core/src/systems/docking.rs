//! Docking system - materializes a vehicle and positions it at a station

use crate::components::{DockLink, DockPorts, Station, StationMember, Structure, TransitState, Vehicle};
use evac_logic::config::EvacConfig;
use evac_logic::docking::{nearby_placement, plan_docking, DockingBody};
use evac_logic::events::ArrivalOutcome;
use evac_logic::geometry::{OrientedBox, Transform2};
use evac_logic::ids::{StationId, VehicleId};
use hecs::{Entity, World};
use std::cmp::Ordering;

/// Stations in id order
pub fn stations(world: &World) -> Vec<StationId> {
    let mut ids: Vec<StationId> = world.query::<&Station>().iter().map(|(_, s)| s.id).collect();
    ids.sort();
    ids
}

/// Largest-first ordering with entity id as a stable tie-break
fn by_area_desc(a: &(Entity, f64), b: &(Entity, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then(a.0.id().cmp(&b.0.id()))
}

/// The station's largest anchored structure that still has a free port
pub fn largest_eligible_structure(world: &World, station: StationId) -> Option<Entity> {
    let mut candidates: Vec<(Entity, f64)> = world
        .query::<(&Structure, &DockPorts, &StationMember)>()
        .iter()
        .filter(|(_, (s, ports, member))| member.0 == station && s.anchored && ports.has_free_port())
        .map(|(e, (s, _, _))| (e, s.area()))
        .collect();
    candidates.sort_by(by_area_desc);
    candidates.first().map(|(e, _)| *e)
}

/// The station's largest structure of any kind
pub fn largest_structure(world: &World, station: StationId) -> Option<Entity> {
    let mut candidates: Vec<(Entity, f64)> = world
        .query::<(&Structure, &StationMember)>()
        .iter()
        .filter(|(_, (_, member))| member.0 == station)
        .map(|(e, (s, _))| (e, s.area()))
        .collect();
    candidates.sort_by(by_area_desc);
    candidates.first().map(|(e, _)| *e)
}

/// World-space hulls of every structure, drifting ones and vehicles included
pub fn occupied_space(world: &World) -> Vec<OrientedBox> {
    world
        .query::<&Structure>()
        .iter()
        .map(|(_, s)| s.footprint())
        .collect()
}

/// Spawn `vehicle` for `station`, docked if any port pair fits, otherwise
/// parked nearby and unlatched.
pub fn materialize_vehicle(
    world: &mut World,
    config: &EvacConfig,
    station: StationId,
    vehicle: VehicleId,
) -> (Entity, ArrivalOutcome) {
    let blueprint = &config.vehicle;
    let vehicle_body = DockingBody::anchored(Transform2::IDENTITY, blueprint.bounds);
    let mut vehicle_ports = blueprint.ports.clone();

    let docked = largest_eligible_structure(world, station).and_then(|target| {
        let structure = world.get::<&Structure>(target).ok()?;
        let ports = world.get::<&DockPorts>(target).ok()?;
        let occupied = occupied_space(world);
        plan_docking(
            &vehicle_body,
            &vehicle_ports,
            &structure.docking_body(),
            &ports.0,
            &occupied,
            config.dock_epsilon,
        )
        .map(|cfg| (target, cfg))
    });

    let mut component = Vehicle::new(vehicle, station);
    let (transform, outcome) = match docked {
        Some((target, cfg)) => {
            if let Ok(mut ports) = world.get::<&mut DockPorts>(target) {
                ports.set_attached(cfg.target_port, true);
            }
            vehicle_ports[cfg.vehicle_port].attached = true;
            component.state = TransitState::Docked;
            component.docking = Some(DockLink {
                target,
                target_port: cfg.target_port,
                vehicle_port: cfg.vehicle_port,
            });
            tracing::info!(
                "{} docked at {} (port {} -> port {})",
                vehicle,
                station,
                cfg.vehicle_port,
                cfg.target_port
            );
            (cfg.placement.transform, ArrivalOutcome::Docked)
        }
        None => {
            let anchor = largest_structure(world, station)
                .and_then(|e| world.get::<&Structure>(e).ok().map(|s| s.docking_body()));
            let transform = nearby_placement(anchor.as_ref(), &blueprint.bounds, config.nearby_offset);
            component.state = TransitState::Nearby;
            tracing::warn!(
                "{} found no valid dock at {}; parked nearby, unlatched",
                vehicle,
                station
            );
            (transform, ArrivalOutcome::NearbyUnlatched)
        }
    };

    let hull = Structure::new(format!("Evacuation vehicle {}", vehicle.0), blueprint.bounds)
        .with_transform(transform);
    let entity = world.spawn((hull, DockPorts(vehicle_ports), component));
    (entity, outcome)
}

/// Release both sides of a vehicle's dock link, if any
pub fn undock_vehicle(world: &mut World, entity: Entity) {
    let link = match world.get::<&mut Vehicle>(entity) {
        Ok(mut v) => v.docking.take(),
        Err(_) => return,
    };
    let Some(link) = link else {
        return;
    };
    if let Ok(mut ports) = world.get::<&mut DockPorts>(link.target) {
        ports.set_attached(link.target_port, false);
    }
    if let Ok(mut ports) = world.get::<&mut DockPorts>(entity) {
        ports.set_attached(link.vehicle_port, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evac_logic::docking::DockPort;
    use evac_logic::geometry::{Aabb, Angle, Vec2};

    fn spawn_station(world: &mut World, id: u32) -> StationId {
        let sid = StationId(id);
        world.spawn((Station {
            id: sid,
            name: format!("Station {id}"),
        },));
        sid
    }

    fn spawn_section(world: &mut World, station: StationId, size: f64, ports: Vec<DockPort>) -> Entity {
        world.spawn((
            Structure::new("section", Aabb::centered(size, size)),
            DockPorts(ports),
            StationMember(station),
        ))
    }

    #[test]
    fn picks_largest_structure_with_free_port() {
        let mut world = World::new();
        let sid = spawn_station(&mut world, 1);
        let small = spawn_section(&mut world, sid, 10.0, vec![DockPort::new(Vec2::new(5.0, 0.0), Angle::EAST)]);
        let mut taken = DockPort::new(Vec2::new(25.0, 0.0), Angle::EAST);
        taken.attached = true;
        let _big_full = spawn_section(&mut world, sid, 50.0, vec![taken]);
        assert_eq!(largest_eligible_structure(&world, sid), Some(small));
    }

    #[test]
    fn drifting_structure_is_not_eligible() {
        let mut world = World::new();
        let sid = spawn_station(&mut world, 1);
        world.spawn((
            Structure::new("loose module", Aabb::centered(40.0, 40.0)).unanchored(),
            DockPorts(vec![DockPort::new(Vec2::new(20.0, 0.0), Angle::EAST)]),
            StationMember(sid),
        ));
        assert_eq!(largest_eligible_structure(&world, sid), None);
        assert_eq!(occupied_space(&world).len(), 1, "still takes up space");
    }

    #[test]
    fn drifting_debris_blocks_the_port() {
        let mut world = World::new();
        let sid = spawn_station(&mut world, 1);
        spawn_section(&mut world, sid, 20.0, vec![DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST)]);
        world.spawn((
            Structure::new("debris", Aabb::centered(6.0, 6.0))
                .with_transform(Transform2::new(Vec2::new(16.0, 0.0), Angle::EAST))
                .unanchored(),
            DockPorts(Vec::new()),
        ));
        let config = EvacConfig::default();
        let (_, outcome) = materialize_vehicle(&mut world, &config, sid, VehicleId(1));
        assert_eq!(outcome, ArrivalOutcome::NearbyUnlatched);
    }

    #[test]
    fn docks_and_latches_both_ports() {
        let mut world = World::new();
        let sid = spawn_station(&mut world, 1);
        let section = spawn_section(&mut world, sid, 20.0, vec![DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST)]);
        let config = EvacConfig::default();
        let (entity, outcome) = materialize_vehicle(&mut world, &config, sid, VehicleId(1));
        assert_eq!(outcome, ArrivalOutcome::Docked);
        assert!(world.get::<&DockPorts>(section).map(|p| p.0[0].attached).unwrap_or(false));
        let v = world.get::<&Vehicle>(entity).expect("vehicle component");
        assert_eq!(v.state, TransitState::Docked);
        let link = v.docking.expect("latched");
        assert_eq!(link.target, section);
        drop(v);

        undock_vehicle(&mut world, entity);
        assert!(!world.get::<&DockPorts>(section).map(|p| p.0[0].attached).unwrap_or(true));
        assert!(world.get::<&Vehicle>(entity).map(|v| v.docking.is_none()).unwrap_or(false));
    }

    #[test]
    fn falls_back_to_nearby_without_ports() {
        let mut world = World::new();
        let sid = spawn_station(&mut world, 1);
        spawn_section(&mut world, sid, 20.0, Vec::new());
        let config = EvacConfig::default();
        let (entity, outcome) = materialize_vehicle(&mut world, &config, sid, VehicleId(1));
        assert_eq!(outcome, ArrivalOutcome::NearbyUnlatched);
        let s = world.get::<&Structure>(entity).expect("hull");
        // 10 (station half width) + gap + 6 (vehicle half length)
        assert!((s.transform.position.x - (16.0 + config.nearby_offset)).abs() < 1e-9);
    }

    #[test]
    fn second_vehicle_cannot_take_occupied_port() {
        let mut world = World::new();
        let a = spawn_station(&mut world, 1);
        spawn_section(&mut world, a, 20.0, vec![DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST)]);
        let config = EvacConfig::default();
        let (_, first) = materialize_vehicle(&mut world, &config, a, VehicleId(1));
        let (_, second) = materialize_vehicle(&mut world, &config, a, VehicleId(2));
        assert_eq!(first, ArrivalOutcome::Docked);
        assert_eq!(second, ArrivalOutcome::NearbyUnlatched);
    }
}
