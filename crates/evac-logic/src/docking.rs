//! Docking placement.
//!
//! Given a free port on a vehicle and a free port on a stationary target,
//! work out where the vehicle must sit for the two ports to mate, and
//! reject the placement if the vehicle would intersect anything already
//! occupying that space.
//!
//! ```
//! use evac_logic::docking::{compute_docking, DockPort, DockingBody, DockingOutcome};
//! use evac_logic::geometry::{Aabb, Angle, Transform2, Vec2};
//!
//! let station = DockingBody::anchored(Transform2::IDENTITY, Aabb::centered(20.0, 20.0));
//! let station_port = DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST);
//! let vehicle = DockingBody::anchored(Transform2::at(500.0, 0.0), Aabb::centered(8.0, 4.0));
//! let vehicle_port = DockPort::new(Vec2::new(-4.0, 0.0), Angle::WEST);
//!
//! let occupied = [station.footprint()];
//! match compute_docking(&vehicle, &vehicle_port, &station, &station_port, &occupied, 0.05) {
//!     DockingOutcome::Valid(p) => assert!((p.transform.position.x - 14.0).abs() < 1e-9),
//!     DockingOutcome::Invalid(reason) => panic!("unexpected {reason:?}"),
//! }
//! ```

use crate::geometry::{Aabb, Angle, OrientedBox, Transform2, Vec2};
use serde::{Deserialize, Serialize};

/// Visual/priority tag used to order candidate ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortTag {
    /// Ports reserved for evacuation vehicles. Tried first.
    Evacuation,
    /// Any other airlock.
    Standard,
}

/// An attachment point on a structure, in that structure's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DockPort {
    pub local_position: Vec2,
    /// Outward-facing direction of the port.
    pub facing: Angle,
    #[serde(default)]
    pub attached: bool,
    #[serde(default = "default_tag")]
    pub tag: PortTag,
}

fn default_tag() -> PortTag {
    PortTag::Standard
}

impl DockPort {
    pub fn new(local_position: Vec2, facing: Angle) -> Self {
        Self {
            local_position,
            facing,
            attached: false,
            tag: PortTag::Standard,
        }
    }

    pub fn with_tag(mut self, tag: PortTag) -> Self {
        self.tag = tag;
        self
    }
}

/// The parts of a structure the planner needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockingBody {
    pub transform: Transform2,
    /// Hull bounds in the structure's local frame.
    pub bounds: Aabb,
    pub anchored: bool,
}

impl DockingBody {
    pub fn anchored(transform: Transform2, bounds: Aabb) -> Self {
        Self {
            transform,
            bounds,
            anchored: true,
        }
    }

    /// World-space hull.
    pub fn footprint(&self) -> OrientedBox {
        self.bounds.transformed(&self.transform)
    }
}

/// Where a vehicle ends up when a pair of ports mates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Vehicle-local to world.
    pub transform: Transform2,
    /// World rotation of the vehicle, normalized.
    pub world_rotation: Angle,
}

/// Why a proposed dock was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidDocking {
    PortAttached,
    NotAnchored,
    /// A port faces off-axis relative to its own structure.
    MisalignedPort,
    /// The placed vehicle would intersect occupied space.
    Overlap,
}

/// Tagged result of a single docking computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DockingOutcome {
    Valid(Placement),
    Invalid(InvalidDocking),
}

impl DockingOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn placement(&self) -> Option<Placement> {
        match self {
            Self::Valid(p) => Some(*p),
            Self::Invalid(_) => None,
        }
    }
}

/// The chosen port pair and the resulting placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockingConfig {
    /// Index into the vehicle's port list.
    pub vehicle_port: usize,
    /// Index into the target's port list.
    pub target_port: usize,
    pub placement: Placement,
}

/// Compute the placement that mates `vehicle_port` with `target_port`.
///
/// The target port anchors the solution: the vehicle is rotated so its
/// port faces opposite the target port, then translated so the port
/// centers coincide. The vehicle hull, shrunk by `epsilon`, must not
/// overlap any of `occupied`; include the target's own footprint there.
pub fn compute_docking(
    vehicle: &DockingBody,
    vehicle_port: &DockPort,
    target: &DockingBody,
    target_port: &DockPort,
    occupied: &[OrientedBox],
    epsilon: f64,
) -> DockingOutcome {
    if vehicle_port.attached || target_port.attached {
        return DockingOutcome::Invalid(InvalidDocking::PortAttached);
    }
    if !vehicle.anchored || !target.anchored {
        return DockingOutcome::Invalid(InvalidDocking::NotAnchored);
    }
    if !vehicle_port.facing.is_cardinal() || !target_port.facing.is_cardinal() {
        return DockingOutcome::Invalid(InvalidDocking::MisalignedPort);
    }

    let target_port_world = target
        .transform
        .compose(&Transform2::new(target_port.local_position, target_port.facing));
    let mating_frame = Transform2::new(
        target_port_world.position,
        target_port_world.rotation.flipped(),
    );
    let vehicle_port_local = Transform2::new(vehicle_port.local_position, vehicle_port.facing);
    let transform = mating_frame.compose(&vehicle_port_local.inverse());

    let hull = vehicle.bounds.shrunk(epsilon).transformed(&transform);
    if occupied.iter().any(|o| hull.overlaps(o)) {
        return DockingOutcome::Invalid(InvalidDocking::Overlap);
    }

    DockingOutcome::Valid(Placement {
        transform,
        world_rotation: transform.rotation.normalized(),
    })
}

/// Port indices ordered by tag priority, keeping registration order
/// within a tag. Attached ports are skipped.
pub fn candidate_ports(ports: &[DockPort]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ports.len()).filter(|&i| !ports[i].attached).collect();
    order.sort_by_key(|&i| ports[i].tag);
    order
}

/// Try every free port pair and return the first valid one.
///
/// First found, not nearest: callers accept any valid result.
pub fn plan_docking(
    vehicle: &DockingBody,
    vehicle_ports: &[DockPort],
    target: &DockingBody,
    target_ports: &[DockPort],
    occupied: &[OrientedBox],
    epsilon: f64,
) -> Option<DockingConfig> {
    let vehicle_order = candidate_ports(vehicle_ports);
    for target_idx in candidate_ports(target_ports) {
        for &vehicle_idx in &vehicle_order {
            let outcome = compute_docking(
                vehicle,
                &vehicle_ports[vehicle_idx],
                target,
                &target_ports[target_idx],
                occupied,
                epsilon,
            );
            if let DockingOutcome::Valid(placement) = outcome {
                return Some(DockingConfig {
                    vehicle_port: vehicle_idx,
                    target_port: target_idx,
                    placement,
                });
            }
        }
    }
    None
}

/// Fallback placement beside `anchor` when no dock is possible.
///
/// The vehicle is put on the anchor's +X side, clear of its hull by `gap`.
pub fn nearby_placement(
    anchor: Option<&DockingBody>,
    vehicle_bounds: &Aabb,
    gap: f64,
) -> Transform2 {
    let vehicle_half = vehicle_bounds.width().max(vehicle_bounds.height()) / 2.0;
    match anchor {
        Some(body) => {
            let world = body.footprint().bounds();
            let center = world.center();
            Transform2::new(
                Vec2::new(world.max.x + gap + vehicle_half, center.y),
                Angle::ZERO,
            )
        }
        None => Transform2::new(Vec2::new(gap + vehicle_half, 0.0), Angle::ZERO),
    }
}
