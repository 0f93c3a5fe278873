//! Departure system - staggered launch and transit bookkeeping

use super::docking::undock_vehicle;
use crate::components::{TransitState, Vehicle};
use hecs::{Entity, World};
use rand::Rng;

/// Per-vehicle departure delays: starts at zero, never decreases, and
/// never exceeds `max_total`.
///
/// Each vehicle leaves a random `0..=step` after the previous one. When the
/// fleet is too large for that to fit under `max_total`, the whole sequence
/// is scaled down so the gaps shrink instead of piling up at the cap.
pub fn stagger_offsets<R: Rng>(count: usize, step: f64, max_total: f64, rng: &mut R) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(count);
    let mut delay: f64 = 0.0;
    for _ in 0..count {
        offsets.push(delay);
        if step > 0.0 {
            delay += rng.gen_range(0.0..=step);
        }
    }

    let total = offsets.last().copied().unwrap_or(0.0);
    if total > max_total {
        let scale = max_total.max(0.0) / total;
        for offset in &mut offsets {
            *offset *= scale;
        }
    }
    offsets
}

pub fn set_state(world: &mut World, entity: Entity, state: TransitState) {
    if let Ok(mut v) = world.get::<&mut Vehicle>(entity) {
        v.state = state;
    }
}

/// Unlatch a vehicle and mark it in transit
pub fn begin_transit(world: &mut World, entity: Entity) -> bool {
    undock_vehicle(world, entity);
    match world.get::<&mut Vehicle>(entity) {
        Ok(mut v) => {
            v.state = TransitState::InTransit;
            true
        }
        Err(_) => false,
    }
}

/// Flag a vehicle as having reached the safe zone. Returns `false` if it
/// had already arrived.
pub fn mark_arrived(world: &mut World, entity: Entity) -> bool {
    match world.get::<&mut Vehicle>(entity) {
        Ok(mut v) if !v.arrived => {
            v.arrived = true;
            v.state = TransitState::Arrived;
            true
        }
        _ => false,
    }
}

/// Unlatch and remove vehicles
pub fn despawn_vehicles(world: &mut World, entities: impl IntoIterator<Item = Entity>) {
    for entity in entities {
        undock_vehicle(world, entity);
        let _ = world.despawn(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evac_logic::ids::{StationId, VehicleId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stagger_is_monotonic_and_capped() {
        let mut rng = StdRng::seed_from_u64(9);
        let offsets = stagger_offsets(20, 1.0, 3.0, &mut rng);
        assert_eq!(offsets.len(), 20);
        assert_eq!(offsets[0], 0.0);
        for pair in offsets.windows(2) {
            assert!(pair[0] <= pair[1], "offsets must not decrease: {offsets:?}");
        }
        assert!(offsets.iter().all(|&o| o <= 3.0 + 1e-9));
    }

    #[test]
    fn large_fleet_is_spread_under_the_cap() {
        let mut rng = StdRng::seed_from_u64(9);
        let offsets = stagger_offsets(20, 1.0, 3.0, &mut rng);
        for pair in offsets.windows(2) {
            assert!(pair[0] < pair[1], "no two vehicles leave together: {offsets:?}");
        }
        assert!(offsets[19] <= 3.0 + 1e-9);
    }

    #[test]
    fn small_fleet_keeps_raw_steps() {
        let mut rng = StdRng::seed_from_u64(4);
        let offsets = stagger_offsets(2, 1.0, 3.0, &mut rng);
        assert_eq!(offsets[0], 0.0);
        assert!(offsets[1] <= 1.0);
    }

    #[test]
    fn zero_step_launches_together() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(stagger_offsets(3, 0.0, 3.0, &mut rng), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn arrival_is_flagged_once() {
        let mut world = World::new();
        let e = world.spawn((Vehicle::new(VehicleId(1), StationId(1)),));
        assert!(begin_transit(&mut world, e));
        assert!(mark_arrived(&mut world, e));
        assert!(!mark_arrived(&mut world, e));
        let v = world.get::<&Vehicle>(e).expect("vehicle");
        assert_eq!(v.state, TransitState::Arrived);
    }
}
