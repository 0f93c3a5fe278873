//! Property tests for the pure evacuation logic.
//!
//! Authorization idempotence and latching, docking never producing an
//! overlapping placement, and timer supersession.

use evac_logic::authorization::AuthorizationTracker;
use evac_logic::docking::{compute_docking, DockPort, DockingBody, DockingOutcome, InvalidDocking};
use evac_logic::geometry::{Aabb, Angle, OrientedBox, Transform2, Vec2};
use evac_logic::ids::{AuthorizerId, VehicleId};
use evac_logic::scheduler::{Purpose, TransitScheduler};
use proptest::prelude::*;

const V: VehicleId = VehicleId(1);

fn cardinal() -> impl Strategy<Value = Angle> {
    prop_oneof![
        Just(Angle::EAST),
        Just(Angle::NORTH),
        Just(Angle::WEST),
        Just(Angle::SOUTH)
    ]
}

fn obstacle() -> impl Strategy<Value = OrientedBox> {
    (-60.0..60.0f64, -60.0..60.0f64, 1.0..30.0f64, 1.0..30.0f64).prop_map(|(x, y, w, h)| {
        Aabb::centered(w, h).transformed(&Transform2::at(x, y))
    })
}

proptest! {
    #[test]
    fn repeated_authorization_counts_once(
        quorum in 1u32..8,
        ids in prop::collection::vec(0u64..6, 1..20)
    ) {
        let mut tracker = AuthorizationTracker::new(quorum);
        tracker.register(V);
        let mut distinct = std::collections::BTreeSet::new();
        for id in ids {
            let first_time = distinct.insert(id);
            let before = tracker.remaining(V);
            let outcome = tracker.authorize(V, AuthorizerId(id)).expect("registered");
            prop_assert_eq!(outcome.counted, first_time);
            if !first_time {
                prop_assert_eq!(Some(outcome.remaining), before);
            }
        }
        let expected = quorum.saturating_sub(distinct.len() as u32);
        prop_assert_eq!(tracker.remaining(V), Some(expected));
    }

    #[test]
    fn trigger_never_unlatches(
        quorum in 1u32..5,
        ops in prop::collection::vec((any::<bool>(), 0u64..6), 1..40)
    ) {
        let mut tracker = AuthorizationTracker::new(quorum);
        tracker.register(V);
        let mut latched = false;
        for (authorize, id) in ops {
            if authorize {
                tracker.authorize(V, AuthorizerId(id));
            } else if id == 0 {
                tracker.repeal_all(V);
            } else {
                tracker.repeal(V, AuthorizerId(id));
            }
            if latched {
                prop_assert!(tracker.is_triggered(V));
                prop_assert_eq!(tracker.remaining(V), Some(0));
            }
            latched = tracker.is_triggered(V);
        }
    }

    #[test]
    fn valid_docking_never_overlaps(
        facing in cardinal(),
        target_facing in cardinal(),
        obstacles in prop::collection::vec(obstacle(), 0..6)
    ) {
        let vehicle = DockingBody::anchored(Transform2::IDENTITY, Aabb::centered(12.0, 6.0));
        let target = DockingBody::anchored(Transform2::IDENTITY, Aabb::centered(20.0, 20.0));
        let vehicle_port = DockPort::new(Vec2::new(-6.0, 0.0), facing);
        let target_port = DockPort::new(Vec2::new(10.0, 0.0), target_facing);
        let mut occupied = vec![target.footprint()];
        occupied.extend(obstacles);

        let epsilon = 0.05;
        if let DockingOutcome::Valid(placement) =
            compute_docking(&vehicle, &vehicle_port, &target, &target_port, &occupied, epsilon)
        {
            let hull = vehicle.bounds.shrunk(epsilon).transformed(&placement.transform);
            for o in &occupied {
                prop_assert!(!hull.overlaps(o));
            }
        }
    }

    #[test]
    fn obstacle_on_placement_invalidates_docking(
        dx in -2.0..2.0f64,
        dy in -1.0..1.0f64,
        size in 2.0..8.0f64
    ) {
        let vehicle = DockingBody::anchored(Transform2::IDENTITY, Aabb::centered(12.0, 6.0));
        let target = DockingBody::anchored(Transform2::IDENTITY, Aabb::centered(20.0, 20.0));
        let vehicle_port = DockPort::new(Vec2::new(-6.0, 0.0), Angle::WEST);
        let target_port = DockPort::new(Vec2::new(10.0, 0.0), Angle::EAST);
        let clear = [target.footprint()];
        let placement = compute_docking(&vehicle, &vehicle_port, &target, &target_port, &clear, 0.05)
            .placement()
            .expect("open port docks");

        let centre = placement.transform.position;
        let blocker = Aabb::centered(size, size)
            .transformed(&Transform2::at(centre.x + dx, centre.y + dy));
        let outcome = compute_docking(
            &vehicle,
            &vehicle_port,
            &target,
            &target_port,
            &[target.footprint(), blocker],
            0.05,
        );
        prop_assert_eq!(outcome, DockingOutcome::Invalid(InvalidDocking::Overlap));
    }

    #[test]
    fn rearming_supersedes(first in 0.5..50.0f64, second in 0.5..50.0f64) {
        let mut sched = TransitScheduler::new();
        sched.arm(Purpose::Launch, first);
        sched.arm(Purpose::Launch, second);

        let mut fired = Vec::new();
        for _ in 0..120 {
            fired.extend(sched.advance(0.5));
        }
        prop_assert_eq!(fired.len(), 1);
        prop_assert_eq!(fired[0].duration, second);
    }
}
