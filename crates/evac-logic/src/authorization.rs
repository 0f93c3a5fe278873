//! Early-launch authorization tracking.
//!
//! Each vehicle collects distinct crew authorizations. Once the quorum is
//! met the vehicle latches "triggered" for the rest of the round: repeals
//! still shrink the set (so the count stays truthful) but never clear the
//! latch. Only [`AuthorizationTracker::reset`] does.

use crate::ids::{AuthorizerId, VehicleId};
use std::collections::{BTreeMap, BTreeSet};

/// Per-vehicle authorization state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationSet {
    pub authorizers: BTreeSet<AuthorizerId>,
    pub quorum: u32,
    pub triggered: bool,
}

impl AuthorizationSet {
    pub fn new(quorum: u32) -> Self {
        Self {
            authorizers: BTreeSet::new(),
            quorum: quorum.max(1),
            triggered: false,
        }
    }

    /// Authorizations still needed, zero once triggered.
    pub fn remaining(&self) -> u32 {
        if self.triggered {
            return 0;
        }
        let have = u32::try_from(self.authorizers.len()).unwrap_or(u32::MAX);
        self.quorum.saturating_sub(have)
    }
}

/// Result of an [`AuthorizationTracker::authorize`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizeOutcome {
    pub remaining: u32,
    /// `false` when the identity had already authorized.
    pub counted: bool,
    /// `true` only on the call that reached quorum.
    pub newly_triggered: bool,
}

/// Result of an [`AuthorizationTracker::repeal`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepealOutcome {
    pub remaining: u32,
    /// `false` when the identity was not in the set.
    pub removed: bool,
}

/// Authorization sets for every vehicle in the round.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationTracker {
    sets: BTreeMap<VehicleId, AuthorizationSet>,
    quorum: u32,
}

impl AuthorizationTracker {
    pub fn new(quorum: u32) -> Self {
        Self {
            sets: BTreeMap::new(),
            quorum: quorum.max(1),
        }
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    /// Start tracking `vehicle` with an empty set.
    pub fn register(&mut self, vehicle: VehicleId) {
        let quorum = self.quorum;
        self.sets
            .entry(vehicle)
            .or_insert_with(|| AuthorizationSet::new(quorum));
    }

    pub fn is_registered(&self, vehicle: VehicleId) -> bool {
        self.sets.contains_key(&vehicle)
    }

    pub fn get(&self, vehicle: VehicleId) -> Option<&AuthorizationSet> {
        self.sets.get(&vehicle)
    }

    /// Add `identity` to the vehicle's set. Repeated calls for the same
    /// identity do not count twice. Returns `None` for unknown vehicles.
    pub fn authorize(&mut self, vehicle: VehicleId, identity: AuthorizerId) -> Option<AuthorizeOutcome> {
        let set = self.sets.get_mut(&vehicle)?;
        let counted = set.authorizers.insert(identity);
        let newly_triggered = if !set.triggered && set.remaining() == 0 {
            set.triggered = true;
            true
        } else {
            false
        };
        Some(AuthorizeOutcome {
            remaining: set.remaining(),
            counted,
            newly_triggered,
        })
    }

    /// Remove `identity` from the vehicle's set. Does not clear a trigger.
    pub fn repeal(&mut self, vehicle: VehicleId, identity: AuthorizerId) -> Option<RepealOutcome> {
        let set = self.sets.get_mut(&vehicle)?;
        let removed = set.authorizers.remove(&identity);
        Some(RepealOutcome {
            remaining: set.remaining(),
            removed,
        })
    }

    /// Empty the vehicle's set. Does not clear a trigger.
    pub fn repeal_all(&mut self, vehicle: VehicleId) -> Option<u32> {
        let set = self.sets.get_mut(&vehicle)?;
        set.authorizers.clear();
        Some(set.remaining())
    }

    pub fn is_triggered(&self, vehicle: VehicleId) -> bool {
        self.sets.get(&vehicle).is_some_and(|s| s.triggered)
    }

    pub fn remaining(&self, vehicle: VehicleId) -> Option<u32> {
        self.sets.get(&vehicle).map(AuthorizationSet::remaining)
    }

    /// Whether any vehicle has reached quorum.
    pub fn any_triggered(&self) -> bool {
        self.sets.values().any(|s| s.triggered)
    }

    /// Forget every vehicle. Called at round boundaries.
    pub fn reset(&mut self) {
        self.sets.clear();
    }

    /// Change the quorum for vehicles registered from now on.
    pub fn set_quorum(&mut self, quorum: u32) {
        self.quorum = quorum.max(1);
    }
}
