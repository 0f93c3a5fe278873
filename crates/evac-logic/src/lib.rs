//! Pure evacuation logic.
//!
//! Everything here is plain data and functions: no ECS world, no clock
//! other than the one callers advance, no I/O. The engine crate wires these
//! pieces into the tick loop.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`authorization`] | Per-vehicle early-launch quorum with trigger latch |
//! | [`config`] | Tuning values and vehicle blueprint, loaded from JSON |
//! | [`docking`] | Port-to-port placement and overlap rejection |
//! | [`events`] | Events broadcast to presentation layers |
//! | [`geometry`] | Vectors, angles, rigid transforms, boxes, SAT overlap |
//! | [`ids`] | Vehicle, station and crew identities |
//! | [`phase`] | Coordinator and round phases, legal transitions |
//! | [`rejection`] | Command rejection codes and config errors |
//! | [`scheduler`] | Per-purpose cancellable timers, dispatched in stage order |

pub mod authorization;
pub mod config;
pub mod docking;
pub mod events;
pub mod geometry;
pub mod ids;
pub mod phase;
pub mod rejection;
pub mod scheduler;
