//! Component definitions for the ECS world.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems and the coordinator.

mod structure;
mod vehicle;

pub use structure::*;
pub use vehicle::*;
