//! Systems - logic that operates on components

mod departure;
mod docking;

pub use departure::*;
pub use docking::*;
