//! Map structure components: Station, Structure, DockPorts.

use evac_logic::docking::{DockPort, DockingBody};
use evac_logic::geometry::{Aabb, OrientedBox, Transform2};
use evac_logic::ids::StationId;
use serde::{Deserialize, Serialize};

/// Station component - a named group of structures a vehicle is sent to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
}

/// Structure component - a rigid hull on the map (station section or vehicle)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    /// Local-to-world placement
    pub transform: Transform2,
    /// Hull bounds in local space
    pub bounds: Aabb,
    pub anchored: bool,
}

impl Structure {
    pub fn new(name: impl Into<String>, bounds: Aabb) -> Self {
        Self {
            name: name.into(),
            transform: Transform2::IDENTITY,
            bounds,
            anchored: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform2) -> Self {
        self.transform = transform;
        self
    }

    pub fn unanchored(mut self) -> Self {
        self.anchored = false;
        self
    }

    pub fn area(&self) -> f64 {
        self.bounds.area()
    }

    pub fn docking_body(&self) -> DockingBody {
        DockingBody {
            transform: self.transform,
            bounds: self.bounds,
            anchored: self.anchored,
        }
    }

    /// World-space hull
    pub fn footprint(&self) -> OrientedBox {
        self.bounds.transformed(&self.transform)
    }
}

/// Dock ports owned by a structure, in the structure's local frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockPorts(pub Vec<DockPort>);

impl DockPorts {
    pub fn has_free_port(&self) -> bool {
        self.0.iter().any(|p| !p.attached)
    }

    pub fn set_attached(&mut self, index: usize, attached: bool) {
        if let Some(port) = self.0.get_mut(index) {
            port.attached = attached;
        }
    }
}

/// Marks a structure as part of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationMember(pub StationId);
