//! Evacuation tuning.
//!
//! All durations are seconds of simulation time. Every key is optional in
//! JSON; missing keys take their defaults.
//!
//! ```
//! use evac_logic::config::EvacConfig;
//!
//! let config = EvacConfig::from_json(r#"{ "required_authorizations": 2 }"#).unwrap();
//! assert_eq!(config.required_authorizations, 2);
//! assert_eq!(config.default_call_duration, 600.0);
//! ```

use crate::docking::{DockPort, PortTag};
use crate::geometry::{Aabb, Angle, Vec2};
use crate::rejection::ConfigError;
use serde::{Deserialize, Serialize};

/// Hull and ports of the vehicle sent to each station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleBlueprint {
    pub bounds: Aabb,
    pub ports: Vec<DockPort>,
}

impl Default for VehicleBlueprint {
    fn default() -> Self {
        Self {
            bounds: Aabb::centered(12.0, 6.0),
            ports: vec![
                DockPort::new(Vec2::new(-6.0, 0.0), Angle::WEST).with_tag(PortTag::Evacuation),
                DockPort::new(Vec2::new(6.0, 0.0), Angle::EAST),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvacConfig {
    /// When off, no vehicles are sent; the countdown still ends the round.
    pub enabled: bool,
    pub default_call_duration: f64,
    pub min_transit_time: f64,
    pub max_transit_time: f64,
    /// Hold time at the dock before launch.
    pub dock_timeout_buffer: f64,
    pub early_launch_grace_window: f64,
    /// Call/recall cooldown.
    pub launch_cooldown_duration: f64,
    pub round_end_buffer_duration: f64,
    pub restart_duration: f64,
    pub round_end_cooldown_duration: f64,
    pub required_authorizations: u32,
    pub departure_stagger_step: f64,
    pub max_departure_stagger: f64,
    /// Clearance for the nearby-unlatched fallback.
    pub nearby_offset: f64,
    pub dock_epsilon: f64,
    pub auto_call_time: Option<f64>,
    pub auto_call_extension: f64,
    pub rng_seed: Option<u64>,
    pub vehicle: VehicleBlueprint,
}

impl Default for EvacConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_call_duration: 600.0,
            min_transit_time: 120.0,
            max_transit_time: 180.0,
            dock_timeout_buffer: 180.0,
            early_launch_grace_window: 10.0,
            launch_cooldown_duration: 30.0,
            round_end_buffer_duration: 60.0,
            restart_duration: 30.0,
            round_end_cooldown_duration: 5.0,
            required_authorizations: 3,
            departure_stagger_step: 1.0,
            max_departure_stagger: 3.0,
            nearby_offset: 150.0,
            dock_epsilon: 0.05,
            auto_call_time: None,
            auto_call_extension: 3600.0,
            rng_seed: None,
            vehicle: VehicleBlueprint::default(),
        }
    }
}

impl EvacConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("default_call_duration", self.default_call_duration),
            ("min_transit_time", self.min_transit_time),
            ("max_transit_time", self.max_transit_time),
            ("dock_timeout_buffer", self.dock_timeout_buffer),
            ("early_launch_grace_window", self.early_launch_grace_window),
            ("launch_cooldown_duration", self.launch_cooldown_duration),
            ("round_end_buffer_duration", self.round_end_buffer_duration),
            ("restart_duration", self.restart_duration),
            ("round_end_cooldown_duration", self.round_end_cooldown_duration),
            ("departure_stagger_step", self.departure_stagger_step),
            ("max_departure_stagger", self.max_departure_stagger),
            ("nearby_offset", self.nearby_offset),
            ("dock_epsilon", self.dock_epsilon),
            ("auto_call_extension", self.auto_call_extension),
            ("auto_call_time", self.auto_call_time.unwrap_or(0.0)),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
        }
        if self.min_transit_time > self.max_transit_time {
            return Err(ConfigError::TransitRange {
                min: self.min_transit_time,
                max: self.max_transit_time,
            });
        }
        if self.required_authorizations == 0 {
            return Err(ConfigError::ZeroQuorum);
        }
        Ok(())
    }
}
