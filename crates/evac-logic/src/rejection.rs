//! Command rejections and configuration errors.
//!
//! A rejection is a valid request made at the wrong time. It is returned,
//! never panicked, and carries a stable reason code for consoles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("the command is on cooldown")]
    CooldownActive,
    #[error("an evacuation has already been requested")]
    AlreadyRequested,
    #[error("no evacuation is awaiting arrival")]
    NotInRequestedState,
    #[error("not permitted")]
    NotPermitted,
    #[error("already authorized")]
    AlreadyAuthorized,
    #[error("not found")]
    NotFound,
    #[error("the round has already ended")]
    RoundAlreadyEnded,
}

impl Rejection {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CooldownActive => "cooldown_active",
            Self::AlreadyRequested => "already_requested",
            Self::NotInRequestedState => "not_in_requested_state",
            Self::NotPermitted => "not_permitted",
            Self::AlreadyAuthorized => "already_authorized",
            Self::NotFound => "not_found",
            Self::RoundAlreadyEnded => "round_already_ended",
        }
    }
}

/// Errors loading or validating [`crate::config::EvacConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be non-negative and finite, got {value}")]
    InvalidDuration { field: &'static str, value: f64 },
    #[error("min_transit_time ({min}) exceeds max_transit_time ({max})")]
    TransitRange { min: f64, max: f64 },
    #[error("required_authorizations must be at least 1")]
    ZeroQuorum,
}
