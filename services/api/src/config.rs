//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use clinic_scheduling_core::{AvailabilityConfig, EngineConfig};
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_allowed_origin: String,
    /// Appointment durations must be positive multiples of this step.
    pub slot_granularity_minutes: u32,
    /// Candidate step used by the free-slots endpoint when the caller
    /// does not supply one.
    pub default_slot_step_minutes: u32,
    pub min_availability_minutes: u32,
    pub max_appointment_minutes: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin = std::env::var("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Scheduling Settings ---
        let slot_granularity_minutes = minutes_var("SLOT_GRANULARITY_MINUTES", 5)?;
        let default_slot_step_minutes = minutes_var("DEFAULT_SLOT_STEP_MINUTES", 15)?;
        let min_availability_minutes = minutes_var("MIN_AVAILABILITY_MINUTES", 60)?;
        let max_appointment_minutes = minutes_var("MAX_APPOINTMENT_MINUTES", 480)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_allowed_origin,
            slot_granularity_minutes,
            default_slot_step_minutes,
            min_availability_minutes,
            max_appointment_minutes,
        })
    }

    /// The appointment validation tunables handed to the engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            granularity_minutes: self.slot_granularity_minutes,
            min_duration_minutes: self.slot_granularity_minutes,
            max_duration_minutes: self.max_appointment_minutes,
        }
    }

    /// The window validation tunables handed to the availability manager.
    pub fn availability_config(&self) -> AvailabilityConfig {
        AvailabilityConfig {
            min_window_minutes: self.min_availability_minutes,
        }
    }
}

/// Reads a positive minutes value, falling back to `default` when unset.
fn minutes_var(name: &str, default: u32) -> Result<u32, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(default);
    };
    let minutes = raw
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))?;
    if minutes == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be a positive number of minutes".to_string(),
        ));
    }
    Ok(minutes)
}
