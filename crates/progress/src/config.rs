//! Tunables for journey tracking.

use serde::{Deserialize, Serialize};

/// Configuration for the progress engine and ETA reporter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// A report this close to the destination counts as arrival (km)
    pub arrival_radius_km: f64,
    /// Assumed speed when no observed speed is available (km/h)
    pub cruising_speed_kmh: f64,
    /// Lower bound on the speed used for remaining-time estimates (km/h)
    pub min_speed_kmh: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            arrival_radius_km: 5.0,
            cruising_speed_kmh: 50.0,
            min_speed_kmh: 20.0,
        }
    }
}

/// A tracking setting outside its usable range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Speeds must be finite and strictly positive
    #[error("{name} must be a positive number of km/h, got {value}")]
    Speed {
        /// Setting name
        name: &'static str,
        /// Rejected value
        value: f64,
    },

    /// The arrival radius must be finite and not negative
    #[error("arrival_radius_km must be zero or more, got {0}")]
    ArrivalRadius(f64),
}

impl TrackingConfig {
    /// Check that every setting can drive the engine and the reporter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.arrival_radius_km.is_finite() || self.arrival_radius_km < 0.0 {
            return Err(ConfigError::ArrivalRadius(self.arrival_radius_km));
        }
        for (name, value) in [
            ("cruising_speed_kmh", self.cruising_speed_kmh),
            ("min_speed_kmh", self.min_speed_kmh),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Speed { name, value });
            }
        }
        Ok(())
    }
}
