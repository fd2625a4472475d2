//! Simulation parameters.
//!
//! A [`SimulationConfig`] is a small `Copy` snapshot. The engine copies it
//! once per frame and hands the copy to every pass, so a config change never
//! lands halfway through a frame.
//!
//! # Example
//!
//! ```ignore
//! let config = SimulationConfig::default()
//!     .with_sensor_offset(25.0)
//!     .with_evaporation_speed(0.3)
//!     .with_species(SpeciesMode::Ternary);
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::ConfigError;
use crate::species::SpeciesMode;

/// Largest sensor radius; the sampled square is `(2 * size - 1)²` cells.
pub const MAX_SENSOR_SIZE: u32 = 16;

/// Largest sensor distance, in cells.
pub const MAX_SENSOR_OFFSET: f32 = 4096.0;

/// Largest turn rate, in radians per second.
pub const MAX_TURN_SPEED: f32 = 1000.0;

/// Largest agent speed, in cells per second.
pub const MAX_MOVE_SPEED: f32 = 10_000.0;

/// Agent and field parameters for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Distance from the agent to each sensor, in cells.
    pub sensor_offset: f32,
    /// Sensor radius in cells (1 = single cell).
    pub sensor_size: u32,
    /// Angle between the forward sensor and each side sensor (radians).
    pub sensor_angle_spacing: f32,
    /// Maximum turn rate (radians per second).
    pub turn_speed: f32,
    /// Fraction of trail removed per diffusion pass, in (0, 1).
    pub evaporation_speed: f32,
    /// Agent speed in cells per second.
    pub move_speed: f32,
    /// Deposit strength, in (0, 1].
    pub trail_weight: f32,
    /// Number of species sharing the field.
    pub species: SpeciesMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sensor_offset: 15.0,
            sensor_size: 1,
            sensor_angle_spacing: 0.2 * PI,
            turn_speed: 50.0,
            evaporation_speed: 0.5,
            move_speed: 60.0,
            trail_weight: 1.0,
            species: SpeciesMode::Mono,
        }
    }
}

impl SimulationConfig {
    /// Set the sensor distance (clamped to `[0, MAX_SENSOR_OFFSET]`).
    pub fn with_sensor_offset(mut self, offset: f32) -> Self {
        self.sensor_offset = offset.clamp(0.0, MAX_SENSOR_OFFSET);
        self
    }

    /// Set the sensor radius (clamped to `1..=MAX_SENSOR_SIZE`).
    pub fn with_sensor_size(mut self, size: u32) -> Self {
        self.sensor_size = size.clamp(1, MAX_SENSOR_SIZE);
        self
    }

    /// Set the side sensor angle (radians).
    pub fn with_sensor_angle_spacing(mut self, angle: f32) -> Self {
        self.sensor_angle_spacing = angle;
        self
    }

    /// Set the turn speed (clamped to `[0, MAX_TURN_SPEED]`).
    pub fn with_turn_speed(mut self, speed: f32) -> Self {
        self.turn_speed = speed.clamp(0.0, MAX_TURN_SPEED);
        self
    }

    /// Set the evaporation speed (clamped to `[0.001, 0.999]`).
    pub fn with_evaporation_speed(mut self, speed: f32) -> Self {
        self.evaporation_speed = speed.clamp(0.001, 0.999);
        self
    }

    /// Set the movement speed (clamped to `[0, MAX_MOVE_SPEED]`).
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed.clamp(0.0, MAX_MOVE_SPEED);
        self
    }

    /// Set the deposit weight (clamped to `[0.001, 1.0]`).
    pub fn with_trail_weight(mut self, weight: f32) -> Self {
        self.trail_weight = weight.clamp(0.001, 1.0);
        self
    }

    /// Set the species mode.
    pub fn with_species(mut self, species: SpeciesMode) -> Self {
        self.species = species;
        self
    }

    /// Check every parameter against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("sensor_offset", self.sensor_offset),
            ("sensor_angle_spacing", self.sensor_angle_spacing),
            ("turn_speed", self.turn_speed),
            ("evaporation_speed", self.evaporation_speed),
            ("move_speed", self.move_speed),
            ("trail_weight", self.trail_weight),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite { name });
        }

        check_range("sensor_offset", self.sensor_offset, 0.0, MAX_SENSOR_OFFSET)?;
        check_range(
            "sensor_size",
            self.sensor_size as f32,
            1.0,
            MAX_SENSOR_SIZE as f32,
        )?;
        check_range("turn_speed", self.turn_speed, 0.0, MAX_TURN_SPEED)?;
        check_range("move_speed", self.move_speed, 0.0, MAX_MOVE_SPEED)?;
        if self.evaporation_speed <= 0.0 || self.evaporation_speed >= 1.0 {
            return Err(ConfigError::OutOfRange {
                name: "evaporation_speed",
                value: self.evaporation_speed,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.trail_weight <= 0.0 || self.trail_weight > 1.0 {
            return Err(ConfigError::OutOfRange {
                name: "trail_weight",
                value: self.trail_weight,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }

    /// Per-pass decay multiplier, floored so the trail never vanishes in one pass.
    #[inline]
    pub fn decay_factor(&self) -> f32 {
        (1.0 - self.evaporation_speed).max(0.01)
    }

    /// Parse a JSON config; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value < min || value > max {
        Err(ConfigError::OutOfRange { name, value, min, max })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sensor_size, 1);
        assert!((config.sensor_angle_spacing - 0.2 * PI).abs() < 1e-6);
    }

    #[test]
    fn test_builder_clamps() {
        let config = SimulationConfig::default()
            .with_evaporation_speed(1.5)
            .with_trail_weight(7.0)
            .with_sensor_size(0)
            .with_move_speed(-3.0);
        assert!((config.evaporation_speed - 0.999).abs() < 1e-6);
        assert_eq!(config.trail_weight, 1.0);
        assert_eq!(config.sensor_size, 1);
        assert_eq!(config.move_speed, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_evaporation_bounds() {
        for bad in [0.0, 1.0, -0.2, 3.0] {
            let config = SimulationConfig {
                evaporation_speed: bad,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::OutOfRange { name: "evaporation_speed", .. })
            ));
        }
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let config = SimulationConfig {
            move_speed: f32::NAN,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonFinite { name: "move_speed" })
        );
    }

    #[test]
    fn test_validate_rejects_unbounded_speeds() {
        let config = SimulationConfig {
            sensor_offset: 1.0e30,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "sensor_offset", .. })
        ));
        let config = SimulationConfig {
            move_speed: MAX_MOVE_SPEED * 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = SimulationConfig {
            turn_speed: f32::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_clamps_upper_bounds() {
        let config = SimulationConfig::default()
            .with_sensor_offset(1.0e30)
            .with_turn_speed(f32::MAX)
            .with_move_speed(1.0e12);
        assert_eq!(config.sensor_offset, MAX_SENSOR_OFFSET);
        assert_eq!(config.turn_speed, MAX_TURN_SPEED);
        assert_eq!(config.move_speed, MAX_MOVE_SPEED);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_sensor_size() {
        let config = SimulationConfig {
            sensor_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_decay_factor_floor() {
        let config = SimulationConfig::default().with_evaporation_speed(0.999);
        assert!((config.decay_factor() - 0.01).abs() < 1e-6);
        let config = SimulationConfig::default();
        assert!((config.decay_factor() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_json_partial_config() {
        let config = SimulationConfig::from_json(r#"{ "turn_speed": 10.0, "species": 3 }"#).unwrap();
        assert_eq!(config.turn_speed, 10.0);
        assert_eq!(config.species, SpeciesMode::Ternary);
        assert_eq!(config.move_speed, 60.0);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig::default().with_species(SpeciesMode::Binary);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }
}
