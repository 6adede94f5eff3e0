//! Combat engine tuning.
//!
//! Values that are not part of any single attack: the failsafe margin, the
//! event channel size and the tolerance used for timer comparisons.
//! Configuration can be loaded from and saved to a TOML file.

use std::fs;
use std::io;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "vanguard.toml";

/// Engine-wide combat parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Extra seconds past the nominal attack length before the failsafe fires.
    pub safety_margin: f32,
    /// Capacity of the combat event channel.
    pub event_capacity: usize,
    /// Tolerance for timer comparisons (seconds).
    pub time_epsilon: f32,
    /// Facing used before an entity has ever attacked in a direction.
    pub default_direction: Vec2,
    /// Hurtbox radius for targets that do not specify one.
    pub default_hurt_radius: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            safety_margin: 0.5,
            event_capacity: 1024,
            time_epsilon: 1e-4,
            default_direction: Vec2::X,
            default_hurt_radius: 0.25,
        }
    }
}

impl CombatConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Combat config not found at {}, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read combat config: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded combat config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse combat config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved combat config to {}", path.display());
        Ok(())
    }

    /// Clamp values to sensible ranges.
    pub fn validate(&mut self) {
        if !self.safety_margin.is_finite() {
            self.safety_margin = Self::default().safety_margin;
        }
        self.safety_margin = self.safety_margin.clamp(0.0, 10.0);
        self.event_capacity = self.event_capacity.clamp(16, 1 << 16);
        if !self.time_epsilon.is_finite() {
            self.time_epsilon = Self::default().time_epsilon;
        }
        self.time_epsilon = self.time_epsilon.clamp(0.0, 0.01);
        self.default_direction = self.default_direction.try_normalize().unwrap_or(Vec2::X);
        if !self.default_hurt_radius.is_finite() {
            self.default_hurt_radius = Self::default().default_hurt_radius;
        }
        self.default_hurt_radius = self.default_hurt_radius.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CombatConfig::default();
        assert!((config.safety_margin - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.default_direction, Vec2::X);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CombatConfig {
            safety_margin: -1.0,
            event_capacity: 0,
            time_epsilon: f32::NAN,
            default_direction: Vec2::new(0.0, 3.0),
            default_hurt_radius: -2.0,
        };
        config.validate();

        assert_eq!(config.safety_margin, 0.0);
        assert_eq!(config.event_capacity, 16);
        assert!((config.time_epsilon - 1e-4).abs() < f32::EPSILON);
        assert_eq!(config.default_direction, Vec2::Y);
        assert_eq!(config.default_hurt_radius, 0.0);
    }

    #[test]
    fn test_zero_direction_falls_back() {
        let mut config = CombatConfig {
            default_direction: Vec2::ZERO,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.default_direction, Vec2::X);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("combat.toml");

        let config = CombatConfig {
            safety_margin: 1.25,
            event_capacity: 64,
            ..Default::default()
        };
        config.save_to(&path).expect("Failed to save config");

        let loaded = CombatConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = CombatConfig::load_from("/nonexistent/path/vanguard.toml");
        assert_eq!(config, CombatConfig::default());
    }

    #[test]
    fn test_config_load_partial_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "safety_margin = 2.0\n").expect("write");

        let loaded = CombatConfig::load_from(&path);
        assert!((loaded.safety_margin - 2.0).abs() < f32::EPSILON);
        assert_eq!(loaded.event_capacity, 1024);
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "safety_margin = \"soon\"\n").expect("write");

        assert_eq!(CombatConfig::load_from(&path), CombatConfig::default());
    }
}
