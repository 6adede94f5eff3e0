//! Simulator configuration.
//!
//! Provides the duel script parameters plus the combat engine tuning under
//! a `[combat]` table. Configuration can be loaded from and saved to a file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use vanguard_combat::{CombatConfig, DEFAULT_ATTACK_PATH};

/// Configuration file name.
pub const CONFIG_FILE: &str = "vanguard.toml";

/// Simulator configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Run Settings ===
    /// Simulated seconds before the duel is called a draw
    pub duration: f32,
    /// Fixed simulation step (seconds)
    pub fixed_dt: f32,
    /// Largest frame delta fed to the accumulator
    pub max_frame_dt: f32,
    /// Random frame delta variation, as a fraction of `fixed_dt`
    pub frame_jitter: f32,
    /// Seed for frame jitter and mitigation rolls
    pub seed: u64,

    // === Script Settings ===
    /// Directory holding attack definition files
    pub attacks_path: PathBuf,
    /// Attack used by the player
    pub player_attack: String,
    /// Attack used by the enemy
    pub enemy_attack: String,
    /// Enemy walk speed (units per second)
    pub enemy_speed: f32,
    /// Chance for the player to crit
    pub crit_chance: f32,
    /// Chance for the player to evade an enemy hit
    pub evade_chance: f32,
    /// Skip the enemy's animation-complete callback so the failsafe recovers it
    pub drop_completion_signals: bool,

    // === Engine ===
    /// Combat engine tuning
    pub combat: CombatConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            // Run
            duration: 20.0,
            fixed_dt: 1.0 / 60.0,
            max_frame_dt: 0.25,
            frame_jitter: 0.5,
            seed: 42,

            // Script
            attacks_path: PathBuf::from(DEFAULT_ATTACK_PATH),
            player_attack: "Slash".to_string(),
            enemy_attack: "Bite".to_string(),
            enemy_speed: 1.5,
            crit_chance: 0.2,
            evade_chance: 0.1,
            drop_completion_signals: false,

            // Engine
            combat: CombatConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Run
        self.duration = self.duration.clamp(0.1, 600.0);
        self.fixed_dt = self.fixed_dt.clamp(0.001, 0.1);
        self.max_frame_dt = self.max_frame_dt.clamp(self.fixed_dt, 1.0);
        self.frame_jitter = self.frame_jitter.clamp(0.0, 0.9);

        // Script
        self.enemy_speed = self.enemy_speed.clamp(0.0, 20.0);
        self.crit_chance = self.crit_chance.clamp(0.0, 1.0);
        self.evade_chance = self.evade_chance.clamp(0.0, 1.0);

        self.combat.validate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < f32::EPSILON);
        assert_eq!(config.attacks_path, PathBuf::from("assets/attacks"));
        assert_eq!(config.player_attack, "Slash");
        assert!(!config.drop_completion_signals);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();

        // Set invalid values
        config.fixed_dt = 0.0;
        config.frame_jitter = 3.0;
        config.crit_chance = -1.0;
        config.max_frame_dt = 0.0;

        config.validate();

        // Should be clamped
        assert!((config.fixed_dt - 0.001).abs() < f32::EPSILON);
        assert!((config.frame_jitter - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.crit_chance, 0.0);
        assert!(config.max_frame_dt >= config.fixed_dt);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = SimConfig::default();
        config.seed = 12345;
        config.enemy_attack = "Ground Slam".to_string();
        config.drop_completion_signals = true;
        config.combat.safety_margin = 1.5;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.seed, 12345);
        assert_eq!(loaded.enemy_attack, "Ground Slam");
        assert!(loaded.drop_completion_signals);
        assert!((loaded.combat.safety_margin - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/config.toml");
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "seed = 7\n\n[combat]\nsafety_margin = 0.25\n")
            .expect("write");

        let config = SimConfig::load_from(&config_path);
        assert_eq!(config.seed, 7);
        assert_eq!(config.enemy_attack, "Bite");
        assert!((config.combat.safety_margin - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.combat.event_capacity, 1024);
    }
}
