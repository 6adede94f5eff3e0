//! Attack definitions.
//!
//! This module provides:
//! - Immutable per-attack-type parameters (damage, reach, timing windows)
//! - Derived values (attack interval, total duration)
//! - Load-time validation, so malformed data never reaches the state machine

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phase::AttackPhase;

// ============================================================================
// Errors
// ============================================================================

/// Reasons an attack definition is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    /// Definition has no name.
    #[error("attack {id} has an empty name")]
    EmptyName {
        /// Attack ID.
        id: u32,
    },

    /// A numeric field is NaN or infinite.
    #[error("attack {name:?}: field `{field}` is not finite")]
    NonFinite {
        /// Attack name.
        name: String,
        /// Offending field.
        field: &'static str,
    },

    /// Attack rate must be strictly positive.
    #[error("attack {name:?}: attack_rate must be > 0, got {rate}")]
    NonPositiveAttackRate {
        /// Attack name.
        name: String,
        /// Configured rate.
        rate: f32,
    },

    /// A phase duration is negative.
    #[error("attack {name:?}: {phase} duration must be >= 0, got {value}")]
    NegativeDuration {
        /// Attack name.
        name: String,
        /// Phase whose duration is invalid.
        phase: AttackPhase,
        /// Configured duration.
        value: f32,
    },

    /// A magnitude that must not be negative is negative.
    #[error("attack {name:?}: `{field}` must be >= 0, got {value}")]
    Negative {
        /// Attack name.
        name: String,
        /// Offending field.
        field: &'static str,
        /// Configured value.
        value: f32,
    },

    /// Area attacks need a positive radius.
    #[error("attack {name:?}: area_radius must be > 0 for area attacks, got {radius}")]
    InvalidAreaRadius {
        /// Attack name.
        name: String,
        /// Configured radius.
        radius: f32,
    },

    /// Hitbox extents must be positive.
    #[error("attack {name:?}: hitbox_size must be positive, got {size}")]
    InvalidHitboxSize {
        /// Attack name.
        name: String,
        /// Configured size.
        size: Vec2,
    },
}

// ============================================================================
// Timing
// ============================================================================

/// How an attack leaves its Recovery phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Every phase ends when its timer elapses.
    #[default]
    Timed,
    /// Recovery ends only when the animation layer reports completion
    /// (or the failsafe fires).
    SignalDriven,
}

/// Timing windows of one attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackTiming {
    /// Duration of windup phase (seconds).
    pub windup: f32,
    /// Duration of active phase (seconds).
    pub active: f32,
    /// Duration of recovery phase (seconds).
    pub recovery: f32,
}

impl Default for AttackTiming {
    fn default() -> Self {
        Self {
            windup: 0.1,
            active: 0.2,
            recovery: 0.2,
        }
    }
}

impl AttackTiming {
    /// Create new attack timing.
    #[must_use]
    pub const fn new(windup: f32, active: f32, recovery: f32) -> Self {
        Self {
            windup,
            active,
            recovery,
        }
    }

    /// Get total attack duration.
    #[must_use]
    pub fn total_duration(&self) -> f32 {
        self.windup + self.active + self.recovery
    }

    /// Duration of a phase; Idle has none.
    #[must_use]
    pub fn duration_of(&self, phase: AttackPhase) -> f32 {
        match phase {
            AttackPhase::Idle => 0.0,
            AttackPhase::Windup => self.windup,
            AttackPhase::Active => self.active,
            AttackPhase::Recovery => self.recovery,
        }
    }
}

// ============================================================================
// Definition
// ============================================================================

fn default_range() -> f32 {
    0.5
}

fn default_attack_rate() -> f32 {
    1.0
}

fn default_windup() -> f32 {
    0.1
}

fn default_active() -> f32 {
    0.2
}

fn default_recovery() -> f32 {
    0.2
}

fn default_knockback_force() -> f32 {
    5.0
}

fn default_area_radius() -> f32 {
    1.0
}

fn default_hitbox_size() -> Vec2 {
    Vec2::splat(0.5)
}

fn default_positioning_factor() -> f32 {
    0.8
}

fn default_true() -> bool {
    true
}

/// Immutable parameters for one attack type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDefinition {
    /// Unique attack ID.
    #[serde(default)]
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Damage per hit.
    pub damage: f32,
    /// Reach of the directional volume.
    #[serde(default = "default_range")]
    pub range: f32,
    /// Attacks per second; the cooldown is its inverse.
    #[serde(default = "default_attack_rate")]
    pub attack_rate: f32,
    /// Windup duration (seconds).
    #[serde(default = "default_windup")]
    pub windup_time: f32,
    /// Active duration (seconds).
    #[serde(default = "default_active")]
    pub active_time: f32,
    /// Recovery duration (seconds).
    #[serde(default = "default_recovery")]
    pub recovery_time: f32,
    /// Whether hits push the target.
    #[serde(default)]
    pub has_knockback: bool,
    /// Knockback impulse magnitude.
    #[serde(default = "default_knockback_force")]
    pub knockback_force: f32,
    /// Area attacks use a circle around the attacker instead of a box.
    #[serde(default)]
    pub is_area_attack: bool,
    /// Radius of the area volume.
    #[serde(default = "default_area_radius")]
    pub area_radius: f32,
    /// Allow the same target to be struck more than once per activation.
    #[serde(default)]
    pub allow_multiple_hits: bool,
    /// Width (along the attack direction) and height of the box volume.
    #[serde(default = "default_hitbox_size")]
    pub hitbox_size: Vec2,
    /// Fraction of `range` the box is pushed out from the attacker.
    #[serde(default = "default_positioning_factor")]
    pub positioning_factor: f32,
    /// How Recovery completes.
    #[serde(default)]
    pub timing_mode: TimingMode,
    /// Targets may roll evasion against this attack.
    #[serde(default = "default_true")]
    pub can_evade: bool,
    /// Targets may roll a block against this attack.
    #[serde(default = "default_true")]
    pub can_block: bool,
}

impl Default for AttackDefinition {
    fn default() -> Self {
        Self {
            id: 0,
            name: "Basic Attack".to_string(),
            damage: 10.0,
            range: default_range(),
            attack_rate: default_attack_rate(),
            windup_time: default_windup(),
            active_time: default_active(),
            recovery_time: default_recovery(),
            has_knockback: false,
            knockback_force: default_knockback_force(),
            is_area_attack: false,
            area_radius: default_area_radius(),
            allow_multiple_hits: false,
            hitbox_size: default_hitbox_size(),
            positioning_factor: default_positioning_factor(),
            timing_mode: TimingMode::Timed,
            can_evade: true,
            can_block: true,
        }
    }
}

impl AttackDefinition {
    /// Create a definition with default parameters.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set damage.
    #[must_use]
    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage;
        self
    }

    /// Set range.
    #[must_use]
    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    /// Set attacks per second.
    #[must_use]
    pub fn with_attack_rate(mut self, rate: f32) -> Self {
        self.attack_rate = rate;
        self
    }

    /// Set timing windows.
    #[must_use]
    pub fn with_timing(mut self, timing: AttackTiming) -> Self {
        self.windup_time = timing.windup;
        self.active_time = timing.active;
        self.recovery_time = timing.recovery;
        self
    }

    /// Enable knockback with the given force.
    #[must_use]
    pub fn with_knockback(mut self, force: f32) -> Self {
        self.has_knockback = true;
        self.knockback_force = force;
        self
    }

    /// Turn this into an area attack.
    #[must_use]
    pub fn with_area(mut self, radius: f32) -> Self {
        self.is_area_attack = true;
        self.area_radius = radius;
        self
    }

    /// Allow or forbid repeated hits per activation.
    #[must_use]
    pub fn with_multiple_hits(mut self, allow: bool) -> Self {
        self.allow_multiple_hits = allow;
        self
    }

    /// Set box volume extents.
    #[must_use]
    pub fn with_hitbox_size(mut self, width: f32, height: f32) -> Self {
        self.hitbox_size = Vec2::new(width, height);
        self
    }

    /// Allow or forbid evasion rolls.
    #[must_use]
    pub fn with_can_evade(mut self, allow: bool) -> Self {
        self.can_evade = allow;
        self
    }

    /// Allow or forbid block rolls.
    #[must_use]
    pub fn with_can_block(mut self, allow: bool) -> Self {
        self.can_block = allow;
        self
    }

    /// Set timing mode.
    #[must_use]
    pub fn with_timing_mode(mut self, mode: TimingMode) -> Self {
        self.timing_mode = mode;
        self
    }

    /// Seconds between attack starts.
    #[must_use]
    pub fn attack_interval(&self) -> f32 {
        1.0 / self.attack_rate
    }

    /// Timing windows as one value.
    #[must_use]
    pub fn timing(&self) -> AttackTiming {
        AttackTiming::new(self.windup_time, self.active_time, self.recovery_time)
    }

    /// Sum of the three phase durations.
    #[must_use]
    pub fn total_duration(&self) -> f32 {
        self.timing().total_duration()
    }

    /// Distance from the attacker to the centre of the box volume.
    #[must_use]
    pub fn volume_offset(&self) -> f32 {
        self.range * self.positioning_factor
    }

    /// Validates the definition.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName { id: self.id });
        }

        let scalars = [
            ("damage", self.damage),
            ("range", self.range),
            ("attack_rate", self.attack_rate),
            ("windup_time", self.windup_time),
            ("active_time", self.active_time),
            ("recovery_time", self.recovery_time),
            ("knockback_force", self.knockback_force),
            ("area_radius", self.area_radius),
            ("positioning_factor", self.positioning_factor),
            ("hitbox_size.x", self.hitbox_size.x),
            ("hitbox_size.y", self.hitbox_size.y),
        ];
        for (field, value) in scalars {
            if !value.is_finite() {
                return Err(DefinitionError::NonFinite {
                    name: self.name.clone(),
                    field,
                });
            }
        }

        if self.attack_rate <= 0.0 {
            return Err(DefinitionError::NonPositiveAttackRate {
                name: self.name.clone(),
                rate: self.attack_rate,
            });
        }

        for phase in [AttackPhase::Windup, AttackPhase::Active, AttackPhase::Recovery] {
            let value = self.timing().duration_of(phase);
            if value < 0.0 {
                return Err(DefinitionError::NegativeDuration {
                    name: self.name.clone(),
                    phase,
                    value,
                });
            }
        }

        for (field, value) in [
            ("damage", self.damage),
            ("range", self.range),
            ("knockback_force", self.knockback_force),
            ("positioning_factor", self.positioning_factor),
        ] {
            if value < 0.0 {
                return Err(DefinitionError::Negative {
                    name: self.name.clone(),
                    field,
                    value,
                });
            }
        }

        if self.is_area_attack && self.area_radius <= 0.0 {
            return Err(DefinitionError::InvalidAreaRadius {
                name: self.name.clone(),
                radius: self.area_radius,
            });
        }

        if !self.is_area_attack && (self.hitbox_size.x <= 0.0 || self.hitbox_size.y <= 0.0) {
            return Err(DefinitionError::InvalidHitboxSize {
                name: self.name.clone(),
                size: self.hitbox_size,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_definition_is_valid() {
        assert!(AttackDefinition::default().validate().is_ok());
    }

    #[test]
    fn test_attack_interval() {
        let def = AttackDefinition::default().with_attack_rate(2.0);
        assert!((def.attack_interval() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_total_duration() {
        let def = AttackDefinition::default().with_timing(AttackTiming::new(0.1, 0.2, 0.3));
        assert!((def.total_duration() - 0.6).abs() < 1e-6);
        assert_eq!(def.timing().duration_of(AttackPhase::Idle), 0.0);
    }

    #[test]
    fn test_zero_attack_rate_rejected() {
        let def = AttackDefinition::default().with_attack_rate(0.0);
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::NonPositiveAttackRate { .. })
        ));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let def = AttackDefinition::default().with_timing(AttackTiming::new(0.1, -0.2, 0.1));
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::NegativeDuration {
                phase: AttackPhase::Active,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_durations_allowed() {
        let def = AttackDefinition::default().with_timing(AttackTiming::new(0.0, 0.0, 0.0));
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_nan_rejected() {
        let def = AttackDefinition::default().with_damage(f32::NAN);
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::NonFinite { field: "damage", .. })
        ));
    }

    #[test]
    fn test_area_radius_checked_only_for_area_attacks() {
        let mut def = AttackDefinition::default();
        def.area_radius = 0.0;
        assert!(def.validate().is_ok());

        let def = def.with_area(0.0);
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::InvalidAreaRadius { .. })
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let def = AttackDefinition::new(7, "  ");
        assert_eq!(def.validate(), Err(DefinitionError::EmptyName { id: 7 }));
    }

    #[test]
    fn test_volume_offset() {
        let def = AttackDefinition::default().with_range(0.5);
        assert!((def.volume_offset() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let def: AttackDefinition = toml::from_str(
            r#"
            name = "Jab"
            damage = 4.0
            attack_rate = 3.0
            hitbox_size = [0.4, 0.3]
            timing_mode = "signal_driven"
            "#,
        )
        .expect("valid toml");
        assert_eq!(def.name, "Jab");
        assert_eq!(def.timing_mode, TimingMode::SignalDriven);
        assert_eq!(def.hitbox_size, Vec2::new(0.4, 0.3));
        assert!((def.windup_time - 0.1).abs() < f32::EPSILON);
        assert!(def.can_evade && def.can_block);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_parse_unavoidable_flags() {
        let def: AttackDefinition = toml::from_str(
            r#"
            name = "Ground Slam"
            damage = 30.0
            can_evade = false
            "#,
        )
        .expect("valid toml");
        assert!(!def.can_evade);
        assert!(def.can_block);
    }
}
