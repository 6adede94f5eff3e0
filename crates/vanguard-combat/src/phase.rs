//! Attack phases.

use serde::{Deserialize, Serialize};

/// Phase of a melee attack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Not attacking.
    #[default]
    Idle,
    /// Preparing to strike.
    Windup,
    /// Active damage window.
    Active,
    /// Recovering after attack.
    Recovery,
}

impl AttackPhase {
    /// Check if attack can deal damage.
    #[must_use]
    pub const fn can_damage(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if an attack is in progress.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Phase that follows this one in the cycle.
    #[must_use]
    pub const fn next(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Windup => Self::Active,
            Self::Active => Self::Recovery,
            Self::Recovery => Self::Idle,
        }
    }
}

impl std::fmt::Display for AttackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Windup => "windup",
            Self::Active => "active",
            Self::Recovery => "recovery",
        };
        f.write_str(name)
    }
}
