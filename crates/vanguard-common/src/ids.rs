//! ID types for combat entities and factions.

use serde::{Deserialize, Serialize};

/// Unique identifier for an entity in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity ID from a raw value (for deserialization and tests).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) entity ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out unique entity IDs.
///
/// Each simulation owns its allocator, so two simulations in one process
/// never share a counter.
#[derive(Debug, Clone)]
pub struct EntityIdAllocator {
    next: u64,
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityIdAllocator {
    /// Creates an allocator whose first ID is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocates the next ID.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Number of IDs handed out so far.
    #[must_use]
    pub const fn allocated(&self) -> u64 {
        self.next - 1
    }
}

/// Unique identifier for a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionId(u16);

impl FactionId {
    /// Creates a faction ID from a raw value.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Neutral faction (no allegiance).
    pub const NEUTRAL: Self = Self(0);

    /// Player faction.
    pub const PLAYER: Self = Self(1);

    /// Hostile monsters.
    pub const MONSTERS: Self = Self(2);
}

impl Default for FactionId {
    fn default() -> Self {
        Self::NEUTRAL
    }
}
