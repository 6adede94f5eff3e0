//! The seam between the combat engine and the spatial world.
//!
//! State machines never own targets. They ask a `CombatWorld` which
//! hurtboxes overlap a volume and borrow the struck target for the
//! duration of one hit.

use ahash::AHashMap;
use glam::Vec2;
use tracing::debug;

use vanguard_common::EntityId;

use crate::damageable::Damageable;
use crate::hitbox::{ContactCandidate, HitVolume, Hurtbox};

/// Spatial queries and target access used by the state machines.
pub trait CombatWorld {
    /// Entity type that receives hits.
    type Target: Damageable;

    /// Hurtboxes overlapping `volume`, in arrival order.
    fn overlapping(&self, volume: &HitVolume) -> Vec<ContactCandidate>;

    /// Current position of an entity, if the world knows it.
    fn position_of(&self, entity: EntityId) -> Option<Vec2>;

    /// Mutable access to a target for hit resolution.
    fn target_mut(&mut self, entity: EntityId) -> Option<&mut Self::Target>;
}

/// A registered target and its hurtbox.
#[derive(Debug, Clone)]
pub struct RegisteredTarget<T> {
    /// The damageable entity.
    pub target: T,
    /// How the entity can be struck.
    pub hurtbox: Hurtbox,
}

/// Flat, in-memory `CombatWorld`.
#[derive(Debug, Clone)]
pub struct TargetRegistry<T> {
    entries: AHashMap<EntityId, RegisteredTarget<T>>,
    /// Insertion order, used as contact arrival order.
    order: Vec<EntityId>,
}

impl<T> Default for TargetRegistry<T> {
    fn default() -> Self {
        Self {
            entries: AHashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Damageable> TargetRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no target is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a target. Replaces any previous entry with the same ID.
    pub fn insert(&mut self, target: T, hurtbox: Hurtbox) {
        let id = target.entity_id();
        if self
            .entries
            .insert(id, RegisteredTarget { target, hurtbox })
            .is_none()
        {
            self.order.push(id);
        }
        debug!("Registered combat target {id}");
    }

    /// Remove a target.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let removed = self.entries.remove(&entity)?;
        self.order.retain(|id| *id != entity);
        Some(removed.target)
    }

    /// Get a target.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.entries.get(&entity).map(|e| &e.target)
    }

    /// Get a target mutably.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entries.get_mut(&entity).map(|e| &mut e.target)
    }

    /// Hurtbox of a target.
    #[must_use]
    pub fn hurtbox(&self, entity: EntityId) -> Option<&Hurtbox> {
        self.entries.get(&entity).map(|e| &e.hurtbox)
    }

    /// Hurtbox of a target, mutably.
    pub fn hurtbox_mut(&mut self, entity: EntityId) -> Option<&mut Hurtbox> {
        self.entries.get_mut(&entity).map(|e| &mut e.hurtbox)
    }

    /// Iterate targets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| &e.target))
    }

    /// Iterate targets mutably (unordered).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut().map(|e| &mut e.target)
    }
}

impl<T: Damageable> CombatWorld for TargetRegistry<T> {
    type Target = T;

    fn overlapping(&self, volume: &HitVolume) -> Vec<ContactCandidate> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| (*id, e)))
            .filter(|(_, e)| e.hurtbox.enabled)
            .map(|(id, e)| e.hurtbox.candidate(id, e.target.position()))
            .filter(|c| volume.contains(c.position, c.radius))
            .collect()
    }

    fn position_of(&self, entity: EntityId) -> Option<Vec2> {
        self.entries.get(&entity).map(|e| e.target.position())
    }

    fn target_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.get_mut(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damageable::{Combatant, CombatantKind};
    use crate::definition::AttackDefinition;

    fn spawn(registry: &mut TargetRegistry<Combatant>, raw: u64, position: Vec2) {
        let combatant = Combatant::new(EntityId::from_raw(raw), CombatantKind::Enemy, position);
        let hurtbox = combatant.hurtbox;
        registry.insert(combatant, hurtbox);
    }

    #[test]
    fn test_registry_insert_remove() {
        let mut registry = TargetRegistry::new();
        spawn(&mut registry, 2, Vec2::ZERO);
        spawn(&mut registry, 3, Vec2::ONE);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(EntityId::from_raw(2)).is_some());
        assert!(registry.remove(EntityId::from_raw(2)).is_none());
        assert_eq!(registry.iter().count(), 1);
        assert_eq!(
            registry.position_of(EntityId::from_raw(3)),
            Some(Vec2::ONE)
        );
    }

    #[test]
    fn test_overlapping_in_registration_order() {
        let mut registry = TargetRegistry::new();
        spawn(&mut registry, 7, Vec2::new(0.5, 0.0));
        spawn(&mut registry, 4, Vec2::new(0.3, 0.0));
        spawn(&mut registry, 5, Vec2::new(3.0, 0.0));

        let def = AttackDefinition::default().with_range(0.5);
        let volume = HitVolume::for_attack(&def, Vec2::ZERO, Vec2::X);
        let ids: Vec<u64> = registry
            .overlapping(&volume)
            .iter()
            .map(|c| c.entity.raw())
            .collect();
        assert_eq!(ids, vec![7, 4]);
    }

    #[test]
    fn test_disabled_hurtbox_not_reported() {
        let mut registry = TargetRegistry::new();
        spawn(&mut registry, 2, Vec2::new(0.3, 0.0));
        if let Some(hurtbox) = registry.hurtbox_mut(EntityId::from_raw(2)) {
            hurtbox.enabled = false;
        }

        let def = AttackDefinition::default();
        let volume = HitVolume::for_attack(&def, Vec2::ZERO, Vec2::X);
        assert!(registry.overlapping(&volume).is_empty());
    }
}
