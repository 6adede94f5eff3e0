//! # Vanguard Combat
//!
//! Melee attack timing and hit resolution for Project Vanguard.
//!
//! This crate turns a directional attack request into timed windup, active
//! and recovery phases, and resolves what the attack hits:
//! - Attack definitions and their TOML library
//! - The per-entity attack state machine
//! - Hit volumes, target filtering and per-activation deduplication
//! - Damage, mitigation and knockback
//! - A failsafe that returns stalled attacks to Idle
//! - Damageable entities (players, enemies, training dummies)
//! - Event bus for the presentation layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod damageable;
pub mod definition;
pub mod events;
pub mod failsafe;
pub mod hitbox;
pub mod loader;
pub mod mitigation;
pub mod phase;
pub mod resolution;
pub mod system;
pub mod timing;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::damageable::*;
    pub use crate::definition::*;
    pub use crate::events::*;
    pub use crate::failsafe::*;
    pub use crate::hitbox::*;
    pub use crate::loader::*;
    pub use crate::mitigation::*;
    pub use crate::phase::*;
    pub use crate::resolution::*;
    pub use crate::system::*;
    pub use crate::timing::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use vanguard_common::{EntityIdAllocator, FactionId};

    #[test]
    fn test_allies_are_not_struck() {
        let mut ids = EntityIdAllocator::new();
        let mut system = CombatSystem::new(CombatConfig::default());

        let hero = Combatant::new(ids.allocate(), CombatantKind::Player, Vec2::ZERO);
        let hurtbox = hero.hurtbox;
        let hero = system.spawn_target(hero, hurtbox);

        let companion = Combatant::new(ids.allocate(), CombatantKind::Player, Vec2::new(0.3, 0.2));
        let hurtbox = companion.hurtbox;
        let companion = system.spawn_target(companion, hurtbox);

        let wolf = Combatant::new(ids.allocate(), CombatantKind::Enemy, Vec2::new(0.4, -0.1));
        let hurtbox = wolf.hurtbox;
        let wolf = system.spawn_target(wolf, hurtbox);

        let sweep = AttackDefinition::new(3, "Sweep").with_damage(12.0).with_area(1.0);
        system
            .add_attacker(
                hero,
                sweep,
                TargetFilter::default().excluding_faction(FactionId::PLAYER),
            )
            .expect("valid definition");

        system.start_attack(hero, Vec2::X);
        for _ in 0..20 {
            system.tick(0.05);
        }

        let health = |id| {
            system
                .registry()
                .get(id)
                .map(|c: &Combatant| c.health.current())
                .unwrap_or_default()
        };
        assert_eq!(health(hero), 100.0);
        assert_eq!(health(companion), 100.0);
        assert!((health(wolf) - 38.0).abs() < 1e-4);
    }

    #[test]
    fn test_knockback_moves_enemy_away() {
        let mut ids = EntityIdAllocator::new();
        let mut system = CombatSystem::new(CombatConfig::default());

        let hero = Combatant::new(ids.allocate(), CombatantKind::Player, Vec2::ZERO);
        let hurtbox = hero.hurtbox;
        let hero = system.spawn_target(hero, hurtbox);

        let wolf = Combatant::new(ids.allocate(), CombatantKind::Enemy, Vec2::new(0.0, 0.4));
        let hurtbox = wolf.hurtbox;
        let wolf = system.spawn_target(wolf, hurtbox);

        let shove = AttackDefinition::new(4, "Shove")
            .with_damage(1.0)
            .with_knockback(10.0);
        system
            .add_attacker(hero, shove, TargetFilter::new(CollisionLayer::ENEMY))
            .expect("valid definition");

        system.start_attack(hero, Vec2::Y);
        for _ in 0..10 {
            system.tick(0.05);
            for combatant in system.registry_mut().iter_mut() {
                combatant.tick(0.05);
            }
        }

        let y = system.registry().get(wolf).map_or(0.0, |c| c.position.y);
        assert!(y > 0.4);

        let knockback = system
            .drain_events()
            .into_iter()
            .find_map(|e| match e {
                CombatEvent::DamageApplied(hit) => Some(hit.knockback),
                _ => None,
            })
            .expect("hit landed");
        assert_eq!(knockback, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn test_area_swing_respects_each_targets_defense() {
        let mut ids = EntityIdAllocator::new();
        let mut system = CombatSystem::new(CombatConfig::default());

        let hero = Combatant::new(ids.allocate(), CombatantKind::Player, Vec2::ZERO);
        let hurtbox = hero.hurtbox;
        let hero = system.spawn_target(hero, hurtbox);

        let dodger = Combatant::new(ids.allocate(), CombatantKind::Enemy, Vec2::new(0.5, 0.0))
            .with_defense(DamagePipeline::new().with(EvasionChance::new(1.0, 21)));
        let hurtbox = dodger.hurtbox;
        let dodger = system.spawn_target(dodger, hurtbox);

        let brute = Combatant::new(ids.allocate(), CombatantKind::Enemy, Vec2::new(-0.5, 0.0));
        let hurtbox = brute.hurtbox;
        let brute = system.spawn_target(brute, hurtbox);

        let whirl = AttackDefinition::new(5, "Whirl").with_damage(7.0).with_area(1.0);
        system
            .add_attacker(hero, whirl, TargetFilter::new(CollisionLayer::ENEMY))
            .expect("valid definition");

        system.start_attack(hero, Vec2::X);
        for _ in 0..20 {
            system.tick(0.05);
        }

        let health = |id| {
            system
                .registry()
                .get(id)
                .map(|c: &Combatant| c.health.current())
                .unwrap_or_default()
        };
        assert_eq!(health(dodger), 50.0);
        assert!((health(brute) - 43.0).abs() < 1e-4);

        let events = system.drain_events();
        assert!(events.contains(&CombatEvent::HitAvoided {
            attacker: hero,
            target: dodger,
            reason: AvoidReason::Evaded,
        }));
        let landed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                CombatEvent::DamageApplied(hit) => Some(hit.target),
                _ => None,
            })
            .collect();
        assert_eq!(landed, vec![brute]);
    }
}
