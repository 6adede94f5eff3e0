//! Combat event integration.
//!
//! This module provides:
//! - Per-entity combat statistics built from the event stream
//! - A handler that logs notable events as they are dispatched

use std::collections::HashMap;

use tracing::{debug, info, warn};

use vanguard_combat::{AvoidReason, CombatEvent, EventHandler};
use vanguard_common::EntityId;

/// Statistics tracked for combat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatStats {
    /// Total attacks made.
    pub attacks_made: u64,
    /// Activations that struck nothing.
    pub attacks_missed: u64,
    /// Total hits landed.
    pub hits_landed: u64,
    /// Total damage dealt.
    pub damage_dealt: f64,
    /// Total damage taken.
    pub damage_taken: f64,
    /// Hits this entity evaded.
    pub evades: u64,
    /// Hits this entity blocked.
    pub blocks: u64,
    /// Total kills.
    pub kills: u64,
    /// Total deaths.
    pub deaths: u64,
    /// Critical hits landed.
    pub critical_hits: u64,
    /// Attacks interrupted.
    pub attacks_cancelled: u64,
    /// Attacks the failsafe had to recover.
    pub failsafe_trips: u64,
}

impl CombatStats {
    /// Creates new empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attack.
    pub fn record_attack(&mut self) {
        self.attacks_made += 1;
    }

    /// Records a hit.
    pub fn record_hit(&mut self, damage: f32, critical: bool) {
        self.hits_landed += 1;
        self.damage_dealt += f64::from(damage);
        if critical {
            self.critical_hits += 1;
        }
    }

    /// Records damage taken.
    pub fn record_damage_taken(&mut self, damage: f32) {
        self.damage_taken += f64::from(damage);
    }

    /// Records an avoided hit.
    pub fn record_avoid(&mut self, reason: AvoidReason) {
        match reason {
            AvoidReason::Evaded => self.evades += 1,
            AvoidReason::Blocked => self.blocks += 1,
        }
    }

    /// Records a kill.
    pub fn record_kill(&mut self) {
        self.kills += 1;
    }

    /// Records a death.
    pub fn record_death(&mut self) {
        self.deaths += 1;
    }

    /// Returns hit rate (hits / attacks).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        if self.attacks_made == 0 {
            0.0
        } else {
            self.hits_landed as f64 / self.attacks_made as f64
        }
    }
}

/// Handler for combat events.
#[derive(Debug, Default)]
pub struct CombatEventHandler {
    /// Statistics per entity.
    stats: HashMap<EntityId, CombatStats>,
    /// Events handled so far.
    processed: u64,
}

impl CombatEventHandler {
    /// Creates a new handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats for an entity (empty if it never appeared in an event).
    #[must_use]
    pub fn stats(&self, entity: EntityId) -> CombatStats {
        self.stats.get(&entity).cloned().unwrap_or_default()
    }

    /// Number of events handled.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.processed
    }

    fn entry(&mut self, entity: EntityId) -> &mut CombatStats {
        self.stats.entry(entity).or_default()
    }
}

impl EventHandler for CombatEventHandler {
    fn handle(&mut self, event: &CombatEvent) {
        self.processed += 1;

        match event {
            CombatEvent::AttackStarted {
                attacker,
                attack_id,
                direction,
                time,
            } => {
                debug!("[{time:.3}] {attacker} starts attack {attack_id} toward {direction}");
                self.entry(*attacker).record_attack();
            },
            CombatEvent::HitboxesEnabled { attacker } => {
                debug!("{attacker} hitboxes enabled");
            },
            CombatEvent::DamageApplied(hit) => {
                info!(
                    "{} hits {} for {:.1}{}",
                    hit.source,
                    hit.target,
                    hit.amount,
                    if hit.is_critical { " (critical)" } else { "" }
                );
                self.entry(hit.source).record_hit(hit.amount, hit.is_critical);
                self.entry(hit.target).record_damage_taken(hit.amount);
            },
            CombatEvent::HitAvoided {
                attacker,
                target,
                reason,
            } => {
                info!("{target} avoided {attacker}: {reason:?}");
                self.entry(*target).record_avoid(*reason);
            },
            CombatEvent::EntityDied { entity, killer } => {
                info!("{entity} died");
                self.entry(*entity).record_death();
                if let Some(killer) = killer {
                    self.entry(*killer).record_kill();
                }
            },
            CombatEvent::AttackMissed { attacker } => {
                debug!("{attacker} missed");
                self.entry(*attacker).attacks_missed += 1;
            },
            CombatEvent::AttackCompleted { attacker } => {
                debug!("{attacker} attack complete");
            },
            CombatEvent::AttackCancelled { attacker, phase } => {
                debug!("{attacker} attack cancelled during {phase}");
                self.entry(*attacker).attacks_cancelled += 1;
            },
            CombatEvent::FailsafeTripped { attacker, phase } => {
                warn!("{attacker} attack recovered by failsafe (stuck in {phase})");
                self.entry(*attacker).failsafe_trips += 1;
            },
        }
    }
}
