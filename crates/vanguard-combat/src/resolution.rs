//! Hit resolution.
//!
//! Turns an accepted contact into damage: checks the target can be hurt,
//! runs the attacker's mitigation pipeline and then the target's defenses,
//! computes knockback, applies both to the target and publishes the outcome.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use vanguard_common::EntityId;

use crate::damageable::Damageable;
use crate::definition::AttackDefinition;
use crate::events::{CombatEvent, EventSink};
use crate::mitigation::{DamagePipeline, HitContext, Verdict};

/// Axis used when neither the attack direction nor the relative position
/// gives a usable knockback direction.
pub const FALLBACK_KNOCKBACK_AXIS: Vec2 = Vec2::X;

/// A landed hit. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Attacking entity.
    pub source: EntityId,
    /// Struck entity.
    pub target: EntityId,
    /// Damage dealt after mitigation.
    pub amount: f32,
    /// Damage before mitigation.
    pub raw_amount: f32,
    /// Where the hit landed.
    pub hit_point: Vec2,
    /// Knockback impulse (zero when the attack has none).
    pub knockback: Vec2,
    /// Whether this was a critical hit.
    pub is_critical: bool,
}

impl DamageEvent {
    /// Check if the hit pushed the target.
    #[must_use]
    pub fn has_knockback(&self) -> bool {
        self.knockback != Vec2::ZERO
    }
}

/// Where a hit came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOrigin {
    /// Attacking entity.
    pub attacker: EntityId,
    /// Attacker position.
    pub position: Vec2,
    /// Stored attack direction.
    pub direction: Vec2,
}

/// Knockback direction: the attack direction, else away from the attacker,
/// else the fallback axis. Always a unit vector.
#[must_use]
pub fn knockback_direction(attack_direction: Vec2, attacker: Vec2, target: Vec2) -> Vec2 {
    attack_direction
        .try_normalize()
        .or_else(|| (target - attacker).try_normalize())
        .unwrap_or(FALLBACK_KNOCKBACK_AXIS)
}

/// Applies accepted contacts to targets.
#[derive(Debug)]
pub struct HitResolution {
    pipeline: DamagePipeline,
    sink: EventSink,
}

impl HitResolution {
    /// Create a resolver with an empty mitigation pipeline.
    #[must_use]
    pub fn new(sink: EventSink) -> Self {
        Self {
            pipeline: DamagePipeline::new(),
            sink,
        }
    }

    /// Replace the mitigation pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: DamagePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Mitigation pipeline, for installing modifiers.
    pub fn pipeline_mut(&mut self) -> &mut DamagePipeline {
        &mut self.pipeline
    }

    /// Resolves one hit. Returns `None` if the target is dead, invincible,
    /// or avoided the hit.
    pub fn resolve<T: Damageable + ?Sized>(
        &mut self,
        origin: &HitOrigin,
        target: &mut T,
        definition: &AttackDefinition,
        hit_point: Vec2,
    ) -> Option<DamageEvent> {
        let target_id = target.entity_id();

        if !target.is_alive() {
            trace!("{target_id} is dead, hit ignored");
            return None;
        }
        if target.is_invincible() {
            trace!("{target_id} is invincible, hit ignored");
            return None;
        }

        let ctx = HitContext {
            attacker: origin.attacker,
            target: target_id,
            definition,
        };
        let raw_amount = definition.damage * target.damage_taken_multiplier().max(0.0);
        let verdict = match self.pipeline.run(&ctx, raw_amount) {
            Verdict::Continue(hit) => target.defend(&ctx, hit),
            avoided @ Verdict::Avoid(_) => avoided,
        };
        let hit = match verdict {
            Verdict::Continue(hit) => hit,
            Verdict::Avoid(reason) => {
                debug!("{target_id} avoided hit from {}: {reason:?}", origin.attacker);
                self.sink.publish(CombatEvent::HitAvoided {
                    attacker: origin.attacker,
                    target: target_id,
                    reason,
                });
                return None;
            },
        };

        let knockback = if definition.has_knockback {
            knockback_direction(origin.direction, origin.position, target.position())
                * definition.knockback_force
        } else {
            Vec2::ZERO
        };

        let report = target.take_damage(hit.amount);
        if knockback != Vec2::ZERO {
            target.apply_knockback(knockback);
        }
        target.begin_invincibility();

        let event = DamageEvent {
            source: origin.attacker,
            target: target_id,
            amount: report.applied,
            raw_amount,
            hit_point,
            knockback,
            is_critical: hit.critical,
        };
        debug!(
            "{} hit {} for {:.1}{}",
            origin.attacker,
            target_id,
            event.amount,
            if event.is_critical { " (critical)" } else { "" }
        );
        self.sink.publish(CombatEvent::DamageApplied(event.clone()));

        if report.killed {
            info!("{target_id} killed by {}", origin.attacker);
            self.sink.publish(CombatEvent::EntityDied {
                entity: target_id,
                killer: Some(origin.attacker),
            });
        }

        Some(event)
    }
}
