//! Damage mitigation policies.
//!
//! Hit resolution starts from the attack's base damage and runs it through
//! the attacker's pipeline, then hands the result to the target's own
//! defenses before any health is debited. Each modifier may scale the hit,
//! mark it critical, or cancel it outright (evade/block). Attacks flagged
//! `can_evade = false` or `can_block = false` skip the matching roll.

use serde::{Deserialize, Serialize};

use vanguard_common::EntityId;

use crate::definition::AttackDefinition;

/// Why a hit dealt no damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvoidReason {
    /// Target dodged.
    Evaded,
    /// Target blocked.
    Blocked,
}

/// Who hit whom with what.
#[derive(Debug, Clone, Copy)]
pub struct HitContext<'a> {
    /// Attacking entity.
    pub attacker: EntityId,
    /// Struck entity.
    pub target: EntityId,
    /// Attack being resolved.
    pub definition: &'a AttackDefinition,
}

/// A hit on its way through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingHit {
    /// Damage so far.
    pub amount: f32,
    /// Whether a modifier marked it critical.
    pub critical: bool,
}

impl PendingHit {
    /// Start from base damage.
    #[must_use]
    pub const fn new(amount: f32) -> Self {
        Self {
            amount,
            critical: false,
        }
    }
}

/// Outcome of one modifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Keep going with this hit.
    Continue(PendingHit),
    /// Stop; no damage.
    Avoid(AvoidReason),
}

/// A pluggable step of damage computation.
pub trait DamageModifier: std::fmt::Debug {
    /// Adjusts or cancels a hit.
    fn apply(&mut self, ctx: &HitContext<'_>, hit: PendingHit) -> Verdict;
}

/// Scales every hit (e.g. a hurtbox damage multiplier).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageMultiplier(pub f32);

impl DamageModifier for DamageMultiplier {
    fn apply(&mut self, _ctx: &HitContext<'_>, mut hit: PendingHit) -> Verdict {
        hit.amount = (hit.amount * self.0).max(0.0);
        Verdict::Continue(hit)
    }
}

/// Subtracts a fixed amount, never below zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatReduction(pub f32);

impl DamageModifier for FlatReduction {
    fn apply(&mut self, _ctx: &HitContext<'_>, mut hit: PendingHit) -> Verdict {
        hit.amount = (hit.amount - self.0).max(0.0);
        Verdict::Continue(hit)
    }
}

/// Random dodge.
#[derive(Debug)]
pub struct EvasionChance {
    chance: f32,
    rng: fastrand::Rng,
}

impl EvasionChance {
    /// Evade with probability `chance` (0.0-1.0).
    #[must_use]
    pub fn new(chance: f32, seed: u64) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl DamageModifier for EvasionChance {
    fn apply(&mut self, ctx: &HitContext<'_>, hit: PendingHit) -> Verdict {
        if !ctx.definition.can_evade {
            return Verdict::Continue(hit);
        }
        if self.rng.f32() < self.chance {
            Verdict::Avoid(AvoidReason::Evaded)
        } else {
            Verdict::Continue(hit)
        }
    }
}

/// Random block.
#[derive(Debug)]
pub struct BlockChance {
    chance: f32,
    rng: fastrand::Rng,
}

impl BlockChance {
    /// Block with probability `chance` (0.0-1.0).
    #[must_use]
    pub fn new(chance: f32, seed: u64) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl DamageModifier for BlockChance {
    fn apply(&mut self, ctx: &HitContext<'_>, hit: PendingHit) -> Verdict {
        if !ctx.definition.can_block {
            return Verdict::Continue(hit);
        }
        if self.rng.f32() < self.chance {
            Verdict::Avoid(AvoidReason::Blocked)
        } else {
            Verdict::Continue(hit)
        }
    }
}

/// Random critical hits.
#[derive(Debug)]
pub struct CriticalStrike {
    chance: f32,
    multiplier: f32,
    rng: fastrand::Rng,
}

impl CriticalStrike {
    /// Default critical multiplier.
    pub const DEFAULT_MULTIPLIER: f32 = 1.5;

    /// Crit with probability `chance`, scaling damage by `multiplier` (>= 1).
    #[must_use]
    pub fn new(chance: f32, multiplier: f32, seed: u64) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            multiplier: multiplier.max(1.0),
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl DamageModifier for CriticalStrike {
    fn apply(&mut self, _ctx: &HitContext<'_>, mut hit: PendingHit) -> Verdict {
        if self.rng.f32() < self.chance {
            hit.amount *= self.multiplier;
            hit.critical = true;
        }
        Verdict::Continue(hit)
    }
}

/// Ordered list of modifiers. Empty means base damage is dealt unchanged.
#[derive(Debug, Default)]
pub struct DamagePipeline {
    modifiers: Vec<Box<dyn DamageModifier>>,
}

impl DamagePipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a modifier.
    #[must_use]
    pub fn with(mut self, modifier: impl DamageModifier + 'static) -> Self {
        self.push(modifier);
        self
    }

    /// Append a modifier in place.
    pub fn push(&mut self, modifier: impl DamageModifier + 'static) {
        self.modifiers.push(Box::new(modifier));
    }

    /// Number of modifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    /// True when no modifier is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Runs every modifier in order on base damage, stopping at the first
    /// avoidance.
    pub fn run(&mut self, ctx: &HitContext<'_>, base: f32) -> Verdict {
        self.apply(ctx, PendingHit::new(base.max(0.0)))
    }

    /// Like [`run`](Self::run), but continues a hit another pipeline has
    /// already shaped (critical flag included).
    pub fn apply(&mut self, ctx: &HitContext<'_>, mut hit: PendingHit) -> Verdict {
        for modifier in &mut self.modifiers {
            match modifier.apply(ctx, hit) {
                Verdict::Continue(next) => hit = next,
                avoided @ Verdict::Avoid(_) => return avoided,
            }
        }
        Verdict::Continue(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(definition: &AttackDefinition) -> HitContext<'_> {
        HitContext {
            attacker: EntityId::from_raw(1),
            target: EntityId::from_raw(2),
            definition,
        }
    }

    #[test]
    fn test_empty_pipeline_passes_base_damage() {
        let def = AttackDefinition::default();
        let mut pipeline = DamagePipeline::new();
        assert_eq!(
            pipeline.run(&ctx(&def), 10.0),
            Verdict::Continue(PendingHit::new(10.0))
        );
    }

    #[test]
    fn test_multiplier_then_reduction() {
        let def = AttackDefinition::default();
        let mut pipeline = DamagePipeline::new()
            .with(DamageMultiplier(0.5))
            .with(FlatReduction(2.0));
        assert_eq!(
            pipeline.run(&ctx(&def), 10.0),
            Verdict::Continue(PendingHit::new(3.0))
        );

        let mut pipeline = DamagePipeline::new().with(FlatReduction(50.0));
        assert_eq!(
            pipeline.run(&ctx(&def), 10.0),
            Verdict::Continue(PendingHit::new(0.0))
        );
    }

    #[test]
    fn test_certain_evasion_stops_pipeline() {
        let def = AttackDefinition::default();
        let mut pipeline = DamagePipeline::new()
            .with(EvasionChance::new(1.0, 7))
            .with(CriticalStrike::new(1.0, 2.0, 7));
        assert_eq!(
            pipeline.run(&ctx(&def), 10.0),
            Verdict::Avoid(AvoidReason::Evaded)
        );
    }

    #[test]
    fn test_zero_chance_never_triggers() {
        let def = AttackDefinition::default();
        let mut pipeline = DamagePipeline::new()
            .with(EvasionChance::new(0.0, 1))
            .with(BlockChance::new(0.0, 2))
            .with(CriticalStrike::new(0.0, 2.0, 3));
        for _ in 0..100 {
            assert_eq!(
                pipeline.run(&ctx(&def), 10.0),
                Verdict::Continue(PendingHit::new(10.0))
            );
        }
    }

    #[test]
    fn test_certain_critical() {
        let def = AttackDefinition::default();
        let mut pipeline = DamagePipeline::new().with(CriticalStrike::new(
            1.0,
            CriticalStrike::DEFAULT_MULTIPLIER,
            9,
        ));
        assert_eq!(
            pipeline.run(&ctx(&def), 10.0),
            Verdict::Continue(PendingHit {
                amount: 15.0,
                critical: true
            })
        );
    }

    #[test]
    fn test_unavoidable_attack_skips_rolls() {
        let def = AttackDefinition::default()
            .with_can_evade(false)
            .with_can_block(false);
        let mut pipeline = DamagePipeline::new()
            .with(EvasionChance::new(1.0, 4))
            .with(BlockChance::new(1.0, 4));
        assert_eq!(
            pipeline.run(&ctx(&def), 10.0),
            Verdict::Continue(PendingHit::new(10.0))
        );

        let blockable = AttackDefinition::default().with_can_evade(false);
        assert_eq!(
            pipeline.run(&ctx(&blockable), 10.0),
            Verdict::Avoid(AvoidReason::Blocked)
        );
    }

    #[test]
    fn test_apply_keeps_critical_flag() {
        let def = AttackDefinition::default();
        let mut pipeline = DamagePipeline::new().with(DamageMultiplier(0.5));
        let crit = PendingHit {
            amount: 20.0,
            critical: true,
        };
        assert_eq!(
            pipeline.apply(&ctx(&def), crit),
            Verdict::Continue(PendingHit {
                amount: 10.0,
                critical: true
            })
        );
    }

    #[test]
    fn test_certain_block() {
        let def = AttackDefinition::default();
        let mut pipeline = DamagePipeline::new().with(BlockChance::new(1.0, 5));
        assert_eq!(
            pipeline.run(&ctx(&def), 10.0),
            Verdict::Avoid(AvoidReason::Blocked)
        );
    }
}
