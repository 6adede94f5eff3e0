//! Damage-receiving entities.
//!
//! This module provides:
//! - The `Damageable` capability hit resolution talks to
//! - A health pool with invincibility windows, regeneration and a one-shot
//!   death transition
//! - A knockback body with resistance, speed cap and decay
//! - `Combatant`, the stock implementation for players, enemies and dummies,
//!   with its own defensive mitigation pipeline

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vanguard_common::{EntityId, FactionId};

use crate::hitbox::{CollisionLayer, Hurtbox};
use crate::mitigation::{DamagePipeline, HitContext, PendingHit, Verdict};

/// Result of applying damage to a health pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    /// Health actually removed.
    pub applied: f32,
    /// Health left afterwards.
    pub remaining: f32,
    /// True only for the hit that caused the death transition.
    pub killed: bool,
}

impl DamageReport {
    /// Report for damage that was ignored.
    #[must_use]
    pub const fn ignored(remaining: f32) -> Self {
        Self {
            applied: 0.0,
            remaining,
            killed: false,
        }
    }
}

/// Capability of receiving melee hits.
pub trait Damageable {
    /// Identity of this entity.
    fn entity_id(&self) -> EntityId;

    /// World position, used for the knockback fallback direction.
    fn position(&self) -> Vec2;

    /// False once the death transition has happened.
    fn is_alive(&self) -> bool;

    /// True while hits should be ignored.
    fn is_invincible(&self) -> bool;

    /// Debits health.
    fn take_damage(&mut self, amount: f32) -> DamageReport;

    /// Hands a knockback impulse to the movement collaborator.
    fn apply_knockback(&mut self, impulse: Vec2);

    /// Starts the post-hit invincibility window, if this entity uses one.
    fn begin_invincibility(&mut self) {}

    /// Multiplier on incoming damage.
    fn damage_taken_multiplier(&self) -> f32 {
        1.0
    }

    /// Target-side mitigation, run after the attacker's pipeline.
    ///
    /// This is where the struck entity gets to evade, block or soak a hit.
    fn defend(&mut self, _ctx: &HitContext<'_>, hit: PendingHit) -> Verdict {
        Verdict::Continue(hit)
    }
}

// ============================================================================
// Health
// ============================================================================

/// Passive health regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regeneration {
    /// Health per second.
    pub rate: f32,
    /// Seconds without damage before regeneration starts.
    pub delay: f32,
}

/// Health pool with invincibility frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
    dead: bool,
    invincibility_duration: f32,
    invincibility_remaining: f32,
    regeneration: Option<Regeneration>,
    time_since_damage: f32,
}

impl Health {
    /// Create a full health pool.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = max.max(1.0);
        Self {
            current: max,
            max,
            dead: false,
            invincibility_duration: 0.0,
            invincibility_remaining: 0.0,
            regeneration: None,
            time_since_damage: 0.0,
        }
    }

    /// Grant invincibility for `duration` seconds after each hit.
    #[must_use]
    pub fn with_invincibility(mut self, duration: f32) -> Self {
        self.invincibility_duration = duration.max(0.0);
        self
    }

    /// Enable regeneration.
    #[must_use]
    pub fn with_regeneration(mut self, rate: f32, delay: f32) -> Self {
        self.regeneration = Some(Regeneration {
            rate: rate.max(0.0),
            delay: delay.max(0.0),
        });
        self
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Current health as a fraction of maximum.
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    /// Alive until the death transition.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// True while an invincibility window is running.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.invincibility_remaining > 0.0
    }

    /// Seconds of invincibility left.
    #[must_use]
    pub const fn invincibility_remaining(&self) -> f32 {
        self.invincibility_remaining
    }

    /// Removes health, clamped at zero. The death transition fires once.
    pub fn take_damage(&mut self, amount: f32) -> DamageReport {
        if self.dead {
            return DamageReport::ignored(self.current);
        }

        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        let before = self.current;
        self.current = (self.current - amount).max(0.0);
        self.time_since_damage = 0.0;

        let killed = self.current <= 0.0;
        if killed {
            self.dead = true;
        }

        DamageReport {
            applied: before - self.current,
            remaining: self.current,
            killed,
        }
    }

    /// Restores health up to maximum. Dead entities cannot be healed.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        self.current - before
    }

    /// Start (or extend) the post-hit invincibility window.
    pub fn begin_invincibility(&mut self) {
        self.grant_invincibility(self.invincibility_duration);
    }

    /// Invincible for at least `duration` more seconds.
    pub fn grant_invincibility(&mut self, duration: f32) {
        self.invincibility_remaining = self.invincibility_remaining.max(duration);
    }

    /// Change maximum health, clamping current health.
    pub fn set_max_health(&mut self, max: f32) {
        self.max = max.max(1.0);
        self.current = self.current.min(self.max);
    }

    /// Full health and alive again.
    pub fn reset(&mut self) {
        self.current = self.max;
        self.dead = false;
        self.invincibility_remaining = 0.0;
        self.time_since_damage = 0.0;
    }

    /// Counts down invincibility and applies regeneration.
    pub fn tick(&mut self, dt: f32) {
        self.invincibility_remaining = (self.invincibility_remaining - dt).max(0.0);

        if self.dead {
            return;
        }

        self.time_since_damage += dt;
        if let Some(regen) = self.regeneration {
            if self.time_since_damage >= regen.delay && self.current < self.max {
                self.heal(regen.rate * dt);
            }
        }
    }
}

// ============================================================================
// Knockback
// ============================================================================

/// Velocity below which knockback stops.
const KNOCKBACK_REST_SPEED: f32 = 0.1;

/// Knockback velocity of a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnockbackBody {
    /// Fraction of each impulse ignored (0.0 = full knockback, 1.0 = immovable).
    pub resistance: f32,
    /// Speed cap.
    pub max_speed: f32,
    /// How fast velocity decays (per second).
    pub decay: f32,
    velocity: Vec2,
}

impl Default for KnockbackBody {
    fn default() -> Self {
        Self::new(0.0, 10.0, 5.0)
    }
}

impl KnockbackBody {
    /// Create a body at rest.
    #[must_use]
    pub fn new(resistance: f32, max_speed: f32, decay: f32) -> Self {
        Self {
            resistance: resistance.clamp(0.0, 1.0),
            max_speed: max_speed.max(0.0),
            decay: decay.max(0.0),
            velocity: Vec2::ZERO,
        }
    }

    /// Current knockback velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Adds an impulse, scaled by resistance and capped.
    pub fn apply(&mut self, impulse: Vec2) {
        if !impulse.is_finite() {
            return;
        }
        self.velocity += impulse * (1.0 - self.resistance);
        self.velocity = self.velocity.clamp_length_max(self.max_speed);
    }

    /// Decays velocity and returns the displacement for this tick.
    pub fn tick(&mut self, dt: f32) -> Vec2 {
        if self.velocity.length() <= KNOCKBACK_REST_SPEED {
            self.velocity = Vec2::ZERO;
            return Vec2::ZERO;
        }
        let displacement = self.velocity * dt;
        self.velocity = self.velocity.lerp(Vec2::ZERO, (self.decay * dt).min(1.0));
        displacement
    }

    /// Stops immediately (e.g. on hitting a wall).
    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// Closed set of damage-receiving entity variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    /// Player character.
    Player,
    /// Hostile enemy.
    Enemy,
    /// Practice target that regenerates and does not move.
    TrainingDummy,
}

impl CombatantKind {
    /// Default maximum health.
    #[must_use]
    pub const fn base_health(&self) -> f32 {
        match self {
            Self::Player => 100.0,
            Self::Enemy => 50.0,
            Self::TrainingDummy => 500.0,
        }
    }

    /// Post-hit invincibility window.
    #[must_use]
    pub const fn invincibility_duration(&self) -> f32 {
        match self {
            Self::Player => 0.5,
            Self::Enemy => 0.3,
            Self::TrainingDummy => 0.0,
        }
    }

    /// Default knockback body.
    #[must_use]
    pub fn knockback_body(&self) -> KnockbackBody {
        match self {
            Self::Player => KnockbackBody::new(0.0, 12.0, 8.0),
            Self::Enemy => KnockbackBody::new(0.7, 10.0, 5.0),
            Self::TrainingDummy => KnockbackBody::new(1.0, 0.0, 0.0),
        }
    }

    /// Hurtbox collision layer.
    #[must_use]
    pub const fn layer(&self) -> CollisionLayer::Flags {
        match self {
            Self::Player => CollisionLayer::PLAYER,
            Self::Enemy | Self::TrainingDummy => CollisionLayer::ENEMY,
        }
    }

    /// Default faction.
    #[must_use]
    pub const fn faction(&self) -> FactionId {
        match self {
            Self::Player => FactionId::PLAYER,
            Self::Enemy => FactionId::MONSTERS,
            Self::TrainingDummy => FactionId::NEUTRAL,
        }
    }

    /// Hurtbox radius.
    #[must_use]
    pub const fn hurt_radius(&self) -> f32 {
        match self {
            Self::Player => 0.3,
            Self::Enemy | Self::TrainingDummy => 0.25,
        }
    }
}

/// Stock damage-receiving entity.
#[derive(Debug)]
pub struct Combatant {
    id: EntityId,
    kind: CombatantKind,
    /// World position.
    pub position: Vec2,
    /// Health pool.
    pub health: Health,
    /// Knockback state.
    pub knockback: KnockbackBody,
    /// Hurtbox used by hit detection.
    pub hurtbox: Hurtbox,
    /// Multiplier applied to every incoming hit.
    pub damage_taken_multiplier: f32,
    /// Defensive modifiers (evasion, block, armor) run on every incoming hit.
    pub defense: DamagePipeline,
}

impl Combatant {
    /// Create a combatant with the presets of its kind.
    #[must_use]
    pub fn new(id: EntityId, kind: CombatantKind, position: Vec2) -> Self {
        let mut health =
            Health::new(kind.base_health()).with_invincibility(kind.invincibility_duration());
        if kind == CombatantKind::TrainingDummy {
            health = health.with_regeneration(50.0, 3.0);
        }

        Self {
            id,
            kind,
            position,
            health,
            knockback: kind.knockback_body(),
            hurtbox: Hurtbox::new(id, kind.layer(), kind.hurt_radius()).with_faction(kind.faction()),
            damage_taken_multiplier: 1.0,
            defense: DamagePipeline::new(),
        }
    }

    /// Replace the health pool.
    #[must_use]
    pub fn with_health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    /// Replace the knockback body.
    #[must_use]
    pub fn with_knockback(mut self, knockback: KnockbackBody) -> Self {
        self.knockback = knockback;
        self
    }

    /// Replace the defensive pipeline.
    #[must_use]
    pub fn with_defense(mut self, defense: DamagePipeline) -> Self {
        self.defense = defense;
        self
    }

    /// Entity variant.
    #[must_use]
    pub const fn kind(&self) -> CombatantKind {
        self.kind
    }

    /// Advances timers and integrates knockback movement.
    pub fn tick(&mut self, dt: f32) {
        self.health.tick(dt);
        self.position += self.knockback.tick(dt);
    }

    /// Bring a dead combatant back at `position`.
    pub fn respawn(&mut self, position: Vec2, invincibility: f32) {
        self.health.reset();
        self.health.grant_invincibility(invincibility);
        self.knockback.stop();
        self.position = position;
        debug!("{} respawned at {}", self.id, position);
    }
}

impl Damageable for Combatant {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    fn is_invincible(&self) -> bool {
        self.health.is_invincible()
    }

    fn take_damage(&mut self, amount: f32) -> DamageReport {
        let report = self.health.take_damage(amount);
        debug!(
            "{} took {:.1} damage, health {:.1}/{:.1}",
            self.id,
            report.applied,
            report.remaining,
            self.health.max()
        );
        report
    }

    fn apply_knockback(&mut self, impulse: Vec2) {
        self.knockback.apply(impulse);
    }

    fn begin_invincibility(&mut self) {
        self.health.begin_invincibility();
    }

    fn damage_taken_multiplier(&self) -> f32 {
        self.damage_taken_multiplier
    }

    fn defend(&mut self, ctx: &HitContext<'_>, hit: PendingHit) -> Verdict {
        self.defense.apply(ctx, hit)
    }
}
