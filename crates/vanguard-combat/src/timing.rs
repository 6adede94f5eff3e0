//! Attack timing state machine.
//!
//! One `AttackStateMachine` per attacking entity drives the cycle
//! Idle -> Windup -> Active -> Recovery -> Idle. It owns the entity's hit
//! volume, hit resolution and failsafe, and talks to the rest of the
//! simulation only through a `CombatWorld` and the event sink.
//!
//! Externally triggered actions (start, cancel, animation callbacks) are
//! idempotent: late, early or repeated calls are ignored.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use vanguard_common::{EntityId, GameTime, SimClock};

use crate::config::CombatConfig;
use crate::definition::{AttackDefinition, DefinitionError, TimingMode};
use crate::events::{CombatEvent, EventSink};
use crate::failsafe::FailsafeSupervisor;
use crate::hitbox::{ContactCandidate, ContactVerdict, HitVolume, HitboxActivation, TargetFilter};
use crate::mitigation::DamagePipeline;
use crate::phase::AttackPhase;
use crate::resolution::{HitOrigin, HitResolution};
use crate::world::CombatWorld;

// ============================================================================
// Runtime state
// ============================================================================

/// Runtime attack state of one entity. Created once and reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackInstance {
    /// Current phase.
    pub phase: AttackPhase,
    /// Seconds spent in the current phase.
    pub phase_elapsed: f32,
    /// Unit attack direction. Kept when a request has no direction.
    pub direction: Vec2,
    /// When the last attack started.
    pub last_attack_start_time: Option<GameTime>,
    /// Whether the current activation has landed a hit.
    pub has_dealt_damage_this_activation: bool,
    /// Hits landed by the current activation.
    pub hits_this_activation: u32,
    /// Whether the external hit signal was used this activation.
    pub external_signal_consumed: bool,
}

impl AttackInstance {
    /// Idle instance facing `direction`.
    #[must_use]
    pub fn new(direction: Vec2) -> Self {
        Self {
            phase: AttackPhase::Idle,
            phase_elapsed: 0.0,
            direction: direction.try_normalize().unwrap_or(Vec2::X),
            last_attack_start_time: None,
            has_dealt_damage_this_activation: false,
            hits_this_activation: 0,
            external_signal_consumed: false,
        }
    }

    fn reset_activation(&mut self) {
        self.has_dealt_damage_this_activation = false;
        self.hits_this_activation = 0;
        self.external_signal_consumed = false;
    }
}

/// Why `start_attack` refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// An attack is already in progress.
    Busy {
        /// Phase of the running attack.
        phase: AttackPhase,
    },
    /// The attack interval has not elapsed since the last start.
    CoolingDown {
        /// Seconds until the next attack may start.
        remaining: f32,
    },
}

/// Result of `start_attack`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StartOutcome {
    /// The attack entered Windup.
    Started,
    /// Nothing changed.
    Rejected {
        /// Why.
        reason: RejectReason,
    },
}

impl StartOutcome {
    /// Check if the attack started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Phase state machine of one attacking entity.
#[derive(Debug)]
pub struct AttackStateMachine {
    owner: EntityId,
    definition: AttackDefinition,
    instance: AttackInstance,
    hitbox: HitboxActivation,
    resolver: HitResolution,
    failsafe: FailsafeSupervisor,
    sink: EventSink,
    clock: SimClock,
    origin: Vec2,
    safety_margin: f32,
    time_epsilon: f32,
}

impl AttackStateMachine {
    /// Create an idle state machine.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `definition` is malformed.
    pub fn new(
        owner: EntityId,
        definition: AttackDefinition,
        config: &CombatConfig,
        sink: EventSink,
    ) -> Result<Self, DefinitionError> {
        definition.validate()?;

        Ok(Self {
            owner,
            hitbox: HitboxActivation::new(
                owner,
                TargetFilter::default(),
                definition.allow_multiple_hits,
            ),
            definition,
            instance: AttackInstance::new(config.default_direction),
            resolver: HitResolution::new(sink.clone()),
            failsafe: FailsafeSupervisor::new(),
            sink,
            clock: SimClock::new(),
            origin: Vec2::ZERO,
            safety_margin: config.safety_margin.max(0.0),
            time_epsilon: config.time_epsilon.max(0.0),
        })
    }

    /// Restrict which hurtboxes this attacker can strike.
    #[must_use]
    pub fn with_filter(mut self, filter: TargetFilter) -> Self {
        self.hitbox.set_filter(filter);
        self
    }

    /// Start the local clock at `now` (for machines created mid-simulation).
    #[must_use]
    pub fn with_start_time(mut self, now: GameTime) -> Self {
        self.clock = SimClock::starting_at(now);
        self
    }

    /// Install a mitigation pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: DamagePipeline) -> Self {
        self.resolver = HitResolution::new(self.sink.clone()).with_pipeline(pipeline);
        self
    }

    /// Attacking entity.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Attack parameters.
    #[must_use]
    pub const fn definition(&self) -> &AttackDefinition {
        &self.definition
    }

    /// Runtime state.
    #[must_use]
    pub const fn instance(&self) -> &AttackInstance {
        &self.instance
    }

    /// Hit volume lifecycle.
    #[must_use]
    pub const fn hitbox(&self) -> &HitboxActivation {
        &self.hitbox
    }

    /// Watchdog.
    #[must_use]
    pub const fn failsafe(&self) -> &FailsafeSupervisor {
        &self.failsafe
    }

    /// Mitigation pipeline, for installing modifiers.
    pub fn pipeline_mut(&mut self) -> &mut DamagePipeline {
        self.resolver.pipeline_mut()
    }

    /// Local simulation time.
    #[must_use]
    pub const fn now(&self) -> GameTime {
        self.clock.now()
    }

    /// Attacker position used to place the volume.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Set the attacker position. `advance` refreshes it from the world when
    /// the world knows the attacker.
    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    // ---- queries -----------------------------------------------------------

    /// Check if an attack is in progress.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.instance.phase.is_attacking()
    }

    /// Current phase.
    #[must_use]
    pub const fn current_phase(&self) -> AttackPhase {
        self.instance.phase
    }

    /// Unit attack direction.
    #[must_use]
    pub const fn direction(&self) -> Vec2 {
        self.instance.direction
    }

    /// Progress through the current phase (0.0-1.0). Idle reports 0.
    #[must_use]
    pub fn phase_progress(&self) -> f32 {
        if self.instance.phase == AttackPhase::Idle {
            return 0.0;
        }
        let duration = self.definition.timing().duration_of(self.instance.phase);
        if duration <= 0.0 {
            1.0
        } else {
            (self.instance.phase_elapsed / duration).clamp(0.0, 1.0)
        }
    }

    /// Seconds until the attack interval has elapsed since the last start.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        let Some(started) = self.instance.last_attack_start_time else {
            return 0.0;
        };
        let since = self.clock.now() - started;
        let interval = f64::from(self.definition.attack_interval());
        if since + f64::from(self.time_epsilon) >= interval {
            0.0
        } else {
            (interval - since) as f32
        }
    }

    /// Idle and past the cooldown.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.instance.phase == AttackPhase::Idle && self.cooldown_remaining() <= 0.0
    }

    // ---- commands ----------------------------------------------------------

    /// Starts an attack toward `direction`. A zero direction reuses the last
    /// one.
    pub fn start_attack(&mut self, direction: Vec2) -> StartOutcome {
        if self.instance.phase != AttackPhase::Idle {
            debug!(
                "{} attack rejected: already in {}",
                self.owner, self.instance.phase
            );
            return StartOutcome::Rejected {
                reason: RejectReason::Busy {
                    phase: self.instance.phase,
                },
            };
        }

        let remaining = self.cooldown_remaining();
        if remaining > 0.0 {
            debug!(
                "{} attack rejected: cooling down ({remaining:.3}s left)",
                self.owner
            );
            return StartOutcome::Rejected {
                reason: RejectReason::CoolingDown { remaining },
            };
        }

        if let Some(direction) = direction.try_normalize() {
            self.instance.direction = direction;
        }

        let now = self.clock.now();
        self.instance.phase = AttackPhase::Windup;
        self.instance.phase_elapsed = 0.0;
        self.instance.last_attack_start_time = Some(now);
        self.instance.reset_activation();

        self.hitbox.position(HitVolume::for_attack(
            &self.definition,
            self.origin,
            self.instance.direction,
        ));

        let deadline = now
            + f64::from(self.definition.total_duration())
            + f64::from(self.safety_margin);
        self.failsafe.arm(deadline);

        debug!(
            "{} started {:?} toward {}",
            self.owner, self.definition.name, self.instance.direction
        );
        self.sink.publish(CombatEvent::AttackStarted {
            attacker: self.owner,
            attack_id: self.definition.id,
            direction: self.instance.direction,
            time: now,
        });

        StartOutcome::Started
    }

    /// Advances the attack by `dt` seconds. Negative or non-finite deltas
    /// count as zero.
    pub fn advance<W: CombatWorld>(&mut self, dt: f32, world: &mut W) {
        let dt = self.clock.advance(dt);
        if let Some(position) = world.position_of(self.owner) {
            self.origin = position;
        }

        if self.instance.phase == AttackPhase::Idle {
            return;
        }

        self.instance.phase_elapsed += dt;
        let mut entered_active = false;

        loop {
            let phase = self.instance.phase;
            if phase == AttackPhase::Idle {
                break;
            }
            if phase == AttackPhase::Recovery
                && self.definition.timing_mode == TimingMode::SignalDriven
            {
                break;
            }

            let duration = self.definition.timing().duration_of(phase);
            if self.instance.phase_elapsed + self.time_epsilon < duration {
                break;
            }

            // Overshoot carries into the next phase; total length must not depend on dt.
            self.instance.phase_elapsed = (self.instance.phase_elapsed - duration).max(0.0);
            let next = phase.next();
            entered_active |= next == AttackPhase::Active;
            self.enter_phase(next, world);
        }

        if self.instance.phase == AttackPhase::Active && !entered_active {
            self.detection_pass(world, false);
        }

        if self.failsafe.poll(self.clock.now()) && self.instance.phase != AttackPhase::Idle {
            self.trip_failsafe();
        }
    }

    /// Animation "hit frame" callback: runs a full detection pass once per
    /// activation. Returns the number of hits landed.
    pub fn on_external_hit_signal<W: CombatWorld>(&mut self, world: &mut W) -> usize {
        if self.instance.phase != AttackPhase::Active {
            trace!("{} hit signal outside active phase ignored", self.owner);
            return 0;
        }
        if self.instance.external_signal_consumed {
            trace!("{} duplicate hit signal ignored", self.owner);
            return 0;
        }
        if self.instance.has_dealt_damage_this_activation && !self.definition.allow_multiple_hits {
            trace!("{} hit signal after landed hit ignored", self.owner);
            return 0;
        }

        self.instance.external_signal_consumed = true;
        self.detection_pass(world, true)
    }

    /// Animation "attack finished" callback. Returns true if it ended the
    /// attack.
    pub fn on_attack_complete_signal(&mut self) -> bool {
        match self.instance.phase {
            AttackPhase::Active | AttackPhase::Recovery => {
                self.end_activation();
                self.finish();
                true
            },
            phase => {
                trace!("{} completion signal in {phase} ignored", self.owner);
                false
            },
        }
    }

    /// Contact reported by an external physics layer. Accepted contacts are
    /// resolved immediately.
    pub fn on_contact<W: CombatWorld>(
        &mut self,
        candidate: &ContactCandidate,
        world: &mut W,
    ) -> ContactVerdict {
        let verdict = self.hitbox.on_contact(candidate);
        if verdict == ContactVerdict::Accepted {
            self.strike(candidate, world);
        }
        verdict
    }

    /// Interrupts the attack. Damage already dealt stands. Returns true if
    /// an attack was running.
    pub fn cancel(&mut self) -> bool {
        let phase = self.instance.phase;
        if phase == AttackPhase::Idle {
            return false;
        }

        self.hitbox.deactivate();
        self.instance.phase = AttackPhase::Idle;
        self.instance.phase_elapsed = 0.0;
        self.failsafe.disarm();

        debug!("{} attack cancelled during {phase}", self.owner);
        self.sink.publish(CombatEvent::AttackCancelled {
            attacker: self.owner,
            phase,
        });
        true
    }

    // ---- internals ---------------------------------------------------------

    fn enter_phase<W: CombatWorld>(&mut self, phase: AttackPhase, world: &mut W) {
        match phase {
            AttackPhase::Windup => self.instance.phase = phase,
            AttackPhase::Active => {
                self.instance.phase = phase;
                self.instance.reset_activation();
                self.hitbox.activate(HitVolume::for_attack(
                    &self.definition,
                    self.origin,
                    self.instance.direction,
                ));
                self.sink.publish(CombatEvent::HitboxesEnabled {
                    attacker: self.owner,
                });
                self.detection_pass(world, true);
            },
            AttackPhase::Recovery => {
                self.instance.phase = phase;
                self.end_activation();
            },
            AttackPhase::Idle => self.finish(),
        }
    }

    fn end_activation(&mut self) {
        if !self.hitbox.is_active() {
            return;
        }
        self.hitbox.deactivate();
        if !self.instance.has_dealt_damage_this_activation {
            debug!("{} attack missed", self.owner);
            self.sink.publish(CombatEvent::AttackMissed {
                attacker: self.owner,
            });
        }
    }

    fn finish(&mut self) {
        self.instance.phase = AttackPhase::Idle;
        self.instance.phase_elapsed = 0.0;
        self.failsafe.disarm();
        trace!("{} attack complete", self.owner);
        self.sink.publish(CombatEvent::AttackCompleted {
            attacker: self.owner,
        });
    }

    fn trip_failsafe(&mut self) {
        let phase = self.instance.phase;
        warn!(
            "{} attack stuck in {phase} past its deadline, forcing idle",
            self.owner
        );
        self.hitbox.deactivate();
        self.instance.phase = AttackPhase::Idle;
        self.instance.phase_elapsed = 0.0;
        self.sink.publish(CombatEvent::FailsafeTripped {
            attacker: self.owner,
            phase,
        });
    }

    fn detection_pass<W: CombatWorld>(&mut self, world: &mut W, full_pass: bool) -> usize {
        if !self.hitbox.is_active() {
            return 0;
        }
        // The volume follows the attacker for the whole Active window.
        let volume = HitVolume::for_attack(&self.definition, self.origin, self.instance.direction);
        self.hitbox.position(volume);

        let overlapping = world.overlapping(&volume);
        let contacts = self.hitbox.contact_events(&overlapping, full_pass);

        let mut landed = 0;
        for candidate in &contacts {
            if self.hitbox.on_contact(candidate) == ContactVerdict::Accepted
                && self.strike(candidate, world)
            {
                landed += 1;
            }
        }
        landed
    }

    fn strike<W: CombatWorld>(&mut self, candidate: &ContactCandidate, world: &mut W) -> bool {
        let hit_point = self
            .hitbox
            .volume()
            .map_or(candidate.position, |v| v.closest_point(candidate.position));
        let origin = HitOrigin {
            attacker: self.owner,
            position: self.origin,
            direction: self.instance.direction,
        };

        let Some(target) = world.target_mut(candidate.entity) else {
            trace!("{} contact with unknown entity {}", self.owner, candidate.entity);
            return false;
        };

        if self
            .resolver
            .resolve(&origin, target, &self.definition, hit_point)
            .is_some()
        {
            self.instance.has_dealt_damage_this_activation = true;
            self.instance.hits_this_activation += 1;
            true
        } else {
            false
        }
    }
}
