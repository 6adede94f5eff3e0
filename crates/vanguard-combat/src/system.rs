//! Combat system manager.
//!
//! Owns one state machine per attacker, the target registry and the event
//! bus, and steps everything once per simulation tick.

use ahash::AHashMap;
use glam::Vec2;
use tracing::debug;

use vanguard_common::{EntityId, GameTime, SimClock};

use crate::config::CombatConfig;
use crate::damageable::Damageable;
use crate::definition::{AttackDefinition, DefinitionError};
use crate::events::{CombatEvent, CombatEventBus, EventHandler};
use crate::hitbox::{Hurtbox, TargetFilter};
use crate::timing::{AttackStateMachine, StartOutcome};
use crate::world::TargetRegistry;

/// Manages attackers and targets of one simulation.
#[derive(Debug)]
pub struct CombatSystem<T> {
    config: CombatConfig,
    clock: SimClock,
    bus: CombatEventBus,
    attackers: AHashMap<EntityId, AttackStateMachine>,
    registry: TargetRegistry<T>,
}

impl<T: Damageable> CombatSystem<T> {
    /// Create an empty system.
    #[must_use]
    pub fn new(config: CombatConfig) -> Self {
        Self {
            bus: CombatEventBus::new(config.event_capacity),
            config,
            clock: SimClock::new(),
            attackers: AHashMap::new(),
            registry: TargetRegistry::new(),
        }
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Current simulation time.
    #[must_use]
    pub const fn now(&self) -> GameTime {
        self.clock.now()
    }

    /// Event bus.
    #[must_use]
    pub const fn bus(&self) -> &CombatEventBus {
        &self.bus
    }

    /// Drains pending combat events.
    pub fn drain_events(&self) -> Vec<CombatEvent> {
        self.bus.drain()
    }

    /// Drains pending combat events into handlers.
    pub fn dispatch_events(&self, handlers: &mut [&mut dyn EventHandler]) -> usize {
        self.bus.dispatch(handlers)
    }

    /// Target registry.
    #[must_use]
    pub const fn registry(&self) -> &TargetRegistry<T> {
        &self.registry
    }

    /// Target registry, mutably.
    pub fn registry_mut(&mut self) -> &mut TargetRegistry<T> {
        &mut self.registry
    }

    /// Register a damageable entity.
    pub fn spawn_target(&mut self, target: T, hurtbox: Hurtbox) -> EntityId {
        let id = target.entity_id();
        self.registry.insert(target, hurtbox);
        id
    }

    /// Give `owner` an attack.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `definition` is malformed.
    pub fn add_attacker(
        &mut self,
        owner: EntityId,
        definition: AttackDefinition,
        filter: TargetFilter,
    ) -> Result<&mut AttackStateMachine, DefinitionError> {
        let mut machine = AttackStateMachine::new(owner, definition, &self.config, self.bus.sink())?
            .with_filter(filter)
            .with_start_time(self.clock.now());
        if let Some(position) = self.registry.get(owner).map(Damageable::position) {
            machine.set_origin(position);
        }

        debug!("{owner} equipped {:?}", machine.definition().name);
        self.attackers.remove(&owner);
        Ok(self.attackers.entry(owner).or_insert(machine))
    }

    /// Remove an attacker's state machine.
    pub fn remove_attacker(&mut self, owner: EntityId) -> Option<AttackStateMachine> {
        self.attackers.remove(&owner)
    }

    /// State machine of an attacker.
    #[must_use]
    pub fn attacker(&self, owner: EntityId) -> Option<&AttackStateMachine> {
        self.attackers.get(&owner)
    }

    /// State machine of an attacker, mutably.
    pub fn attacker_mut(&mut self, owner: EntityId) -> Option<&mut AttackStateMachine> {
        self.attackers.get_mut(&owner)
    }

    /// Request an attack. `None` if `owner` has no attack.
    pub fn start_attack(&mut self, owner: EntityId, direction: Vec2) -> Option<StartOutcome> {
        let machine = self.attackers.get_mut(&owner)?;
        Some(machine.start_attack(direction))
    }

    /// Interrupt an attack (e.g. on dash or stagger).
    pub fn cancel_attack(&mut self, owner: EntityId) -> bool {
        self.attackers
            .get_mut(&owner)
            .is_some_and(AttackStateMachine::cancel)
    }

    /// Forward the animation hit-frame callback.
    pub fn hit_signal(&mut self, owner: EntityId) -> usize {
        match self.attackers.get_mut(&owner) {
            Some(machine) => machine.on_external_hit_signal(&mut self.registry),
            None => 0,
        }
    }

    /// Forward the animation completion callback.
    pub fn complete_signal(&mut self, owner: EntityId) -> bool {
        self.attackers
            .get_mut(&owner)
            .is_some_and(AttackStateMachine::on_attack_complete_signal)
    }

    /// Check if an entity is mid-attack.
    #[must_use]
    pub fn is_attacking(&self, owner: EntityId) -> bool {
        self.attackers
            .get(&owner)
            .is_some_and(AttackStateMachine::is_attacking)
    }

    /// Step every attacker by `dt`, in entity ID order.
    pub fn tick(&mut self, dt: f32) -> f32 {
        let dt = self.clock.advance(dt);

        let mut owners: Vec<EntityId> = self.attackers.keys().copied().collect();
        owners.sort_unstable();

        for owner in owners {
            if let Some(machine) = self.attackers.get_mut(&owner) {
                machine.advance(dt, &mut self.registry);
            }
        }
        dt
    }
}
