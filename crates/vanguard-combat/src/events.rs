//! Combat event bus.
//!
//! The engine publishes what happened; presentation code (sound, particles,
//! floating numbers) drains the bus once per frame. Nothing in the engine
//! reads events back.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use vanguard_common::{EntityId, GameTime};

use crate::mitigation::AvoidReason;
use crate::phase::AttackPhase;
use crate::resolution::DamageEvent;

/// Event types that can be sent through the combat bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An attack left Idle.
    AttackStarted {
        /// Attacking entity
        attacker: EntityId,
        /// Attack definition ID
        attack_id: u32,
        /// Normalized attack direction
        direction: Vec2,
        /// Simulation time of the start
        time: GameTime,
    },
    /// Hit volumes were enabled.
    HitboxesEnabled {
        /// Attacking entity
        attacker: EntityId,
    },
    /// A hit landed.
    DamageApplied(DamageEvent),
    /// A hit was evaded or blocked.
    HitAvoided {
        /// Attacking entity
        attacker: EntityId,
        /// Entity that avoided the hit
        target: EntityId,
        /// How the hit was avoided
        reason: AvoidReason,
    },
    /// An entity's health reached zero.
    EntityDied {
        /// Entity that died
        entity: EntityId,
        /// Entity that dealt the final hit
        killer: Option<EntityId>,
    },
    /// An activation ended without striking anything.
    AttackMissed {
        /// Attacking entity
        attacker: EntityId,
    },
    /// An attack returned to Idle normally.
    AttackCompleted {
        /// Attacking entity
        attacker: EntityId,
    },
    /// An attack was interrupted.
    AttackCancelled {
        /// Attacking entity
        attacker: EntityId,
        /// Phase the attack was in
        phase: AttackPhase,
    },
    /// The watchdog forced an attack back to Idle.
    FailsafeTripped {
        /// Attacking entity
        attacker: EntityId,
        /// Phase the attack was stuck in
        phase: AttackPhase,
    },
}

impl CombatEvent {
    /// Entity the event is primarily about.
    #[must_use]
    pub fn subject(&self) -> EntityId {
        match self {
            Self::AttackStarted { attacker, .. }
            | Self::HitboxesEnabled { attacker }
            | Self::HitAvoided { attacker, .. }
            | Self::AttackMissed { attacker }
            | Self::AttackCompleted { attacker }
            | Self::AttackCancelled { attacker, .. }
            | Self::FailsafeTripped { attacker, .. } => *attacker,
            Self::DamageApplied(event) => event.source,
            Self::EntityDied { entity, .. } => *entity,
        }
    }
}

/// Publishing half of the bus, held by state machines and resolvers.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Option<Sender<CombatEvent>>,
}

impl EventSink {
    /// A sink that drops everything.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self { sender: None }
    }

    /// Publishes an event. Never blocks; if the bus is full the event is dropped.
    pub fn publish(&self, event: CombatEvent) {
        if let Some(sender) = &self.sender {
            if sender.try_send(event).is_err() {
                trace!("Combat event dropped (bus full or closed)");
            }
        }
    }
}

/// Event bus for broadcasting combat events to the presentation layer.
#[derive(Debug)]
pub struct CombatEventBus {
    /// Sender for broadcasting events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for CombatEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl CombatEventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: CombatEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Creates a publishing handle.
    #[must_use]
    pub fn sink(&self) -> EventSink {
        EventSink {
            sender: Some(self.sender.clone()),
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Drains pending events into each handler, in publish order.
    pub fn dispatch(&self, handlers: &mut [&mut dyn EventHandler]) -> usize {
        let mut count = 0;
        while let Ok(event) = self.receiver.try_recv() {
            for handler in handlers.iter_mut() {
                handler.handle(&event);
            }
            count += 1;
        }
        count
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer of combat events.
pub trait EventHandler {
    /// Handles an event.
    fn handle(&mut self, event: &CombatEvent);
}

/// Handler that keeps every event it sees.
#[derive(Debug, Default)]
pub struct EventLog {
    /// Recorded events, oldest first
    pub events: Vec<CombatEvent>,
}

impl EventHandler for EventLog {
    fn handle(&mut self, event: &CombatEvent) {
        self.events.push(event.clone());
    }
}
