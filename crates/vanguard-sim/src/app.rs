//! Scripted duel.
//!
//! A player, an enemy and a training dummy share one combat system. The
//! player swings whenever the enemy is in reach; the enemy walks in and
//! bites, driving its attack through the animation callbacks the way a
//! client would. Frame deltas are jittered and fed through a fixed-step
//! accumulator.

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::{debug, info};

use vanguard_combat::{
    AttackDefinition, AttackLibrary, AttackPhase, CollisionLayer, CombatSystem, Combatant,
    CombatantKind, CriticalStrike, DamagePipeline, Damageable, EvasionChance, TargetFilter,
    TimingMode,
};
use vanguard_common::{EntityId, EntityIdAllocator, GameTime};

use crate::combat_events::{CombatEventHandler, CombatStats};
use crate::config::SimConfig;
use crate::timing::FixedStep;

/// Where the enemy's hit frame sits in its Active phase.
const HIT_FRAME: f32 = 0.5;

/// How a duel ended.
#[derive(Debug, Clone)]
pub struct DuelOutcome {
    /// Simulated seconds.
    pub elapsed: GameTime,
    /// Fixed steps taken.
    pub ticks: u64,
    /// Survivor, if the other side died.
    pub winner: Option<EntityId>,
    /// Player ID.
    pub player: EntityId,
    /// Enemy ID.
    pub enemy: EntityId,
    /// Player health at the end.
    pub player_health: f32,
    /// Enemy health at the end.
    pub enemy_health: f32,
    /// Player statistics.
    pub player_stats: CombatStats,
    /// Enemy statistics.
    pub enemy_stats: CombatStats,
}

impl DuelOutcome {
    /// One-line result.
    #[must_use]
    pub fn summary(&self) -> String {
        let result = match self.winner {
            Some(winner) if winner == self.player => "player wins".to_string(),
            Some(winner) => format!("{winner} wins"),
            None => "draw".to_string(),
        };
        format!(
            "{result}; player {:.0} hp, {}/{} hits ({} crits); enemy {:.0} hp, {}/{} hits, {} failsafe trips",
            self.player_health,
            self.player_stats.hits_landed,
            self.player_stats.attacks_made,
            self.player_stats.critical_hits,
            self.enemy_health,
            self.enemy_stats.hits_landed,
            self.enemy_stats.attacks_made,
            self.enemy_stats.failsafe_trips,
        )
    }
}

/// A running duel.
pub struct Duel {
    config: SimConfig,
    system: CombatSystem<Combatant>,
    handler: CombatEventHandler,
    step: FixedStep,
    rng: fastrand::Rng,
    player: EntityId,
    enemy: EntityId,
    dummy: EntityId,
}

impl Duel {
    /// Set up the arena with attacks taken from `library`.
    pub fn new(config: &SimConfig, library: &AttackLibrary) -> Result<Self> {
        let player_attack = lookup(library, &config.player_attack)?;
        let enemy_attack = lookup(library, &config.enemy_attack)?;

        let mut ids = EntityIdAllocator::new();
        let mut system = CombatSystem::new(config.combat.clone());

        let footwork = DamagePipeline::new().with(EvasionChance::new(
            config.evade_chance,
            config.seed.wrapping_add(1),
        ));
        let player = spawn(
            &mut system,
            Combatant::new(ids.allocate(), CombatantKind::Player, Vec2::ZERO).with_defense(footwork),
        );
        let enemy = spawn(
            &mut system,
            Combatant::new(ids.allocate(), CombatantKind::Enemy, Vec2::new(2.0, 0.0)),
        );
        let dummy = spawn(
            &mut system,
            Combatant::new(ids.allocate(), CombatantKind::TrainingDummy, Vec2::new(0.6, 0.6)),
        );

        system
            .add_attacker(player, player_attack, TargetFilter::new(CollisionLayer::ENEMY))
            .context("player attack")?
            .pipeline_mut()
            .push(CriticalStrike::new(
                config.crit_chance,
                CriticalStrike::DEFAULT_MULTIPLIER,
                config.seed,
            ));
        system
            .add_attacker(enemy, enemy_attack, TargetFilter::new(CollisionLayer::PLAYER))
            .context("enemy attack")?;

        info!("Duel ready: player {player}, enemy {enemy}, dummy {dummy}");

        Ok(Self {
            step: FixedStep::new(config.fixed_dt, config.max_frame_dt),
            rng: fastrand::Rng::with_seed(config.seed),
            config: config.clone(),
            system,
            handler: CombatEventHandler::new(),
            player,
            enemy,
            dummy,
        })
    }

    /// Combat system, for inspection.
    #[must_use]
    pub const fn system(&self) -> &CombatSystem<Combatant> {
        &self.system
    }

    /// Training dummy ID.
    #[must_use]
    pub const fn dummy(&self) -> EntityId {
        self.dummy
    }

    /// Event statistics so far.
    #[must_use]
    pub const fn events(&self) -> &CombatEventHandler {
        &self.handler
    }

    /// True once either duelist is dead or time is up.
    #[must_use]
    pub fn is_over(&self) -> bool {
        !self.alive(self.player)
            || !self.alive(self.enemy)
            || self.system.now() >= f64::from(self.config.duration)
    }

    /// Feed one frame delta. Returns the number of steps simulated.
    pub fn frame(&mut self, dt: f32) -> u32 {
        let steps = self.step.accumulate(dt);
        let fixed_dt = self.step.fixed_dt();
        let mut taken = 0;
        for _ in 0..steps {
            if self.is_over() {
                break;
            }
            self.tick(fixed_dt);
            taken += 1;
        }
        taken
    }

    /// Run to the end with jittered frame deltas.
    pub fn run(mut self) -> DuelOutcome {
        let base = self.config.fixed_dt;
        let jitter = self.config.frame_jitter;
        while !self.is_over() {
            let dt = base * (1.0 + jitter * (self.rng.f32() * 2.0 - 1.0));
            self.frame(dt);
        }
        self.outcome()
    }

    /// Result so far.
    #[must_use]
    pub fn outcome(&self) -> DuelOutcome {
        let winner = match (self.alive(self.player), self.alive(self.enemy)) {
            (true, false) => Some(self.player),
            (false, true) => Some(self.enemy),
            _ => None,
        };
        DuelOutcome {
            elapsed: self.system.now(),
            ticks: self.step.steps(),
            winner,
            player: self.player,
            enemy: self.enemy,
            player_health: self.health(self.player),
            enemy_health: self.health(self.enemy),
            player_stats: self.handler.stats(self.player),
            enemy_stats: self.handler.stats(self.enemy),
        }
    }

    fn tick(&mut self, dt: f32) {
        self.drive_player();
        self.drive_enemy(dt);

        self.system.tick(dt);
        for combatant in self.system.registry_mut().iter_mut() {
            combatant.tick(dt);
        }
        self.system.dispatch_events(&mut [&mut self.handler]);
    }

    fn drive_player(&mut self) {
        if !self.stand_down(self.player) {
            return;
        }
        let Some(machine) = self.system.attacker(self.player) else {
            return;
        };
        let reach = machine.definition().range + CombatantKind::Enemy.hurt_radius();
        let to_enemy = self.position(self.enemy) - self.position(self.player);
        if machine.can_attack() && to_enemy.length() <= reach {
            self.system.start_attack(self.player, to_enemy);
        }
    }

    fn drive_enemy(&mut self, dt: f32) {
        if !self.stand_down(self.enemy) {
            return;
        }
        let Some(machine) = self.system.attacker(self.enemy) else {
            return;
        };
        let definition: &AttackDefinition = machine.definition();
        let signal_driven = definition.timing_mode == TimingMode::SignalDriven;
        let range = definition.range;
        let phase = machine.current_phase();
        let progress = machine.phase_progress();
        let can_attack = machine.can_attack();

        let to_player = self.position(self.player) - self.position(self.enemy);

        match phase {
            AttackPhase::Idle if to_player.length() > range => {
                let stride = to_player.normalize_or_zero() * self.config.enemy_speed * dt;
                if let Some(enemy) = self.system.registry_mut().get_mut(self.enemy) {
                    enemy.position += stride;
                }
            },
            AttackPhase::Idle if can_attack => {
                self.system.start_attack(self.enemy, to_player);
            },
            AttackPhase::Active if signal_driven && progress >= HIT_FRAME => {
                self.system.hit_signal(self.enemy);
            },
            AttackPhase::Recovery
                if signal_driven && progress >= 1.0 && !self.config.drop_completion_signals =>
            {
                self.system.complete_signal(self.enemy);
            },
            _ => {},
        }
    }

    /// Cancels the attack of a dead duelist. Returns true if it may act.
    fn stand_down(&mut self, entity: EntityId) -> bool {
        if self.alive(entity) {
            return true;
        }
        if self.system.cancel_attack(entity) {
            debug!("{entity} is dead, attack cancelled");
        }
        false
    }

    fn alive(&self, entity: EntityId) -> bool {
        self.system
            .registry()
            .get(entity)
            .is_some_and(Damageable::is_alive)
    }

    fn position(&self, entity: EntityId) -> Vec2 {
        self.system
            .registry()
            .get(entity)
            .map_or(Vec2::ZERO, |c| c.position)
    }

    fn health(&self, entity: EntityId) -> f32 {
        self.system
            .registry()
            .get(entity)
            .map_or(0.0, |c| c.health.current())
    }
}

fn lookup(library: &AttackLibrary, name: &str) -> Result<AttackDefinition> {
    library
        .get_by_name(name)
        .cloned()
        .with_context(|| format!("attack {name:?} not found"))
}

fn spawn(system: &mut CombatSystem<Combatant>, combatant: Combatant) -> EntityId {
    let hurtbox = combatant.hurtbox;
    system.spawn_target(combatant, hurtbox)
}

/// Load the attack library and run a duel to completion.
pub fn run(config: &SimConfig) -> Result<DuelOutcome> {
    let mut library = AttackLibrary::new();
    let count = library
        .load_dir(&config.attacks_path)
        .with_context(|| format!("loading attacks from {}", config.attacks_path.display()))?;
    info!("{count} attacks available");

    let duel = Duel::new(config, &library)?;
    Ok(duel.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ATTACKS: &str = r#"
        version = "1.0.0"

        [[attacks]]
        id = 1
        name = "Slash"
        damage = 10.0
        range = 0.5
        attack_rate = 2.0
        windup_time = 0.1
        active_time = 0.2
        recovery_time = 0.2

        [[attacks]]
        id = 2
        name = "Bite"
        damage = 8.0
        range = 0.6
        attack_rate = 1.0
        windup_time = 0.3
        active_time = 0.15
        recovery_time = 0.35
        has_knockback = true
        knockback_force = 3.0
        timing_mode = "signal_driven"
    "#;

    fn library() -> AttackLibrary {
        let mut library = AttackLibrary::new();
        library.load_str(ATTACKS).expect("valid attacks");
        library
    }

    fn base_config() -> SimConfig {
        SimConfig {
            duration: 6.0,
            crit_chance: 0.0,
            evade_chance: 0.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_duel_runs_to_an_end() {
        let config = base_config();
        let outcome = Duel::new(&config, &library()).expect("duel").run();

        assert!(outcome.elapsed <= f64::from(config.duration + config.fixed_dt) + 1e-6);
        assert!(outcome.player_stats.attacks_made > 0);
        assert!(outcome.enemy_stats.attacks_made > 0);
        assert_eq!(outcome.enemy_stats.failsafe_trips, 0);
        assert!((50.0 - outcome.enemy_health - outcome.enemy_stats.damage_taken as f32).abs() < 1e-3);
        assert!(!outcome.summary().is_empty());
    }

    #[test]
    fn test_dropped_completion_recovered_by_failsafe() {
        let config = SimConfig {
            drop_completion_signals: true,
            ..base_config()
        };
        let outcome = Duel::new(&config, &library()).expect("duel").run();

        assert!(outcome.enemy_stats.attacks_made > 0);
        assert!(outcome.enemy_stats.failsafe_trips > 0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let config = SimConfig {
            crit_chance: 0.5,
            evade_chance: 0.3,
            ..base_config()
        };
        let a = Duel::new(&config, &library()).expect("duel").run();
        let b = Duel::new(&config, &library()).expect("duel").run();
        assert_eq!(a.ticks, b.ticks);
        assert_eq!(a.player_stats, b.player_stats);
        assert_eq!(a.enemy_stats, b.enemy_stats);
    }

    #[test]
    fn test_player_footwork_dodges_every_bite() {
        let config = SimConfig {
            evade_chance: 1.0,
            ..base_config()
        };
        let outcome = Duel::new(&config, &library()).expect("duel").run();

        assert_eq!(outcome.player_health, 100.0);
        assert_eq!(outcome.enemy_stats.hits_landed, 0);
        assert_eq!(outcome.player_stats.damage_taken, 0.0);
        assert_eq!(outcome.enemy_stats.evades, 0);
    }

    #[test]
    fn test_unknown_attack_is_an_error() {
        let config = SimConfig {
            enemy_attack: "Tail Whip".to_string(),
            ..base_config()
        };
        assert!(Duel::new(&config, &library()).is_err());
    }

    #[test]
    fn test_run_loads_attack_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("duel.toml"), ATTACKS).expect("write");

        let loaded = SimConfig {
            attacks_path: temp_dir.path().to_path_buf(),
            duration: 1.0,
            ..base_config()
        };
        let outcome = run(&loaded).expect("duel runs");
        assert!(outcome.ticks > 0);

        let missing = SimConfig {
            attacks_path: temp_dir.path().join("missing"),
            ..base_config()
        };
        assert!(run(&missing).is_err());
    }
}
