//! Hit volumes and per-activation hit tracking.
//!
//! Provides:
//! - Layer-based target filtering
//! - Oriented box and circle hit volumes with overlap tests
//! - Hurtboxes describing how an entity can be struck
//! - `HitboxActivation`, which owns the enable/disable lifecycle and the
//!   hit set of one activation

use ahash::{AHashMap, AHashSet};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use vanguard_common::{EntityId, FactionId};

use crate::definition::AttackDefinition;

/// Collision layer flags for filtering interactions.
#[allow(non_snake_case)]
pub mod CollisionLayer {
    /// Layer flag type.
    pub type Flags = u32;

    /// Player character attacks.
    pub const PLAYER_ATTACK: Flags = 1 << 0;
    /// Enemy attacks.
    pub const ENEMY_ATTACK: Flags = 1 << 1;
    /// Player hurtbox (can be damaged by enemies).
    pub const PLAYER: Flags = 1 << 2;
    /// Enemy hurtbox (can be damaged by the player).
    pub const ENEMY: Flags = 1 << 3;
    /// Destructible props.
    pub const PROP: Flags = 1 << 4;
    /// All layers.
    pub const ALL: Flags = 0xFFFF_FFFF;
    /// No layers.
    pub const NONE: Flags = 0;
}

// ============================================================================
// Filtering
// ============================================================================

/// Decides which hurtboxes a hit volume may strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFilter {
    /// Layers this volume can hit.
    pub layers: CollisionLayer::Flags,
    /// Skip targets of this faction (allies of the attacker).
    pub exclude_faction: Option<FactionId>,
}

impl Default for TargetFilter {
    fn default() -> Self {
        Self::new(CollisionLayer::ALL)
    }
}

impl TargetFilter {
    /// Filter on a layer mask only.
    #[must_use]
    pub const fn new(layers: CollisionLayer::Flags) -> Self {
        Self {
            layers,
            exclude_faction: None,
        }
    }

    /// Also skip members of `faction`.
    #[must_use]
    pub const fn excluding_faction(mut self, faction: FactionId) -> Self {
        self.exclude_faction = Some(faction);
        self
    }

    /// Check if the candidate passes the layer mask and faction rule.
    #[must_use]
    pub fn accepts(&self, candidate: &ContactCandidate) -> bool {
        if self.layers & candidate.layer == 0 {
            return false;
        }
        self.exclude_faction != Some(candidate.faction)
    }
}

// ============================================================================
// Hurtboxes
// ============================================================================

/// Damageable area of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hurtbox {
    /// Top of the entity hierarchy this hurtbox belongs to.
    pub root: EntityId,
    /// Collision layer flags.
    pub layer: CollisionLayer::Flags,
    /// Faction of the entity.
    pub faction: FactionId,
    /// Radius around the entity position.
    pub radius: f32,
    /// Disabled hurtboxes are never reported.
    pub enabled: bool,
}

impl Hurtbox {
    /// Create an enabled hurtbox.
    #[must_use]
    pub const fn new(root: EntityId, layer: CollisionLayer::Flags, radius: f32) -> Self {
        Self {
            root,
            layer,
            faction: FactionId::NEUTRAL,
            radius,
            enabled: true,
        }
    }

    /// Set the faction.
    #[must_use]
    pub const fn with_faction(mut self, faction: FactionId) -> Self {
        self.faction = faction;
        self
    }

    /// Attach to a parent hierarchy (e.g. a summon owned by its caster).
    #[must_use]
    pub const fn with_root(mut self, root: EntityId) -> Self {
        self.root = root;
        self
    }

    /// Build the contact candidate for `entity` standing at `position`.
    #[must_use]
    pub const fn candidate(&self, entity: EntityId, position: Vec2) -> ContactCandidate {
        ContactCandidate {
            entity,
            root: self.root,
            layer: self.layer,
            faction: self.faction,
            position,
            radius: self.radius,
        }
    }
}

/// A hurtbox reported as overlapping a hit volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactCandidate {
    /// Struck entity.
    pub entity: EntityId,
    /// Root of the struck entity's hierarchy.
    pub root: EntityId,
    /// Hurtbox layer.
    pub layer: CollisionLayer::Flags,
    /// Hurtbox faction.
    pub faction: FactionId,
    /// Hurtbox center.
    pub position: Vec2,
    /// Hurtbox radius.
    pub radius: f32,
}

// ============================================================================
// Volumes
// ============================================================================

/// Shape of a hit volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VolumeShape {
    /// Box aligned with the volume direction.
    Box {
        /// Half width (along the direction) and half height.
        half_extents: Vec2,
    },
    /// Circle.
    Circle {
        /// Radius in world units.
        radius: f32,
    },
}

/// A positioned detection volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitVolume {
    /// World-space center.
    pub center: Vec2,
    /// Unit vector the box is rotated to.
    pub direction: Vec2,
    /// Shape.
    pub shape: VolumeShape,
}

impl HitVolume {
    /// Volume of `definition` for an attacker at `origin` facing `direction`.
    ///
    /// Directional attacks place a box `range * positioning_factor` ahead of
    /// the origin; area attacks use a circle centred on the origin.
    #[must_use]
    pub fn for_attack(definition: &AttackDefinition, origin: Vec2, direction: Vec2) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec2::X);
        if definition.is_area_attack {
            Self {
                center: origin,
                direction,
                shape: VolumeShape::Circle {
                    radius: definition.area_radius,
                },
            }
        } else {
            Self {
                center: origin + direction * definition.volume_offset(),
                direction,
                shape: VolumeShape::Box {
                    half_extents: definition.hitbox_size * 0.5,
                },
            }
        }
    }

    /// Rotation angle in radians (0 = +X).
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.direction.y.atan2(self.direction.x)
    }

    /// Point of the volume closest to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let offset = point - self.center;
        match self.shape {
            VolumeShape::Circle { radius } => self.center + offset.clamp_length_max(radius),
            VolumeShape::Box { half_extents } => {
                let across = self.direction.perp();
                let along_dist = offset.dot(self.direction).clamp(-half_extents.x, half_extents.x);
                let across_dist = offset.dot(across).clamp(-half_extents.y, half_extents.y);
                self.center + self.direction * along_dist + across * across_dist
            },
        }
    }

    /// Check if a circle at `point` with `radius` overlaps the volume.
    #[must_use]
    pub fn contains(&self, point: Vec2, radius: f32) -> bool {
        let radius = radius.max(0.0);
        match self.shape {
            VolumeShape::Circle { radius: own } => point.distance(self.center) <= own + radius,
            VolumeShape::Box { .. } => point.distance(self.closest_point(point)) <= radius,
        }
    }
}

// ============================================================================
// Hit tracking
// ============================================================================

/// Targets struck during the current activation.
#[derive(Debug, Clone, Default)]
pub struct HitSet {
    hits: AHashMap<EntityId, u32>,
}

impl HitSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every target.
    pub fn clear(&mut self) {
        self.hits.clear();
    }

    /// Check if a target was already struck.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.hits.contains_key(&entity)
    }

    /// Record a strike, returning how many times the target has been hit.
    pub fn record(&mut self, entity: EntityId) -> u32 {
        let count = self.hits.entry(entity).or_insert(0);
        *count += 1;
        *count
    }

    /// Times a target was struck.
    #[must_use]
    pub fn count(&self, entity: EntityId) -> u32 {
        self.hits.get(&entity).copied().unwrap_or(0)
    }

    /// Distinct targets struck.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// True if nothing was struck.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Result of offering a contact to an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactVerdict {
    /// Forward to hit resolution.
    Accepted,
    /// Volume is disabled.
    Inactive,
    /// Layer mask or faction rule rejected the target.
    Filtered,
    /// The target is the attacker or part of its hierarchy.
    Owner,
    /// Already struck this activation.
    AlreadyHit,
}

/// Enable/disable lifecycle and hit set of one attacker's volume.
#[derive(Debug, Clone)]
pub struct HitboxActivation {
    owner: EntityId,
    filter: TargetFilter,
    allow_multiple_hits: bool,
    volume: Option<HitVolume>,
    enabled: bool,
    hit_set: HitSet,
    touching: AHashSet<EntityId>,
}

impl HitboxActivation {
    /// Create a disabled activation.
    #[must_use]
    pub fn new(owner: EntityId, filter: TargetFilter, allow_multiple_hits: bool) -> Self {
        Self {
            owner,
            filter,
            allow_multiple_hits,
            volume: None,
            enabled: false,
            hit_set: HitSet::new(),
            touching: AHashSet::new(),
        }
    }

    /// Attacker that owns this volume.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Current filter.
    #[must_use]
    pub const fn filter(&self) -> TargetFilter {
        self.filter
    }

    /// Replace the filter.
    pub fn set_filter(&mut self, filter: TargetFilter) {
        self.filter = filter;
    }

    /// Current volume, if positioned.
    #[must_use]
    pub const fn volume(&self) -> Option<&HitVolume> {
        self.volume.as_ref()
    }

    /// True while contacts are accepted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.enabled
    }

    /// Hit set of the current activation.
    #[must_use]
    pub const fn hit_set(&self) -> &HitSet {
        &self.hit_set
    }

    /// Move the volume without enabling it.
    pub fn position(&mut self, volume: HitVolume) {
        self.volume = Some(volume);
    }

    /// Start a new activation at `volume`.
    pub fn activate(&mut self, volume: HitVolume) {
        self.hit_set.clear();
        self.touching.clear();
        self.volume = Some(volume);
        self.enabled = true;
        trace!("{} hit volume enabled at {}", self.owner, volume.center);
    }

    /// Disable the volume and forget this activation's hits.
    pub fn deactivate(&mut self) {
        if self.enabled {
            trace!("{} hit volume disabled", self.owner);
        }
        self.enabled = false;
        self.hit_set.clear();
        self.touching.clear();
    }

    /// Turns the hurtboxes currently overlapping the volume into contact
    /// events.
    ///
    /// A full pass reports every overlapping hurtbox. Otherwise only
    /// hurtboxes that were not overlapping on the previous pass are
    /// reported, so a target resting inside the volume counts once.
    pub fn contact_events(
        &mut self,
        overlapping: &[ContactCandidate],
        full_pass: bool,
    ) -> Vec<ContactCandidate> {
        if !self.enabled {
            return Vec::new();
        }

        let events = overlapping
            .iter()
            .filter(|c| full_pass || !self.touching.contains(&c.entity))
            .copied()
            .collect();

        self.touching = overlapping.iter().map(|c| c.entity).collect();
        events
    }

    /// Validates one contact and marks it in the hit set when accepted.
    pub fn on_contact(&mut self, candidate: &ContactCandidate) -> ContactVerdict {
        if !self.enabled {
            return ContactVerdict::Inactive;
        }
        if !self.filter.accepts(candidate) {
            return ContactVerdict::Filtered;
        }
        if candidate.entity == self.owner || candidate.root == self.owner {
            return ContactVerdict::Owner;
        }
        if self.hit_set.contains(candidate.entity) && !self.allow_multiple_hits {
            return ContactVerdict::AlreadyHit;
        }

        self.hit_set.record(candidate.entity);
        ContactVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy(raw: u64, position: Vec2) -> ContactCandidate {
        Hurtbox::new(EntityId::from_raw(raw), CollisionLayer::ENEMY, 0.25)
            .with_faction(FactionId::MONSTERS)
            .candidate(EntityId::from_raw(raw), position)
    }

    fn box_volume() -> HitVolume {
        let def = AttackDefinition::default().with_range(0.5);
        HitVolume::for_attack(&def, Vec2::ZERO, Vec2::X)
    }

    #[test]
    fn test_collision_layer_flags() {
        let filter = TargetFilter::new(CollisionLayer::ENEMY | CollisionLayer::PROP);
        assert!(filter.accepts(&enemy(2, Vec2::ZERO)));

        let mut player = enemy(3, Vec2::ZERO);
        player.layer = CollisionLayer::PLAYER;
        assert!(!filter.accepts(&player));
        assert!(!TargetFilter::new(CollisionLayer::NONE).accepts(&enemy(2, Vec2::ZERO)));
    }

    #[test]
    fn test_faction_exclusion() {
        let filter = TargetFilter::default().excluding_faction(FactionId::MONSTERS);
        assert!(!filter.accepts(&enemy(2, Vec2::ZERO)));
        assert!(TargetFilter::default().accepts(&enemy(2, Vec2::ZERO)));
    }

    #[test]
    fn test_box_volume_position() {
        let volume = box_volume();
        assert!((volume.center - Vec2::new(0.4, 0.0)).length() < 1e-6);
        assert!(volume.contains(Vec2::new(0.3, 0.0), 0.0));
        assert!(volume.contains(Vec2::new(0.85, 0.0), 0.25));
        assert!(!volume.contains(Vec2::new(1.0, 0.0), 0.25));
        assert!(!volume.contains(Vec2::new(-0.3, 0.0), 0.25));
    }

    #[test]
    fn test_rotated_box_volume() {
        let def = AttackDefinition::default().with_range(1.0).with_hitbox_size(1.0, 0.2);
        let volume = HitVolume::for_attack(&def, Vec2::ZERO, Vec2::Y);
        assert!((volume.angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(volume.contains(Vec2::new(0.0, 1.2), 0.0));
        assert!(!volume.contains(Vec2::new(0.3, 0.8), 0.1));
    }

    #[test]
    fn test_area_volume() {
        let def = AttackDefinition::default().with_area(1.5);
        let volume = HitVolume::for_attack(&def, Vec2::new(2.0, 2.0), Vec2::ZERO);
        assert_eq!(volume.center, Vec2::new(2.0, 2.0));
        assert!(volume.contains(Vec2::new(0.5, 2.0), 0.1));
        assert!(!volume.contains(Vec2::new(0.0, 2.0), 0.1));
    }

    #[test]
    fn test_closest_point_inside_is_identity() {
        let volume = box_volume();
        let p = Vec2::new(0.5, 0.1);
        assert!((volume.closest_point(p) - p).length() < 1e-6);
    }

    #[test]
    fn test_inactive_rejects() {
        let mut activation = HitboxActivation::new(EntityId::from_raw(1), TargetFilter::default(), false);
        assert_eq!(activation.on_contact(&enemy(2, Vec2::ZERO)), ContactVerdict::Inactive);
    }

    #[test]
    fn test_owner_and_descendants_rejected() {
        let owner = EntityId::from_raw(1);
        let mut activation = HitboxActivation::new(owner, TargetFilter::default(), false);
        activation.activate(box_volume());

        let mut own = enemy(1, Vec2::ZERO);
        own.root = owner;
        assert_eq!(activation.on_contact(&own), ContactVerdict::Owner);

        let summon = Hurtbox::new(owner, CollisionLayer::ENEMY, 0.2)
            .candidate(EntityId::from_raw(9), Vec2::ZERO);
        assert_eq!(activation.on_contact(&summon), ContactVerdict::Owner);
    }

    #[test]
    fn test_dedup_until_next_activation() {
        let mut activation = HitboxActivation::new(EntityId::from_raw(1), TargetFilter::default(), false);
        activation.activate(box_volume());

        let target = enemy(2, Vec2::new(0.3, 0.0));
        assert_eq!(activation.on_contact(&target), ContactVerdict::Accepted);
        assert_eq!(activation.on_contact(&target), ContactVerdict::AlreadyHit);

        activation.deactivate();
        assert!(activation.hit_set().is_empty());
        activation.deactivate();

        activation.activate(box_volume());
        assert_eq!(activation.on_contact(&target), ContactVerdict::Accepted);
    }

    #[test]
    fn test_multiple_hits_allowed() {
        let mut activation = HitboxActivation::new(EntityId::from_raw(1), TargetFilter::default(), true);
        activation.activate(box_volume());

        let target = enemy(2, Vec2::new(0.3, 0.0));
        assert_eq!(activation.on_contact(&target), ContactVerdict::Accepted);
        assert_eq!(activation.on_contact(&target), ContactVerdict::Accepted);
        assert_eq!(activation.hit_set().count(target.entity), 2);
    }

    #[test]
    fn test_contact_events_report_entries_only() {
        let mut activation = HitboxActivation::new(EntityId::from_raw(1), TargetFilter::default(), true);
        let a = enemy(2, Vec2::new(0.3, 0.0));
        let b = enemy(3, Vec2::new(0.5, 0.0));

        assert!(activation.contact_events(&[a], true).is_empty());

        activation.activate(box_volume());
        assert_eq!(activation.contact_events(&[a], true), vec![a]);
        assert!(activation.contact_events(&[a], false).is_empty());
        assert_eq!(activation.contact_events(&[a, b], false), vec![b]);
        assert_eq!(activation.contact_events(&[a, b], true), vec![a, b]);

        // leaving and re-entering is a new contact
        assert!(activation.contact_events(&[b], false).is_empty());
        assert_eq!(activation.contact_events(&[a, b], false), vec![a]);
    }
}
