//! Physics collaborator interface.
//!
//! The player core never owns a physics engine; it talks to one through the
//! [`PhysicsWorld`] trait, passed in explicitly by whoever drives the tick.
//! The game runs on [`RapierWorld`]. [`SimpleWorld`] is a small
//! deterministic box world used by tests and benches.

use bevy::math::{Quat, Vec3};
use bevy::prelude::{DetectChanges, Res, ResMut, Resource, Time};

use crate::settings::{PhysicsSettings, Settings};

pub mod rapier;
pub mod world;

pub use rapier::RapierWorld;
pub use world::SimpleWorld;

/// Collision filter group bits shared by the game.
pub mod groups {
    /// Level geometry and props.
    pub const WORLD: u32 = 1;
    /// Ground probe rays.
    pub const PROBE: u32 = 2;
    pub const PLAYER: u32 = 4;
    /// Group nothing collides with; bodies moved here fall through the world.
    pub const DISABLED: u32 = 8;
}

/// Group/mask pair. Two filters interact when each one's group is in the
/// other's mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionFilter {
    pub group: u32,
    pub mask: u32,
}

impl CollisionFilter {
    #[must_use]
    pub const fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    /// Static level geometry: solid to props, probes and the player.
    pub const LEVEL: CollisionFilter =
        CollisionFilter::new(groups::WORLD, groups::WORLD | groups::PROBE | groups::PLAYER);
    pub const PLAYER: CollisionFilter = CollisionFilter::new(groups::PLAYER, groups::WORLD);
    /// Ground probe: only hits ground-like colliders.
    pub const GROUND_PROBE: CollisionFilter = CollisionFilter::new(groups::PROBE, groups::WORLD);

    #[must_use]
    pub fn interacts(self, other: CollisionFilter) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

/// Opaque handle to a body created by a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(usize);

impl BodyHandle {
    #[must_use]
    pub const fn from_raw(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Description of a box-shaped body. Bodies never rotate.
#[derive(Clone, Copy, Debug)]
pub struct BodyDesc {
    pub position: Vec3,
    pub half_extents: Vec3,
    /// Zero mass makes the body static.
    pub mass: f32,
    pub filter: CollisionFilter,
    /// Contact friction. A frictionless body also cancels friction on
    /// whatever it touches, so a character slides along walls and floors.
    pub friction: f32,
}

impl BodyDesc {
    pub const DEFAULT_FRICTION: f32 = 0.5;
}

/// Per-axis velocity write; `None` leaves that axis untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisVelocity {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl AxisVelocity {
    #[must_use]
    pub fn horizontal(x: f32, z: f32) -> Self {
        Self { x: Some(x), y: None, z: Some(z) }
    }

    #[must_use]
    pub fn vertical(y: f32) -> Self {
        Self { x: None, y: Some(y), z: None }
    }

    /// Apply to `current`, keeping the axes this update leaves unset.
    #[must_use]
    pub fn apply_to(self, current: Vec3) -> Vec3 {
        Vec3::new(
            self.x.unwrap_or(current.x),
            self.y.unwrap_or(current.y),
            self.z.unwrap_or(current.z),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyTransform {
    pub position: Vec3,
    pub orientation: Quat,
}

/// What the player core needs from a rigid-body simulation.
///
/// `step` must run exactly once per frame, before anything reads transforms
/// for that frame.
pub trait PhysicsWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Add immovable level geometry.
    fn add_static_box(&mut self, center: Vec3, half_extents: Vec3, filter: CollisionFilter) -> BodyHandle {
        self.create_body(BodyDesc {
            position: center,
            half_extents,
            mass: 0.0,
            filter,
            friction: BodyDesc::DEFAULT_FRICTION,
        })
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: AxisVelocity);

    fn velocity(&self, body: BodyHandle) -> Vec3;

    fn transform(&self, body: BodyHandle) -> BodyTransform;

    /// True when the segment `from -> to` hits any body whose filter
    /// interacts with `filter`.
    fn raycast(&self, from: Vec3, to: Vec3, filter: CollisionFilter) -> bool;

    fn set_collision_group(&mut self, body: BodyHandle, group: u32);

    fn collision_filter(&self, body: BodyHandle) -> CollisionFilter;

    /// Advance by `wall_dt` seconds of real time in steps of `fixed_dt`.
    fn step(&mut self, fixed_dt: f32, wall_dt: f32);

    /// Take new gravity and substep limits; bodies keep their state.
    fn configure(&mut self, settings: &PhysicsSettings);
}

/// Wall-time accumulator turning frame deltas into whole fixed steps.
#[derive(Clone, Debug)]
pub struct FixedSteps {
    accumulator: f32,
    max_substeps: u32,
}

impl FixedSteps {
    #[must_use]
    pub fn new(max_substeps: u32) -> Self {
        Self { accumulator: 0.0, max_substeps: max_substeps.max(1) }
    }

    pub fn set_max_substeps(&mut self, max_substeps: u32) {
        self.max_substeps = max_substeps.max(1);
    }

    /// Bank `wall_dt` and return how many `fixed_dt` steps are due.
    pub fn advance(&mut self, fixed_dt: f32, wall_dt: f32) -> u32 {
        if fixed_dt <= 0.0 {
            return 0;
        }
        self.accumulator += wall_dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= fixed_dt && steps < self.max_substeps {
            self.accumulator -= fixed_dt;
            steps += 1;
        }
        if steps == self.max_substeps {
            // frame took too long; drop the backlog instead of spiralling
            self.accumulator = self.accumulator.min(fixed_dt);
        }
        steps
    }
}

/// Advance the shared world by this frame's wall time. Runs before the
/// player tick.
#[allow(clippy::needless_pass_by_value)]
pub fn step_physics<W: PhysicsWorld + Resource>(time: Res<Time>, settings: Res<Settings>, mut world: ResMut<W>) {
    world.step(settings.physics.fixed_timestep, time.delta_seconds());
}

#[allow(clippy::needless_pass_by_value)]
pub fn apply_physics_settings<W: PhysicsWorld + Resource>(settings: Res<Settings>, mut world: ResMut<W>) {
    if settings.is_changed() {
        world.configure(&settings.physics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_collides_with_level_until_disabled() {
        assert!(CollisionFilter::PLAYER.interacts(CollisionFilter::LEVEL));
        let dead = CollisionFilter::new(groups::DISABLED, CollisionFilter::PLAYER.mask);
        assert!(!dead.interacts(CollisionFilter::LEVEL));
    }

    #[test]
    fn probe_ignores_player_body() {
        assert!(CollisionFilter::GROUND_PROBE.interacts(CollisionFilter::LEVEL));
        assert!(!CollisionFilter::GROUND_PROBE.interacts(CollisionFilter::PLAYER));
    }

    #[test]
    fn fixed_steps_bank_partial_frames() {
        let mut steps = FixedSteps::new(10);
        assert_eq!(steps.advance(0.1, 0.05), 0);
        assert_eq!(steps.advance(0.1, 0.05), 1);
        assert_eq!(steps.advance(0.1, 0.25), 2);
        assert_eq!(steps.advance(0.0, 1.0), 0);
    }

    #[test]
    fn fixed_steps_drop_backlog_past_the_cap() {
        let mut steps = FixedSteps::new(3);
        assert_eq!(steps.advance(0.1, 5.0), 3);
        // at most one step's worth carried over
        assert_eq!(steps.advance(0.1, 0.0), 1);
        assert_eq!(steps.advance(0.1, 0.0), 0);
    }

    #[test]
    fn axis_velocity_keeps_unset_axes() {
        let v = Vec3::new(1.0, -3.0, 2.0);
        assert_eq!(AxisVelocity::horizontal(5.0, 6.0).apply_to(v), Vec3::new(5.0, -3.0, 6.0));
        assert_eq!(AxisVelocity::vertical(6.0).apply_to(v), Vec3::new(1.0, 6.0, 2.0));
    }
}
