//! A small deterministic box world for tests and benches.
//!
//! Bodies are axis-aligned boxes with locked rotation and no friction.
//! Dynamic bodies fall under gravity and move one axis at a time (vertical
//! first, then X, then Z). A moving body shoves any dynamic body in its way
//! along that axis, then is pushed back out of whatever still blocks it.
//! Results are exact, so controller tests can assert resting heights and
//! contact positions without tolerances for solver slop.

use bevy::math::{Quat, Vec3};
use bevy::prelude::Resource;

use super::{AxisVelocity, BodyDesc, BodyHandle, BodyTransform, CollisionFilter, FixedSteps, PhysicsWorld};
use crate::settings::PhysicsSettings;

#[derive(Clone, Debug)]
struct Body {
    position: Vec3,
    velocity: Vec3,
    half_extents: Vec3,
    is_static: bool,
    filter: CollisionFilter,
}

impl Body {
    fn min(&self) -> Vec3 {
        self.position - self.half_extents
    }

    fn max(&self) -> Vec3 {
        self.position + self.half_extents
    }
}

#[derive(Resource, Clone, Debug)]
pub struct SimpleWorld {
    gravity: f32,
    steps: FixedSteps,
    bodies: Vec<Body>,
}

impl SimpleWorld {
    #[must_use]
    pub fn new(gravity: f32, max_substeps: u32) -> Self {
        Self { gravity, steps: FixedSteps::new(max_substeps), bodies: Vec::new() }
    }

    #[must_use]
    pub fn from_settings(settings: &PhysicsSettings) -> Self {
        Self::new(settings.gravity, settings.max_substeps)
    }

    fn substep(&mut self, dt: f32) {
        for i in 0..self.bodies.len() {
            if self.bodies[i].is_static {
                continue;
            }
            self.bodies[i].velocity.y += self.gravity * dt;
            for axis in [1, 0, 2] {
                let delta = self.bodies[i].velocity[axis] * dt;
                if delta != 0.0 {
                    self.move_axis(i, axis, delta, 0);
                }
            }
        }
    }

    /// Move body `i` along one axis, shoving dynamic bodies ahead of it and
    /// resolving what remains against everything it collides with.
    fn move_axis(&mut self, i: usize, axis: usize, delta: f32, depth: u32) {
        let mut moving = self.bodies[i].clone();
        moving.position[axis] += delta;

        if depth < MAX_PUSH_DEPTH {
            let pushed: Vec<(usize, f32)> = self
                .bodies
                .iter()
                .enumerate()
                .filter(|(j, other)| {
                    *j != i && !other.is_static && moving.filter.interacts(other.filter) && overlaps(&moving, other)
                })
                .map(|(j, other)| (j, penetration(&moving, other, axis, delta)))
                .collect();
            for (j, push) in pushed {
                self.move_axis(j, axis, push, depth + 1);
            }
        }

        for (j, other) in self.bodies.iter().enumerate() {
            if j == i || !moving.filter.interacts(other.filter) {
                continue;
            }
            if !overlaps(&moving, other) {
                continue;
            }
            moving.position[axis] = if delta < 0.0 {
                other.max()[axis] + moving.half_extents[axis]
            } else {
                other.min()[axis] - moving.half_extents[axis]
            };
            moving.velocity[axis] = 0.0;
        }

        self.bodies[i] = moving;
    }
}

/// Bodies shoving bodies shoving bodies stops here.
const MAX_PUSH_DEPTH: u32 = 2;

/// Signed distance `other` must move along `axis` to clear `moving`.
fn penetration(moving: &Body, other: &Body, axis: usize, delta: f32) -> f32 {
    if delta > 0.0 {
        moving.max()[axis] - other.min()[axis]
    } else {
        moving.min()[axis] - other.max()[axis]
    }
}

/// Penetration shallower than this counts as touching, not overlapping.
const CONTACT_SKIN: f32 = 1e-4;

fn overlaps(a: &Body, b: &Body) -> bool {
    let d = (a.position - b.position).abs();
    let reach = a.half_extents + b.half_extents - Vec3::splat(CONTACT_SKIN);
    d.x < reach.x && d.y < reach.y && d.z < reach.z
}

/// Slab test of the segment `from -> to` against an axis-aligned box.
fn segment_hits_box(from: Vec3, to: Vec3, min: Vec3, max: Vec3) -> bool {
    let dir = to - from;
    let mut t_enter = 0.0_f32;
    let mut t_exit = 1.0_f32;
    for axis in 0..3 {
        let origin = from[axis];
        let d = dir[axis];
        if d.abs() < f32::EPSILON {
            if origin < min[axis] || origin > max[axis] {
                return false;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[axis] - origin) * inv;
        let mut t1 = (max[axis] - origin) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return false;
        }
    }
    true
}

impl PhysicsWorld for SimpleWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.bodies.push(Body {
            position: desc.position,
            velocity: Vec3::ZERO,
            half_extents: desc.half_extents.abs(),
            is_static: desc.mass <= 0.0,
            filter: desc.filter,
        });
        BodyHandle::from_raw(self.bodies.len() - 1)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: AxisVelocity) {
        let b = &mut self.bodies[body.index()];
        b.velocity = velocity.apply_to(b.velocity);
    }

    fn velocity(&self, body: BodyHandle) -> Vec3 {
        self.bodies[body.index()].velocity
    }

    fn transform(&self, body: BodyHandle) -> BodyTransform {
        BodyTransform { position: self.bodies[body.index()].position, orientation: Quat::IDENTITY }
    }

    fn raycast(&self, from: Vec3, to: Vec3, filter: CollisionFilter) -> bool {
        self.bodies
            .iter()
            .filter(|b| filter.interacts(b.filter))
            .any(|b| segment_hits_box(from, to, b.min(), b.max()))
    }

    fn set_collision_group(&mut self, body: BodyHandle, group: u32) {
        self.bodies[body.index()].filter.group = group;
    }

    fn collision_filter(&self, body: BodyHandle) -> CollisionFilter {
        self.bodies[body.index()].filter
    }

    fn step(&mut self, fixed_dt: f32, wall_dt: f32) {
        for _ in 0..self.steps.advance(fixed_dt, wall_dt) {
            self.substep(fixed_dt);
        }
    }

    fn configure(&mut self, settings: &PhysicsSettings) {
        self.gravity = settings.gravity;
        self.steps.set_max_substeps(settings.max_substeps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::groups;

    const DT: f32 = 1.0 / 60.0;

    fn floor_world() -> SimpleWorld {
        let mut world = SimpleWorld::new(-9.81, 10);
        // top surface at y = 0
        world.add_static_box(Vec3::new(0.0, -1.0, 0.0), Vec3::new(5.0, 1.0, 5.0), CollisionFilter::LEVEL);
        world
    }

    fn player_at(world: &mut SimpleWorld, position: Vec3) -> BodyHandle {
        world.create_body(BodyDesc {
            position,
            half_extents: Vec3::new(0.125, 0.8, 0.125),
            mass: 1.0,
            filter: CollisionFilter::PLAYER,
            friction: 0.0,
        })
    }

    #[test]
    fn body_comes_to_rest_on_floor() {
        let mut world = floor_world();
        let body = player_at(&mut world, Vec3::new(0.0, 3.0, 0.0));
        for _ in 0..240 {
            world.step(DT, DT);
        }
        let y = world.transform(body).position.y;
        assert!((y - 0.8).abs() < 1e-3, "resting height was {y}");
        assert_eq!(world.transform(body).orientation, Quat::IDENTITY);
    }

    #[test]
    fn disabled_group_falls_through_floor() {
        let mut world = floor_world();
        let body = player_at(&mut world, Vec3::new(0.0, 0.8, 0.0));
        world.set_collision_group(body, groups::DISABLED);
        for _ in 0..60 {
            world.step(DT, DT);
        }
        assert!(world.transform(body).position.y < 0.0);
    }

    #[test]
    fn horizontal_motion_is_blocked_by_walls() {
        let mut world = floor_world();
        world.add_static_box(Vec3::new(2.0, 1.0, 0.0), Vec3::new(0.5, 1.0, 5.0), CollisionFilter::LEVEL);
        let body = player_at(&mut world, Vec3::new(0.0, 0.8, 0.0));
        for _ in 0..120 {
            world.set_velocity(body, AxisVelocity::horizontal(4.0, 0.0));
            world.step(DT, DT);
        }
        let x = world.transform(body).position.x;
        assert!((x - (1.5 - 0.125)).abs() < 1e-3, "stopped at {x}");
    }

    #[test]
    fn walking_body_pushes_dynamic_crate() {
        let mut world = floor_world();
        let crate_body = world.create_body(BodyDesc {
            position: Vec3::new(1.0, 0.5, 0.0),
            half_extents: Vec3::splat(0.5),
            mass: 2.0,
            filter: CollisionFilter::LEVEL,
            friction: BodyDesc::DEFAULT_FRICTION,
        });
        let body = player_at(&mut world, Vec3::new(0.0, 0.8, 0.0));
        for _ in 0..60 {
            world.set_velocity(body, AxisVelocity::horizontal(2.0, 0.0));
            world.step(DT, DT);
        }
        let player_x = world.transform(body).position.x;
        let crate_x = world.transform(crate_body).position.x;
        assert!(crate_x > 2.0, "crate moved to {crate_x}");
        assert!((crate_x - 0.5 - (player_x + 0.125)).abs() < 1e-3, "player stays against the crate");
        assert!((world.transform(crate_body).position.y - 0.5).abs() < 1e-3);
    }

    #[test]
    fn raycast_respects_filters() {
        let world = floor_world();
        let from = Vec3::new(0.0, 0.1, 0.0);
        let to = Vec3::new(0.0, -0.2, 0.0);
        assert!(world.raycast(from, to, CollisionFilter::GROUND_PROBE));
        let nothing = CollisionFilter::new(groups::PROBE, groups::PLAYER);
        assert!(!world.raycast(from, to, nothing));
        // segment entirely above the floor
        assert!(!world.raycast(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.2, 0.0), CollisionFilter::GROUND_PROBE));
    }

    #[test]
    fn step_runs_whole_fixed_substeps() {
        let mut world = SimpleWorld::new(-10.0, 10);
        let body = player_at(&mut world, Vec3::ZERO);
        world.step(0.1, 0.05);
        assert_eq!(world.velocity(body), Vec3::ZERO);
        world.step(0.1, 0.05);
        assert!((world.velocity(body).y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn segment_box_slab_test() {
        let min = Vec3::splat(-1.0);
        let max = Vec3::splat(1.0);
        assert!(segment_hits_box(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), min, max));
        assert!(!segment_hits_box(Vec3::new(-2.0, 2.0, 0.0), Vec3::new(2.0, 2.0, 0.0), min, max));
        assert!(!segment_hits_box(Vec3::new(-3.0, 0.0, 0.0), Vec3::new(-2.0, 0.0, 0.0), min, max));
    }
}
