//! The game's physics world, backed by rapier.
//!
//! Each [`BodyHandle`] maps to one rigid body with a single cuboid collider.
//! Collision filters become rapier interaction groups, which use the same
//! "each group in the other's mask" rule as [`CollisionFilter::interacts`].

use bevy::math::{Quat, Vec3};
use bevy::prelude::Resource;
use rapier3d::prelude::*;

use super::{AxisVelocity, BodyDesc, BodyHandle, BodyTransform, CollisionFilter, FixedSteps, PhysicsWorld};
use crate::settings::PhysicsSettings;

fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn interaction_groups(filter: CollisionFilter) -> InteractionGroups {
    InteractionGroups::new(Group::from_bits_truncate(filter.group), Group::from_bits_truncate(filter.mask))
}

#[derive(Resource)]
pub struct RapierWorld {
    gravity: Vector<Real>,
    steps: FixedSteps,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    queries: QueryPipeline,
    handles: Vec<(RigidBodyHandle, ColliderHandle)>,
}

impl RapierWorld {
    #[must_use]
    pub fn new(gravity: f32, max_substeps: u32) -> Self {
        Self {
            gravity: Vector::new(0.0, gravity, 0.0),
            steps: FixedSteps::new(max_substeps),
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            queries: QueryPipeline::new(),
            handles: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &PhysicsSettings) -> Self {
        Self::new(settings.gravity, settings.max_substeps)
    }

    fn substep(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.queries),
            &(),
            &(),
        );
    }

    fn rigid_body(&self, body: BodyHandle) -> &RigidBody {
        &self.rigid_bodies[self.handles[body.index()].0]
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> &mut RigidBody {
        &mut self.rigid_bodies[self.handles[body.index()].0]
    }
}

impl PhysicsWorld for RapierWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let builder = if desc.mass > 0.0 { RigidBodyBuilder::dynamic() } else { RigidBodyBuilder::fixed() };
        let rigid_body = builder.translation(to_vector(desc.position)).lock_rotations().build();
        let half = desc.half_extents.abs();
        let mut collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
            .collision_groups(interaction_groups(desc.filter))
            .friction(desc.friction);
        if desc.friction <= 0.0 {
            collider = collider.friction_combine_rule(CoefficientCombineRule::Min);
        }
        if desc.mass > 0.0 {
            collider = collider.mass(desc.mass);
        }
        let rb = self.rigid_bodies.insert(rigid_body);
        let co = self.colliders.insert_with_parent(collider.build(), rb, &mut self.rigid_bodies);
        self.handles.push((rb, co));
        BodyHandle::from_raw(self.handles.len() - 1)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: AxisVelocity) {
        let rb = self.rigid_body_mut(body);
        let current = from_vector(rb.linvel());
        rb.set_linvel(to_vector(velocity.apply_to(current)), true);
    }

    fn velocity(&self, body: BodyHandle) -> Vec3 {
        from_vector(self.rigid_body(body).linvel())
    }

    fn transform(&self, body: BodyHandle) -> BodyTransform {
        let rb = self.rigid_body(body);
        let q = rb.rotation().coords;
        BodyTransform { position: from_vector(rb.translation()), orientation: Quat::from_xyzw(q.x, q.y, q.z, q.w) }
    }

    fn raycast(&self, from: Vec3, to: Vec3, filter: CollisionFilter) -> bool {
        let ray = Ray::new(Point::new(from.x, from.y, from.z), to_vector(to - from));
        let query = QueryFilter::default().groups(interaction_groups(filter));
        // direction is unnormalized, so time of impact 1.0 is the segment end
        self.queries.cast_ray(&self.rigid_bodies, &self.colliders, &ray, 1.0, true, query).is_some()
    }

    fn set_collision_group(&mut self, body: BodyHandle, group: u32) {
        let co = self.handles[body.index()].1;
        let collider = &mut self.colliders[co];
        let mask = collider.collision_groups().filter;
        collider.set_collision_groups(InteractionGroups::new(Group::from_bits_truncate(group), mask));
        // a resting body has to notice its support is gone
        self.rigid_body_mut(body).wake_up(true);
    }

    fn collision_filter(&self, body: BodyHandle) -> CollisionFilter {
        let groups = self.colliders[self.handles[body.index()].1].collision_groups();
        CollisionFilter::new(groups.memberships.bits(), groups.filter.bits())
    }

    fn step(&mut self, fixed_dt: f32, wall_dt: f32) {
        for _ in 0..self.steps.advance(fixed_dt, wall_dt) {
            self.substep(fixed_dt);
        }
    }

    fn configure(&mut self, settings: &PhysicsSettings) {
        self.gravity = Vector::new(0.0, settings.gravity, 0.0);
        self.steps.set_max_substeps(settings.max_substeps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::groups;

    const DT: f32 = 1.0 / 60.0;

    fn floor_world() -> RapierWorld {
        let mut world = RapierWorld::new(-9.81, 10);
        // top surface at y = 0
        world.add_static_box(Vec3::new(0.0, -1.0, 0.0), Vec3::new(5.0, 1.0, 5.0), CollisionFilter::LEVEL);
        world
    }

    fn player_at(world: &mut RapierWorld, position: Vec3) -> BodyHandle {
        world.create_body(BodyDesc {
            position,
            half_extents: Vec3::new(0.125, 0.8, 0.125),
            mass: 1.0,
            filter: CollisionFilter::PLAYER,
            friction: 0.0,
        })
    }

    #[test]
    fn body_settles_upright_on_floor() {
        let mut world = floor_world();
        let body = player_at(&mut world, Vec3::new(0.0, 2.0, 0.0));
        for _ in 0..240 {
            world.step(DT, DT);
        }
        let transform = world.transform(body);
        assert!((transform.position.y - 0.8).abs() < 0.02, "resting height was {}", transform.position.y);
        assert!(transform.orientation.angle_between(Quat::IDENTITY) < 1e-4);
    }

    #[test]
    fn disabled_group_falls_through_floor() {
        let mut world = floor_world();
        let body = player_at(&mut world, Vec3::new(0.0, 0.8, 0.0));
        for _ in 0..30 {
            world.step(DT, DT);
        }
        world.set_collision_group(body, groups::DISABLED);
        assert_eq!(world.collision_filter(body).group, groups::DISABLED);
        assert_eq!(world.collision_filter(body).mask, CollisionFilter::PLAYER.mask);
        for _ in 0..60 {
            world.step(DT, DT);
        }
        assert!(world.transform(body).position.y < 0.0);
    }

    #[test]
    fn horizontal_velocity_write_keeps_vertical_axis() {
        let mut world = RapierWorld::new(-10.0, 10);
        let body = player_at(&mut world, Vec3::ZERO);
        world.set_velocity(body, AxisVelocity::vertical(3.0));
        world.set_velocity(body, AxisVelocity::horizontal(1.0, -2.0));
        assert_eq!(world.velocity(body), Vec3::new(1.0, 3.0, -2.0));
    }

    #[test]
    fn raycast_respects_filters() {
        let mut world = floor_world();
        world.step(DT, DT);
        let from = Vec3::new(0.0, 0.1, 0.0);
        let to = Vec3::new(0.0, -0.2, 0.0);
        assert!(world.raycast(from, to, CollisionFilter::GROUND_PROBE));
        let nothing = CollisionFilter::new(groups::PROBE, groups::PLAYER);
        assert!(!world.raycast(from, to, nothing));
        // segment entirely above the floor
        assert!(!world.raycast(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.2, 0.0), CollisionFilter::GROUND_PROBE));
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
        let crate_x = world.transform(crate_body).position.x;
        assert!(crate_x > 1.5, "crate moved to {crate_x}");
        assert!(world.transform(body).position.x < crate_x);
    }

    #[test]
    fn step_runs_whole_fixed_substeps() {
        let mut world = RapierWorld::new(-10.0, 10);
        let body = player_at(&mut world, Vec3::ZERO);
        world.step(0.1, 0.05);
        assert_eq!(world.velocity(body), Vec3::ZERO);
        world.step(0.1, 0.05);
        assert!((world.velocity(body).y + 1.0).abs() < 1e-4);
    }
}
