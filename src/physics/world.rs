use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;

use super::stepper::FixedStepper;

/// Collision shape of a body, in body-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Infinite plane through the origin with +Y as its normal
    Plane,
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
}

/// How the simulation treats a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Never moves (mass 0)
    Static,
    /// Driven by forces, gravity and contacts
    Dynamic,
    /// Driven by whoever sets its position, still collides with dynamic bodies
    Kinematic,
}

impl BodyMode {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyMode::Static => RigidBodyType::Fixed,
            BodyMode::Dynamic => RigidBodyType::Dynamic,
            BodyMode::Kinematic => RigidBodyType::KinematicPositionBased,
        }
    }

    fn from_rapier(ty: RigidBodyType) -> Self {
        match ty {
            RigidBodyType::Fixed => BodyMode::Static,
            RigidBodyType::Dynamic => BodyMode::Dynamic,
            RigidBodyType::KinematicPositionBased | RigidBodyType::KinematicVelocityBased => {
                BodyMode::Kinematic
            }
        }
    }
}

/// Membership/filter bit masks; two bodies collide when each one's
/// memberships intersect the other's filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub memberships: u32,
    pub filter: u32,
}

impl CollisionFilter {
    pub const ALL: CollisionFilter = CollisionFilter {
        memberships: u32::MAX,
        filter: u32::MAX,
    };

    fn to_groups(self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.memberships),
            Group::from_bits_truncate(self.filter),
        )
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// Everything needed to create a body and its single collider
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub shape: Shape,
    /// 0 creates a static body
    pub mass: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub filter: CollisionFilter,
    pub lock_rotations: bool,
    pub friction: f32,
    pub restitution: f32,
}

impl BodyDesc {
    pub fn new(shape: Shape, mass: f32, position: Vec3) -> Self {
        Self {
            shape,
            mass,
            position,
            rotation: Quat::IDENTITY,
            filter: CollisionFilter::ALL,
            lock_rotations: false,
            friction: 0.5,
            restitution: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_locked_rotations(mut self) -> Self {
        self.lock_rotations = true;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }
}

/// The simulation-relevant state saved before a body is taken over
/// and put back afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub mode: BodyMode,
    pub gravity_scale: f32,
    pub mass: f32,
}

/// A touching contact as seen from one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space normal pointing from the other body into the observed one
    pub normal: Vec3,
    pub other: Option<RigidBodyHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: RigidBodyHandle,
    pub distance: f32,
    pub point: Vec3,
}

/// Owns the rapier pipeline and all of its sets
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    stepper: FixedStepper,
    steps_taken: u64,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3) -> Self {
        let stepper = FixedStepper::new(1.0 / 60.0, 3);
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = stepper.fixed_dt();

        Self {
            gravity: to_vector(gravity),
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            stepper,
            steps_taken: 0,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Total number of fixed steps simulated so far
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Advance by `fixed_dt` slices covering at most `max_sub_steps` of `wall_dt`.
    /// Returns the number of sub-steps actually simulated.
    pub fn step(&mut self, fixed_dt: f32, wall_dt: f32, max_sub_steps: u32) -> u32 {
        self.stepper.configure(fixed_dt, max_sub_steps);
        self.integration_parameters.dt = fixed_dt;

        let sub_steps = self.stepper.advance(wall_dt);
        for _ in 0..sub_steps {
            self.step_once();
        }
        sub_steps
    }

    fn step_once(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.steps_taken += 1;
    }

    pub fn add_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let mode = if desc.mass > 0.0 { BodyMode::Dynamic } else { BodyMode::Static };
        let pose = Isometry::from_parts(
            Translation::from(to_vector(desc.position)),
            to_rotation(desc.rotation),
        );

        let mut builder = RigidBodyBuilder::new(mode.to_rapier()).position(pose);
        if desc.lock_rotations {
            builder = builder.lock_rotations();
        }
        let handle = self.bodies.insert(builder.build());

        let collider = match desc.shape {
            Shape::Plane => ColliderBuilder::halfspace(Vector::y_axis()),
            Shape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Shape::Ball { radius } => ColliderBuilder::ball(radius),
        }
        .collision_groups(desc.filter.to_groups())
        .friction(desc.friction)
        .restitution(desc.restitution);

        let collider = if desc.mass > 0.0 {
            collider.mass(desc.mass)
        } else {
            collider
        };

        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);
        // mass is otherwise only folded in on the next step
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.recompute_mass_properties_from_colliders(&self.colliders);
        }

        tracing::debug!(?handle, shape = ?desc.shape, mass = desc.mass, "added body");
        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| from_vector(rb.translation()))
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|rb| from_rotation(rb.rotation()))
    }

    /// Teleport; no velocity is derived from the jump
    pub fn set_position(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_translation(to_vector(position), true);
        }
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| from_vector(rb.linvel()))
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| from_vector(rb.angvel()))
    }

    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_angvel(to_vector(velocity), true);
        }
    }

    pub fn mode(&self, handle: RigidBodyHandle) -> Option<BodyMode> {
        self.bodies
            .get(handle)
            .map(|rb| BodyMode::from_rapier(rb.body_type()))
    }

    pub fn set_mode(&mut self, handle: RigidBodyHandle, mode: BodyMode) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_body_type(mode.to_rapier(), true);
        }
    }

    pub fn gravity_scale(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|rb| rb.gravity_scale())
    }

    pub fn set_gravity_scale(&mut self, handle: RigidBodyHandle, scale: f32) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_gravity_scale(scale, true);
        }
    }

    pub fn mass(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|rb| rb.mass())
    }

    pub fn snapshot(&self, handle: RigidBodyHandle) -> Option<BodySnapshot> {
        let rb = self.bodies.get(handle)?;
        Some(BodySnapshot {
            mode: BodyMode::from_rapier(rb.body_type()),
            gravity_scale: rb.gravity_scale(),
            mass: rb.mass(),
        })
    }

    /// Put back mode and gravity scale; mass is carried by the collider and
    /// never touched by mode switches.
    pub fn restore(&mut self, handle: RigidBodyHandle, snapshot: &BodySnapshot) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_body_type(snapshot.mode.to_rapier(), true);
            rb.set_gravity_scale(snapshot.gravity_scale, true);
        }
    }

    /// Touching contacts of `handle` from the latest step
    pub fn contacts(&self, handle: RigidBodyHandle) -> Vec<Contact> {
        let Some(rb) = self.bodies.get(handle) else {
            return Vec::new();
        };

        let mut contacts = Vec::new();
        for &collider in rb.colliders() {
            for pair in self.narrow_phase.contact_pairs_with(collider) {
                if !pair.has_any_active_contact {
                    continue;
                }

                // manifold normals point from collider1 towards collider2
                let (other, sign) = if pair.collider1 == collider {
                    (pair.collider2, -1.0)
                } else {
                    (pair.collider1, 1.0)
                };
                let other = self.colliders.get(other).and_then(|c| c.parent());

                for manifold in &pair.manifolds {
                    if manifold.data.solver_contacts.is_empty() {
                        continue;
                    }
                    contacts.push(Contact {
                        normal: from_vector(&manifold.data.normal) * sign,
                        other,
                    });
                }
            }
        }
        contacts
    }

    /// Nearest hit among `candidates` along a ray, as of the last step.
    pub fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        candidates: &[RigidBodyHandle],
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let ray = Ray::new(point![origin.x, origin.y, origin.z], to_vector(direction));

        let predicate = |_: ColliderHandle, collider: &Collider| {
            collider
                .parent()
                .is_some_and(|parent| candidates.contains(&parent))
        };
        let filter = QueryFilter::default().predicate(&predicate);

        let (collider, toi) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        let body = self.colliders.get(collider)?.parent()?;

        Some(RayHit {
            body,
            distance: toi,
            point: origin + direction * toi,
        })
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_rotation(q: Quat) -> Rotation<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn from_rotation(r: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world_with_ground() -> (PhysicsWorld, RigidBodyHandle) {
        let mut world = PhysicsWorld::new(Vec3::new(0.0, -9.82, 0.0));
        let ground = world.add_body(&BodyDesc::new(Shape::Plane, 0.0, Vec3::ZERO));
        (world, ground)
    }

    fn settle(world: &mut PhysicsWorld, seconds: f32) {
        let frames = (seconds / DT) as usize;
        for _ in 0..frames {
            world.step(DT, DT, 3);
        }
    }

    #[test]
    fn zero_mass_is_static() {
        let (world, ground) = world_with_ground();
        assert_eq!(world.mode(ground), Some(BodyMode::Static));
    }

    #[test]
    fn ball_falls_and_rests_on_ground() {
        let (mut world, _) = world_with_ground();
        let ball = world.add_body(&BodyDesc::new(Shape::Ball { radius: 0.5 }, 1.0, Vec3::new(0.0, 3.0, 0.0)));

        settle(&mut world, 3.0);

        let y = world.position(ball).unwrap().y;
        assert!((y - 0.5).abs() < 0.05, "ball resting at y={y}");
    }

    #[test]
    fn resting_contact_normal_points_up_at_the_resting_body() {
        let (mut world, ground) = world_with_ground();
        let ball = world.add_body(&BodyDesc::new(Shape::Ball { radius: 1.0 }, 5.0, Vec3::new(0.0, 1.2, 0.0)));

        settle(&mut world, 1.0);

        let contacts = world.contacts(ball);
        assert!(!contacts.is_empty());
        assert!(contacts.iter().any(|c| c.normal.dot(Vec3::Y) > 0.9 && c.other == Some(ground)));
    }

    #[test]
    fn step_reports_sub_steps_and_drops_excess() {
        let (mut world, _) = world_with_ground();
        assert_eq!(world.step(DT, 1.0, 3), 3);
        assert_eq!(world.steps_taken(), 3);
        assert_eq!(world.step(DT, 0.0, 3), 0);
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let (mut world, _) = world_with_ground();
        let cube = world.add_body(&BodyDesc::new(
            Shape::Cuboid { half_extents: Vec3::splat(0.5) },
            1.0,
            Vec3::new(0.0, 0.5, 0.0),
        ));
        let before = world.snapshot(cube).unwrap();

        world.set_mode(cube, BodyMode::Kinematic);
        world.set_gravity_scale(cube, 0.0);
        assert_eq!(world.mode(cube), Some(BodyMode::Kinematic));

        world.restore(cube, &before);
        assert_eq!(world.snapshot(cube), Some(before));
    }

    #[test]
    fn ray_only_sees_candidates() {
        let (mut world, ground) = world_with_ground();
        let cube = world.add_body(&BodyDesc::new(
            Shape::Cuboid { half_extents: Vec3::splat(0.5) },
            1.0,
            Vec3::new(0.0, 0.5, -3.0),
        ));
        // query structures are refreshed by stepping
        world.step(DT, DT, 1);

        let origin = Vec3::new(0.0, 0.5, 0.0);
        let hit = world.cast_ray(origin, Vec3::NEG_Z, 10.0, &[cube]).unwrap();
        assert_eq!(hit.body, cube);
        assert!((hit.distance - 2.5).abs() < 0.05);

        assert!(world.cast_ray(origin, Vec3::NEG_Y, 10.0, &[cube]).is_none());
        assert!(world.cast_ray(origin, Vec3::NEG_Y, 10.0, &[ground]).is_some());
    }

    #[test]
    fn ray_respects_max_distance() {
        let (mut world, _) = world_with_ground();
        let cube = world.add_body(&BodyDesc::new(
            Shape::Cuboid { half_extents: Vec3::splat(0.5) },
            1.0,
            Vec3::new(0.0, 0.5, -3.5),
        ));
        world.step(DT, DT, 1);
        assert!(world.cast_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Z, 2.5, &[cube]).is_none());
    }

    #[test]
    fn remove_body_forgets_it() {
        let (mut world, _) = world_with_ground();
        let ball = world.add_body(&BodyDesc::new(Shape::Ball { radius: 0.5 }, 1.0, Vec3::Y));
        assert_eq!(world.body_count(), 2);
        assert!(world.remove_body(ball));
        assert!(!world.contains(ball));
        assert!(world.position(ball).is_none());
        assert!(!world.remove_body(ball));
    }

    #[test]
    fn rotation_round_trips_through_add_body() {
        let (mut world, _) = world_with_ground();
        let q = Quat::from_rotation_y(0.7);
        let wall = world.add_body(
            &BodyDesc::new(Shape::Cuboid { half_extents: Vec3::ONE }, 0.0, Vec3::new(0.0, 1.0, -5.0))
                .with_rotation(q),
        );
        let r = world.rotation(wall).unwrap();
        assert!(r.dot(q).abs() > 0.9999);
    }
}
