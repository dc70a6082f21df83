use glam::Vec3;

use crate::model::EntityId;
use crate::physics::{BodyHandle, BodyMode, BodySnapshot, PhysicsWorld};

/// Whether the player is carrying a prop. A held body is switched to
/// kinematic with gravity off; its saved state is put back on release.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Grip {
    #[default]
    Free,
    Held {
        entity: EntityId,
        body: BodyHandle,
        saved: BodySnapshot,
    },
}

impl Grip {
    pub fn is_held(&self) -> bool {
        matches!(self, Grip::Held { .. })
    }

    pub fn held_entity(&self) -> Option<EntityId> {
        match self {
            Grip::Held { entity, .. } => Some(*entity),
            Grip::Free => None,
        }
    }

    pub fn held_body(&self) -> Option<BodyHandle> {
        match self {
            Grip::Held { body, .. } => Some(*body),
            Grip::Free => None,
        }
    }

    /// Take over `body`. Does nothing if something is already held.
    pub fn grab(&mut self, entity: EntityId, body: BodyHandle, physics: &mut PhysicsWorld) -> bool {
        if self.is_held() {
            return false;
        }
        let Some(saved) = physics.snapshot(body) else {
            return false;
        };

        physics.set_linear_velocity(body, Vec3::ZERO);
        physics.set_angular_velocity(body, Vec3::ZERO);
        physics.set_mode(body, BodyMode::Kinematic);
        physics.set_gravity_scale(body, 0.0);

        *self = Grip::Held { entity, body, saved };
        true
    }

    /// Hand the held body back to the simulation as it was before the grab.
    pub fn release(&mut self, physics: &mut PhysicsWorld) -> Option<EntityId> {
        match std::mem::take(self) {
            Grip::Held { entity, body, saved } => {
                physics.restore(body, &saved);
                Some(entity)
            }
            Grip::Free => None,
        }
    }

    /// Release and launch with `velocity`.
    pub fn throw(&mut self, physics: &mut PhysicsWorld, velocity: Vec3) -> Option<EntityId> {
        let body = self.held_body()?;
        let entity = self.release(physics)?;
        physics.set_linear_velocity(body, velocity);
        Some(entity)
    }

    /// Keep the held body at `target`.
    pub fn carry(&self, physics: &mut PhysicsWorld, target: Vec3) {
        if let Grip::Held { body, .. } = self {
            physics.set_position(*body, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyDesc, Shape};

    fn world_with_cube() -> (PhysicsWorld, BodyHandle) {
        let mut world = PhysicsWorld::new(Vec3::new(0.0, -9.82, 0.0));
        world.add_body(&BodyDesc::new(Shape::Plane, 0.0, Vec3::ZERO));
        let cube = world.add_body(&BodyDesc::new(
            Shape::Cuboid { half_extents: Vec3::splat(0.5) },
            1.0,
            Vec3::new(0.0, 0.5, 0.0),
        ));
        (world, cube)
    }

    #[test]
    fn grab_then_release_restores_body() {
        let (mut world, cube) = world_with_cube();
        let before = world.snapshot(cube).unwrap();
        let mut grip = Grip::Free;

        assert!(grip.grab(EntityId(1), cube, &mut world));
        assert_eq!(world.mode(cube), Some(BodyMode::Kinematic));
        assert_eq!(world.gravity_scale(cube), Some(0.0));
        assert_eq!(grip.held_entity(), Some(EntityId(1)));

        assert_eq!(grip.release(&mut world), Some(EntityId(1)));
        assert_eq!(grip, Grip::Free);
        assert_eq!(world.snapshot(cube), Some(before));
    }

    #[test]
    fn second_grab_is_refused() {
        let (mut world, cube) = world_with_cube();
        let mut grip = Grip::Free;
        assert!(grip.grab(EntityId(1), cube, &mut world));
        assert!(!grip.grab(EntityId(1), cube, &mut world));
    }

    #[test]
    fn release_when_free_is_a_no_op() {
        let (mut world, _) = world_with_cube();
        let mut grip = Grip::Free;
        assert_eq!(grip.release(&mut world), None);
        assert_eq!(grip.throw(&mut world, Vec3::X), None);
    }

    #[test]
    fn throw_releases_and_launches() {
        let (mut world, cube) = world_with_cube();
        let mut grip = Grip::Free;
        grip.grab(EntityId(1), cube, &mut world);
        grip.carry(&mut world, Vec3::new(0.0, 2.0, -2.0));
        assert!((world.position(cube).unwrap().y - 2.0).abs() < 1e-5);

        assert_eq!(grip.throw(&mut world, Vec3::new(0.0, 0.0, -25.0)), Some(EntityId(1)));
        assert!(!grip.is_held());
        assert_eq!(world.mode(cube), Some(BodyMode::Dynamic));
        assert!((world.linear_velocity(cube).unwrap().z + 25.0).abs() < 1e-4);
    }
}
