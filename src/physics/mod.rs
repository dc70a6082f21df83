// PHYSICS: rigid-body world wrapper around rapier3d
pub mod stepper;
pub mod world;

pub use rapier3d::prelude::RigidBodyHandle as BodyHandle;
pub use stepper::FixedStepper;
pub use world::{BodyDesc, BodyMode, BodySnapshot, CollisionFilter, Contact, PhysicsWorld, RayHit, Shape};
