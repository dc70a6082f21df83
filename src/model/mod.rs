// MODEL: scene data and the camera
pub mod camera;
pub mod entity;
pub mod scene;

pub use camera::Camera;
pub use entity::{Entity, EntityId, EntityKind, MeshKind};
pub use scene::Scene;
