use glam::{Mat4, Quat, Vec3};

use crate::physics::BodyHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Ground,
    Wall,
    Cube,
    Sphere,
}

/// Which mesh a visual is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    Plane,
    Cube,
    Sphere,
}

impl EntityKind {
    pub fn mesh(self) -> MeshKind {
        match self {
            EntityKind::Ground => MeshKind::Plane,
            EntityKind::Wall | EntityKind::Cube => MeshKind::Cube,
            EntityKind::Sphere => MeshKind::Sphere,
        }
    }
}

/// A renderable paired with the rigid body that drives it.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: &'static str,
    pub kind: EntityKind,
    pub body: BodyHandle,
    pub position: Vec3,
    pub rotation: Quat,
    /// Size of the unit mesh in world units
    pub scale: Vec3,
    pub color: [f32; 4],
    /// Can be picked up and thrown
    pub interactable: bool,
}

impl Entity {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
