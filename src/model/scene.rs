use glam::{Quat, Vec3};

use crate::config::SceneSettings;
use crate::physics::{BodyDesc, BodyHandle, CollisionFilter, PhysicsWorld, Shape};

use super::entity::{Entity, EntityId, EntityKind};

const GROUP_STATIC: u32 = 1 << 0;
const GROUP_PROPS: u32 = 1 << 1;
const GROUP_PLAYER: u32 = 1 << 2;

/// Size the ground is drawn at. The collider itself is an infinite plane.
const GROUND_EXTENT: f32 = 100.0;

/// The entities of a level and the player body that walks through it.
pub struct Scene {
    entities: Vec<Entity>,
    player: BodyHandle,
    pub sky_color: [f32; 4],
}

struct Groups {
    statics: CollisionFilter,
    props: CollisionFilter,
    player: CollisionFilter,
}

impl Groups {
    fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                statics: CollisionFilter::ALL,
                props: CollisionFilter::ALL,
                player: CollisionFilter::ALL,
            };
        }
        Self {
            statics: CollisionFilter { memberships: GROUP_STATIC, filter: GROUP_PROPS | GROUP_PLAYER },
            props: CollisionFilter { memberships: GROUP_PROPS, filter: GROUP_STATIC | GROUP_PROPS },
            player: CollisionFilter { memberships: GROUP_PLAYER, filter: GROUP_STATIC },
        }
    }
}

impl Scene {
    /// Creates the ground, walls, props and player in `physics`.
    pub fn build(settings: &SceneSettings, physics: &mut PhysicsWorld) -> Self {
        let groups = Groups::new(settings.collision_groups);
        let mut scene = Self {
            entities: Vec::new(),
            player: BodyHandle::invalid(),
            sky_color: if settings.sky {
                let [r, g, b] = settings.sky_color;
                [r, g, b, 1.0]
            } else {
                [0.1, 0.1, 0.12, 1.0]
            },
        };

        let ground = physics.add_body(&BodyDesc::new(Shape::Plane, 0.0, Vec3::ZERO).with_filter(groups.statics));
        scene.push(Entity {
            name: "ground",
            kind: EntityKind::Ground,
            body: ground,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::new(GROUND_EXTENT, 1.0, GROUND_EXTENT),
            color: [0.35, 0.55, 0.3, 1.0],
            interactable: false,
        });

        scene.add_wall(physics, "back wall", Vec3::new(0.0, 2.5, -10.0), Vec3::new(20.0, 5.0, 0.5), &groups);
        if settings.walls >= 2 {
            scene.add_wall(physics, "side wall", Vec3::new(-10.0, 2.5, 0.0), Vec3::new(0.5, 5.0, 20.0), &groups);
        }

        let cube_at = Vec3::new(2.0, 0.5, 0.0);
        let cube = physics.add_body(
            &BodyDesc::new(Shape::Cuboid { half_extents: Vec3::splat(0.5) }, 1.0, cube_at).with_filter(groups.props),
        );
        scene.push(Entity {
            name: "cube",
            kind: EntityKind::Cube,
            body: cube,
            position: cube_at,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            color: [0.85, 0.3, 0.25, 1.0],
            interactable: true,
        });

        let sphere_at = Vec3::new(-2.0, 0.5, 0.0);
        let sphere = physics.add_body(
            &BodyDesc::new(Shape::Ball { radius: 0.5 }, 1.0, sphere_at).with_filter(groups.props),
        );
        scene.push(Entity {
            name: "sphere",
            kind: EntityKind::Sphere,
            body: sphere,
            position: sphere_at,
            rotation: Quat::IDENTITY,
            // unit sphere mesh has radius 1
            scale: Vec3::splat(0.5),
            color: [0.25, 0.45, 0.85, 1.0],
            interactable: true,
        });

        scene.player = physics.add_body(
            &BodyDesc::new(
                Shape::Ball { radius: settings.player_radius },
                settings.player_mass,
                Vec3::from(settings.player_spawn),
            )
            .with_filter(groups.player)
            .with_locked_rotations()
            .with_friction(0.0),
        );

        tracing::info!(
            entities = scene.entities.len(),
            walls = settings.walls,
            collision_groups = settings.collision_groups,
            "scene built"
        );
        scene
    }

    fn add_wall(&mut self, physics: &mut PhysicsWorld, name: &'static str, center: Vec3, size: Vec3, groups: &Groups) {
        let body = physics.add_body(
            &BodyDesc::new(Shape::Cuboid { half_extents: size * 0.5 }, 0.0, center).with_filter(groups.statics),
        );
        self.push(Entity {
            name,
            kind: EntityKind::Wall,
            body,
            position: center,
            rotation: Quat::IDENTITY,
            scale: size,
            color: [0.7, 0.7, 0.68, 1.0],
            interactable: false,
        });
    }

    fn push(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        EntityId(self.entities.len() - 1)
    }

    pub fn player(&self) -> BodyHandle {
        self.player
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.entities.iter().position(|e| e.name == name).map(EntityId)
    }

    pub fn find_by_body(&self, body: BodyHandle) -> Option<EntityId> {
        self.entities.iter().position(|e| e.body == body).map(EntityId)
    }

    pub fn interactable_bodies(&self) -> Vec<BodyHandle> {
        self.entities.iter().filter(|e| e.interactable).map(|e| e.body).collect()
    }

    /// Copies simulated poses onto the visuals.
    pub fn sync_from_physics(&mut self, physics: &PhysicsWorld) {
        for entity in &mut self.entities {
            if let Some(position) = physics.position(entity.body) {
                entity.position = position;
            }
            if let Some(rotation) = physics.rotation(entity.body) {
                entity.rotation = rotation;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BodyMode;

    fn build(walls: u8) -> (Scene, PhysicsWorld) {
        let mut physics = PhysicsWorld::new(Vec3::new(0.0, -9.82, 0.0));
        let settings = SceneSettings { walls, ..SceneSettings::default() };
        let scene = Scene::build(&settings, &mut physics);
        (scene, physics)
    }

    #[test]
    fn default_layout() {
        let (scene, physics) = build(1);
        // ground, back wall, cube, sphere
        assert_eq!(scene.entities().len(), 4);
        // plus the player
        assert_eq!(physics.body_count(), 5);
        assert_eq!(scene.interactable_bodies().len(), 2);
        assert_eq!(physics.mode(scene.player()), Some(BodyMode::Dynamic));
        assert!((physics.mass(scene.player()).unwrap() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn second_wall_is_optional() {
        let (scene, _) = build(2);
        assert!(scene.find("side wall").is_some());
        let (scene, _) = build(1);
        assert!(scene.find("side wall").is_none());
    }

    #[test]
    fn sync_moves_visuals_with_bodies() {
        let (mut scene, mut physics) = build(1);
        let cube = scene.find("cube").unwrap();
        let body = scene.entity(cube).unwrap().body;
        physics.set_position(body, Vec3::new(0.0, 3.0, 0.0));
        scene.sync_from_physics(&physics);
        assert!((scene.entity(cube).unwrap().position.y - 3.0).abs() < 1e-5);
        assert_eq!(scene.find_by_body(body), Some(cube));
    }
}
