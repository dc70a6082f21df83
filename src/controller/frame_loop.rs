use glam::Vec3;

use crate::config::Settings;
use crate::model::{Camera, EntityId, Scene};
use crate::physics::PhysicsWorld;

use super::camera_controller::CameraController;
use super::grip::Grip;
use super::input::{Action, InputEvent, InputState};
use super::movement::horizontal_velocity;

/// A contact only grounds the player if the player is not already moving
/// away from it faster than this. Keeps the contact a jump starts from
/// from re-arming the jump.
const SEPARATING_SPEED: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    PickedUp(EntityId),
    Dropped(EntityId),
    Nothing,
}

/// Rolling frame statistics for the debug overlay
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub last_dt: f32,
    pub last_sub_steps: u32,
    pub fps: f32,
    fps_timer: f32,
    fps_frames: u32,
}

impl FrameStats {
    fn record(&mut self, dt: f32, sub_steps: u32) {
        self.frames += 1;
        self.last_dt = dt;
        self.last_sub_steps = sub_steps;
        self.fps_frames += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.fps_frames as f32 / self.fps_timer;
            self.fps_frames = 0;
            self.fps_timer = 0.0;
        }
    }
}

/// Owns the simulated world and advances it one frame at a time.
pub struct FrameController {
    settings: Settings,
    pub physics: PhysicsWorld,
    pub scene: Scene,
    pub camera: Camera,
    pub input: InputState,
    camera_controller: CameraController,
    grip: Grip,
    grounded: bool,
    stats: FrameStats,
}

impl FrameController {
    pub fn new(settings: Settings, width: u32, height: u32) -> Self {
        let mut physics = PhysicsWorld::new(Vec3::from(settings.physics.gravity));
        let scene = Scene::build(&settings.scene, &mut physics);

        let mut camera = Camera::new(width, height, settings.look.fov_deg);
        let camera_controller = CameraController::new(settings.look.sensitivity, settings.movement.eye_height);
        let spawn = physics
            .position(scene.player())
            .unwrap_or_else(|| Vec3::from(settings.scene.player_spawn));
        camera_controller.sync_camera_from_player(&mut camera, spawn);

        let input = InputState::new(settings.keys.clone());

        Self {
            settings,
            physics,
            scene,
            camera,
            input,
            camera_controller,
            grip: Grip::Free,
            grounded: false,
            stats: FrameStats::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn held(&self) -> Option<EntityId> {
        self.grip.held_entity()
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn player_position(&self) -> Vec3 {
        self.physics.position(self.scene.player()).unwrap_or(Vec3::ZERO)
    }

    pub fn player_velocity(&self) -> Vec3 {
        self.physics.linear_velocity(self.scene.player()).unwrap_or(Vec3::ZERO)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    /// Advance the world by `wall_dt` seconds. Returns the number of
    /// physics steps that were simulated.
    pub fn tick(&mut self, wall_dt: f32) -> u32 {
        let physics = &self.settings.physics;
        let sub_steps = self.physics.step(physics.fixed_step, wall_dt, physics.max_sub_steps);
        if sub_steps > 0 {
            self.observe_ground();
        }

        let (dx, dy) = self.input.consume_look();
        self.camera_controller.apply_look(&mut self.camera, dx, dy);

        // horizontal velocity is ours, vertical belongs to the simulation
        let player = self.scene.player();
        let horizontal = horizontal_velocity(
            &self.input.flags,
            self.camera.horizontal_forward(),
            &self.settings.movement,
        );
        let vy = self.player_velocity().y;
        self.physics
            .set_linear_velocity(player, Vec3::new(horizontal.x, vy, horizontal.z));

        let position = self.player_position();
        self.camera_controller.sync_camera_from_player(&mut self.camera, position);

        let target = self.hold_target();
        self.grip.carry(&mut self.physics, target);

        self.scene.sync_from_physics(&self.physics);
        self.stats.record(wall_dt, sub_steps);
        sub_steps
    }

    fn observe_ground(&mut self) {
        let player = self.scene.player();
        let velocity = self.player_velocity();
        let threshold = self.settings.physics.grounded_threshold;
        let standing = self
            .physics
            .contacts(player)
            .iter()
            .any(|c| c.normal.dot(Vec3::Y) > threshold && velocity.dot(c.normal) <= SEPARATING_SPEED);
        if standing && !self.grounded {
            tracing::trace!("player grounded");
            self.grounded = true;
        }
    }

    /// Where a held prop is kept: straight ahead of the eye.
    pub fn hold_target(&self) -> Vec3 {
        self.camera.eye + self.camera.forward() * self.settings.interaction.hold_distance
    }

    /// Update input state from `event` and carry out any gameplay action
    /// it triggers. Session-level actions are handed back to the caller.
    pub fn handle_event(&mut self, event: &InputEvent, gameplay_enabled: bool) -> Option<Action> {
        let action = self.input.process_event(event)?;
        if action.is_gameplay() {
            if gameplay_enabled {
                self.perform(action);
            }
            return None;
        }
        Some(action)
    }

    pub fn perform(&mut self, action: Action) {
        match action {
            Action::Jump => {
                self.jump();
            }
            Action::Interact => {
                self.interact();
            }
            Action::Throw => {
                self.throw();
            }
            Action::StartOrResume | Action::TogglePause => {}
        }
    }

    /// Set the jump velocity if grounded. Returns whether a jump happened.
    pub fn jump(&mut self) -> bool {
        if !self.grounded {
            return false;
        }
        let player = self.scene.player();
        let v = self.player_velocity();
        self.physics
            .set_linear_velocity(player, Vec3::new(v.x, self.settings.movement.jump_speed, v.z));
        self.grounded = false;
        tracing::debug!("jump");
        true
    }

    /// Drop what is held, or else pick up the prop under the crosshair if it
    /// is within reach.
    pub fn interact(&mut self) -> Interaction {
        if let Some(entity) = self.grip.release(&mut self.physics) {
            tracing::debug!(?entity, "dropped");
            return Interaction::Dropped(entity);
        }

        // the ray only picks the target; reach is judged from the body below
        let candidates = self.scene.interactable_bodies();
        let Some(hit) = self
            .physics
            .cast_ray(self.camera.eye, self.camera.forward(), f32::MAX, &candidates)
        else {
            return Interaction::Nothing;
        };
        let Some(entity) = self.scene.find_by_body(hit.body) else {
            return Interaction::Nothing;
        };
        // player body centre to prop centre
        let centre = self.physics.position(hit.body).unwrap_or(hit.point);
        let distance = self.player_position().distance(centre);
        if distance > self.settings.interaction.pickup_distance {
            tracing::debug!(?entity, distance, "out of reach");
            return Interaction::Nothing;
        }

        if !self.grip.grab(entity, hit.body, &mut self.physics) {
            return Interaction::Nothing;
        }
        let target = self.hold_target();
        self.grip.carry(&mut self.physics, target);
        tracing::debug!(?entity, "picked up");
        Interaction::PickedUp(entity)
    }

    /// Launch the held prop along the view direction.
    pub fn throw(&mut self) -> Option<EntityId> {
        let velocity = self.camera.forward() * self.settings.interaction.throw_speed;
        let entity = self.grip.throw(&mut self.physics, velocity)?;
        tracing::debug!(?entity, "thrown");
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn controller() -> FrameController {
        FrameController::new(Settings::default(), 800, 600)
    }

    fn settle(ctl: &mut FrameController, seconds: f32) {
        for _ in 0..(seconds / DT) as usize {
            ctl.tick(DT);
        }
    }

    #[test]
    fn camera_follows_player() {
        let mut ctl = controller();
        settle(&mut ctl, 0.5);
        let expected = ctl.player_position() + Vec3::Y * ctl.settings().movement.eye_height;
        assert!((ctl.camera.eye - expected).length() < 1e-4);
    }

    #[test]
    fn lands_and_becomes_grounded() {
        let mut ctl = controller();
        assert!(!ctl.grounded());
        settle(&mut ctl, 1.0);
        assert!(ctl.grounded());
        assert!((ctl.player_position().y - 1.0).abs() < 0.05);
    }

    #[test]
    fn airborne_jump_does_nothing() {
        let mut ctl = controller();
        let before = ctl.player_velocity();
        assert!(!ctl.jump());
        assert_eq!(ctl.player_velocity(), before);
    }

    #[test]
    fn jump_fires_once_until_landing() {
        let mut ctl = controller();
        settle(&mut ctl, 1.0);
        assert!(ctl.jump());
        assert!((ctl.player_velocity().y - 10.0).abs() < 1e-4);
        assert!(!ctl.jump());

        // still rising right after take-off, so no re-arm
        ctl.tick(DT);
        assert!(!ctl.grounded());

        settle(&mut ctl, 3.0);
        assert!(ctl.grounded());
    }

    #[test]
    fn walking_moves_along_facing() {
        let mut ctl = controller();
        settle(&mut ctl, 1.0);
        let start = ctl.player_position();
        ctl.handle_event(&InputEvent::KeyDown { code: "KeyW".into(), repeat: false }, true);
        settle(&mut ctl, 0.25);
        let moved = ctl.player_position() - start;
        assert!(moved.z < -1.0, "moved {moved:?}");
        assert!(moved.x.abs() < 0.1);
    }

    #[test]
    fn gameplay_actions_gated_by_flag() {
        let mut ctl = controller();
        settle(&mut ctl, 1.0);
        let space = InputEvent::KeyDown { code: "Space".into(), repeat: false };
        assert_eq!(ctl.handle_event(&space, false), None);
        assert!(ctl.grounded());
        ctl.handle_event(&InputEvent::KeyUp("Space".into()), false);
        ctl.handle_event(&space, true);
        assert!(!ctl.grounded());

        let esc = InputEvent::KeyDown { code: "Escape".into(), repeat: false };
        assert_eq!(ctl.handle_event(&esc, true), Some(Action::TogglePause));
    }

    #[test]
    fn interact_with_nothing_in_view() {
        let mut ctl = controller();
        settle(&mut ctl, 0.5);
        // spawn looks down -Z at the back wall; props sit off to the sides
        assert_eq!(ctl.interact(), Interaction::Nothing);
        assert_eq!(ctl.held(), None);
        assert_eq!(ctl.throw(), None);
    }
}
