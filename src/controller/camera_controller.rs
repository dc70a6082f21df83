use glam::Vec3;

use crate::model::camera::{Camera, PITCH_LIMIT};

/// Turns mouse motion into view angles and keeps the eye on the player.
pub struct CameraController {
    pub mouse_sensitivity: f32,
    pub eye_height: f32,
}

impl CameraController {
    pub fn new(mouse_sensitivity: f32, eye_height: f32) -> Self {
        Self { mouse_sensitivity, eye_height }
    }

    /// Apply mouse look delta to camera
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.yaw += dx * self.mouse_sensitivity;
        camera.pitch = (camera.pitch - dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Sync camera from player position
    pub fn sync_camera_from_player(&self, camera: &mut Camera, player_pos: Vec3) {
        camera.eye = player_pos + Vec3::new(0.0, self.eye_height, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_clamped() {
        let ctl = CameraController::new(0.002, 0.6);
        let mut cam = Camera::new(800, 600, 75.0);
        ctl.apply_look(&mut cam, 0.0, -100_000.0);
        assert!((cam.pitch - PITCH_LIMIT).abs() < 1e-6);
        ctl.apply_look(&mut cam, 0.0, 100_000.0);
        assert!((cam.pitch + PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn moving_right_turns_right() {
        let ctl = CameraController::new(0.002, 0.6);
        let mut cam = Camera::new(800, 600, 75.0);
        ctl.apply_look(&mut cam, 200.0, 0.0);
        assert!(cam.forward().x > 0.0);
    }

    #[test]
    fn eye_rides_above_player() {
        let ctl = CameraController::new(0.002, 0.6);
        let mut cam = Camera::new(800, 600, 75.0);
        ctl.sync_camera_from_player(&mut cam, Vec3::new(1.0, 1.0, 5.0));
        assert!((cam.eye - Vec3::new(1.0, 1.6, 5.0)).length() < 1e-6);
    }
}
