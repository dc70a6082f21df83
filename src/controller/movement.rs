use glam::Vec3;

use crate::config::MovementSettings;

use super::input::MovementFlags;

/// Target horizontal velocity for the held movement keys, relative to
/// `facing` projected onto the ground plane.
///
/// Opposite keys cancel and diagonals are normalised, so the result is
/// either zero or exactly `base_speed` (times the sprint multiplier).
pub fn horizontal_velocity(flags: &MovementFlags, facing: Vec3, settings: &MovementSettings) -> Vec3 {
    let forward = Vec3::new(facing.x, 0.0, facing.z).normalize_or_zero();
    let right = forward.cross(Vec3::Y).normalize_or_zero();

    let mut wish = Vec3::ZERO;
    if flags.forward {
        wish += forward;
    }
    if flags.back {
        wish -= forward;
    }
    if flags.right {
        wish += right;
    }
    if flags.left {
        wish -= right;
    }

    let speed = if flags.sprint {
        settings.base_speed * settings.sprint_multiplier
    } else {
        settings.base_speed
    };
    wish.normalize_or_zero() * speed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(f: impl FnOnce(&mut MovementFlags)) -> MovementFlags {
        let mut flags = MovementFlags::default();
        f(&mut flags);
        flags
    }

    #[test]
    fn idle_is_zero() {
        let v = horizontal_velocity(&MovementFlags::default(), Vec3::NEG_Z, &MovementSettings::default());
        assert_eq!(v, Vec3::ZERO);
    }

    #[test]
    fn forward_follows_facing() {
        let s = MovementSettings::default();
        let v = horizontal_velocity(&flags(|f| f.forward = true), Vec3::NEG_Z, &s);
        assert!((v - Vec3::new(0.0, 0.0, -10.0)).length() < 1e-5);

        let v = horizontal_velocity(&flags(|f| f.right = true), Vec3::NEG_Z, &s);
        assert!((v - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn pitch_does_not_slow_walking() {
        let s = MovementSettings::default();
        let facing = Vec3::new(0.0, -0.9, -0.1).normalize();
        let v = horizontal_velocity(&flags(|f| f.forward = true), facing, &s);
        assert_eq!(v.y, 0.0);
        assert!((v.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn diagonal_is_normalised_and_sprint_doubles() {
        let s = MovementSettings::default();
        let v = horizontal_velocity(
            &flags(|f| {
                f.forward = true;
                f.left = true;
                f.sprint = true;
            }),
            Vec3::NEG_Z,
            &s,
        );
        assert!((v.length() - 20.0).abs() < 1e-4);
        assert!(v.x < 0.0 && v.z < 0.0);
    }

    #[test]
    fn opposite_keys_cancel() {
        let s = MovementSettings::default();
        let v = horizontal_velocity(
            &flags(|f| {
                f.forward = true;
                f.back = true;
            }),
            Vec3::NEG_Z,
            &s,
        );
        assert_eq!(v, Vec3::ZERO);
    }

    #[test]
    fn every_key_combination_is_zero_or_full_speed() {
        let s = MovementSettings::default();
        let facing = Vec3::new(0.6, -0.3, -0.8);
        for bits in 0u8..32 {
            let f = MovementFlags {
                forward: bits & 1 != 0,
                back: bits & 2 != 0,
                left: bits & 4 != 0,
                right: bits & 8 != 0,
                sprint: bits & 16 != 0,
            };
            let v = horizontal_velocity(&f, facing, &s);
            assert_eq!(v.y, 0.0, "{f:?}");

            let along = f.forward != f.back;
            let across = f.left != f.right;
            if along || across {
                let speed = if f.sprint { s.base_speed * s.sprint_multiplier } else { s.base_speed };
                assert!((v.length() - speed).abs() < 1e-4, "{f:?} gave {v:?}");
            } else {
                assert_eq!(v, Vec3::ZERO, "{f:?}");
            }
        }
    }
}
