//! Tunables for movement, physics, interaction and scene layout.
//!
//! Every section has its own defaults, so a JSON file only has to name the
//! values it changes:
//!
//! ```json
//! { "movement": { "base_speed": 12.0 }, "scene": { "walls": 2 } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::controller::input::KeyBindings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub movement: MovementSettings,
    pub look: LookSettings,
    pub physics: PhysicsSettings,
    pub interaction: InteractionSettings,
    pub scene: SceneSettings,
    pub keys: KeyBindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Walking speed in units per second
    pub base_speed: f32,
    pub sprint_multiplier: f32,
    /// Vertical velocity set by a jump
    pub jump_speed: f32,
    /// Camera eye above the player body's centre
    pub eye_height: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            base_speed: 10.0,
            sprint_multiplier: 2.0,
            jump_speed: 10.0,
            eye_height: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookSettings {
    /// Radians per pixel of mouse movement
    pub sensitivity: f32,
    pub fov_deg: f32,
}

impl Default for LookSettings {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            fov_deg: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: [f32; 3],
    /// Seconds per simulation step
    pub fixed_step: f32,
    /// Most steps simulated per frame; time beyond this is dropped
    pub max_sub_steps: u32,
    /// Minimum `normal . up` for a contact to count as standing on something
    pub grounded_threshold: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.82, 0.0],
            fixed_step: 1.0 / 60.0,
            max_sub_steps: 3,
            grounded_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Farthest a prop can be from the eye and still be picked up
    pub pickup_distance: f32,
    /// Distance in front of the eye a held prop is kept at
    pub hold_distance: f32,
    pub throw_speed: f32,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            pickup_distance: 2.5,
            hold_distance: 2.0,
            throw_speed: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// 1 = back wall only, 2 = back and side wall
    pub walls: u8,
    /// Clear to `sky_color` instead of a neutral grey
    pub sky: bool,
    pub sky_color: [f32; 3],
    /// Props and the player stop colliding with each other
    pub collision_groups: bool,
    pub player_spawn: [f32; 3],
    pub player_radius: f32,
    pub player_mass: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            walls: 1,
            sky: true,
            sky_color: [0.53, 0.81, 0.92],
            collision_groups: false,
            player_spawn: [0.0, 1.0, 5.0],
            player_radius: 1.0,
            player_mass: 5.0,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("movement.base_speed", self.movement.base_speed),
            ("movement.sprint_multiplier", self.movement.sprint_multiplier),
            ("physics.fixed_step", self.physics.fixed_step),
            ("interaction.pickup_distance", self.interaction.pickup_distance),
            ("interaction.hold_distance", self.interaction.hold_distance),
            ("scene.player_radius", self.scene.player_radius),
            ("scene.player_mass", self.scene.player_mass),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("movement.jump_speed", self.movement.jump_speed),
            ("movement.eye_height", self.movement.eye_height),
            ("look.sensitivity", self.look.sensitivity),
            ("interaction.throw_speed", self.interaction.throw_speed),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must not be negative, got {value}")));
            }
        }
        let fov = self.look.fov_deg;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(ConfigError::Invalid(format!("look.fov_deg must be in (0, 180), got {fov}")));
        }
        let threshold = self.physics.grounded_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "physics.grounded_threshold must be in [-1, 1], got {threshold}"
            )));
        }
        if !self.physics.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigError::Invalid("physics.gravity must be finite".into()));
        }
        if self.physics.max_sub_steps == 0 {
            return Err(ConfigError::Invalid("physics.max_sub_steps must be at least 1".into()));
        }
        if !(1..=2).contains(&self.scene.walls) {
            return Err(ConfigError::Invalid(format!(
                "scene.walls must be 1 or 2, got {}",
                self.scene.walls
            )));
        }
        Ok(())
    }
}
