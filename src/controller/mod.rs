// CONTROLLER: input, gameplay rules, session and the per-frame update
pub mod input;
pub mod movement;
pub mod grip;
pub mod camera_controller;
pub mod session;
pub mod frame_loop;
pub mod game;

pub use input::{Action, InputEvent, InputState, KeyBindings, MovementFlags};
pub use grip::Grip;
pub use camera_controller::CameraController;
pub use session::{Session, SessionState};
pub use frame_loop::{FrameController, FrameStats, Interaction};
pub use game::{Effects, Game};
