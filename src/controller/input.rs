/// Platform-agnostic input handling
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Platform-independent input events. Keys are physical key codes
/// ("KeyW", "ShiftLeft", "Space") so layouts don't move the controls.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown { code: String, repeat: bool },
    KeyUp(String),
    MouseMove { dx: f32, dy: f32 },
    /// Primary button pressed over the canvas/window
    PointerPressed,
    PointerLockChanged { locked: bool },
}

/// Discrete things a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Jump,
    Interact,
    Throw,
    StartOrResume,
    TogglePause,
}

impl Action {
    /// Actions that change the world rather than the session
    pub fn is_gameplay(self) -> bool {
        matches!(self, Action::Jump | Action::Interact | Action::Throw)
    }
}

/// Held movement keys. A flag is true exactly while at least one key bound
/// to it is down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementFlags {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
}

pub struct InputState {
    pub flags: MovementFlags,
    pub look_delta: (f32, f32),
    pub pointer_locked: bool,
    /// Movement key codes currently down
    held: HashSet<String>,
    processor: InputProcessor,
}

impl InputState {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            flags: MovementFlags::default(),
            look_delta: (0.0, 0.0),
            pointer_locked: false,
            held: HashSet::new(),
            processor: InputProcessor::new(bindings),
        }
    }

    /// Update held state from `event`, returning the action it triggers.
    /// Auto-repeated key downs keep flags set but trigger nothing.
    pub fn process_event(&mut self, event: &InputEvent) -> Option<Action> {
        match event {
            InputEvent::KeyDown { code, repeat } => {
                let control = self.processor.control_for(code)?;
                match control {
                    Control::Move(flag) => {
                        self.held.insert(code.clone());
                        self.refresh_flag(flag);
                        None
                    }
                    Control::Trigger(action) if !repeat => Some(action),
                    Control::Trigger(_) => None,
                }
            }
            InputEvent::KeyUp(code) => {
                if let Some(Control::Move(flag)) = self.processor.control_for(code) {
                    self.held.remove(code);
                    self.refresh_flag(flag);
                }
                None
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta.0 += dx;
                    self.look_delta.1 += dy;
                }
                None
            }
            InputEvent::PointerPressed => None,
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
                None
            }
        }
    }

    fn refresh_flag(&mut self, flag: Flag) {
        let processor = &self.processor;
        let down = self
            .held
            .iter()
            .any(|code| processor.control_for(code) == Some(Control::Move(flag)));
        match flag {
            Flag::Forward => self.flags.forward = down,
            Flag::Back => self.flags.back = down,
            Flag::Left => self.flags.left = down,
            Flag::Right => self.flags.right = down,
            Flag::Sprint => self.flags.sprint = down,
        }
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        let result = self.look_delta;
        self.look_delta = (0.0, 0.0);
        result
    }
}

/// Key mapping configuration, by key code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub sprint: String,
    pub jump: String,
    pub interact: String,
    pub throw: String,
    pub start: String,
    pub pause: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "KeyW".to_string(),
            backward: "KeyS".to_string(),
            left: "KeyA".to_string(),
            right: "KeyD".to_string(),
            sprint: "ShiftLeft".to_string(),
            jump: "Space".to_string(),
            interact: "KeyE".to_string(),
            throw: "KeyF".to_string(),
            start: "Enter".to_string(),
            pause: "Escape".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Forward,
    Back,
    Left,
    Right,
    Sprint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Move(Flag),
    Trigger(Action),
}

/// Resolves key codes against the bindings. Arrow keys always move.
#[derive(Clone)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    fn control_for(&self, code: &str) -> Option<Control> {
        let b = &self.bindings;
        let control = if code == b.forward || code == "ArrowUp" {
            Control::Move(Flag::Forward)
        } else if code == b.backward || code == "ArrowDown" {
            Control::Move(Flag::Back)
        } else if code == b.left || code == "ArrowLeft" {
            Control::Move(Flag::Left)
        } else if code == b.right || code == "ArrowRight" {
            Control::Move(Flag::Right)
        } else if code == b.sprint || (b.sprint == "ShiftLeft" && code == "ShiftRight") {
            Control::Move(Flag::Sprint)
        } else if code == b.jump {
            Control::Trigger(Action::Jump)
        } else if code == b.interact {
            Control::Trigger(Action::Interact)
        } else if code == b.throw {
            Control::Trigger(Action::Throw)
        } else if code == b.start || code == "NumpadEnter" {
            Control::Trigger(Action::StartOrResume)
        } else if code == b.pause {
            Control::Trigger(Action::TogglePause)
        } else {
            return None;
        };
        Some(control)
    }
}

pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        if is_down {
            InputEvent::KeyDown { code: e.code(), repeat: e.repeat() }
        } else {
            InputEvent::KeyUp(e.code())
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove {
            dx: e.movement_x() as f32,
            dy: e.movement_y() as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(code: &str) -> InputEvent {
        InputEvent::KeyDown { code: code.to_string(), repeat: false }
    }

    fn up(code: &str) -> InputEvent {
        InputEvent::KeyUp(code.to_string())
    }

    #[test]
    fn flags_follow_key_edges() {
        let mut input = InputState::new(KeyBindings::default());
        input.process_event(&down("KeyW"));
        input.process_event(&down("ShiftLeft"));
        assert!(input.flags.forward && input.flags.sprint);
        input.process_event(&up("KeyW"));
        assert!(!input.flags.forward);
        assert!(input.flags.sprint);
    }

    #[test]
    fn arrows_alias_movement() {
        let mut input = InputState::new(KeyBindings::default());
        input.process_event(&down("ArrowLeft"));
        assert!(input.flags.left);
        // releasing a key that was never pressed changes nothing
        input.process_event(&up("KeyA"));
        assert!(input.flags.left);
        input.process_event(&up("ArrowLeft"));
        assert!(!input.flags.left);
    }

    #[test]
    fn overlapping_keys_hold_flag_until_last_release() {
        let mut input = InputState::new(KeyBindings::default());
        input.process_event(&down("KeyW"));
        input.process_event(&down("ArrowUp"));
        input.process_event(&up("KeyW"));
        assert!(input.flags.forward);
        input.process_event(&up("ArrowUp"));
        assert!(!input.flags.forward);

        input.process_event(&down("ShiftLeft"));
        input.process_event(&down("ShiftRight"));
        input.process_event(&up("ShiftRight"));
        assert!(input.flags.sprint);
        input.process_event(&up("ShiftLeft"));
        assert!(!input.flags.sprint);
    }

    #[test]
    fn repeats_do_not_retrigger_actions() {
        let mut input = InputState::new(KeyBindings::default());
        assert_eq!(input.process_event(&down("Space")), Some(Action::Jump));
        let repeat = InputEvent::KeyDown { code: "Space".into(), repeat: true };
        assert_eq!(input.process_event(&repeat), None);
        assert_eq!(input.process_event(&down("KeyE")), Some(Action::Interact));
        assert_eq!(input.process_event(&down("KeyF")), Some(Action::Throw));
        assert_eq!(input.process_event(&down("Enter")), Some(Action::StartOrResume));
        assert_eq!(input.process_event(&down("Escape")), Some(Action::TogglePause));
        assert_eq!(input.process_event(&down("KeyQ")), None);
    }

    #[test]
    fn look_only_accumulates_while_locked() {
        let mut input = InputState::new(KeyBindings::default());
        input.process_event(&InputEvent::MouseMove { dx: 5.0, dy: 1.0 });
        assert_eq!(input.consume_look(), (0.0, 0.0));

        input.process_event(&InputEvent::PointerLockChanged { locked: true });
        input.process_event(&InputEvent::MouseMove { dx: 5.0, dy: 1.0 });
        input.process_event(&InputEvent::MouseMove { dx: 1.0, dy: 1.0 });
        assert_eq!(input.consume_look(), (6.0, 2.0));
        assert_eq!(input.consume_look(), (0.0, 0.0));
    }

    #[test]
    fn rebinding_moves_controls() {
        let bindings = KeyBindings { jump: "KeyJ".into(), ..KeyBindings::default() };
        let mut input = InputState::new(bindings);
        assert_eq!(input.process_event(&down("Space")), None);
        assert_eq!(input.process_event(&down("KeyJ")), Some(Action::Jump));
    }
}
