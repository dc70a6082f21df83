use crate::config::Settings;
use crate::error::AppError;

use super::frame_loop::FrameController;
use super::input::{Action, InputEvent};
use super::session::{Session, SessionState};

/// What the platform layer has to do after the game handled something.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    /// Schedule one frame callback
    pub request_frame: bool,
    /// Capture the pointer
    pub lock_pointer: bool,
    /// Release the pointer
    pub unlock_pointer: bool,
}

/// Frame controller plus the session that decides when it runs.
/// Shared by the browser and native entry points.
pub struct Game {
    pub controller: FrameController,
    pub session: Session,
}

impl Game {
    pub fn new(settings: Settings, width: u32, height: u32) -> Self {
        Self {
            controller: FrameController::new(settings, width, height),
            session: Session::new(),
        }
    }

    /// First frame so the start menu is visible.
    pub fn boot(&mut self) -> Effects {
        Effects {
            request_frame: self.session.request_frame(),
            ..Effects::default()
        }
    }

    pub fn handle_event(&mut self, event: &InputEvent) -> Effects {
        let mut effects = Effects::default();

        if let InputEvent::PointerLockChanged { locked } = event {
            effects.request_frame = self.session.pointer_lock_changed(*locked);
        }

        let running = self.session.is_running();
        let action = match event {
            InputEvent::PointerPressed if !running => Some(Action::StartOrResume),
            _ => self.controller.handle_event(event, running),
        };

        match action {
            Some(Action::StartOrResume) => {
                if self.session.state() != SessionState::Running {
                    effects.request_frame |= self.session.start();
                    effects.lock_pointer = true;
                }
            }
            Some(Action::TogglePause) => match self.session.state() {
                SessionState::Running => {
                    effects.request_frame |= self.session.pause();
                    effects.unlock_pointer = true;
                }
                SessionState::Paused => {
                    effects.request_frame |= self.session.resume();
                    effects.lock_pointer = true;
                }
                SessionState::Menu => {}
            },
            _ => {}
        }
        effects
    }

    /// Pointer capture could not be had; stay paused and say why.
    pub fn pointer_lock_failed(&mut self, error: &AppError) -> Effects {
        Effects {
            request_frame: self.session.report(error.to_string()),
            ..Effects::default()
        }
    }

    /// Runs the simulation part of one frame callback. The caller draws
    /// afterwards and then calls [`Game::end_frame`].
    pub fn begin_frame(&mut self, now_ms: f64) -> Option<u32> {
        let dt = self.session.begin_frame(now_ms)?;
        Some(self.controller.tick(dt))
    }

    pub fn end_frame(&mut self) -> Effects {
        Effects {
            request_frame: self.session.end_frame(),
            ..Effects::default()
        }
    }

    /// Redraw after a resize when nothing else would.
    pub fn resize(&mut self, width: u32, height: u32) -> Effects {
        self.controller.resize(width, height);
        Effects {
            request_frame: self.session.request_frame(),
            ..Effects::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str) -> InputEvent {
        InputEvent::KeyDown { code: code.to_string(), repeat: false }
    }

    #[test]
    fn enter_starts_and_locks() {
        let mut game = Game::new(Settings::default(), 800, 600);
        assert!(game.boot().request_frame);
        // boot frame not yet delivered, so starting doesn't add another
        let fx = game.handle_event(&key("Enter"));
        assert!(fx.lock_pointer);
        assert!(!fx.request_frame);
        assert!(game.session.is_running());
        assert_eq!(game.session.frames_requested(), 1);
    }

    #[test]
    fn escape_toggles() {
        let mut game = Game::new(Settings::default(), 800, 600);
        game.handle_event(&key("Enter"));
        game.begin_frame(0.0);
        game.end_frame();
        game.begin_frame(16.0);

        let fx = game.handle_event(&key("Escape"));
        assert!(fx.unlock_pointer && fx.request_frame);
        assert_eq!(game.session.state(), SessionState::Paused);

        game.begin_frame(32.0);
        let fx = game.handle_event(&key("Escape"));
        assert!(fx.lock_pointer && fx.request_frame);
        assert!(game.session.is_running());
    }

    #[test]
    fn click_starts_only_when_not_running() {
        let mut game = Game::new(Settings::default(), 800, 600);
        let fx = game.handle_event(&InputEvent::PointerPressed);
        assert!(fx.lock_pointer);
        let fx = game.handle_event(&InputEvent::PointerPressed);
        assert_eq!(fx, Effects::default());
    }

    #[test]
    fn pointer_lock_failure_pauses() {
        let mut game = Game::new(Settings::default(), 800, 600);
        game.handle_event(&key("Enter"));
        game.pointer_lock_failed(&AppError::PointerLockUnsupported);
        assert_eq!(game.session.state(), SessionState::Paused);
        assert!(game.session.diagnostic().is_some());
    }

    #[test]
    fn paused_frames_do_not_tick() {
        let mut game = Game::new(Settings::default(), 800, 600);
        assert_eq!(game.begin_frame(0.0), None);
        game.handle_event(&key("Enter"));
        assert_eq!(game.begin_frame(0.0), Some(0));
        assert!(game.end_frame().request_frame);
    }
}
