//! Start/pause/resume and the frame-request chain.
//!
//! Frames are requested one at a time: every frame asks for the next one
//! while the session runs, and the chain stops by simply not asking. At most
//! one request is ever outstanding, so resuming can never start a second
//! chain next to a live one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Title screen before the first start
    Menu,
    Running,
    Paused,
}

/// Turns timestamps into frame deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    /// Seconds since the previous call; zero on the first call after a reset.
    pub fn delta(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0).max(0.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        dt
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

pub struct Session {
    state: SessionState,
    frame_pending: bool,
    frames_requested: u64,
    clock: FrameClock,
    diagnostic: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Menu,
            frame_pending: false,
            frames_requested: 0,
            clock: FrameClock::default(),
            diagnostic: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Total frame requests issued, for diagnostics and tests
    pub fn frames_requested(&self) -> u64 {
        self.frames_requested
    }

    /// Last problem worth showing to the user
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Ask for a frame unless one is already on its way. Returns whether the
    /// caller must actually schedule one.
    pub fn request_frame(&mut self) -> bool {
        if self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        self.frames_requested += 1;
        true
    }

    /// Leave the menu. Same as resume when already past it.
    pub fn start(&mut self) -> bool {
        match self.state {
            SessionState::Menu => {
                tracing::info!("session started");
                self.run()
            }
            SessionState::Paused => self.resume(),
            SessionState::Running => false,
        }
    }

    /// Stop advancing the world. One more frame is drawn so the pause
    /// overlay shows up, after which the chain ends.
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.state = SessionState::Paused;
        tracing::info!("session paused");
        self.request_frame()
    }

    /// Continue from a pause with a fresh clock, so the time spent paused
    /// is not simulated.
    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        tracing::info!("session resumed");
        self.run()
    }

    fn run(&mut self) -> bool {
        self.state = SessionState::Running;
        self.diagnostic = None;
        self.clock.reset();
        self.request_frame()
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.state {
            SessionState::Running => self.pause(),
            SessionState::Paused => self.resume(),
            SessionState::Menu => false,
        }
    }

    /// Losing pointer lock while running pauses; gaining it is a no-op.
    pub fn pointer_lock_changed(&mut self, locked: bool) -> bool {
        if !locked && self.is_running() {
            return self.pause();
        }
        false
    }

    /// Something the session needs is unavailable; fall back to paused and
    /// keep the message for the overlay.
    pub fn report(&mut self, diagnostic: impl Into<String>) -> bool {
        let diagnostic = diagnostic.into();
        tracing::error!(%diagnostic, "session interrupted");
        self.diagnostic = Some(diagnostic);
        match self.state {
            SessionState::Running => self.pause(),
            _ => self.request_frame(),
        }
    }

    /// Called at the top of every frame callback. Returns the time step to
    /// simulate, or `None` if the frame should only draw.
    pub fn begin_frame(&mut self, now_ms: f64) -> Option<f32> {
        self.frame_pending = false;
        if self.is_running() {
            Some(self.clock.delta(now_ms))
        } else {
            None
        }
    }

    /// Called at the end of every frame callback. Returns whether the next
    /// frame must be scheduled.
    pub fn end_frame(&mut self) -> bool {
        if self.is_running() {
            self.request_frame()
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_menu_without_frames() {
        let s = Session::new();
        assert_eq!(s.state(), SessionState::Menu);
        assert_eq!(s.frames_requested(), 0);
    }

    #[test]
    fn running_chain_keeps_one_request_outstanding() {
        let mut s = Session::new();
        assert!(s.start());
        for i in 0..5 {
            assert!(s.begin_frame(i as f64 * 16.0).is_some());
            assert!(s.end_frame());
            assert!(s.frame_pending());
        }
        assert_eq!(s.frames_requested(), 6);
    }

    #[test]
    fn pause_draws_once_then_stops() {
        let mut s = Session::new();
        s.start();
        s.begin_frame(0.0);
        s.end_frame();

        // the running chain's request is still pending, so no extra one
        assert!(!s.pause());
        let requested = s.frames_requested();
        assert_eq!(s.begin_frame(16.0), None);
        assert!(!s.end_frame());
        assert!(!s.frame_pending());
        assert_eq!(s.frames_requested(), requested);
    }

    #[test]
    fn resume_requests_exactly_one_frame() {
        let mut s = Session::new();
        s.start();
        s.begin_frame(0.0);
        s.pause();
        s.begin_frame(16.0);
        s.end_frame();

        let before = s.frames_requested();
        assert!(s.resume());
        assert!(!s.resume());
        assert!(!s.start());
        assert_eq!(s.frames_requested(), before + 1);
    }

    #[test]
    fn resume_while_frame_pending_does_not_fork_chain() {
        let mut s = Session::new();
        s.start();
        s.begin_frame(0.0);
        s.end_frame();
        s.pause();
        // the already scheduled frame has not fired yet
        assert!(!s.resume());
        assert!(s.is_running());
        assert!(s.frame_pending());
    }

    #[test]
    fn clock_restarts_after_resume() {
        let mut s = Session::new();
        s.start();
        assert_eq!(s.begin_frame(1000.0), Some(0.0));
        s.end_frame();
        let dt = s.begin_frame(1016.0).unwrap();
        assert!((dt - 0.016).abs() < 1e-6);
        s.pause();
        s.begin_frame(1032.0);
        s.resume();
        // ten seconds in the pause menu are not simulated
        assert_eq!(s.begin_frame(11_032.0), Some(0.0));
    }

    #[test]
    fn losing_pointer_lock_pauses() {
        let mut s = Session::new();
        s.start();
        s.pointer_lock_changed(true);
        assert!(s.is_running());
        s.pointer_lock_changed(false);
        assert_eq!(s.state(), SessionState::Paused);
    }

    #[test]
    fn report_leaves_session_paused_with_message() {
        let mut s = Session::new();
        s.start();
        s.report("pointer lock is not supported");
        assert_eq!(s.state(), SessionState::Paused);
        assert_eq!(s.diagnostic(), Some("pointer lock is not supported"));
        s.resume();
        assert_eq!(s.diagnostic(), None);
    }
}
