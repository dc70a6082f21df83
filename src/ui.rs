use egui::Context;
use glam::Vec3;

use crate::controller::{Game, KeyBindings, SessionState};

/// Snapshot of what the overlay shows, taken once per frame
pub struct Hud {
    pub state: SessionState,
    pub fps: f32,
    pub sub_steps: u32,
    pub player_pos: Vec3,
    pub player_vel: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub grounded: bool,
    pub held: Option<&'static str>,
    pub diagnostic: Option<String>,
    pub backend: String,
    pub keys: KeyBindings,
}

impl Hud {
    pub fn capture(game: &Game, backend: &str) -> Self {
        let ctl = &game.controller;
        Self {
            state: game.session.state(),
            fps: ctl.stats().fps,
            sub_steps: ctl.stats().last_sub_steps,
            player_pos: ctl.player_position(),
            player_vel: ctl.player_velocity(),
            yaw: ctl.camera.yaw,
            pitch: ctl.camera.pitch,
            grounded: ctl.grounded(),
            held: ctl.held().and_then(|id| ctl.scene.entity(id)).map(|e| e.name),
            diagnostic: game.session.diagnostic().map(str::to_string),
            backend: backend.to_string(),
            keys: ctl.settings().keys.clone(),
        }
    }
}

/// Build the complete UI and return egui output (browser; native goes
/// through egui-winit and calls [`draw_hud`] directly)
pub fn build_ui(egui_ctx: &Context, hud: &Hud, canvas_width: u32, canvas_height: u32, dpr: f32, now: f64) -> egui::FullOutput {
    let mut raw_input = egui::RawInput::default();
    raw_input.time = Some(now / 1000.0);
    raw_input.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::new(0.0, 0.0),
        egui::vec2(canvas_width as f32 / dpr, canvas_height as f32 / dpr),
    ));
    egui_ctx.set_pixels_per_point(dpr);

    egui_ctx.run(raw_input, |ctx| draw_hud(ctx, hud))
}

pub fn draw_hud(ctx: &Context, hud: &Hud) {
    match hud.state {
        SessionState::Running => {
            draw_crosshair(ctx);
            draw_debug_window(ctx, hud);
        }
        SessionState::Paused => {
            draw_debug_window(ctx, hud);
            draw_menu(ctx, hud, "Paused", "Press Enter, Escape or click to resume");
        }
        SessionState::Menu => {
            draw_menu(ctx, hud, "Ambler", "Press Enter or click to start");
        }
    }
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 8.0;
    let stroke = egui::Stroke::new(1.5, egui::Color32::WHITE);
    painter.line_segment([center - egui::vec2(size, 0.0), center + egui::vec2(size, 0.0)], stroke);
    painter.line_segment([center - egui::vec2(0.0, size), center + egui::vec2(0.0, size)], stroke);
}

fn draw_debug_window(ctx: &Context, hud: &Hud) {
    let p = hud.player_pos;
    let v = hud.player_vel;
    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0} ({} steps)", hud.fps, hud.sub_steps)).small());
            ui.label(egui::RichText::new(format!("Pos: x: {:.1} y: {:.1} z: {:.1}", p.x, p.y, p.z)).small());
            ui.label(egui::RichText::new(format!("Speed: {:.1}", Vec3::new(v.x, 0.0, v.z).length())).small());
            ui.label(egui::RichText::new(format!("Yaw: {:.0} Pitch: {:.0}", hud.yaw.to_degrees(), hud.pitch.to_degrees())).small());
            ui.label(egui::RichText::new(format!("Grounded: {}", hud.grounded)).small());
            ui.label(egui::RichText::new(format!("Holding: {}", hud.held.unwrap_or("-"))).small());
            ui.label(egui::RichText::new(format!("Backend: {}", hud.backend)).small());
        });
}

fn draw_menu(ctx: &Context, hud: &Hud, title: &str, prompt: &str) {
    let k = &hud.keys;
    egui::Window::new(title)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading(prompt);
            if let Some(diagnostic) = &hud.diagnostic {
                ui.colored_label(egui::Color32::LIGHT_RED, diagnostic);
            }
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new(format!("{} {} {} {} / arrows - Move", k.forward, k.left, k.backward, k.right)).small());
            ui.label(egui::RichText::new(format!("{} - Sprint", k.sprint)).small());
            ui.label(egui::RichText::new(format!("{} - Jump", k.jump)).small());
            ui.label(egui::RichText::new(format!("{} - Pick up / drop", k.interact)).small());
            ui.label(egui::RichText::new(format!("{} - Throw", k.throw)).small());
            ui.label(egui::RichText::new(format!("{} - Pause", k.pause)).small());
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn hud_reflects_game_state() {
        let mut game = Game::new(Settings::default(), 800, 600);
        let hud = Hud::capture(&game, "test");
        assert_eq!(hud.state, SessionState::Menu);
        assert_eq!(hud.held, None);

        game.session.start();
        game.session.report("no pointer lock");
        let hud = Hud::capture(&game, "test");
        assert_eq!(hud.state, SessionState::Paused);
        assert_eq!(hud.diagnostic.as_deref(), Some("no pointer lock"));
    }

    #[test]
    fn every_state_renders() {
        let ctx = Context::default();
        let mut game = Game::new(Settings::default(), 800, 600);
        for step in 0..3 {
            match step {
                1 => {
                    game.session.start();
                }
                2 => {
                    game.session.pause();
                }
                _ => {}
            }
            let hud = Hud::capture(&game, "test");
            let output = build_ui(&ctx, &hud, 800, 600, 1.0, step as f64 * 16.0);
            if hud.state == SessionState::Running {
                // crosshair is painted directly, no layout pass needed
                assert!(!output.shapes.is_empty());
            }
        }
    }
}
