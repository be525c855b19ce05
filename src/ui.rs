// src/ui.rs
use portal_engine::engine_lib::{FrameReport, RenderMode};

/// Values the control panel reads and edits. The app copies edits back into the portal
/// renderer after the panel runs.
pub struct UiState {
    pub portals_enabled: bool,
    pub recursion_depth: u32,
    pub report: FrameReport,
    pub draw_commands: usize,
    pub stencil_supported: bool,
}

pub fn build_ui(ctx: &egui::Context, state: &mut UiState) {
    egui::Window::new("Portal Controls")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            ui.vertical(|ui| {
                ui.label("Recursive Portal Demo");
                ui.separator();

                ui.checkbox(&mut state.portals_enabled, "Portal rendering (P)");
                ui.add(egui::Slider::new(&mut state.recursion_depth, 1..=10).text("Recursion depth ([ / ])"));
                if !state.stencil_supported {
                    ui.colored_label(egui::Color32::YELLOW, "No stencil buffer: portal views are unmasked");
                }

                ui.separator();
                let mode = match state.report.mode {
                    RenderMode::Portal => "portal".to_string(),
                    RenderMode::Plain(reason) => format!("plain ({reason:?})"),
                };
                ui.label(format!("Mode: {mode}"));
                ui.label(format!("Levels rendered: {}", state.report.levels_rendered()));
                ui.label(format!("Draw commands: {}", state.draw_commands));

                ui.separator();
                ui.label("🎮 Keyboard Controls:");
                ui.label("   W/A/S/D: Move Camera");
                ui.label("   Space: Move Up");
                ui.label("   L-Shift/L-Ctrl: Move Down");
                ui.label("   Arrow Keys: Look Up/Down/Left/Right");
                ui.label("   Mouse (when grabbed): Look");
                ui.label("   Escape: Grab/Ungrab Mouse Cursor");
                ui.label("   P: Toggle Portals, [ / ]: Depth");
            });
        });
}
