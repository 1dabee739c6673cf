//! Page chrome drawn with egui: heading, canvas, background buttons, caption

use egui::{Color32, RichText, Sense, Stroke};

use crate::color::{BackgroundPreset, ViewerState};
use crate::controls::OrbitInput;

pub const HEADING: &str = "My Bakery 3D Viewer";
pub const CAPTION: &str = "Canvas size follows the page layout.";

const STRIP_LABEL: &str = "Change Background:";
const STRIP_TEXT_SIZE: f32 = 13.0;

const HEADING_COLOR: Color32 = Color32::from_rgb(0x1f, 0x29, 0x37);
const CAPTION_COLOR: Color32 = Color32::from_rgb(0x4b, 0x55, 0x63);
const CANVAS_BORDER: Color32 = Color32::from_rgb(0x37, 0x41, 0x51);

/// What the user asked for during one UI frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UiActions {
    pub preset: Option<BackgroundPreset>,
    pub orbit: OrbitInput,
}

/// Lay out the page and collect user actions.
///
/// `canvas_size` is the size the page layout assigned to the canvas, in
/// points; `canvas` is the texture holding the last rendered frame.
pub fn draw(
    ctx: &egui::Context,
    state: &ViewerState,
    canvas_size: (f32, f32),
    canvas: Option<egui::TextureId>,
) -> UiActions {
    let mut actions = UiActions::default();
    let [r, g, b] = state.background.container_rgb();

    egui::CentralPanel::default()
        .frame(egui::Frame::default().fill(Color32::from_rgb(r, g, b)))
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(16.0);
                ui.label(
                    RichText::new(HEADING)
                        .size(24.0)
                        .strong()
                        .color(HEADING_COLOR),
                );
                ui.add_space(16.0);

                actions.orbit = canvas_area(ui, canvas_size, canvas);

                ui.add_space(16.0);
                if let Some(preset) = control_strip(ui) {
                    actions.preset = Some(preset);
                }
            });
        });

    actions
}

fn canvas_area(
    ui: &mut egui::Ui,
    canvas_size: (f32, f32),
    canvas: Option<egui::TextureId>,
) -> OrbitInput {
    let mut input = OrbitInput {
        pinch: 1.0,
        ..Default::default()
    };

    egui::Frame::default()
        .stroke(Stroke::new(4.0, CANVAS_BORDER))
        .show(ui, |ui| {
            let size = egui::vec2(canvas_size.0, canvas_size.1);
            let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

            if let Some(texture) = canvas {
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                ui.painter().image(texture, rect, uv, Color32::WHITE);
            }

            let drag = response.drag_delta();
            let drag = glam::Vec2::new(drag.x, drag.y);
            if response.dragged_by(egui::PointerButton::Primary) {
                input.rotate = drag;
            } else if response.dragged_by(egui::PointerButton::Secondary)
                || response.dragged_by(egui::PointerButton::Middle)
            {
                input.pan = drag;
            }

            if response.hovered() {
                let (scroll, zoom) = ui.input(|i| (i.raw_scroll_delta.y, i.zoom_delta()));
                // egui scrolls positive for "wheel away", pages the other way round
                input.wheel = -scroll;
                input.pinch = zoom;
            }
        });

    input
}

fn control_strip(ui: &mut egui::Ui) -> Option<BackgroundPreset> {
    let mut clicked = None;

    egui::Frame::default()
        .fill(Color32::from_rgba_unmultiplied(255, 255, 255, 230))
        .inner_margin(16.0)
        .show(ui, |ui| {
            let row_width = button_row_width(ui);
            ui.horizontal(|ui| {
                ui.add_space(((ui.available_width() - row_width) / 2.0).max(0.0));
                ui.label(
                    RichText::new(STRIP_LABEL)
                        .size(STRIP_TEXT_SIZE)
                        .strong()
                        .color(HEADING_COLOR),
                );
                for preset in BackgroundPreset::ALL {
                    let [r, g, b] = preset.button_rgb();
                    let text = RichText::new(preset.label())
                        .size(STRIP_TEXT_SIZE)
                        .color(Color32::WHITE);
                    let button = egui::Button::new(text).fill(Color32::from_rgb(r, g, b));
                    if ui.add(button).clicked() {
                        clicked = Some(preset);
                    }
                }
            });

            ui.separator();

            ui.label(
                RichText::new(CAPTION)
                    .size(STRIP_TEXT_SIZE)
                    .italics()
                    .color(CAPTION_COLOR),
            );
        });

    clicked
}

/// Width of the label plus button row, used to centre it in the strip
fn button_row_width(ui: &egui::Ui) -> f32 {
    let font = egui::FontId::proportional(STRIP_TEXT_SIZE);
    let text_width = |text: &str| {
        ui.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_owned(), font.clone(), Color32::WHITE)
                .size()
                .x
        })
    };
    let spacing = ui.spacing();
    let buttons: f32 = BackgroundPreset::ALL
        .iter()
        .map(|preset| text_width(preset.label()) + 2.0 * spacing.button_padding.x)
        .sum();
    text_width(STRIP_LABEL) + buttons + spacing.item_spacing.x * BackgroundPreset::ALL.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use egui::{Event, Pos2, Rect, Shape};

    const SCREEN_WIDTH: f32 = 1000.0;
    const CANVAS: (f32, f32) = (400.0, 300.0);
    const CANVAS_TEXTURE: egui::TextureId = egui::TextureId::User(7);

    fn run_frame(ctx: &egui::Context, events: Vec<Event>) -> (UiActions, egui::FullOutput) {
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(
                Pos2::ZERO,
                egui::vec2(SCREEN_WIDTH, 800.0),
            )),
            events,
            ..Default::default()
        };
        let state = ViewerState::default();
        let mut actions = UiActions::default();
        let output = ctx.run(input, |ctx| {
            actions = draw(ctx, &state, CANVAS, Some(CANVAS_TEXTURE));
        });
        (actions, output)
    }

    fn button_rect(output: &egui::FullOutput, preset: BackgroundPreset) -> Rect {
        let [r, g, b] = preset.button_rgb();
        let fill = Color32::from_rgb(r, g, b);
        output
            .shapes
            .iter()
            .find_map(|clipped| match &clipped.shape {
                Shape::Rect(rect) if rect.fill == fill => Some(rect.rect),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no {} button painted", preset.label()))
    }

    fn canvas_rect(output: &egui::FullOutput) -> Rect {
        output
            .shapes
            .iter()
            .find_map(|clipped| match &clipped.shape {
                Shape::Mesh(mesh) if mesh.texture_id == CANVAS_TEXTURE => Some(mesh.calc_bounds()),
                _ => None,
            })
            .expect("canvas texture not painted")
    }

    fn pointer(pos: Pos2, button: egui::PointerButton, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button,
            pressed,
            modifiers: Default::default(),
        }
    }

    /// Press at the canvas centre, move right in three steps, release.
    /// Returns the orbit input summed over the gesture.
    fn drag_across_canvas(button: egui::PointerButton) -> OrbitInput {
        let ctx = egui::Context::default();
        let (_, output) = run_frame(&ctx, vec![]);
        let start = canvas_rect(&output).center();

        let mut total = OrbitInput::default();
        let mut gesture = vec![vec![Event::PointerMoved(start), pointer(start, button, true)]];
        for step in 1..=3 {
            gesture.push(vec![Event::PointerMoved(start + egui::vec2(10.0 * step as f32, 0.0))]);
        }
        gesture.push(vec![pointer(start + egui::vec2(30.0, 0.0), button, false)]);

        for events in gesture {
            let (actions, _) = run_frame(&ctx, events);
            assert_eq!(actions.preset, None);
            total.rotate += actions.orbit.rotate;
            total.pan += actions.orbit.pan;
        }
        total
    }

    #[test]
    fn idle_frame_asks_for_nothing() {
        let ctx = egui::Context::default();
        run_frame(&ctx, vec![]);
        let (actions, _) = run_frame(&ctx, vec![]);

        assert_eq!(actions.preset, None);
        assert!(actions.orbit.is_idle());
        assert_eq!(actions.orbit.pinch, 1.0);
    }

    #[test]
    fn buttons_are_laid_out_in_preset_order() {
        let ctx = egui::Context::default();
        let (_, output) = run_frame(&ctx, vec![]);

        let rects: Vec<Rect> = BackgroundPreset::ALL
            .iter()
            .map(|&preset| button_rect(&output, preset))
            .collect();
        for pair in rects.windows(2) {
            assert!(pair[0].max.x <= pair[1].min.x, "{:?}", rects);
            assert_relative_eq!(pair[0].center().y, pair[1].center().y, epsilon = 0.5);
        }
        assert!(rects[0].min.y > canvas_rect(&output).max.y);
    }

    #[test]
    fn button_row_is_centred_on_the_page() {
        let ctx = egui::Context::default();
        let (_, output) = run_frame(&ctx, vec![]);

        let label_left = output
            .shapes
            .iter()
            .find_map(|clipped| match &clipped.shape {
                Shape::Text(text) if text.galley.text() == STRIP_LABEL => Some(text.pos.x),
                _ => None,
            })
            .expect("strip label not painted");
        let row_right = button_rect(&output, BackgroundPreset::Green).max.x;

        assert_relative_eq!((label_left + row_right) / 2.0, SCREEN_WIDTH / 2.0, epsilon = 4.0);
    }

    #[test]
    fn clicking_a_button_reports_its_preset() {
        let ctx = egui::Context::default();
        let (_, output) = run_frame(&ctx, vec![]);

        for preset in BackgroundPreset::ALL {
            let at = button_rect(&output, preset).center();
            let primary = egui::PointerButton::Primary;

            let (pressed, _) = run_frame(&ctx, vec![Event::PointerMoved(at), pointer(at, primary, true)]);
            assert_eq!(pressed.preset, None);

            let (released, _) = run_frame(&ctx, vec![pointer(at, primary, false)]);
            assert_eq!(released.preset, Some(preset));
        }
    }

    #[test]
    fn primary_drag_rotates() {
        let total = drag_across_canvas(egui::PointerButton::Primary);

        assert!(total.rotate.x > 0.0 && total.rotate.x <= 30.0, "{:?}", total);
        assert_eq!(total.rotate.y, 0.0);
        assert_eq!(total.pan, glam::Vec2::ZERO);
    }

    #[test]
    fn secondary_and_middle_drag_pan() {
        for button in [egui::PointerButton::Secondary, egui::PointerButton::Middle] {
            let total = drag_across_canvas(button);

            assert!(total.pan.x > 0.0 && total.pan.x <= 30.0, "{:?}: {:?}", button, total);
            assert_eq!(total.rotate, glam::Vec2::ZERO);
        }
    }

    #[test]
    fn wheel_away_over_canvas_zooms_out() {
        let ctx = egui::Context::default();
        let (_, output) = run_frame(&ctx, vec![]);
        let wheel = |pos: Pos2| {
            vec![
                Event::PointerMoved(pos),
                Event::MouseWheel {
                    unit: egui::MouseWheelUnit::Point,
                    delta: egui::vec2(0.0, 50.0),
                    modifiers: Default::default(),
                },
            ]
        };

        let (over_canvas, _) = run_frame(&ctx, wheel(canvas_rect(&output).center()));
        assert_eq!(over_canvas.orbit.wheel, -50.0);
        assert_eq!(over_canvas.orbit.pinch, 1.0);

        let (off_canvas, _) = run_frame(&ctx, wheel(Pos2::new(5.0, 5.0)));
        assert_eq!(off_canvas.orbit.wheel, 0.0);
    }
}
