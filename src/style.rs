use egui::{Color32, Context, CornerRadius, Stroke, Style, Visuals};

pub const ACCENT: Color32 = Color32::from_rgb(90, 150, 230);
pub const ERROR_TEXT: Color32 = Color32::from_rgb(230, 100, 100);
pub const MUTED_TEXT: Color32 = Color32::from_gray(140);

pub fn configure_style(ctx: &Context) {
    let mut style = Style::default();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(12);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);

    ctx.set_style(style);

    // Previews look best on a dark background
    let mut visuals = Visuals::dark();
    visuals.window_shadow = egui::epaint::Shadow::NONE;
    visuals.popup_shadow = egui::epaint::Shadow::NONE;
    visuals.window_corner_radius = CornerRadius::same(6);

    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, Color32::from_gray(45));
    visuals.widgets.hovered.bg_fill = Color32::from_gray(55);
    visuals.widgets.active.bg_fill = Color32::from_gray(65);

    visuals.selection.bg_fill = ACCENT.gamma_multiply(0.6);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    visuals.hyperlink_color = ACCENT;

    ctx.set_visuals(visuals);
}
