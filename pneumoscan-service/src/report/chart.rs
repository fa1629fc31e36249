use printpdf::PdfLayerReference;

use super::layout::{
    BAR_GREEN, BAR_RED, DARK, Fonts, GRAY, MARGIN_LEFT, add_line, add_text, fill_rect,
};

const AXIS_MAX: f64 = 110.0;
const LABEL_WIDTH: f32 = 25.0;
const PLOT_WIDTH: f32 = 130.0;
const BAR_HEIGHT: f32 = 9.0;
const BAR_GAP: f32 = 7.0;
const AXIS_LABEL_SPACE: f32 = 14.0;

pub const CHART_HEIGHT: f32 = 2.0 * BAR_HEIGHT + 3.0 * BAR_GAP + AXIS_LABEL_SPACE;

fn bar_length(percent: f64) -> f32 {
    (percent.clamp(0.0, AXIS_MAX) / AXIS_MAX) as f32 * PLOT_WIDTH
}

/// Horizontal two-bar probability chart whose top edge sits at `top`.
/// Returns the y coordinate below the chart.
pub fn draw_probability_chart(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    normal_prob: f64,
    pneumonia_prob: f64,
    top: f32,
) -> f32 {
    let plot_x = MARGIN_LEFT + LABEL_WIDTH;
    let axis_y = top - CHART_HEIGHT + AXIS_LABEL_SPACE;

    // Pneumonia on top, Normal nearest the axis.
    let bars = [
        ("Pneumonia", pneumonia_prob, BAR_RED),
        ("Normal", normal_prob, BAR_GREEN),
    ];

    for (i, (label, value, rgb)) in bars.into_iter().enumerate() {
        let bar_top = top - BAR_GAP - i as f32 * (BAR_HEIGHT + BAR_GAP);
        let bar_bottom = bar_top - BAR_HEIGHT;
        let text_y = bar_bottom + BAR_HEIGHT / 2.0 - 1.5;
        let length = bar_length(value);

        add_text(layer, &fonts.regular, label, MARGIN_LEFT, text_y, 11.0, DARK);
        if length > 0.0 {
            fill_rect(layer, plot_x, bar_bottom, length, BAR_HEIGHT, rgb);
        }
        add_text(
            layer,
            &fonts.bold,
            &format!("{:.1}%", value),
            plot_x + length + 2.0,
            text_y,
            10.0,
            DARK,
        );
    }

    add_line(layer, plot_x, top, plot_x, axis_y, GRAY, 0.5);
    add_line(layer, plot_x, axis_y, plot_x + PLOT_WIDTH, axis_y, GRAY, 0.5);

    for tick in (0..=100).step_by(20) {
        let x = plot_x + bar_length(tick as f64);
        add_line(layer, x, axis_y, x, axis_y - 1.5, GRAY, 0.5);
        add_text(layer, &fonts.regular, &tick.to_string(), x - 1.5, axis_y - 5.0, 8.0, GRAY);
    }
    add_text(
        layer,
        &fonts.regular,
        "Probability (%)",
        plot_x + PLOT_WIDTH / 2.0 - 10.0,
        axis_y - 10.5,
        9.0,
        GRAY,
    );

    top - CHART_HEIGHT
}
