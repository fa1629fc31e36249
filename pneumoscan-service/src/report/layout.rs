use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

pub type Rgb8 = (u8, u8, u8);

pub const PRIMARY: Rgb8 = (26, 35, 126);
pub const ACCENT: Rgb8 = (13, 71, 161);
pub const GREEN: Rgb8 = (46, 125, 50);
pub const RED: Rgb8 = (198, 40, 40);
pub const LIGHT_BG: Rgb8 = (232, 234, 246);
pub const STRIPE: Rgb8 = (245, 245, 245);
pub const GRID: Rgb8 = (189, 189, 189);
pub const GRAY: Rgb8 = (97, 97, 97);
pub const DARK: Rgb8 = (33, 33, 33);
pub const BAR_GREEN: Rgb8 = (67, 160, 71);
pub const BAR_RED: Rgb8 = (229, 57, 53);

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN_LEFT: f32 = 20.0;
pub const MARGIN_RIGHT: f32 = 20.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;

const PT_TO_MM: f32 = 0.352_778;

pub struct Fonts {
    pub regular: IndirectFontRef,
    pub bold: IndirectFontRef,
}

pub fn color(rgb: Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        rgb.0 as f32 / 255.0,
        rgb.1 as f32 / 255.0,
        rgb.2 as f32 / 255.0,
        None,
    ))
}

pub fn add_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    x: f32,
    y: f32,
    size: f32,
    rgb: Rgb8,
) {
    layer.set_fill_color(color(rgb));
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

/// Builtin fonts carry no metrics here; half an em per glyph is close
/// enough to centre short Helvetica strings.
pub fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * PT_TO_MM
}

pub fn add_centered_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    y: f32,
    size: f32,
    rgb: Rgb8,
) {
    let x = ((PAGE_WIDTH - approx_text_width(text, size)) / 2.0).max(MARGIN_LEFT);
    add_text(layer, font, text, x, y, size, rgb);
}

pub fn add_line(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32, rgb: Rgb8, width: f32) {
    layer.set_outline_color(color(rgb));
    layer.set_outline_thickness(width);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y1)), false),
            (Point::new(Mm(x2), Mm(y2)), false),
        ],
        is_closed: false,
    });
}

/// Filled rectangle with its lower-left corner at `(x, y)`.
pub fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, width: f32, height: f32, rgb: Rgb8) {
    layer.set_fill_color(color(rgb));
    layer.add_polygon(Polygon {
        rings: vec![vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + width), Mm(y)), false),
            (Point::new(Mm(x + width), Mm(y + height)), false),
            (Point::new(Mm(x), Mm(y + height)), false),
        ]],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

pub struct TableRow {
    pub label: &'static str,
    pub value: String,
    pub value_color: Rgb8,
}

const LABEL_COL_WIDTH: f32 = 45.0;
const LINE_HEIGHT: f32 = 5.0;
const ROW_PADDING: f32 = 2.5;
const VALUE_WRAP: usize = 70;
const MAX_VALUE_LINES: usize = 4;

/// Two-column key/value table starting at `top`; returns the y below it.
pub fn draw_table(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    rows: &[TableRow],
    top: f32,
    font_size: f32,
    bold_values: bool,
) -> f32 {
    let mut y = top;
    let right = MARGIN_LEFT + CONTENT_WIDTH;

    for (index, row) in rows.iter().enumerate() {
        let mut lines = wrap_text(&row.value, VALUE_WRAP);
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines.truncate(MAX_VALUE_LINES);

        let height = lines.len() as f32 * LINE_HEIGHT + 2.0 * ROW_PADDING;
        let bottom = y - height;

        fill_rect(layer, MARGIN_LEFT, bottom, LABEL_COL_WIDTH, height, LIGHT_BG);
        if index % 2 == 1 {
            fill_rect(
                layer,
                MARGIN_LEFT + LABEL_COL_WIDTH,
                bottom,
                CONTENT_WIDTH - LABEL_COL_WIDTH,
                height,
                STRIPE,
            );
        }

        let baseline = y - ROW_PADDING - LINE_HEIGHT + 1.2;
        add_text(layer, &fonts.bold, row.label, MARGIN_LEFT + 3.0, baseline, font_size, PRIMARY);

        let value_font = if bold_values { &fonts.bold } else { &fonts.regular };
        for (i, line) in lines.iter().enumerate() {
            add_text(
                layer,
                value_font,
                line,
                MARGIN_LEFT + LABEL_COL_WIDTH + 3.0,
                baseline - i as f32 * LINE_HEIGHT,
                font_size,
                row.value_color,
            );
        }

        add_line(layer, MARGIN_LEFT, y, right, y, GRID, 0.5);
        y = bottom;
    }

    add_line(layer, MARGIN_LEFT, y, right, y, GRID, 0.5);
    add_line(layer, MARGIN_LEFT, top, MARGIN_LEFT, y, GRID, 0.5);
    add_line(layer, MARGIN_LEFT + LABEL_COL_WIDTH, top, MARGIN_LEFT + LABEL_COL_WIDTH, y, GRID, 0.5);
    add_line(layer, right, top, right, y, GRID, 0.5);

    y
}
