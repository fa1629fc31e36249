use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::*;
use std::io::BufWriter;
use std::path::Path;
use tracing::warn;

use super::chart::draw_probability_chart;
use super::layout::{
    ACCENT, DARK, Fonts, GRAY, GREEN, MARGIN_LEFT, PAGE_HEIGHT, PAGE_WIDTH, PRIMARY, RED,
    TableRow, add_centered_text, add_line, add_text, draw_table,
};
use super::{ReportError, ReportInput};

const IMAGE_BOX_MM: f32 = 90.0;
const MAX_EMBED_PIXELS: u32 = 1024;
const MM_PER_INCH: f32 = 25.4;
const TOP_Y: f32 = PAGE_HEIGHT - 26.0;
const FOOTER_Y: f32 = 22.0;
const SECTION_HEADING_HEIGHT: f32 = 13.0;

fn section_heading(layer: &PdfLayerReference, fonts: &Fonts, title: &str, y: &mut f32) {
    *y -= 9.0;
    add_text(layer, &fonts.bold, title, MARGIN_LEFT, *y, 13.0, ACCENT);
    *y -= 4.0;
}

/// A decoded X-ray sized to fit the image box.
struct EmbeddedXray {
    image: DynamicImage,
    dpi: f32,
    width_mm: f32,
    height_mm: f32,
}

impl EmbeddedXray {
    /// Decode with the service's `image` build, which knows every accepted
    /// upload format, then hand raw RGB to the PDF library's own image type.
    fn load(path: &Path) -> Option<Self> {
        let mut decoded = match ::image::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Unable to decode {} for report: {}", path.display(), e);
                return None;
            }
        };
        if decoded.width() > MAX_EMBED_PIXELS || decoded.height() > MAX_EMBED_PIXELS {
            decoded = decoded.thumbnail(MAX_EMBED_PIXELS, MAX_EMBED_PIXELS);
        }
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        let image = RgbImage::from_raw(width, height, rgb.into_raw())?;

        let (width, height) = (width as f32, height as f32);
        let dpi = width.max(height) / (IMAGE_BOX_MM / MM_PER_INCH);
        Some(Self {
            image: DynamicImage::ImageRgb8(image),
            dpi,
            width_mm: width / dpi * MM_PER_INCH,
            height_mm: height / dpi * MM_PER_INCH,
        })
    }
}

fn draw_xray(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    xray: Option<EmbeddedXray>,
    y: &mut f32,
) {
    section_heading(layer, fonts, "Uploaded X-ray", y);

    let Some(xray) = xray else {
        *y -= 6.0;
        add_text(layer, &fonts.regular, "Unable to embed image.", MARGIN_LEFT, *y, 10.0, GRAY);
        return;
    };

    *y -= 2.0 + xray.height_mm;
    Image::from_dynamic_image(&xray.image).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm((PAGE_WIDTH - xray.width_mm) / 2.0)),
            translate_y: Some(Mm(*y)),
            dpi: Some(xray.dpi),
            ..Default::default()
        },
    );
}

fn draw_footer(layer: &PdfLayerReference, fonts: &Fonts) {
    add_line(layer, MARGIN_LEFT, FOOTER_Y, PAGE_WIDTH - MARGIN_LEFT, FOOTER_Y, GRAY, 0.8);
    add_centered_text(
        layer,
        &fonts.regular,
        "This report is generated by PneumoScan AI and is for informational purposes only.",
        FOOTER_Y - 5.0,
        8.0,
        GRAY,
    );
    add_centered_text(
        layer,
        &fonts.regular,
        "It is not a medical diagnosis. Please consult a qualified specialist.",
        FOOTER_Y - 9.0,
        8.0,
        GRAY,
    );
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Render the diagnostic report and return the PDF bytes.
pub fn render_report(input: &ReportInput) -> Result<Vec<u8>, ReportError> {
    let (doc, page1, layer1) =
        PdfDocument::new("PneumoScan Report", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let mut layer = doc.get_page(page1).get_layer(layer1);
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Font(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Font(e.to_string()))?,
    };

    let mut y = TOP_Y;

    // Header
    add_centered_text(&layer, &fonts.bold, "PneumoScan", y, 22.0, PRIMARY);
    y -= 7.0;
    add_centered_text(&layer, &fonts.regular, "AI Diagnostic Report", y, 10.0, GRAY);
    y -= 5.0;
    add_line(&layer, MARGIN_LEFT, y, PAGE_WIDTH - MARGIN_LEFT, y, PRIMARY, 1.2);
    y -= 7.0;

    let generated = input.generated_at.format("%B %d, %Y  -  %I:%M %p").to_string();
    add_text(&layer, &fonts.bold, "Date & Time:", MARGIN_LEFT, y, 10.0, DARK);
    add_text(&layer, &fonts.regular, &generated, MARGIN_LEFT + 24.0, y, 10.0, DARK);

    section_heading(&layer, &fonts, "Patient Information", &mut y);
    let patient_rows = [
        TableRow {
            label: "Patient Name",
            value: or_placeholder(&input.patient_name, "N/A"),
            value_color: DARK,
        },
        TableRow {
            label: "Age",
            value: or_placeholder(&input.patient_age, "N/A"),
            value_color: DARK,
        },
        TableRow {
            label: "Notes",
            value: or_placeholder(&input.notes, "-"),
            value_color: DARK,
        },
    ];
    y = draw_table(&layer, &fonts, &patient_rows, y, 10.0, false);

    section_heading(&layer, &fonts, "Analysis Result", &mut y);
    let result_color = if input.prediction == "PNEUMONIA" { RED } else { GREEN };
    let result_rows = [
        TableRow {
            label: "Prediction",
            value: input.prediction.clone(),
            value_color: result_color,
        },
        TableRow {
            label: "Confidence",
            value: format!("{}%", input.confidence),
            value_color: DARK,
        },
    ];
    y = draw_table(&layer, &fonts, &result_rows, y, 11.0, true);

    section_heading(&layer, &fonts, "Confidence Chart", &mut y);
    y = draw_probability_chart(&layer, &fonts, input.normal_prob, input.pneumonia_prob, y);

    if let Some(path) = input.image_path.as_deref().filter(|p| p.exists()) {
        let xray = EmbeddedXray::load(path);
        let needed = SECTION_HEADING_HEIGHT + xray.as_ref().map_or(6.0, |x| x.height_mm + 2.0);
        if y - needed < FOOTER_Y + 6.0 {
            draw_footer(&layer, &fonts);
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            y = TOP_Y;
        }
        draw_xray(&layer, &fonts, xray, &mut y);
    }

    draw_footer(&layer, &fonts);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Save(e.to_string()))?;
    buf.into_inner()
        .map_err(|e| ReportError::Save(e.to_string()))
}
