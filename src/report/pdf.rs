//! PDF serialization of a laid-out report.

use super::layout::{Layout, PageSetup, Placed};
use crate::error::{Error, Result};
use crate::fonts::FontSet;
use image::{DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use tracing::{debug, warn};

/// Resolution the embedded chart is declared at before scaling.
const IMAGE_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

/// Write `layout` to PDF bytes, embedding `chart` wherever an image was placed.
pub fn write_pdf(
    layout: &Layout,
    title: &str,
    setup: &PageSetup,
    fonts: &FontSet,
    chart: &DynamicImage,
) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        Mm(setup.width_mm),
        Mm(setup.height_mm),
        "Page 1",
    );
    let font = load_font(&doc, fonts)?;

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(
                Mm(setup.width_mm),
                Mm(setup.height_mm),
                format!("Page {}", index + 1),
            );
            doc.get_page(page_index).get_layer(layer_index)
        };

        for item in &page.items {
            match item {
                Placed::Text {
                    x_mm,
                    y_mm,
                    size_pt,
                    text,
                } => layer.use_text(text.as_str(), *size_pt, Mm(*x_mm), Mm(*y_mm), &font),
                Placed::Image {
                    x_mm,
                    y_mm,
                    width_mm,
                    height_mm,
                } => place_image(&layer, chart, *x_mm, *y_mm, *width_mm, *height_mm),
            }
        }
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| Error::render("document", format!("failed to serialize PDF: {:?}", e)))?;
    debug!(
        "Serialized {} page(s) into {} bytes",
        layout.pages.len(),
        bytes.len()
    );

    Ok(bytes)
}

/// Embed the external font, falling back to built-in Helvetica.
fn load_font(doc: &PdfDocumentReference, fonts: &FontSet) -> Result<IndirectFontRef> {
    if let Some(font) = fonts.font() {
        match doc.add_external_font(&font.bytes[..]) {
            Ok(font_ref) => return Ok(font_ref),
            Err(e) => warn!(
                "Cannot embed font {}: {:?}; using Helvetica",
                font.path.display(),
                e
            ),
        }
    }

    doc.add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| Error::render("document", format!("failed to add font: {:?}", e)))
}

/// Draw the chart scaled to exactly `width` x `height` millimetres.
fn place_image(
    layer: &PdfLayerReference,
    chart: &DynamicImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) {
    let (px_width, px_height) = chart.dimensions();
    let natural_width = px_width as f32 / IMAGE_DPI * MM_PER_INCH;
    let natural_height = px_height as f32 / IMAGE_DPI * MM_PER_INCH;

    Image::from_dynamic_image(chart).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            scale_x: Some(width / natural_width),
            scale_y: Some(height / natural_height),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}
