// Landscape A4 report: title, the comparison grid, then the chart.
//
// PDF coordinates grow upwards from the bottom-left corner, so the cursor
// starts at the top margin and moves down.
use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};

use super::ExportError;
use crate::chart::Raster;
use crate::types::{HeaderStyle, PivotTable};

const PAGE_W: f32 = 297.0;
const PAGE_H: f32 = 210.0;
const MARGIN: f32 = 12.0;
const FIRST_COL_W: f32 = 60.0;
const ROW_H: f32 = 7.0;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 16.0;
const CHART_DPI: f32 = 150.0;
/// Below this much free height the chart moves to a fresh page.
const MIN_CHART_H: f32 = 50.0;
const LAYER_NAME: &str = "Camada 1";

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Column geometry: fixed first column, the rest share what is left.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub x: Vec<f32>,
    pub widths: Vec<f32>,
}

impl ColumnLayout {
    pub fn new(columns: usize) -> Self {
        let usable = PAGE_W - 2.0 * MARGIN;
        let rest = columns.saturating_sub(1).max(1) as f32;
        let other_w = (usable - FIRST_COL_W) / rest;
        let mut x = Vec::with_capacity(columns);
        let mut widths = Vec::with_capacity(columns);
        let mut cursor = MARGIN;
        for col in 0..columns {
            let w = if col == 0 { FIRST_COL_W } else { other_w };
            x.push(cursor);
            widths.push(w);
            cursor += w;
        }
        Self { x, widths }
    }

    pub fn right(&self) -> f32 {
        match (self.x.last(), self.widths.last()) {
            (Some(x), Some(w)) => x + w,
            _ => MARGIN,
        }
    }
}

/// Scale that fits `natural` (w, h) inside `avail` (w, h) keeping the ratio.
pub fn fit_scale(natural: (f32, f32), avail: (f32, f32)) -> f32 {
    if natural.0 <= 0.0 || natural.1 <= 0.0 {
        return 1.0;
    }
    (avail.0 / natural.0).min(avail.1 / natural.1)
}

struct Cursor {
    layer: PdfLayerReference,
    y: f32,
}

fn pdf_err(e: impl std::fmt::Debug) -> ExportError {
    ExportError::Pdf(format!("{e:?}"))
}

fn new_page(doc: &PdfDocumentReference) -> Cursor {
    let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), LAYER_NAME);
    Cursor {
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_H - MARGIN,
    }
}

fn hline(layer: &PdfLayerReference, x0: f32, x1: f32, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x0), Mm(y)), false),
            (Point::new(Mm(x1), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn draw_row(cursor: &mut Cursor, cols: &ColumnLayout, cells: &[String], font: &IndirectFontRef) {
    let baseline = cursor.y - ROW_H + 2.0;
    for (i, cell) in cells.iter().enumerate() {
        if let Some(x) = cols.x.get(i) {
            cursor
                .layer
                .use_text(cell.as_str(), FONT_SIZE, Mm(x + 1.5), Mm(baseline), font);
        }
    }
    cursor.y -= ROW_H;
    hline(&cursor.layer, MARGIN, cols.right(), cursor.y);
}

/// Render `table` (and the chart raster, if given) as PDF bytes.
pub fn render_document(
    table: &PivotTable,
    title: &str,
    subtitle: &str,
    chart: Option<&Raster>,
) -> Result<Vec<u8>, ExportError> {
    if table.is_empty() {
        return Err(ExportError::EmptyTable);
    }
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), LAYER_NAME);
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err)?,
    };
    let mut cursor = Cursor {
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_H - MARGIN,
    };

    cursor
        .layer
        .use_text(title, TITLE_SIZE, Mm(MARGIN), Mm(cursor.y - 6.0), &fonts.bold);
    cursor
        .layer
        .use_text(subtitle, FONT_SIZE, Mm(MARGIN), Mm(cursor.y - 12.0), &fonts.regular);
    cursor.y -= 18.0;

    let headers = table.headers(HeaderStyle::Display);
    let cols = ColumnLayout::new(headers.len());
    hline(&cursor.layer, MARGIN, cols.right(), cursor.y);
    draw_row(&mut cursor, &cols, &headers, &fonts.bold);

    for row in table.string_rows() {
        if cursor.y - ROW_H < MARGIN {
            cursor = new_page(&doc);
            hline(&cursor.layer, MARGIN, cols.right(), cursor.y);
            draw_row(&mut cursor, &cols, &headers, &fonts.bold);
        }
        draw_row(&mut cursor, &cols, &row, &fonts.regular);
    }

    if let Some(raster) = chart {
        cursor.y -= 6.0;
        if cursor.y - MARGIN < MIN_CHART_H {
            cursor = new_page(&doc);
        }
        place_chart(&cursor, raster)?;
    }

    doc.save_to_bytes().map_err(pdf_err)
}

fn place_chart(cursor: &Cursor, raster: &Raster) -> Result<(), ExportError> {
    let rgb = RgbImage::from_raw(raster.width, raster.height, raster.pixels.clone())
        .ok_or_else(|| ExportError::Pdf("chart raster has the wrong size".to_string()))?;
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb));

    let natural = (
        raster.width as f32 / CHART_DPI * 25.4,
        raster.height as f32 / CHART_DPI * 25.4,
    );
    let avail = (PAGE_W - 2.0 * MARGIN, cursor.y - MARGIN);
    let scale = fit_scale(natural, avail);
    let bottom = cursor.y - natural.1 * scale;

    image.add_to_layer(
        cursor.layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(MARGIN)),
            translate_y: Some(Mm(bottom)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(CHART_DPI),
            ..Default::default()
        },
    );
    Ok(())
}
