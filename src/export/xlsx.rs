use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Image, Workbook};

use super::ExportError;
use crate::types::{HeaderStyle, PivotTable};

pub const SHEET_NAME: &str = "Base Completa";
const AREA_COL_WIDTH: f64 = 28.0;
const COUNT_COL_WIDTH: f64 = 18.0;
/// Embedded chart is shrunk so a 1200px-wide layout fits next to the data.
const CHART_SCALE: f64 = 0.6;

/// Render the wide table as an `.xlsx` workbook.
///
/// Header row is `area` then `<Mês> Em Dia` / `<Mês> Vencido` per month; the
/// optional PNG is anchored on the second row, one column past the data.
pub fn render_workbook(
    table: &PivotTable,
    chart_png: Option<&[u8]>,
) -> Result<Vec<u8>, ExportError> {
    if table.is_empty() {
        return Err(ExportError::EmptyTable);
    }
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color(0x759A64)
        .set_font_color(0xFFFFFF)
        .set_border(FormatBorder::Thin);
    let text = Format::new().set_border(FormatBorder::Thin);
    let integer = Format::new()
        .set_num_format("#,##0")
        .set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        let headers = table.headers(HeaderStyle::Export);
        for (col, name) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, name, &header)?;
            let width = if col == 0 {
                AREA_COL_WIDTH
            } else {
                COUNT_COL_WIDTH
            };
            sheet.set_column_width(col as u16, width)?;
        }

        for (i, row) in table.rows.iter().enumerate() {
            let r = i as u32 + 1;
            sheet.write_string_with_format(r, 0, &row.area, &text)?;
            for (k, counts) in row.counts.iter().enumerate() {
                let col = 1 + k as u16 * 2;
                sheet.write_number_with_format(r, col, counts.on_time as f64, &integer)?;
                sheet.write_number_with_format(r, col + 1, counts.overdue as f64, &integer)?;
            }
        }

        if let Some(png) = chart_png {
            let image = Image::new_from_buffer(png)?
                .set_scale_width(CHART_SCALE)
                .set_scale_height(CHART_SCALE);
            sheet.insert_image(1, headers.len() as u16 + 1, &image)?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}
