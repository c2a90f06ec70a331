//! Horizontal grouped bar chart of a pivot table.
//!
//! Each area gets one lane per month; within a lane the on-time bar starts at
//! zero and the overdue bar is stacked to its right. [`ChartLayout`] holds the
//! bars in value coordinates and is drawn through plotters, either to SVG
//! (the on-screen file) or into an RGB buffer that is encoded to PNG for the
//! spreadsheet and PDF exports.

use std::io::Cursor;
use std::sync::OnceLock;

use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use thiserror::Error;

use crate::types::{Month, PivotTable};

const FONT_FAMILY: &str = "sans-serif";
static DEJAVU_SANS: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

const WIDTH: u32 = 1200;
const LANE_PX: u32 = 20;
const CHROME_PX: u32 = 90;
const MIN_HEIGHT: u32 = 260;
const MARGIN: u32 = 16;
const Y_LABEL_AREA: u32 = 170;
const X_LABEL_AREA: u32 = 28;
const X_TICKS: usize = 6;
/// Share of a row's height covered by its lanes.
const ROW_FILL: f64 = 0.8;
/// Head room right of the longest stack for the legend.
const X_HEADROOM: f64 = 1.25;

/// (on time, overdue) colors per month slot.
pub const PALETTE: [(RGBColor, RGBColor); 2] = [
    (RGBColor(0xc5, 0xe0, 0xb4), RGBColor(0xff, 0x73, 0x57)),
    (RGBColor(0x75, 0x9a, 0x64), RGBColor(0xaf, 0x2d, 0x11)),
];
const GRID: RGBColor = RGBColor(0xd9, 0xd9, 0xd9);

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Nothing to draw: the table has no rows")]
    Empty,
    #[error("Could not load chart font: {0}")]
    Font(String),
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Raster buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
}

/// One rectangle in chart coordinates: x is the count axis, y runs from the
/// bottom row (0) up to the top row (n - 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub start: f64,
    pub end: f64,
    pub top: f64,
    pub bottom: f64,
    pub value: u32,
}

/// Bars sharing a color and a legend entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub month: Month,
    pub label: String,
    pub color: RGBColor,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub width: u32,
    pub height: u32,
    /// Area names, top row first.
    pub areas: Vec<String>,
    pub x_max: f64,
    pub series: Vec<BarSeries>,
}

/// Plain RGB8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    pub fn pixel(&self, x: u32, y: u32) -> Option<RGBColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some(RGBColor(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ChartError> {
        let img = RgbImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or(
            ChartError::BufferSize {
                width: self.width,
                height: self.height,
            },
        )?;
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

fn ensure_font() -> Result<(), ChartError> {
    static FONT: OnceLock<Result<(), String>> = OnceLock::new();
    FONT.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, DEJAVU_SANS)
            .map_err(|_| "DejaVuSans.ttf is not a valid font".to_string())
    })
    .clone()
    .map_err(ChartError::Font)
}

fn draw_error<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> ChartError {
    ChartError::Draw(e.to_string())
}

impl ChartLayout {
    pub fn from_table(table: &PivotTable) -> Result<Self, ChartError> {
        if table.is_empty() {
            return Err(ChartError::Empty);
        }
        let n = table.rows.len();
        let lanes = table.months.len().max(1);
        let lane_h = ROW_FILL / lanes as f64;

        let max_total = table
            .rows
            .iter()
            .flat_map(|r| r.counts.iter())
            .map(|c| c.on_time as u64 + c.overdue as u64)
            .max()
            .unwrap_or(0)
            .max(1) as f64;

        let mut series = Vec::with_capacity(table.months.len() * 2);
        for (k, month) in table.months.iter().enumerate() {
            let (on_color, over_color) = PALETTE[k % PALETTE.len()];
            let mut on_bars = Vec::with_capacity(n);
            let mut over_bars = Vec::with_capacity(n);
            for (i, row) in table.rows.iter().enumerate() {
                let center = (n - 1 - i) as f64;
                let top = center + ROW_FILL / 2.0 - k as f64 * lane_h;
                let bottom = top - lane_h;
                let counts = row.counts.get(k).copied().unwrap_or_default();
                let on_end = counts.on_time as f64;
                on_bars.push(Bar {
                    start: 0.0,
                    end: on_end,
                    top,
                    bottom,
                    value: counts.on_time,
                });
                over_bars.push(Bar {
                    start: on_end,
                    end: on_end + counts.overdue as f64,
                    top,
                    bottom,
                    value: counts.overdue,
                });
            }
            series.push(BarSeries {
                month: *month,
                label: format!("{} Em Dia", month.display_name()),
                color: on_color,
                bars: on_bars,
            });
            series.push(BarSeries {
                month: *month,
                label: format!("{} Vencido", month.display_name()),
                color: over_color,
                bars: over_bars,
            });
        }

        Ok(Self {
            width: WIDTH,
            height: (CHROME_PX + (n * lanes) as u32 * LANE_PX).max(MIN_HEIGHT),
            areas: table.rows.iter().map(|r| r.area.clone()).collect(),
            x_max: max_total * X_HEADROOM,
            series,
        })
    }

    /// Render as a standalone SVG document.
    pub fn to_svg(&self) -> Result<String, ChartError> {
        ensure_font()?;
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root).map_err(draw_error)?;
            root.present().map_err(draw_error)?;
        }
        Ok(svg)
    }

    /// Render into an RGB buffer of `width x height` pixels.
    pub fn to_raster(&self) -> Result<Raster, ChartError> {
        ensure_font()?;
        let mut pixels = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root).map_err(draw_error)?;
            root.present().map_err(draw_error)?;
        }
        Ok(Raster {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let n = self.areas.len();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .margin(MARGIN)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA)
            .build_cartesian_2d(0f64..self.x_max, -0.5f64..(n as f64 - 0.5))?;

        // Row centers sit on whole numbers; anything else gets no label.
        let area_label = |y: &f64| -> String {
            let r = y.round();
            if (y - r).abs() > 1e-6 || r < 0.0 || r as usize >= n {
                return String::new();
            }
            self.areas[n - 1 - r as usize].clone()
        };
        let count_label = |x: &f64| format!("{x:.0}");
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&area_label)
            .x_labels(X_TICKS)
            .x_label_formatter(&count_label)
            .bold_line_style(GRID.stroke_width(1))
            .light_line_style(WHITE.stroke_width(1))
            .label_style((FONT_FAMILY, 13))
            .draw()?;

        for series in &self.series {
            let color = series.color;
            chart
                .draw_series(series.bars.iter().map(|b| {
                    Rectangle::new([(b.start, b.top), (b.end, b.bottom)], color.filled())
                }))?
                .label(series.label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
        }

        let value_style: TextStyle = (FONT_FAMILY, 11).into();
        let value_style = value_style.pos(Pos::new(HPos::Center, VPos::Center));
        chart.draw_series(
            self.series
                .iter()
                .flat_map(|s| s.bars.iter())
                .filter(|b| b.value > 0)
                .map(|b| {
                    Text::new(
                        b.value.to_string(),
                        ((b.start + b.end) / 2.0, (b.top + b.bottom) / 2.0),
                        value_style.clone(),
                    )
                }),
        )?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font((FONT_FAMILY, 13))
            .background_style(WHITE.mix(0.9).filled())
            .border_style(BLACK.stroke_width(1))
            .draw()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MonthCounts, PivotRow};

    fn table() -> PivotTable {
        PivotTable {
            months: vec![Month::Janeiro, Month::Fevereiro],
            rows: vec![
                PivotRow {
                    area: "RH".into(),
                    counts: vec![
                        MonthCounts { on_time: 10, overdue: 2 },
                        MonthCounts { on_time: 8, overdue: 5 },
                    ],
                },
                PivotRow {
                    area: "TI".into(),
                    counts: vec![
                        MonthCounts { on_time: 20, overdue: 0 },
                        MonthCounts::default(),
                    ],
                },
            ],
        }
    }

    fn has_color(raster: &Raster, color: RGBColor, x_range: std::ops::Range<u32>) -> bool {
        (0..raster.height)
            .flat_map(|y| x_range.clone().map(move |x| (x, y)))
            .any(|(x, y)| raster.pixel(x, y) == Some(color))
    }

    #[test]
    fn test_overdue_stacks_after_on_time() {
        let layout = ChartLayout::from_table(&table()).unwrap();
        assert_eq!(layout.series.len(), 4);
        let on = &layout.series[0];
        let over = &layout.series[1];
        assert_eq!(on.color, PALETTE[0].0);
        assert_eq!(over.color, PALETTE[0].1);
        assert_eq!(layout.series[2].color, PALETTE[1].0);
        for (a, b) in on.bars.iter().zip(&over.bars) {
            assert_eq!(b.start, a.end);
            assert_eq!((a.top, a.bottom), (b.top, b.bottom));
        }
        assert_eq!(over.bars[0].end, 12.0);
    }

    #[test]
    fn test_first_area_is_drawn_on_top() {
        let layout = ChartLayout::from_table(&table()).unwrap();
        assert_eq!(layout.areas, vec!["RH", "TI"]);
        let jan = &layout.series[0].bars;
        assert!(jan[0].bottom > jan[1].top);
        // Within a row the first month's lane sits above the second's.
        let fev = &layout.series[2].bars;
        assert!((jan[0].bottom - fev[0].top).abs() < 1e-9);
    }

    #[test]
    fn test_axis_leaves_room_past_largest_stack() {
        let layout = ChartLayout::from_table(&table()).unwrap();
        assert!((layout.x_max - 20.0 * X_HEADROOM).abs() < 1e-9);
    }

    #[test]
    fn test_legend_labels() {
        let layout = ChartLayout::from_table(&table()).unwrap();
        let names: Vec<&str> = layout.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Janeiro Em Dia",
                "Janeiro Vencido",
                "Fevereiro Em Dia",
                "Fevereiro Vencido"
            ]
        );
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let err = ChartLayout::from_table(&PivotTable::default()).unwrap_err();
        assert!(matches!(err, ChartError::Empty));
    }

    #[test]
    fn test_svg_carries_labels() {
        let svg = ChartLayout::from_table(&table()).unwrap().to_svg().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains(">RH<"));
        assert!(svg.contains(">TI<"));
        assert!(svg.contains("Fevereiro Vencido"));
        assert!(svg.contains(">10<"));
    }

    #[test]
    fn test_raster_has_bars_and_area_text() {
        let layout = ChartLayout::from_table(&table()).unwrap();
        let raster = layout.to_raster().unwrap();
        assert_eq!(raster.pixels.len(), (raster.width * raster.height * 3) as usize);
        for (on, over) in PALETTE {
            assert!(has_color(&raster, on, 0..raster.width));
            assert!(has_color(&raster, over, 0..raster.width));
        }
        // Area names are painted in the label gutter left of the plot.
        let gutter = MARGIN..MARGIN + Y_LABEL_AREA - 10;
        let dark = (0..raster.height)
            .flat_map(|y| gutter.clone().map(move |x| (x, y)))
            .filter_map(|(x, y)| raster.pixel(x, y))
            .filter(|c| c.0 < 128 && c.1 < 128 && c.2 < 128)
            .count();
        assert!(dark > 20, "expected text pixels in the label gutter, got {dark}");
    }

    #[test]
    fn test_png_signature() {
        let png = ChartLayout::from_table(&table())
            .unwrap()
            .to_raster()
            .unwrap()
            .to_png()
            .unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }
}
