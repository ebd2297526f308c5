//! Chart rendering.
//!
//! Draws the daily visits line chart and the top pages bar chart stacked
//! on one fixed-size canvas and returns it as PNG bytes. The canvas size
//! never depends on the data so the report layout stays predictable.

use crate::error::{Error, Result};
use crate::fonts::{FontSet, CHART_FONT_FAMILY};
use crate::models::{DailyVisitCounts, TopPages};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info};

/// Default canvas width in pixels.
pub const DEFAULT_WIDTH: u32 = 1000;

/// Default canvas height in pixels.
pub const DEFAULT_HEIGHT: u32 = 1300;

const SERIES_COLOR: RGBColor = RGBColor(31, 119, 180);
const MAX_X_LABELS: usize = 12;
const MAX_LABEL_CHARS: usize = 24;

/// A rendered chart canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded pixels.
    pub png: Vec<u8>,
}

impl ChartImage {
    /// Decode the PNG back into pixels.
    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory(&self.png).map_err(|e| Error::render("chart decode", e.to_string()))
    }

    /// Write the PNG to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.png)?;
        info!("Chart saved to: {}", path.display());
        Ok(())
    }
}

/// Renders the composite chart canvas.
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    text: bool,
}

impl ChartRenderer {
    /// Create a renderer, registering the chart font from `fonts`.
    pub fn new(width: u32, height: u32, fonts: &FontSet) -> Self {
        Self {
            width,
            height,
            text: fonts.register_chart_font(),
        }
    }

    /// Create a renderer that draws plots without any text.
    pub fn without_text(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: false,
        }
    }

    /// Canvas size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render both plots. Empty inputs produce empty placeholder plots.
    pub fn render(&self, daily_visits: &DailyVisitCounts, top_pages: &TopPages) -> Result<ChartImage> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::render("chart", "canvas size must be non-zero"));
        }

        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];

        let drawn = panic::catch_unwind(AssertUnwindSafe(|| {
            self.draw(&mut buffer, daily_visits, top_pages)
        }));
        match drawn {
            Ok(result) => result?,
            Err(_) => return Err(Error::render("chart", "chart backend panicked")),
        }

        let png = encode_png(self.width, self.height, buffer)?;
        debug!(
            "Rendered {}x{} chart ({} bytes)",
            self.width,
            self.height,
            png.len()
        );

        Ok(ChartImage {
            width: self.width,
            height: self.height,
            png,
        })
    }

    fn draw(
        &self,
        buffer: &mut [u8],
        daily_visits: &DailyVisitCounts,
        top_pages: &TopPages,
    ) -> Result<()> {
        let root = BitMapBackend::with_buffer(buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let areas = root.split_evenly((2, 1));
        self.draw_daily(&areas[0], daily_visits)?;
        self.draw_pages(&areas[1], top_pages)?;

        root.present().map_err(draw_err)?;
        Ok(())
    }

    fn draw_daily<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        daily_visits: &DailyVisitCounts,
    ) -> Result<()> {
        let labels: Vec<String> = daily_visits.iter().map(|(d, _)| d.to_string()).collect();
        let points: Vec<(f64, f64)> = daily_visits
            .iter()
            .enumerate()
            .map(|(i, (_, count))| (i as f64, *count as f64))
            .collect();
        let y_max = daily_visits.iter().map(|(_, c)| *c).max().unwrap_or(0);

        let mut builder = ChartBuilder::on(area);
        builder.margin(20);
        if self.text {
            builder
                .caption("Daily Visits", (CHART_FONT_FAMILY, 28.0).into_font())
                .x_label_area_size(50)
                .y_label_area_size(60);
        }

        let x_range = index_range(points.len());
        let y_range = count_range(y_max);
        let mut chart = builder
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(draw_err)?;

        if self.text {
            let x_formatter = |x: &f64| index_label(&labels, *x);
            chart
                .configure_mesh()
                .x_labels(labels.len().clamp(1, MAX_X_LABELS))
                .x_label_formatter(&x_formatter)
                .x_desc("Date")
                .y_desc("Visit Count")
                .draw()
                .map_err(draw_err)?;
        } else {
            draw_frame(&chart, &x_range, &y_range)?;
        }

        if points.is_empty() {
            return self.draw_placeholder(&chart, &x_range, &y_range);
        }

        chart
            .draw_series(LineSeries::new(
                points.iter().copied(),
                SERIES_COLOR.stroke_width(2),
            ))
            .map_err(draw_err)?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&point| Circle::new(point, 4, SERIES_COLOR.filled())),
            )
            .map_err(draw_err)?;

        Ok(())
    }

    fn draw_pages<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        top_pages: &TopPages,
    ) -> Result<()> {
        let labels: Vec<String> = top_pages.iter().map(|p| shorten(&p.page_url)).collect();

        let mut builder = ChartBuilder::on(area);
        builder.margin(20);
        if self.text {
            builder
                .caption(
                    format!("Top {} Most Visited Pages", top_pages.len()),
                    (CHART_FONT_FAMILY, 28.0).into_font(),
                )
                .x_label_area_size(50)
                .y_label_area_size(60);
        }

        let x_range = index_range(top_pages.len());
        let y_range = count_range(top_pages.max_visits());
        let mut chart = builder
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(draw_err)?;

        if self.text {
            let x_formatter = |x: &f64| index_label(&labels, *x);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(labels.len().clamp(1, MAX_X_LABELS))
                .x_label_formatter(&x_formatter)
                .x_desc("Page URL")
                .y_desc("Visit Count")
                .draw()
                .map_err(draw_err)?;
        } else {
            draw_frame(&chart, &x_range, &y_range)?;
        }

        if top_pages.is_empty() {
            return self.draw_placeholder(&chart, &x_range, &y_range);
        }

        chart
            .draw_series(top_pages.iter().enumerate().map(|(i, page)| {
                let x = i as f64;
                Rectangle::new(
                    [(x - 0.35, 0.0), (x + 0.35, page.visits as f64)],
                    SERIES_COLOR.filled(),
                )
            }))
            .map_err(draw_err)?;

        Ok(())
    }

    fn draw_placeholder<DB: DrawingBackend>(
        &self,
        chart: &ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
        x_range: &Range<f64>,
        y_range: &Range<f64>,
    ) -> Result<()> {
        if !self.text {
            return Ok(());
        }

        let anchor = (
            (x_range.start + x_range.end) / 2.0,
            (y_range.start + y_range.end) / 2.0,
        );
        chart
            .plotting_area()
            .draw(&Text::new(
                "No data",
                anchor,
                (CHART_FONT_FAMILY, 24.0).into_font().color(&BLACK),
            ))
            .map_err(draw_err)?;

        Ok(())
    }
}

/// Outline the plotting area when no mesh is drawn.
fn draw_frame<DB: DrawingBackend>(
    chart: &ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    x_range: &Range<f64>,
    y_range: &Range<f64>,
) -> Result<()> {
    chart
        .plotting_area()
        .draw(&Rectangle::new(
            [(x_range.start, y_range.start), (x_range.end, y_range.end)],
            BLACK.stroke_width(1),
        ))
        .map_err(draw_err)
}

/// X range with one unit slot per item, centred on the item index.
fn index_range(items: usize) -> Range<f64> {
    -0.5..(items.max(1) as f64 - 0.5)
}

/// Y range from zero with headroom above the largest count.
fn count_range(max: u64) -> Range<f64> {
    0.0..(max as f64 * 1.1).max(1.0)
}

/// Label for an integer tick, empty for ticks between items.
fn index_label(labels: &[String], x: f64) -> String {
    let rounded = x.round();
    if rounded < 0.0 || (x - rounded).abs() > 1e-6 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

fn shorten(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 3).collect();
        format!("{}...", head)
    }
}

fn encode_png(width: u32, height: u32, buffer: Vec<u8>) -> Result<Vec<u8>> {
    let pixels = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| Error::render("chart", "pixel buffer does not match canvas size"))?;

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|e| Error::render("chart", e.to_string()))?;

    Ok(png)
}

fn draw_err<E: std::fmt::Display>(err: E) -> Error {
    Error::render("chart", err.to_string())
}
