// Chart rendering for the per-entity artifacts.
//
// Charts are drawn with embedded-graphics primitives onto an in-memory
// `RgbImage` and written as PNG. Pie wedges are rasterised directly so the
// angle convention is ours: clockwise from 3 o'clock.
use std::convert::Infallible;
use std::f64::consts::PI;
use std::path::Path;

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15, FONT_9X15_BOLD};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};
use image::{ImageFormat, RgbImage};
use tracing::info;

use crate::error::ChartError;
use crate::output::ArtifactPaths;
use crate::types::{EntitySummary, StatusTable, WorkHoursRow, METRIC_TOTAL};
use crate::util::format_number;

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;
pub const BAR_TITLE: &str = "Work Hours Data (in days)";

const PIE_CENTER: (i32, i32) = (320, 240);
const PIE_RADIUS: f64 = 150.0;

const TAB20: [u32; 20] = [
    0x1f77b4, 0xaec7e8, 0xff7f0e, 0xffbb78, 0x2ca02c, 0x98df8a, 0xd62728, 0xff9896, 0x9467bd,
    0xc5b0d5, 0x8c564b, 0xc49c94, 0xe377c2, 0xf7b6d2, 0x7f7f7f, 0xc7c7c7, 0xbcbd22, 0xdbdb8d,
    0x17becf, 0x9edae5,
];

const PAIRED: [u32; 12] = [
    0xa6cee3, 0x1f78b4, 0xb2df8a, 0x33a02c, 0xfb9a99, 0xe31a1c, 0xfdbf6f, 0xff7f00, 0xcab2d6,
    0x6a3d9a, 0xffff99, 0xb15928,
];

fn hex(c: u32) -> Rgb888 {
    Rgb888::new((c >> 16) as u8, (c >> 8) as u8, c as u8)
}

/// `n` colours spread evenly across the 20-entry qualitative map.
pub fn tab20_palette(n: usize) -> Vec<Rgb888> {
    let last = TAB20.len() - 1;
    (0..n)
        .map(|i| {
            let v = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let idx = ((v * TAB20.len() as f64) as usize).min(last);
            hex(TAB20[idx])
        })
        .collect()
}

/// The first `n` colours of the paired map, repeating the last one.
pub fn paired_palette(n: usize) -> Vec<Rgb888> {
    (0..n)
        .map(|i| hex(PAIRED[i.min(PAIRED.len() - 1)]))
        .collect()
}

/// Draw target backed by an RGB image buffer; off-canvas pixels are dropped.
struct Canvas(RgbImage);

impl Canvas {
    fn new() -> Self {
        Canvas(RgbImage::from_pixel(WIDTH, HEIGHT, image::Rgb([255, 255, 255])))
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < self.0.width() && y < self.0.height() {
                self.0
                    .put_pixel(x, y, image::Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}

fn text_style(font: &'static MonoFont<'static>) -> MonoTextStyle<'static, Rgb888> {
    MonoTextStyle::new(font, Rgb888::BLACK)
}

/// Point at `radius` from the pie centre along `angle` (radians, clockwise).
fn polar(angle: f64, radius: f64) -> Point {
    Point::new(
        PIE_CENTER.0 + (radius * angle.cos()).round() as i32,
        PIE_CENTER.1 + (radius * angle.sin()).round() as i32,
    )
}

/// Pie of the category percentages. The Total row is left out.
pub fn pie_chart(table: &StatusTable) -> RgbImage {
    draw_pie(table).unwrap_or_else(|never| match never {})
}

fn draw_pie(table: &StatusTable) -> Result<RgbImage, Infallible> {
    let mut canvas = Canvas::new();
    let slices: Vec<(&str, f64)> = table
        .categories()
        .iter()
        .map(|r| (r.status.as_str(), r.percentage_value().max(0.0)))
        .collect();
    let sum: f64 = slices.iter().map(|(_, v)| v).sum();

    let outline = PrimitiveStyle::with_stroke(Rgb888::new(128, 128, 128), 1);
    let diameter = (PIE_RADIUS * 2.0) as u32;
    let circle = Circle::with_center(Point::new(PIE_CENTER.0, PIE_CENTER.1), diameter);
    if sum <= 0.0 {
        circle.into_styled(outline).draw(&mut canvas)?;
        Text::with_alignment(
            "No tickets",
            Point::new(PIE_CENTER.0, PIE_CENTER.1),
            text_style(&FONT_9X15),
            Alignment::Center,
        )
        .draw(&mut canvas)?;
        return Ok(canvas.0);
    }

    // Cumulative wedge boundaries as fractions of a full turn.
    let colors = tab20_palette(slices.len());
    let mut bounds = Vec::with_capacity(slices.len());
    let mut acc = 0.0;
    for (_, v) in &slices {
        acc += v / sum;
        bounds.push(acc);
    }

    let r = PIE_RADIUS as i32;
    let wedge_pixels = (-r..=r).flat_map(|dy| (-r..=r).map(move |dx| (dx, dy))).filter_map(|(dx, dy)| {
        let (fx, fy) = (dx as f64, dy as f64);
        if fx * fx + fy * fy > PIE_RADIUS * PIE_RADIUS {
            return None;
        }
        let turn = fy.atan2(fx).rem_euclid(2.0 * PI) / (2.0 * PI);
        let idx = bounds.iter().position(|b| turn < *b).unwrap_or(bounds.len() - 1);
        Some(Pixel(
            Point::new(PIE_CENTER.0 + dx, PIE_CENTER.1 + dy),
            colors[idx],
        ))
    });
    canvas.draw_iter(wedge_pixels)?;

    let mut start = 0.0;
    for ((label, value), end) in slices.iter().zip(&bounds) {
        let mid = (start + end) / 2.0 * 2.0 * PI;
        start = *end;
        let label_pos = polar(mid, PIE_RADIUS * 1.15);
        let align = if mid.cos() >= 0.0 {
            Alignment::Left
        } else {
            Alignment::Right
        };
        Text::with_alignment(label, label_pos, text_style(&FONT_9X15), align).draw(&mut canvas)?;
        let pct = format!("{:.1}%", value / sum * 100.0);
        Text::with_alignment(&pct, polar(mid, PIE_RADIUS * 0.6), text_style(&FONT_6X10), Alignment::Center)
            .draw(&mut canvas)?;
    }
    Ok(canvas.0)
}

/// Bars of the per-ticket averages in days. The total row is left out.
pub fn bar_chart(rows: &[WorkHoursRow]) -> RgbImage {
    draw_bars(rows).unwrap_or_else(|never| match never {})
}

fn draw_bars(rows: &[WorkHoursRow]) -> Result<RgbImage, Infallible> {
    let mut canvas = Canvas::new();
    let bars: Vec<&WorkHoursRow> = rows.iter().filter(|r| r.metric != METRIC_TOTAL).collect();

    let (left, right, top, bottom) = (80, WIDTH as i32 - 30, 60, HEIGHT as i32 - 70);
    let axis = PrimitiveStyle::with_stroke(Rgb888::BLACK, 1);
    Line::new(Point::new(left, bottom), Point::new(right, bottom))
        .into_styled(axis)
        .draw(&mut canvas)?;
    Line::new(Point::new(left, top), Point::new(left, bottom))
        .into_styled(axis)
        .draw(&mut canvas)?;

    Text::with_alignment(
        BAR_TITLE,
        Point::new(WIDTH as i32 / 2, 30),
        text_style(&FONT_9X15_BOLD),
        Alignment::Center,
    )
    .draw(&mut canvas)?;
    Text::with_alignment(
        "Metric",
        Point::new((left + right) / 2, HEIGHT as i32 - 15),
        text_style(&FONT_9X15),
        Alignment::Center,
    )
    .draw(&mut canvas)?;
    Text::with_alignment("Days", Point::new(left - 10, top - 12), text_style(&FONT_9X15), Alignment::Right)
        .draw(&mut canvas)?;

    let max = bars.iter().map(|r| r.days).fold(0.0_f64, f64::max);
    let scale_max = if max > 0.0 { max * 1.1 } else { 1.0 };
    let plot_height = (bottom - top) as f64;

    for i in 0..=4 {
        let value = scale_max * i as f64 / 4.0;
        let y = bottom - (plot_height * i as f64 / 4.0).round() as i32;
        Line::new(Point::new(left - 4, y), Point::new(left, y))
            .into_styled(axis)
            .draw(&mut canvas)?;
        Text::with_alignment(
            &format_number(value, 2),
            Point::new(left - 8, y + 3),
            text_style(&FONT_6X10),
            Alignment::Right,
        )
        .draw(&mut canvas)?;
    }

    if bars.is_empty() {
        return Ok(canvas.0);
    }
    let slot = (right - left) / bars.len() as i32;
    let bar_width = (slot as f64 * 0.6) as u32;
    let colors = paired_palette(bars.len());
    for (i, (row, color)) in bars.iter().zip(colors).enumerate() {
        let center_x = left + slot * i as i32 + slot / 2;
        let height = ((row.days.max(0.0) / scale_max) * plot_height).round() as i32;
        Rectangle::new(
            Point::new(center_x - bar_width as i32 / 2, bottom - height),
            Size::new(bar_width, height as u32),
        )
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(&mut canvas)?;
        Text::with_alignment(
            &format_number(row.days, 2),
            Point::new(center_x, bottom - height - 6),
            text_style(&FONT_6X10),
            Alignment::Center,
        )
        .draw(&mut canvas)?;
        Text::with_alignment(
            &row.metric,
            Point::new(center_x, bottom + 18),
            text_style(&FONT_6X10),
            Alignment::Center,
        )
        .draw(&mut canvas)?;
    }
    Ok(canvas.0)
}

fn save_png(image: &RgbImage, path: &Path) -> Result<(), ChartError> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ChartError::Save {
            path: path.to_path_buf(),
            source,
        })
}

/// Render and write the two pies and the bar chart for one entity.
pub fn save_charts(paths: &ArtifactPaths, summary: &EntitySummary) -> Result<(), ChartError> {
    save_png(&pie_chart(&summary.assigned), &paths.assigned_chart)?;
    save_png(&pie_chart(&summary.reported), &paths.reported_chart)?;
    save_png(&bar_chart(&summary.work_hours.rows()), &paths.work_hours_chart)?;
    info!(entity = %summary.entity, "saved charts");
    Ok(())
}
