use image::{codecs::png::PngEncoder, imageops, ColorType, ImageEncoder, Rgba, RgbaImage};

use crate::display::{Alignment, DisplayCommand, GlyphRun, Point, Stroke};
use crate::metrics::TextMetrics;
use crate::platform::{BackendError, SpoolPage};

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const GLYPH_INK: Rgba<u8> = Rgba([64, 64, 64, 255]);

/// Rasterizes a spooled page at one pixel per device pixel and encodes it as PNG.
pub fn render_page_png(page: &SpoolPage, metrics: &TextMetrics) -> Result<Vec<u8>, BackendError> {
    let canvas = rasterize_page(page, metrics);
    let mut data = Vec::new();
    PngEncoder::new(&mut data).write_image(
        canvas.as_raw(),
        canvas.width(),
        canvas.height(),
        ColorType::Rgba8,
    )?;
    Ok(data)
}

/// Paints a page onto a white canvas.
///
/// Glyphs are drawn as solid blocks sized by the text metrics, which is enough
/// to check placement and wrapping by eye.
pub fn rasterize_page(page: &SpoolPage, metrics: &TextMetrics) -> RgbaImage {
    let width = page.size.width.max(1);
    let height = page.size.height.max(1);
    let mut canvas = RgbaImage::from_pixel(width, height, PAPER);

    for command in &page.display_list.commands {
        match command {
            DisplayCommand::GlyphRun(run) => draw_glyph_blocks(&mut canvas, run, metrics),
            DisplayCommand::Image { image, area } => {
                imageops::overlay(
                    &mut canvas,
                    image.pixels(),
                    area.origin.x.round() as i64,
                    area.origin.y.round() as i64,
                );
            }
            DisplayCommand::Rule { start, end, stroke } => {
                draw_horizontal_line(&mut canvas, *start, *end, stroke);
            }
        }
    }

    canvas
}

fn draw_glyph_blocks(canvas: &mut RgbaImage, run: &GlyphRun, metrics: &TextMetrics) {
    let size = run.font_size_pt;
    let line_height = metrics.line_height(size);
    let glyph_height = (size * 0.7).max(1.0);

    for (index, line) in run.lines().enumerate() {
        let line_width = metrics.text_width(line, size);
        let mut x = match run.alignment {
            Alignment::Near => run.area.origin.x,
            Alignment::Center => run.area.origin.x + (run.area.size.width - line_width) / 2.0,
            Alignment::Far => run.area.origin.x + run.area.size.width - line_width,
        };
        let top = run.area.origin.y + index as f32 * line_height + (line_height - glyph_height) / 2.0;

        for ch in line.chars() {
            let advance = metrics.char_width(ch, size);
            if !ch.is_whitespace() {
                fill_rect(
                    canvas,
                    x.round(),
                    top.round(),
                    (advance * 0.8).ceil(),
                    glyph_height.ceil(),
                    GLYPH_INK,
                );
            }
            x += advance;
        }
    }
}

/// Fills the part of the rectangle that lies on the canvas; anything off-page is dropped.
fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, color: Rgba<u8>) {
    if !(width > 0.0 && height > 0.0) {
        return;
    }
    let width_px = canvas.width() as f32;
    let height_px = canvas.height() as f32;
    let x0 = clamp_to(x, width_px);
    let y0 = clamp_to(y, height_px);
    let x1 = clamp_to(x + width, width_px);
    let y1 = clamp_to(y + height, height_px);
    for yy in y0..y1 {
        for xx in x0..x1 {
            canvas.put_pixel(xx, yy, color);
        }
    }
}

fn clamp_to(value: f32, limit: f32) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, limit) as u32
}

fn draw_horizontal_line(canvas: &mut RgbaImage, start: Point, end: Point, stroke: &Stroke) {
    let x0 = start.x.min(end.x).round();
    let x1 = start.x.max(end.x).round();
    let y = start.y.round();
    let thickness = stroke.width.ceil().max(1.0);
    fill_rect(canvas, x0, y, x1 - x0, thickness, INK);
}
