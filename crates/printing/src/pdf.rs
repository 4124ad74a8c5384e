use std::fmt::{self, Write as _};

use crate::display::{Alignment, DisplayCommand, GlyphRun, ImageHandle, Rect};
use crate::metrics::TextMetrics;
use crate::platform::{BackendError, SpoolPage};

/// PDF points per device pixel (pixels are 1/100", points 1/72").
pub const POINTS_PER_PIXEL: f32 = 0.72;

/// Renders spooled pages into a standalone PDF document.
///
/// Text is set in Helvetica; glyphs outside printable ASCII are replaced with
/// `?`. Images are embedded uncompressed, composited onto white.
pub fn render_pdf_document(
    pages: &[SpoolPage],
    metrics: &TextMetrics,
) -> Result<Vec<u8>, BackendError> {
    if pages.is_empty() {
        return Err(BackendError::Device("no pages to write".to_string()));
    }

    let mut builder = PdfBuilder::new();
    let pages_object = builder.reserve();
    let font_object = builder.add_object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    let mut page_objects = Vec::with_capacity(pages.len());

    for page in pages {
        let width = page.size.width as f32 * POINTS_PER_PIXEL;
        let height = page.size.height as f32 * POINTS_PER_PIXEL;
        let mut stream = String::new();
        let mut images = Vec::new();

        for command in &page.display_list.commands {
            match command {
                DisplayCommand::GlyphRun(run) => {
                    write_glyph_run(&mut stream, run, height, metrics)?
                }
                DisplayCommand::Image { image, area } => {
                    let name = format!("Im{}", images.len() + 1);
                    let object = builder.add_image(image);
                    write_image(&mut stream, &name, area, height)?;
                    images.push((name, object));
                }
                DisplayCommand::Rule { start, end, stroke } => {
                    writeln!(
                        stream,
                        "0 0 0 RG\n{w} w\n{x0} {y0} m {x1} {y1} l S",
                        w = fmt_float(stroke.width * POINTS_PER_PIXEL),
                        x0 = fmt_float(start.x * POINTS_PER_PIXEL),
                        y0 = fmt_float(height - start.y * POINTS_PER_PIXEL),
                        x1 = fmt_float(end.x * POINTS_PER_PIXEL),
                        y1 = fmt_float(height - end.y * POINTS_PER_PIXEL),
                    )
                    .map_err(stream_error)?;
                }
            }
        }

        let content_object = builder.add_stream("", stream.as_bytes());
        let xobjects = images
            .iter()
            .map(|(name, object)| format!("/{name} {object} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        let page_object = builder.add_object(format!(
            "<< /Type /Page /Parent {pages_object} 0 R /MediaBox [0 0 {width} {height}] \
             /Resources << /Font << /F1 {font_object} 0 R >> /XObject << {xobjects} >> >> \
             /Contents {content_object} 0 R >>",
            width = fmt_float(width),
            height = fmt_float(height),
        ));
        page_objects.push(page_object);
    }

    let kids = page_objects
        .iter()
        .map(|obj| format!("{obj} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    builder.set(
        pages_object,
        format!(
            "<< /Type /Pages /Count {count} /Kids [{kids}] >>",
            count = page_objects.len()
        ),
    );
    let catalog = builder.add_object(format!("<< /Type /Catalog /Pages {pages_object} 0 R >>"));

    builder.finish(catalog)
}

fn stream_error(err: fmt::Error) -> BackendError {
    BackendError::Surface(format!("failed to format PDF content: {err}"))
}

fn write_glyph_run(
    stream: &mut String,
    run: &GlyphRun,
    page_height: f32,
    metrics: &TextMetrics,
) -> Result<(), BackendError> {
    let line_height = metrics.line_height(run.font_size_pt);
    for (index, line) in run.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let text_width = metrics.text_width(line, run.font_size_pt);
        let x = match run.alignment {
            Alignment::Near => run.area.origin.x,
            Alignment::Center => run.area.origin.x + (run.area.size.width - text_width) / 2.0,
            Alignment::Far => run.area.origin.x + run.area.size.width - text_width,
        };
        let top = run.area.origin.y + index as f32 * line_height;
        let baseline = top + run.font_size_pt;
        writeln!(
            stream,
            "0 0 0 rg\nBT\n/F1 {size} Tf\n1 0 0 1 {x} {y} Tm\n({text}) Tj\nET",
            size = fmt_float(run.font_size_pt * POINTS_PER_PIXEL),
            x = fmt_float(x * POINTS_PER_PIXEL),
            y = fmt_float(page_height - baseline * POINTS_PER_PIXEL),
            text = pdf_escape_text(line),
        )
        .map_err(stream_error)?;
    }
    Ok(())
}

fn write_image(
    stream: &mut String,
    name: &str,
    area: &Rect,
    page_height: f32,
) -> Result<(), BackendError> {
    writeln!(
        stream,
        "q\n{w} 0 0 {h} {x} {y} cm\n/{name} Do\nQ",
        w = fmt_float(area.size.width * POINTS_PER_PIXEL),
        h = fmt_float(area.size.height * POINTS_PER_PIXEL),
        x = fmt_float(area.origin.x * POINTS_PER_PIXEL),
        y = fmt_float(page_height - area.bottom() * POINTS_PER_PIXEL),
    )
    .map_err(stream_error)
}

fn fmt_float(value: f32) -> String {
    format!("{:.3}", value)
}

fn pdf_escape_text(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '(' | ')' | '\\' => {
                output.push('\\');
                output.push(ch);
            }
            ' '..='~' => output.push(ch),
            _ => output.push('?'),
        }
    }
    output
}

/// Flattens RGBA pixels onto a white background as packed RGB.
fn rgb_on_white(image: &ImageHandle) -> Vec<u8> {
    let pixels = image.pixels();
    let mut data = Vec::with_capacity(pixels.width() as usize * pixels.height() as usize * 3);
    for pixel in pixels.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha)) / 255;
            data.push(blended as u8);
        }
    }
    data
}

struct PdfBuilder {
    objects: Vec<Vec<u8>>,
}

impl PdfBuilder {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Allocates an object number whose body is filled in later.
    fn reserve(&mut self) -> usize {
        self.objects.push(Vec::new());
        self.objects.len()
    }

    fn set(&mut self, number: usize, body: impl Into<Vec<u8>>) {
        self.objects[number - 1] = body.into();
    }

    fn add_object(&mut self, body: impl Into<Vec<u8>>) -> usize {
        self.objects.push(body.into());
        self.objects.len()
    }

    fn add_stream(&mut self, dictionary: &str, data: &[u8]) -> usize {
        let mut body = format!("<< {dictionary}/Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add_object(body)
    }

    fn add_image(&mut self, image: &ImageHandle) -> usize {
        let dictionary = format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 ",
            image.width(),
            image.height()
        );
        self.add_stream(&dictionary, &rgb_on_white(image))
    }

    fn finish(self, root: usize) -> Result<Vec<u8>, BackendError> {
        let mut output = Vec::new();
        output.extend_from_slice(b"%PDF-1.4\n%\xFF\xFF\xFF\xFF\n");
        let mut offsets = Vec::with_capacity(self.objects.len());

        for (index, body) in self.objects.iter().enumerate() {
            offsets.push(output.len());
            output.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            output.extend_from_slice(body);
            output.extend_from_slice(b"\nendobj\n");
        }

        let xref_start = output.len();
        let mut tail = format!(
            "xref\n0 {}\n0000000000 65535 f \n",
            self.objects.len() + 1
        );
        for offset in offsets {
            writeln!(tail, "{:010} 00000 n ", offset).map_err(stream_error)?;
        }
        write!(
            tail,
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.objects.len() + 1,
            root,
            xref_start
        )
        .map_err(stream_error)?;
        output.extend_from_slice(tail.as_bytes());
        Ok(output)
    }
}
