use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::platform::BackendError;

/// Horizontal placement of text or images within their box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Near,
    Center,
    Far,
}

/// 2D coordinate in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D size representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned box anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point { x, y },
            size: Size { width, height },
        }
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }
}

/// Stroke descriptor for simple line drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
}

/// Text drawn inside a box; `text` may hold pre-wrapped rows separated by `\n`.
///
/// Surfaces must not re-wrap the text.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub text: String,
    pub font_family: String,
    pub font_size_pt: f32,
    pub area: Rect,
    pub alignment: Alignment,
}

impl GlyphRun {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

/// Shared, already-decoded bitmap handed to [`Surface::draw_image`].
#[derive(Clone)]
pub struct ImageHandle(Arc<RgbaImage>);

impl ImageHandle {
    pub fn new(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }
}

impl From<RgbaImage> for ImageHandle {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Drawing capability the layout engine renders into.
pub trait Surface {
    fn draw_text(&mut self, run: GlyphRun) -> Result<(), BackendError>;
    fn draw_image(&mut self, image: &ImageHandle, area: Rect) -> Result<(), BackendError>;
    fn draw_line(&mut self, start: Point, end: Point, stroke: Stroke)
        -> Result<(), BackendError>;
}

/// Low-level drawing commands recorded for one page.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    GlyphRun(GlyphRun),
    Image { image: ImageHandle, area: Rect },
    Rule { start: Point, end: Point, stroke: Stroke },
}

/// Ordered drawing commands for a single page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintDisplayList {
    pub commands: Vec<DisplayCommand>,
}

impl PrintDisplayList {
    /// Append a command to the display list.
    pub fn push(&mut self, command: DisplayCommand) {
        self.commands.push(command);
    }

    /// Returns true if the display list is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Glyph runs in drawing order.
    pub fn glyph_runs(&self) -> impl Iterator<Item = &GlyphRun> {
        self.commands.iter().filter_map(|command| match command {
            DisplayCommand::GlyphRun(run) => Some(run),
            _ => None,
        })
    }
}

/// Surface that records every draw into a [`PrintDisplayList`].
#[derive(Debug, Default)]
pub struct DisplayListSurface {
    list: PrintDisplayList,
}

impl DisplayListSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_display_list(self) -> PrintDisplayList {
        self.list
    }
}

impl Surface for DisplayListSurface {
    fn draw_text(&mut self, run: GlyphRun) -> Result<(), BackendError> {
        self.list.push(DisplayCommand::GlyphRun(run));
        Ok(())
    }

    fn draw_image(&mut self, image: &ImageHandle, area: Rect) -> Result<(), BackendError> {
        self.list.push(DisplayCommand::Image {
            image: image.clone(),
            area,
        });
        Ok(())
    }

    fn draw_line(
        &mut self,
        start: Point,
        end: Point,
        stroke: Stroke,
    ) -> Result<(), BackendError> {
        self.list.push(DisplayCommand::Rule { start, end, stroke });
        Ok(())
    }
}

/// Throwaway surface used while measuring a continuous page.
///
/// Draws are discarded; only the count and the lowest painted edge are kept.
#[derive(Debug)]
pub struct ScratchSurface {
    width: u32,
    height: u32,
    operations: usize,
    extent: f32,
}

impl ScratchSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            operations: 0,
            extent: 0.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn operations(&self) -> usize {
        self.operations
    }

    /// Bottom-most painted edge across every draw so far.
    pub fn painted_extent(&self) -> f32 {
        self.extent
    }

    fn record(&mut self, bottom: f32) {
        self.operations += 1;
        self.extent = self.extent.max(bottom);
    }
}

impl Surface for ScratchSurface {
    fn draw_text(&mut self, run: GlyphRun) -> Result<(), BackendError> {
        self.record(run.area.bottom());
        Ok(())
    }

    fn draw_image(&mut self, _image: &ImageHandle, area: Rect) -> Result<(), BackendError> {
        self.record(area.bottom());
        Ok(())
    }

    fn draw_line(
        &mut self,
        start: Point,
        end: Point,
        stroke: Stroke,
    ) -> Result<(), BackendError> {
        self.record(start.y.max(end.y) + stroke.width);
        Ok(())
    }
}
