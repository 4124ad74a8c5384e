use crate::display::{Alignment, GlyphRun, ImageHandle, Point, Rect, Stroke, Surface};
use crate::layout::LayoutState;
use crate::metrics::{FontSize, TextMetrics};
use crate::page::PageConfig;
use crate::platform::BackendError;
use crate::wrap::wrap_text;

/// Immediate advance applied by a solid rule.
pub const SOLID_LINE_ADVANCE: f32 = 3.0;

/// Stroke width of a solid rule.
pub const SOLID_LINE_STROKE: f32 = 1.0;

/// Placement options for a text command.
///
/// `width` and `offset` are fractions of the printable width. A width of `1.0`
/// means "the rest of the row after `offset`".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    pub font: FontSize,
    pub alignment: Alignment,
    pub width: f32,
    pub offset: f32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font: FontSize::Normal,
            alignment: Alignment::Near,
            width: 1.0,
            offset: 0.0,
        }
    }
}

impl TextOptions {
    pub fn font(mut self, font: FontSize) -> Self {
        self.font = font;
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Column width in pixels for a page of `printable_width` pixels.
    pub fn column_width(&self, printable_width: f32) -> f32 {
        if self.width == 1.0 {
            printable_width * (1.0 - self.offset)
        } else {
            self.width * printable_width
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextCommand {
    pub content: String,
    pub options: TextOptions,
}

impl TextCommand {
    pub fn new(content: impl Into<String>, options: TextOptions) -> Self {
        Self {
            content: content.into(),
            options,
        }
    }

    /// A centred row of dashes filling the printable width at the default font.
    pub fn dotted_rule(page: &PageConfig, metrics: &TextMetrics) -> Self {
        let font = FontSize::Normal;
        let dash_width = font.points() * metrics.char_proportion;
        let count = (page.printable_width() / dash_width) as usize;
        Self::new(
            "-".repeat(count),
            TextOptions::default().font(font).align(Alignment::Center),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCommand {
    pub image: ImageHandle,
    pub alignment: Alignment,
}

/// Deferred unit of work replayed by the pagination controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Text(TextCommand),
    Image(ImageCommand),
    SolidLine,
    NewLine,
}

/// Executes one command against `surface`, updating `layout`.
///
/// Text and images draw at the current height and only register the height
/// their row needs; [`Command::NewLine`] is what moves down. Solid rules are the
/// exception and advance immediately.
pub fn execute(
    command: &Command,
    surface: &mut dyn Surface,
    layout: &mut LayoutState,
    page: &PageConfig,
    metrics: &TextMetrics,
) -> Result<(), BackendError> {
    match command {
        Command::Text(text) => draw_text(text, surface, layout, page, metrics),
        Command::Image(image) => draw_image(image, surface, layout, page),
        Command::SolidLine => {
            let y = layout.current_height().ceil();
            surface.draw_line(
                Point::new(0.0, y),
                Point::new(page.printable_width(), y),
                Stroke {
                    width: SOLID_LINE_STROKE,
                },
            )?;
            layout.advance(SOLID_LINE_ADVANCE);
            Ok(())
        }
        Command::NewLine => {
            layout.commit_line(metrics.baseline());
            Ok(())
        }
    }
}

fn draw_text(
    command: &TextCommand,
    surface: &mut dyn Surface,
    layout: &mut LayoutState,
    page: &PageConfig,
    metrics: &TextMetrics,
) -> Result<(), BackendError> {
    let options = command.options;
    let printable_width = page.printable_width();
    let font_size = options.font.points();
    let column_width = options.column_width(printable_width);
    let wrapped = wrap_text(&command.content, font_size, column_width, metrics);
    let height = wrapped.height(font_size, metrics);

    surface.draw_text(GlyphRun {
        text: wrapped.text,
        font_family: metrics.font_family.clone(),
        font_size_pt: font_size,
        area: Rect::new(
            options.offset * printable_width,
            layout.current_height(),
            column_width,
            height,
        ),
        alignment: options.alignment,
    })?;
    layout.accumulate(height);
    Ok(())
}

fn draw_image(
    command: &ImageCommand,
    surface: &mut dyn Surface,
    layout: &mut LayoutState,
    page: &PageConfig,
) -> Result<(), BackendError> {
    let page_width = i64::from(page.printable_width_px);
    let image_width = i64::from(command.image.width());
    let x = match command.alignment {
        Alignment::Near => 0,
        Alignment::Center => (page_width - image_width) / 2,
        Alignment::Far => page_width - image_width,
    };
    let y = layout.current_height().round();
    let image_height = command.image.height() as f32;

    surface.draw_image(
        &command.image,
        Rect::new(x as f32, y, image_width as f32, image_height),
    )?;
    layout.overwrite(image_height);
    Ok(())
}
