use std::fmt;

/// Device pixels per millimetre of paper.
pub const PIXELS_PER_MM: f64 = 3.937;

/// Nominal height used when the caller does not fix one (an A4 sheet).
pub const DEFAULT_NOMINAL_HEIGHT_MM: u32 = 297;

/// Paper width a freshly opened session starts with.
pub const DEFAULT_PAPER_WIDTH_MM: f64 = 58.0;

/// Extra pixels added below the measured content of a continuous page.
pub const CONTINUOUS_TAIL_PX: u32 = 5;

/// How page height is decided for a print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Fixed page height; overflowing content starts a new page.
    Paginated,
    /// A single page sized to the content by a measurement pass.
    Continuous,
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintMode::Paginated => f.write_str("paginated"),
            PrintMode::Continuous => f.write_str("continuous"),
        }
    }
}

/// Page size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}px", self.width, self.height)
    }
}

/// Printable page geometry and pagination mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageConfig {
    pub printable_width_px: u32,
    pub height_px: u32,
    pub mode: PrintMode,
}

impl PageConfig {
    /// Converts a nominal paper size into device pixels.
    ///
    /// Common roll widths (80, 76 and 58 mm) map to their printable widths once
    /// the physical margins are taken off; any other width loses 10 mm. Leaving
    /// the height out selects [`PrintMode::Continuous`].
    pub fn from_paper(width_mm: f64, height_mm: Option<u32>) -> Self {
        let printable_width_mm = printable_width_mm(width_mm);
        let (nominal_height_mm, mode) = match height_mm {
            Some(height) => (height, PrintMode::Paginated),
            None => (DEFAULT_NOMINAL_HEIGHT_MM, PrintMode::Continuous),
        };

        Self {
            printable_width_px: mm_to_px(printable_width_mm),
            height_px: mm_to_px(f64::from(nominal_height_mm)),
            mode,
        }
    }

    pub const fn pixel_size(&self) -> PixelSize {
        PixelSize::new(self.printable_width_px, self.height_px)
    }

    pub fn printable_width(&self) -> f32 {
        self.printable_width_px as f32
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::from_paper(DEFAULT_PAPER_WIDTH_MM, None)
    }
}

/// Printable width in millimetres for a nominal roll width.
pub fn printable_width_mm(width_mm: f64) -> f64 {
    if width_mm == 80.0 {
        72.1
    } else if width_mm == 76.0 {
        63.5
    } else if width_mm == 58.0 {
        48.0
    } else {
        width_mm - 10.0
    }
}

/// Converts millimetres to whole device pixels, rounding up.
pub fn mm_to_px(mm: f64) -> u32 {
    (mm * PIXELS_PER_MM).ceil().max(0.0) as u32
}
