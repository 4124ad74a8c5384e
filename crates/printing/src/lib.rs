//! Receipt layout and pagination: a deferred command queue replayed onto page-feed backends.

pub mod command;
pub mod config;
pub mod controller;
pub mod display;
pub mod layout;
pub mod metrics;
pub mod page;
pub mod pdf;
pub mod platform;
pub mod raster;
pub mod spool;
pub mod wrap;

pub use command::{execute, Command, ImageCommand, TextCommand, TextOptions};
pub use config::{PaperSettings, PrinterSettings, SettingsError};
pub use controller::{PrintError, PrintSummary, PrinterSession, SessionState};
pub use display::{
    Alignment, DisplayCommand, DisplayListSurface, GlyphRun, ImageHandle, Point,
    PrintDisplayList, Rect, ScratchSurface, Size, Stroke, Surface,
};
pub use layout::LayoutState;
pub use metrics::{FontSize, TextMetrics};
pub use page::{PageConfig, PixelSize, PrintMode};
pub use platform::{
    spool_pages, BackendError, PageFeed, PrintBackend, PrintJob, PrintTarget, PrinterCatalog,
    SpoolPage,
};
pub use spool::{
    SpoolOutput, SpooledJob, VirtualJob, VirtualPrinter, VirtualPrinters, MEMORY_TARGET,
    PDF_TARGET, PNG_TARGET,
};
pub use wrap::{wrap_text, WrappedText};
