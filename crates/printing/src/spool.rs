use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::controller::PrintError;
use crate::metrics::TextMetrics;
use crate::page::PixelSize;
use crate::pdf::render_pdf_document;
use crate::platform::{
    spool_pages, BackendError, PageFeed, PrintBackend, PrintJob, PrintTarget, PrinterCatalog,
    SpoolPage,
};
use crate::raster::render_page_png;

pub const MEMORY_TARGET: &str = "Memory Spooler";
pub const PDF_TARGET: &str = "PDF Writer";
pub const PNG_TARGET: &str = "PNG Writer";

/// Where a virtual printer delivers finished jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpoolOutput {
    /// Keep pages in memory only.
    Memory,
    /// Write a single PDF file.
    Pdf(PathBuf),
    /// Write one `page-NNN.png` per page into a directory.
    Png(PathBuf),
}

/// Finished or aborted job kept by a virtual printer.
#[derive(Debug, Clone)]
pub struct SpooledJob {
    pub target: String,
    pub pages: Vec<SpoolPage>,
    pub written: Vec<PathBuf>,
    pub aborted: bool,
    pub abort_reason: Option<String>,
}

type JobLog = Arc<Mutex<Vec<SpooledJob>>>;

fn lock(log: &JobLog) -> MutexGuard<'_, Vec<SpooledJob>> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Catalog of the built-in virtual targets.
///
/// File targets write below `output_dir`: the PDF writer produces
/// `<output_dir>/receipt.pdf` unless a file path is set with
/// [`VirtualPrinters::with_pdf_path`].
#[derive(Debug, Clone)]
pub struct VirtualPrinters {
    output_dir: PathBuf,
    pdf_path: Option<PathBuf>,
    metrics: TextMetrics,
    jobs: JobLog,
}

impl VirtualPrinters {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            pdf_path: None,
            metrics: TextMetrics::default(),
            jobs: JobLog::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: TextMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_pdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdf_path = Some(path.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Takes every job recorded so far, across all targets opened from this catalog.
    pub fn drain_jobs(&self) -> Vec<SpooledJob> {
        lock(&self.jobs).drain(..).collect()
    }
}

impl PrinterCatalog for VirtualPrinters {
    type Backend = VirtualPrinter;

    fn targets(&self) -> Vec<PrintTarget> {
        vec![
            PrintTarget::new(MEMORY_TARGET, "keeps rendered pages in memory"),
            PrintTarget::new(PDF_TARGET, "writes all pages to a single PDF file"),
            PrintTarget::new(PNG_TARGET, "writes one PNG preview per page"),
        ]
    }

    fn open(&self, name: &str) -> Result<Self::Backend, PrintError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PrintError::MissingBackendTarget);
        }
        let output = if name.eq_ignore_ascii_case(MEMORY_TARGET) {
            SpoolOutput::Memory
        } else if name.eq_ignore_ascii_case(PDF_TARGET) {
            SpoolOutput::Pdf(
                self.pdf_path
                    .clone()
                    .unwrap_or_else(|| self.output_dir.join("receipt.pdf")),
            )
        } else if name.eq_ignore_ascii_case(PNG_TARGET) {
            SpoolOutput::Png(self.output_dir.clone())
        } else {
            return Err(PrintError::UnknownTarget(name.to_string()));
        };
        debug!("opened virtual target '{name}' -> {output:?}");

        Ok(VirtualPrinter {
            name: name.to_string(),
            output,
            size: PixelSize::new(0, 0),
            metrics: self.metrics.clone(),
            jobs: self.jobs.clone(),
        })
    }
}

/// Backend that spools pages as display lists and delivers them on finish.
#[derive(Debug, Clone)]
pub struct VirtualPrinter {
    name: String,
    output: SpoolOutput,
    size: PixelSize,
    metrics: TextMetrics,
    jobs: JobLog,
}

impl VirtualPrinter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> &SpoolOutput {
        &self.output
    }
}

impl PrintBackend for VirtualPrinter {
    type Job = VirtualJob;

    fn set_page_size(&mut self, size: PixelSize) {
        self.size = size;
    }

    fn page_size(&self) -> PixelSize {
        self.size
    }

    fn begin_job(&mut self) -> Result<Self::Job, BackendError> {
        if self.size.width == 0 || self.size.height == 0 {
            return Err(BackendError::Device(format!(
                "{}: page size {} is empty",
                self.name, self.size
            )));
        }
        Ok(VirtualJob {
            target: self.name.clone(),
            output: self.output.clone(),
            size: self.size,
            metrics: self.metrics.clone(),
            pages: Vec::new(),
            sink: self.jobs.clone(),
        })
    }
}

/// Job on a [`VirtualPrinter`].
pub struct VirtualJob {
    target: String,
    output: SpoolOutput,
    size: PixelSize,
    metrics: TextMetrics,
    pages: Vec<SpoolPage>,
    sink: JobLog,
}

impl VirtualJob {
    fn deliver(&self) -> Result<Vec<PathBuf>, BackendError> {
        match &self.output {
            SpoolOutput::Memory => Ok(Vec::new()),
            SpoolOutput::Pdf(path) => {
                let data = render_pdf_document(&self.pages, &self.metrics)?;
                if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                    create_dir(parent)?;
                }
                write_file(path, &data)?;
                Ok(vec![path.clone()])
            }
            SpoolOutput::Png(dir) => {
                create_dir(dir)?;
                let mut written = Vec::with_capacity(self.pages.len());
                for page in &self.pages {
                    let data = render_page_png(page, &self.metrics)?;
                    let path = dir.join(format!("page-{:03}.png", page.page_number));
                    write_file(&path, &data)?;
                    written.push(path);
                }
                Ok(written)
            }
        }
    }
}

impl PrintJob for VirtualJob {
    fn run(&mut self, feed: &mut dyn PageFeed) -> Result<(), BackendError> {
        let pages = spool_pages(feed, self.size)?;
        debug!("{}: spooled {} page(s) at {}", self.target, pages.len(), self.size);
        self.pages.extend(pages);
        Ok(())
    }

    fn finish(self) -> Result<(), BackendError> {
        let written = match self.deliver() {
            Ok(written) => written,
            Err(err) => {
                let reason = err.to_string();
                self.abort(&reason);
                return Err(err);
            }
        };
        for path in &written {
            info!("{}: wrote {}", self.target, path.display());
        }
        lock(&self.sink).push(SpooledJob {
            target: self.target,
            pages: self.pages,
            written,
            aborted: false,
            abort_reason: None,
        });
        Ok(())
    }

    fn abort(self, reason: &str) {
        warn!("{}: job aborted: {reason}", self.target);
        lock(&self.sink).push(SpooledJob {
            target: self.target,
            pages: self.pages,
            written: Vec::new(),
            aborted: true,
            abort_reason: Some(reason.to_string()),
        });
    }
}

fn create_dir(path: &Path) -> Result<(), BackendError> {
    fs::create_dir_all(path).map_err(|source| BackendError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), BackendError> {
    fs::write(path, data).map_err(|source| BackendError::Io {
        path: path.to_path_buf(),
        source,
    })
}
