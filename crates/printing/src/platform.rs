use std::io;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::controller::PrintError;
use crate::display::{DisplayListSurface, PrintDisplayList, Surface};
use crate::page::PixelSize;

/// Errors raised by devices and drawing surfaces.
/// 裝置與繪圖表面回報的錯誤。
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("device error: {0}")]
    Device(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("page feed stopped after {executed} of {total} commands")]
    Incomplete { executed: usize, total: usize },
}

/// Producer of page content, driven by the backend's page loop.
/// 由後端頁面迴圈驅動的頁面內容來源。
pub trait PageFeed {
    /// Renders the next page into `surface` and reports whether more pages remain.
    fn render_next_page(
        &mut self,
        surface: &mut dyn Surface,
        bounds: PixelSize,
    ) -> Result<bool, BackendError>;
}

/// Running job on a backend; consumed by either `finish` or `abort`.
/// 後端上的列印作業，必須以 `finish` 或 `abort` 結束。
pub trait PrintJob {
    /// Requests pages from `feed` until it reports that none remain.
    fn run(&mut self, feed: &mut dyn PageFeed) -> Result<(), BackendError>;
    fn finish(self) -> Result<(), BackendError>;
    fn abort(self, reason: &str);
}

/// An opened output target.
/// 已開啟的輸出目標。
pub trait PrintBackend {
    type Job: PrintJob;

    fn set_page_size(&mut self, size: PixelSize);
    fn page_size(&self) -> PixelSize;
    fn begin_job(&mut self) -> Result<Self::Job, BackendError>;
}

/// Enumerates output targets and opens them by name.
/// 列舉輸出目標並依名稱開啟。
pub trait PrinterCatalog {
    type Backend: PrintBackend;

    fn targets(&self) -> Vec<PrintTarget>;
    fn open(&self, name: &str) -> Result<Self::Backend, PrintError>;
}

/// Printer target metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintTarget {
    pub name: String,
    pub description: String,
}

impl PrintTarget {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One rendered page queued for output.
/// 表示一張已繪製、待輸出的頁面。
#[derive(Debug, Clone)]
pub struct SpoolPage {
    pub page_number: u32,
    pub size: PixelSize,
    pub display_list: PrintDisplayList,
}

/// Runs a page loop that records each page as a display list.
/// 執行頁面迴圈，並將每一頁記錄為繪圖指令清單。
pub fn spool_pages(
    feed: &mut dyn PageFeed,
    size: PixelSize,
) -> Result<Vec<SpoolPage>, BackendError> {
    let mut pages = Vec::new();
    loop {
        let mut surface = DisplayListSurface::new();
        let has_more = feed.render_next_page(&mut surface, size)?;
        pages.push(SpoolPage {
            page_number: pages.len() as u32 + 1,
            size,
            display_list: surface.into_display_list(),
        });
        if !has_more {
            return Ok(pages);
        }
    }
}

/// Recorded job metadata produced by the mock backend.
/// 模擬後端所記錄的列印作業中繼資料。
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedJob {
    pub pages: Vec<SpoolPage>,
    pub aborted: bool,
    pub abort_reason: Option<String>,
}

/// Failure injected into the mock backend.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    BeginJob,
    /// Fails while page `n` (1-based) is being requested.
    Page(u32),
    /// Stops requesting pages after page `n` even if more remain.
    StopAfter(u32),
    Finish,
}

/// In-memory implementation of [`PrintBackend`] used for tests.
/// 測試使用的記憶體內部後端實作。
#[cfg(test)]
#[derive(Clone)]
pub struct MockBackend {
    size: PixelSize,
    sizes: Arc<Mutex<Vec<PixelSize>>>,
    jobs: Arc<Mutex<Vec<RecordedJob>>>,
    failure: Option<MockFailure>,
}

#[cfg(test)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            size: PixelSize::new(0, 0),
            sizes: Arc::default(),
            jobs: Arc::default(),
            failure: None,
        }
    }

    pub fn failing(failure: MockFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new()
        }
    }

    pub fn drain_jobs(&self) -> Vec<RecordedJob> {
        self.jobs.lock().expect("lock poisoned").drain(..).collect()
    }

    /// Every page size the backend has been configured with, oldest first.
    pub fn size_history(&self) -> Vec<PixelSize> {
        self.sizes.lock().expect("lock poisoned").clone()
    }
}

#[cfg(test)]
pub struct MockJob {
    size: PixelSize,
    pages: Vec<SpoolPage>,
    sink: Arc<Mutex<Vec<RecordedJob>>>,
    failure: Option<MockFailure>,
}

#[cfg(test)]
impl PrintBackend for MockBackend {
    type Job = MockJob;

    fn set_page_size(&mut self, size: PixelSize) {
        self.size = size;
        self.sizes.lock().expect("lock poisoned").push(size);
    }

    fn page_size(&self) -> PixelSize {
        self.size
    }

    fn begin_job(&mut self) -> Result<Self::Job, BackendError> {
        if self.failure == Some(MockFailure::BeginJob) {
            return Err(BackendError::Device("printer offline".into()));
        }
        Ok(MockJob {
            size: self.size,
            pages: Vec::new(),
            sink: self.jobs.clone(),
            failure: self.failure,
        })
    }
}

#[cfg(test)]
impl PrintJob for MockJob {
    fn run(&mut self, feed: &mut dyn PageFeed) -> Result<(), BackendError> {
        loop {
            let page_number = self.pages.len() as u32 + 1;
            if self.failure == Some(MockFailure::Page(page_number)) {
                return Err(BackendError::Device(format!("paper jam on page {page_number}")));
            }
            let mut surface = DisplayListSurface::new();
            let has_more = feed.render_next_page(&mut surface, self.size)?;
            self.pages.push(SpoolPage {
                page_number,
                size: self.size,
                display_list: surface.into_display_list(),
            });
            if !has_more || self.failure == Some(MockFailure::StopAfter(page_number)) {
                return Ok(());
            }
        }
    }

    fn finish(self) -> Result<(), BackendError> {
        if self.failure == Some(MockFailure::Finish) {
            self.abort("finish failed");
            return Err(BackendError::Device("spooler rejected the job".into()));
        }
        self.sink.lock().expect("lock poisoned").push(RecordedJob {
            pages: self.pages,
            aborted: false,
            abort_reason: None,
        });
        Ok(())
    }

    fn abort(self, reason: &str) {
        self.sink.lock().expect("lock poisoned").push(RecordedJob {
            pages: self.pages,
            aborted: true,
            abort_reason: Some(reason.to_string()),
        });
    }
}
