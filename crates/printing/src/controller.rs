use log::{debug, info, warn};
use thiserror::Error;

use crate::command::{execute, Command, ImageCommand, TextCommand, TextOptions};
use crate::display::{Alignment, ImageHandle, ScratchSurface, Surface};
use crate::layout::LayoutState;
use crate::metrics::TextMetrics;
use crate::page::{PageConfig, PixelSize, PrintMode, CONTINUOUS_TAIL_PX};
use crate::platform::{BackendError, PageFeed, PrintBackend, PrintJob, PrinterCatalog};

/// Distance from the bottom edge at which a paginated page is considered full.
pub const PAGE_BREAK_MARGIN: f32 = 20.0;

/// Errors raised while opening a session or printing.
/// 開啟工作階段或列印時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("no printer target was given")]
    MissingBackendTarget,
    #[error("unknown printer target '{0}'")]
    UnknownTarget(String),
    #[error("print backend failed: {0}")]
    Backend(#[from] BackendError),
}

/// Session lifecycle for analytics/log markers.
/// 工作階段的生命週期狀態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    BuildingQueue,
    Measuring,
    Rendering,
    Done,
}

/// Result produced after a completed print.
/// 列印完成後所產生的結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintSummary {
    pub pages: u32,
    pub commands: usize,
    pub page_size: PixelSize,
    pub mode: PrintMode,
}

/// A document under construction for one output target.
/// 針對單一輸出目標建構中的文件。
///
/// Content calls only queue commands; [`PrinterSession::print`] replays the
/// queue against the backend and then empties it so the session can take the
/// next document.
pub struct PrinterSession<B: PrintBackend> {
    target: String,
    backend: B,
    page: PageConfig,
    metrics: TextMetrics,
    commands: Vec<Command>,
    state: SessionState,
}

impl<B: PrintBackend> PrinterSession<B> {
    /// Opens `name` from `catalog`.
    pub fn open<C>(catalog: &C, name: &str) -> Result<Self, PrintError>
    where
        C: PrinterCatalog<Backend = B>,
    {
        if name.trim().is_empty() {
            return Err(PrintError::MissingBackendTarget);
        }
        let backend = catalog.open(name)?;
        Self::new(name, backend)
    }

    /// Wraps an already opened backend; the page starts as a continuous 58 mm roll.
    pub fn new(target: impl Into<String>, mut backend: B) -> Result<Self, PrintError> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(PrintError::MissingBackendTarget);
        }
        let page = PageConfig::default();
        backend.set_page_size(page.pixel_size());
        Ok(Self {
            target,
            backend,
            page,
            metrics: TextMetrics::default(),
            commands: Vec::new(),
            state: SessionState::BuildingQueue,
        })
    }

    pub fn with_metrics(mut self, metrics: TextMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    pub fn page_config(&self) -> PageConfig {
        self.page
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Sets the paper size in millimetres; omitting the height selects continuous mode.
    pub fn set_page_size(&mut self, width_mm: f64, height_mm: Option<u32>) -> &mut Self {
        self.page = PageConfig::from_paper(width_mm, height_mm);
        debug!(
            "{}: page set to {} ({})",
            self.target,
            self.page.pixel_size(),
            self.page.mode
        );
        self.backend.set_page_size(self.page.pixel_size());
        self
    }

    pub fn print_text(&mut self, content: impl Into<String>, options: TextOptions) -> &mut Self {
        self.commands
            .push(Command::Text(TextCommand::new(content, options)));
        self
    }

    pub fn print_image(&mut self, image: ImageHandle, alignment: Alignment) -> &mut Self {
        self.commands
            .push(Command::Image(ImageCommand { image, alignment }));
        self
    }

    pub fn print_solid_line(&mut self) -> &mut Self {
        self.commands.push(Command::SolidLine);
        self
    }

    /// Queues a centred row of dashes sized to the current page width.
    pub fn print_dotted_line(&mut self) -> &mut Self {
        let rule = TextCommand::dotted_rule(&self.page, &self.metrics);
        self.commands.push(Command::Text(rule));
        self
    }

    pub fn new_line(&mut self) -> &mut Self {
        self.commands.push(Command::NewLine);
        self
    }

    /// Replays the queue against the backend and clears it.
    /// 將指令佇列重播到後端並於完成後清空。
    ///
    /// A continuous page is measured first; the session page and the backend
    /// then take the measured height. A failure before the backend job exists
    /// leaves the queue untouched; any later failure aborts the job and drops
    /// the queue.
    pub fn print(&mut self) -> Result<PrintSummary, PrintError> {
        if self.page.mode == PrintMode::Continuous {
            self.transition(SessionState::Measuring);
            let measured = match measure(&self.commands, &self.page, &self.metrics) {
                Ok(height) => height,
                Err(err) => return Err(self.abandon(err)),
            };
            self.page.height_px = measured.ceil() as u32 + CONTINUOUS_TAIL_PX;
            self.backend.set_page_size(self.page.pixel_size());
            debug!(
                "{}: measured {:.1}px of content, page resized to {}",
                self.target,
                measured,
                self.backend.page_size()
            );
        }
        let page = self.page;

        self.transition(SessionState::Rendering);
        let mut job = match self.backend.begin_job() {
            Ok(job) => job,
            Err(err) if page.mode == PrintMode::Continuous => return Err(self.abandon(err)),
            Err(err) => {
                self.transition(SessionState::BuildingQueue);
                return Err(err.into());
            }
        };

        let mut feed = ReplayFeed::new(&self.commands, page, &self.metrics);
        let outcome = job.run(&mut feed).and_then(|()| feed.ensure_exhausted());
        let pages = feed.pages;
        let executed = feed.cursor;

        if let Err(err) = outcome {
            warn!("{}: aborting print on page {pages}: {err}", self.target);
            job.abort(&err.to_string());
            return Err(self.abandon(err));
        }
        if let Err(err) = job.finish() {
            return Err(self.abandon(err));
        }

        self.transition(SessionState::Done);
        info!(
            "{}: print completed, {pages} page(s), {executed} command(s)",
            self.target
        );
        self.commands.clear();
        self.transition(SessionState::BuildingQueue);

        Ok(PrintSummary {
            pages,
            commands: executed,
            page_size: page.pixel_size(),
            mode: page.mode,
        })
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("{}: {:?} -> {:?}", self.target, self.state, next);
            self.state = next;
        }
    }

    fn abandon(&mut self, err: BackendError) -> PrintError {
        self.commands.clear();
        self.transition(SessionState::BuildingQueue);
        PrintError::Backend(err)
    }
}

/// Replays every command on a scratch surface and returns the final height.
fn measure(
    commands: &[Command],
    page: &PageConfig,
    metrics: &TextMetrics,
) -> Result<f32, BackendError> {
    let mut surface = ScratchSurface::new(page.printable_width_px, page.height_px);
    let mut layout = LayoutState::new(metrics.baseline());
    for command in commands {
        execute(command, &mut surface, &mut layout, page, metrics)?;
    }
    debug!(
        "measurement pass: {} draw(s), painted down to {:.1}px",
        surface.operations(),
        surface.painted_extent()
    );
    Ok(layout.current_height())
}

/// Page-by-page replay of the queue; the cursor survives between pages.
///
/// A break after the final command still requests one more page, which then
/// stays blank.
struct ReplayFeed<'a> {
    commands: &'a [Command],
    cursor: usize,
    layout: LayoutState,
    page: PageConfig,
    metrics: &'a TextMetrics,
    pages: u32,
    finished: bool,
}

impl<'a> ReplayFeed<'a> {
    fn new(commands: &'a [Command], page: PageConfig, metrics: &'a TextMetrics) -> Self {
        Self {
            commands,
            cursor: 0,
            layout: LayoutState::new(metrics.baseline()),
            page,
            metrics,
            pages: 0,
            finished: false,
        }
    }

    fn ensure_exhausted(&self) -> Result<(), BackendError> {
        if self.cursor < self.commands.len() {
            return Err(BackendError::Incomplete {
                executed: self.cursor,
                total: self.commands.len(),
            });
        }
        Ok(())
    }
}

impl PageFeed for ReplayFeed<'_> {
    fn render_next_page(
        &mut self,
        surface: &mut dyn Surface,
        bounds: PixelSize,
    ) -> Result<bool, BackendError> {
        if self.finished {
            return Ok(false);
        }
        self.pages += 1;
        let limit = bounds.height as f32 - PAGE_BREAK_MARGIN;

        while self.cursor < self.commands.len() {
            execute(
                &self.commands[self.cursor],
                surface,
                &mut self.layout,
                &self.page,
                self.metrics,
            )?;
            self.cursor += 1;

            if self.page.mode == PrintMode::Paginated && self.layout.current_height() > limit {
                debug!(
                    "page {} full at {:.1}px after command {}",
                    self.pages,
                    self.layout.current_height(),
                    self.cursor
                );
                self.layout.start_page();
                return Ok(true);
            }
        }

        self.finished = true;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayCommand;
    use crate::metrics::FontSize;
    use crate::platform::{MockBackend, MockFailure};
    use image::RgbaImage;

    fn session(backend: MockBackend) -> PrinterSession<MockBackend> {
        let _ = env_logger::builder().is_test(true).try_init();
        PrinterSession::new("Mock", backend).unwrap()
    }

    fn queue_rows(session: &mut PrinterSession<MockBackend>, rows: usize) {
        for row in 0..rows {
            session
                .print_text(format!("row {row}"), TextOptions::default())
                .new_line();
        }
    }

    #[test]
    fn blank_target_name_is_rejected() {
        match PrinterSession::new("  ", MockBackend::new()) {
            Err(PrintError::MissingBackendTarget) => {}
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn new_session_configures_default_roll() {
        let backend = MockBackend::new();
        let session = session(backend.clone());
        assert_eq!(session.page_config().mode, PrintMode::Continuous);
        assert_eq!(backend.size_history(), vec![PixelSize::new(189, 1170)]);
        assert_eq!(session.state(), SessionState::BuildingQueue);
    }

    #[test]
    fn enqueueing_does_not_touch_the_backend() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        queue_rows(&mut session, 3);
        session.print_solid_line().print_dotted_line();
        assert_eq!(session.commands().len(), 8);
        assert!(backend.drain_jobs().is_empty());
    }

    #[test]
    fn paginated_mode_breaks_when_page_is_nearly_full() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        // 30mm -> 119px; full once the height passes 99px.
        session.set_page_size(58.0, Some(30));
        queue_rows(&mut session, 6);

        let summary = session.print().unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.commands, 12);
        assert_eq!(summary.mode, PrintMode::Paginated);
        assert_eq!(summary.page_size, PixelSize::new(189, 119));

        let jobs = backend.drain_jobs();
        assert_eq!(jobs.len(), 1);
        let pages = &jobs[0].pages;
        assert_eq!(pages.len(), 2);

        let first: Vec<_> = pages[0].display_list.glyph_runs().collect();
        let second: Vec<_> = pages[1].display_list.glyph_runs().collect();
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].text, "row 4");
        assert_eq!(second[0].area.origin.y, 0.0);
        assert_eq!(second[1].area.origin.y, 32.0);
    }

    #[test]
    fn solid_line_can_trigger_a_page_break_on_its_own() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        session.set_page_size(58.0, Some(30));
        queue_rows(&mut session, 3);
        // 96px after three rows; the rule pushes it to 99px, then 102px.
        session.print_solid_line().print_solid_line().print_text("tail", TextOptions::default());

        let summary = session.print().unwrap();
        assert_eq!(summary.pages, 2);
        let jobs = backend.drain_jobs();
        let tail = jobs[0].pages[1].display_list.glyph_runs().next().unwrap();
        assert_eq!(tail.text, "tail");
        assert_eq!(tail.area.origin.y, 0.0);
    }

    #[test]
    fn continuous_mode_measures_then_prints_one_page() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        session.set_page_size(80.0, None);
        session
            .print_text("header", TextOptions::default())
            .new_line()
            .print_solid_line()
            .new_line()
            .print_text("TOTAL", TextOptions::default().font(FontSize::Large))
            .new_line();

        let summary = session.print().unwrap();
        // 32 + 3 + 32 + 44.8 = 111.8 -> 112 + 5
        assert_eq!(summary.page_size, PixelSize::new(284, 117));
        assert_eq!(summary.pages, 1);
        assert_eq!(
            backend.size_history(),
            vec![
                PixelSize::new(189, 1170),
                PixelSize::new(284, 1170),
                PixelSize::new(284, 117),
            ]
        );

        let jobs = backend.drain_jobs();
        assert_eq!(jobs[0].pages.len(), 1);
        assert_eq!(jobs[0].pages[0].size, PixelSize::new(284, 117));
        assert_eq!(jobs[0].pages[0].display_list.len(), 3);
    }

    #[test]
    fn continuous_print_keeps_the_measured_height() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        session.print_text("one row", TextOptions::default()).new_line();

        let summary = session.print().unwrap();
        assert_eq!(summary.page_size, PixelSize::new(189, 37));
        assert_eq!(session.page_config().height_px, 37);
        assert_eq!(session.page_config().mode, PrintMode::Continuous);
        assert_eq!(session.backend().page_size(), PixelSize::new(189, 37));

        session
            .print_text("two", TextOptions::default())
            .new_line()
            .print_text("rows", TextOptions::default())
            .new_line();
        assert_eq!(session.print().unwrap().page_size.height, 69);
        assert_eq!(session.page_config().height_px, 69);
    }

    #[test]
    fn accessors_expose_target_and_metrics() {
        let metrics = TextMetrics {
            font_family: "Noto Sans Mono".into(),
            ..TextMetrics::default()
        };
        let session = session(MockBackend::new()).with_metrics(metrics.clone());
        assert_eq!(session.target(), "Mock");
        assert_eq!(session.metrics(), &metrics);
        assert_eq!(session.backend().page_size(), PixelSize::new(189, 1170));
    }

    #[test]
    fn continuous_mode_never_breaks_pages() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        queue_rows(&mut session, 60);

        let summary = session.print().unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.page_size.height, 60 * 32 + 5);
        assert_eq!(backend.drain_jobs()[0].pages[0].display_list.len(), 60);
    }

    #[test]
    fn queue_is_cleared_and_session_reusable_after_print() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        queue_rows(&mut session, 2);
        session.print().unwrap();
        assert!(session.commands().is_empty());
        assert_eq!(session.state(), SessionState::BuildingQueue);

        queue_rows(&mut session, 1);
        let summary = session.print().unwrap();
        assert_eq!(summary.commands, 2);
        assert_eq!(backend.drain_jobs().len(), 2);
    }

    #[test]
    fn empty_queue_prints_a_single_blank_page() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        session.set_page_size(58.0, Some(30));
        let summary = session.print().unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.commands, 0);
        assert!(backend.drain_jobs()[0].pages[0].display_list.is_empty());
    }

    #[test]
    fn failure_to_start_a_paginated_job_keeps_the_queue() {
        let mut session = session(MockBackend::failing(MockFailure::BeginJob));
        session.set_page_size(58.0, Some(30));
        queue_rows(&mut session, 2);

        match session.print() {
            Err(PrintError::Backend(BackendError::Device(message))) => {
                assert_eq!(message, "printer offline")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(session.commands().len(), 4);
        assert_eq!(session.state(), SessionState::BuildingQueue);
    }

    #[test]
    fn failure_after_measuring_clears_the_queue() {
        let mut session = session(MockBackend::failing(MockFailure::BeginJob));
        queue_rows(&mut session, 2);
        assert!(session.print().is_err());
        assert!(session.commands().is_empty());
    }

    #[test]
    fn failure_mid_print_aborts_the_job_and_clears_the_queue() {
        let backend = MockBackend::failing(MockFailure::Page(2));
        let mut session = session(backend.clone());
        session.set_page_size(58.0, Some(30));
        queue_rows(&mut session, 6);

        let err = session.print().unwrap_err();
        assert!(err.to_string().contains("paper jam on page 2"));
        assert!(session.commands().is_empty());
        assert_eq!(session.state(), SessionState::BuildingQueue);

        let jobs = backend.drain_jobs();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].aborted);
        assert_eq!(jobs[0].pages.len(), 1);
        assert_eq!(
            jobs[0].abort_reason.as_deref(),
            Some("device error: paper jam on page 2")
        );
    }

    #[test]
    fn backend_stopping_early_is_reported() {
        let backend = MockBackend::failing(MockFailure::StopAfter(1));
        let mut session = session(backend.clone());
        session.set_page_size(58.0, Some(30));
        queue_rows(&mut session, 6);

        match session.print() {
            Err(PrintError::Backend(BackendError::Incomplete { executed, total })) => {
                assert_eq!((executed, total), (8, 12));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(backend.drain_jobs()[0].aborted);
    }

    #[test]
    fn failing_finish_is_propagated() {
        let backend = MockBackend::failing(MockFailure::Finish);
        let mut session = session(backend.clone());
        queue_rows(&mut session, 1);
        assert!(matches!(session.print(), Err(PrintError::Backend(_))));
        assert!(session.commands().is_empty());
        assert!(backend.drain_jobs()[0].aborted);
    }

    #[test]
    fn feed_stays_finished_once_exhausted() {
        let metrics = TextMetrics::default();
        let commands = vec![Command::NewLine];
        let mut feed = ReplayFeed::new(&commands, PageConfig::default(), &metrics);
        let mut surface = ScratchSurface::new(189, 1170);
        let bounds = PixelSize::new(189, 1170);
        assert!(!feed.render_next_page(&mut surface, bounds).unwrap());
        assert!(!feed.render_next_page(&mut surface, bounds).unwrap());
        assert_eq!(feed.pages, 1);
        assert_eq!(feed.cursor, 1);
    }

    #[test]
    fn break_after_the_last_command_yields_a_blank_page() {
        let backend = MockBackend::new();
        let mut session = session(backend.clone());
        session.set_page_size(58.0, Some(30));
        // Four rows reach 128px, past the 99px break line, on the final command.
        queue_rows(&mut session, 4);

        let summary = session.print().unwrap();
        assert_eq!(summary.pages, 2);
        let jobs = backend.drain_jobs();
        assert_eq!(jobs[0].pages.len(), 2);
        assert!(jobs[0].pages[1].display_list.is_empty());
    }

    #[test]
    fn identical_queues_produce_identical_layout() {
        let logo = ImageHandle::new(RgbaImage::new(40, 40));
        let build = |backend: MockBackend| {
            let mut session = session(backend);
            session.set_page_size(76.0, Some(40));
            session
                .print_image(logo.clone(), Alignment::Center)
                .new_line()
                .print_text("Store", TextOptions::default().font(FontSize::Large))
                .print_text("#0001", TextOptions::default().align(Alignment::Far))
                .new_line()
                .print_dotted_line()
                .new_line();
            queue_rows(&mut session, 5);
            session.print().unwrap();
        };

        let first = MockBackend::new();
        let second = MockBackend::new();
        build(first.clone());
        build(second.clone());

        let first_pages: Vec<_> = first.drain_jobs()[0]
            .pages
            .iter()
            .map(|page| page.display_list.clone())
            .collect();
        let second_pages: Vec<_> = second.drain_jobs()[0]
            .pages
            .iter()
            .map(|page| page.display_list.clone())
            .collect();
        assert!(first_pages.len() > 1);
        assert_eq!(first_pages, second_pages);

        let images = first_pages[0]
            .commands
            .iter()
            .filter(|command| matches!(command, DisplayCommand::Image { .. }))
            .count();
        assert_eq!(images, 1);
    }
}
