use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::{Rgba, RgbaImage};
use log::debug;
use slipfeed_printing::{
    Alignment, FontSize, ImageHandle, PrintSummary, PrinterCatalog, PrinterSession,
    PrinterSettings, TextOptions, VirtualPrinter, VirtualPrinters, MEMORY_TARGET, PDF_TARGET,
    PNG_TARGET,
};

#[derive(Parser)]
#[command(
    name = "slipfeed-cli",
    about = "Lay out and print receipts on virtual printers",
    author,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出可用的虛擬印表機。 / List the available virtual printers.
    Targets,
    /// 排版並列印示範收據。 / Lay out and print the sample receipt.
    Demo(DemoArgs),
}

#[derive(Args)]
struct DemoArgs {
    /// 印表機設定檔（JSON）。 / Printer settings file (JSON).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 目標印表機名稱；預設為記憶體佇列。 / Target printer name; defaults to the memory spooler.
    #[arg(long, value_name = "NAME")]
    target: Option<String>,

    /// 紙張寬度（公釐）。 / Paper width in millimetres.
    #[arg(long, value_name = "MM")]
    paper_width: Option<f64>,

    /// 紙張高度（公釐）；略過則為連續紙。 / Paper height in millimetres; omit for a continuous roll.
    #[arg(long, value_name = "MM")]
    paper_height: Option<u32>,

    /// PDF 檔案路徑或 PNG 輸出資料夾。 / PDF file path, or output directory for PNG pages.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// 收據頂端的 PNG 標誌。 / PNG logo printed at the top of the receipt.
    #[arg(long, value_name = "PNG")]
    logo: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Targets => handle_targets(),
        Commands::Demo(args) => handle_demo(args),
    }
}

fn handle_targets() -> Result<()> {
    let catalog = VirtualPrinters::new(".");
    for target in catalog.targets() {
        println!("{:<16} {}", target.name, target.description);
    }
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<()> {
    let mut settings = match &args.config {
        Some(path) => PrinterSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => PrinterSettings::default(),
    };
    if let Some(width) = args.paper_width {
        if !(width.is_finite() && width > 10.0) {
            bail!("paper width must be larger than 10 mm, got {width}");
        }
        settings.paper.width_mm = width;
    }
    if let Some(height) = args.paper_height {
        if height == 0 {
            bail!("paper height must be positive");
        }
        settings.paper.height_mm = Some(height);
    }
    let target = args
        .target
        .clone()
        .or_else(|| settings.target.clone())
        .unwrap_or_else(|| MEMORY_TARGET.to_string());

    let catalog = catalog_for(&target, args.output.as_deref())
        .with_metrics(settings.metrics.clone());
    let mut session = PrinterSession::open(&catalog, &target)
        .with_context(|| format!("failed to open printer '{target}'"))?
        .with_metrics(settings.metrics.clone());
    session.set_page_size(settings.paper.width_mm, settings.paper.height_mm);
    debug!("demo page: {:?}", session.page_config());

    let logo = match &args.logo {
        Some(path) => load_logo(path)?,
        None => placeholder_logo(),
    };
    build_sample_receipt(&mut session, logo);

    let summary = session.print().context("failed to print the sample receipt")?;
    report(&target, &summary);
    for job in catalog.drain_jobs() {
        for path in job.written {
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

/// Routes `--output` to the PDF file path or the PNG directory of the chosen target.
fn catalog_for(target: &str, output: Option<&Path>) -> VirtualPrinters {
    let target = target.trim();
    match output {
        Some(path) if target.eq_ignore_ascii_case(PDF_TARGET) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            VirtualPrinters::new(dir).with_pdf_path(path)
        }
        Some(path) if target.eq_ignore_ascii_case(PNG_TARGET) => VirtualPrinters::new(path),
        _ => VirtualPrinters::new("."),
    }
}

fn load_logo(path: &Path) -> Result<ImageHandle> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode logo {}", path.display()))?;
    Ok(image.to_rgba8().into())
}

fn placeholder_logo() -> ImageHandle {
    let image = RgbaImage::from_fn(96, 32, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    ImageHandle::from(image)
}

fn build_sample_receipt(session: &mut PrinterSession<VirtualPrinter>, logo: ImageHandle) {
    let title = || {
        TextOptions::default()
            .font(FontSize::Large)
            .align(Alignment::Center)
    };
    let right = || TextOptions::default().align(Alignment::Far);
    let half = || TextOptions::default().offset(0.5);

    session
        .new_line()
        .print_image(logo, Alignment::Center)
        .new_line()
        .new_line()
        .print_text("Fresh Market", title())
        .new_line()
        .new_line()
        .print_text("Order: XD000269", TextOptions::default())
        .print_text("Serial: 000269", half())
        .new_line()
        .print_text("Cashier: ***", TextOptions::default())
        .print_text("Lane: 3", half())
        .new_line()
        .print_text("Member card: 001", TextOptions::default())
        .new_line()
        .print_solid_line()
        .new_line()
        .print_text("Item", TextOptions::default())
        .print_text("Price", TextOptions::default().offset(0.35))
        .print_text("Qty", TextOptions::default().offset(0.65))
        .print_text("Total", right())
        .new_line()
        .print_text("Celery", TextOptions::default().width(0.35))
        .print_text("2.9", TextOptions::default().width(0.2).offset(0.35))
        .print_text("1", TextOptions::default().width(0.2).offset(0.65))
        .print_text("2.9", right())
        .new_line()
        .print_dotted_line()
        .new_line()
        .print_text("Sum", TextOptions::default())
        .print_text("1", TextOptions::default().offset(0.65))
        .print_text("2.90", right())
        .new_line()
        .print_text("Discount", TextOptions::default())
        .print_text("-0.00", right())
        .new_line()
        .print_text("Due: 2.90", TextOptions::default())
        .print_text("Paid: 5.00", half())
        .new_line()
        .print_text("Change: 2.10", TextOptions::default())
        .new_line()
        .print_dotted_line()
        .new_line()
        .print_text("Points earned: 3", TextOptions::default())
        .print_text("Balance: 43.87", half())
        .new_line()
        .print_solid_line()
        .new_line()
        .print_text("Fresh Market", title())
        .new_line()
        .print_text("Thanks for shopping with us!", title())
        .new_line();
}

fn report(target: &str, summary: &PrintSummary) {
    println!(
        "Printed {} command(s) on {} page(s) to {target}",
        summary.commands, summary.pages
    );
    println!("Page size: {} ({})", summary.page_size, summary.mode);
}
