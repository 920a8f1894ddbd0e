//! pdfdiff: compare two documents page by page.
//!
//! Renders or loads the pages of two documents, highlights the regions
//! whose pixels differ, and compares the page text. Three subcommands:
//!
//! - `images`: one pair of raster images, with per-stage diagnostics and
//!   optional heat map / mask / box outputs. Useful for tuning the
//!   threshold, area, and padding parameters.
//! - `pages`: two directories of pre-rendered pages (`page_<N>.png` plus
//!   optional `.txt` / `.json` text sidecars), producing an HTML and/or
//!   JSON report.
//! - `pdf`: two PDF files rendered with PDFium (`pdfium` feature).
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pdfdiff -- pages old/ new/ --html report.html
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `pdfdiff=info,pdfdiff_core=info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod directory;
#[cfg(feature = "pdfium")]
mod pdf;

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use pdfdiff_core::diagnostics::{Clock, OverlayDiagnostics, compute_overlay_with_diagnostics};
use pdfdiff_core::{
    Comparison, DiffSettings, DiffSettingsParams, DifferenceKind, DocumentSummary, PageDiffResult,
    PageSource, Preset, ReportAssembler, RgbImage, RunSummary,
};
use pdfdiff_export::{HtmlReport, ReportMetadata, encode_png, themed_mask_png};

use crate::directory::DirectorySource;

/// Compare two documents page by page.
///
/// Highlights regions whose pixels differ and reports how similar the
/// page texts are.
#[derive(Parser)]
#[command(name = "pdfdiff", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare two raster images and print per-stage diagnostics.
    Images(ImagesArgs),
    /// Compare two directories of pre-rendered pages.
    Pages(DocumentArgs),
    /// Compare two PDF files rendered with PDFium.
    #[cfg(feature = "pdfium")]
    Pdf(DocumentArgs),
}

/// Comparison settings: a preset plus per-field overrides.
#[derive(Args)]
struct SettingsArgs {
    /// Settings preset the overrides apply to.
    #[arg(long, value_enum, default_value_t = PresetArg::Standard)]
    preset: PresetArg,

    /// Render resolution in dots per inch (72-600).
    #[arg(long)]
    dpi: Option<u32>,

    /// Minimum grayscale delta counted as a difference (0-255).
    #[arg(long)]
    pixel_threshold: Option<u32>,

    /// Boxes with a smaller corner-distance area are dropped.
    #[arg(long)]
    min_box_area: Option<u32>,

    /// Boxes within this many pixels of each other are merged.
    #[arg(long)]
    merge_padding: Option<u32>,

    /// Gaussian blur radius applied to rendered pages (0 disables).
    #[arg(long)]
    blur_radius: Option<f32>,

    /// Fraction of page height at the top ignored by text comparison.
    #[arg(long)]
    header_ignore: Option<f64>,

    /// Fraction of page height at the bottom ignored by text comparison.
    #[arg(long)]
    footer_ignore: Option<f64>,

    /// Longest rendered side in pixels.
    #[arg(long)]
    max_image_side: Option<u32>,

    /// Pages with text similarity below this are flagged.
    #[arg(long)]
    similarity_warn: Option<f64>,

    /// How per-pixel color deltas are reduced to one magnitude.
    #[arg(long, value_enum)]
    difference: Option<DifferenceArg>,

    /// Seed scan stride of the component extractor.
    #[arg(long)]
    stride: Option<u32>,

    /// Full settings as a JSON string.
    ///
    /// When provided, the preset and all override flags are ignored.
    /// Missing fields take the standard preset's values.
    #[arg(long)]
    config_json: Option<String>,
}

/// Settings preset selection.
#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Balanced detection.
    Standard,
    /// Picks up subtle layout changes.
    High,
    /// Marks only obvious changes.
    Low,
}

/// Delta reduction selection.
#[derive(Clone, Copy, ValueEnum)]
enum DifferenceArg {
    /// Luminance of the per-channel difference.
    ChannelLuma,
    /// Difference of the two luminances.
    LumaDelta,
}

#[derive(Args)]
struct ImagesArgs {
    /// First (reference) image.
    a: PathBuf,

    /// Second (revised) image; the overlay is drawn on it.
    b: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Write the overlay PNG to this file.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Write the grayscale difference heat map PNG to this file.
    #[arg(long)]
    heat_map: Option<PathBuf>,

    /// Write the thresholded mask PNG to this file.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Write the final boxes as JSON to this file.
    #[arg(long)]
    boxes: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DocumentArgs {
    /// First (reference) document.
    a: PathBuf,

    /// Second (revised) document.
    b: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    /// HTML report path [default: diff_report_<A>_vs_<B>.html].
    #[arg(long)]
    html: Option<PathBuf>,

    /// Skip the HTML report.
    #[arg(long, conflicts_with = "html")]
    no_html: bool,

    /// Write the document summary as JSON to this file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write each page's overlay PNG into this directory.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Compare pages concurrently in batches.
    #[cfg(feature = "parallel")]
    #[arg(long)]
    parallel: bool,
}

/// Build [`DiffSettings`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// other flags are ignored. Otherwise the preset is taken and each
/// given override applied before validation.
fn settings_from_cli(args: &SettingsArgs) -> Result<DiffSettings, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let preset = match args.preset {
        PresetArg::Standard => Preset::Standard,
        PresetArg::High => Preset::HighSensitivity,
        PresetArg::Low => Preset::LowSensitivity,
    };
    let base = preset.settings().to_params();
    let params = DiffSettingsParams {
        dpi: args.dpi.unwrap_or(base.dpi),
        pixel_threshold: args.pixel_threshold.unwrap_or(base.pixel_threshold),
        min_box_area: args.min_box_area.unwrap_or(base.min_box_area),
        merge_padding: args.merge_padding.unwrap_or(base.merge_padding),
        blur_radius: args.blur_radius.unwrap_or(base.blur_radius),
        header_ignore_ratio: args.header_ignore.unwrap_or(base.header_ignore_ratio),
        footer_ignore_ratio: args.footer_ignore.unwrap_or(base.footer_ignore_ratio),
        max_image_side: args.max_image_side.unwrap_or(base.max_image_side),
        text_similarity_warn: args.similarity_warn.unwrap_or(base.text_similarity_warn),
        difference: args.difference.map_or(base.difference, |d| match d {
            DifferenceArg::ChannelLuma => DifferenceKind::ChannelLuma,
            DifferenceArg::LumaDelta => DifferenceKind::LumaDelta,
        }),
        stride: args.stride.unwrap_or(base.stride),
    };
    DiffSettings::try_from(params).map_err(|e| format!("Invalid settings: {e}"))
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Images(args) => run_images(&args),
        Command::Pages(args) => run_pages(&args),
        #[cfg(feature = "pdfium")]
        Command::Pdf(args) => run_pdf(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default
/// filter.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format().with_target(false).compact();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdfdiff=info,pdfdiff_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).event_format(format))
        .with(filter)
        .init();
}

// ─────────────────────────────── images ───────────────────────────────

/// Load a raster and prepare it the way rendered pages are prepared.
fn load_image(path: &Path, settings: &DiffSettings) -> Result<RgbImage, String> {
    let image = image::open(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?
        .to_rgb8();
    let image = pdfdiff_core::source::fit_to_max_side(image, settings.max_image_side());
    Ok(pdfdiff_core::blur::gaussian_blur_rgb(&image, settings.blur_radius()))
}

fn write_file(path: &Path, bytes: &[u8], what: &str) -> Result<(), String> {
    std::fs::write(path, bytes)
        .map_err(|e| format!("Error writing {what} to {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "{what} written");
    Ok(())
}

fn run_images(args: &ImagesArgs) -> Result<(), String> {
    let settings = settings_from_cli(&args.settings)?;
    let a = load_image(&args.a, &settings)?;
    let b = load_image(&args.b, &settings)?;
    let params = settings.overlay_params();

    tracing::info!(
        a = %args.a.display(),
        b = %args.b.display(),
        runs = args.runs,
        "comparing images"
    );
    tracing::debug!(?params, "overlay parameters");

    let mut all_diagnostics = Vec::with_capacity(args.runs);
    for run in 0..args.runs {
        if args.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, args.runs);
        }

        let (staged, diagnostics) =
            compute_overlay_with_diagnostics(a.clone(), b.clone(), params, &StdClock);

        if args.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        // Write outputs on the first run only.
        if run == 0 {
            if let Some(ref path) = args.output {
                let png = encode_png(&staged.overlay).map_err(|e| e.to_string())?;
                write_file(path, &png, "overlay")?;
            }
            if let Some(ref path) = args.heat_map {
                let png = encode_png(&staged.heat_map).map_err(|e| e.to_string())?;
                write_file(path, &png, "heat map")?;
            }
            if let Some(ref path) = args.mask {
                let png = themed_mask_png(staged.mask.as_image(), [255, 255, 255], [220, 0, 0])
                    .map_err(|e| e.to_string())?;
                write_file(path, &png, "mask")?;
            }
            if let Some(ref path) = args.boxes {
                let json = serde_json::to_string_pretty(&staged.boxes)
                    .map_err(|e| format!("Error serializing boxes: {e}"))?;
                write_file(path, json.as_bytes(), "boxes")?;
            }
        }

        all_diagnostics.push(diagnostics);
        if args.runs > 1 {
            eprintln!();
        }
    }

    if args.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Min / mean / max in milliseconds.
#[allow(clippy::cast_precision_loss)]
fn spread(samples: impl Iterator<Item = Duration>) -> (f64, f64, f64) {
    let (mut min, mut max, mut sum, mut n) = (f64::INFINITY, 0.0_f64, 0.0, 0_usize);
    for ms in samples.map(|d| d.as_secs_f64() * 1000.0) {
        min = min.min(ms);
        max = max.max(ms);
        sum += ms;
        n += 1;
    }
    if n == 0 {
        return (0.0, 0.0, 0.0);
    }
    (min, sum / n as f64, max)
}

/// Timing spread per stage over repeated runs of the same pair.
fn print_multi_run_summary(all_diagnostics: &[OverlayDiagnostics]) {
    let Some(first) = all_diagnostics.first() else {
        return;
    };
    println!();
    println!("{} runs        min (ms)  mean (ms)   max (ms)", all_diagnostics.len());
    for (index, (name, _)) in first.stages().into_iter().enumerate() {
        let (min, mean, max) = spread(all_diagnostics.iter().map(|d| d.stages()[index].1.duration));
        println!("  {name:<12} {min:>9.3} {mean:>10.3} {max:>10.3}");
    }
    let (min, mean, max) = spread(all_diagnostics.iter().map(|d| d.total_duration));
    println!("  {:<12} {min:>9.3} {mean:>10.3} {max:>10.3}", "total");
}

// ───────────────────────────── documents ──────────────────────────────

/// Display name of a document path: its final component.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// `diff_report_<A>_vs_<B>.html`, from the file stems of both documents.
fn default_report_path(a: &Path, b: &Path) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .map_or_else(|| "document".to_owned(), |s| s.to_string_lossy().into_owned())
    };
    PathBuf::from(format!("diff_report_{}_vs_{}.html", stem(a), stem(b)))
}

/// Collects page results into the requested outputs as they stream in.
struct ReportWriter {
    html: Option<(PathBuf, HtmlReport)>,
    assembler: ReportAssembler,
    overlay_dir: Option<PathBuf>,
    error: Option<String>,
}

impl ReportWriter {
    fn new(args: &DocumentArgs, settings: &DiffSettings) -> Result<Self, String> {
        let warn = settings.text_similarity_warn();
        let html = (!args.no_html).then(|| {
            let path = args
                .html
                .clone()
                .unwrap_or_else(|| default_report_path(&args.a, &args.b));
            let metadata = ReportMetadata {
                name_a: display_name(&args.a),
                name_b: display_name(&args.b),
                generated_at: Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            };
            (path, HtmlReport::new(metadata, warn))
        });
        if let Some(ref dir) = args.overlay_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
        }
        Ok(Self {
            html,
            assembler: ReportAssembler::new(warn),
            overlay_dir: args.overlay_dir.clone(),
            error: None,
        })
    }

    /// Sink for [`Comparison::run`]; stops the run on the first write
    /// failure.
    fn accept(&mut self, page: &PageDiffResult) -> ControlFlow<()> {
        match self.record(page) {
            Ok(()) => ControlFlow::Continue(()),
            Err(msg) => {
                self.error = Some(msg);
                ControlFlow::Break(())
            }
        }
    }

    fn record(&mut self, page: &PageDiffResult) -> Result<(), String> {
        if let Some((_, html)) = &mut self.html {
            html.add_page(page)
                .map_err(|e| format!("Error encoding page {}: {e}", page.page_number()))?;
        }
        if let Some(ref dir) = self.overlay_dir {
            let png = encode_png(&page.overlay)
                .map_err(|e| format!("Error encoding page {}: {e}", page.page_number()))?;
            let path = dir.join(format!("overlay_page_{:04}.png", page.page_number()));
            std::fs::write(&path, png)
                .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        }
        self.assembler.push(page);
        Ok(())
    }

    fn finish(self, run: RunSummary, json: Option<&Path>) -> Result<(), String> {
        if let Some(msg) = self.error {
            return Err(msg);
        }
        let summary = self.assembler.finish();

        if let Some((path, html)) = self.html {
            write_file(&path, html.render(&summary).as_bytes(), "HTML report")?;
        }
        if let Some(path) = json {
            let text = serde_json::to_string_pretty(&summary)
                .map_err(|e| format!("Error serializing summary: {e}"))?;
            write_file(path, text.as_bytes(), "JSON summary")?;
        }

        print_document_summary(&summary, run);
        Ok(())
    }
}

fn print_document_summary(summary: &DocumentSummary, run: RunSummary) {
    println!("Pages compared:         {}/{}", run.pages_compared, run.pages_total);
    println!("Overall similarity:     {:.4}", summary.overall_similarity);
    let low: Vec<String> = summary.low_pages.iter().map(ToString::to_string).collect();
    if low.is_empty() {
        println!("Low-similarity pages:   0");
    } else {
        println!("Low-similarity pages:   {} ({})", low.len(), low.join(", "));
    }
    println!("Total difference boxes: {}", summary.total_boxes);
    if !summary.degraded_pages.is_empty() {
        let pages: Vec<String> = summary.degraded_pages.iter().map(ToString::to_string).collect();
        println!("Pages with substitutes: {}", pages.join(", "));
    }
}

/// Run the comparison sequentially and write the requested outputs.
fn compare_documents<A: PageSource, B: PageSource>(
    args: &DocumentArgs,
    settings: DiffSettings,
    a: A,
    b: B,
) -> Result<(), String> {
    let mut writer = ReportWriter::new(args, &settings)?;
    let run = Comparison::new(settings, a, b).run(|page| writer.accept(&page));
    writer.finish(run, args.json.as_deref())
}

fn run_pages(args: &DocumentArgs) -> Result<(), String> {
    let settings = settings_from_cli(&args.settings)?;
    let open = |path: &Path| {
        DirectorySource::open(path).map_err(|e| format!("Error reading {}: {e}", path.display()))
    };
    let a = open(&args.a)?;
    let b = open(&args.b)?;
    tracing::info!(
        a = %a.root().display(),
        b = %b.root().display(),
        "comparing page directories"
    );

    compare_page_dirs(args, settings, &a, &b)
}

#[cfg(feature = "parallel")]
fn compare_page_dirs(
    args: &DocumentArgs,
    settings: DiffSettings,
    a: &DirectorySource,
    b: &DirectorySource,
) -> Result<(), String> {
    if !args.parallel {
        return compare_documents(args, settings, a, b);
    }
    let mut writer = ReportWriter::new(args, &settings)?;
    let run = Comparison::new(settings, a, b).run_parallel(|page| writer.accept(&page));
    writer.finish(run, args.json.as_deref())
}

#[cfg(not(feature = "parallel"))]
fn compare_page_dirs(
    args: &DocumentArgs,
    settings: DiffSettings,
    a: &DirectorySource,
    b: &DirectorySource,
) -> Result<(), String> {
    compare_documents(args, settings, a, b)
}

#[cfg(feature = "pdfium")]
fn run_pdf(args: &DocumentArgs) -> Result<(), String> {
    let settings = settings_from_cli(&args.settings)?;
    let pdfium = pdf::bind_pdfium().map_err(|e| e.to_string())?;
    let a = pdf::PdfiumSource::open(&pdfium, &args.a).map_err(|e| e.to_string())?;
    let b = pdf::PdfiumSource::open(&pdfium, &args.b).map_err(|e| e.to_string())?;
    tracing::info!(a = %args.a.display(), b = %args.b.display(), "comparing PDFs");
    compare_documents(args, settings, &a, &b)
}
