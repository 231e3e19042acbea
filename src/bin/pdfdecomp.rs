//! Debug binary for pdf-decomposer.
//!
//! Runs only the decomposer against a PDF (and optionally an answer-key PDF)
//! and reports which image blocks were produced, how vector fragments were
//! consumed and every recovered failure. Useful for tuning
//! `--proximity` and `--min-area` on a document corpus.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_decomposer::{
    build_user_parts, export_images, Block, DecomposeConfig, DecomposeProgressCallback,
    DecomposedDocument, Decomposer, PageSelection, PageWarning, ProgressCallback, PromptOptions,
    RasterStatus, TextOverlapPolicy, DEFAULT_SYSTEM_PROMPT,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new(label: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix(label.to_string());
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl DecomposeProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_blocks: usize, image_blocks: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_blocks:>4} text  {image_blocks:>3} images")),
        ));
        self.bar.inc(1);
    }

    fn on_page_warning(&self, _page_num: usize, warning: &PageWarning) {
        self.bar.println(format!("  {} {}", red("✗"), red(&warning.to_string())));
    }

    fn on_document_complete(&self, total_pages: usize, warning_count: usize) {
        self.bar.finish_and_clear();
        if warning_count == 0 {
            eprintln!("{} {} pages decomposed", green("✔"), bold(&total_pages.to_string()));
        } else {
            eprintln!(
                "{} {} pages decomposed  ({} warnings)",
                cyan("⚠"),
                bold(&total_pages.to_string()),
                red(&warning_count.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Report image blocks found in a PDF
  pdfdecomp paper.pdf

  # Also write every image to paper_debug/
  pdfdecomp --write-images paper.pdf

  # Tune clustering
  pdfdecomp --proximity 4 --min-area 1500 --pages 3-5 paper.pdf

  # Exam and its answer key, decomposed independently
  pdfdecomp exam.pdf --answer-key exam-key.pdf --out-dir ./debug

  # Full structured output
  pdfdecomp --json paper.pdf > blocks.json

  # Print the chat-completions messages that would be sent to a model
  pdfdecomp --prompt "Describe the PDF." paper.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Override the log filter (e.g. pdf_decomposer=debug)
  PDFDECOMP_*             Every flag also reads its PDFDECOMP_ variable
"#;

/// Decompose PDF pages into ordered text and image blocks.
#[derive(Parser, Debug)]
#[command(
    name = "pdfdecomp",
    version,
    about = "Decompose PDF pages into ordered text and image blocks (debug view)",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to decompose.
    input: PathBuf,

    /// Second PDF decomposed the same way, independently.
    #[arg(long, env = "PDFDECOMP_ANSWER_KEY")]
    answer_key: Option<PathBuf>,

    /// Write images into this directory (implies --write-images).
    #[arg(short, long, env = "PDFDECOMP_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Write images into `{stem}_debug/` in the current directory.
    #[arg(short, long, env = "PDFDECOMP_WRITE_IMAGES")]
    write_images: bool,

    /// Render resolution for image blocks.
    #[arg(long, env = "PDFDECOMP_DPI", default_value_t = 144.0)]
    dpi: f32,

    /// Max per-axis gap (page units) between fragments of one picture.
    #[arg(long, env = "PDFDECOMP_PROXIMITY", default_value_t = 6.0)]
    proximity: f32,

    /// Minimum union area (page units²) for a fragment cluster.
    #[arg(long, env = "PDFDECOMP_MIN_AREA", default_value_t = 2000.0)]
    min_area: f32,

    /// Fraction of a text box inside an image before it counts as inside.
    #[arg(long, env = "PDFDECOMP_TEXT_OVERLAP", default_value_t = 0.5)]
    text_overlap: f32,

    /// Max overlap ratio allowed between two image blocks before merging.
    #[arg(long, env = "PDFDECOMP_IMAGE_OVERLAP", default_value_t = 0.0)]
    image_overlap: f32,

    /// Keep text that lies inside images instead of suppressing it.
    #[arg(long, env = "PDFDECOMP_KEEP_OVERLAPPING_TEXT")]
    keep_overlapping_text: bool,

    /// Padding (page units) rendered around each image region.
    #[arg(long, env = "PDFDECOMP_PADDING", default_value_t = 0.0)]
    padding: f32,

    /// Drop embedded rasters placed on less than this area.
    #[arg(long, env = "PDFDECOMP_MIN_RASTER_AREA", default_value_t = 0.0)]
    min_raster_area: f32,

    /// Keep only the N largest image blocks per page.
    #[arg(long, env = "PDFDECOMP_MAX_IMAGES_PER_PAGE")]
    max_images_per_page: Option<usize>,

    /// Keep only N image blocks across the whole document, earliest pages first.
    #[arg(long, env = "PDFDECOMP_MAX_IMAGES_TOTAL")]
    max_images_total: Option<usize>,

    /// Downscale images whose longest edge exceeds this many pixels.
    #[arg(long, env = "PDFDECOMP_MAX_IMAGE_DIM")]
    max_image_dim: Option<u32>,

    /// Cap on the longest edge of a full-page render.
    #[arg(long, env = "PDFDECOMP_MAX_RENDERED_PIXELS", default_value_t = 8000)]
    max_rendered_pixels: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDFDECOMP_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFDECOMP_PASSWORD")]
    password: Option<String>,

    /// Output the decomposed document(s) as JSON instead of the report.
    #[arg(long, env = "PDFDECOMP_JSON")]
    json: bool,

    /// Print the chat messages (system + multimodal user turn) for this instruction.
    #[arg(long, env = "PDFDECOMP_PROMPT")]
    prompt: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "PDFDECOMP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFDECOMP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFDECOMP_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let machine_output = cli.json || cli.prompt.is_some();
    let show_progress = !cli.quiet && !cli.no_progress && !machine_output;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let decomposer = Decomposer::new().context("Failed to initialise pdfium")?;

    let mut inputs = vec![("Document", cli.input.clone())];
    if let Some(ref key) = cli.answer_key {
        inputs.push(("Answer key", key.clone()));
    }

    let mut results = Vec::with_capacity(inputs.len());
    for (label, path) in &inputs {
        let progress: Option<ProgressCallback> = if show_progress {
            Some(CliProgressCallback::new(label) as Arc<dyn DecomposeProgressCallback>)
        } else {
            None
        };
        let config = build_config(&cli, progress)?;
        let doc = decomposer
            .decompose(path, &config)
            .with_context(|| format!("Failed to decompose {}", path.display()))?;
        results.push((*label, doc));
    }

    // ── Machine-readable output ──────────────────────────────────────────
    if let Some(ref instruction) = cli.prompt {
        let options = PromptOptions::default();
        let messages: Vec<serde_json::Value> = results
            .iter()
            .map(|(_, doc)| {
                serde_json::json!([
                    { "role": "system", "content": DEFAULT_SYSTEM_PROMPT },
                    { "role": "user", "content": build_user_parts(doc, instruction, &options) },
                ])
            })
            .collect();
        let out = if messages.len() == 1 {
            messages[0].clone()
        } else {
            serde_json::Value::Array(messages)
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise prompt")?
        );
    } else if cli.json {
        let out = if results.len() == 1 {
            serde_json::to_value(&results[0].1)
        } else {
            serde_json::to_value(serde_json::json!({
                "document": &results[0].1,
                "answer_key": &results[1].1,
            }))
        }
        .context("Failed to serialise output")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        for (label, doc) in &results {
            print_report(label, doc);
        }
    }

    // ── Image export ─────────────────────────────────────────────────────
    if cli.write_images || cli.out_dir.is_some() {
        for (_, doc) in &results {
            let stem = file_stem(&doc.source);
            let dir = cli
                .out_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{stem}_debug")));
            let written = export_images(doc, &dir, &stem)
                .with_context(|| format!("Failed to write images to {}", dir.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} Wrote {} image(s) to: {}",
                    green("✔"),
                    written.len(),
                    bold(&dir.display().to_string())
                );
            }
        }
    }

    Ok(())
}

/// Print the per-image report of one document to stdout.
fn print_report(label: &str, doc: &DecomposedDocument) {
    println!(
        "{} {}: {} ({} page(s), {} selected)",
        cyan("◆"),
        bold(label),
        doc.source.display(),
        doc.page_count,
        doc.pages.len()
    );

    for page in &doc.pages {
        let images: Vec<(usize, &Block)> = page
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_image())
            .collect();
        let f = &page.fragments;
        println!(
            "  Page {:>3}  {} text  {} images  {}",
            page.number(),
            page.texts().count(),
            images.len(),
            dim(&format!(
                "fragments: {} total, {} clustered, {} anchored, {} discarded",
                f.total, f.clustered, f.anchored, f.discarded
            )),
        );
        for (block_idx, block) in images {
            let Block::Image(img) = block else { continue };
            let status = match &img.status {
                RasterStatus::Rendered => green("rendered"),
                RasterStatus::Failed { reason } => red(&format!("failed: {reason}")),
            };
            println!(
                "    block {:>3}  {:<7} {}  {}x{} px @ {:.0} DPI  {:>8} B  {}",
                block_idx,
                img.origin.label(),
                img.bbox,
                img.width_px,
                img.height_px,
                img.dpi,
                img.data.len(),
                status
            );
        }
    }

    let warnings: Vec<&PageWarning> = doc.warnings().collect();
    if !warnings.is_empty() {
        println!("  {} {} warning(s):", red("✗"), warnings.len());
        for w in warnings {
            println!("    {}", red(&w.to_string()));
        }
    }

    let s = &doc.stats;
    println!(
        "  {} pages, {} text blocks, {} images ({} failed), {}ms",
        s.decomposed_pages + s.failed_pages,
        s.text_blocks,
        s.image_blocks,
        s.failed_images,
        s.duration_ms
    );
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Map CLI args to `DecomposeConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DecomposeConfig> {
    let pages = parse_pages(&cli.pages)?;
    let policy = if cli.keep_overlapping_text {
        TextOverlapPolicy::Keep
    } else {
        TextOverlapPolicy::Suppress
    };

    let mut builder = DecomposeConfig::builder()
        .raster_dpi(cli.dpi)
        .proximity_threshold(cli.proximity)
        .min_fragment_area(cli.min_area)
        .text_image_overlap_tolerance(cli.text_overlap)
        .text_overlap_policy(policy)
        .image_overlap_tolerance(cli.image_overlap)
        .region_padding(cli.padding)
        .min_raster_area(cli.min_raster_area)
        .max_rendered_pixels(cli.max_rendered_pixels)
        .pages(pages);

    if let Some(n) = cli.max_images_per_page {
        builder = builder.max_images_per_page(n);
    }
    if let Some(n) = cli.max_images_total {
        builder = builder.max_images_total(n);
    }
    if let Some(px) = cli.max_image_dim {
        builder = builder.max_image_dim(px);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
