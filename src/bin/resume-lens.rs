//! CLI binary for resume-lens.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs extraction (and optionally entity extraction) and
//! prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use resume_lens::{
    extract_stream, DocumentFormat, EntityReconciler, ExtractionOrchestrator,
    ExtractionProgressCallback, ModelCache, PdfiumBackend, PipelineConfig, ProgressCallback,
    ResumeEntities, TesseractCli, Upload,
};
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

/// Progress bar over a batch of files. Files complete out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total} files…"))
        ));
    }

    fn on_document_complete(&self, _index: usize, _total: usize, file_name: &str, text_len: usize) {
        self.bar.println(format!(
            "  {} {:<40} {}",
            green("✓"),
            file_name,
            dim(&format!("{text_len:>6} chars"))
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, _index: usize, _total: usize, file_name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<40} {}", red("✗"), file_name, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(success_count);
        if failed == 0 {
            eprintln!("{} {} files extracted", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} files extracted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the text of a résumé
  resume-lens cv.pdf

  # Text plus candidate profile as JSON
  resume-lens --entities --json cv.docx > cv.json

  # A folder of uploads, 4 at a time
  resume-lens -c 4 uploads/*.pdf

  # File without a usable extension
  resume-lens --mime text/plain upload.bin

  # Check which engines are usable
  resume-lens --health

SUPPORTED FORMATS:
  .pdf    application/pdf            text layer, OCR when it holds < 200 chars
  .docx   application/vnd.openxmlformats-officedocument.wordprocessingml.document
  .txt    text/plain                 encoding detected automatically

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH          Directory holding libpdfium (default: system library path)
  RESUME_LENS_TESSERACT    tesseract binary (default: tesseract on PATH)
  RUST_LOG                 Log filter, e.g. resume_lens=debug

Entity extraction in the CLI uses the rule-based extractor; no NER model is
bundled.
"#;

#[derive(Parser, Debug)]
#[command(
    name = "resume-lens",
    version,
    about = "Extract text and a candidate profile from résumé files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[arg(required_unless_present = "health")]
    inputs: Vec<PathBuf>,

    /// MIME type for every input. Default: derived from each file extension.
    #[arg(long, env = "RESUME_LENS_MIME")]
    mime: Option<String>,

    /// Also extract skills, titles, companies, education and contacts.
    #[arg(short, long, env = "RESUME_LENS_ENTITIES")]
    entities: bool,

    #[arg(long, env = "RESUME_LENS_JSON")]
    json: bool,

    #[arg(short, long, env = "RESUME_LENS_CONCURRENCY", default_value_t = 3)]
    concurrency: usize,

    #[arg(long, env = "RESUME_LENS_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Digital PDF text shorter than this many characters triggers OCR.
    #[arg(long, env = "RESUME_LENS_OCR_MIN_CHARS", default_value_t = 200)]
    ocr_min_chars: usize,

    #[arg(long, env = "RESUME_LENS_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    #[arg(long, env = "RESUME_LENS_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Largest accepted file in MiB; 0 disables the limit.
    #[arg(long, env = "RESUME_LENS_MAX_SIZE_MB", default_value_t = 10)]
    max_size_mb: u64,

    #[arg(long, env = "RESUME_LENS_NO_PROGRESS")]
    no_progress: bool,

    /// Report NER model and tesseract availability, then exit.
    #[arg(long)]
    health: bool,

    #[arg(short, long, env = "RESUME_LENS_VERBOSE")]
    verbose: bool,

    #[arg(short, long, env = "RESUME_LENS_QUIET")]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig> {
        PipelineConfig::builder()
            .concurrency(self.concurrency)
            .ocr_dpi(self.dpi)
            .ocr_fallback_min_chars(self.ocr_min_chars)
            .ocr_language(self.ocr_lang.clone())
            .tesseract_path(self.tesseract.clone())
            .max_file_size((self.max_size_mb > 0).then(|| self.max_size_mb * 1024 * 1024))
            .build()
            .context("Invalid configuration")
    }

    fn mime_for(&self, path: &std::path::Path) -> Result<String> {
        if let Some(ref mime) = self.mime {
            return Ok(mime.clone());
        }
        let name = path.to_string_lossy();
        match DocumentFormat::from_extension(&name) {
            Some(format) => Ok(format.mime_type().to_string()),
            None => bail!(
                "Cannot tell the format of {} from its extension; pass --mime",
                path.display()
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inputs.len() > 1;
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

    let config = cli.config()?;
    let models = ModelCache::rules_only().context("Failed to load skills dictionary")?;

    if cli.health {
        let status = models.health_check().await;
        let tesseract = TesseractCli::new(cli.tesseract.clone()).is_available();
        let report = json!({ "ner": status, "tesseract_available": tesseract });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let pdfium = match cli.pdfium_lib {
        Some(ref dir) => PdfiumBackend::with_library_dir(dir.clone()),
        None => PdfiumBackend::new(),
    };
    let engine = TesseractCli::new(config.tesseract_path.clone());
    let reconciler = EntityReconciler::new(&models, &config);
    let orchestrator = ExtractionOrchestrator::with_backends(config, Arc::new(pdfium), Arc::new(engine));

    // ── Read inputs ──────────────────────────────────────────────────────
    let mut uploads = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let mime = cli.mime_for(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        uploads.push(Upload::new(bytes, file_name, mime));
    }
    let total = uploads.len();

    // ── Extract ──────────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };
    let mut items: Vec<_> = extract_stream(&orchestrator, uploads, progress).collect().await;
    items.sort_by_key(|item| item.index);

    // ── Output ───────────────────────────────────────────────────────────
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut reports = Vec::with_capacity(total);
    let mut failed = 0usize;

    for item in items {
        let doc = match item.result {
            Ok(doc) => doc,
            Err(e) => {
                failed += 1;
                if cli.json {
                    reports.push(json!({ "file_name": item.file_name, "error": e.to_string(), "stage": e.stage() }));
                } else {
                    eprintln!("{} {}: {}", red("✗"), item.file_name, e);
                }
                continue;
            }
        };

        let entities: Option<ResumeEntities> = if cli.entities {
            match reconciler.extract(doc.text()).await {
                Ok(entities) => Some(entities),
                Err(e) => {
                    failed += 1;
                    eprintln!("{} {}: {}", red("✗"), item.file_name, e);
                    None
                }
            }
        } else {
            None
        };

        if cli.json {
            reports.push(json!({ "file_name": item.file_name, "document": doc, "entities": entities }));
            continue;
        }

        if total > 1 {
            writeln!(out, "==> {} <==", item.file_name)?;
        }
        writeln!(
            out,
            "{}",
            dim(&format!(
                "[{} · confidence {:.2} · {} bytes]",
                doc.processing_method(),
                doc.confidence_score(),
                doc.file_size()
            ))
        )?;
        writeln!(out, "{}", doc.text())?;
        if let Some(entities) = entities {
            writeln!(out)?;
            print_entities(&mut out, &entities)?;
        }
        if total > 1 {
            writeln!(out)?;
        }
    }

    if cli.json {
        let value = if total == 1 && reports.len() == 1 {
            reports.remove(0)
        } else {
            serde_json::Value::Array(reports)
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    }
    out.flush()?;

    if failed > 0 {
        bail!("{failed} of {total} files failed");
    }
    Ok(())
}

fn print_entities(out: &mut impl Write, entities: &ResumeEntities) -> io::Result<()> {
    writeln!(out, "{}", bold(&format!("Profile ({:?})", entities.extraction_method)))?;
    let lists = [
        ("Skills", &entities.skills),
        ("Job titles", &entities.job_titles),
        ("Companies", &entities.companies),
        ("Education", &entities.education),
    ];
    for (label, values) in lists {
        if !values.is_empty() {
            writeln!(out, "  {:<12} {}", label, values.join(", "))?;
        }
    }
    for (field, value) in &entities.contact_info {
        writeln!(out, "  {:<12} {}", format!("{field:?}"), value)?;
    }
    if let Some(years) = entities.experience_years {
        writeln!(out, "  {:<12} {}", "Experience", years)?;
    }
    Ok(())
}
