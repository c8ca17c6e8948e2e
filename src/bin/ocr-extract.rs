//! CLI binary for ocr-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` / `VlmSettings`, loads the capabilities once and prints
//! the result as plain text or as the JSON response envelope.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use ocr_extract::document::mime_from_path;
use ocr_extract::{
    Capabilities, ConverterResponse, DocumentKind, ExtractResponse, ExtractionConfig,
    ExtractionProgressCallback, Extractor, FileInfo, PdfRasterizer, PdfiumRasterizer,
    ProgressCallback, RawDocument, VlmConverter, VlmSettings,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per recognised page. Pages may
/// complete out of order when `--page-concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Decoding document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Recognising");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, region_count: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{region_count:>4} regions")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, pages_processed: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} page(s) recognised",
            green("✔"),
            bold(&pages_processed.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a scanned PDF (needs the `ocrs` feature and downloaded models)
  ocr-extract --engine ocr passport.pdf

  # Same, as the JSON response envelope
  ocr-extract --engine ocr --json receipt.jpg

  # Convert to markdown with a vision LLM, print the flattened text
  ocr-extract --engine vlm --provider openai --model gpt-4.1-nano form.pdf

  # Force the MIME type when the extension is misleading
  ocr-extract --mime image/png upload.bin

ENVIRONMENT VARIABLES:
  OCR_MAX_FILE_SIZE_MB    Upload size limit (default 10)
  OCR_MAX_PDF_PAGES       Leading PDF pages processed (default 10)
  OCR_LANGUAGES           Comma-separated recognizer languages (default fr,en)
  PDFIUM_LIB_DIR          Directory containing libpdfium (else system library)
  OCRS_MODEL_DIR          Directory with text-detection.rten / text-recognition.rten
  EDGEQUAKE_LLM_PROVIDER  VLM provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         VLM model ID
  OPENAI_API_KEY          Used when no provider is named
  RUST_LOG                Overrides -v / -vv
"#;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Engine {
    /// Text recognizer: text + confidence + language.
    Ocr,
    /// Vision-LLM converter: markdown + flattened text.
    Vlm,
}

/// Extract text, confidence and language from images and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-extract",
    version,
    about = "Extract text, confidence and language from images and PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image (JPEG, PNG, WEBP) or PDF file.
    file: PathBuf,

    /// Extraction engine.
    #[arg(long, value_enum, env = "OCR_ENGINE", default_value = "ocr")]
    engine: Engine,

    /// Declared MIME type; inferred from the file extension when omitted.
    #[arg(long)]
    mime: Option<String>,

    /// Print the JSON response envelope instead of plain text.
    #[arg(long)]
    json: bool,

    /// Upload size limit in megabytes.
    #[arg(long, env = "OCR_MAX_FILE_SIZE_MB", default_value_t = 10)]
    max_file_size_mb: u64,

    /// Leading PDF pages processed.
    #[arg(long, env = "OCR_MAX_PDF_PAGES", default_value_t = 10)]
    max_pdf_pages: usize,

    /// Languages the recognizer is initialised for.
    #[arg(long, env = "OCR_LANGUAGES", value_delimiter = ',', default_value = "fr,en")]
    languages: Vec<String>,

    /// Longest page edge before recognition, in pixels.
    #[arg(long, env = "OCR_MAX_IMAGE_DIMENSION", default_value_t = 2000)]
    max_image_dimension: u32,

    /// Pages recognised concurrently.
    #[arg(long, env = "OCR_PAGE_CONCURRENCY", default_value_t = 4)]
    page_concurrency: usize,

    /// Directory containing libpdfium; the system library is used otherwise.
    #[arg(long, env = "PDFIUM_LIB_DIR")]
    pdfium_lib_dir: Option<PathBuf>,

    /// Directory with the ocrs detection and recognition models.
    #[arg(long, env = "OCRS_MODEL_DIR")]
    ocrs_model_dir: Option<PathBuf>,

    /// VLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// VLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Retries per page on VLM failure.
    #[arg(long, env = "OCR_VLM_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// -v for INFO logs, -vv for DEBUG.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load document ────────────────────────────────────────────────────
    let document = read_document(&cli.file, cli.mime.as_deref()).await?;

    let show_progress = !cli.json && !cli.no_progress && cli.verbose == 0;
    let progress_cb: Option<ProgressCallback> = if show_progress && cli.engine == Engine::Ocr {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder()
        .max_file_size_mb(cli.max_file_size_mb)
        .max_pdf_pages(cli.max_pdf_pages)
        .ocr_languages(cli.languages.iter().cloned())
        .max_image_dimension(cli.max_image_dimension)
        .page_concurrency(cli.page_concurrency);
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // Reject before loading any model.
    document
        .validate(&config)
        .with_context(|| format!("Cannot process {}", cli.file.display()))?;

    // ── Capabilities ─────────────────────────────────────────────────────
    let rasterizer: Option<Arc<dyn PdfRasterizer>> = if document.kind() == DocumentKind::Pdf {
        let r = tokio::task::block_in_place(|| PdfiumRasterizer::new(cli.pdfium_lib_dir.clone()))
            .context("Failed to load pdfium")?;
        Some(Arc::new(r))
    } else {
        None
    };

    let mut capabilities = Capabilities::builder();
    match cli.engine {
        Engine::Ocr => {
            capabilities = capabilities.recognizer(load_recognizer(&cli, &config)?);
        }
        Engine::Vlm => {
            let mut settings = VlmSettings::default()
                .max_retries(cli.max_retries)
                .max_pages(cli.max_pdf_pages)
                .max_image_dimension(cli.max_image_dimension);
            if let Some(ref p) = cli.provider {
                settings = settings.provider_name(p);
            }
            if let Some(ref m) = cli.model {
                settings = settings.model(m);
            }
            let mut converter =
                VlmConverter::from_settings(settings).context("Failed to set up VLM provider")?;
            if let Some(ref r) = rasterizer {
                converter = converter.with_rasterizer(Arc::clone(r));
            }
            capabilities = capabilities.converter(Arc::new(converter));
        }
    }
    if let Some(r) = rasterizer {
        capabilities = capabilities.rasterizer(r);
    }

    let extractor = Extractor::new(capabilities.build(), config);
    let file_info = FileInfo::from(&document);

    // ── Run extraction ───────────────────────────────────────────────────
    let start = Instant::now();
    let (text, json) = match cli.engine {
        Engine::Ocr => {
            let result = extractor
                .extract(&document, false)
                .await
                .context("Extraction failed")?;
            let elapsed = start.elapsed().as_millis() as u64;
            if !cli.json {
                eprintln!(
                    "{}",
                    dim(&format!(
                        "language={}  confidence={:.2}  {}ms",
                        result.language_detected,
                        result.confidence.unwrap_or(0.0),
                        elapsed
                    ))
                );
                if result.is_truncated() {
                    eprintln!(
                        "{}",
                        dim(&format!(
                            "only {} of {} pages processed",
                            result.pages_processed.unwrap_or(0),
                            result.total_pages.unwrap_or(0)
                        ))
                    );
                }
            }
            let text = result.text.clone();
            let envelope = ExtractResponse::new(result, file_info, elapsed);
            (text, serde_json::to_string_pretty(&envelope))
        }
        Engine::Vlm => {
            let result = extractor
                .extract_markdown(&document)
                .await
                .context("Conversion failed")?;
            let elapsed = start.elapsed().as_millis() as u64;
            if !cli.json {
                eprintln!(
                    "{}",
                    dim(&format!(
                        "engine={}  language={}  {}ms",
                        result.engine, result.language_detected, elapsed
                    ))
                );
            }
            let text = result.text.clone();
            let envelope = ConverterResponse::new(result, file_info, elapsed);
            (text, serde_json::to_string_pretty(&envelope))
        }
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if cli.json {
        let json = json.context("Failed to serialise output")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    } else {
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    Ok(())
}

async fn read_document(path: &Path, mime: Option<&str>) -> Result<RawDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mime = mime
        .map(str::to_string)
        .or_else(|| mime_from_path(path).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let mut doc = RawDocument::new(bytes, mime);
    if let Some(name) = path.file_name() {
        doc = doc.with_name(name.to_string_lossy());
    }
    Ok(doc)
}

#[cfg(feature = "ocrs")]
fn load_recognizer(
    cli: &Cli,
    config: &ExtractionConfig,
) -> Result<Arc<dyn ocr_extract::Recognizer>> {
    use ocr_extract::pipeline::ocrs_recognizer::{default_model_dir, OcrsRecognizer};

    let dir = cli.ocrs_model_dir.clone().unwrap_or_else(default_model_dir);
    let recognizer = tokio::task::block_in_place(|| {
        OcrsRecognizer::from_model_dir(&dir, &config.ocr_languages)
    })
    .context("Failed to load ocrs models")?;
    Ok(Arc::new(recognizer))
}

#[cfg(not(feature = "ocrs"))]
fn load_recognizer(
    _cli: &Cli,
    _config: &ExtractionConfig,
) -> Result<Arc<dyn ocr_extract::Recognizer>> {
    anyhow::bail!(
        "this build has no text recognizer; rebuild with `--features ocrs` \
         or use `--engine vlm`"
    )
}
