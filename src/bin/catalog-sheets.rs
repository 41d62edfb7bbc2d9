//! CLI binary for catalog-sheets.
//!
//! A thin shim over the library crate that loads `catalog.toml`, applies
//! flag overrides and prints the outcome.

use anyhow::{Context, Result};
use catalog_sheets::{
    list_pdfs, run, CatalogConfig, ProgressCallback, RunOutcome, RunProgressCallback,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the PDF is fetched and read,
/// then a bar with one log line per described product.
struct CliProgressCallback {
    bar: ProgressBar,
    entry_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Fetching PDF from Drive…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            entry_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} products  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Describing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.entry_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_entries: usize) {
        self.activate_bar(total_entries);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Describing {total_entries} products…"))
        ));
    }

    fn on_entry_start(&self, _index: usize, _total: usize, style_number: &str) {
        if let Ok(mut started) = self.entry_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("style {style_number}"));
    }

    fn on_entry_complete(&self, index: usize, total: usize, style_number: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<16}  {}",
            green("✓"),
            index,
            total,
            style_number,
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_entry_error(&self, index: usize, total: usize, style_number: &str, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<16}  {}  {}",
            red("✗"),
            index,
            total,
            style_number,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_entries: usize) {
        self.bar.set_prefix("Publishing");
        self.bar.set_message(format!("{total_entries} rows"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process test.pdf from the folders in ./catalog.toml
  catalog-sheets

  # Another PDF, another config
  catalog-sheets --config shop.toml --target "Spring 2025.pdf"

  # See what is in the PDF folder
  catalog-sheets --list-only

  # Describe everything but do not touch Google Sheets
  catalog-sheets --dry-run --json > table.json

  # Use a specific model
  catalog-sheets --provider anthropic --model claude-sonnet-4-20250514

CONFIG FILE (catalog.toml):
  [drive_folder_ids]
  pdf = "<folder id>"
  doc = "<folder id>"
  csv = "<folder id>"

EXIT STATUS:
  0  completed, or halted because there was nothing to process
  1  fatal error (credentials, API failure, LLM failure, …)
  2  halted while --strict is set

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when none is configured
  EDGEQUAKE_MODEL         Model used with EDGEQUAKE_LLM_PROVIDER
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  CATALOG_*               Fallback for every flag, e.g. CATALOG_TARGET

SETUP:
  1. Share the three Drive folders with the service account.
  2. Save its JSON key as credentials.json.
  3. Set an LLM API key:  export OPENAI_API_KEY=sk-...
  4. Run:                 catalog-sheets
"#;

/// Describe the products of a line-sheet PDF on Google Drive into a Google Sheet.
#[derive(Parser, Debug)]
#[command(
    name = "catalog-sheets",
    version,
    about = "Describe the products of a line-sheet PDF on Google Drive into a Google Sheet",
    long_about = "Downloads a product line-sheet PDF from a Google Drive folder, extracts each \
style number with its images, asks a vision LLM for a product description, and writes the \
results as an eight-column table to a Google Sheet in the same folder.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// TOML config file with the Drive folder ids.
    #[arg(short, long, env = "CATALOG_CONFIG", default_value = "catalog.toml")]
    config: PathBuf,

    /// Exact Drive file name of the PDF to process.
    #[arg(long, env = "CATALOG_TARGET")]
    target: Option<String>,

    /// Service-account JSON key.
    #[arg(long, env = "CATALOG_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Directory for downloaded files.
    #[arg(long, env = "CATALOG_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "CATALOG_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "CATALOG_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CATALOG_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens per product.
    #[arg(long, env = "CATALOG_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Retries per product on LLM failure.
    #[arg(long, env = "CATALOG_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Build the table but do not write to Google Sheets.
    #[arg(long, env = "CATALOG_DRY_RUN")]
    dry_run: bool,

    /// Print the run outcome as JSON on stdout.
    #[arg(long, env = "CATALOG_JSON")]
    json: bool,

    /// List the PDFs in the folder and exit.
    #[arg(long)]
    list_only: bool,

    /// Exit with status 2 when the run halts.
    #[arg(long, env = "CATALOG_STRICT")]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "CATALOG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CATALOG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CATALOG_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_only;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
    )?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_only {
        let files = list_pdfs(&config).await.context("Failed to list PDFs")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&files).context("Failed to serialise listing")?
            );
        } else {
            for f in &files {
                let marker = if f.name == config.target_pdf { green("●") } else { dim("○") };
                println!("{marker} {}  {}", f.name, dim(&f.id));
            }
            if files.is_empty() {
                eprintln!("No PDF files in folder {}", config.folders.pdf);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let result = run(&config).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let outcome = result.context("Catalog run failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    }

    match outcome {
        RunOutcome::Completed(report) => {
            if !cli.quiet && !cli.json {
                match report.publish {
                    Some(ref p) => eprintln!(
                        "{} {} products  →  {}{}  {}",
                        green("✔"),
                        bold(&report.table.len().to_string()),
                        bold(&p.spreadsheet_name),
                        if p.moved { String::new() } else { red(" (not moved to folder)") },
                        dim(&format!("{}ms", report.duration_ms)),
                    ),
                    None => eprintln!(
                        "{} {} products described (dry run)  {}",
                        cyan("◆"),
                        bold(&report.table.len().to_string()),
                        dim(&format!("{}ms", report.duration_ms)),
                    ),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Halted(reason) => {
            if !cli.json {
                eprintln!("{} {}", red("✘"), reason);
            }
            Ok(if cli.strict {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

/// Load the config file and apply flag overrides.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CatalogConfig> {
    let mut config = CatalogConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    if let Some(ref t) = cli.target {
        anyhow::ensure!(!t.trim().is_empty(), "--target must not be empty");
        config.target_pdf = t.clone();
    }
    if let Some(ref p) = cli.credentials {
        config.credentials_path = p.clone();
    }
    if let Some(ref d) = cli.download_dir {
        config.download_dir = d.clone();
    }
    if let Some(ref p) = cli.pdfium_lib {
        config.pdfium_lib_path = Some(p.clone());
    }
    if cli.provider.is_some() {
        config.provider_name = cli.provider.clone();
    }
    if cli.model.is_some() {
        config.model = cli.model.clone();
    }
    if let Some(t) = cli.temperature {
        config.temperature = t.clamp(0.0, 2.0);
    }
    if let Some(n) = cli.max_tokens {
        config.max_tokens = n;
    }
    if let Some(n) = cli.max_retries {
        config.max_retries = n;
    }
    if cli.dry_run {
        config.publish = false;
    }
    config.progress_callback = progress;

    Ok(config)
}
