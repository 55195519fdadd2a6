//! CLI binary for gallery-publish.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PublishConfig`, wires logging and Ctrl-C, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use gallery_publish::{
    publish_http, CancellationToken, ProgressCallback, PublishConfig, PublishOutput, ResumePolicy,
    UploadOutcome, UploadProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one line per settled file.
/// Files settle out of order, so lines are keyed by file name.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files {percent:>3}%  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Uploading");
        self.bar.reset_eta();
    }
}

impl UploadProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Uploading {total} images…"))
        ));
    }

    fn on_resumed(&self, total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}",
            cyan("↺"),
            bold(&format!("Checkpoint found: reusing {total} stored outcomes, no uploads"))
        );
    }

    fn on_task_start(&self, _index: usize, filename: &str) {
        self.bar.set_message(filename.to_string());
    }

    fn on_retry(&self, filename: &str, retry: u32, max_retries: u32, error: &str) {
        self.bar.println(format!(
            "  {} {}  retry {}/{}  {}",
            yellow("↻"),
            filename,
            retry,
            max_retries,
            dim(&truncate(error, 80)),
        ));
    }

    fn on_task_settled(&self, settled: usize, total: usize, outcome: &UploadOutcome) {
        let line = if outcome.is_success() {
            format!(
                "  {} {:>3}/{:<3}  {}  {}",
                green("✓"),
                settled,
                total,
                outcome.filename,
                dim(outcome.url.as_deref().unwrap_or("")),
            )
        } else {
            self.errors.fetch_add(1, Ordering::SeqCst);
            format!(
                "  {} {:>3}/{:<3}  {}  {}",
                red("✗"),
                settled,
                total,
                outcome.filename,
                red(&truncate(outcome.error.as_deref().unwrap_or("unknown error"), 80)),
            )
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} images uploaded", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} images uploaded  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload ./photos and publish them as "Summer trip"
  gallery-publish ./photos --page-id trip-2026 --title "Summer trip"

  # Six uploads in flight, five retries each, two seconds apart
  gallery-publish ./photos -c 6 --max-retries 5 --retry-delay-ms 2000

  # Re-run after a total failure instead of trusting the checkpoint
  gallery-publish ./photos --page-id trip-2026 --retry-failed-checkpoint

  # Machine-readable output
  gallery-publish ./photos --json > run.json

OUTPUT FILES:
  {output_dir}/{page_id}.results.json   outcome list; doubles as the checkpoint
  {output_dir}/{page_id}.summary.md     Markdown summary with page URL and token
  {log_dir}/YYYY-MM-DD.log              daily log, appended to

RESUMING:
  If the results file exists, no upload is attempted and the stored outcomes
  are reused as-is. Delete it (or pass --retry-failed-checkpoint when every
  upload failed) to upload again.

ENVIRONMENT VARIABLES:
  RUST_LOG                 Override log filtering (e.g. gallery_publish=debug)
  GALLERY_*                Every flag can be set via its GALLERY_ variable
"#;

/// Upload a directory of images and publish them as one article.
#[derive(Parser, Debug)]
#[command(
    name = "gallery-publish",
    version,
    about = "Upload a directory of images and publish them as one shareable article",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the images to upload.
    #[arg(env = "GALLERY_IMAGE_DIR")]
    image_dir: PathBuf,

    /// Directory for the results file and the summary.
    #[arg(short, long, env = "GALLERY_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Run identity: names the checkpoint and the provisional page title.
    #[arg(long, env = "GALLERY_PAGE_ID", default_value = "gallery")]
    page_id: String,

    /// Final article title.
    #[arg(short, long, env = "GALLERY_TITLE", default_value = "Gallery")]
    title: String,

    /// Account short name on the document service.
    #[arg(long, env = "GALLERY_SHORT_NAME", default_value = "gallery")]
    short_name: String,

    /// Author name shown on the article.
    #[arg(long, env = "GALLERY_AUTHOR_NAME", default_value = "")]
    author_name: String,

    /// Author link shown on the article.
    #[arg(long, env = "GALLERY_AUTHOR_URL", default_value = "")]
    author_url: String,

    /// Image host base URL (uploads go to {url}/upload).
    #[arg(long, env = "GALLERY_UPLOAD_URL", default_value = "https://telegra.ph")]
    upload_url: String,

    /// Document service API base URL.
    #[arg(long, env = "GALLERY_API_URL", default_value = "https://api.telegra.ph")]
    api_url: String,

    /// Maximum uploads in flight at once.
    #[arg(short, long, env = "GALLERY_CONCURRENCY", default_value_t = 3)]
    concurrency: usize,

    /// Retries per file after the first attempt.
    #[arg(long, env = "GALLERY_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Flat delay between attempts, in milliseconds.
    #[arg(long, env = "GALLERY_RETRY_DELAY_MS", default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "GALLERY_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Ignore a checkpoint in which every upload failed.
    #[arg(long, env = "GALLERY_RETRY_FAILED_CHECKPOINT")]
    retry_failed_checkpoint: bool,

    /// Directory for the daily log files.
    #[arg(long, env = "GALLERY_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Print the run result as JSON on stdout.
    #[arg(long, env = "GALLERY_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "GALLERY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GALLERY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "GALLERY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO console logs; the daily log file
    // always records INFO and above.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let log_path = init_logging(&cli, show_progress)?;

    // ── Cancellation ─────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl-C received; cancelling in-flight uploads");
                cancel.cancel();
            }
        });
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn UploadProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    tracing::info!(?config, "Configuration loaded");

    // ── Run ──────────────────────────────────────────────────────────────
    let output = publish_http(&config, &cancel)
        .await
        .context("Publish failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_report(&output, &log_path);
    }

    Ok(())
}

/// Install the console and daily-file subscribers; returns the log path.
fn init_logging(cli: &Cli, show_progress: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(&cli.log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", cli.log_dir))?;
    let log_path = cli
        .log_dir
        .join(format!("{}.log", chrono::Local::now().format("%Y-%m-%d")));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let console_level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let file_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            fmt::layer().with_writer(io::stderr).with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level)),
            ),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(file_level)),
        )
        .init();

    Ok(log_path)
}

/// Map CLI args to `PublishConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PublishConfig> {
    let resume_policy = if cli.retry_failed_checkpoint {
        ResumePolicy::RetryIfAllFailed
    } else {
        ResumePolicy::Trust
    };

    let mut builder = PublishConfig::builder()
        .image_dir(&cli.image_dir)
        .output_dir(&cli.output_dir)
        .page_id(&cli.page_id)
        .title(&cli.title)
        .short_name(&cli.short_name)
        .author_name(&cli.author_name)
        .author_url(&cli.author_url)
        .upload_base_url(&cli.upload_url)
        .api_base_url(&cli.api_url)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .retry_delay_ms(cli.retry_delay_ms)
        .request_timeout_secs(cli.timeout)
        .resume_policy(resume_policy);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_report(output: &PublishOutput, log_path: &Path) {
    let stats = &output.stats;
    eprintln!(
        "{}  {}/{} images uploaded{}",
        if stats.failed == 0 { green("✔") } else { cyan("⚠") },
        stats.succeeded,
        stats.total,
        if stats.resumed {
            dim(" (from checkpoint)")
        } else {
            String::new()
        },
    );
    match output.document {
        Some(ref doc) => eprintln!("   page     {}", bold(&doc.url)),
        None => eprintln!("   page     {}", red("not created (no successful upload)")),
    }
    eprintln!("   results  {}", resolved(&output.results_path));
    eprintln!("   summary  {}", resolved(&output.summary_path));
    eprintln!("   log      {}", dim(&resolved(log_path)));
}

fn resolved(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
