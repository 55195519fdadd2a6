//! Configuration types for a publish run.
//!
//! All run behaviour is controlled through [`PublishConfig`], built via its
//! [`PublishConfigBuilder`]. The config is constructed once at startup and
//! handed by reference to every stage; no component reads ambient state.

use crate::error::PublishError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for one publish run.
///
/// # Example
/// ```rust
/// use gallery_publish::PublishConfig;
///
/// let config = PublishConfig::builder()
///     .image_dir("./photos")
///     .page_id("trip-2026")
///     .title("Summer trip")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct PublishConfig {
    /// Directory scanned (non-recursively) for images. Default: `.`.
    pub image_dir: PathBuf,

    /// Directory receiving the result file and the summary. Default: `output`.
    pub output_dir: PathBuf,

    /// Run identity. Names the checkpoint and seeds the provisional title.
    /// Default: `gallery`.
    pub page_id: String,

    /// Final article title written in phase 2. Default: `Gallery`.
    pub title: String,

    /// Account short name passed to `createAccount`. Default: `gallery`.
    pub short_name: String,

    /// Author name attached to the account and the final page.
    pub author_name: String,

    /// Author URL attached to the final page.
    pub author_url: String,

    /// Image host base URL. Uploads go to `{upload_base_url}/upload`.
    pub upload_base_url: String,

    /// Document service API base URL.
    pub api_base_url: String,

    /// Maximum uploads in flight at once. Default: 3.
    pub concurrency: usize,

    /// Retries per file after the first attempt. Default: 3.
    pub max_retries: u32,

    /// Flat delay between attempts, in milliseconds. Default: 1000.
    pub retry_delay_ms: u64,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// What to do with an existing checkpoint. Default: [`ResumePolicy::Trust`].
    pub resume_policy: ResumePolicy,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            page_id: "gallery".to_string(),
            title: "Gallery".to_string(),
            short_name: "gallery".to_string(),
            author_name: String::new(),
            author_url: String::new(),
            upload_base_url: "https://telegra.ph".to_string(),
            api_base_url: "https://api.telegra.ph".to_string(),
            concurrency: 3,
            max_retries: 3,
            retry_delay_ms: 1000,
            request_timeout_secs: 60,
            resume_policy: ResumePolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("image_dir", &self.image_dir)
            .field("output_dir", &self.output_dir)
            .field("page_id", &self.page_id)
            .field("title", &self.title)
            .field("short_name", &self.short_name)
            .field("author_name", &self.author_name)
            .field("upload_base_url", &self.upload_base_url)
            .field("api_base_url", &self.api_base_url)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("resume_policy", &self.resume_policy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn UploadProgressCallback>"),
            )
            .finish()
    }
}

impl PublishConfig {
    /// Create a new builder for `PublishConfig`.
    pub fn builder() -> PublishConfigBuilder {
        PublishConfigBuilder {
            config: Self::default(),
        }
    }

    /// Checkpoint file; doubles as the machine-readable result file.
    pub fn results_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.results.json", encode_file_stem(&self.page_id)))
    }

    /// Markdown summary file.
    pub fn summary_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.summary.md", encode_file_stem(&self.page_id)))
    }

    /// Endpoint receiving multipart uploads.
    pub fn upload_endpoint(&self) -> String {
        format!("{}/upload", self.upload_base_url.trim_end_matches('/'))
    }
}

/// Percent-encode a page id into a file stem.
///
/// `[A-Za-z0-9._-]` pass through; every other UTF-8 byte (including `%`)
/// becomes `%XX`, so distinct ids never share a file.
fn encode_file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

/// Builder for [`PublishConfig`].
#[derive(Debug)]
pub struct PublishConfigBuilder {
    config: PublishConfig,
}

impl PublishConfigBuilder {
    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn page_id(mut self, id: impl Into<String>) -> Self {
        self.config.page_id = id.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn short_name(mut self, name: impl Into<String>) -> Self {
        self.config.short_name = name.into();
        self
    }

    pub fn author_name(mut self, name: impl Into<String>) -> Self {
        self.config.author_name = name.into();
        self
    }

    pub fn author_url(mut self, url: impl Into<String>) -> Self {
        self.config.author_url = url.into();
        self
    }

    pub fn upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.upload_base_url = url.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.config.resume_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PublishConfig, PublishError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(PublishError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        for (name, value) in [
            ("page_id", &c.page_id),
            ("title", &c.title),
            ("short_name", &c.short_name),
        ] {
            if value.trim().is_empty() {
                return Err(PublishError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        for (name, value) in [
            ("upload_base_url", &c.upload_base_url),
            ("api_base_url", &c.api_base_url),
        ] {
            match reqwest::Url::parse(value) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => {
                    return Err(PublishError::InvalidConfig(format!(
                        "{name} must be an http(s) URL, got '{value}'"
                    )))
                }
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How an existing checkpoint for the same page id is treated.
///
/// | Policy | Existing checkpoint with successes | Checkpoint that is all errors |
/// |--------|-----------------------------------|-------------------------------|
/// | `Trust` | returned verbatim, zero uploads | returned verbatim, zero uploads |
/// | `RetryIfAllFailed` | returned verbatim, zero uploads | ignored, batch re-runs |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResumePolicy {
    /// Any checkpoint is authoritative: at most one attempt per run identity. (default)
    #[default]
    Trust,
    /// Re-run the batch when the stored outcomes contain no success at all.
    RetryIfAllFailed,
}
