use crate::export::ExportFormat;
use crate::paths::Kind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User-facing fetch options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub data_path: PathBuf,           // directory receiving per-page files
    pub chunk_size: usize,            // records requested per page
    pub format: ExportFormat,         // fixed for the whole run
    pub comment_fields: Vec<String>,
    pub submission_fields: Vec<String>,
    pub resume: bool,                 // continue from the checkpoint / newest page file
    pub progress: bool,               // show a spinner while fetching
    pub progress_label: Option<String>,
    pub verbose: bool,                // log "now at <date>" after every page

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            chunk_size: 500,
            format: ExportFormat::Json,
            comment_fields: Kind::Comment.default_fields(),
            submission_fields: Kind::Submission.default_fields(),
            resume: false,
            progress: true,
            progress_label: None,
            verbose: true,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl FetchOptions {
    pub fn with_data_path(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_path = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n;
        self
    }
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }
    pub fn with_comment_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comment_fields = fields.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_submission_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submission_fields = fields.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_resume(mut self, yes: bool) -> Self {
        self.resume = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_verbose(mut self, yes: bool) -> Self {
        self.verbose = yes;
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }

    pub fn fields_for(&self, kind: Kind) -> &[String] {
        match kind {
            Kind::Comment => &self.comment_fields,
            Kind::Submission => &self.submission_fields,
        }
    }
}

/// HTTP settings for [`crate::PushshiftClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,   // backoff = base * 2^attempt
    pub max_results_per_request: usize,
    pub request_interval: Duration,   // minimum gap between two HTTP requests
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.pushshift.io".to_string(),
            user_agent: format!("pushfetch/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
            max_results_per_request: 100,
            request_interval: Duration::from_millis(500),
        }
    }
}

impl ClientOptions {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }
    pub fn with_max_results_per_request(mut self, n: usize) -> Self {
        self.max_results_per_request = n.max(1);
        self
    }
    pub fn with_request_interval(mut self, gap: Duration) -> Self {
        self.request_interval = gap;
        self
    }
}
