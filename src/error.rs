use thiserror::Error;

use crate::paths::Kind;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of the fetch loop and the search client.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("search API request failed{}: {message}", status_suffix(.status))]
    Api { status: Option<u16>, message: String },

    #[error("malformed search API response: {0}")]
    MalformedResponse(String),

    #[error("page of {kind}s is empty")]
    EmptyPage { kind: Kind },

    #[error("cursor stalled at {after} for r/{subreddit} {kind}s: a full page did not move past it")]
    StalledCursor { subreddit: String, kind: Kind, after: f64 },

    #[error("export of r/{subreddit} {kind}s [{start}, {end}] failed: {source}")]
    ExportWrite {
        subreddit: String,
        kind: Kind,
        start: i64,
        end: i64,
        #[source]
        source: BoxError,
    },

    #[error("invalid fetch parameter: {0}")]
    InvalidArgument(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" (HTTP {s})"),
        None => String::new(),
    }
}

impl FetchError {
    /// 429, 5xx and transport failures (no status) are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Api { status: None, .. } => true,
            FetchError::Api { status: Some(s), .. } => *s == 429 || (500..=599).contains(s),
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        // Strip the URL so query strings don't end up in logs.
        FetchError::Api { status, message: e.without_url().to_string() }
    }
}
