//! The archive's search capability: the `SearchApi` seam used by the fetch loop,
//! and a blocking Pushshift-style HTTP client implementing it.

use crate::config::ClientOptions;
use crate::error::FetchError;
use crate::paths::Kind;
use crate::record::Record;
use serde_json::Value;
use std::sync::Mutex;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// One search: up to `limit` records of `kind` in `subreddit` created strictly
/// after `after`, ascending by `created_utc`, restricted to `fields`.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub subreddit: String,
    pub kind: Kind,
    pub fields: Vec<String>,
    pub after: f64,
    pub limit: usize,
}

impl SearchRequest {
    pub const SORT: &'static str = "asc";
    pub const SORT_TYPE: &'static str = "created_utc";

    /// Field filter as sent on the wire; `created_utc` is always included since
    /// the cursor depends on it.
    pub fn filter(&self) -> String {
        let mut fields: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        if !fields.contains(&"created_utc") {
            fields.push("created_utc");
        }
        fields.join(",")
    }

    /// Query string pairs for one HTTP request of `size` records after `after`.
    pub fn query_pairs(&self, after: f64, size: usize) -> Vec<(&'static str, String)> {
        vec![
            ("subreddit", self.subreddit.clone()),
            ("sort", Self::SORT.to_string()),
            ("sort_type", Self::SORT_TYPE.to_string()),
            ("filter", self.filter()),
            ("after", after.to_string()),
            ("size", size.to_string()),
        ]
    }
}

/// Anything that can answer a [`SearchRequest`]. The fetch loop only sees this trait,
/// so tests can script pages without a network.
pub trait SearchApi {
    fn search(&self, request: &SearchRequest) -> Result<Vec<Record>, FetchError>;
}

impl<T: SearchApi + ?Sized> SearchApi for &T {
    fn search(&self, request: &SearchRequest) -> Result<Vec<Record>, FetchError> {
        (**self).search(request)
    }
}

/// Decode a search response body: `{"data": [...]}` or a bare array of objects.
pub fn parse_search_response(body: &str) -> Result<Vec<Record>, FetchError> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("invalid JSON: {e}")))?;
    let items = match v {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(FetchError::MalformedResponse("`data` is not an array".into())),
            None => return Err(FetchError::MalformedResponse("missing `data` array".into())),
        },
        _ => return Err(FetchError::MalformedResponse("expected an object or an array".into())),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            Record::from_value(item)
                .ok_or_else(|| FetchError::MalformedResponse(format!("item {i} is not an object")))
        })
        .collect()
}

/// Blocking client for a Pushshift-compatible archive.
///
/// Construct once per run and pass it to the fetcher. Requests larger than
/// `max_results_per_request` are split into consecutive sub-requests.
pub struct PushshiftClient {
    http: reqwest::blocking::Client,
    opts: ClientOptions,
    last_request: Mutex<Option<Instant>>,
}

impl PushshiftClient {
    pub fn new(opts: ClientOptions) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(opts.user_agent.clone())
            .timeout(opts.timeout)
            .build()
            .map_err(FetchError::from_reqwest)?;
        Ok(Self { http, opts, last_request: Mutex::new(None) })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.opts
    }

    pub fn endpoint(&self, kind: Kind) -> String {
        format!("{}/reddit/search/{}/", self.opts.base_url.trim_end_matches('/'), kind.as_str())
    }

    fn wait_for_slot(&self) {
        let mut last = self.last_request.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.opts.request_interval {
                sleep(self.opts.request_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn get_once(&self, url: &str, query: &[(&'static str, String)]) -> Result<Vec<Record>, FetchError> {
        self.wait_for_slot();
        let body = self
            .http
            .get(url)
            .query(query)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(FetchError::from_reqwest)?;
        parse_search_response(&body)
    }

    fn get_with_retry(&self, req: &SearchRequest, after: f64, size: usize) -> Result<Vec<Record>, FetchError> {
        let url = self.endpoint(req.kind);
        let query = req.query_pairs(after, size);
        let mut attempt = 0u32;
        loop {
            tracing::debug!(subreddit = %req.subreddit, kind = %req.kind, after, size, attempt, "search request");
            match self.get_once(&url, &query) {
                Ok(records) => return Ok(records),
                Err(e) if e.is_retryable() && attempt < self.opts.max_retries => {
                    let delay = backoff_duration(self.opts.retry_base_delay, attempt);
                    attempt += 1;
                    tracing::warn!(
                        "search for r/{} {}s failed ({}), retry {}/{} in {:?}",
                        req.subreddit, req.kind, e, attempt, self.opts.max_retries, delay
                    );
                    sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// `base * 2^attempt`
pub fn backoff_duration(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

impl SearchApi for PushshiftClient {
    fn search(&self, req: &SearchRequest) -> Result<Vec<Record>, FetchError> {
        let per_request = self.opts.max_results_per_request.max(1);
        let mut out: Vec<Record> = Vec::with_capacity(req.limit);
        let mut after = req.after;

        while out.len() < req.limit {
            let size = (req.limit - out.len()).min(per_request);
            let batch = self.get_with_retry(req, after, size)?;
            let n = batch.len();
            if let Some(last) = batch.last() {
                let ts = last.created_utc_f64().ok_or_else(|| {
                    FetchError::MalformedResponse("record without numeric created_utc".into())
                })?;
                if n == size && ts <= after {
                    return Err(FetchError::StalledCursor {
                        subreddit: req.subreddit.clone(),
                        kind: req.kind,
                        after,
                    });
                }
                after = ts;
            }
            out.extend(batch);
            if n < size {
                break;
            }
        }
        Ok(out)
    }
}
