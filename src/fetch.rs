//! The incremental fetch loop: request a page after the cursor, export it,
//! advance the cursor, repeat until a short page shows the end of the data.

use crate::error::FetchError;
use crate::page::Page;
use crate::paths::Kind;
use crate::search::{SearchApi, SearchRequest};
use std::path::PathBuf;

/// What one page export produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportArtifact {
    File(PathBuf),
    Table { table: &'static str, rows: usize },
}

/// Destination for fetched pages. An `Err` means the page was not (fully) persisted.
pub trait PageSink {
    fn export(&mut self, subreddit: &str, page: &Page) -> anyhow::Result<ExportArtifact>;
}

impl<S: PageSink + ?Sized> PageSink for &mut S {
    fn export(&mut self, subreddit: &str, page: &Page) -> anyhow::Result<ExportArtifact> {
        (**self).export(subreddit, page)
    }
}

#[derive(Clone, Debug)]
pub struct FetchParams {
    pub subreddit: String,
    pub kind: Kind,
    pub chunk_size: usize,
    /// Exclusive lower bound on `created_utc`; fractional seconds are kept.
    pub after: f64,
    /// Field filter; empty means the kind's defaults.
    pub fields: Vec<String>,
}

impl FetchParams {
    pub fn new(subreddit: impl Into<String>, kind: Kind, chunk_size: usize, after: f64) -> Self {
        Self { subreddit: subreddit.into(), kind, chunk_size, after, fields: Vec::new() }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    fn validate(&self) -> Result<(), FetchError> {
        if self.subreddit.trim().is_empty() {
            return Err(FetchError::InvalidArgument("subreddit must not be empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(FetchError::InvalidArgument("chunk_size must be positive".into()));
        }
        Ok(())
    }
}

/// Running tally of a fetch; also the final result.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchSummary {
    pub subreddit: String,
    pub kind: Kind,
    pub pages: usize,
    pub records: usize,
    /// Creation time of the last exported record (the input `after` if nothing was exported).
    pub cursor: f64,
    pub artifacts: Vec<ExportArtifact>,
}

pub fn fetch_and_export<A, S>(api: &A, sink: &mut S, params: &FetchParams) -> Result<FetchSummary, FetchError>
where
    A: SearchApi + ?Sized,
    S: PageSink + ?Sized,
{
    fetch_and_export_with(api, sink, params, |_| Ok(()))
}

/// Like [`fetch_and_export`], calling `on_page` after each page is exported and the
/// cursor advanced. An error from `on_page` stops the loop.
pub fn fetch_and_export_with<A, S, F>(
    api: &A,
    sink: &mut S,
    params: &FetchParams,
    mut on_page: F,
) -> Result<FetchSummary, FetchError>
where
    A: SearchApi + ?Sized,
    S: PageSink + ?Sized,
    F: FnMut(&FetchSummary) -> Result<(), FetchError>,
{
    params.validate()?;
    let fields = if params.fields.is_empty() { params.kind.default_fields() } else { params.fields.clone() };

    let mut summary = FetchSummary {
        subreddit: params.subreddit.clone(),
        kind: params.kind,
        pages: 0,
        records: 0,
        cursor: params.after,
        artifacts: Vec::new(),
    };

    loop {
        let request = SearchRequest {
            subreddit: params.subreddit.clone(),
            kind: params.kind,
            fields: fields.clone(),
            after: summary.cursor,
            limit: params.chunk_size,
        };
        let page = Page::new(params.kind, api.search(&request)?);

        if page.is_empty() {
            tracing::debug!(subreddit = %params.subreddit, kind = %params.kind, after = summary.cursor, "empty page, end of data");
            break;
        }
        if !page.is_ascending() {
            tracing::warn!(
                "page of r/{} {}s after {} is not sorted by created_utc; exporting as returned",
                params.subreddit, params.kind, summary.cursor
            );
        }

        let (start, end) = page.span()?;
        let last = page.last_created()?;
        let is_last = page.len() < params.chunk_size;
        if !is_last && last <= summary.cursor {
            return Err(FetchError::StalledCursor {
                subreddit: params.subreddit.clone(),
                kind: params.kind,
                after: summary.cursor,
            });
        }

        let artifact = sink.export(&params.subreddit, &page).map_err(|e| FetchError::ExportWrite {
            subreddit: params.subreddit.clone(),
            kind: params.kind,
            start,
            end,
            source: e.into(),
        })?;

        summary.pages += 1;
        summary.records += page.len();
        summary.cursor = last;
        summary.artifacts.push(artifact);
        on_page(&summary)?;

        if is_last {
            break;
        }
    }
    Ok(summary)
}
