mod config;
mod date;
mod paths;
mod record;
mod page;
mod error;

mod search;
mod fetch;
mod export;
mod store;
mod consolidate;
mod checkpoint;
mod activity;

mod progress;
mod util;
mod pipeline;

pub use crate::config::{ClientOptions, FetchOptions};
pub use crate::date::{format_utc, parse_utc};
pub use crate::paths::{discover_pages, page_file_name, page_kind, parse_page_file_name, Kind, PageFileName};
pub use crate::record::{ParentRef, Record, ThingKind, DELETED_AUTHOR};
pub use crate::page::Page;
pub use crate::error::{BoxError, FetchError};
pub use crate::pipeline::RedditFetch;

// The search seam and the HTTP client behind it.
pub use crate::search::{backoff_duration, parse_search_response, PushshiftClient, SearchApi, SearchRequest};

// The fetch loop itself, for callers bringing their own sink.
pub use crate::fetch::{fetch_and_export, fetch_and_export_with, ExportArtifact, FetchParams, FetchSummary, PageSink};

// Flat-file export and read-back.
pub use crate::export::{read_page, read_page_as, read_records, write_page, ExportFormat, FlatFileSink};

// Relational store and consolidation.
pub use crate::store::{Store, StoreSink};
pub use crate::consolidate::{consolidate, ConsolidationReport, UnclassifiedArtifact};

pub use crate::checkpoint::Checkpoint;
pub use crate::activity::{temporal_activity, ActivityBin, Per, DEFAULT_BINS};

// Expose multiprogress and progress helpers.
pub use crate::progress::{make_count_progress, make_fetch_spinner, set_global_multiprogress};

pub use crate::util::init_tracing_once;
