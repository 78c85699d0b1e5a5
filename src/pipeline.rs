use crate::checkpoint::Checkpoint;
use crate::config::FetchOptions;
use crate::consolidate::{consolidate_buffered, ConsolidationReport};
use crate::date::format_utc;
use crate::error::FetchError;
use crate::export::{ExportFormat, FlatFileSink};
use crate::fetch::{fetch_and_export_with, FetchParams, FetchSummary, PageSink};
use crate::paths::{discover_pages, Kind};
use crate::progress::make_fetch_spinner;
use crate::search::SearchApi;
use crate::store::{Store, StoreSink};
use crate::util::init_tracing_once;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Entry point: configure with builder methods, then download or consolidate.
///
/// The search client is passed into each download call, so one client (and its
/// rate limiting) is shared by every fetch of a run.
#[derive(Clone, Debug, Default)]
pub struct RedditFetch {
    pub(crate) opts: FetchOptions,
}

impl RedditFetch {
    pub fn new() -> Self {
        Self { opts: FetchOptions::default() }
    }

    pub fn with_options(opts: FetchOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn data_path(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_path(dir); self }
    pub fn chunk_size(mut self, n: usize) -> Self { self.opts = self.opts.with_chunk_size(n); self }
    pub fn format(mut self, format: ExportFormat) -> Self { self.opts = self.opts.with_format(format); self }
    pub fn comment_fields<I, S>(mut self, fields: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_comment_fields(fields); self }
    pub fn submission_fields<I, S>(mut self, fields: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_submission_fields(fields); self }
    pub fn resume(mut self, yes: bool) -> Self { self.opts = self.opts.with_resume(yes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn verbose(mut self, yes: bool) -> Self { self.opts = self.opts.with_verbose(yes); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    // -------- Downloads --------

    /// Download every comment of `subreddit` created after `after` into `data_path`.
    pub fn subreddit_comments<A: SearchApi + ?Sized>(&self, api: &A, subreddit: &str, after: f64) -> Result<FetchSummary> {
        self.fetch(api, subreddit, Kind::Comment, after)
    }

    /// Download every submission of `subreddit` created after `after` into `data_path`.
    pub fn subreddit_submissions<A: SearchApi + ?Sized>(&self, api: &A, subreddit: &str, after: f64) -> Result<FetchSummary> {
        self.fetch(api, subreddit, Kind::Submission, after)
    }

    /// Download `kind` records into one flat file per page under `data_path`.
    pub fn fetch<A: SearchApi + ?Sized>(&self, api: &A, subreddit: &str, kind: Kind, after: f64) -> Result<FetchSummary> {
        init_tracing_once();
        fs::create_dir_all(&self.opts.data_path)
            .with_context(|| format!("create {}", self.opts.data_path.display()))?;
        let mut sink = FlatFileSink::new(&self.opts.data_path, self.opts.format);
        sink.write_buffer_bytes = self.opts.write_buffer_bytes;
        self.run(api, &mut sink, subreddit, kind, after, true)
    }

    /// Download `kind` records and append every page to its table in `store`.
    /// Checkpoints (when resuming) still live in `data_path`.
    pub fn fetch_into_store<A: SearchApi + ?Sized>(
        &self,
        api: &A,
        store: &mut Store,
        subreddit: &str,
        kind: Kind,
        after: f64,
    ) -> Result<FetchSummary> {
        init_tracing_once();
        let mut sink = StoreSink::new(store);
        self.run(api, &mut sink, subreddit, kind, after, false)
    }

    /// Where a resumed run should start: the furthest of `after`, the checkpoint,
    /// and (with `scan_files`) the newest page file already on disk.
    pub fn resume_point(&self, subreddit: &str, kind: Kind, after: f64, scan_files: bool) -> Result<(f64, Option<Checkpoint>)> {
        let cp = Checkpoint::load(&Checkpoint::path_for(&self.opts.data_path, subreddit, kind))?;
        let mut start = after;
        if let Some(cp) = &cp {
            start = start.max(cp.after);
        }
        if scan_files {
            if let Some((newest, _)) = discover_pages(&self.opts.data_path, subreddit, kind).last() {
                // Names hold truncated seconds, so this can repeat records of the last
                // second; it never skips any. The checkpoint is exact.
                start = start.max(newest.end as f64);
            }
        }
        Ok((start, cp))
    }

    fn run<A, S>(&self, api: &A, sink: &mut S, subreddit: &str, kind: Kind, after: f64, scan_files: bool) -> Result<FetchSummary>
    where
        A: SearchApi + ?Sized,
        S: PageSink + ?Sized,
    {
        let (start, base_cp) = if self.opts.resume {
            fs::create_dir_all(&self.opts.data_path)
                .with_context(|| format!("create {}", self.opts.data_path.display()))?;
            let (start, cp) = self.resume_point(subreddit, kind, after, scan_files)?;
            if start != after {
                tracing::info!("Resuming r/{} {}s at {} ({})", subreddit, kind, start, format_utc(start as i64));
            }
            (start, cp)
        } else {
            (after, None)
        };

        let params = FetchParams::new(subreddit, kind, self.opts.chunk_size, start)
            .with_fields(self.opts.fields_for(kind).iter().cloned());

        let pb = if self.opts.progress {
            let label = self.opts.progress_label.clone().unwrap_or_else(|| format!("r/{} {}s", subreddit, kind));
            Some(make_fetch_spinner(&label))
        } else {
            None
        };

        let cp_path = Checkpoint::path_for(&self.opts.data_path, subreddit, kind);
        let resume = self.opts.resume;
        let verbose = self.opts.verbose;
        let mut last_records = 0usize;

        let result = fetch_and_export_with(api, sink, &params, |summary| {
            if let Some(pb) = &pb {
                pb.inc((summary.records - last_records) as u64);
                pb.set_prefix(format_utc(summary.cursor as i64));
            }
            last_records = summary.records;
            if verbose {
                tracing::info!("r/{} {}s: now at {}", summary.subreddit, summary.kind, format_utc(summary.cursor as i64));
            }
            if resume {
                Checkpoint::from_summary(summary, base_cp.as_ref())
                    .save(&cp_path)
                    .map_err(|e| FetchError::ExportWrite {
                        subreddit: summary.subreddit.clone(),
                        kind: summary.kind,
                        start: summary.cursor as i64,
                        end: summary.cursor as i64,
                        source: e.into(),
                    })?;
            }
            Ok(())
        });

        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }
        let summary = result.with_context(|| format!("fetch r/{} {}s after {}", subreddit, kind, start))?;
        tracing::info!(
            "r/{} {}s: {} pages, {} records, cursor {}",
            summary.subreddit, summary.kind, summary.pages, summary.records, summary.cursor
        );
        Ok(summary)
    }

    // -------- Consolidation --------

    /// Rebuild the database at `db_path` from the page files in `dir`.
    pub fn consolidate(&self, dir: &Path, db_path: &Path) -> Result<ConsolidationReport> {
        init_tracing_once();
        consolidate_buffered(dir, db_path, self.opts.progress, self.opts.read_buffer_bytes)
    }
}
