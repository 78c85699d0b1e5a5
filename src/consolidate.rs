//! Consolidation: merge a directory of per-page files into one fresh database
//! with a "comments" and a "submissions" table.

use crate::export::{read_page_as, ExportFormat};
use crate::paths::{list_dir_files, page_kind, Kind};
use crate::progress::make_count_progress;
use crate::store::Store;
use crate::util::{remove_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::fmt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A file that is neither a comments nor a submissions page. Skipped, never fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnclassifiedArtifact {
    pub path: PathBuf,
    pub reason: &'static str,
}

impl fmt::Display for UnclassifiedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}: {}", self.path.display(), self.reason)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConsolidationReport {
    pub database: PathBuf,
    /// Every loaded file with its kind and row count, in load order.
    pub loaded: Vec<(PathBuf, Kind, usize)>,
    pub comment_rows: u64,
    pub submission_rows: u64,
    pub skipped: Vec<UnclassifiedArtifact>,
}

fn classify(path: &Path) -> std::result::Result<Kind, &'static str> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let kind = page_kind(name).ok_or("name mentions neither comments nor submissions")?;
    if ExportFormat::from_path(path).is_none() {
        return Err("not a .json / .jsonl / .jsonl.zst page file");
    }
    Ok(kind)
}

/// Rebuild `db_path` from every page file directly under `dir`.
///
/// The new database is built in a hidden sibling and replaces `db_path` only once
/// every page has loaded; on failure the previous database is left untouched.
/// Running this twice over an unchanged directory yields the same tables. Files are
/// loaded in file-name order, rows in file order; nothing is deduplicated.
pub fn consolidate(dir: &Path, db_path: &Path, progress: bool) -> Result<ConsolidationReport> {
    consolidate_buffered(dir, db_path, progress, 256 * 1024)
}

pub(crate) fn consolidate_buffered(dir: &Path, db_path: &Path, progress: bool, read_buf: usize) -> Result<ConsolidationReport> {
    let files = list_dir_files(dir);
    let db_abs = db_path.canonicalize().ok();
    let tmp_path = staging_path(db_path);
    let mut store = Store::create_fresh(&tmp_path)?;

    let loaded = load_pages(&mut store, files, db_abs.as_deref(), progress, read_buf);
    let report = match loaded.and_then(|report| store.close().map(|_| report)) {
        Ok(report) => report,
        Err(e) => {
            let _ = remove_with_backoff(&tmp_path, 4, 20);
            let _ = remove_with_backoff(&wal_path(&tmp_path), 4, 20);
            return Err(e);
        }
    };

    if db_path.exists() {
        tracing::info!("Replacing existing database {}", db_path.display());
    }
    remove_with_backoff(&wal_path(db_path), 16, 50)?;
    replace_file_atomic_backoff(&tmp_path, db_path)?;
    remove_with_backoff(&wal_path(&tmp_path), 4, 20)?;

    let report = ConsolidationReport { database: db_path.to_path_buf(), ..report };
    tracing::info!(
        "Consolidated {} files into {} ({} comments, {} submissions, {} skipped)",
        report.loaded.len(),
        db_path.display(),
        report.comment_rows,
        report.submission_rows,
        report.skipped.len()
    );
    Ok(report)
}

fn load_pages(
    store: &mut Store,
    files: Vec<PathBuf>,
    db_abs: Option<&Path>,
    progress: bool,
    read_buf: usize,
) -> Result<ConsolidationReport> {
    let pb = if progress { Some(make_count_progress(files.len() as u64, "Consolidating pages")) } else { None };
    let mut report = ConsolidationReport::default();

    for path in files {
        if let Some(pb) = &pb { pb.inc(1); }
        if db_abs.is_some() && path.canonicalize().ok().as_deref() == db_abs {
            continue;
        }
        let kind = match classify(&path) {
            Ok(k) => k,
            Err(reason) => {
                let skipped = UnclassifiedArtifact { path, reason };
                tracing::warn!("{}", skipped);
                report.skipped.push(skipped);
                continue;
            }
        };

        let page = read_page_as(&path, kind, read_buf)
            .with_context(|| format!("load page file {}", path.display()))?;
        let rows = store
            .append_page(&page)
            .with_context(|| format!("append {} into {}", path.display(), kind.table()))?;
        match kind {
            Kind::Comment => report.comment_rows += rows as u64,
            Kind::Submission => report.submission_rows += rows as u64,
        }
        tracing::debug!(file = %path.display(), table = kind.table(), rows, "loaded page file");
        report.loaded.push((path, kind, rows));
    }

    if let Some(pb) = pb { pb.finish_with_message("done"); }
    Ok(report)
}

/// `{dir}/.{name}.inprogress`, a dotfile so a rerun over the same directory ignores it.
fn staging_path(db_path: &Path) -> PathBuf {
    let name = db_path.file_name().and_then(|n| n.to_str()).unwrap_or("database");
    db_path.with_file_name(format!(".{name}.inprogress"))
}

fn wal_path(db_path: &Path) -> PathBuf {
    let mut wal: OsString = db_path.as_os_str().to_owned();
    wal.push(".wal");
    PathBuf::from(wal)
}
