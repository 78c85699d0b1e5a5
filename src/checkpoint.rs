//! Resume support: the last committed cursor of a subreddit/kind, persisted
//! next to the page files after every exported page.

use crate::fetch::FetchSummary;
use crate::paths::Kind;
use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub subreddit: String,
    pub kind: Kind,
    /// `created_utc` of the last exported record.
    pub after: f64,
    pub pages: u64,
    pub records: u64,
    pub updated_at: i64,
}

impl Checkpoint {
    /// `{dir}/.{subreddit}_{kind}.checkpoint` (a dotfile, so consolidation ignores it).
    pub fn path_for(dir: &Path, subreddit: &str, kind: Kind) -> PathBuf {
        dir.join(format!(".{}_{}.checkpoint", subreddit, kind.as_str()))
    }

    pub fn from_summary(summary: &FetchSummary, base: Option<&Checkpoint>) -> Self {
        let (pages, records) = base.map_or((0, 0), |b| (b.pages, b.records));
        Self {
            subreddit: summary.subreddit.clone(),
            kind: summary.kind,
            after: summary.cursor,
            pages: pages + summary.pages as u64,
            records: records + summary.records as u64,
            updated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
        }
    }

    /// `Ok(None)` when no checkpoint has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let file = match open_with_backoff(path, 4, 20) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("open checkpoint {}", path.display())),
        };
        let cp = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse checkpoint {}", path.display()))?;
        Ok(Some(cp))
    }

    /// Write to a temp sibling, then atomically replace `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("checkpoint.tmp");
        let file = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        drop(w);
        replace_file_atomic_backoff(&tmp, path)
    }
}
