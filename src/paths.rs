use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::export::ExportFormat;

/// Record kind: comments (RC) or submissions (RS).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Comment,
    Submission,
}

impl Kind {
    /// Singular name, as used by the search endpoint (`/reddit/search/comment/`).
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Comment => "comment",
            Kind::Submission => "submission",
        }
    }

    /// Plural name; doubles as the file tag and the table name.
    pub fn plural(self) -> &'static str {
        match self {
            Kind::Comment => "comments",
            Kind::Submission => "submissions",
        }
    }

    pub fn table(self) -> &'static str {
        self.plural()
    }

    /// Fields requested from the archive when the caller does not override them.
    pub fn default_fields(self) -> Vec<String> {
        let fields: &[&str] = match self {
            Kind::Comment => &[
                "author", "body", "subreddit", "score", "level",
                "submit_text", "parent_id", "link_id", "id",
            ],
            Kind::Submission => &[
                "id", "url", "author", "title", "subreddit", "score", "num_comments",
            ],
        };
        fields.iter().map(|s| s.to_string()).collect()
    }

    /// Classify a file name by substring. "comments" wins if both appear.
    pub fn classify(file_name: &str) -> Option<Kind> {
        if file_name.contains("comments") {
            Some(Kind::Comment)
        } else if file_name.contains("submissions") {
            Some(Kind::Submission)
        } else {
            None
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comment" | "comments" | "rc" => Ok(Kind::Comment),
            "submission" | "submissions" | "rs" => Ok(Kind::Submission),
            other => Err(format!("unknown kind: {other}")),
        }
    }
}

/// `{subreddit}_{kind}s_{start}_{end}.{ext}`
pub fn page_file_name(subreddit: &str, kind: Kind, start: i64, end: i64, format: ExportFormat) -> String {
    format!("{}_{}_{}_{}.{}", subreddit, kind.plural(), start, end, format.extension())
}

/// Fields recovered from a page file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageFileName {
    pub subreddit: String,
    pub kind: Kind,
    pub start: i64,
    pub end: i64,
    pub format: ExportFormat,
}

fn page_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+)_(comments|submissions)_(-?\d+)_(-?\d+)\.(json|jsonl|jsonl\.zst)$").unwrap()
    })
}

/// Strict parse of a name produced by [`page_file_name`]. Returns `None` for anything else.
pub fn parse_page_file_name(file_name: &str) -> Option<PageFileName> {
    let caps = page_name_re().captures(file_name)?;
    let kind = caps[2].parse().ok()?;
    let start = caps[3].parse().ok()?;
    let end = caps[4].parse().ok()?;
    let format = ExportFormat::from_extension(&caps[5])?;
    Some(PageFileName { subreddit: caps[1].to_string(), kind, start, end, format })
}

/// Kind of a page file: from the strict name when it parses, so a subreddit
/// called `..comments..` does not pull its submissions into the wrong table,
/// otherwise by substring.
pub fn page_kind(file_name: &str) -> Option<Kind> {
    parse_page_file_name(file_name)
        .map(|p| p.kind)
        .or_else(|| Kind::classify(file_name))
}

/// Top-level files in `dir`, sorted by file name. Dotfiles are left out.
pub fn list_dir_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        if let Ok(ent) = entry {
            if !ent.file_type().is_file() {
                continue;
            }
            if let Some(name) = ent.file_name().to_str() {
                if name.starts_with('.') {
                    continue;
                }
            }
            files.push(ent.path().to_path_buf());
        }
    }
    files
}

/// Page files already written for `subreddit`/`kind` in `dir`, ordered by start timestamp.
pub fn discover_pages(dir: &Path, subreddit: &str, kind: Kind) -> Vec<(PageFileName, PathBuf)> {
    let mut found: Vec<(PageFileName, PathBuf)> = list_dir_files(dir)
        .into_iter()
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?;
            let parsed = parse_page_file_name(name)?;
            (parsed.subreddit == subreddit && parsed.kind == kind).then_some((parsed, p))
        })
        .collect();
    found.sort_by_key(|(n, _)| (n.start, n.end));
    found
}
