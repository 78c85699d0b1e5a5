//! Per-page flat files: one file per fetched page, named after the page's
//! subreddit, kind and `[start, end]` creation-time range.

use crate::fetch::{ExportArtifact, PageSink};
use crate::page::Page;
use crate::paths::{page_file_name, page_kind, Kind};
use crate::record::Record;
use crate::util::{create_with_backoff, open_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;
use zstd::stream::write::Encoder as ZstdEncoder;

/// On-disk page format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// A single JSON array of records (`.json`).
    #[default]
    Json,
    /// One record per line (`.jsonl`).
    Jsonl,
    /// zstd-compressed JSONL (`.jsonl.zst`).
    JsonlZst,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::JsonlZst => "jsonl.zst",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(ExportFormat::Json),
            "jsonl" => Some(ExportFormat::Jsonl),
            "jsonl.zst" => Some(ExportFormat::JsonlZst),
            _ => None,
        }
    }

    /// Detect by file name suffix (`.jsonl.zst` before `.jsonl` before `.json`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".jsonl.zst") {
            Some(ExportFormat::JsonlZst)
        } else if name.ends_with(".jsonl") {
            Some(ExportFormat::Jsonl)
        } else if name.ends_with(".json") {
            Some(ExportFormat::Json)
        } else {
            None
        }
    }
}

const ZSTD_LEVEL: i32 = 3;

fn write_records<W: Write>(w: &mut W, records: &[Record], format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer(&mut *w, records)?;
        }
        ExportFormat::Jsonl | ExportFormat::JsonlZst => {
            for r in records {
                serde_json::to_writer(&mut *w, r)?;
                w.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// Write `page` to `dir` and return the final path.
///
/// The page is written to a `.inprogress` sibling first and promoted atomically,
/// so a failure never leaves a truncated artifact under the final name.
pub fn write_page(dir: &Path, subreddit: &str, page: &Page, format: ExportFormat, write_buf: usize) -> Result<PathBuf> {
    let (start, end) = page.span()?;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let final_path = dir.join(page_file_name(subreddit, page.kind, start, end, format));
    let tmp_path = dir.join(format!(
        ".{}.inprogress",
        final_path.file_name().and_then(|n| n.to_str()).unwrap_or("page")
    ));

    let written = (|| -> Result<()> {
        let file = create_with_backoff(&tmp_path, 16, 50)
            .with_context(|| format!("create {}", tmp_path.display()))?;
        let mut w = BufWriter::with_capacity(write_buf.max(8 * 1024), file);
        match format {
            ExportFormat::JsonlZst => {
                let mut enc = ZstdEncoder::new(&mut w, ZSTD_LEVEL)?;
                write_records(&mut enc, &page.records, format)?;
                enc.finish()?;
            }
            _ => write_records(&mut w, &page.records, format)?,
        }
        w.flush().with_context(|| format!("flush {}", tmp_path.display()))?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = remove_with_backoff(&tmp_path, 4, 20);
        return Err(e);
    }
    replace_file_atomic_backoff(&tmp_path, &final_path)?;
    Ok(final_path)
}

/// Parse a page file back into records, in file order.
pub fn read_records(path: &Path, format: ExportFormat, read_buf: usize) -> Result<Vec<Record>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let rdr = BufReader::with_capacity(read_buf.max(8 * 1024), file);
    match format {
        ExportFormat::Json => serde_json::from_reader(rdr)
            .with_context(|| format!("parse JSON array {}", path.display())),
        ExportFormat::Jsonl => read_lines(rdr, path),
        ExportFormat::JsonlZst => {
            let dec = ZstdDecoder::new(rdr).with_context(|| format!("zstd {}", path.display()))?;
            read_lines(BufReader::new(dec), path)
        }
    }
}

fn read_lines<R: Read>(rdr: BufReader<R>, path: &Path) -> Result<Vec<Record>> {
    let mut out = Vec::new();
    for (i, line) in rdr.lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let rec: Record = serde_json::from_str(line)
            .with_context(|| format!("parse {} line {}", path.display(), i + 1))?;
        out.push(rec);
    }
    Ok(out)
}

/// Read a page file, taking the kind from its name and the format from its extension.
pub fn read_page(path: &Path) -> Result<Page> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("not a file name: {}", path.display()))?;
    let kind = page_kind(name)
        .ok_or_else(|| anyhow!("cannot tell comments from submissions: {}", path.display()))?;
    read_page_as(path, kind, 256 * 1024)
}

/// Read a page file whose kind is already known.
pub fn read_page_as(path: &Path, kind: Kind, read_buf: usize) -> Result<Page> {
    let Some(format) = ExportFormat::from_path(path) else {
        bail!("unsupported page file extension: {}", path.display());
    };
    Ok(Page::new(kind, read_records(path, format, read_buf)?))
}

/// Page sink writing one flat file per page into a directory.
#[derive(Clone, Debug)]
pub struct FlatFileSink {
    pub dir: PathBuf,
    pub format: ExportFormat,
    pub write_buffer_bytes: usize,
}

impl FlatFileSink {
    pub fn new(dir: impl AsRef<Path>, format: ExportFormat) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), format, write_buffer_bytes: 256 * 1024 }
    }
}

impl PageSink for FlatFileSink {
    fn export(&mut self, subreddit: &str, page: &Page) -> Result<ExportArtifact> {
        let path = write_page(&self.dir, subreddit, page, self.format, self.write_buffer_bytes)?;
        Ok(ExportArtifact::File(path))
    }
}
