#![allow(dead_code)]

use pushfetch::{FetchError, Kind, Record, SearchApi, SearchRequest};
use serde_json::json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// Minimal record with only `id` and `created_utc`.
pub fn rec(id: &str, created_utc: i64) -> Record {
    Record::from_value(json!({ "id": id, "created_utc": created_utc })).unwrap()
}

/// Minimal record with a fractional `created_utc`, as some archive dumps carry.
pub fn rec_at(id: &str, created_utc: f64) -> Record {
    Record::from_value(json!({ "id": id, "created_utc": created_utc })).unwrap()
}

/// A comment as the archive returns it with the default field filter.
pub fn comment(id: &str, created_utc: i64, author: &str, parent_id: &str) -> Record {
    Record::from_value(json!({
        "id": id, "author": author, "body": format!("body of {id}"),
        "subreddit": "test", "score": 1, "parent_id": parent_id,
        "link_id": "t3_s1", "created_utc": created_utc
    }))
    .unwrap()
}

/// A submission as the archive returns it with the default field filter.
pub fn submission(id: &str, created_utc: i64, author: &str) -> Record {
    Record::from_value(json!({
        "id": id, "author": author, "title": format!("title of {id}"),
        "url": format!("https://example.com/{id}"), "subreddit": "test",
        "score": 10, "num_comments": 2, "created_utc": created_utc
    }))
    .unwrap()
}

/// Replays scripted pages in order (one per call) and records every request.
/// Once the script runs out it answers with empty pages.
pub struct ScriptedSearch {
    pages: RefCell<VecDeque<Result<Vec<Record>, FetchError>>>,
    pub requests: RefCell<Vec<SearchRequest>>,
}

impl ScriptedSearch {
    pub fn new(pages: Vec<Vec<Record>>) -> Self {
        Self {
            pages: RefCell::new(pages.into_iter().map(Ok).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_results(results: Vec<Result<Vec<Record>, FetchError>>) -> Self {
        Self { pages: RefCell::new(results.into_iter().collect()), requests: RefCell::new(Vec::new()) }
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn afters(&self) -> Vec<f64> {
        self.requests.borrow().iter().map(|r| r.after).collect()
    }
}

impl SearchApi for ScriptedSearch {
    fn search(&self, request: &SearchRequest) -> Result<Vec<Record>, FetchError> {
        self.requests.borrow_mut().push(request.clone());
        self.pages.borrow_mut().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Behaves like the real archive over a fixed data set: records strictly after
/// the cursor, ascending, at most `limit`.
pub struct ArchiveSearch {
    pub comments: Vec<Record>,
    pub submissions: Vec<Record>,
    pub calls: RefCell<usize>,
}

impl ArchiveSearch {
    pub fn new(comments: Vec<Record>, submissions: Vec<Record>) -> Self {
        Self { comments, submissions, calls: RefCell::new(0) }
    }
}

impl SearchApi for ArchiveSearch {
    fn search(&self, request: &SearchRequest) -> Result<Vec<Record>, FetchError> {
        *self.calls.borrow_mut() += 1;
        let data = match request.kind {
            Kind::Comment => &self.comments,
            Kind::Submission => &self.submissions,
        };
        let mut hits: Vec<Record> = data
            .iter()
            .filter(|r| r.created_utc_f64().map_or(false, |t| t > request.after))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.created_utc_f64().partial_cmp(&b.created_utc_f64()).unwrap());
        hits.truncate(request.limit);
        Ok(hits)
    }
}

/// `n` comments created at `start`, `start + step`, ...
pub fn comment_series(n: usize, start: i64, step: i64) -> Vec<Record> {
    (0..n)
        .map(|i| comment(&format!("c{i}"), start + i as i64 * step, "alice", "t3_s1"))
        .collect()
}

pub fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| !n.starts_with('.'))
        .collect();
    v.sort();
    v
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id().unwrap_or("").to_string()).collect()
}

/// Tiny HTTP/1.1 responder: answers each incoming connection with the next
/// `(status, body)` pair, then exits. Returns the base URL, the captured request
/// lines and the server thread.
pub fn serve_responses(responses: Vec<(u16, String)>) -> (String, std::sync::Arc<std::sync::Mutex<Vec<String>>>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_srv = seen.clone();

    let handle = std::thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = match listener.accept() {
                Ok(s) => s,
                Err(_) => return,
            };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0usize;
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                    break;
                }
                if let Some(v) = header.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap_or(0);
                }
            }
            if content_length > 0 {
                let mut buf = vec![0u8; content_length];
                reader.read_exact(&mut buf).unwrap();
            }
            seen_srv.lock().unwrap().push(request_line.trim().to_string());

            let reason = if status == 200 { "OK" } else { "Error" };
            let resp = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
    });

    (format!("http://{addr}"), seen, handle)
}

pub fn tmp_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}
