#[path = "common/mod.rs"]
mod common;

use common::*;
use pushfetch::{consolidate, write_page, ExportFormat, Kind, Page, RedditFetch, Store};
use serde_json::json;

fn seed_dir() -> std::path::PathBuf {
    let dir = tmp_dir();
    write_file(
        &dir.join("sub_comments_100_200.json"),
        &json!([
            { "id": "c1", "author": "alice", "subreddit": "sub", "created_utc": 100, "parent_id": "t3_s1" },
            { "id": "c2", "author": "bob", "subreddit": "sub", "created_utc": 200, "parent_id": "t1_c1" }
        ])
        .to_string(),
    );
    write_file(
        &dir.join("sub_submissions_50_90.json"),
        &json!([
            { "id": "s1", "author": "alice", "subreddit": "sub", "created_utc": 50, "title": "hello" },
            { "id": "s2", "author": "carol", "subreddit": "sub", "created_utc": 70, "title": "again" },
            { "id": "s3", "author": "dave", "subreddit": "sub", "created_utc": 90, "title": "last" }
        ])
        .to_string(),
    );
    write_file(&dir.join("readme.txt"), "not a page");
    dir
}

#[test]
fn pages_land_in_their_tables_and_others_are_skipped() {
    let dir = seed_dir();
    let db = tmp_dir().join("reddit.duckdb");

    let report = consolidate(&dir, &db, false).unwrap();

    assert_eq!(report.comment_rows, 2);
    assert_eq!(report.submission_rows, 3);
    assert_eq!(report.loaded.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path.ends_with("readme.txt"));

    let store = Store::open(&db).unwrap();
    assert_eq!(store.row_count("comments").unwrap(), 2);
    assert_eq!(store.row_count("submissions").unwrap(), 3);
    assert_eq!(ids(&store.rows("comments").unwrap()), vec!["c1", "c2"]);
    assert_eq!(ids(&store.rows("submissions").unwrap()), vec!["s1", "s2", "s3"]);
}

#[test]
fn running_twice_gives_the_same_tables() {
    let dir = seed_dir();
    let db = tmp_dir().join("reddit.duckdb");

    consolidate(&dir, &db, false).unwrap();
    let first = Store::open(&db).unwrap().rows("comments").unwrap();

    let report = consolidate(&dir, &db, false).unwrap();
    assert_eq!(report.comment_rows, 2, "rebuilt, not appended to the previous run");

    let store = Store::open(&db).unwrap();
    assert_eq!(store.rows("comments").unwrap(), first);
    assert_eq!(store.row_count("submissions").unwrap(), 3);
}

#[test]
fn duplicates_across_files_are_kept() {
    let dir = tmp_dir();
    let page = Page::new(Kind::Comment, vec![rec("a", 1), rec("b", 2)]);
    write_page(&dir, "sub", &page, ExportFormat::Json, 0).unwrap();
    write_page(&dir, "sub", &page, ExportFormat::Jsonl, 0).unwrap();

    let db = tmp_dir().join("dup.duckdb");
    let report = consolidate(&dir, &db, false).unwrap();

    assert_eq!(report.comment_rows, 4);
    assert_eq!(ids(&Store::open(&db).unwrap().rows("comments").unwrap()), vec!["a", "b", "a", "b"]);
}

#[test]
fn database_inside_the_data_dir_is_not_reloaded() {
    let dir = seed_dir();
    let db = dir.join("reddit.duckdb");

    consolidate(&dir, &db, false).unwrap();
    let report = consolidate(&dir, &db, false).unwrap();

    assert_eq!(report.loaded.len(), 2);
    // the leftover database file does not look like a page either way
    assert!(report.skipped.iter().all(|s| !s.path.ends_with("reddit.duckdb")));
}

#[test]
fn mixed_formats_and_kind_without_extension() {
    let dir = tmp_dir();
    let page = Page::new(Kind::Submission, vec![submission("s1", 10, "alice")]);
    write_page(&dir, "sub", &page, ExportFormat::JsonlZst, 0).unwrap();
    write_file(&dir.join("sub_comments_notes.txt"), "hello");
    write_file(&dir.join(".sub_comment.checkpoint"), "{}");

    let db = tmp_dir().join("mixed.duckdb");
    let report = consolidate(&dir, &db, false).unwrap();

    assert_eq!(report.submission_rows, 1);
    assert_eq!(report.comment_rows, 0);
    assert_eq!(report.skipped.len(), 1, "dotfiles are ignored silently");
    assert!(report.skipped[0].path.ends_with("sub_comments_notes.txt"));

    let store = Store::open(&db).unwrap();
    assert!(!store.table_exists("comments").unwrap());
    assert_eq!(store.rows("submissions").unwrap()[0].get("title"), Some(&json!("title of s1")));
}

#[test]
fn facade_consolidates_what_it_fetched() {
    let data = tmp_dir();
    let api = ArchiveSearch::new(
        comment_series(5, 1_000, 60),
        vec![submission("s1", 900, "alice"), submission("s2", 950, "bob")],
    );
    let fetcher = RedditFetch::new().data_path(&data).chunk_size(2).progress(false).verbose(false);

    fetcher.subreddit_submissions(&api, "test", 0.0).unwrap();
    fetcher.subreddit_comments(&api, "test", 0.0).unwrap();

    let db = tmp_dir().join("all.duckdb");
    let report = fetcher.consolidate(&data, &db).unwrap();

    assert_eq!(report.comment_rows, 5);
    assert_eq!(report.submission_rows, 2);
    let store = Store::open(&db).unwrap();
    assert_eq!(store.subreddits().unwrap(), vec!["test"]);
    assert_eq!(ids(&store.rows("comments").unwrap()), vec!["c0", "c1", "c2", "c3", "c4"]);
}

/// Pages that disagree on a field's type still load, whatever order they come in.
#[test]
fn conflicting_types_across_pages_load() {
    let dir = tmp_dir();
    write_file(
        &dir.join("sub_comments_100_100.json"),
        &json!([{ "id": "c1", "subreddit": "sub", "created_utc": 100, "score": 3, "edited": false }]).to_string(),
    );
    write_file(
        &dir.join("sub_comments_200_200.json"),
        &json!([{ "id": "c2", "subreddit": "sub", "created_utc": 200.75, "score": "hidden", "edited": 1_600_000_000.5 }])
            .to_string(),
    );

    let db = tmp_dir().join("mixed.duckdb");
    let report = consolidate(&dir, &db, false).unwrap();
    assert_eq!(report.comment_rows, 2);

    let store = Store::open(&db).unwrap();
    let rows = store.rows("comments").unwrap();
    assert_eq!(rows[0].created_utc_f64(), Some(100.0));
    assert_eq!(rows[1].created_utc_f64(), Some(200.75));
    assert_eq!(rows[0].get("score"), Some(&json!("3")));
    assert_eq!(rows[1].get("score"), Some(&json!("hidden")));
    assert_eq!(rows[1].get("edited"), Some(&json!("1600000000.5")));
}

/// A page that fails to load leaves the previous database as it was.
#[test]
fn failed_rebuild_keeps_the_previous_database() {
    let dir = seed_dir();
    let db = tmp_dir().join("reddit.duckdb");
    consolidate(&dir, &db, false).unwrap();

    write_file(&dir.join("sub_comments_300_300.json"), "not json");
    assert!(consolidate(&dir, &db, false).is_err());

    let store = Store::open(&db).unwrap();
    assert_eq!(ids(&store.rows("comments").unwrap()), vec!["c1", "c2"]);
    assert_eq!(store.row_count("submissions").unwrap(), 3);
    drop(store);

    let leftovers: Vec<_> = std::fs::read_dir(db.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.contains("inprogress"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

/// A subreddit whose name contains "comments" keeps its submissions in the right table.
#[test]
fn subreddit_named_like_a_kind() {
    let dir = tmp_dir();
    let page = Page::new(Kind::Submission, vec![submission("s1", 10, "alice")]);
    write_page(&dir, "mycomments", &page, ExportFormat::Json, 0).unwrap();
    let page = Page::new(Kind::Comment, vec![comment("c1", 20, "bob", "t3_s1")]);
    write_page(&dir, "mycomments", &page, ExportFormat::Jsonl, 0).unwrap();

    let db = tmp_dir().join("named.duckdb");
    let report = consolidate(&dir, &db, false).unwrap();

    assert_eq!(report.submission_rows, 1);
    assert_eq!(report.comment_rows, 1);
    let store = Store::open(&db).unwrap();
    assert_eq!(ids(&store.rows("submissions").unwrap()), vec!["s1"]);
    assert_eq!(ids(&store.rows("comments").unwrap()), vec!["c1"]);
}
