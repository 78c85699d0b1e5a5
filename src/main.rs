use anyhow::Result;
use pushfetch::{parse_utc, ClientOptions, Per, PushshiftClient, RedditFetch, Store, DEFAULT_BINS};
use std::fs;
use std::path::PathBuf;

const DATA_ROOT: &str = "./data";
const DATABASE: &str = "./reddit.duckdb";
const START_DATE: &str = "2019-01-01";

fn main() -> Result<()> {
    let data_dir = PathBuf::from(std::env::var("PUSHFETCH_DATA").unwrap_or_else(|_| DATA_ROOT.to_string()));
    let db_path = PathBuf::from(DATABASE);

    let mut client_opts = ClientOptions::default();
    if let Ok(url) = std::env::var("PUSHFETCH_API_URL") {
        client_opts = client_opts.with_base_url(url);
    }
    let api = PushshiftClient::new(client_opts)?;

    let target_subs = vec!["LibertarianPartyUSA", "programming"];
    let start = parse_utc(START_DATE)? as f64;

    fs::create_dir_all(&data_dir)?;

    let base = RedditFetch::new()
        .data_path(&data_dir)
        .chunk_size(500)
        .resume(true)
        .progress(true);

    for sub in &target_subs {
        let s = base.clone().subreddit_submissions(&api, sub, start)?;
        let c = base.clone().subreddit_comments(&api, sub, start)?;
        println!("r/{sub}: {} submissions in {} pages, {} comments in {} pages", s.records, s.pages, c.records, c.pages);
    }

    let report = base.consolidate(&data_dir, &db_path)?;
    println!(
        "Consolidated {} files: {} comments, {} submissions ({} skipped)",
        report.loaded.len(), report.comment_rows, report.submission_rows, report.skipped.len()
    );

    let store = Store::open(&db_path)?;
    for sub in store.subreddits()? {
        let bins = store.temporal_activity(&sub, DEFAULT_BINS, Per::Day)?;
        let peak = bins.iter().map(|b| b.freq).fold(0.0f64, f64::max);
        println!("r/{sub}: peak activity {peak:.1} posts/day over {} bins", bins.len());
    }

    Ok(())
}
