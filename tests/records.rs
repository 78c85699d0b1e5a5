#[path = "common/mod.rs"]
mod common;

use common::*;
use pushfetch::{
    format_utc, page_kind, parse_utc, FetchError, Kind, Page, ParentRef, Record, ThingKind, DELETED_AUTHOR,
};
use serde_json::json;

#[test]
fn accessors_read_the_usual_fields() {
    let c = comment("c1", 1_500_000_000, "alice", "t1_parent");
    assert_eq!(c.id(), Some("c1"));
    assert_eq!(c.author(), Some("alice"));
    assert_eq!(c.subreddit(), Some("test"));
    assert_eq!(c.score(), Some(1));
    assert_eq!(c.created_utc(), Some(1_500_000_000));
    assert!(!c.is_deleted_author());

    let d = comment("c2", 1, DELETED_AUTHOR, "t3_s1");
    assert!(d.is_deleted_author());
}

#[test]
fn float_timestamps_keep_the_fraction_until_truncated() {
    let r = Record::from_value(json!({ "id": "x", "created_utc": 1_500_000_000.75 })).unwrap();
    assert_eq!(r.created_utc(), Some(1_500_000_000));
    assert_eq!(r.created_utc_f64(), Some(1_500_000_000.75));

    let s = Record::from_value(json!({ "id": "x", "created_utc": "soon" })).unwrap();
    assert_eq!(s.created_utc(), None);
}

#[test]
fn only_objects_are_records() {
    assert!(Record::from_value(json!([1, 2])).is_none());
    assert!(Record::from_value(json!("x")).is_none());
    assert!(Record::from_value(json!({})).unwrap().is_empty());
}

#[test]
fn parent_refs() {
    let p = ParentRef::parse("t3_abc").unwrap();
    assert_eq!(p.kind, ThingKind::Link);
    assert_eq!(p.id, "abc");
    assert!(p.is_submission());
    assert_eq!(p.to_string(), "t3_abc");

    let c = comment("c2", 1, "bob", "t1_c1").parent().unwrap();
    assert!(c.is_comment());
    assert_eq!(c.id, "c1");

    // unknown prefixes are kept and print back unchanged
    let odd = ParentRef::parse("t9_abc").unwrap();
    assert_eq!(odd.kind, ThingKind::Unknown("t9".into()));
    assert_eq!(odd.id, "abc");
    assert_eq!(odd.to_string(), "t9_abc");
    assert!(!odd.is_comment() && !odd.is_submission());
    assert_eq!(ParentRef::parse("zz_q").unwrap().to_string(), "zz_q");
    assert!(ParentRef::parse("t3").is_none());
    assert!(ParentRef::parse("t3_").is_none());
    assert!(rec("x", 1).parent().is_none());
}

#[test]
fn page_span_and_order() {
    let page = Page::new(Kind::Comment, vec![rec("a", 10), rec("b", 20), rec("c", 20)]);
    assert_eq!(page.span().unwrap(), (10, 20));
    assert_eq!(page.last_created().unwrap(), 20.0);

    let fractional = Page::new(Kind::Comment, vec![rec_at("a", 100.2), rec_at("b", 100.6)]);
    assert_eq!(fractional.span().unwrap(), (100, 100));
    assert_eq!(fractional.last_created().unwrap(), 100.6);
    assert!(fractional.is_ascending());
    assert!(!Page::new(Kind::Comment, vec![rec_at("a", 100.6), rec_at("b", 100.2)]).is_ascending());
    assert!(page.is_ascending());

    let unsorted = Page::new(Kind::Comment, vec![rec("a", 30), rec("b", 20)]);
    assert!(!unsorted.is_ascending());

    let empty = Page::new(Kind::Submission, vec![]);
    assert!(matches!(empty.span(), Err(FetchError::EmptyPage { kind: Kind::Submission })));
}

#[test]
fn kinds_parse_and_classify() {
    assert_eq!("comments".parse::<Kind>().unwrap(), Kind::Comment);
    assert_eq!("RS".parse::<Kind>().unwrap(), Kind::Submission);
    assert!("posts".parse::<Kind>().is_err());

    assert_eq!(Kind::classify("x_comments_1_2.json"), Some(Kind::Comment));
    assert_eq!(Kind::classify("x_submissions_1_2.json"), Some(Kind::Submission));
    // both tags present: comments wins
    assert_eq!(Kind::classify("submissions_and_comments.json"), Some(Kind::Comment));
    assert_eq!(Kind::classify("notes.json"), None);

    // a strict page name decides before the substring does
    assert_eq!(Kind::classify("mycomments_submissions_1_2.json"), Some(Kind::Comment));
    assert_eq!(page_kind("mycomments_submissions_1_2.json"), Some(Kind::Submission));
    assert_eq!(page_kind("old_comments_dump.json"), Some(Kind::Comment));
    assert_eq!(page_kind("notes.json"), None);

    assert_eq!(Kind::Comment.table(), "comments");
    assert_eq!(Kind::Submission.to_string(), "submission");
}

#[test]
fn dates_parse_and_format() {
    assert_eq!(parse_utc("2019-01-01").unwrap(), 1_546_300_800);
    assert_eq!(parse_utc("1546300800").unwrap(), 1_546_300_800);
    assert_eq!(parse_utc("2019-01-01T01:00:00Z").unwrap(), 1_546_304_400);
    assert!(parse_utc("yesterday").is_err());

    assert_eq!(format_utc(1_546_300_800), "2019-01-01T00:00:00Z");
}

#[test]
fn retryable_errors() {
    let api = |status| FetchError::Api { status, message: "x".into() };
    assert!(api(None).is_retryable());
    assert!(api(Some(429)).is_retryable());
    assert!(api(Some(502)).is_retryable());
    assert!(!api(Some(404)).is_retryable());
    assert!(!FetchError::MalformedResponse("x".into()).is_retryable());

    assert_eq!(api(Some(503)).to_string(), "search API request failed (HTTP 503): x");
}
