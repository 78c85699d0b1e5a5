use anyhow::{anyhow, Result};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// RFC 3339 UTC rendering of a unix timestamp; falls back to the raw number.
pub fn format_utc(ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.to_string())
}

/// Parse `YYYY-MM-DD` (midnight UTC), an RFC 3339 timestamp, or a bare unix timestamp.
pub fn parse_utc(s: &str) -> Result<i64> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<i64>() {
        return Ok(ts);
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(dt.unix_timestamp());
    }
    let date = Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|_| anyhow!("expected YYYY-MM-DD, RFC 3339 or unix seconds, got {s:?}"))?;
    Ok(date.midnight().assume_utc().unix_timestamp())
}
