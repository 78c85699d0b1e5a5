//! Temporal activity: how many comments + submissions a subreddit receives per
//! unit of time, as a fixed-bin histogram ready for plotting.

use crate::store::Store;
use anyhow::Result;
use std::str::FromStr;

pub const DEFAULT_BINS: usize = 200;

/// Rate unit for activity frequencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Per {
    Second,
    Minute,
    Hour,
    #[default]
    Day,
    Month,
    Year,
}

impl Per {
    pub fn seconds(self) -> f64 {
        match self {
            Per::Second => 1.0,
            Per::Minute => 60.0,
            Per::Hour => 3600.0,
            Per::Day => 86_400.0,
            Per::Month => 2.628e6,
            Per::Year => 3.154e7,
        }
    }
}

impl FromStr for Per {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "second" => Ok(Per::Second),
            "minute" => Ok(Per::Minute),
            "hour" => Ok(Per::Hour),
            "day" => Ok(Per::Day),
            "month" => Ok(Per::Month),
            "year" => Ok(Per::Year),
            other => Err(format!("unknown rate unit: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivityBin {
    /// Bin centre, unix seconds.
    pub date: i64,
    /// Posts per `Per` unit within the bin.
    pub freq: f64,
}

/// Histogram of `times` over `bins` equal-width bins spanning `[min, max]`.
///
/// The last bin is closed on the right. When all timestamps are equal the range
/// widens to `[t - 0.5, t + 0.5]`. Empty input (or zero bins) gives no bins.
pub fn temporal_activity(times: &[i64], bins: usize, per: Per) -> Vec<ActivityBin> {
    let (Some(&min), Some(&max)) = (times.iter().min(), times.iter().max()) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    let (lo, hi) = if min == max {
        (min as f64 - 0.5, max as f64 + 0.5)
    } else {
        (min as f64, max as f64)
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0u64; bins];
    for &t in times {
        let idx = (((t as f64 - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| ActivityBin {
            date: (lo + (i as f64 + 0.5) * width) as i64,
            freq: c as f64 / width * per.seconds(),
        })
        .collect()
}

impl Store {
    /// Activity of `subreddit` across both tables.
    pub fn temporal_activity(&self, subreddit: &str, bins: usize, per: Per) -> Result<Vec<ActivityBin>> {
        let times = self.created_times(subreddit)?;
        Ok(temporal_activity(&times, bins, per))
    }
}
