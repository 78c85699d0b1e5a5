use crate::error::FetchError;
use crate::paths::Kind;
use crate::record::Record;

/// One bounded, time-ordered batch of records returned by a single search call.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub kind: Kind,
    pub records: Vec<Record>,
}

impl Page {
    pub fn new(kind: Kind, records: Vec<Record>) -> Self {
        Self { kind, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(first.created_utc, last.created_utc)` in whole seconds, as used in file names.
    pub fn span(&self) -> Result<(i64, i64), FetchError> {
        let (first, last) = match (self.records.first(), self.records.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(FetchError::EmptyPage { kind: self.kind }),
        };
        let start = first.created_utc().ok_or_else(|| missing_created(first))?;
        let end = last.created_utc().ok_or_else(|| missing_created(last))?;
        Ok((start, end))
    }

    /// Exact creation time of the last record; this is what the cursor advances to.
    pub fn last_created(&self) -> Result<f64, FetchError> {
        let last = self.records.last().ok_or(FetchError::EmptyPage { kind: self.kind })?;
        last.created_utc_f64().ok_or_else(|| missing_created(last))
    }

    /// True when `created_utc` never decreases. Records without a timestamp break the order.
    pub fn is_ascending(&self) -> bool {
        let mut prev = f64::NEG_INFINITY;
        for r in &self.records {
            match r.created_utc_f64() {
                Some(ts) if ts >= prev => prev = ts,
                _ => return false,
            }
        }
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

fn missing_created(r: &Record) -> FetchError {
    FetchError::MalformedResponse(format!(
        "record {} has no numeric created_utc",
        r.id().unwrap_or("<no id>")
    ))
}
