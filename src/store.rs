//! DuckDB-backed relational store with one table per record kind.
//!
//! Tables are created on first append; fields never seen before become new
//! columns, so a table's schema is the union of every field appended to it.

use crate::fetch::{ExportArtifact, PageSink};
use crate::page::Page;
use crate::paths::Kind;
use crate::record::Record;
use crate::util::remove_with_backoff;
use anyhow::{Context, Result};
use duckdb::types::Value as DbValue;
use duckdb::{params, params_from_iter, Connection};
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};

pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the database at `path`, keeping existing tables.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open database {}", path.display()))?;
        Ok(Self { conn, path: Some(path.to_path_buf()) })
    }

    /// Delete any database at `path` (and its WAL), then open a fresh one.
    pub fn create_fresh(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::debug!("Removing existing database {}", path.display());
        }
        remove_with_backoff(path, 16, 50)?;
        let mut wal = path.as_os_str().to_owned();
        wal.push(".wal");
        remove_with_backoff(Path::new(&wal), 16, 50)?;
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
                params![table],
                |row| row.get(0),
            )
            .with_context(|| format!("look up table {table}"))?;
        Ok(n > 0)
    }

    /// Column names in declaration order; empty when the table does not exist.
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let cols = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("list columns of {table}"))?;
        Ok(cols)
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT count(*) FROM {}", quote_ident(table)), [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Append a page to its kind's table.
    pub fn append_page(&mut self, page: &Page) -> Result<usize> {
        self.append_records(page.kind.table(), &page.records)
    }

    /// Append records in order inside one transaction. Returns the number of rows written.
    ///
    /// Columns widen when a batch disagrees with their current type: BIGINT and
    /// DOUBLE meet at DOUBLE, any other mix becomes VARCHAR holding the JSON text.
    pub fn append_records(&mut self, table: &str, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let existing = self.column_types(table)?;
        let table_exists = !existing.is_empty();

        // Final type of every column, existing ones first. `None` until a non-null value shows up.
        let mut working: Vec<(String, Option<ColumnType>)> =
            existing.iter().map(|(c, t)| (c.clone(), Some(*t))).collect();
        for r in records {
            for (k, v) in r.fields() {
                let vt = ColumnType::of(v);
                match working.iter_mut().find(|(c, _)| c == k) {
                    Some((_, t)) => *t = ColumnType::unify_opt(*t, vt),
                    None => working.push((k.clone(), vt)),
                }
            }
        }
        let columns: Vec<(String, ColumnType)> = working
            .into_iter()
            .map(|(c, t)| (c, t.unwrap_or(ColumnType::Varchar)))
            .collect();

        let tx = self.conn.transaction()?;
        if !table_exists {
            let defs: Vec<String> = columns
                .iter()
                .map(|(c, t)| format!("{} {}", quote_ident(c), t.sql()))
                .collect();
            tx.execute_batch(&format!("CREATE TABLE {} ({});", quote_ident(table), defs.join(", ")))
                .with_context(|| format!("create table {table}"))?;
        } else {
            for (i, (c, t)) in columns.iter().enumerate() {
                match existing.get(i) {
                    Some((_, old)) if old == t => {}
                    Some((_, old)) => {
                        tracing::debug!(table, column = %c, from = old.sql(), to = t.sql(), "widening column");
                        tx.execute_batch(&format!(
                            "ALTER TABLE {} ALTER COLUMN {} TYPE {};",
                            quote_ident(table),
                            quote_ident(c),
                            t.sql()
                        ))
                        .with_context(|| format!("widen column {c} of {table} to {}", t.sql()))?;
                    }
                    None => {
                        tx.execute_batch(&format!(
                            "ALTER TABLE {} ADD COLUMN {} {};",
                            quote_ident(table),
                            quote_ident(c),
                            t.sql()
                        ))
                        .with_context(|| format!("add column {c} to {table}"))?;
                    }
                }
            }
        }

        {
            let col_list: Vec<String> = columns.iter().map(|(c, _)| quote_ident(c)).collect();
            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                col_list.join(", "),
                placeholders
            );
            let mut stmt = tx.prepare(&sql)?;
            for r in records {
                let row: Vec<DbValue> = columns.iter().map(|(c, t)| to_db_value(r.get(c), *t)).collect();
                stmt.execute(params_from_iter(row))
                    .with_context(|| format!("insert into {table} (id {:?})", r.id()))?;
            }
        }
        tx.commit().with_context(|| format!("commit append to {table}"))?;
        Ok(records.len())
    }

    fn column_types(&self, table: &str) -> Result<Vec<(String, ColumnType)>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let cols = stmt
            .query_map(params![table], |row| {
                Ok((row.get::<_, String>(0)?, ColumnType::from_sql(&row.get::<_, String>(1)?)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("list column types of {table}"))?;
        Ok(cols)
    }

    /// Flush the WAL into the database file and close the connection.
    pub fn close(self) -> Result<()> {
        self.conn.execute_batch("CHECKPOINT;").context("checkpoint database")?;
        self.conn.close().map_err(|(_, e)| e).context("close database")
    }

    /// All rows of `table` in insertion order, as records. Null columns are omitted.
    pub fn rows(&self, table: &str) -> Result<Vec<Record>> {
        let columns = self.columns(table)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let col_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let sql = format!("SELECT {} FROM {} ORDER BY rowid", col_list.join(", "), quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Map::new();
            for (i, c) in columns.iter().enumerate() {
                let v: DbValue = row.get(i)?;
                let jv = from_db_value(v);
                if !jv.is_null() {
                    map.insert(c.clone(), jv);
                }
            }
            out.push(Record::from_map(map));
        }
        Ok(out)
    }

    /// Distinct subreddits present in the submissions table.
    pub fn subreddits(&self) -> Result<Vec<String>> {
        let table = Kind::Submission.table();
        if !self.table_exists(table)? || !self.columns(table)?.iter().any(|c| c == "subreddit") {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT subreddit FROM {} WHERE subreddit IS NOT NULL ORDER BY subreddit",
            quote_ident(table)
        ))?;
        let subs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subs)
    }

    /// `created_utc` of every comment and submission in `subreddit`, floored to whole
    /// seconds whatever the column type has widened to.
    pub fn created_times(&self, subreddit: &str) -> Result<Vec<i64>> {
        let mut times = Vec::new();
        for kind in [Kind::Comment, Kind::Submission] {
            let table = kind.table();
            let cols = self.columns(table)?;
            if !cols.iter().any(|c| c == "created_utc") || !cols.iter().any(|c| c == "subreddit") {
                continue;
            }
            let mut stmt = self.conn.prepare(&format!(
                "SELECT CAST(floor(TRY_CAST(created_utc AS DOUBLE)) AS BIGINT) FROM {} \
                 WHERE subreddit = ? AND TRY_CAST(created_utc AS DOUBLE) IS NOT NULL",
                quote_ident(table)
            ))?;
            let part = stmt
                .query_map(params![subreddit], |row| row.get::<_, i64>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("read created_utc from {table}"))?;
            times.extend(part);
        }
        Ok(times)
    }
}

/// Page sink appending into a [`Store`].
pub struct StoreSink<'a> {
    store: &'a mut Store,
}

impl<'a> StoreSink<'a> {
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }
}

impl PageSink for StoreSink<'_> {
    fn export(&mut self, _subreddit: &str, page: &Page) -> Result<ExportArtifact> {
        let rows = self.store.append_page(page)?;
        Ok(ExportArtifact::Table { table: page.kind.table(), rows })
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Varchar,
}

impl ColumnType {
    /// `None` for null; nulls fit any column.
    fn of(v: &Value) -> Option<Self> {
        match v {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Number(n) if n.is_i64() => Some(ColumnType::BigInt),
            Value::Number(_) => Some(ColumnType::Double),
            _ => Some(ColumnType::Varchar),
        }
    }

    fn unify(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (BigInt, Double) | (Double, BigInt) => Double,
            _ => Varchar,
        }
    }

    fn unify_opt(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.unify(b)),
            (a, b) => a.or(b),
        }
    }

    fn sql(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    fn from_sql(data_type: &str) -> Self {
        match data_type {
            "BOOLEAN" => ColumnType::Boolean,
            "BIGINT" => ColumnType::BigInt,
            "DOUBLE" => ColumnType::Double,
            _ => ColumnType::Varchar,
        }
    }
}

/// Bind `v` for a column of type `ty`; in VARCHAR columns non-strings keep their JSON text.
fn to_db_value(v: Option<&Value>, ty: ColumnType) -> DbValue {
    let Some(v) = v else { return DbValue::Null };
    match (v, ty) {
        (Value::Null, _) => DbValue::Null,
        (Value::Bool(b), ColumnType::Boolean) => DbValue::Boolean(*b),
        (Value::Number(n), ColumnType::BigInt) => match n.as_i64() {
            Some(i) => DbValue::BigInt(i),
            None => DbValue::Text(n.to_string()),
        },
        (Value::Number(n), ColumnType::Double) => DbValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        (Value::String(s), _) => DbValue::Text(s.clone()),
        (other, _) => DbValue::Text(other.to_string()),
    }
}

fn from_db_value(v: DbValue) -> Value {
    match v {
        DbValue::Null => Value::Null,
        DbValue::Boolean(b) => Value::Bool(b),
        DbValue::TinyInt(i) => Value::from(i),
        DbValue::SmallInt(i) => Value::from(i),
        DbValue::Int(i) => Value::from(i),
        DbValue::BigInt(i) => Value::from(i),
        DbValue::UTinyInt(i) => Value::from(i),
        DbValue::USmallInt(i) => Value::from(i),
        DbValue::UInt(i) => Value::from(i),
        DbValue::UBigInt(i) => Value::from(i),
        DbValue::Float(f) => Number::from_f64(f as f64).map(Value::Number).unwrap_or(Value::Null),
        DbValue::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        DbValue::Text(s) => Value::String(s),
        other => Value::String(format!("{other:?}")),
    }
}
