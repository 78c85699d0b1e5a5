use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Author name the archive uses for deleted accounts.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// One comment or submission as returned by the archive: a flat key/value map
/// holding exactly the requested fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Accepts JSON objects only.
    pub fn from_value(v: Value) -> Option<Self> {
        match v {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn author(&self) -> Option<&str> {
        self.str_field("author")
    }

    pub fn subreddit(&self) -> Option<&str> {
        self.str_field("subreddit")
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.str_field("parent_id")
    }

    pub fn score(&self) -> Option<i64> {
        self.fields.get("score").and_then(Value::as_i64)
    }

    /// Creation time in whole seconds (fractional values truncated). Use this for
    /// file names and bucketing, not for the cursor.
    pub fn created_utc(&self) -> Option<i64> {
        let v = self.fields.get("created_utc")?;
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    }

    /// Creation time exactly as the archive compares it. Older dumps carry
    /// sub-second floats, so the cursor has to keep the fraction.
    pub fn created_utc_f64(&self) -> Option<f64> {
        self.fields.get("created_utc").and_then(Value::as_f64)
    }

    pub fn is_deleted_author(&self) -> bool {
        self.author() == Some(DELETED_AUTHOR)
    }

    pub fn parent(&self) -> Option<ParentRef> {
        self.parent_id().and_then(ParentRef::parse)
    }
}

/// Reddit "thing" type prefixes (`t1_`, `t3_`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ThingKind {
    Comment,
    Account,
    Link,
    Message,
    Subreddit,
    Award,
    /// Any other prefix, kept verbatim.
    Unknown(String),
}

impl ThingKind {
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "t1" => ThingKind::Comment,
            "t2" => ThingKind::Account,
            "t3" => ThingKind::Link,
            "t4" => ThingKind::Message,
            "t5" => ThingKind::Subreddit,
            "t6" => ThingKind::Award,
            other => ThingKind::Unknown(other.to_string()),
        }
    }

    pub fn prefix(&self) -> &str {
        match self {
            ThingKind::Comment => "t1",
            ThingKind::Account => "t2",
            ThingKind::Link => "t3",
            ThingKind::Message => "t4",
            ThingKind::Subreddit => "t5",
            ThingKind::Award => "t6",
            ThingKind::Unknown(p) => p,
        }
    }
}

/// A parsed `parent_id` / `link_id` fullname.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub kind: ThingKind,
    pub id: String,
}

impl ParentRef {
    /// Splits `t3_abc` into (Link, "abc"). Returns `None` when there is no `_` or no id.
    pub fn parse(fullname: &str) -> Option<Self> {
        let (prefix, id) = fullname.split_once('_')?;
        if id.is_empty() {
            return None;
        }
        Some(Self { kind: ThingKind::from_prefix(prefix), id: id.to_string() })
    }

    pub fn is_submission(&self) -> bool {
        self.kind == ThingKind::Link
    }

    pub fn is_comment(&self) -> bool {
        self.kind == ThingKind::Comment
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}
