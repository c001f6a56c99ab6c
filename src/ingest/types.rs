// src/ingest/types.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record as handed over by the extraction side. Loosely typed: any
/// field may be missing, empty, or of an unexpected JSON type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for tests and tools.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// First non-empty value among `names`, as trimmed text.
    /// Strings and numbers count; other JSON shapes are treated as missing.
    pub fn field(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| {
            let text = match self.0.get(*name)? {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!text.is_empty()).then_some(text)
        })
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One extraction run, ingested as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub records: Vec<RawRecord>,
}

impl Batch {
    pub fn new(id: impl Into<String>, captured_at: DateTime<Utc>, records: Vec<RawRecord>) -> Self {
        Self {
            id: id.into(),
            captured_at,
            records,
        }
    }

    pub fn captured_on(&self) -> NaiveDate {
        self.captured_at.date_naive()
    }
}
