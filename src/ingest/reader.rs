// src/ingest/reader.rs
//! Batch files as written by the extraction side.
//!
//! Two shapes are accepted: a bare JSON array of records, or an object with
//! an `articles` array and an optional `extraction_date`. Files are usually
//! named `medium_articles_YYYY_MM_DD.json`; the stem becomes the batch id.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{Batch, RawRecord};

static RE_FILE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[_-](\d{2})[_-](\d{2})").expect("valid regex"));

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchDoc {
    Bare(Vec<Value>),
    Wrapped {
        articles: Vec<Value>,
        #[serde(default)]
        extraction_date: Option<String>,
    },
}

/// Non-object entries become empty records so they are counted as rejected
/// instead of failing the whole file.
fn to_records(values: Vec<Value>) -> Vec<RawRecord> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(m) => RawRecord(m),
            _ => RawRecord::default(),
        })
        .collect()
}

/// RFC 3339, or a naive ISO timestamp / date taken as UTC.
pub fn parse_capture_time(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&n));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| Utc.from_utc_datetime(&n))
}

/// `YYYY_MM_DD` (or dashed) date embedded in a file name.
pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let c = RE_FILE_DATE.captures(name)?;
    let y = c[1].parse().ok()?;
    let m = c[2].parse().ok()?;
    let d = c[3].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Parse batch JSON. `fallback` is the capture time used when the document
/// carries no usable `extraction_date`.
pub fn parse_batch(id: &str, content: &str, fallback: DateTime<Utc>) -> Result<Batch> {
    let doc: BatchDoc = serde_json::from_str(content)
        .with_context(|| format!("batch {id}: expected a record array or {{\"articles\": [...]}}"))?;
    let (values, captured_at) = match doc {
        BatchDoc::Bare(values) => (values, fallback),
        BatchDoc::Wrapped {
            articles,
            extraction_date,
        } => {
            let at = extraction_date
                .as_deref()
                .and_then(parse_capture_time)
                .unwrap_or(fallback);
            (articles, at)
        }
    };
    Ok(Batch::new(id, captured_at, to_records(values)))
}

/// Read one batch file. Capture time falls back to the file-name date,
/// then to now.
pub fn read_batch_file(path: &Path) -> Result<Batch> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading batch {}", path.display()))?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch")
        .to_string();
    let fallback = date_from_file_name(&id)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| Utc.from_utc_datetime(&n))
        .unwrap_or_else(Utc::now);
    let batch = parse_batch(&id, &content, fallback)?;
    tracing::debug!(batch = %batch.id, records = batch.records.len(), captured_at = %batch.captured_at, "batch read");
    Ok(batch)
}

/// `*.json` files directly under `dir`, sorted by name.
pub fn list_batch_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let p = entry?.path();
        let is_json = p
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if p.is_file() && is_json {
            out.push(p);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn fallback() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn bare_array_uses_fallback_time() {
        let b = parse_batch("b", r#"[{"title": "A"}, 7]"#, fallback()).unwrap();
        assert_eq!(b.records.len(), 2);
        assert_eq!(b.captured_at, fallback());
        assert!(b.records[1].0.is_empty());
    }

    #[test]
    fn wrapped_document_reads_extraction_date() {
        let doc = r#"{
            "extraction_date": "2024-04-02T07:30:15.123456",
            "total_articles": 1,
            "articles": [{"title": "A", "url": "https://x/a"}]
        }"#;
        let b = parse_batch("b", doc, fallback()).unwrap();
        assert_eq!(b.captured_on(), NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        assert_eq!(b.records[0].field(&["url"]).as_deref(), Some("https://x/a"));
    }

    #[test]
    fn unusable_documents_fail() {
        assert!(parse_batch("b", r#"{"items": []}"#, fallback()).is_err());
        assert!(parse_batch("b", "not json", fallback()).is_err());
    }

    #[test]
    fn file_name_dates() {
        let d = date_from_file_name("medium_articles_2025_07_14").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2025, 7, 14));
        assert!(date_from_file_name("medium_articles_2025_13_01").is_none());
        assert!(date_from_file_name("medium_articles").is_none());
    }

    #[test]
    fn reads_and_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("medium_articles_2024_03_05.json"),
            r#"[{"title": "A"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("medium_articles_2024_03_01.json"), "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = list_batch_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("medium_articles_2024_03_01.json"));

        let b = read_batch_file(&files[1]).unwrap();
        assert_eq!(b.id, "medium_articles_2024_03_05");
        assert_eq!(b.captured_on(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }
}
