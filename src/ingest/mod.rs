// src/ingest/mod.rs
//! Record normalizer: raw extracted records in, canonical `Article`s out.

pub mod config;
pub mod reader;
pub mod title;
pub mod types;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::article::Article;
use crate::error::InvalidRecordError;
pub use crate::ingest::config::TrackingParams;
use crate::ingest::title::{repair_title, title_from_url};
pub use crate::ingest::types::{Batch, RawRecord};

const TITLE_FIELDS: &[&str] = &["title"];
const URL_FIELDS: &[&str] = &["url", "link"];
const PUBLISHED_FIELDS: &[&str] = &["published_date", "published", "date"];
const RECEIVED_FIELDS: &[&str] = &["received_date", "email_date"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y_%m_%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub const TITLE_MAX_CHARS: usize = 500;

/// Normalize display text: decode entities, strip tags, fold typographic
/// quotes, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > TITLE_MAX_CHARS {
        out = out.chars().take(TITLE_MAX_CHARS).collect();
    }

    out
}

/// Parse a date in any of the shapes the extraction side has produced over
/// time. Returns `None` when nothing fits.
pub fn parse_date_lenient(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.date())
}

/// Split into (base, query) after trimming and dropping any `#fragment`.
fn split_url(raw: &str) -> (&str, Option<&str>) {
    let no_frag = raw.trim().split('#').next().unwrap_or_default();
    match no_frag.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (no_frag, None),
    }
}

fn kept_params<'a>(query: Option<&'a str>, tracking: &TrackingParams) -> Vec<&'a str> {
    query
        .unwrap_or_default()
        .split('&')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| !tracking.is_tracking(p.split('=').next().unwrap_or_default()))
        .collect()
}

/// URL as stored on the article: original casing and parameter order, with
/// tracking parameters and fragment removed.
pub fn clean_url(raw: &str, tracking: &TrackingParams) -> String {
    let (base, query) = split_url(raw);
    let kept = kept_params(query, tracking);
    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}

/// URL form used for identity: case-folded, tracking parameters removed,
/// remaining parameters sorted, trailing `/` dropped.
pub fn canonical_url(raw: &str, tracking: &TrackingParams) -> String {
    let lowered = raw.trim().to_lowercase();
    let (base, query) = split_url(&lowered);

    let trimmed = base.trim_end_matches('/');
    let base = if trimmed.is_empty() || trimmed.ends_with(':') {
        base
    } else {
        trimmed
    };

    let mut kept = kept_params(query, tracking);
    kept.sort_unstable();
    kept.dedup();
    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}

/// Identity hash. URL-bearing records hash the canonical URL; the rest hash
/// the case-folded title plus the published date when one is known.
pub fn fingerprint(
    canonical_url: Option<&str>,
    title: &str,
    published: Option<NaiveDate>,
) -> String {
    let material = match canonical_url {
        Some(u) => format!("url:{u}"),
        None => {
            let folded = title
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let date = published.map(|d| d.to_string()).unwrap_or_default();
            format!("title:{folded}|{date}")
        }
    };

    let digest = Sha256::digest(material.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Turns raw records into articles. Holds the only configuration the
/// normalizer needs: which query parameters are tracking noise.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    tracking: TrackingParams,
}

impl Normalizer {
    pub fn new(tracking: TrackingParams) -> Self {
        Self { tracking }
    }

    pub fn tracking(&self) -> &TrackingParams {
        &self.tracking
    }

    pub fn canonical_url(&self, raw: &str) -> String {
        canonical_url(raw, &self.tracking)
    }

    /// Normalize one record of `batch_id`. `position` is only used for the
    /// error report. Unparseable dates fall back to `captured_on`.
    pub fn normalize(
        &self,
        raw: &RawRecord,
        position: usize,
        batch_id: &str,
        captured_on: NaiveDate,
    ) -> Result<Article, InvalidRecordError> {
        let url = raw
            .field(URL_FIELDS)
            .map(|u| clean_url(&u, &self.tracking))
            .filter(|u| !u.is_empty());

        let mut title = raw
            .field(TITLE_FIELDS)
            .map(|t| repair_title(&normalize_text(&t)))
            .unwrap_or_default();
        if title.is_empty() {
            let Some(u) = &url else {
                return Err(InvalidRecordError { position });
            };
            title = normalize_text(&title_from_url(u));
            if title.is_empty() {
                title = u.clone();
            }
        }

        let received_date = match raw.field(RECEIVED_FIELDS) {
            Some(s) => parse_date_lenient(&s).unwrap_or_else(|| {
                tracing::debug!(position, value = %s, "unparseable received date; using capture date");
                captured_on
            }),
            None => captured_on,
        };
        // Identity only uses a date the record itself carried; the capture
        // date differs between batches.
        let published_raw = raw.field(PUBLISHED_FIELDS);
        let published_parsed = published_raw.as_deref().and_then(parse_date_lenient);
        let published_date = match (&published_raw, published_parsed) {
            (Some(s), None) => {
                tracing::debug!(position, value = %s, "unparseable published date; using capture date");
                Some(captured_on)
            }
            (_, parsed) => parsed,
        };

        let canonical = url.as_deref().map(|u| self.canonical_url(u));
        let fingerprint = fingerprint(canonical.as_deref(), &title, published_parsed);

        Ok(Article {
            fingerprint,
            title,
            url,
            published_date,
            received_date,
            tags: BTreeSet::new(),
            source_batch: batch_id.to_string(),
        })
    }
}
