// src/store/mod.rs
//! The permanent, deduplicated article collection.
//!
//! The store is the only long-lived mutable state of the archive. Articles
//! enter through `ingest`/`merge`, have their tags replaced through `retag`,
//! and leave only through `remove`. Everything else reads snapshots.
//!
//! Ingestion is single-writer: the store does no locking of its own and the
//! backing file assumes one ingest/save sequence at a time.

mod persist;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::article::{canonical_order, Article};
use crate::ingest::{Batch, Normalizer};

/// Number of update entries kept in the store's history.
pub const HISTORY_CAP: usize = 50;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("archive_ingest_added_total", "Articles added by ingestion.");
        describe_counter!(
            "archive_ingest_updated_total",
            "Existing articles changed by merge."
        );
        describe_counter!(
            "archive_ingest_unchanged_total",
            "Records that matched an existing article without changing it."
        );
        describe_counter!(
            "archive_ingest_rejected_total",
            "Records dropped for lack of identity."
        );
        describe_gauge!("archive_store_articles", "Articles currently in the store.");
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.unchanged + self.rejected
    }

    pub fn changed_store(&self) -> bool {
        self.added + self.updated > 0
    }

    /// Accumulate another report (for multi-batch runs).
    pub fn absorb(&mut self, other: IngestReport) {
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.rejected += other.rejected;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Updated,
    Unchanged,
}

/// One ingest that changed the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntry {
    pub batch: String,
    pub at: DateTime<Utc>,
    pub added: usize,
    pub updated: usize,
    pub total: usize,
}

/// Insertion-ordered mapping fingerprint → article.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    articles: Vec<Article>,
    index: HashMap<String, usize>,
    created_at: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
    history: Vec<UpdateEntry>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn get(&self, fingerprint: &str) -> Option<&Article> {
        self.index.get(fingerprint).map(|&i| &self.articles[i])
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.index.contains_key(fingerprint)
    }

    /// Articles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Most recent store-changing ingests, oldest first.
    pub fn history(&self) -> &[UpdateEntry] {
        &self.history
    }

    /// Articles in canonical order (newest first, see `canonical_order`).
    pub fn sorted(&self) -> Vec<&Article> {
        let mut v: Vec<&Article> = self.articles.iter().collect();
        v.sort_by(|a, b| canonical_order(a, b));
        v
    }

    /// Merge one normalized article.
    ///
    /// New fingerprints are appended. Known ones keep every non-empty field
    /// they already have; empty fields are filled from `incoming`, and the
    /// received date moves to the earliest sighting. Tags and the source
    /// batch are never touched here.
    pub fn merge(&mut self, incoming: Article) -> MergeOutcome {
        let i = match self.index.get(&incoming.fingerprint).copied() {
            Some(i) => i,
            None => {
                self.index
                    .insert(incoming.fingerprint.clone(), self.articles.len());
                self.articles.push(incoming);
                return MergeOutcome::Added;
            }
        };

        let existing = &mut self.articles[i];
        let mut changed = false;

        if existing.title.trim().is_empty() && !incoming.title.trim().is_empty() {
            existing.title = incoming.title;
            changed = true;
        }
        if existing.url.is_none() && incoming.url.is_some() {
            existing.url = incoming.url;
            changed = true;
        }
        if existing.published_date.is_none() && incoming.published_date.is_some() {
            existing.published_date = incoming.published_date;
            changed = true;
        }
        if incoming.received_date < existing.received_date {
            existing.received_date = incoming.received_date;
            changed = true;
        }

        if changed {
            MergeOutcome::Updated
        } else {
            MergeOutcome::Unchanged
        }
    }

    /// Normalize and merge every record of `batch`.
    ///
    /// Records without identity are skipped with a warning. Re-ingesting a
    /// batch leaves the store unchanged and reports `added == 0`.
    pub fn ingest(&mut self, batch: &Batch, normalizer: &Normalizer) -> IngestReport {
        ensure_metrics_described();

        let captured_on = batch.captured_on();
        let mut report = IngestReport::default();

        for (pos, raw) in batch.records.iter().enumerate() {
            match normalizer.normalize(raw, pos, &batch.id, captured_on) {
                Ok(article) => {
                    let fp = article.fingerprint.clone();
                    let outcome = self.merge(article);
                    debug!(batch = %batch.id, fingerprint = %fp, ?outcome, "merged");
                    match outcome {
                        MergeOutcome::Added => report.added += 1,
                        MergeOutcome::Updated => report.updated += 1,
                        MergeOutcome::Unchanged => report.unchanged += 1,
                    }
                }
                Err(e) => {
                    warn!(batch = %batch.id, error = %e, "record rejected");
                    report.rejected += 1;
                }
            }
        }

        if report.changed_store() {
            self.created_at.get_or_insert(batch.captured_at);
            self.last_updated = Some(batch.captured_at);
            self.history.push(UpdateEntry {
                batch: batch.id.clone(),
                at: batch.captured_at,
                added: report.added,
                updated: report.updated,
                total: self.articles.len(),
            });
            if self.history.len() > HISTORY_CAP {
                let excess = self.history.len() - HISTORY_CAP;
                self.history.drain(0..excess);
            }
        }

        // Telemetry
        counter!("archive_ingest_added_total").increment(report.added as u64);
        counter!("archive_ingest_updated_total").increment(report.updated as u64);
        counter!("archive_ingest_unchanged_total").increment(report.unchanged as u64);
        counter!("archive_ingest_rejected_total").increment(report.rejected as u64);
        gauge!("archive_store_articles").set(self.articles.len() as f64);

        info!(
            batch = %batch.id,
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            rejected = report.rejected,
            total = self.articles.len(),
            "batch ingested"
        );
        report
    }

    /// Replace every article's tag set with `f(article)`.
    pub fn retag<F>(&mut self, mut f: F)
    where
        F: FnMut(&Article) -> BTreeSet<String>,
    {
        for a in &mut self.articles {
            a.tags = f(a);
        }
    }

    /// Administrative removal.
    pub fn remove(&mut self, fingerprint: &str) -> Option<Article> {
        let i = self.index.remove(fingerprint)?;
        let removed = self.articles.remove(i);
        for a in &self.articles[i..] {
            if let Some(slot) = self.index.get_mut(&a.fingerprint) {
                *slot -= 1;
            }
        }
        gauge!("archive_store_articles").set(self.articles.len() as f64);
        Some(removed)
    }

    /// Tag → number of articles carrying it.
    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.articles.iter().flat_map(|a| a.tags.iter()) {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
        counts
    }
}
