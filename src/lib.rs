// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod article;
pub mod error;

// Ingest side: normalizer, batch files, the persisted store
pub mod ingest;
pub mod store;

// Annotation and browsing
pub mod classify;
pub mod filter;
pub mod query;

pub mod api;
pub mod config;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::article::Article;
pub use crate::classify::{Classifier, RuleTable};
pub use crate::filter::{ArticleFilter, TagMode};
pub use crate::ingest::{Batch, Normalizer, RawRecord};
pub use crate::query::{Query, SearchField};
pub use crate::store::{IngestReport, Store};

use std::path::Path;
use tracing::info;

use crate::classify::ClassificationReport;
use crate::config::ArchiveConfig;

/// Outcome of one `run_ingest` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    pub batches: usize,
    pub ingest: IngestReport,
    pub classification: ClassificationReport,
}

/// Load the store, ingest every batch file in order, reclassify, and save.
///
/// A batch file that cannot be read aborts the run before anything is
/// written, so the store on disk is either fully updated or untouched.
pub fn run_ingest<P: AsRef<Path>>(cfg: &ArchiveConfig, batch_files: &[P]) -> anyhow::Result<RunSummary> {
    let batches = batch_files
        .iter()
        .map(|p| ingest::reader::read_batch_file(p.as_ref()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut store = Store::load(&cfg.store_path)?;
    let normalizer = cfg.normalizer();
    let classifier = cfg.classifier();

    let mut summary = RunSummary {
        batches: batches.len(),
        ..Default::default()
    };
    for b in &batches {
        summary.ingest.absorb(store.ingest(b, &normalizer));
    }
    summary.classification = classifier.classify_store(&mut store);
    store.save(&cfg.store_path)?;

    info!(
        batches = summary.batches,
        added = summary.ingest.added,
        updated = summary.ingest.updated,
        total = store.len(),
        "ingest run finished"
    );
    Ok(summary)
}
