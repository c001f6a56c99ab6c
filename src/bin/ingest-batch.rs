//! Ingest extraction batches into the master store, then reclassify and save.
//!
//! Usage: `ingest-batch [--store PATH] <BATCH.json | DIR>...`
//! Directories contribute every `*.json` file they contain (sorted by name);
//! the store file itself is never read as a batch.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use article_archive::config::{self, ArchiveConfig};
use article_archive::ingest::reader::list_batch_files;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .compact()
        .init();

    let mut cfg = ArchiveConfig::from_env()?;
    let mut inputs: Vec<PathBuf> = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--store" => {
                let p = args.next().context("--store needs a path")?;
                cfg.store_path = PathBuf::from(p);
            }
            "-h" | "--help" => {
                println!("usage: ingest-batch [--store PATH] <BATCH.json | DIR>...");
                return Ok(());
            }
            _ => inputs.push(PathBuf::from(a)),
        }
    }
    if inputs.is_empty() {
        bail!("no batch files given (try --help)");
    }

    let mut files = Vec::new();
    for p in inputs {
        if p.is_dir() {
            files.extend(list_batch_files(&p)?);
        } else {
            files.push(p);
        }
    }
    // canonicalize can fail for a store that does not exist yet
    let store_abs = cfg.store_path.canonicalize().ok();
    files.retain(|f| f.canonicalize().ok() != store_abs || store_abs.is_none());

    let summary = article_archive::run_ingest(&cfg, &files)?;
    println!(
        "{} batch(es): +{} new, {} updated, {} unchanged, {} rejected; {} tagged ({} multi-tagged)",
        summary.batches,
        summary.ingest.added,
        summary.ingest.updated,
        summary.ingest.unchanged,
        summary.ingest.rejected,
        summary.classification.tagged,
        summary.classification.multi_tagged,
    );
    Ok(())
}
