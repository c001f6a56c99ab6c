// src/config/mod.rs
//! Process-level settings, resolved from the environment (and `.env`).

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::classify::{Classifier, RuleTable};
use crate::ingest::{Normalizer, TrackingParams};
use crate::query::{parse_fields, SearchField};

pub const ENV_STORE_PATH: &str = "ARCHIVE_STORE_PATH";
pub const ENV_SEARCH_FIELDS: &str = "ARCHIVE_SEARCH_FIELDS";
pub const DEFAULT_STORE_PATH: &str = "data/articles_master.json";
pub const ENV_DEV_LOG: &str = "ARCHIVE_DEV_LOG";
pub const DEFAULT_LOG_FILTER: &str = "article_archive=info,warn";

/// The service logs to stdout only when `ARCHIVE_DEV_LOG` is `1`/`true` and
/// it runs locally: a debug build, or `SHUTTLE_ENV` of local/dev/development.
pub fn dev_logging_enabled() -> bool {
    let truthy = |v: String| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true");
    if !env::var(ENV_DEV_LOG).is_ok_and(truthy) {
        return false;
    }
    cfg!(debug_assertions)
        || env::var("SHUTTLE_ENV").is_ok_and(|e| {
            matches!(e.to_ascii_lowercase().as_str(), "local" | "dev" | "development")
        })
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub store_path: PathBuf,
    pub rules: RuleTable,
    pub tracking: TrackingParams,
    pub search_fields: Vec<SearchField>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            rules: RuleTable::builtin(),
            tracking: TrackingParams::default(),
            search_fields: vec![SearchField::Title],
        }
    }
}

impl ArchiveConfig {
    /// Resolve every setting; config files named by env vars must exist.
    pub fn from_env() -> Result<Self> {
        let store_path = env::var(ENV_STORE_PATH)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let rules = RuleTable::load_default().context("loading tag rules")?;
        let tracking = TrackingParams::load_default().context("loading tracking params")?;
        let search_fields = parse_fields(&env::var(ENV_SEARCH_FIELDS).unwrap_or_default())
            .with_context(|| format!("parsing {ENV_SEARCH_FIELDS}"))?;

        Ok(Self {
            store_path,
            rules,
            tracking,
            search_fields,
        })
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.tracking.clone())
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(&self.rules)
    }
}
