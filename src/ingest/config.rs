// src/ingest/config.rs
//! Query parameters that carry tracking data and never take part in
//! article identity.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_TRACKING_PARAMS_PATH: &str = "ARCHIVE_TRACKING_PARAMS_PATH";
pub const DEFAULT_TRACKING_PARAMS_PATHS: &[&str] =
    &["config/tracking_params.toml", "config/tracking_params.json"];

/// Query parameters stripped before fingerprinting when no config file exists.
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &[
    "utm", "utm_*", "source", "fbclid", "gclid", "mc_cid", "mc_eid", "ref", "sk",
];

/// Query parameter names that only carry tracking data.
///
/// An entry ending in `*` matches by prefix (`utm_*` covers `utm_source`).
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingParams {
    exact: BTreeSet<String>,
    prefixes: BTreeSet<String>,
}

impl TrackingParams {
    pub fn from_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exact = BTreeSet::new();
        let mut prefixes = BTreeSet::new();
        for it in items {
            let t = it.as_ref().trim().to_ascii_lowercase();
            if t.is_empty() {
                continue;
            }
            match t.strip_suffix('*') {
                Some(p) if !p.is_empty() => {
                    prefixes.insert(p.to_string());
                }
                Some(_) => {}
                None => {
                    exact.insert(t);
                }
            }
        }
        Self { exact, prefixes }
    }

    pub fn is_tracking(&self, key: &str) -> bool {
        let k = key.trim().to_ascii_lowercase();
        self.exact.contains(&k) || self.prefixes.iter().any(|p| k.starts_with(p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self::from_list(DEFAULT_TRACKING_PARAMS)
    }
}

/// On-disk shapes: a TOML/JSON table with a `params` list, or a bare JSON
/// array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ParamsFile {
    Table { params: Vec<String> },
    List(Vec<String>),
}

impl From<ParamsFile> for TrackingParams {
    fn from(f: ParamsFile) -> Self {
        match f {
            ParamsFile::Table { params } | ParamsFile::List(params) => Self::from_list(params),
        }
    }
}

impl<'de> Deserialize<'de> for TrackingParams {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        ParamsFile::deserialize(d).map(Self::from)
    }
}

impl TrackingParams {
    /// Read a `.json` file as JSON and anything else as TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracking params from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing tracking params JSON {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("parsing tracking params TOML {}", path.display()))
        }
    }

    /// `$ARCHIVE_TRACKING_PARAMS_PATH` when set (it must exist), else the
    /// first shipped config file present, else the built-in list.
    pub fn load_default() -> Result<Self> {
        if let Some(p) = std::env::var_os(ENV_TRACKING_PARAMS_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_TRACKING_PARAMS_PATH} points to non-existent path"));
            }
            return Self::from_path(&pb);
        }
        match DEFAULT_TRACKING_PARAMS_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
        {
            Some(p) => Self::from_path(p),
            None => Ok(Self::default()),
        }
    }
}
