// src/store/persist.rs
//! On-disk form of the store: one JSON document whose `articles` member maps
//! fingerprint → article fields, in insertion order.
//!
//! Writes go to a sibling `*.json.tmp` file which is synced and then renamed
//! over the target, so a crash mid-write leaves the previous file intact.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::{Store, UpdateEntry};
use crate::article::Article;
use crate::error::{StoreCorruptionError, StoreError};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoreDocRef<'a> {
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
    total_unique_articles: usize,
    update_history: &'a [UpdateEntry],
    articles: ArticlesRef<'a>,
}

struct ArticlesRef<'a>(&'a [Article]);

impl Serialize for ArticlesRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for a in self.0 {
            map.serialize_entry(
                &a.fingerprint,
                &FieldsRef {
                    title: &a.title,
                    url: a.url.as_deref(),
                    published_date: a.published_date,
                    received_date: a.received_date,
                    tags: &a.tags,
                    source_batch: &a.source_batch,
                },
            )?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct FieldsRef<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_date: Option<NaiveDate>,
    received_date: NaiveDate,
    tags: &'a BTreeSet<String>,
    source_batch: &'a str,
}

#[derive(Deserialize)]
struct StoreDoc {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    update_history: Vec<UpdateEntry>,
    articles: OrderedArticles,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

#[derive(Deserialize)]
struct Fields {
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_date: Option<NaiveDate>,
    received_date: NaiveDate,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    source_batch: String,
}

/// Map entries in document order (a plain map type would re-sort them).
struct OrderedArticles(Vec<(String, Fields)>);

impl<'de> Deserialize<'de> for OrderedArticles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedArticles;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of fingerprint to article fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, Fields>()? {
                    out.push((k, v));
                }
                Ok(OrderedArticles(out))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl Store {
    /// Serialize the whole store as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&StoreDocRef {
            version: FORMAT_VERSION,
            created_at: self.created_at,
            last_updated: self.last_updated,
            total_unique_articles: self.articles.len(),
            update_history: &self.history,
            articles: ArticlesRef(&self.articles),
        })
    }

    /// Rebuild a store from its JSON form. The error string describes why
    /// the document is not a valid store.
    fn decode(bytes: &[u8]) -> Result<Store, String> {
        let doc: StoreDoc = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if doc.version > FORMAT_VERSION {
            return Err(format!("unsupported format version {}", doc.version));
        }

        let mut articles = Vec::with_capacity(doc.articles.0.len());
        let mut index = HashMap::with_capacity(doc.articles.0.len());
        for (fingerprint, f) in doc.articles.0 {
            if fingerprint.trim().is_empty() {
                return Err("article with empty fingerprint".to_string());
            }
            if f.title.trim().is_empty() {
                return Err(format!("article {fingerprint} has an empty title"));
            }
            if index.insert(fingerprint.clone(), articles.len()).is_some() {
                return Err(format!("fingerprint {fingerprint} appears more than once"));
            }
            articles.push(Article {
                fingerprint,
                title: f.title,
                url: f.url,
                published_date: f.published_date,
                received_date: f.received_date,
                tags: f.tags,
                source_batch: f.source_batch,
            });
        }

        Ok(Store {
            articles,
            index,
            created_at: doc.created_at,
            last_updated: doc.last_updated,
            history: doc.update_history,
        })
    }

    /// Load the store at `path`. A missing file is an empty store; an
    /// unreadable document is `StoreError::Corruption`, never an empty store.
    pub fn load(path: &Path) -> Result<Store, StoreError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no store file yet; starting empty");
                return Ok(Store::new());
            }
            Err(e) => return Err(e.into()),
        };

        let store = Store::decode(&bytes).map_err(|message| StoreCorruptionError {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::info!(path = %path.display(), articles = store.len(), "store loaded");
        Ok(store)
    }

    /// Write the store to `path` via temp file + atomic rename.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;

        let tmp = path.with_extension("json.tmp");
        let written = fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(json.as_bytes())?;
                f.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!(path = %path.display(), articles = self.len(), "store saved");
        Ok(())
    }
}
