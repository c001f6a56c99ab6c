// src/article.rs
//! The unit of record kept by the archive.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// An article as stored in the archive.
///
/// `fingerprint` is the identity; two records with equal fingerprints are the
/// same article. `tags` belongs to classification and is replaced wholesale
/// on every classification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub fingerprint: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<NaiveDate>,
    pub received_date: NaiveDate,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub source_batch: String,
}

impl Article {
    /// Published date, or the received date when the source did not carry one.
    pub fn effective_published(&self) -> NaiveDate {
        self.published_date.unwrap_or(self.received_date)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Canonical listing order: newest published first, then newest received,
/// then fingerprint ascending. Total, so never depends on insertion order.
pub fn canonical_order(a: &Article, b: &Article) -> Ordering {
    b.effective_published()
        .cmp(&a.effective_published())
        .then_with(|| b.received_date.cmp(&a.received_date))
        .then_with(|| a.fingerprint.cmp(&b.fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(fp: &str, published: Option<&str>, received: &str) -> Article {
        Article {
            fingerprint: fp.into(),
            title: fp.to_uppercase(),
            url: None,
            published_date: published.map(|d| d.parse().unwrap()),
            received_date: received.parse().unwrap(),
            tags: BTreeSet::new(),
            source_batch: "b".into(),
        }
    }

    #[test]
    fn newest_published_sorts_first() {
        let a = art("a", Some("2024-01-01"), "2024-01-05");
        let b = art("b", Some("2024-02-01"), "2024-02-01");
        assert_eq!(canonical_order(&a, &b), Ordering::Greater);
    }

    #[test]
    fn missing_published_falls_back_to_received() {
        let a = art("a", None, "2024-03-01");
        let b = art("b", Some("2024-02-01"), "2024-02-01");
        assert_eq!(a.effective_published().to_string(), "2024-03-01");
        assert_eq!(canonical_order(&a, &b), Ordering::Less);
    }

    #[test]
    fn ties_break_on_received_then_fingerprint() {
        let a = art("a", Some("2024-01-01"), "2024-01-02");
        let b = art("b", Some("2024-01-01"), "2024-01-03");
        assert_eq!(canonical_order(&a, &b), Ordering::Greater);

        let c = art("c", Some("2024-01-01"), "2024-01-03");
        assert_eq!(canonical_order(&b, &c), Ordering::Less);
    }
}
