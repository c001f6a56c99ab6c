// src/filter.rs
//! Query + tag-set filtering over the store (the browse view's predicate).

use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::query::{self, Query, SearchField};
use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// Article carries at least one selected tag.
    #[default]
    Any,
    /// Article carries every selected tag.
    All,
}

impl FromStr for TagMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(anyhow!("unknown tag mode '{other}' (expected any|all)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArticleFilter {
    query: Query,
    tags: BTreeSet<String>,
    mode: TagMode,
    fields: Vec<SearchField>,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self::new(Query::match_all(), BTreeSet::new(), TagMode::Any)
    }
}

impl ArticleFilter {
    /// Filter that searches titles only.
    pub fn new(query: Query, tags: BTreeSet<String>, mode: TagMode) -> Self {
        Self {
            query,
            tags,
            mode,
            fields: vec![SearchField::Title],
        }
    }

    pub fn with_fields(mut self, fields: Vec<SearchField>) -> Self {
        if !fields.is_empty() {
            self.fields = fields;
        }
        self
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn mode(&self) -> TagMode {
        self.mode
    }

    fn tags_match(&self, article: &Article) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        match self.mode {
            TagMode::Any => self.tags.iter().any(|t| article.has_tag(t)),
            TagMode::All => self.tags.iter().all(|t| article.has_tag(t)),
        }
    }

    /// Tag filter first (cheap), then the query.
    pub fn matches(&self, article: &Article) -> bool {
        self.tags_match(article) && query::matches(&self.query, article, &self.fields)
    }

    /// Borrowing closure form, for `Iterator::filter` and friends.
    pub fn predicate(&self) -> impl Fn(&&Article) -> bool + '_ {
        move |a: &&Article| self.matches(a)
    }

    /// Matching articles in canonical order, or oldest first when `reverse`.
    pub fn apply<'s>(&self, store: &'s Store, reverse: bool) -> Vec<&'s Article> {
        let mut out: Vec<&Article> = store
            .sorted()
            .into_iter()
            .filter(self.predicate())
            .collect();
        if reverse {
            out.reverse();
        }
        out
    }
}
