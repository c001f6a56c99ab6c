// src/classify/mod.rs
//! Rule-based multi-label classification.
//!
//! For every rule the score of an article is the number of distinct keywords
//! found in its title plus the weight of every pattern that matches the
//! title. A tag is assigned when its score reaches the rule's threshold.
//! Rules never see each other's scores, so the tag set does not depend on
//! rule order and editing one rule cannot change another's outcome.

pub mod rules;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};

use crate::article::Article;
use crate::error::RuleConfigurationError;
use crate::store::Store;
pub use rules::{PatternRule, RuleTable, TagRule};

#[derive(Debug)]
struct CompiledRule {
    tag: String,
    keywords: Vec<String>,
    patterns: Vec<(Regex, f32)>,
    threshold: f32,
}

impl CompiledRule {
    fn compile(rule: &TagRule) -> Result<Self, RuleConfigurationError> {
        let tag = rule.tag.trim();
        if tag.is_empty() {
            return Err(RuleConfigurationError::EmptyTag);
        }

        let mut seen = HashSet::new();
        let keywords = rule
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();

        let patterns = rule
            .patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(&p.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, p.weight))
                    .map_err(|e| RuleConfigurationError::BadPattern {
                        tag: tag.to_string(),
                        pattern: p.pattern.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tag: tag.to_string(),
            keywords,
            patterns,
            threshold: rule.threshold,
        })
    }

    fn score(&self, text: &str, lowered: &str) -> f32 {
        let keyword_hits = self
            .keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .count() as f32;
        let pattern_weight: f32 = self
            .patterns
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, w)| *w)
            .sum();
        keyword_hits * 1.0 + pattern_weight
    }
}

/// Tags assigned to one article, with the score of every rule that scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub tags: BTreeSet<String>,
    pub scores: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationReport {
    pub articles: usize,
    pub tagged: usize,
    pub multi_tagged: usize,
    pub tag_counts: BTreeMap<String, usize>,
}

/// Compiled, immutable rule table.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<CompiledRule>,
    warnings: Vec<RuleConfigurationError>,
}

impl Classifier {
    /// Compile `table`. Rules that fail to compile are reported once (log +
    /// `warnings()`) and left out; the remaining rules are unaffected.
    pub fn new(table: &RuleTable) -> Self {
        let mut rules: Vec<CompiledRule> = Vec::with_capacity(table.rules.len());
        let mut warnings = Vec::new();

        for rule in &table.rules {
            let compiled = CompiledRule::compile(rule).and_then(|c| {
                if rules.iter().any(|r| r.tag == c.tag) {
                    Err(RuleConfigurationError::DuplicateTag { tag: c.tag })
                } else {
                    Ok(c)
                }
            });
            match compiled {
                Ok(c) => rules.push(c),
                Err(e) => {
                    warn!(error = %e, "tag rule skipped");
                    warnings.push(e);
                }
            }
        }

        Self { rules, warnings }
    }

    pub fn warnings(&self) -> &[RuleConfigurationError] {
        &self.warnings
    }

    /// Tags this classifier can assign, in table order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.tag.as_str())
    }

    pub fn classify_text(&self, text: &str) -> Classification {
        let lowered = text.to_lowercase();
        let mut out = Classification::default();
        for rule in &self.rules {
            let score = rule.score(text, &lowered);
            if score > 0.0 {
                out.scores.insert(rule.tag.clone(), score);
            }
            if score >= rule.threshold {
                out.tags.insert(rule.tag.clone());
            }
        }
        out
    }

    pub fn classify_article(&self, article: &Article) -> Classification {
        self.classify_text(&article.title)
    }

    /// Recompute the tag set of every article in `store`.
    pub fn classify_store(&self, store: &mut Store) -> ClassificationReport {
        let mut report = ClassificationReport {
            articles: store.len(),
            ..Default::default()
        };

        store.retag(|a| {
            let tags = self.classify_article(a).tags;
            if !tags.is_empty() {
                report.tagged += 1;
            }
            if tags.len() > 1 {
                report.multi_tagged += 1;
            }
            for t in &tags {
                *report.tag_counts.entry(t.clone()).or_insert(0) += 1;
            }
            tags
        });

        info!(
            articles = report.articles,
            tagged = report.tagged,
            multi_tagged = report.multi_tagged,
            tags = report.tag_counts.len(),
            "classification pass finished"
        );
        report
    }
}
