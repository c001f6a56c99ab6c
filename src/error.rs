// src/error.rs
//! Error taxonomy for the archive core.
//!
//! Record- and rule-level errors are recoverable: the caller logs them and
//! keeps going. Query syntax and store corruption are structural and always
//! surface to the caller.

use std::fmt;
use std::path::PathBuf;

/// A raw record that carries no identity (neither title nor url).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record #{position} has neither a title nor a url")]
pub struct InvalidRecordError {
    /// 0-based position of the record within its batch.
    pub position: usize,
}

/// A tag rule that cannot take part in a classification run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleConfigurationError {
    #[error("rule `{tag}`: pattern `{pattern}` does not compile: {message}")]
    BadPattern {
        tag: String,
        pattern: String,
        message: String,
    },

    #[error("rule `{tag}` is defined more than once; later definition skipped")]
    DuplicateTag { tag: String },

    #[error("rule with empty tag id skipped")]
    EmptyTag,
}

impl RuleConfigurationError {
    /// Tag id of the offending rule, if it has one.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::BadPattern { tag, .. } | Self::DuplicateTag { tag } => Some(tag),
            Self::EmptyTag => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySyntaxKind {
    UnmatchedOpen,
    UnmatchedClose,
    EmptyGroup,
    MissingOperand,
    MissingOperator,
    NestingTooDeep,
}

impl fmt::Display for QuerySyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnmatchedOpen => "unmatched `(`",
            Self::UnmatchedClose => "unmatched `)`",
            Self::EmptyGroup => "empty group `()`",
            Self::MissingOperand => "operator is missing an operand",
            Self::MissingOperator => "expected `and`/`or` between terms",
            Self::NestingTooDeep => "groups are nested too deeply",
        };
        f.write_str(s)
    }
}

/// Parse failure of a boolean search query. `position` is a 0-based
/// character offset into the raw query string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("query syntax error at position {position}: {kind}")]
pub struct QuerySyntaxError {
    pub kind: QuerySyntaxKind,
    pub position: usize,
}

/// The persisted store exists but cannot be understood.
#[derive(Debug, thiserror::Error)]
#[error("store file {path} is corrupt: {message}")]
pub struct StoreCorruptionError {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Corruption(#[from] StoreCorruptionError),

    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),
}
