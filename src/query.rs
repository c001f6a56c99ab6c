// src/query.rs
//! Boolean search expressions.
//!
//! ```text
//! Expr    := OrExpr
//! OrExpr  := AndExpr ("or" AndExpr)*
//! AndExpr := Term ("and" Term)*
//! Term    := Literal | "(" Expr ")"
//! ```
//!
//! `and`/`or` are operators only as whole words (any case) delimited by
//! whitespace, parentheses or the ends of the input. Every other run of
//! characters is part of a literal, so `android` and `orange` stay literals.
//! Literals match as case-insensitive substrings of the haystack.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::error::{QuerySyntaxError, QuerySyntaxKind};

/// Joins haystack fields; literals never contain it, so no match can span
/// two fields.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Deepest parenthesised group a query may contain.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Lowercased literal text.
    Literal(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// Evaluate against an already-lowercased haystack. `And`/`Or` stop at
    /// the first decisive operand.
    pub fn eval(&self, haystack_lower: &str) -> bool {
        match self {
            Expr::Literal(s) => haystack_lower.contains(s.as_str()),
            Expr::And(xs) => xs.iter().all(|x| x.eval(haystack_lower)),
            Expr::Or(xs) => xs.iter().any(|x| x.eval(haystack_lower)),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, xs: &[Expr], op: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{x}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(s) => write!(f, "{s:?}"),
            Expr::And(xs) => write_joined(f, xs, "and"),
            Expr::Or(xs) => write_joined(f, xs, "or"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open(usize),
    Close(usize),
    And(usize),
    Or(usize),
    Literal { text: String, start: usize },
}

impl Token {
    fn position(&self) -> usize {
        match self {
            Token::Open(p) | Token::Close(p) | Token::And(p) | Token::Or(p) => *p,
            Token::Literal { start, .. } => *start,
        }
    }
}

/// Split into words and parentheses, then fold runs of plain words into a
/// single literal. Whitespace between the words collapses to one space,
/// the same way stored titles are normalized.
fn tokenize(chars: &[char]) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    // (start, end) of the literal being accumulated
    let mut pending: Option<(usize, usize)> = None;

    let flush = |pending: &mut Option<(usize, usize)>, out: &mut Vec<Token>| {
        if let Some((start, end)) = pending.take() {
            let text: String = chars[start..end].iter().collect();
            let words: Vec<&str> = text.split_whitespace().collect();
            out.push(Token::Literal {
                text: words.join(" ").to_lowercase(),
                start,
            });
        }
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '(' || c == ')' {
            flush(&mut pending, &mut out);
            out.push(if c == '(' { Token::Open(i) } else { Token::Close(i) });
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        if word.eq_ignore_ascii_case("and") {
            flush(&mut pending, &mut out);
            out.push(Token::And(start));
        } else if word.eq_ignore_ascii_case("or") {
            flush(&mut pending, &mut out);
            out.push(Token::Or(start));
        } else {
            pending = match pending {
                Some((s, _)) => Some((s, i)),
                None => Some((start, i)),
            };
        }
    }
    flush(&mut pending, &mut out);
    out
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn err(kind: QuerySyntaxKind, position: usize) -> QuerySyntaxError {
        QuerySyntaxError { kind, position }
    }

    fn parse_or(&mut self) -> Result<Expr, QuerySyntaxError> {
        let mut xs = vec![self.parse_and()?];
        while let Some(Token::Or(_)) = self.peek() {
            self.pos += 1;
            xs.push(self.parse_and()?);
        }
        Ok(if xs.len() == 1 { xs.remove(0) } else { Expr::Or(xs) })
    }

    fn parse_and(&mut self) -> Result<Expr, QuerySyntaxError> {
        let mut xs = vec![self.parse_term()?];
        while let Some(Token::And(_)) = self.peek() {
            self.pos += 1;
            xs.push(self.parse_term()?);
        }
        Ok(if xs.len() == 1 { xs.remove(0) } else { Expr::And(xs) })
    }

    fn parse_term(&mut self) -> Result<Expr, QuerySyntaxError> {
        let tok = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(Self::err(QuerySyntaxKind::MissingOperand, self.end)),
        };
        match tok {
            Token::Literal { text, .. } => {
                self.pos += 1;
                Ok(Expr::Literal(text))
            }
            Token::And(p) | Token::Or(p) => Err(Self::err(QuerySyntaxKind::MissingOperand, p)),
            Token::Close(p) if self.depth == 0 => {
                Err(Self::err(QuerySyntaxKind::UnmatchedClose, p))
            }
            Token::Close(p) => Err(Self::err(QuerySyntaxKind::MissingOperand, p)),
            Token::Open(open) => {
                self.pos += 1;
                if let Some(Token::Close(_)) = self.peek() {
                    return Err(Self::err(QuerySyntaxKind::EmptyGroup, open));
                }
                if self.depth >= MAX_NESTING {
                    return Err(Self::err(QuerySyntaxKind::NestingTooDeep, open));
                }
                self.depth += 1;
                let inner = self.parse_or()?;
                match self.peek() {
                    Some(Token::Close(_)) => {
                        self.pos += 1;
                        self.depth -= 1;
                        Ok(inner)
                    }
                    None => Err(Self::err(QuerySyntaxKind::UnmatchedOpen, open)),
                    Some(t) => Err(Self::err(QuerySyntaxKind::MissingOperator, t.position())),
                }
            }
        }
    }
}

/// A parsed search expression. The empty query matches everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    expr: Option<Expr>,
}

impl Query {
    pub fn parse(raw: &str) -> Result<Self, QuerySyntaxError> {
        let chars: Vec<char> = raw.chars().collect();
        let tokens = tokenize(&chars);
        if tokens.is_empty() {
            return Ok(Self::match_all());
        }

        let mut p = Parser {
            tokens,
            pos: 0,
            depth: 0,
            end: chars.len(),
        };
        let expr = p.parse_or()?;
        if let Some(t) = p.peek() {
            let kind = match t {
                Token::Close(_) => QuerySyntaxKind::UnmatchedClose,
                _ => QuerySyntaxKind::MissingOperator,
            };
            return Err(Parser::err(kind, t.position()));
        }

        Ok(Self {
            raw: raw.to_string(),
            expr: Some(expr),
        })
    }

    pub fn match_all() -> Self {
        Self {
            raw: String::new(),
            expr: None,
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.expr.is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    pub fn matches(&self, haystack: &str) -> bool {
        match &self.expr {
            None => true,
            Some(e) => e.eval(&haystack.to_lowercase()),
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::match_all()
    }
}

impl FromStr for Query {
    type Err = QuerySyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::parse(s)
    }
}

/// Article fields a query can search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Url,
    Tags,
}

impl FromStr for SearchField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "url" | "link" => Ok(Self::Url),
            "tags" | "tag" => Ok(Self::Tags),
            other => Err(anyhow!("unknown search field '{other}'")),
        }
    }
}

/// Parse a comma list such as `"title,url"`; empty entries are ignored and
/// duplicates collapse. An empty list falls back to `[Title]`.
pub fn parse_fields(list: &str) -> anyhow::Result<Vec<SearchField>> {
    let mut out = Vec::new();
    for part in list.split(',').filter(|p| !p.trim().is_empty()) {
        let f: SearchField = part.parse()?;
        if !out.contains(&f) {
            out.push(f);
        }
    }
    if out.is_empty() {
        out.push(SearchField::Title);
    }
    Ok(out)
}

/// Lowercased text a query runs against.
pub fn haystack(article: &Article, fields: &[SearchField]) -> String {
    let mut out = String::new();
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        match f {
            SearchField::Title => out.push_str(&article.title),
            SearchField::Url => out.push_str(article.url.as_deref().unwrap_or("")),
            SearchField::Tags => {
                let tags: Vec<&str> = article.tags.iter().map(String::as_str).collect();
                out.push_str(&tags.join(" "));
            }
        }
    }
    out.to_lowercase()
}

pub fn matches(query: &Query, article: &Article, fields: &[SearchField]) -> bool {
    match &query.expr {
        None => true,
        Some(e) => e.eval(&haystack(article, fields)),
    }
}
