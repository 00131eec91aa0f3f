//! Natural-language to SQL translation.
//!
//! The rule chain is evaluated in order, first match wins, and always ends
//! in a bounded default scan — translation is a total function. Cues are
//! matched on lowercased, whitespace-normalized text; literal values are
//! recovered case-preserved from the original text and escaped before they
//! touch the statement.

use std::fmt;
use std::sync::Arc;

use flatlake_commons::{ColumnSchema, TableName};

use crate::safety::{self, escape_literal, quote_ident};

/// Default LIMIT for the recency rule when the text carries no number.
const DEFAULT_RECENCY_LIMIT: u64 = 10;

/// LIMIT applied by the default full-scan rule.
const DEFAULT_SCAN_LIMIT: u64 = 50;

/// A read-only statement produced by translation, bound to the table it was
/// generated for. Every identifier inside was verified against that table's
/// schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    sql: String,
    table: TableName,
}

impl SqlStatement {
    pub(crate) fn new(sql: String, table: TableName) -> Self {
        Self { sql, table }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn into_sql(self) -> String {
        self.sql
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Strategy seam for an external (typically model-backed) translator.
///
/// Implementations may be non-deterministic and may fail; a `None` return
/// means "no candidate". Whatever they produce is verified against the
/// schema before use, so a misbehaving generator can degrade quality but
/// never safety.
pub trait SqlGenerator: Send + Sync {
    fn generate(&self, table: &TableName, schema: &ColumnSchema, text: &str) -> Option<String>;
}

/// Deterministic rule-based translator. Always produces a statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTranslator;

impl RuleTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Translate `text` into a statement against `table`. Rules in order:
    /// count, recency, grouping, equality filter, bounded default scan.
    pub fn translate(&self, table: &TableName, schema: &ColumnSchema, text: &str) -> SqlStatement {
        let tokens = tokenize(text);
        let sql = self
            .count_rule(table, schema, &tokens)
            .or_else(|| self.recency_rule(table, schema, &tokens))
            .or_else(|| self.grouping_rule(table, schema, &tokens))
            .or_else(|| self.filter_rule(table, schema, &tokens))
            .unwrap_or_else(|| {
                format!("SELECT * FROM {} LIMIT {}", table, DEFAULT_SCAN_LIMIT)
            });
        SqlStatement::new(sql, table.clone())
    }

    /// "how many ...", "count ..." — aggregate count, optionally filtered.
    /// Defers to the grouping rule when the text names a groupable column
    /// ("count by status" groups rather than counts).
    fn count_rule(
        &self,
        table: &TableName,
        schema: &ColumnSchema,
        tokens: &[Token],
    ) -> Option<String> {
        let cued = has_bigram(tokens, "how", "many") || has_word(tokens, "count");
        if !cued || grouping_target(tokens, schema).is_some() {
            return None;
        }
        let mut sql = format!("SELECT COUNT(*) FROM {}", table);
        if let Some((column, value)) = equality_pair(tokens, schema) {
            sql.push_str(&format!(
                " WHERE {} = {}",
                quote_ident(&column),
                render_literal(&value)
            ));
        }
        Some(sql)
    }

    /// "latest", "recent", "top N", "first N" — newest-first scan. The sort
    /// key is the first timestamp-looking column, else the first column.
    fn recency_rule(
        &self,
        table: &TableName,
        schema: &ColumnSchema,
        tokens: &[Token],
    ) -> Option<String> {
        let cued = ["latest", "recent", "top", "first"]
            .into_iter()
            .any(|cue| has_word(tokens, cue));
        if !cued {
            return None;
        }
        let sort_column = schema
            .first_timestamp_like()
            .or_else(|| schema.first_column())?;
        let limit = tokens
            .iter()
            .find_map(|t| t.lower.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RECENCY_LIMIT);
        Some(format!(
            "SELECT * FROM {} ORDER BY {} DESC LIMIT {}",
            table,
            quote_ident(&sort_column.name),
            limit
        ))
    }

    /// "group by X", "count by X", "per X" — grouped counts, only when X is
    /// a known column; otherwise the rule falls through.
    fn grouping_rule(
        &self,
        table: &TableName,
        schema: &ColumnSchema,
        tokens: &[Token],
    ) -> Option<String> {
        let column = grouping_target(tokens, schema)?;
        let ident = quote_ident(&column);
        Some(format!(
            "SELECT {}, COUNT(*) FROM {} GROUP BY {}",
            ident, table, ident
        ))
    }

    /// "<column> <value>" with optional filler ("is", "equals", "=") —
    /// equality filter over a recognized column.
    fn filter_rule(
        &self,
        table: &TableName,
        schema: &ColumnSchema,
        tokens: &[Token],
    ) -> Option<String> {
        let (column, value) = equality_pair(tokens, schema)?;
        Some(format!(
            "SELECT * FROM {} WHERE {} = {}",
            table,
            quote_ident(&column),
            render_literal(&value)
        ))
    }
}

/// Translation strategy chain: optional external generator, verified, with
/// the rule translator as the guaranteed tail. Total — never errors.
#[derive(Default)]
pub struct TranslatorChain {
    external: Option<Arc<dyn SqlGenerator>>,
    rules: RuleTranslator,
}

impl TranslatorChain {
    /// Rule-based translation only.
    pub fn new() -> Self {
        Self {
            external: None,
            rules: RuleTranslator::new(),
        }
    }

    /// Consult `generator` first; its output must pass safety verification
    /// or the chain falls back to the rules.
    pub fn with_external(generator: Arc<dyn SqlGenerator>) -> Self {
        Self {
            external: Some(generator),
            rules: RuleTranslator::new(),
        }
    }

    pub fn translate(&self, table: &TableName, schema: &ColumnSchema, text: &str) -> SqlStatement {
        if let Some(generator) = &self.external {
            if let Some(candidate) = generator.generate(table, schema, text) {
                let cleaned = clean_candidate(&candidate);
                match safety::verify_select(&cleaned, table, schema) {
                    Ok(()) => {
                        log::debug!("external translation accepted for '{}'", table);
                        return SqlStatement::new(cleaned, table.clone());
                    }
                    Err(e) => {
                        log::warn!(
                            "external translation rejected ({}); using rule translator",
                            e
                        );
                    }
                }
            }
        }
        self.rules.translate(table, schema, text)
    }
}

/// Strip markdown fences and trailing semicolons from a generated candidate.
/// Model output regularly arrives wrapped in a ```sql block.
fn clean_candidate(candidate: &str) -> String {
    let mut sql = candidate.trim();
    if sql.starts_with("```") {
        sql = sql.trim_start_matches("```sql").trim_start_matches("```");
        if let Some(end) = sql.rfind("```") {
            sql = &sql[..end];
        }
    }
    sql.trim().trim_end_matches(';').trim().to_string()
}

/// One token of the question: lowercased form for cue matching, original
/// form for literal extraction.
#[derive(Debug, Clone)]
struct Token {
    lower: String,
    original: String,
}

/// Filler words skipped between a column name and its value.
const FILLERS: &[&str] = &["is", "are", "equals", "equal", "to", "the", "of", "="];

fn tokenize(text: &str) -> Vec<Token> {
    text.split(|c: char| {
        !(c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '=' || c == '\'')
    })
    .map(|s| s.trim_matches('\'').trim_end_matches('.'))
    .filter(|s| !s.is_empty())
    .map(|s| Token {
        lower: s.to_lowercase(),
        original: s.to_string(),
    })
    .collect()
}

fn has_word(tokens: &[Token], word: &str) -> bool {
    tokens.iter().any(|t| t.lower == word)
}

fn has_bigram(tokens: &[Token], first: &str, second: &str) -> bool {
    tokens
        .windows(2)
        .any(|w| w[0].lower == first && w[1].lower == second)
}

/// Resolve the column named after a grouping cue ("group by X", "count by
/// X", "per X"). Exact case-insensitive schema match; anything else is no
/// target.
fn grouping_target(tokens: &[Token], schema: &ColumnSchema) -> Option<String> {
    let mut candidate_positions = Vec::new();
    for (i, window) in tokens.windows(2).enumerate() {
        if (window[0].lower == "group" || window[0].lower == "count") && window[1].lower == "by" {
            candidate_positions.push(i + 2);
        }
    }
    for (i, token) in tokens.iter().enumerate() {
        if token.lower == "per" {
            candidate_positions.push(i + 1);
        }
    }
    candidate_positions.sort_unstable();
    for pos in candidate_positions {
        if let Some(token) = tokens.get(pos) {
            if let Some(column) = schema.resolve(&token.lower) {
                return Some(column.name.clone());
            }
        }
    }
    None
}

/// Scan for "<column> [filler] <value>". Columns match by exact name or by
/// suffix-stripped alias (`vendor_name` answers to "vendor"). The value is
/// the original-case token.
fn equality_pair(tokens: &[Token], schema: &ColumnSchema) -> Option<(String, String)> {
    for (i, token) in tokens.iter().enumerate() {
        let matched = schema.resolve(&token.lower).or_else(|| {
            schema
                .iter()
                .find(|c| suffix_stripped(&c.name).eq_ignore_ascii_case(&token.lower))
        });
        let Some(column) = matched else { continue };
        // A column mention with nothing after it is not a filter.
        let Some(value) = tokens[i + 1..]
            .iter()
            .find(|t| !FILLERS.contains(&t.lower.as_str()))
        else {
            continue;
        };
        return Some((column.name.clone(), value.original.clone()));
    }
    None
}

/// `vendor_name` -> `vendor`; names without an underscore are unchanged.
fn suffix_stripped(name: &str) -> &str {
    match name.rfind('_') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// Numbers pass through bare; everything else is escaped text.
fn render_literal(value: &str) -> String {
    if value.parse::<i64>().is_ok() || value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        escape_literal(value)
    }
}
