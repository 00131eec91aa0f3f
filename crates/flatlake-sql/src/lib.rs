//! # flatlake-sql
//!
//! Translates free-form natural-language questions into restricted,
//! injection-safe SELECT statements against a known column schema.
//!
//! Two layers:
//!
//! - [`RuleTranslator`]: a deterministic, ordered rule chain that always
//!   produces a statement (counting, recency, grouping, equality filters,
//!   and a bounded default scan).
//! - [`TranslatorChain`]: strategy composition. An optional external
//!   [`SqlGenerator`] (typically model-backed) is consulted first and its
//!   candidate subjected to [`safety::verify_select`]; on absence, error, or
//!   failed verification the chain falls back to the rule translator.
//!
//! Every identifier emitted into a statement is verified against the target
//! table's schema, and literal values only ever pass through
//! [`safety::escape_literal`] — raw user text is never concatenated in.

pub mod safety;
pub mod translator;

pub use safety::{escape_literal, quote_ident, referenced_tables, verify_select};
pub use translator::{RuleTranslator, SqlGenerator, SqlStatement, TranslatorChain};
