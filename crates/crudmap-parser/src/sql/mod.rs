//! SQL Extractor & CRUD Classifier.
//!
//! A candidate fragment is a [`Template`] whose leading text starts with a SQL
//! head keyword. Holes are rendered as sentinel identifiers so the fragment
//! still lexes; after classification each table name is normalized: bound
//! constants substituted, schema qualifier stripped, sentinels mapped back to
//! the hole's source text (annotated `Unresolved`), unquoted names lowercased,
//! and known views annotated.

pub mod classify;
pub mod fallback;
pub mod lexer;

use crate::eval::{ConstantLookup, Template};
use crate::knowledge::Knowledge;
use classify::RawRef;
use crudmap_core::error::AnalysisError;
use crudmap_core::model::{Annotation, TableMap};

/// Leading keywords that mark a string as SQL.
pub const SQL_HEADS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "TRUNCATE", "WITH", "MERGE",
    "REPLACE", "CALL", "EXEC", "EXECUTE",
];

/// Fragments quoted in diagnostics are cut to this many characters.
const FRAGMENT_PREVIEW: usize = 80;

/// Whether `text` (the literal prefix of a candidate) opens with a SQL head keyword.
pub fn starts_with_sql_head(text: &str) -> bool {
    let text = text.trim_start().trim_start_matches(['(', ' ', '\t', '\r', '\n']);
    let word_len = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let word = &text[..word_len];
    let followed_by_word = text[word_len..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');
    !followed_by_word && SQL_HEADS.iter().any(|h| h.eq_ignore_ascii_case(word))
}

fn sentinel(index: usize) -> String {
    format!("__crudmap_hole_{}__", index)
}

/// Classify a plain SQL string.
pub fn classify_sql(
    sql: &str,
    knowledge: &Knowledge,
    constants: &dyn ConstantLookup,
) -> Result<TableMap, AnalysisError> {
    classify_template(&Template::text(sql), knowledge, constants)
}

/// Classify a possibly partial fragment into normalized table references.
pub fn classify_template(
    template: &Template,
    knowledge: &Knowledge,
    constants: &dyn ConstantLookup,
) -> Result<TableMap, AnalysisError> {
    let sql = template.render_with(|i, _| sentinel(i));
    let holes = template.holes();

    let toks = lexer::tokenize(&sql).map_err(|message| AnalysisError::SqlParse {
        fragment: preview(&sql),
        message,
    })?;

    let mut tables = TableMap::new();
    for raw in classify::classify(&toks, &knowledge.procedures) {
        normalize(raw, &holes, knowledge, constants, &mut tables);
    }
    tracing::debug!("classified fragment into {} table(s)", tables.len());
    Ok(tables)
}

fn normalize(
    raw: RawRef,
    holes: &[&str],
    knowledge: &Knowledge,
    constants: &dyn ConstantLookup,
    tables: &mut TableMap,
) {
    let last = raw.name.parts.len().saturating_sub(1);
    let joined = raw
        .name
        .parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let quoted = i == last && raw.name.quoted;
            match constants.constant(part) {
                Some(value) if !quoted => value.to_string(),
                _ => part.clone(),
            }
        })
        .collect::<Vec<_>>()
        .join(".");
    let table = joined.rsplit('.').next().unwrap_or(&joined);

    let mut unresolved = false;
    let mut name = knowledge
        .patterns
        .hole
        .replace_all(table, |caps: &regex::Captures| {
            unresolved = true;
            caps.get(1)
                .and_then(|n| n.as_str().parse::<usize>().ok())
                .and_then(|n| holes.get(n))
                .map_or_else(|| caps[0].to_string(), |h| (*h).to_string())
        })
        .into_owned();

    if name.is_empty() {
        return;
    }
    if knowledge.lowercase_tables && !raw.name.quoted && !unresolved {
        name = name.to_lowercase();
    }

    tables.entry(&name);
    for op in raw.operations {
        tables.add(&name, op);
    }
    for annotation in raw.annotations {
        tables.annotate(&name, annotation);
    }
    if unresolved {
        tables.annotate(&name, Annotation::Unresolved);
    } else if knowledge.views.contains(&name) {
        tables.annotate(&name, Annotation::View);
    }
}

fn preview(sql: &str) -> String {
    let mut out: String = sql.chars().take(FRAGMENT_PREVIEW).collect();
    if out.len() < sql.len() {
        out.push_str("...");
    }
    out
}
