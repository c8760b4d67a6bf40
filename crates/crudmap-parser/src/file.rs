//! Whole-file analysis: parse, partition into scopes, walk each scope,
//! classify SQL candidates and run the raw-text fallback where needed.

use crate::eval::{Evaluator, Layered};
use crate::knowledge::Knowledge;
use crate::php;
use crate::scope::{MAIN_SCOPE, enter_scopes};
use crate::sql::{classify_template, starts_with_sql_head};
use crate::walker::{IncludeSite, ScopeFindings, ScopeWalker};
use crudmap_core::constants::{ConstantDef, ConstantTable};
use crudmap_core::diagnostics::Diagnostic;
use crudmap_core::error::AnalysisError;
use crudmap_core::model::{Annotation, TableMap};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

/// Everything one file contributes to the run.
#[derive(Debug, Default)]
pub struct FileAnalysis {
    /// Root-relative path with `/` separators.
    pub file: String,
    pub scopes: BTreeMap<String, TableMap>,
    pub includes: Vec<IncludeSite>,
    /// Constants first bound by this file.
    pub constants: Vec<ConstantDef>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileAnalysis {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..Self::default()
        }
    }

    fn error(&mut self, error: &AnalysisError, line: Option<usize>) {
        let diagnostic = Diagnostic::new(&self.file, error);
        self.diagnostics.push(match line {
            Some(line) => diagnostic.at_line(line),
            None => diagnostic,
        });
    }

    /// One diagnostic per table name that folded to a hole.
    fn unresolved(&mut self, tables: &TableMap, line: usize) {
        for reference in tables.iter().filter(|r| r.is(Annotation::Unresolved)) {
            let e = AnalysisError::UnresolvedReference {
                name: reference.name.clone(),
            };
            self.error(&e, Some(line));
        }
    }

    fn merge(&mut self, scope: &str, tables: &TableMap) {
        if tables.is_empty() {
            return;
        }
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .merge(tables);
    }
}

/// A walked scope, detached from the syntax tree.
struct WalkedScope {
    name: String,
    line: usize,
    has_error: bool,
    segments: Vec<Range<usize>>,
    findings: ScopeFindings,
}

fn walk_file(
    file: &str,
    path: &Path,
    source: &str,
    knowledge: &Knowledge,
    constants: &ConstantTable,
) -> Result<(Vec<WalkedScope>, ConstantTable), AnalysisError> {
    let tree = php::parse_file(path, source)?;
    let scopes = enter_scopes(&tree, source);
    let eval = Evaluator::new(
        source,
        path.to_string_lossy().replace('\\', "/"),
        knowledge.max_fold_depth,
    );

    let mut overlay = ConstantTable::new();
    let mut walked = Vec::with_capacity(scopes.len());
    for scope in &scopes {
        let walker = ScopeWalker::new(
            &eval,
            constants,
            &mut overlay,
            file,
            scope.class.as_deref(),
        );
        let findings = walker.walk(&scope.statements);
        tracing::debug!(
            "{}::{}: {} candidate(s), {} include(s)",
            file,
            scope.name,
            findings.candidates.len(),
            findings.includes.len()
        );
        walked.push(WalkedScope {
            name: scope.name.clone(),
            line: scope.line,
            has_error: scope.has_error,
            segments: scope.own_segments(),
            findings,
        });
    }
    Ok((walked, overlay))
}

/// Analyze one file against the constants known so far.
///
/// `file` is the root-relative path used in the report; `path` is what
/// `__FILE__` folds to. Never fails: every problem becomes a diagnostic.
pub fn analyze_file(
    file: &str,
    path: &Path,
    source: &str,
    knowledge: &Knowledge,
    constants: &ConstantTable,
) -> FileAnalysis {
    let mut analysis = FileAnalysis::new(file);

    let (scopes, overlay) = match walk_file(file, path, source, knowledge, constants) {
        Ok(walked) => walked,
        Err(e) => {
            tracing::warn!("{}: {}", file, e);
            analysis.error(&e, None);
            let tables = fallback(&mut analysis, &[0..source.len()], source, knowledge, constants);
            analysis.merge(MAIN_SCOPE, &tables);
            return analysis;
        }
    };
    let lookup = Layered {
        base: constants,
        overlay: &overlay,
    };

    for scope in scopes {
        let mut tables = TableMap::new();
        for candidate in &scope.findings.candidates {
            match classify_template(&candidate.template, knowledge, &lookup) {
                Ok(found) => {
                    analysis.unresolved(&found, candidate.line);
                    tables.merge(&found);
                }
                Err(e) => {
                    tracing::debug!("{}:{}: {}", file, candidate.line, e);
                    analysis.error(&e, Some(candidate.line));
                }
            }
        }

        if scope.has_error {
            let e = AnalysisError::Syntax {
                scope: scope.name.clone(),
                message: "parse errors in scope; raw-text fallback applied".to_string(),
            };
            tracing::warn!("{}: {}", file, e);
            analysis.error(&e, Some(scope.line));
        }
        if scope.findings.candidates.is_empty() || scope.has_error {
            let found = fallback(&mut analysis, &scope.segments, source, knowledge, &lookup);
            tables.merge(&found);
        }

        for (e, line) in &scope.findings.errors {
            analysis.error(e, Some(*line));
        }
        analysis.merge(&scope.name, &tables);
        analysis.includes.extend(scope.findings.includes);
        analysis.constants.extend(scope.findings.constants);
    }
    analysis
}

/// Classify SQL-shaped string literals found in the raw text of `segments`.
fn fallback(
    analysis: &mut FileAnalysis,
    segments: &[Range<usize>],
    source: &str,
    knowledge: &Knowledge,
    constants: &dyn crate::eval::ConstantLookup,
) -> TableMap {
    let mut tables = TableMap::new();
    for segment in segments {
        let Some(text) = source.get(segment.clone()) else {
            continue;
        };
        for raw in knowledge.patterns.scan(text) {
            if !starts_with_sql_head(raw.template.leading_text()) {
                continue;
            }
            let line = line_at(source, segment.start + raw.offset);
            match classify_template(&raw.template, knowledge, constants) {
                Ok(found) => {
                    analysis.unresolved(&found, line);
                    tables.merge(&found);
                }
                Err(e) => analysis.error(&e, Some(line)),
            }
        }
    }
    if !tables.is_empty() {
        tracing::debug!("{}: fallback recovered {} table(s)", analysis.file, tables.len());
    }
    tables
}

fn line_at(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

/// Constants a file binds, without classifying any SQL.
pub fn discover_constants(
    file: &str,
    path: &Path,
    source: &str,
    knowledge: &Knowledge,
    constants: &ConstantTable,
) -> Vec<ConstantDef> {
    match walk_file(file, path, source, knowledge, constants) {
        Ok((scopes, _)) => scopes
            .into_iter()
            .flat_map(|s| s.findings.constants)
            .collect(),
        Err(_) => Vec::new(),
    }
}
