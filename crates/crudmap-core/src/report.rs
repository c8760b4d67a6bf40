//! The complete result of one analysis run.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::model::{CrudRow, EdgeTarget, FileRecord, IncludeEdge};
use serde::{Deserialize, Serialize};

pub const REPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub version: String,
    /// Analysis root; every file key is relative to it with `/` separators.
    pub root: String,
    pub files_analyzed: usize,
    pub crud: FileRecord,
    pub edges: Vec<IncludeEdge>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Aggregate counts for summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub files_analyzed: usize,
    pub files_with_sql: usize,
    pub table_references: usize,
    pub include_edges: usize,
    pub unresolved_edges: usize,
    pub circular_edges: usize,
    pub diagnostics: usize,
}

impl AnalysisResult {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            version: REPORT_VERSION.to_string(),
            root: root.into(),
            files_analyzed: 0,
            crud: FileRecord::new(),
            edges: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn crud_rows(&self) -> Vec<CrudRow> {
        self.crud.rows()
    }

    /// `(file, raw target, resolved | UNRESOLVED | CIRCULAR, depth)` rows.
    pub fn edge_rows(&self) -> Vec<(&str, &str, &str, usize)> {
        self.edges
            .iter()
            .map(|e| (e.source.as_str(), e.raw.as_str(), e.target.label(), e.depth))
            .collect()
    }

    /// `(file, message)` rows; the file carries `:line` when known.
    pub fn diagnostic_rows(&self) -> Vec<(String, &str)> {
        self.diagnostics
            .iter()
            .map(|d| {
                let location = match d.line {
                    Some(line) => format!("{}:{}", d.file, line),
                    None => d.file.clone(),
                };
                (location, d.message.as_str())
            })
            .collect()
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            files_analyzed: self.files_analyzed,
            files_with_sql: self.crud.files().count(),
            table_references: self.crud.reference_count(),
            include_edges: self.edges.len(),
            unresolved_edges: self
                .edges
                .iter()
                .filter(|e| e.target == EdgeTarget::Unresolved)
                .count(),
            circular_edges: self
                .edges
                .iter()
                .filter(|e| matches!(e.target, EdgeTarget::Circular(_)))
                .count(),
            diagnostics: self.diagnostics.len(),
        }
    }
}
