//! Batch entry point: `analyze(root) -> AnalysisResult`.
//!
//! Pipeline: discover and load sources, run the configured constant policy
//! and per-file analysis, merge every scope into one [`FileRecord`], resolve
//! include directives against an index of the tree, and expand the
//! dependency graph. A single bad file never aborts the run; its failures
//! become diagnostics.
//!
//! [`FileRecord`]: crudmap_core::model::FileRecord

pub mod discover;
pub mod passes;

use anyhow::{Context, Result};
use crudmap_core::config::{ConstantPolicy, CrudmapConfig};
use crudmap_core::diagnostics::Diagnostic;
use crudmap_core::error::AnalysisError;
use crudmap_core::model::{EdgeTarget, IncludeEdge};
use crudmap_core::report::AnalysisResult;
use crudmap_deps::{DependencyGraph, DirectInclude, FileIndex, IncludeResolver};
use crudmap_parser::{FileAnalysis, Knowledge};
use std::collections::BTreeSet;
use std::path::Path;

pub use discover::{LoadedSource, SourceFile};

/// Analyze every source file under `root`.
///
/// Errors only when the root is unusable, the configuration is invalid or a
/// configured name list cannot be read.
pub fn analyze(root: &Path, config: &CrudmapConfig) -> Result<AnalysisResult> {
    config.validate()?;
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot access analysis root {}", root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("analysis root is not a directory: {}", root.display());
    }
    let knowledge = Knowledge::from_config(config)?;
    tracing::info!(
        "analyzing {} ({} view(s), {} procedure(s) known, {:?} constants)",
        root.display(),
        knowledge.views.len(),
        knowledge.procedures.len(),
        config.engine.constant_policy
    );

    let mut result = AnalysisResult::new(root.to_string_lossy().replace('\\', "/"));
    let files = discover::collect_source_files(&root, config)?;
    let sources = discover::load_sources(files, &mut result.diagnostics);
    result.files_analyzed = sources.len();

    let (analyses, constants) = match config.engine.constant_policy {
        ConstantPolicy::TwoPass => passes::two_pass(&sources, &knowledge, &config.engine)?,
        ConstantPolicy::Streaming => passes::streaming(&sources, &knowledge),
    };
    tracing::debug!("{} constant(s) bound", constants.len());

    aggregate(&mut result, &analyses);
    let graph = resolve_includes(&root, config, &analyses, &mut result.diagnostics);
    result.edges = graph.expand_all(config.includes.max_depth);
    result.diagnostics.extend(circular_diagnostics(&result.edges));

    result.diagnostics.sort();
    result.diagnostics.dedup();

    let summary = result.summary();
    tracing::info!(
        "{} file(s), {} table reference(s), {} include edge(s) ({} unresolved, {} circular), {} diagnostic(s)",
        summary.files_analyzed,
        summary.table_references,
        summary.include_edges,
        summary.unresolved_edges,
        summary.circular_edges,
        summary.diagnostics
    );
    Ok(result)
}

/// Single merge point: set union per (file, scope, table).
fn aggregate(result: &mut AnalysisResult, analyses: &[FileAnalysis]) {
    for analysis in analyses {
        for (scope, tables) in &analysis.scopes {
            result.crud.merge_scope(&analysis.file, scope, tables);
        }
        result.diagnostics.extend(analysis.diagnostics.iter().cloned());
    }
}

fn resolve_includes(
    root: &Path,
    config: &CrudmapConfig,
    analyses: &[FileAnalysis],
    diagnostics: &mut Vec<Diagnostic>,
) -> DependencyGraph {
    let index = FileIndex::build(root);
    let resolver = IncludeResolver::new(&index, &config.includes, root);

    let mut graph = DependencyGraph::new();
    for analysis in analyses {
        for site in &analysis.includes {
            let resolution = resolver.resolve(&analysis.file, site);
            if let Some(e) = &resolution.diagnostic {
                diagnostics.push(Diagnostic::new(&analysis.file, e).at_line(site.line));
            }
            graph.add(DirectInclude {
                source: analysis.file.clone(),
                raw: site.raw.clone(),
                line: site.line,
                target: resolution.target,
                candidates: resolution.candidates.into_iter().map(|c| c.path).collect(),
            });
        }
    }
    tracing::debug!("{} direct include(s) resolved", graph.edge_count());
    graph
}

/// One diagnostic per circular directive, however many traversals hit it.
fn circular_diagnostics(edges: &[IncludeEdge]) -> Vec<Diagnostic> {
    let mut seen = BTreeSet::new();
    edges
        .iter()
        .filter_map(|edge| {
            let EdgeTarget::Circular(path) = &edge.target else {
                return None;
            };
            if !seen.insert((edge.source.as_str(), edge.line, path.as_str())) {
                return None;
            }
            let e = AnalysisError::CircularInclude { path: path.clone() };
            Some(Diagnostic::new(&edge.source, &e).at_line(edge.line))
        })
        .collect()
}
