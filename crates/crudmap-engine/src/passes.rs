//! Constant visibility policies and the per-file analysis pass.
//!
//! Two-pass: a sequential discovery pre-pass binds every constant it can,
//! repeating while new constants appear (a constant built from one defined in
//! a later file needs another round), then the table is frozen and files are
//! analyzed in parallel. Streaming: files are analyzed in sorted order and a
//! constant is visible only to files after the one that defines it.

use crate::discover::LoadedSource;
use anyhow::{Context, Result};
use crudmap_core::config::EngineConfig;
use crudmap_core::constants::{ConstantTable, DefineOutcome};
use crudmap_core::diagnostics::Diagnostic;
use crudmap_core::error::AnalysisError;
use crudmap_parser::{FileAnalysis, Knowledge, analyze_file, discover_constants};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Run `f` for one file, turning a panic into an error for that file alone.
fn isolated<T>(file: &str, f: impl FnOnce() -> T) -> Result<T, AnalysisError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!("{}: analysis panicked: {}", file, message);
        AnalysisError::Aborted { message }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Bind constants from every file until a round adds nothing new.
pub fn discover_all(
    sources: &[LoadedSource],
    knowledge: &Knowledge,
    max_passes: usize,
) -> ConstantTable {
    let mut table = ConstantTable::new();
    for pass in 1..=max_passes.max(1) {
        let mut bound = 0;
        for source in sources {
            let discovered = isolated(&source.file.rel, || {
                discover_constants(
                    &source.file.rel,
                    &source.file.abs,
                    &source.text,
                    knowledge,
                    &table,
                )
            });
            // A panicking file is reported by the analysis pass.
            let Ok(defs) = discovered else {
                continue;
            };
            for def in defs {
                if table.define(def) == DefineOutcome::Bound {
                    bound += 1;
                }
            }
        }
        tracing::debug!("constant pass {}: {} new binding(s)", pass, bound);
        if bound == 0 {
            break;
        }
    }
    tracing::info!("{} constant(s) discovered", table.len());
    table
}

fn analyze_one(source: &LoadedSource, knowledge: &Knowledge, constants: &ConstantTable) -> FileAnalysis {
    let analysis = contain(&source.file.rel, || {
        analyze_file(
            &source.file.rel,
            &source.file.abs,
            &source.text,
            knowledge,
            constants,
        )
    });
    tracing::debug!(
        "{}: {} scope(s) with SQL, {} include(s), {} diagnostic(s)",
        analysis.file,
        analysis.scopes.len(),
        analysis.includes.len(),
        analysis.diagnostics.len()
    );
    analysis
}

/// A file whose analysis panics contributes only an `Aborted` diagnostic.
fn contain(file: &str, f: impl FnOnce() -> FileAnalysis) -> FileAnalysis {
    isolated(file, f).unwrap_or_else(|e| FileAnalysis {
        file: file.to_string(),
        diagnostics: vec![Diagnostic::new(file, &e)],
        ..FileAnalysis::default()
    })
}

/// Discover constants first, then analyze every file against the frozen table.
pub fn two_pass(
    sources: &[LoadedSource],
    knowledge: &Knowledge,
    engine: &EngineConfig,
) -> Result<(Vec<FileAnalysis>, ConstantTable)> {
    let constants = discover_all(sources, knowledge, engine.max_constant_passes);
    let run = || {
        sources
            .par_iter()
            .map(|source| analyze_one(source, knowledge, &constants))
            .collect::<Vec<_>>()
    };
    let analyses = if engine.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(engine.threads)
            .build()
            .context("failed to build analysis thread pool")?;
        pool.install(run)
    } else {
        run()
    };
    Ok((analyses, constants))
}

/// Analyze files one at a time; constants accumulate in file order.
pub fn streaming(sources: &[LoadedSource], knowledge: &Knowledge) -> (Vec<FileAnalysis>, ConstantTable) {
    let mut constants = ConstantTable::new();
    let mut analyses = Vec::with_capacity(sources.len());
    for source in sources {
        let analysis = analyze_one(source, knowledge, &constants);
        for def in &analysis.constants {
            constants.define(def.clone());
        }
        analyses.push(analysis);
    }
    (analyses, constants)
}
