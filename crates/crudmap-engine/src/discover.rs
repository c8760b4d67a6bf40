//! Source discovery and loading.

use anyhow::{Context, Result};
use crudmap_core::config::CrudmapConfig;
use crudmap_core::diagnostics::Diagnostic;
use crudmap_core::error::AnalysisError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// A file selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Root-relative with `/` separators; the key used in every report.
    pub rel: String,
    pub abs: PathBuf,
}

/// A source file with its text.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub file: SourceFile,
    pub text: String,
}

fn exclude_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        builder.add(Glob::new(p).with_context(|| format!("invalid exclude glob: {}", p))?);
    }
    Ok(Some(builder.build().context("invalid exclude glob set")?))
}

/// Files under `root` with an analyzed extension, sorted by relative path.
///
/// Honors `.gitignore`, hidden files, `.crudmapignore` and `source.exclude`.
pub fn collect_source_files(root: &Path, config: &CrudmapConfig) -> Result<Vec<SourceFile>> {
    let extensions = config.source_extensions();
    let exclude = exclude_set(&config.source.exclude)?;

    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .add_custom_ignore_filename(".crudmapignore")
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !extensions.contains(&ext) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        if let Some(ref exc) = exclude
            && exc.is_match(rel)
        {
            continue;
        }
        files.push(SourceFile {
            rel: rel.to_string_lossy().replace('\\', "/"),
            abs: path.to_path_buf(),
        });
    }
    files.sort_by(|a, b| a.rel.cmp(&b.rel));
    tracing::info!("{} source file(s) under {}", files.len(), root.display());
    Ok(files)
}

/// Read every file; unreadable ones become `Io` diagnostics and are skipped.
///
/// Legacy sources are often not UTF-8, so invalid bytes are replaced rather
/// than rejected.
pub fn load_sources(files: Vec<SourceFile>, diagnostics: &mut Vec<Diagnostic>) -> Vec<LoadedSource> {
    let mut loaded = Vec::with_capacity(files.len());
    for file in files {
        match std::fs::read(&file.abs) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                loaded.push(LoadedSource { file, text });
            }
            Err(source) => {
                let e = AnalysisError::Io {
                    path: file.rel.clone(),
                    source,
                };
                tracing::warn!("{}", e);
                diagnostics.push(Diagnostic::new(&file.rel, &e));
            }
        }
    }
    loaded
}
