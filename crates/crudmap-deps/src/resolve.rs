//! Include target resolution.
//!
//! A folded target is normalized lexically and looked up directly: against
//! the including file's directory, then each configured include path, then
//! the root. Anything that does not resolve directly goes through candidate
//! generation and scoring over the whole file index.

use crate::index::FileIndex;
use crudmap_core::config::{IncludeConfig, ScoringWeights};
use crudmap_core::error::AnalysisError;
use crudmap_core::model::EdgeTarget;
use crudmap_parser::{IncludeSite, Template};
use std::collections::BTreeSet;
use std::path::Path;

/// An indexed file ranked as a possible include target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub path: String,
    pub score: i64,
}

/// Outcome of resolving one include directive.
#[derive(Debug)]
pub struct Resolution {
    pub target: EdgeTarget,
    /// Ranked alternatives, best first. Empty for direct hits.
    pub candidates: Vec<ScoredCandidate>,
    pub diagnostic: Option<AnalysisError>,
}

impl Resolution {
    fn direct(path: &str) -> Self {
        Self {
            target: EdgeTarget::Resolved(path.to_string()),
            candidates: Vec::new(),
            diagnostic: None,
        }
    }
}

pub struct IncludeResolver<'a> {
    index: &'a FileIndex,
    config: &'a IncludeConfig,
    /// Absolute root with `/` separators and no trailing slash.
    root_abs: String,
}

impl<'a> IncludeResolver<'a> {
    pub fn new(index: &'a FileIndex, config: &'a IncludeConfig, root_abs: &Path) -> Self {
        let root_abs = root_abs
            .to_string_lossy()
            .replace('\\', "/")
            .trim_end_matches('/')
            .to_string();
        Self {
            index,
            config,
            root_abs,
        }
    }

    /// Resolve the directive `site` found in the root-relative file `source`.
    pub fn resolve(&self, source: &str, site: &IncludeSite) -> Resolution {
        let folded = site.target.fold();
        if let Some(path) = folded.as_deref()
            && let Some(found) = self.direct(source, path)
        {
            tracing::trace!("{}: {} -> {}", source, site.raw, found);
            return Resolution::direct(&found);
        }

        let candidates = self.rank(source, &site.target);
        match candidates.first() {
            Some(best) => {
                tracing::debug!(
                    "{}:{}: {} scored to {} ({} candidate(s))",
                    source,
                    site.line,
                    site.raw,
                    best.path,
                    candidates.len()
                );
                Resolution {
                    target: EdgeTarget::Resolved(best.path.clone()),
                    candidates,
                    diagnostic: None,
                }
            }
            None => {
                let diagnostic = match folded {
                    Some(path) => AnalysisError::MissingFile { path },
                    None => AnalysisError::UnresolvedReference {
                        name: site.raw.clone(),
                    },
                };
                tracing::debug!("{}:{}: {}", source, site.line, diagnostic);
                Resolution {
                    target: EdgeTarget::Unresolved,
                    candidates: Vec::new(),
                    diagnostic: Some(diagnostic),
                }
            }
        }
    }

    /// Lexical lookup of a fully folded path.
    fn direct(&self, source: &str, path: &str) -> Option<String> {
        let path = path.replace('\\', "/");
        if is_absolute(&path) {
            let rel = strip_root(&path, &self.root_abs)?;
            return normalize(rel).and_then(|p| self.lookup(&p));
        }

        let source_dir = parent_dir(source);
        let explicit = path.starts_with("./") || path.starts_with("../");
        let mut bases = vec![source_dir.to_string()];
        if !explicit {
            bases.extend(
                self.config
                    .include_paths
                    .iter()
                    .map(|p| p.to_string_lossy().replace('\\', "/")),
            );
            bases.push(String::new());
        }

        bases.iter().find_map(|base| {
            let joined = if base.is_empty() {
                path.clone()
            } else {
                format!("{}/{}", base.trim_end_matches('/'), path)
            };
            normalize(&joined).and_then(|p| self.lookup(&p))
        })
    }

    fn lookup(&self, path: &str) -> Option<String> {
        self.index.lookup(path).map(str::to_string)
    }

    /// Score every indexed match of every candidate; best first, capped.
    pub fn rank(&self, source: &str, target: &Template) -> Vec<ScoredCandidate> {
        let source_dir = parent_dir(source);
        let mut seen = BTreeSet::new();
        let mut scored = Vec::new();
        for candidate in candidates(target, self.config) {
            for found in self.index.matches(&candidate) {
                if found == source || !seen.insert(found.to_string()) {
                    continue;
                }
                scored.push(ScoredCandidate {
                    path: found.to_string(),
                    score: score(found, source_dir, &self.config.scoring),
                });
            }
        }
        scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
        scored.truncate(self.config.max_candidates);
        scored
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.as_bytes().get(1) == Some(&b':')
}

fn strip_root<'p>(path: &'p str, root: &str) -> Option<&'p str> {
    if root.is_empty() {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(root)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest.trim_start_matches('/'))
    } else {
        None
    }
}

/// Collapse `.` and `..` segments. `None` if the path climbs above its start.
pub fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

/// Directory of a root-relative path; `""` for files at the root.
fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

fn components(dir: &str) -> Vec<&str> {
    dir.split('/').filter(|s| !s.is_empty()).collect()
}

/// Search strings for a target that did not resolve directly.
pub fn candidates(target: &Template, config: &IncludeConfig) -> Vec<String> {
    // Only text after the last hole is trustworthy, and only from the first
    // complete segment on: `"../lib/" . $name . ".inc"` yields nothing.
    let tail = target.trailing_text().replace('\\', "/");
    let tail = if target.has_holes() {
        tail.find('/').map_or("", |i| &tail[i + 1..]).to_string()
    } else {
        tail
    };
    let suffix: Vec<&str> = tail
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    let Some(name) = suffix.last().copied() else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    let mut push = |c: String| {
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    };

    if suffix.len() > 1 {
        push(suffix.join("/"));
    }
    push(name.to_string());

    let stem = name.find('.').map_or(name, |i| &name[..i]);
    if !stem.is_empty() {
        for ext in &config.extensions {
            let ext = ext.trim_start_matches('.');
            push(format!("{}.{}", stem, ext));
        }
    }

    let directory_like = tail.ends_with('/') || !name.contains('.');
    if directory_like {
        let dir = suffix.join("/");
        for index in &config.index_files {
            push(format!("{}/{}", dir, index));
        }
    }
    out
}

/// Heuristic closeness of `found` to the including directory.
pub fn score(found: &str, source_dir: &str, weights: &ScoringWeights) -> i64 {
    let found_dir = components(parent_dir(found));
    let source = components(source_dir);
    let common = found_dir
        .iter()
        .zip(&source)
        .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
        .count();

    let depth_diff = found_dir.len().abs_diff(source.len());
    let mut score = weights.base - weights.depth_penalty * to_i64(depth_diff)
        + weights.common_prefix * to_i64(common);
    if common == source.len() {
        score += weights.descendant;
    } else if common == found_dir.len() {
        score += weights.ancestor;
    }
    if !found_dir.is_empty() {
        score += weights.under_root;
    }
    let name = found.rsplit('/').next().unwrap_or(found);
    let stem = name.find('.').map_or(name, |i| &name[..i]);
    if source
        .last()
        .is_some_and(|dir| dir.eq_ignore_ascii_case(stem))
    {
        score += weights.dir_name_match;
    }
    score
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
