//! Index of every file under the analysis root, for include resolution.
//!
//! Paths are root-relative with `/` separators. Lookups by file name and by
//! trailing path are case-insensitive, as legacy deployments often ran on
//! case-insensitive file systems.

use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: HashSet<String>,
    /// Lowercased full path → indexed path.
    folded: HashMap<String, String>,
    /// Lowercased file name → indexed paths.
    by_name: HashMap<String, Vec<String>>,
}

impl FileIndex {
    /// Walk `root`, honoring `.gitignore`, hidden files and `.crudmapignore`.
    pub fn build(root: &Path) -> Self {
        let walker = ignore::WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .add_custom_ignore_filename(".crudmapignore")
            .build();

        let paths = walker.flatten().filter_map(|entry| {
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            let rel = path.strip_prefix(root).ok()?;
            Some(rel.to_string_lossy().replace('\\', "/"))
        });
        let index = Self::from_paths(paths);
        tracing::debug!("indexed {} file(s) under {}", index.len(), root.display());
        index
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for path in paths {
            index.insert(path.into());
        }
        for entries in index.by_name.values_mut() {
            entries.sort();
        }
        index
    }

    fn insert(&mut self, path: String) {
        let lower = path.to_lowercase();
        let name = lower.rsplit('/').next().unwrap_or(&lower).to_string();
        self.by_name.entry(name).or_default().push(path.clone());
        self.folded.insert(lower, path.clone());
        self.files.insert(path);
    }

    /// The indexed spelling of `path`, matched case-insensitively.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        if let Some(exact) = self.files.get(path) {
            return Some(exact);
        }
        self.folded.get(&path.to_lowercase()).map(String::as_str)
    }

    /// Files whose name or trailing path equals `candidate`.
    pub fn matches(&self, candidate: &str) -> Vec<&str> {
        let wanted = candidate.trim_start_matches('/').to_lowercase();
        let name = wanted.rsplit('/').next().unwrap_or(&wanted);
        let Some(entries) = self.by_name.get(name) else {
            return Vec::new();
        };
        let suffix = format!("/{}", wanted);
        entries
            .iter()
            .filter(|p| {
                let lower = p.to_lowercase();
                lower == wanted || lower.ends_with(&suffix)
            })
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
