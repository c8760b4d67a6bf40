//! Line-delimited name lists: known views and known stored procedures.
//!
//! Blank lines and `#` comments are skipped. Procedure entries may carry a
//! signature suffix (`get_user(2)`, `get_user/2`, `get_user 2`); only the
//! bare name is kept. Matching is case-insensitive.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct NameList {
    names: HashSet<String>,
}

impl NameList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read name list {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Load `path` if given, otherwise return an empty list.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::new()),
        }
    }

    pub fn parse(content: &str) -> Self {
        content.lines().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for NameList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let names = iter
            .into_iter()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(bare_name)
            .collect();
        Self { names }
    }
}

fn bare_name(line: &str) -> Option<String> {
    let end = line
        .find(|c: char| c == '(' || c == '/' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = line[..end].trim();
    // Schema-qualified entries match on the object name, like table references.
    let name = name.rsplit('.').next().unwrap_or(name);
    (!name.is_empty()).then(|| name.to_lowercase())
}
