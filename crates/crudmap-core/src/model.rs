//! Report data model: table references, per-file CRUD records, include edges.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A data-access operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Single-letter column label used in tabular output.
    pub fn letter(self) -> char {
        match self {
            Self::Create => 'C',
            Self::Read => 'R',
            Self::Update => 'U',
            Self::Delete => 'D',
        }
    }
}

/// Extra facts attached to a table reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annotation {
    /// Temporary table or CTE.
    Temp,
    /// Name appears in the known view list.
    View,
    /// Name could not be folded; the reference is keyed by its source text.
    Unresolved,
    /// Stored-procedure invocation rather than a table.
    Procedure,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Temp => "temp",
            Self::View => "view",
            Self::Unresolved => "unresolved",
            Self::Procedure => "procedure",
        };
        f.write_str(s)
    }
}

/// One table touched by a fragment, scope or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReference {
    pub name: String,
    #[serde(default)]
    pub operations: BTreeSet<Operation>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub annotations: BTreeSet<Annotation>,
}

impl TableReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: BTreeSet::new(),
            annotations: BTreeSet::new(),
        }
    }

    pub fn has(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn is(&self, annotation: Annotation) -> bool {
        self.annotations.contains(&annotation)
    }

    /// Set-union `other` into `self`. Merging the same reference twice is a no-op.
    pub fn merge(&mut self, other: &TableReference) {
        self.operations.extend(other.operations.iter().copied());
        self.annotations.extend(other.annotations.iter().copied());
    }
}

/// Findings of one fragment or scope: table name → reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMap(BTreeMap<String, TableReference>);

impl TableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `op` on `name`, creating the entry if needed.
    pub fn add(&mut self, name: &str, op: Operation) -> &mut TableReference {
        let entry = self.entry(name);
        entry.operations.insert(op);
        entry
    }

    /// Attach `annotation` to `name`, creating the entry if needed.
    pub fn annotate(&mut self, name: &str, annotation: Annotation) -> &mut TableReference {
        let entry = self.entry(name);
        entry.annotations.insert(annotation);
        entry
    }

    pub fn entry(&mut self, name: &str) -> &mut TableReference {
        self.0
            .entry(name.to_string())
            .or_insert_with(|| TableReference::new(name))
    }

    pub fn insert(&mut self, reference: TableReference) {
        match self.0.get_mut(&reference.name) {
            Some(existing) => existing.merge(&reference),
            None => {
                self.0.insert(reference.name.clone(), reference);
            }
        }
    }

    pub fn merge(&mut self, other: &TableMap) {
        for reference in other.0.values() {
            self.insert(reference.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&TableReference> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableReference> {
        self.0.values()
    }
}

/// Accumulated CRUD facts: file → scope → table → reference.
///
/// Merging is a set union, so order of merge does not affect the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRecord(BTreeMap<String, BTreeMap<String, TableMap>>);

impl FileRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the findings of one scope.
    pub fn merge_scope(&mut self, file: &str, scope: &str, tables: &TableMap) {
        if tables.is_empty() {
            return;
        }
        self.0
            .entry(file.to_string())
            .or_default()
            .entry(scope.to_string())
            .or_default()
            .merge(tables);
    }

    pub fn merge(&mut self, other: &FileRecord) {
        for (file, scopes) in &other.0 {
            for (scope, tables) in scopes {
                self.merge_scope(file, scope, tables);
            }
        }
    }

    pub fn get(&self, file: &str, scope: &str, table: &str) -> Option<&TableReference> {
        self.0.get(file)?.get(scope)?.get(table)
    }

    pub fn scopes(&self, file: &str) -> Option<&BTreeMap<String, TableMap>> {
        self.0.get(file)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct (file, scope, table) triples.
    pub fn reference_count(&self) -> usize {
        self.0
            .values()
            .flat_map(|scopes| scopes.values())
            .map(TableMap::len)
            .sum()
    }

    /// Flatten into report rows, sorted by file, scope and table.
    pub fn rows(&self) -> Vec<CrudRow> {
        let mut rows = Vec::new();
        for (file, scopes) in &self.0 {
            for (scope, tables) in scopes {
                for reference in tables.iter() {
                    rows.push(CrudRow::new(file, scope, reference));
                }
            }
        }
        rows
    }
}

/// A flat `(file, scope, table, C, R, U, D, annotation)` report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrudRow {
    pub file: String,
    pub scope: String,
    pub table: String,
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
    pub annotation: String,
}

impl CrudRow {
    fn new(file: &str, scope: &str, reference: &TableReference) -> Self {
        Self {
            file: file.to_string(),
            scope: scope.to_string(),
            table: reference.name.clone(),
            create: reference.has(Operation::Create),
            read: reference.has(Operation::Read),
            update: reference.has(Operation::Update),
            delete: reference.has(Operation::Delete),
            annotation: reference
                .annotations
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Compact `CRUD` flag string, `-` for absent operations.
    pub fn flags(&self) -> String {
        [
            (self.create, 'C'),
            (self.read, 'R'),
            (self.update, 'U'),
            (self.delete, 'D'),
        ]
        .iter()
        .map(|&(set, c)| if set { c } else { '-' })
        .collect()
    }
}

/// Where an include directive points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum EdgeTarget {
    Resolved(String),
    Unresolved,
    Circular(String),
}

impl EdgeTarget {
    /// Report label: the resolved path, `UNRESOLVED`, or `CIRCULAR`.
    pub fn label(&self) -> &str {
        match self {
            Self::Resolved(path) => path,
            Self::Unresolved => "UNRESOLVED",
            Self::Circular(_) => "CIRCULAR",
        }
    }

    pub fn resolved_path(&self) -> Option<&str> {
        match self {
            Self::Resolved(path) => Some(path),
            _ => None,
        }
    }
}

/// One directed edge of the include graph, as seen from a traversal origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeEdge {
    /// File the traversal started from.
    pub origin: String,
    /// File containing the directive.
    pub source: String,
    /// Source text of the target expression.
    pub raw: String,
    pub target: EdgeTarget,
    /// Distance from `origin`; direct includes are depth 1.
    pub depth: usize,
    pub line: usize,
    /// Ranked alternatives from candidate scoring, best first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}
