//! Process-wide, write-once table of named constants.
//!
//! `define('NAME', ...)`, top-level `const NAME = ...` and class constants
//! (`Type::NAME`) all land here. The first binding wins; later attempts from
//! a different site are rejected and reported by the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Where a constant was bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstantOrigin {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for ConstantOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A constant definition discovered while walking a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantDef {
    pub name: String,
    pub value: String,
    pub origin: ConstantOrigin,
}

/// Result of a binding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineOutcome {
    /// First binding of the name.
    Bound,
    /// Same name bound again from the same site; nothing changes.
    Repeated,
    /// Already bound elsewhere; the new value is ignored.
    Conflict(ConstantOrigin),
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    origin: ConstantOrigin,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    entries: HashMap<String, Entry>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.value.as_str())
    }

    pub fn origin(&self, name: &str) -> Option<&ConstantOrigin> {
        self.entries.get(name).map(|e| &e.origin)
    }

    pub fn define(&mut self, def: ConstantDef) -> DefineOutcome {
        match self.entries.get(&def.name) {
            Some(existing) if existing.origin == def.origin => DefineOutcome::Repeated,
            Some(existing) => DefineOutcome::Conflict(existing.origin.clone()),
            None => {
                self.entries.insert(
                    def.name,
                    Entry {
                        value: def.value,
                        origin: def.origin,
                    },
                );
                DefineOutcome::Bound
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, value: &str, file: &str, line: usize) -> ConstantDef {
        ConstantDef {
            name: name.into(),
            value: value.into(),
            origin: ConstantOrigin {
                file: file.into(),
                line,
            },
        }
    }

    #[test]
    fn test_first_binding_wins() {
        let mut table = ConstantTable::new();
        assert_eq!(table.define(def("TBL", "users", "a.php", 1)), DefineOutcome::Bound);
        let outcome = table.define(def("TBL", "orders", "b.php", 7));
        assert!(matches!(outcome, DefineOutcome::Conflict(ref o) if o.file == "a.php"));
        assert_eq!(table.get("TBL"), Some("users"));
    }

    #[test]
    fn test_rebinding_from_same_site_is_silent() {
        let mut table = ConstantTable::new();
        table.define(def("TBL", "users", "a.php", 1));
        assert_eq!(
            table.define(def("TBL", "users", "a.php", 1)),
            DefineOutcome::Repeated
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut table = ConstantTable::new();
        table.define(def("Tbl", "users", "a.php", 1));
        assert!(table.get("TBL").is_none());
        assert_eq!(table.get("Tbl"), Some("users"));
    }
}
