//! Static resolution engine for legacy PHP sources.
//!
//! Parses a file with tree-sitter, partitions it into scopes, folds string
//! expressions through constants and scope-local variables, and classifies
//! every SQL-shaped fragment into table references with CRUD operations.
//! Include directives are collected with their folded targets for the
//! dependency resolver.

pub mod eval;
pub mod file;
pub mod knowledge;
pub mod php;
pub mod scope;
pub mod sql;
pub mod walker;

pub use eval::{Piece, Template};
pub use file::{FileAnalysis, analyze_file, discover_constants};
pub use knowledge::Knowledge;
pub use walker::{IncludeKind, IncludeSite};
