//! Tree-sitter front-end for PHP sources mixed with markup.

use crudmap_core::error::AnalysisError;
use std::path::Path;

/// Parse a source file and return the tree-sitter tree.
///
/// A returned tree may still contain `ERROR` nodes; callers check each scope.
pub fn parse_file(path: &Path, source: &str) -> Result<tree_sitter::Tree, AnalysisError> {
    let language: tree_sitter::Language = tree_sitter_php::LANGUAGE_PHP.into();
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| AnalysisError::Syntax {
            scope: "main".to_string(),
            message: format!("failed to load PHP grammar: {:?}", e),
        })?;
    parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| AnalysisError::Syntax {
            scope: "main".to_string(),
            message: format!("failed to parse {}", path.display()),
        })
}

/// Source text of a node.
pub fn text<'s>(node: &tree_sitter::Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// 1-based line of a node.
pub fn line(node: &tree_sitter::Node) -> usize {
    node.start_position().row + 1
}
