//! Scope Tracker: partitions a file's tree into independently analyzed scopes.
//!
//! Every file has a `main` scope for its top-level statements. Each function,
//! method and closure opens its own scope named `name`, `Type::method` or
//! `Closure@<line>`. A scope's statements exclude the bodies of nested scopes,
//! so variable bindings never leak between them.

use crate::php;
use std::ops::Range;
use tree_sitter::{Node, Tree};

pub const MAIN_SCOPE: &str = "main";

/// Node kinds that open a new scope.
const FUNCTION_KINDS: &[&str] = &["function_definition"];
const METHOD_KINDS: &[&str] = &["method_declaration"];
const CLOSURE_KINDS: &[&str] = &[
    "anonymous_function",
    "anonymous_function_creation_expression",
    "arrow_function",
];
/// Node kinds whose name qualifies the methods declared inside them.
const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "trait_declaration",
    "enum_declaration",
];

#[derive(Debug, Clone)]
pub struct Scope<'t> {
    pub name: String,
    /// Enclosing type, used to resolve `self::CONST`.
    pub class: Option<String>,
    pub statements: Vec<Node<'t>>,
    /// Byte span of the whole scope-defining node.
    pub span: Range<usize>,
    /// Byte spans of directly nested scopes.
    pub child_spans: Vec<Range<usize>>,
    pub line: usize,
    /// The scope's own statements (nested scopes excluded) contain syntax errors.
    pub has_error: bool,
}

impl Scope<'_> {
    /// Byte ranges of this scope's own text, with nested scope spans cut out.
    pub fn own_segments(&self) -> Vec<Range<usize>> {
        let mut children = self.child_spans.clone();
        children.sort_by_key(|r| r.start);

        let mut segments = Vec::new();
        let mut pos = self.span.start;
        for child in children {
            if child.start > pos {
                segments.push(pos..child.start);
            }
            pos = pos.max(child.end);
        }
        if pos < self.span.end {
            segments.push(pos..self.span.end);
        }
        segments
    }
}

/// Whether `node` opens a scope of its own.
pub fn is_scope_node(node: &Node) -> bool {
    let kind = node.kind();
    FUNCTION_KINDS.contains(&kind) || METHOD_KINDS.contains(&kind) || CLOSURE_KINDS.contains(&kind)
}

pub fn is_type_node(node: &Node) -> bool {
    TYPE_KINDS.contains(&node.kind())
}

/// Partition `tree` into scopes. `main` comes first, the rest in document order.
pub fn enter_scopes<'t>(tree: &'t Tree, source: &str) -> Vec<Scope<'t>> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    let statements: Vec<Node<'t>> = root.named_children(&mut cursor).collect();
    let has_error = statements.iter().any(own_error);

    let mut scopes = vec![Scope {
        name: MAIN_SCOPE.to_string(),
        class: None,
        statements,
        span: 0..source.len(),
        child_spans: Vec::new(),
        line: 1,
        has_error,
    }];
    collect_scopes(root, source, 0, None, &mut scopes);
    scopes
}

fn collect_scopes<'t>(
    node: Node<'t>,
    source: &str,
    parent: usize,
    class: Option<&str>,
    scopes: &mut Vec<Scope<'t>>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let kind = child.kind();
        if FUNCTION_KINDS.contains(&kind) {
            let name = node_name(&child, source).unwrap_or_else(|| format!("function@{}", php::line(&child)));
            open_scope(child, source, parent, class, name, scopes);
        } else if METHOD_KINDS.contains(&kind) {
            let method = node_name(&child, source).unwrap_or_else(|| format!("method@{}", php::line(&child)));
            let name = match class {
                Some(cls) => format!("{}::{}", cls, method),
                None => method,
            };
            open_scope(child, source, parent, class, name, scopes);
        } else if CLOSURE_KINDS.contains(&kind) {
            let name = format!("Closure@{}", php::line(&child));
            open_scope(child, source, parent, class, name, scopes);
        } else if TYPE_KINDS.contains(&kind) {
            let type_name = node_name(&child, source);
            collect_scopes(child, source, parent, type_name.as_deref().or(class), scopes);
        } else {
            collect_scopes(child, source, parent, class, scopes);
        }
    }
}

fn open_scope<'t>(
    node: Node<'t>,
    source: &str,
    parent: usize,
    class: Option<&str>,
    name: String,
    scopes: &mut Vec<Scope<'t>>,
) {
    let statements = body_statements(node);
    let has_error = statements.iter().any(own_error);
    let index = scopes.len();
    scopes[parent].child_spans.push(node.byte_range());
    scopes.push(Scope {
        name,
        class: class.map(str::to_string),
        statements,
        span: node.byte_range(),
        child_spans: Vec::new(),
        line: php::line(&node),
        has_error,
    });
    tracing::trace!("opened scope {} at line {}", scopes[index].name, scopes[index].line);
    collect_scopes(node, source, index, class, scopes);
}

/// The statement sequence of a scope-defining node.
fn body_statements(node: Node<'_>) -> Vec<Node<'_>> {
    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };
    if body.kind() == "compound_statement" {
        let mut cursor = body.walk();
        body.named_children(&mut cursor).collect()
    } else {
        // Arrow functions have a single expression body.
        vec![body]
    }
}

fn node_name(node: &Node, source: &str) -> Option<String> {
    let name = node.child_by_field_name("name")?;
    Some(php::text(&name, source).to_string())
}

/// Syntax errors in `node`, not counting the bodies of nested scopes.
fn own_error(node: &Node) -> bool {
    if node.is_error() || node.is_missing() {
        return true;
    }
    if !node.has_error() || is_scope_node(node) {
        return false;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| own_error(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::php::parse_file;
    use std::path::Path;

    fn scope_names(source: &str) -> Vec<String> {
        let tree = parse_file(Path::new("t.php"), source).unwrap();
        enter_scopes(&tree, source)
            .into_iter()
            .map(|s| s.name)
            .collect()
    }

    #[test]
    fn test_main_scope_always_first() {
        assert_eq!(scope_names("<?php echo 1;"), vec!["main"]);
    }

    #[test]
    fn test_functions_methods_and_closures() {
        let source = r#"<?php
function load() { $a = 1; }
class Repo {
    public function save() {
        $cb = function () { return 1; };
    }
}
$f = fn($x) => $x;
"#;
        let names = scope_names(source);
        assert_eq!(
            names,
            vec!["main", "load", "Repo::save", "Closure@5", "Closure@8"]
        );
    }

    #[test]
    fn test_nested_scopes_and_class_context() {
        let source = "<?php\nclass A {\n function m() {\n  $f = function () {};\n }\n}\n";
        let tree = parse_file(Path::new("t.php"), source).unwrap();
        let scopes = enter_scopes(&tree, source);
        assert_eq!(scopes.len(), 3);
        assert_eq!(scopes[0].child_spans, vec![scopes[1].span.clone()]);
        assert_eq!(scopes[1].child_spans, vec![scopes[2].span.clone()]);
        assert_eq!(scopes[2].class.as_deref(), Some("A"));
        assert!(scopes[2].name.starts_with("Closure@"));
    }

    #[test]
    fn test_own_segments_cut_out_children() {
        let source = "<?php $a = 1; function f() { $b = 2; } $c = 3;";
        let tree = parse_file(Path::new("t.php"), source).unwrap();
        let scopes = enter_scopes(&tree, source);
        let main_text: String = scopes[0]
            .own_segments()
            .into_iter()
            .map(|r| &source[r])
            .collect();
        assert!(main_text.contains("$a = 1"));
        assert!(main_text.contains("$c = 3"));
        assert!(!main_text.contains("$b = 2"));
    }

    #[test]
    fn test_main_statements_exclude_function_bodies() {
        let source = "<?php function f() { $q = 1; }";
        let tree = parse_file(Path::new("t.php"), source).unwrap();
        let scopes = enter_scopes(&tree, source);
        assert_eq!(scopes[1].statements.len(), 1);
        assert_eq!(scopes[1].statements[0].kind(), "expression_statement");
    }
}
