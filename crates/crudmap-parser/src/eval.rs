//! Static Expression Evaluator.
//!
//! Folds an expression node into a [`Template`]: literal text interleaved with
//! holes that remember the source text of whatever could not be folded.
//! Strict folding (`Template::fold`) succeeds exactly when there are no holes.
//!
//! Supported forms, in priority order: string/number literals (quoted,
//! interpolated, heredoc, nowdoc), named and class constants, same-scope
//! variables, `.` concatenation, `__FILE__`/`__DIR__`, and `dirname()`.

use crudmap_core::constants::ConstantTable;
use std::collections::HashMap;
use std::ops::Range;
use tree_sitter::Node;

/// Templates grow no larger than this many bytes of literal text.
pub const MAX_TEMPLATE_LEN: usize = 64 * 1024;

/// Nor past this many pieces; a template over either limit collapses to one hole.
pub const MAX_TEMPLATE_PIECES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    /// Source text of an expression that could not be folded.
    Hole(String),
}

/// Partially folded string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(s: impl Into<String>) -> Self {
        let mut t = Self::new();
        t.push_text(&s.into());
        t
    }

    pub fn hole(source: impl Into<String>) -> Self {
        Self {
            pieces: vec![Piece::Hole(source.into())],
        }
    }

    pub fn push_text(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if let Some(Piece::Text(last)) = self.pieces.last_mut() {
            last.push_str(s);
        } else {
            self.pieces.push(Piece::Text(s.to_string()));
        }
    }

    pub fn push_hole(&mut self, source: impl Into<String>) {
        self.pieces.push(Piece::Hole(source.into()));
    }

    pub fn append(&mut self, other: Template) {
        for piece in other.pieces {
            match piece {
                Piece::Text(s) => self.push_text(&s),
                Piece::Hole(h) => self.pieces.push(Piece::Hole(h)),
            }
        }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn has_holes(&self) -> bool {
        self.pieces.iter().any(|p| matches!(p, Piece::Hole(_)))
    }

    /// Total bytes of literal text.
    pub fn text_len(&self) -> usize {
        self.pieces
            .iter()
            .map(|p| match p {
                Piece::Text(s) => s.len(),
                Piece::Hole(_) => 0,
            })
            .sum()
    }

    /// Over [`MAX_TEMPLATE_LEN`] or [`MAX_TEMPLATE_PIECES`].
    pub fn is_oversized(&self) -> bool {
        self.pieces.len() > MAX_TEMPLATE_PIECES || self.text_len() > MAX_TEMPLATE_LEN
    }

    /// Strict fold: the concrete string, or `None` if any part is unknown.
    pub fn fold(&self) -> Option<String> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(s) => out.push_str(s),
                Piece::Hole(_) => return None,
            }
        }
        Some(out)
    }

    /// Literal text before the first hole.
    pub fn leading_text(&self) -> &str {
        match self.pieces.first() {
            Some(Piece::Text(s)) => s,
            _ => "",
        }
    }

    /// Literal text after the last hole (the whole text when there are none).
    pub fn trailing_text(&self) -> String {
        let mut out = String::new();
        for piece in self.pieces.iter().rev() {
            match piece {
                Piece::Text(s) => out.insert_str(0, s),
                Piece::Hole(_) => break,
            }
        }
        out
    }

    /// Render to a string, replacing the i-th hole with `hole(i, source)`.
    pub fn render_with(&self, mut hole: impl FnMut(usize, &str) -> String) -> String {
        let mut out = String::new();
        let mut index = 0;
        for piece in &self.pieces {
            match piece {
                Piece::Text(s) => out.push_str(s),
                Piece::Hole(h) => {
                    out.push_str(&hole(index, h));
                    index += 1;
                }
            }
        }
        out
    }

    /// Source texts of the holes, in order.
    pub fn holes(&self) -> Vec<&str> {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Hole(h) => Some(h.as_str()),
                Piece::Text(_) => None,
            })
            .collect()
    }
}

/// Read access to bound constants.
pub trait ConstantLookup {
    fn constant(&self, name: &str) -> Option<&str>;
}

impl ConstantLookup for ConstantTable {
    fn constant(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

/// A base table with a file-local overlay consulted second.
pub struct Layered<'a> {
    pub base: &'a dyn ConstantLookup,
    pub overlay: &'a ConstantTable,
}

impl ConstantLookup for Layered<'_> {
    fn constant(&self, name: &str) -> Option<&str> {
        self.base
            .constant(name)
            .or_else(|| self.overlay.get(name))
    }
}

/// Key under which a class constant is stored in the constant table.
pub fn class_constant_key(class: &str, name: &str) -> String {
    format!("{}::{}", class.trim_start_matches('\\'), name)
}

/// Scope-local variable bindings, keyed without the leading `$`.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    bindings: HashMap<String, Template>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &str, value: Template) {
        self.bindings.insert(name.to_string(), cap(value, name));
    }

    pub fn unbind(&mut self, name: &str) {
        self.bindings.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.bindings.get(name)
    }

    /// `$name .= value`. An unbound variable starts as an unknown prefix.
    pub fn append(&mut self, name: &str, value: Template) -> &Template {
        let mut current = self
            .bindings
            .remove(name)
            .unwrap_or_else(|| Template::hole(format!("${}", name)));
        current.append(value);
        self.bindings
            .entry(name.to_string())
            .or_insert(cap(current, name))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn cap(value: Template, name: &str) -> Template {
    if value.is_oversized() {
        Template::hole(format!("${}", name))
    } else {
        value
    }
}

/// Expression forms the evaluator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    Quoted,
    Interpolated,
    Heredoc,
    Nowdoc,
    Number,
    Boolean,
    Null,
    Constant,
    ClassConstant,
    Variable,
    Concat,
    Parenthesized,
    Cast,
    Call,
    Other,
}

impl ExprKind {
    pub fn of(node: &Node) -> Self {
        match node.kind() {
            "string" => Self::Quoted,
            "encapsed_string" => Self::Interpolated,
            "heredoc" => Self::Heredoc,
            "nowdoc" => Self::Nowdoc,
            "integer" | "float" => Self::Number,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            "name" | "qualified_name" => Self::Constant,
            "class_constant_access_expression" => Self::ClassConstant,
            "variable_name" => Self::Variable,
            "binary_expression" => {
                let is_concat = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| op.kind() == ".");
                if is_concat { Self::Concat } else { Self::Other }
            }
            "parenthesized_expression" => Self::Parenthesized,
            "cast_expression" => Self::Cast,
            "function_call_expression" => Self::Call,
            _ => Self::Other,
        }
    }

    /// Forms that denote a string value on their own.
    pub fn is_string_shaped(self) -> bool {
        matches!(
            self,
            Self::Quoted | Self::Interpolated | Self::Heredoc | Self::Nowdoc | Self::Concat
        )
    }
}

/// Everything a fold may consult besides the syntax tree.
pub struct FoldContext<'a> {
    pub vars: &'a Variables,
    /// Enclosing type, for `self::` and `static::`.
    pub class: Option<&'a str>,
    pub constants: &'a dyn ConstantLookup,
}

/// Folds expressions of one source file.
pub struct Evaluator<'s> {
    source: &'s str,
    file: String,
    max_depth: usize,
}

/// Named children of string nodes that are literal text, not interpolation.
const LITERAL_PARTS: &[&str] = &[
    "string_content",
    "string_value",
    "escape_sequence",
    "text",
    "heredoc_start",
    "heredoc_end",
    "nowdoc_string",
];

impl<'s> Evaluator<'s> {
    /// `file` is the path `__FILE__` folds to.
    pub fn new(source: &'s str, file: impl Into<String>, max_depth: usize) -> Self {
        Self {
            source,
            file: file.into(),
            max_depth,
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    /// Strict fold.
    pub fn fold(&self, node: Node, ctx: &FoldContext) -> Option<String> {
        self.template(node, ctx).fold()
    }

    pub fn template(&self, node: Node, ctx: &FoldContext) -> Template {
        let t = self.fold_at(node, ctx, 0);
        if t.is_oversized() {
            return Template::hole(self.text(&node));
        }
        t
    }

    fn text(&self, node: &Node) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn fold_at(&self, node: Node, ctx: &FoldContext, depth: usize) -> Template {
        if depth >= self.max_depth {
            return Template::hole(self.text(&node));
        }
        let depth = depth + 1;
        match ExprKind::of(&node) {
            ExprKind::Quoted => Template::text(self.quoted(&node)),
            ExprKind::Interpolated => self.interpolated(node, ctx, depth),
            ExprKind::Heredoc => {
                let body = self.doc_body(&node);
                let parts = interpolation_parts(node);
                self.interpolate(body, &parts, ctx, depth)
            }
            ExprKind::Nowdoc => Template::text(&self.source[self.doc_body(&node)]),
            ExprKind::Number => Template::text(self.text(&node)),
            ExprKind::Boolean => {
                if self.text(&node).eq_ignore_ascii_case("true") {
                    Template::text("1")
                } else {
                    Template::new()
                }
            }
            ExprKind::Null => Template::new(),
            ExprKind::Constant => self.constant(node, ctx),
            ExprKind::ClassConstant => self.class_constant(node, ctx),
            ExprKind::Variable => self.variable(node, ctx),
            ExprKind::Concat => {
                let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) else {
                    return Template::hole(self.text(&node));
                };
                let mut t = self.fold_at(left, ctx, depth);
                t.append(self.fold_at(right, ctx, depth));
                if t.is_oversized() {
                    return Template::hole(self.text(&node));
                }
                t
            }
            ExprKind::Parenthesized => match node.named_child(0) {
                Some(inner) => self.fold_at(inner, ctx, depth),
                None => Template::hole(self.text(&node)),
            },
            ExprKind::Cast => match node.child_by_field_name("value") {
                Some(value) => self.fold_at(value, ctx, depth),
                None => Template::hole(self.text(&node)),
            },
            ExprKind::Call => self.call(node, ctx, depth),
            ExprKind::Other => Template::hole(self.text(&node)),
        }
    }

    fn constant(&self, node: Node, ctx: &FoldContext) -> Template {
        let name = self.text(&node).trim_start_matches('\\');
        match name {
            "__FILE__" => return Template::text(self.file.clone()),
            "__DIR__" => return Template::text(dirname(&self.file)),
            "__CLASS__" => {
                if let Some(class) = ctx.class {
                    return Template::text(class);
                }
            }
            _ => {}
        }
        match ctx.constants.constant(name) {
            Some(value) => Template::text(value),
            None => Template::hole(self.text(&node)),
        }
    }

    fn class_constant(&self, node: Node, ctx: &FoldContext) -> Template {
        let count = node.named_child_count();
        let (Some(scope), Some(member)) = (
            node.named_child(0),
            count
                .checked_sub(1)
                .and_then(|i| u32::try_from(i).ok())
                .and_then(|i| node.named_child(i)),
        ) else {
            return Template::hole(self.text(&node));
        };
        let scope_name = self.text(&scope);
        let class = match scope_name.to_ascii_lowercase().as_str() {
            "self" | "static" => ctx.class,
            _ => Some(scope_name),
        };
        class
            .map(|c| class_constant_key(c, self.text(&member)))
            .and_then(|key| ctx.constants.constant(&key))
            .map_or_else(|| Template::hole(self.text(&node)), Template::text)
    }

    fn variable(&self, node: Node, ctx: &FoldContext) -> Template {
        let name = variable_name(self.text(&node));
        match ctx.vars.get(name) {
            Some(value) => value.clone(),
            None => Template::hole(self.text(&node)),
        }
    }

    fn call(&self, node: Node, ctx: &FoldContext, depth: usize) -> Template {
        let whole = || Template::hole(self.text(&node));
        let Some(function) = node.child_by_field_name("function") else {
            return whole();
        };
        let name = self.text(&function).trim_start_matches('\\');
        if !name.eq_ignore_ascii_case("dirname") {
            return whole();
        }
        let args = call_arguments(node);
        let Some(path) = args
            .first()
            .and_then(|a| self.fold_at(*a, ctx, depth).fold())
        else {
            return whole();
        };
        let levels = match args.get(1) {
            Some(arg) => match self.fold_at(*arg, ctx, depth).fold().and_then(|s| s.parse::<usize>().ok()) {
                Some(n) if n >= 1 => n,
                _ => return whole(),
            },
            None => 1,
        };
        let mut dir = path;
        for _ in 0..levels {
            dir = dirname(&dir);
        }
        Template::text(dir)
    }

    fn quoted(&self, node: &Node) -> String {
        let raw = self.text(node).trim_start_matches(['b', 'B']);
        if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            unescape_single(inner)
        } else if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            unescape_double(inner)
        } else {
            raw.to_string()
        }
    }

    fn interpolated(&self, node: Node, ctx: &FoldContext, depth: usize) -> Template {
        let range = node.byte_range();
        let text = self.text(&node);
        let Some(open) = text.find('"') else {
            return Template::hole(text);
        };
        let start = range.start + open + 1;
        let end = range.end.saturating_sub(1).max(start);
        let parts = interpolation_parts(node);
        self.interpolate(start..end, &parts, ctx, depth)
    }

    /// Body of a heredoc or nowdoc: between the opening line and the closing marker line.
    fn doc_body(&self, node: &Node) -> Range<usize> {
        let range = node.byte_range();
        let text = self.text(node);
        let Some(first) = text.find('\n') else {
            return range.end..range.end;
        };
        let start = range.start + first + 1;
        let end = match text.rfind('\n') {
            Some(last) if last > first => range.start + last,
            _ => start,
        };
        start..end
    }

    /// Literal text is every gap between interpolated parts.
    fn interpolate(
        &self,
        body: Range<usize>,
        parts: &[Node],
        ctx: &FoldContext,
        depth: usize,
    ) -> Template {
        let mut t = Template::new();
        let mut pos = body.start;
        let mut closing_brace = false;
        for part in parts {
            let r = part.byte_range();
            if r.start < pos || r.end > body.end {
                continue;
            }
            let mut gap = &self.source[pos..r.start];
            if closing_brace {
                gap = gap.strip_prefix('}').unwrap_or(gap);
            }
            // `{$expr}` complex syntax
            let braced = gap.ends_with('{') && self.source[r.start..].starts_with('$');
            if braced {
                gap = &gap[..gap.len() - 1];
            }
            t.push_text(&unescape_double(gap));
            t.append(self.interpolated_value(*part, ctx, depth));
            pos = r.end;
            closing_brace = braced;
        }
        if pos < body.end {
            let mut gap = &self.source[pos..body.end];
            if closing_brace {
                gap = gap.strip_prefix('}').unwrap_or(gap);
            }
            t.push_text(&unescape_double(gap));
        }
        t
    }

    fn interpolated_value(&self, node: Node, ctx: &FoldContext, depth: usize) -> Template {
        match node.kind() {
            "variable_name" => self.variable(node, ctx),
            _ => {
                let text = self.text(&node);
                if text.starts_with("{$")
                    && let Some(inner) = node.named_child(0)
                {
                    return self.fold_at(inner, ctx, depth);
                }
                Template::hole(text)
            }
        }
    }
}

/// Interpolated children of a string-like node, in source order.
fn interpolation_parts(node: Node) -> Vec<Node> {
    let mut parts = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "heredoc_body" {
            parts.extend(interpolation_parts(child));
        } else if !LITERAL_PARTS.contains(&child.kind()) {
            parts.push(child);
        }
    }
    parts
}

/// Argument expressions of a call, in order.
pub fn call_arguments(call: Node) -> Vec<Node> {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|a| a.kind() == "argument")
        .filter_map(|a| {
            // Named arguments carry the name first; the value is last.
            let count = a.named_child_count();
            count
                .checked_sub(1)
                .and_then(|i| u32::try_from(i).ok())
                .and_then(|i| a.named_child(i))
        })
        .collect()
}

/// `$name` → `name`.
pub fn variable_name(text: &str) -> &str {
    text.trim_start_matches('$')
}

/// Parent directory with PHP's `dirname` semantics.
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/" } else { "." }.to_string();
    }
    match trimmed.rfind('/') {
        None => ".".to_string(),
        Some(i) => {
            let parent = trimmed[..i].trim_end_matches('/');
            if parent.is_empty() {
                "/".to_string()
            } else {
                parent.to_string()
            }
        }
    }
}

/// Decode the escapes of a single-quoted literal.
pub fn unescape_single(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && (next == '\\' || next == '\'')
        {
            out.push(next);
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode the escapes of a double-quoted literal or heredoc.
pub fn unescape_double(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        let simple = match next {
            b'n' => Some(b'\n'),
            b't' => Some(b'\t'),
            b'r' => Some(b'\r'),
            b'v' => Some(0x0b),
            b'e' => Some(0x1b),
            b'f' => Some(0x0c),
            b'\\' => Some(b'\\'),
            b'$' => Some(b'$'),
            b'"' => Some(b'"'),
            _ => None,
        };
        if let Some(b) = simple {
            out.push(b);
            i += 2;
            continue;
        }
        if next.is_ascii_digit() && next < b'8' {
            let digits = bytes[i + 1..]
                .iter()
                .take(3)
                .take_while(|b| (b'0'..=b'7').contains(*b))
                .count();
            let value = bytes[i + 1..i + 1 + digits]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push((value & 0xff) as u8);
            i += 1 + digits;
            continue;
        }
        if next == b'x' {
            let digits = bytes[i + 2..]
                .iter()
                .take(2)
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            if digits > 0 {
                let hex = &s[i + 2..i + 2 + digits];
                if let Ok(v) = u8::from_str_radix(hex, 16) {
                    out.push(v);
                    i += 2 + digits;
                    continue;
                }
            }
        }
        if next == b'u'
            && bytes.get(i + 2) == Some(&b'{')
            && let Some(close) = s[i + 3..].find('}')
            && let Ok(code) = u32::from_str_radix(&s[i + 3..i + 3 + close], 16)
            && let Some(ch) = char::from_u32(code)
        {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            i += 4 + close;
            continue;
        }
        // Unknown escapes keep the backslash.
        out.push(b'\\');
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::php::parse_file;
    use crudmap_core::constants::{ConstantDef, ConstantOrigin};
    use std::path::Path;

    const FILE: &str = "/srv/app/reports/report.php";

    fn last_assignment_rhs(node: Node) -> Option<Node> {
        let mut found = None;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(n) = last_assignment_rhs(child) {
                found = Some(n);
            }
        }
        if found.is_none() && node.kind() == "assignment_expression" {
            found = node.child_by_field_name("right");
        }
        found
    }

    fn fold_with(source: &str, vars: &Variables, constants: &ConstantTable, class: Option<&str>) -> Template {
        let tree = parse_file(Path::new(FILE), source).unwrap();
        let rhs = last_assignment_rhs(tree.root_node()).unwrap();
        let eval = Evaluator::new(source, FILE, 256);
        let ctx = FoldContext {
            vars,
            class,
            constants,
        };
        eval.template(rhs, &ctx)
    }

    fn fold(source: &str) -> Template {
        fold_with(source, &Variables::new(), &ConstantTable::new(), None)
    }

    fn table_with(name: &str, value: &str) -> ConstantTable {
        let mut table = ConstantTable::new();
        table.define(ConstantDef {
            name: name.into(),
            value: value.into(),
            origin: ConstantOrigin {
                file: "config.php".into(),
                line: 1,
            },
        });
        table
    }

    #[test]
    fn test_concat_of_literals() {
        let t = fold(r#"<?php $q = 'SELECT ' . "* FROM t" . ';';"#);
        assert_eq!(t.fold().as_deref(), Some("SELECT * FROM t;"));
    }

    #[test]
    fn test_unbound_variable_is_a_hole() {
        let t = fold(r#"<?php $q = "SELECT * FROM " . $t;"#);
        assert_eq!(t.fold(), None);
        assert_eq!(t.leading_text(), "SELECT * FROM ");
        assert_eq!(t.holes(), vec!["$t"]);
    }

    #[test]
    fn test_bound_variable_folds() {
        let mut vars = Variables::new();
        vars.bind("t", Template::text("orders"));
        let t = fold_with(
            r#"<?php $q = "SELECT * FROM " . $t . ";";"#,
            &vars,
            &ConstantTable::new(),
            None,
        );
        assert_eq!(t.fold().as_deref(), Some("SELECT * FROM orders;"));
    }

    #[test]
    fn test_named_constant() {
        let constants = table_with("TBL", "users");
        let t = fold_with(
            "<?php $q = 'DELETE FROM ' . TBL;",
            &Variables::new(),
            &constants,
            None,
        );
        assert_eq!(t.fold().as_deref(), Some("DELETE FROM users"));
    }

    #[test]
    fn test_class_constant_through_self() {
        let constants = table_with("Repo::TABLE", "orders");
        let t = fold_with(
            "<?php $q = 'SELECT * FROM ' . self::TABLE;",
            &Variables::new(),
            &constants,
            Some("Repo"),
        );
        assert_eq!(t.fold().as_deref(), Some("SELECT * FROM orders"));
    }

    #[test]
    fn test_path_builtins() {
        assert_eq!(fold("<?php $d = __DIR__;").fold().as_deref(), Some("/srv/app/reports"));
        assert_eq!(
            fold("<?php $d = dirname(__FILE__, 2) . '/lib/db.php';").fold().as_deref(),
            Some("/srv/app/lib/db.php")
        );
        assert_eq!(fold("<?php $d = dirname($x);").holes(), vec!["dirname($x)"]);
    }

    #[test]
    fn test_interpolation() {
        let mut vars = Variables::new();
        vars.bind("t", Template::text("orders"));
        let t = fold_with(
            r#"<?php $q = "SELECT * FROM {$t} WHERE id = $id";"#,
            &vars,
            &ConstantTable::new(),
            None,
        );
        assert_eq!(t.leading_text(), "SELECT * FROM orders WHERE id = ");
        assert_eq!(t.holes(), vec!["$id"]);
    }

    #[test]
    fn test_heredoc_and_nowdoc() {
        let mut vars = Variables::new();
        vars.bind("t", Template::text("orders"));
        let t = fold_with(
            "<?php $q = <<<SQL\nSELECT *\nFROM $t\nSQL;\n",
            &vars,
            &ConstantTable::new(),
            None,
        );
        assert_eq!(t.fold().as_deref(), Some("SELECT *\nFROM orders"));

        let t = fold("<?php $q = <<<'SQL'\nDELETE FROM $t\nSQL;\n");
        assert_eq!(t.fold().as_deref(), Some("DELETE FROM $t"));
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(fold(r#"<?php $s = "a\tb\x41\101\$";"#).fold().as_deref(), Some("a\tbAA$"));
        assert_eq!(fold(r"<?php $s = 'it\'s \n';").fold().as_deref(), Some("it's \\n"));
    }

    #[test]
    fn test_depth_ceiling_yields_hole() {
        let source = "<?php $q = 'a' . 'b' . 'c' . 'd';";
        let tree = parse_file(Path::new(FILE), source).unwrap();
        let rhs = last_assignment_rhs(tree.root_node()).unwrap();
        let eval = Evaluator::new(source, FILE, 2);
        let vars = Variables::new();
        let constants = ConstantTable::new();
        let ctx = FoldContext {
            vars: &vars,
            class: None,
            constants: &constants,
        };
        assert_eq!(eval.fold(rhs, &ctx), None);
    }

    #[test]
    fn test_append_to_unbound_variable() {
        let mut vars = Variables::new();
        let t = vars.append("sql", Template::text(" WHERE 1")).clone();
        assert_eq!(t.holes(), vec!["$sql"]);
        vars.bind("q", Template::text("SELECT 1"));
        assert_eq!(vars.append("q", Template::text(" FROM t")).fold().as_deref(), Some("SELECT 1 FROM t"));
    }

    #[test]
    fn test_repeated_self_concat_stays_bounded() {
        let mut vars = Variables::new();
        vars.bind("a", Template::hole("$x"));
        for _ in 0..40 {
            let mut doubled = vars.get("a").cloned().unwrap_or_default();
            doubled.append(doubled.clone());
            vars.bind("a", doubled);
            assert!(vars.get("a").is_some_and(|t| t.pieces().len() <= MAX_TEMPLATE_PIECES));
        }
        // Once collapsed, the binding only refers to itself.
        assert!(vars.get("a").is_some_and(|t| t.holes().iter().all(|h| *h == "$a")));
    }

    #[test]
    fn test_wide_concat_collapses() {
        let mut vars = Variables::new();
        let mut t = Template::new();
        for i in 0..MAX_TEMPLATE_PIECES / 2 - 10 {
            t.push_text("x");
            t.push_hole(format!("$v{}", i));
        }
        vars.bind("wide", t);
        let t = fold_with("<?php $q = $wide . $wide;", &vars, &ConstantTable::new(), None);
        assert_eq!(t.holes(), vec!["$wide . $wide"]);
    }

    #[test]
    fn test_dirname_semantics() {
        assert_eq!(dirname("/a/b/c.php"), "/a/b");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("a.php"), ".");
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("lib/"), ".");
    }

    #[test]
    fn test_template_trailing_text() {
        let mut t = Template::text("../lib/");
        t.push_hole("$name");
        t.push_text(".inc");
        assert_eq!(t.trailing_text(), ".inc");
        assert_eq!(t.render_with(|i, _| format!("<{}>", i)), "../lib/<0>.inc");
    }
}
