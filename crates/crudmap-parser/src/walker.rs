//! Per-scope statement walker.
//!
//! A [`ScopeWalker`] owns the variable bindings of exactly one scope. It walks
//! the scope's statements in document order, skipping nested scopes, and
//! records SQL candidates, include directives and constant definitions.

use crate::eval::{
    ExprKind, Evaluator, FoldContext, Layered, Template, Variables, call_arguments,
    class_constant_key, variable_name,
};
use crate::php;
use crate::scope::{is_scope_node, is_type_node};
use crate::sql::starts_with_sql_head;
use crudmap_core::constants::{ConstantDef, ConstantOrigin, ConstantTable, DefineOutcome};
use crudmap_core::error::AnalysisError;
use std::fmt;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

impl IncludeKind {
    fn of(kind: &str) -> Option<Self> {
        match kind {
            "include_expression" => Some(Self::Include),
            "include_once_expression" => Some(Self::IncludeOnce),
            "require_expression" => Some(Self::Require),
            "require_once_expression" => Some(Self::RequireOnce),
            _ => None,
        }
    }
}

impl fmt::Display for IncludeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Include => "include",
            Self::IncludeOnce => "include_once",
            Self::Require => "require",
            Self::RequireOnce => "require_once",
        };
        f.write_str(s)
    }
}

/// One `include`/`require` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeSite {
    pub kind: IncludeKind,
    /// Source text of the target expression.
    pub raw: String,
    pub target: Template,
    pub line: usize,
}

/// A string expression that looks like SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCandidate {
    pub template: Template,
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct ScopeFindings {
    pub candidates: Vec<SqlCandidate>,
    pub includes: Vec<IncludeSite>,
    /// Constants first bound by this scope.
    pub constants: Vec<ConstantDef>,
    pub errors: Vec<(AnalysisError, usize)>,
}

pub struct ScopeWalker<'w, 's> {
    eval: &'w Evaluator<'s>,
    global: &'w ConstantTable,
    /// Constants bound earlier in the same file.
    overlay: &'w mut ConstantTable,
    /// Path recorded as the origin of constant definitions.
    file: &'w str,
    /// Innermost type declaration last.
    classes: Vec<String>,
    vars: Variables,
    findings: ScopeFindings,
}

impl<'w, 's> ScopeWalker<'w, 's> {
    pub fn new(
        eval: &'w Evaluator<'s>,
        global: &'w ConstantTable,
        overlay: &'w mut ConstantTable,
        file: &'w str,
        class: Option<&str>,
    ) -> Self {
        Self {
            eval,
            global,
            overlay,
            file,
            classes: class.map(str::to_string).into_iter().collect(),
            vars: Variables::new(),
            findings: ScopeFindings::default(),
        }
    }

    pub fn walk(mut self, statements: &[Node]) -> ScopeFindings {
        for statement in statements {
            self.visit(*statement);
        }
        tracing::trace!(
            "scope walk done: {} candidate(s), {} include(s), {} binding(s)",
            self.findings.candidates.len(),
            self.findings.includes.len(),
            self.vars.len()
        );
        self.findings
    }

    fn template(&self, node: Node) -> Template {
        let constants = Layered {
            base: self.global,
            overlay: &*self.overlay,
        };
        let ctx = FoldContext {
            vars: &self.vars,
            class: self.classes.last().map(String::as_str),
            constants: &constants,
        };
        self.eval.template(node, &ctx)
    }

    fn visit(&mut self, node: Node) {
        if is_scope_node(&node) {
            return;
        }

        if is_type_node(&node) {
            let name = node
                .child_by_field_name("name")
                .map(|n| php::text(&n, self.eval.source()).to_string());
            let pushed = name.is_some();
            if let Some(name) = name {
                self.classes.push(name);
            }
            self.visit_children(node);
            if pushed {
                self.classes.pop();
            }
            return;
        }

        if let Some(kind) = IncludeKind::of(node.kind()) {
            self.include(node, kind);
            self.visit_children(node);
            return;
        }

        match node.kind() {
            "assignment_expression" => return self.assignment(node),
            "augmented_assignment_expression" => return self.augmented_assignment(node),
            "reference_assignment_expression" => {
                if let Some(name) = self.assigned_variable(node) {
                    self.vars.unbind(&name);
                }
                return self.visit_children(node);
            }
            "unset_statement" => {
                let mut cursor = node.walk();
                let names: Vec<String> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "variable_name")
                    .map(|c| variable_name(php::text(&c, self.eval.source())).to_string())
                    .collect();
                for name in names {
                    self.vars.unbind(&name);
                }
                return;
            }
            "const_declaration" => return self.const_declaration(node),
            "function_call_expression" => self.define_call(node),
            _ => {}
        }

        if ExprKind::of(&node).is_string_shaped() && is_maximal(node) {
            let template = self.template(node);
            self.candidate(template, php::line(&node));
        }
        self.visit_children(node);
    }

    fn visit_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn candidate(&mut self, template: Template, line: usize) {
        if starts_with_sql_head(template.leading_text()) {
            tracing::trace!("sql candidate at line {}", line);
            self.findings.candidates.push(SqlCandidate { template, line });
        }
    }

    fn assigned_variable(&self, node: Node) -> Option<String> {
        let left = node.child_by_field_name("left")?;
        (left.kind() == "variable_name")
            .then(|| variable_name(php::text(&left, self.eval.source())).to_string())
    }

    /// `$x = expr`
    fn assignment(&mut self, node: Node) {
        if let Some(right) = node.child_by_field_name("right") {
            self.visit(right);
        }
        let Some(name) = self.assigned_variable(node) else {
            // Property, array element or list destructuring: not tracked.
            return;
        };
        match node.child_by_field_name("right") {
            Some(right) => {
                let value = self.template(right);
                self.vars.bind(&name, value);
            }
            None => self.vars.unbind(&name),
        }
    }

    /// `$x .= expr` appends; every other compound operator unbinds.
    fn augmented_assignment(&mut self, node: Node) {
        let right = node.child_by_field_name("right");
        if let Some(right) = right {
            self.visit(right);
        }
        let Some(name) = self.assigned_variable(node) else {
            return;
        };
        let is_append = node
            .child_by_field_name("operator")
            .is_some_and(|op| op.kind() == ".=");
        match right {
            Some(right) if is_append => {
                let value = self.template(right);
                let combined = self.vars.append(&name, value).clone();
                self.candidate(combined, php::line(&node));
            }
            _ => self.vars.unbind(&name),
        }
    }

    fn include(&mut self, node: Node, kind: IncludeKind) {
        let Some(target) = node.named_child(0) else {
            return;
        };
        let site = IncludeSite {
            kind,
            raw: php::text(&target, self.eval.source()).to_string(),
            target: self.template(target),
            line: php::line(&node),
        };
        tracing::trace!("{} {} at line {}", site.kind, site.raw, site.line);
        self.findings.includes.push(site);
    }

    /// `define('NAME', value)`
    fn define_call(&mut self, node: Node) {
        let is_define = node.child_by_field_name("function").is_some_and(|f| {
            php::text(&f, self.eval.source())
                .trim_start_matches('\\')
                .eq_ignore_ascii_case("define")
        });
        if !is_define {
            return;
        }
        let args = call_arguments(node);
        let (Some(name), Some(value)) = (args.first(), args.get(1)) else {
            return;
        };
        let (Some(name), Some(value)) = (self.template(*name).fold(), self.template(*value).fold())
        else {
            return;
        };
        self.define(name.trim_start_matches('\\').to_string(), value, php::line(&node));
    }

    /// `const NAME = value, …` at file level or in a type body.
    fn const_declaration(&mut self, node: Node) {
        let mut cursor = node.walk();
        let elements: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "const_element")
            .collect();
        for element in elements {
            let count = element.named_child_count();
            let (Some(name), Some(value)) = (
                element.named_child(0),
                count
                .checked_sub(1)
                .and_then(|i| u32::try_from(i).ok())
                .and_then(|i| element.named_child(i)),
            ) else {
                continue;
            };
            if name.id() == value.id() {
                continue;
            }
            let name = php::text(&name, self.eval.source()).to_string();
            let key = match self.classes.last() {
                Some(class) => class_constant_key(class, &name),
                None => name,
            };
            if let Some(value) = self.template(value).fold() {
                self.define(key, value, php::line(&element));
            }
        }
    }

    fn define(&mut self, name: String, value: String, line: usize) {
        let origin = ConstantOrigin {
            file: self.file.to_string(),
            line,
        };
        match self.global.origin(&name) {
            // Already known from an earlier discovery pass over this very site.
            Some(first) if *first == origin => return,
            Some(first) => {
                self.redefined(name, first.to_string(), line);
                return;
            }
            None => {}
        }
        let def = ConstantDef {
            name,
            value,
            origin,
        };
        match self.overlay.define(def.clone()) {
            DefineOutcome::Bound => {
                tracing::debug!("constant {} = {:?}", def.name, def.value);
                self.findings.constants.push(def);
            }
            DefineOutcome::Repeated => {}
            DefineOutcome::Conflict(first) => self.redefined(def.name, first.to_string(), line),
        }
    }

    fn redefined(&mut self, name: String, first: String, line: usize) {
        tracing::warn!("constant {} redefined at {}:{}", name, self.file, line);
        self.findings
            .errors
            .push((AnalysisError::ConstantRedefined { name, first }, line));
    }
}

/// Not an operand of an enclosing concatenation.
fn is_maximal(node: Node) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match ExprKind::of(&parent) {
            ExprKind::Parenthesized => current = parent,
            ExprKind::Concat => return false,
            _ => return true,
        }
    }
    true
}
