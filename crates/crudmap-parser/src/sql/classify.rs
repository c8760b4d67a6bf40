//! CRUD classification rules over the normalized token stream.
//!
//! A single left-to-right scan visits every token. Keywords dispatch to a
//! rule that records table references and returns where the scan resumes.
//! Rules never skip past a parenthesis, so the scan itself tracks which
//! parenthesized groups are queries (`(SELECT …)`) and which are function
//! arguments (`EXTRACT(YEAR FROM d)`), and nested queries are classified by
//! the same pass.

use super::lexer::Tok;
use crudmap_core::model::{Annotation, Operation};
use crudmap_core::names::NameList;

/// Words that never name a table.
const RESERVED: &[&str] = &[
    "after", "all", "and", "as", "asc", "before", "between", "btree", "by", "call", "case",
    "create", "cross", "default", "delayed", "delete", "desc", "distinct", "drop", "dual",
    "dumpfile", "else", "end", "escape", "except", "exec", "execute", "exists", "fetch", "for",
    "force", "from", "full", "global", "group", "hash", "having", "high_priority", "if",
    "ignore", "immediate", "in", "index", "inner", "insert", "intersect", "into", "is", "join",
    "key", "lateral", "left", "like", "limit", "local", "lock", "low_priority", "materialized",
    "merge", "minus", "natural", "not", "null", "offset", "on", "only", "or", "order", "outer",
    "outfile", "partition", "primary", "proc", "procedure", "quick", "recursive", "replace",
    "returning", "right", "select", "set", "straight_join", "table", "temp", "temporary", "then",
    "top", "truncate", "union", "unique", "unlogged", "update", "use", "using", "value",
    "values", "view", "when", "where", "window", "with",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// A possibly qualified name as written (`schema.table`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    pub parts: Vec<String>,
    /// The last part was quoted.
    pub quoted: bool,
}

impl NameRef {
    pub fn last(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }
}

/// One table reference before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRef {
    pub name: NameRef,
    pub operations: Vec<Operation>,
    pub annotations: Vec<Annotation>,
}

/// Classify one tokenized statement (or several, separated by `;`).
pub fn classify(toks: &[Tok], procedures: &NameList) -> Vec<RawRef> {
    let mut classifier = Classifier {
        toks,
        procedures,
        refs: Vec::new(),
        groups: Vec::new(),
        seen_select: false,
    };
    let mut i = 0;
    while i < toks.len() {
        i = classifier.step(i).max(i + 1);
    }
    classifier.refs
}

struct Classifier<'a> {
    toks: &'a [Tok],
    procedures: &'a NameList,
    refs: Vec<RawRef>,
    /// One entry per open parenthesis: whether it holds a query.
    groups: Vec<bool>,
    seen_select: bool,
}

impl Classifier<'_> {
    fn step(&mut self, i: usize) -> usize {
        match &self.toks[i] {
            Tok::LParen => {
                self.groups.push(self.is_any(i + 1, &["SELECT", "WITH"]));
                i + 1
            }
            Tok::RParen => {
                self.groups.pop();
                i + 1
            }
            Tok::Semi => {
                self.seen_select = false;
                i + 1
            }
            Tok::Word { value, quoted: false } => {
                let keyword = value.to_ascii_uppercase();
                self.keyword(&keyword, i)
            }
            Tok::Word { quoted: true, .. } => self.procedure_call(i),
            _ => i + 1,
        }
    }

    fn keyword(&mut self, keyword: &str, i: usize) -> usize {
        match keyword {
            "WITH" => self.with_clause(i),
            "SELECT" => {
                self.seen_select = true;
                i + 1
            }
            "INSERT" => self.insert(i, &[Operation::Create]),
            "REPLACE" => self.insert(i, &[Operation::Create, Operation::Update]),
            "UPDATE" => self.update(i),
            "DELETE" => self.delete(i),
            "MERGE" => self.merge(i),
            "USING" => self.using(i),
            "DROP" => self.drop(i),
            "TRUNCATE" => self.truncate(i),
            "CREATE" => self.create(i),
            "INTO" => self.select_into(i),
            "FROM" => self.from(i),
            "JOIN" | "STRAIGHT_JOIN" => self.join(i),
            "CALL" => self.call(i),
            "EXEC" | "EXECUTE" => self.exec(i),
            _ => self.procedure_call(i),
        }
    }

    // --- rules ---

    /// `WITH [RECURSIVE] c [(cols)] AS [NOT] [MATERIALIZED] (…) [, …]`
    fn with_clause(&mut self, i: usize) -> usize {
        let mut j = self.skip(i + 1, &["RECURSIVE"]);
        while let Some((name, mut k)) = self.name_at(j) {
            if self.is_lparen(k) {
                k = self.matching(k) + 1;
            }
            if !self.is(k, "AS") {
                break;
            }
            k = self.skip(k + 1, &["NOT", "MATERIALIZED"]);
            if !self.is_lparen(k) {
                break;
            }
            self.push(
                name,
                &[Operation::Create, Operation::Read],
                &[Annotation::Temp],
            );
            let close = self.matching(k);
            if matches!(self.toks.get(close + 1), Some(Tok::Comma)) {
                j = close + 2;
            } else {
                break;
            }
        }
        i + 1
    }

    /// `INSERT|REPLACE [modifiers] [INTO] t`
    fn insert(&mut self, i: usize, operations: &[Operation]) -> usize {
        let mut j = self.skip(i + 1, &["LOW_PRIORITY", "DELAYED", "HIGH_PRIORITY", "IGNORE"]);
        let into = self.is(j, "INTO");
        if into {
            j += 1;
        }
        let Some((name, next)) = self.name_at(j) else {
            return i + 1;
        };
        // Without INTO, insist on an insert body so prose like "Replace all" is ignored.
        if !into && !self.is_lparen(next) && !self.is_any(next, &["VALUES", "VALUE", "SET", "SELECT"]) {
            return i + 1;
        }
        self.push(name, operations, &[]);
        next
    }

    /// `UPDATE [modifiers] t [alias] [, …] … SET`
    fn update(&mut self, i: usize) -> usize {
        if self.prev_is_any(i, &["FOR", "KEY", "ON", "BEFORE", "AFTER", "OF"]) {
            return i + 1;
        }
        let j = self.skip(i + 1, &["LOW_PRIORITY", "IGNORE", "ONLY"]);
        if !self.later_at_same_depth(j, "SET") {
            return i + 1;
        }
        for (name, _) in self.table_list(j) {
            self.push(name, &[Operation::Update], &[]);
        }
        i + 1
    }

    /// `DELETE [modifiers] FROM t` or the multi-table `DELETE t1, t2 FROM …`.
    fn delete(&mut self, i: usize) -> usize {
        if self.prev_is_any(i, &["ON", "BEFORE", "AFTER"]) {
            return i + 1;
        }
        let j = self.skip(i + 1, &["LOW_PRIORITY", "QUICK", "IGNORE"]);
        if self.is(j, "FROM") {
            for (name, _) in self.table_list(j + 1) {
                self.push(name, &[Operation::Delete], &[]);
            }
            // Resume after FROM so the deleted tables are not also read.
            return j + 1;
        }

        let (targets, next) = self.name_list(j);
        if targets.is_empty() || !self.is(next, "FROM") {
            return i + 1;
        }
        let sources = self.table_list(next + 1);
        for target in targets {
            // Targets may name a FROM alias.
            let resolved = sources
                .iter()
                .find(|(_, alias)| {
                    target.parts.len() == 1
                        && alias
                            .as_deref()
                            .is_some_and(|a| a.eq_ignore_ascii_case(target.last()))
                })
                .map_or(target, |(table, _)| table.clone());
            self.push(resolved, &[Operation::Delete], &[]);
        }
        next
    }

    /// `MERGE [INTO] t … USING s`
    fn merge(&mut self, i: usize) -> usize {
        let into = self.is(i + 1, "INTO");
        let j = if into { i + 2 } else { i + 1 };
        let Some((name, next)) = self.name_at(j) else {
            return i + 1;
        };
        if !into && !self.later_at_same_depth(next, "USING") {
            return i + 1;
        }
        self.push(name, &[Operation::Create, Operation::Update], &[]);
        next
    }

    /// `USING s`: merge sources and `DELETE … USING` lists. `USING (col)` is skipped.
    fn using(&mut self, i: usize) -> usize {
        for (name, _) in self.table_list(i + 1) {
            self.push(name, &[Operation::Read], &[]);
        }
        i + 1
    }

    /// `DROP [TEMPORARY] TABLE [IF EXISTS] t [, …]`
    fn drop(&mut self, i: usize) -> usize {
        let mut j = self.skip(i + 1, &["TEMPORARY", "TEMP"]);
        if !self.is(j, "TABLE") {
            return i + 1;
        }
        j += 1;
        if self.is(j, "IF") && self.is(j + 1, "EXISTS") {
            j += 2;
        }
        let (names, next) = self.name_list(j);
        for name in names {
            self.push(name, &[Operation::Delete], &[]);
        }
        next
    }

    /// `TRUNCATE [TABLE] t`
    fn truncate(&mut self, i: usize) -> usize {
        let j = self.skip(i + 1, &["TABLE"]);
        match self.name_at(j) {
            Some((name, next)) => {
                self.push(name, &[Operation::Delete], &[]);
                next
            }
            None => i + 1,
        }
    }

    /// `CREATE [OR REPLACE] [GLOBAL|LOCAL] [TEMP|TEMPORARY] [UNLOGGED] TABLE [IF NOT EXISTS] t`
    /// and `CREATE [OR REPLACE] [MATERIALIZED] VIEW v`.
    fn create(&mut self, i: usize) -> usize {
        let mut j = i + 1;
        if self.is(j, "OR") && self.is(j + 1, "REPLACE") {
            j += 2;
        }
        let mut temp = false;
        while self.is_any(j, &["GLOBAL", "LOCAL", "TEMP", "TEMPORARY", "UNLOGGED", "MATERIALIZED"]) {
            temp |= self.is_any(j, &["TEMP", "TEMPORARY"]);
            j += 1;
        }
        let annotation = if self.is(j, "TABLE") {
            temp.then_some(Annotation::Temp)
        } else if self.is(j, "VIEW") {
            Some(Annotation::View)
        } else {
            return i + 1;
        };
        j += 1;
        if self.is(j, "IF") && self.is(j + 1, "NOT") && self.is(j + 2, "EXISTS") {
            j += 3;
        }
        let Some((name, next)) = self.name_at(j) else {
            return i + 1;
        };
        let mut annotations: Vec<Annotation> = annotation.into_iter().collect();
        if temp && !annotations.contains(&Annotation::Temp) {
            annotations.push(Annotation::Temp);
        }
        self.push(name, &[Operation::Create], &annotations);
        next
    }

    /// `SELECT … INTO [TEMP|TEMPORARY] [UNLOGGED] [TABLE] t`
    fn select_into(&mut self, i: usize) -> usize {
        if !self.seen_select {
            return i + 1;
        }
        let mut j = i + 1;
        let mut temp = false;
        while self.is_any(j, &["TEMP", "TEMPORARY", "UNLOGGED", "TABLE"]) {
            temp |= self.is_any(j, &["TEMP", "TEMPORARY"]);
            j += 1;
        }
        if self.is_any(j, &["OUTFILE", "DUMPFILE"]) {
            return i + 1;
        }
        let Some((name, next)) = self.name_at(j) else {
            return i + 1;
        };
        let annotations: &[Annotation] = if temp { &[Annotation::Temp] } else { &[] };
        self.push(name, &[Operation::Create], annotations);
        next
    }

    /// `FROM t [alias] [, …]` in a query.
    fn from(&mut self, i: usize) -> usize {
        let in_query = self.groups.last().copied().unwrap_or(true);
        if !in_query || self.prev_is_any(i, &["DISTINCT"]) {
            return i + 1;
        }
        for (name, _) in self.table_list(i + 1) {
            self.push(name, &[Operation::Read], &[]);
        }
        i + 1
    }

    fn join(&mut self, i: usize) -> usize {
        let j = self.skip(i + 1, &["LATERAL"]);
        if let Some((name, next)) = self.name_at(j)
            && !self.is_lparen(next)
        {
            self.push(name, &[Operation::Read], &[]);
        }
        i + 1
    }

    /// `CALL p[(…)]`
    fn call(&mut self, i: usize) -> usize {
        let Some((name, next)) = self.name_at(i + 1) else {
            return i + 1;
        };
        if matches!(self.toks.get(next), None | Some(Tok::LParen | Tok::Semi)) {
            self.push(name, &[], &[Annotation::Procedure]);
        }
        i + 1
    }

    /// `EXEC[UTE] [PROCEDURE|PROC] p [args]`
    fn exec(&mut self, i: usize) -> usize {
        let j = self.skip(i + 1, &["PROCEDURE", "PROC"]);
        let Some((name, next)) = self.name_at(j) else {
            return i + 1;
        };
        let plausible = match self.toks.get(next) {
            Some(Tok::Word { value, quoted: false }) => value.starts_with('@'),
            _ => true,
        };
        if plausible {
            self.push(name, &[], &[Annotation::Procedure]);
        }
        i + 1
    }

    /// `p(…)` where `p` is a known stored procedure.
    fn procedure_call(&mut self, i: usize) -> usize {
        if self.procedures.is_empty() || matches!(i.checked_sub(1).map(|p| &self.toks[p]), Some(Tok::Dot)) {
            return i + 1;
        }
        if let Some((name, next)) = self.name_at(i)
            && self.is_lparen(next)
            && self.procedures.contains(name.last())
        {
            self.push(name, &[], &[Annotation::Procedure]);
        }
        i + 1
    }

    // --- token helpers ---

    fn is(&self, j: usize, keyword: &str) -> bool {
        self.toks.get(j).is_some_and(|t| t.is_keyword(keyword))
    }

    fn is_any(&self, j: usize, keywords: &[&str]) -> bool {
        self.toks.get(j).is_some_and(|t| t.is_any_keyword(keywords))
    }

    fn is_lparen(&self, j: usize) -> bool {
        matches!(self.toks.get(j), Some(Tok::LParen))
    }

    fn prev_is_any(&self, i: usize, keywords: &[&str]) -> bool {
        i.checked_sub(1).is_some_and(|p| self.is_any(p, keywords))
    }

    fn skip(&self, mut j: usize, keywords: &[&str]) -> usize {
        while self.is_any(j, keywords) {
            j += 1;
        }
        j
    }

    /// Index of the parenthesis closing the one at `open` (last index if unbalanced).
    fn matching(&self, open: usize) -> usize {
        let mut depth = 0usize;
        for (k, tok) in self.toks.iter().enumerate().skip(open) {
            match tok {
                Tok::LParen => depth += 1,
                Tok::RParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return k;
                    }
                }
                _ => {}
            }
        }
        self.toks.len().saturating_sub(1)
    }

    /// Whether `keyword` occurs from `j` on before the enclosing group or statement ends.
    fn later_at_same_depth(&self, j: usize, keyword: &str) -> bool {
        let mut depth = 0usize;
        for tok in self.toks.iter().skip(j) {
            match tok {
                Tok::LParen => depth += 1,
                Tok::RParen if depth == 0 => return false,
                Tok::RParen => depth -= 1,
                Tok::Semi if depth == 0 => return false,
                t if depth == 0 && t.is_keyword(keyword) => return true,
                _ => {}
            }
        }
        false
    }

    /// A (possibly dotted) name starting at `j`.
    fn name_at(&self, j: usize) -> Option<(NameRef, usize)> {
        let Some(Tok::Word { value, quoted }) = self.toks.get(j) else {
            return None;
        };
        if !quoted && (is_reserved(value) || value.starts_with(['@', ':'])) {
            return None;
        }
        let mut parts = vec![value.clone()];
        let mut last_quoted = *quoted;
        let mut k = j + 1;
        while let (Some(Tok::Dot), Some(Tok::Word { value, quoted })) =
            (self.toks.get(k), self.toks.get(k + 1))
        {
            parts.push(value.clone());
            last_quoted = *quoted;
            k += 2;
        }
        Some((
            NameRef {
                parts,
                quoted: last_quoted,
            },
            k,
        ))
    }

    /// Comma-separated names without aliases.
    fn name_list(&self, mut j: usize) -> (Vec<NameRef>, usize) {
        let mut names = Vec::new();
        while let Some((name, next)) = self.name_at(j) {
            names.push(name);
            j = next;
            if matches!(self.toks.get(j), Some(Tok::Comma)) {
                j += 1;
            } else {
                break;
            }
        }
        (names, j)
    }

    /// A FROM-style list: tables with optional aliases, separated by commas.
    /// Parenthesized items and table functions are skipped.
    fn table_list(&self, mut j: usize) -> Vec<(NameRef, Option<String>)> {
        let mut tables = Vec::new();
        loop {
            j = self.skip(j, &["LATERAL", "ONLY"]);
            let mut table = None;
            if self.is_lparen(j) {
                j = self.matching(j) + 1;
            } else {
                let Some((name, next)) = self.name_at(j) else {
                    break;
                };
                j = next;
                if self.is_lparen(j) {
                    j = self.matching(j) + 1;
                } else {
                    table = Some(name);
                }
            }

            let mut alias = None;
            if self.is(j, "AS") {
                j += 1;
            }
            if let Some(Tok::Word { value, quoted }) = self.toks.get(j)
                && (*quoted || !is_reserved(value))
            {
                alias = Some(value.clone());
                j += 1;
            }
            if let Some(name) = table {
                tables.push((name, alias));
            }

            if matches!(self.toks.get(j), Some(Tok::Comma)) {
                j += 1;
            } else {
                break;
            }
        }
        tables
    }

    fn push(&mut self, name: NameRef, operations: &[Operation], annotations: &[Annotation]) {
        tracing::trace!("sql reference {:?} {:?}", name.parts, operations);
        self.refs.push(RawRef {
            name,
            operations: operations.to_vec(),
            annotations: annotations.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::lexer::tokenize;
    use std::collections::BTreeMap;

    /// table (last part, lowercased) → (CRUD letters, annotations)
    fn run_with(sql: &str, procedures: &NameList) -> BTreeMap<String, (String, Vec<Annotation>)> {
        let toks = tokenize(sql).unwrap();
        let mut out: BTreeMap<String, (Vec<Operation>, Vec<Annotation>)> = BTreeMap::new();
        for r in classify(&toks, procedures) {
            let entry = out.entry(r.name.last().to_lowercase()).or_default();
            entry.0.extend(r.operations);
            entry.1.extend(r.annotations);
        }
        out.into_iter()
            .map(|(k, (mut ops, mut ann))| {
                ops.sort();
                ops.dedup();
                ann.sort();
                ann.dedup();
                (k, (ops.iter().map(|o| o.letter()).collect(), ann))
            })
            .collect()
    }

    fn run(sql: &str) -> BTreeMap<String, (String, Vec<Annotation>)> {
        run_with(sql, &NameList::new())
    }

    fn ops(map: &BTreeMap<String, (String, Vec<Annotation>)>, table: &str) -> String {
        map.get(table).map(|(o, _)| o.clone()).unwrap_or_default()
    }

    #[test]
    fn test_select_with_aliases_and_joins() {
        let m = run("SELECT o.id FROM orders AS o, customers c LEFT JOIN items i ON i.oid = o.id");
        assert_eq!(m.len(), 3);
        assert_eq!(ops(&m, "orders"), "R");
        assert_eq!(ops(&m, "customers"), "R");
        assert_eq!(ops(&m, "items"), "R");
    }

    #[test]
    fn test_schema_qualified_name_keeps_parts() {
        let toks = tokenize("SELECT * FROM sales.orders").unwrap();
        let refs = classify(&toks, &NameList::new());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name.parts, vec!["sales", "orders"]);
    }

    #[test]
    fn test_insert_update_delete() {
        assert_eq!(ops(&run("INSERT INTO logs (a) VALUES (1)"), "logs"), "C");
        assert_eq!(ops(&run("INSERT IGNORE INTO logs SET a = 1"), "logs"), "C");
        assert_eq!(ops(&run("UPDATE users SET name = 'x' WHERE id = 1"), "users"), "U");
        assert_eq!(ops(&run("DELETE FROM sessions WHERE ts < 0"), "sessions"), "D");
    }

    #[test]
    fn test_delete_from_is_not_a_read() {
        let m = run("DELETE FROM a WHERE id IN (SELECT id FROM b)");
        assert_eq!(ops(&m, "a"), "D");
        assert_eq!(ops(&m, "b"), "R");
    }

    #[test]
    fn test_multi_table_delete_resolves_alias() {
        let m = run("DELETE o FROM orders o JOIN customers c ON c.id = o.cid");
        assert_eq!(ops(&m, "orders"), "RD");
        assert_eq!(ops(&m, "customers"), "R");
        assert!(!m.contains_key("o"));
    }

    #[test]
    fn test_update_not_confused_with_clauses() {
        let m = run("SELECT * FROM t FOR UPDATE");
        assert_eq!(m.len(), 1);
        let m = run("INSERT INTO t (a) VALUES (1) ON DUPLICATE KEY UPDATE a = 2");
        assert_eq!(ops(&m, "t"), "C");
        assert!(!m.contains_key("a"));
        // Prose without SET is not an UPDATE.
        assert!(run("Update your profile").is_empty());
    }

    #[test]
    fn test_replace_and_merge() {
        assert_eq!(ops(&run("REPLACE INTO cache (k) VALUES ('x')"), "cache"), "CU");
        let m = run("MERGE INTO stock s USING deliveries d ON s.id = d.id WHEN MATCHED THEN UPDATE SET qty = 1");
        assert_eq!(ops(&m, "stock"), "CU");
        assert_eq!(ops(&m, "deliveries"), "R");
        // REPLACE() string function is not a table write.
        assert!(run("SELECT REPLACE(name, 'a', 'b') FROM users").get("name").is_none());
    }

    #[test]
    fn test_drop_and_truncate() {
        let m = run("DROP TABLE IF EXISTS a, b");
        assert_eq!(ops(&m, "a"), "D");
        assert_eq!(ops(&m, "b"), "D");
        assert_eq!(ops(&run("TRUNCATE TABLE logs"), "logs"), "D");
        assert_eq!(ops(&run("TRUNCATE logs"), "logs"), "D");
    }

    #[test]
    fn test_temp_tables() {
        let m = run("CREATE TEMPORARY TABLE tmp_ids (id INT)");
        assert_eq!(m["tmp_ids"], ("C".to_string(), vec![Annotation::Temp]));

        let m = run("SELECT id INTO TEMP recent FROM orders");
        assert_eq!(m["recent"], ("C".to_string(), vec![Annotation::Temp]));
        assert_eq!(ops(&m, "orders"), "R");

        let m = run("CREATE TABLE archive AS SELECT * FROM orders");
        assert_eq!(m["archive"], ("C".to_string(), vec![]));
        assert_eq!(ops(&m, "orders"), "R");
    }

    #[test]
    fn test_select_into_variable_is_ignored() {
        let m = run("SELECT count(*) INTO @n FROM orders");
        assert_eq!(m.len(), 1);
        assert_eq!(ops(&m, "orders"), "R");
    }

    #[test]
    fn test_cte_dual_role() {
        let m = run(
            "WITH recent (id) AS (SELECT id FROM orders), big AS (SELECT * FROM recent) \
             SELECT * FROM big JOIN customers ON 1 = 1",
        );
        assert_eq!(m["recent"], ("CR".to_string(), vec![Annotation::Temp]));
        assert_eq!(m["big"], ("CR".to_string(), vec![Annotation::Temp]));
        assert_eq!(ops(&m, "orders"), "R");
        assert_eq!(ops(&m, "customers"), "R");
    }

    #[test]
    fn test_subquery_in_from_is_skipped_as_table() {
        let m = run("SELECT * FROM (SELECT id FROM orders) AS sub, users u");
        assert_eq!(ops(&m, "orders"), "R");
        assert_eq!(ops(&m, "users"), "R");
        assert!(!m.contains_key("sub"));
    }

    #[test]
    fn test_from_inside_function_call() {
        let m = run("SELECT EXTRACT(YEAR FROM created) FROM orders");
        assert_eq!(m.len(), 1);
        assert_eq!(ops(&m, "orders"), "R");
        let m = run("SELECT a FROM t WHERE a IS DISTINCT FROM b");
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_table_function_skipped() {
        let m = run("SELECT * FROM generate_series(1, 10) g, orders");
        assert_eq!(m.len(), 1);
        assert_eq!(ops(&m, "orders"), "R");
    }

    #[test]
    fn test_create_view() {
        let m = run("CREATE OR REPLACE VIEW active_users AS SELECT * FROM users");
        assert_eq!(m["active_users"], ("C".to_string(), vec![Annotation::View]));
        assert_eq!(ops(&m, "users"), "R");
    }

    #[test]
    fn test_procedures() {
        let m = run("CALL refresh_totals(1)");
        assert_eq!(m["refresh_totals"], (String::new(), vec![Annotation::Procedure]));
        let m = run("EXEC dbo.rebuild_index");
        assert_eq!(m["rebuild_index"], (String::new(), vec![Annotation::Procedure]));
        assert!(run("Call us at noon").is_empty());

        let procs: NameList = ["calc_tax"].into_iter().collect();
        let m = run_with("SELECT calc_tax(amount) FROM invoices", &procs);
        assert_eq!(m["calc_tax"].1, vec![Annotation::Procedure]);
        assert_eq!(ops(&m, "invoices"), "R");
    }

    #[test]
    fn test_reserved_words_never_tables() {
        assert!(run("SELECT 1 FROM DUAL").is_empty());
        assert!(is_reserved("Where"));
        assert!(!is_reserved("users"));
    }
}
