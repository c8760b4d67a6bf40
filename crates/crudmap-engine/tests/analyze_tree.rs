use std::fs;
use std::path::Path;

use crudmap_core::config::{ConstantPolicy, CrudmapConfig};
use crudmap_core::diagnostics::DiagnosticKind;
use crudmap_core::model::{Annotation, EdgeTarget, Operation};
use crudmap_engine::analyze;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_folded_variable_table() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "report.src",
        "<?php\n$t = \"orders\";\n$sql = \"SELECT * FROM \" . $t . \";\";\n",
    );

    let result = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    let rows = result.crud_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].file, "report.src");
    assert_eq!(rows[0].scope, "main");
    assert_eq!(rows[0].table, "orders");
    assert_eq!(rows[0].flags(), "-R--");
}

#[test]
fn test_constant_table_in_function() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "purge.php",
        "<?php\ndefine(\"TBL\",\"users\");\nfunction f(){ $q = \"DELETE FROM TBL\"; }\n",
    );

    let result = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    let users = result.crud.get("purge.php", "f", "users").unwrap();
    assert!(users.has(Operation::Delete));
    assert_eq!(users.operations.len(), 1);
    assert!(result.diagnostics_of(DiagnosticKind::ConstantRedefined).next().is_none());
}

#[test]
fn test_dynamic_include_is_unresolved() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "app/page.php",
        "<?php\ninclude \"../lib/\" . $name . \".inc\";\n",
    );
    write(tmp.path(), "lib/orders.inc", "<?php\n");

    let result = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    assert_eq!(
        result.edge_rows(),
        vec![("app/page.php", "\"../lib/\" . $name . \".inc\"", "UNRESOLVED", 1)]
    );
    assert_eq!(
        result.diagnostics_of(DiagnosticKind::UnresolvedReference).count(),
        1
    );
}

#[test]
fn test_cross_file_constant_in_include_path() {
    let tmp = tempfile::tempdir().unwrap();
    // `admin/` sorts before `config.php`, so only two-pass sees LIB_DIR.
    write(tmp.path(), "admin/index.php", "<?php\nrequire LIB_DIR . '/db.php';\n");
    write(tmp.path(), "config.php", "<?php\ndefine('LIB_DIR', 'lib');\n");
    write(tmp.path(), "lib/db.php", "<?php\n$q = 'SELECT * FROM accounts';\n");

    let result = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    let edge = &result.edges[0];
    assert_eq!(edge.source, "admin/index.php");
    assert_eq!(edge.target, EdgeTarget::Resolved("lib/db.php".into()));
    assert!(edge.candidates.is_empty());

    let mut config = CrudmapConfig::default();
    config.engine.constant_policy = ConstantPolicy::Streaming;
    let result = analyze(tmp.path(), &config).unwrap();
    // Unfolded, the target is still scored from its trailing path.
    let edge = &result.edges[0];
    assert_eq!(edge.target, EdgeTarget::Resolved("lib/db.php".into()));
    assert_eq!(edge.candidates, vec!["lib/db.php"]);
}

#[test]
fn test_circular_includes_terminate() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "a.php", "<?php include 'b.php';\n");
    write(tmp.path(), "b.php", "<?php include 'a.php';\n");

    let result = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    let from_a: Vec<(&str, &str, usize)> = result
        .edges
        .iter()
        .filter(|e| e.origin == "a.php")
        .map(|e| (e.source.as_str(), e.target.label(), e.depth))
        .collect();
    assert_eq!(from_a, vec![("a.php", "b.php", 1), ("b.php", "CIRCULAR", 2)]);
    assert_eq!(result.summary().circular_edges, 2);
    assert_eq!(result.diagnostics_of(DiagnosticKind::CircularInclude).count(), 2);
}

#[test]
fn test_broken_file_keeps_its_evidence() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "legacy.php",
        "<?php\nif ($ok) {\n  mysql_query(\"UPDATE accounts SET balance = 0\");\n  foreach ( as ) {\n",
    );
    write(tmp.path(), "fine.php", "<?php $q = 'SELECT * FROM orders';\n");

    let result = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    let accounts = result.crud.get("legacy.php", "main", "accounts").unwrap();
    assert!(accounts.has(Operation::Update));
    assert!(result.crud.get("fine.php", "main", "orders").is_some());
    assert!(result.diagnostics_of(DiagnosticKind::Syntax).any(|d| d.file == "legacy.php"));
}

#[test]
fn test_unresolved_table_survives_to_report() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "lib/repo.php",
        "<?php\nclass Repo {\n  function wipe($table) { return \"TRUNCATE \" . $table; }\n}\n",
    );

    let result = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    let r = result.crud.get("lib/repo.php", "Repo::wipe", "$table").unwrap();
    assert!(r.has(Operation::Delete));
    assert!(r.is(Annotation::Unresolved));
    let unresolved: Vec<_> = result
        .diagnostics_of(DiagnosticKind::UnresolvedReference)
        .map(|d| (d.file.as_str(), d.line))
        .collect();
    assert_eq!(unresolved, vec![("lib/repo.php", Some(3))]);
}

#[test]
fn test_analysis_is_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..12 {
        write(
            tmp.path(),
            &format!("m{:02}/page.php", i),
            &format!(
                "<?php\ninclude '../shared/db.php';\n$q = \"INSERT INTO log_{} (a) VALUES (1)\";\n",
                i
            ),
        );
    }
    write(tmp.path(), "shared/db.php", "<?php define('DSN', 'x');\n");

    let first = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    let second = analyze(tmp.path(), &CrudmapConfig::default()).unwrap();
    assert_eq!(first.crud, second.crud);
    assert_eq!(first.edges, second.edges);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.files_analyzed, 13);
    assert_eq!(first.crud.files().count(), 12);
}

#[test]
fn test_view_list_from_config() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "views.txt", "# known views\nActive_Users\n");
    write(tmp.path(), "list.php", "<?php $q = 'SELECT * FROM active_users';\n");

    let mut config = CrudmapConfig::default();
    config.sql.view_list = Some(tmp.path().join("views.txt"));
    let result = analyze(tmp.path(), &config).unwrap();
    let r = result.crud.get("list.php", "main", "active_users").unwrap();
    assert!(r.is(Annotation::View));
    assert!(r.has(Operation::Read));
}
