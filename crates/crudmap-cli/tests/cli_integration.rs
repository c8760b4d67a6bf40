//! Integration tests for crudmap-cli functionality.
//! Tests the underlying library functions that the CLI commands invoke.

use std::fs;
use std::path::Path;

use crudmap_core::config::CrudmapConfig;
use crudmap_core::model::EdgeTarget;
use crudmap_core::storage;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn sample_project(root: &Path) {
    write(
        root,
        "index.php",
        "<?php\nrequire_once 'inc/db.php';\n$rows = db_query(\"SELECT o.id FROM orders o JOIN customers AS c ON c.id = o.cid\");\n",
    );
    write(
        root,
        "inc/db.php",
        "<?php\ndefine('LOG_TABLE', 'audit_log');\nfunction db_query($sql) {\n  mysql_query(\"INSERT INTO \" . LOG_TABLE . \" (q) VALUES ('x')\");\n  return mysql_query($sql);\n}\n",
    );
}

#[test]
fn test_report_not_found_before_analyze() {
    let tmpdir = tempfile::tempdir().unwrap();
    assert!(!storage::report_exists(tmpdir.path()));
    assert!(storage::load(tmpdir.path()).is_err());
}

#[test]
fn test_analyze_save_and_reload() {
    let tmpdir = tempfile::tempdir().unwrap();
    sample_project(tmpdir.path());

    let config = CrudmapConfig::load(tmpdir.path()).unwrap();
    let result = crudmap_engine::analyze(tmpdir.path(), &config).unwrap();
    storage::save(tmpdir.path(), &result).unwrap();
    assert!(storage::report_exists(tmpdir.path()));

    let loaded = storage::load(tmpdir.path()).unwrap();
    assert_eq!(loaded.crud, result.crud);
    assert_eq!(loaded.edges, result.edges);
    assert_eq!(loaded.summary(), result.summary());
}

#[test]
fn test_saved_report_is_ignored_by_discovery() {
    let tmpdir = tempfile::tempdir().unwrap();
    sample_project(tmpdir.path());
    let config = CrudmapConfig::default();

    let first = crudmap_engine::analyze(tmpdir.path(), &config).unwrap();
    storage::save(tmpdir.path(), &first).unwrap();
    let second = crudmap_engine::analyze(tmpdir.path(), &config).unwrap();
    assert_eq!(second.files_analyzed, 2);
    assert_eq!(first.crud, second.crud);
}

#[test]
fn test_crud_rows_for_sample_project() {
    let tmpdir = tempfile::tempdir().unwrap();
    sample_project(tmpdir.path());
    let result = crudmap_engine::analyze(tmpdir.path(), &CrudmapConfig::default()).unwrap();

    let rows: Vec<(String, String, String, String)> = result
        .crud_rows()
        .into_iter()
        .map(|r| {
            let flags = r.flags();
            (r.file, r.scope, r.table, flags)
        })
        .collect();
    assert!(rows.contains(&("index.php".into(), "main".into(), "orders".into(), "-R--".into())));
    assert!(rows.contains(&("index.php".into(), "main".into(), "customers".into(), "-R--".into())));
    assert!(rows.contains(&("inc/db.php".into(), "db_query".into(), "audit_log".into(), "C---".into())));
}

#[test]
fn test_edges_for_sample_project() {
    let tmpdir = tempfile::tempdir().unwrap();
    sample_project(tmpdir.path());
    let result = crudmap_engine::analyze(tmpdir.path(), &CrudmapConfig::default()).unwrap();

    assert_eq!(result.edges.len(), 1);
    assert_eq!(result.edges[0].target, EdgeTarget::Resolved("inc/db.php".into()));
    assert_eq!(result.summary().unresolved_edges, 0);
}

#[test]
fn test_config_file_is_honored() {
    let tmpdir = tempfile::tempdir().unwrap();
    sample_project(tmpdir.path());
    write(tmpdir.path(), "views.txt", "customers\n");
    write(
        tmpdir.path(),
        ".crudmap/config.toml",
        "[sql]\nview_list = \"views.txt\"\n\n[source]\nexclude = [\"inc/**\"]\n",
    );

    let config = CrudmapConfig::load(tmpdir.path()).unwrap();
    let result = crudmap_engine::analyze(tmpdir.path(), &config).unwrap();
    assert_eq!(result.files_analyzed, 1);
    let customers = result.crud.get("index.php", "main", "customers").unwrap();
    assert_eq!(customers.annotations.len(), 1);
    assert!(result.crud.scopes("inc/db.php").is_none());
}
