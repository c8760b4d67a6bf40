use crudmap_core::diagnostics::{Diagnostic, DiagnosticKind};
use crudmap_core::error::AnalysisError;
use crudmap_core::model::*;
use crudmap_core::report::AnalysisResult;
use crudmap_core::storage;
use tempfile::TempDir;

fn sample_result() -> AnalysisResult {
    let mut result = AnalysisResult::new("/srv/app");
    result.files_analyzed = 3;

    let mut tables = TableMap::new();
    tables.add("orders", Operation::Read);
    tables.add("recent", Operation::Create);
    tables.add("recent", Operation::Read);
    tables.annotate("recent", Annotation::Temp);
    tables.annotate("$name", Annotation::Unresolved);
    result.crud.merge_scope("report.php", "main", &tables);

    result.edges.push(IncludeEdge {
        origin: "report.php".into(),
        source: "report.php".into(),
        raw: r#""../lib/" . $name . ".inc""#.into(),
        target: EdgeTarget::Unresolved,
        depth: 1,
        line: 4,
        candidates: Vec::new(),
    });
    result.edges.push(IncludeEdge {
        origin: "report.php".into(),
        source: "report.php".into(),
        raw: "'lib/db.inc'".into(),
        target: EdgeTarget::Resolved("lib/db.inc".into()),
        depth: 1,
        line: 2,
        candidates: vec!["lib/db.inc".into(), "old/lib/db.inc".into()],
    });
    result.diagnostics.push(Diagnostic::new(
        "report.php",
        &AnalysisError::UnresolvedReference {
            name: "$name".into(),
        },
    ));
    result
}

#[test]
fn test_save_and_load_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let result = sample_result();

    storage::save(root, &result).unwrap();
    assert!(storage::report_exists(root));

    let loaded = storage::load(root).unwrap();
    assert_eq!(loaded.files_analyzed, 3);
    assert_eq!(loaded.crud, result.crud);
    assert_eq!(loaded.edges, result.edges);
    assert_eq!(loaded.diagnostics[0].kind, DiagnosticKind::UnresolvedReference);

    let recent = loaded.crud.get("report.php", "main", "recent").unwrap();
    assert!(recent.is(Annotation::Temp));
    assert!(recent.has(Operation::Create) && recent.has(Operation::Read));
}

#[test]
fn test_load_rejects_version_mismatch() {
    let mut result = sample_result();
    result.version = "0.0.1".into();
    let json = storage::to_json(&result).unwrap();
    assert!(storage::from_json(&json).is_err());
}

#[test]
fn test_report_exists_false() {
    let tmp = TempDir::new().unwrap();
    assert!(!storage::report_exists(tmp.path()));
    assert!(storage::load(tmp.path()).is_err());
}
