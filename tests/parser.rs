use sqlproc::parser::{parse_file, parse_files, parse_source};
use sqlproc::{Error, ReturnKind};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/procedures")
        .join(name)
}

fn reason(err: Error) -> String {
    match err {
        Error::InvalidProcedure { reason, .. } => reason,
        other => panic!("expected InvalidProcedure, got {other:?}"),
    }
}

#[test]
fn parses_headers_in_declaration_order() {
    let proc = parse_file(&fixture("list_users.sql")).unwrap();
    assert_eq!(proc.name, "ListUsers");
    assert_eq!(proc.kind, ReturnKind::Many);
    let params: Vec<_> = proc
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.db_type.as_str()))
        .collect();
    assert_eq!(
        params,
        vec![("name_prefix", "text"), ("created_after", "timestamptz")]
    );
    let returns: Vec<_> = proc
        .returns
        .iter()
        .map(|c| (c.name.as_str(), c.db_type.as_str()))
        .collect();
    assert_eq!(
        returns,
        vec![
            ("id", "int"),
            ("name", "text"),
            ("created_at", "timestamptz"),
            ("balance", "numeric(10,2)"),
        ]
    );
    assert_eq!(proc.file, fixture("list_users.sql"));
}

#[test]
fn body_excludes_header_and_comment_lines() {
    let src = "\n-- name: CreateUser :exec\n-- param: name text\n-- creates a row\nINSERT INTO users (name)\n\nVALUES ($1);\n\n";
    let proc = parse_source(Path::new("create_user.sql"), src).unwrap();
    assert_eq!(proc.sql, "INSERT INTO users (name)\n\nVALUES ($1);");
    assert!(!proc.sql.contains("--"));
    assert_eq!(proc.routine_name(), "create_user");
}

#[test]
fn exec_needs_no_returns() {
    let proc = parse_file(&fixture("ping.sql")).unwrap();
    assert_eq!(proc.kind, ReturnKind::Exec);
    assert!(proc.params.is_empty());
    assert!(proc.returns.is_empty());
}

#[test]
fn types_are_normalized() {
    let src = "-- name: Get :one\n-- param: id   INT4\n-- returns: created_at TIMESTAMP   WITH TIME ZONE\nSELECT 1;";
    let proc = parse_source(Path::new("get.sql"), src).unwrap();
    assert_eq!(proc.params[0].db_type, "int4");
    assert_eq!(proc.returns[0].db_type, "timestamp with time zone");
}

#[test]
fn repeated_returns_lines_accumulate() {
    let src = "-- name: Get :one\n-- returns: id int\n-- returns: name text\nSELECT 1;";
    let proc = parse_source(Path::new("get.sql"), src).unwrap();
    assert_eq!(proc.returns.len(), 2);
    assert_eq!(proc.returns[1].name, "name");
}

#[test]
fn returning_kind_without_columns_fails() {
    for marker in [":one", ":many"] {
        let src = format!("-- name: Get {marker}\nSELECT 1;");
        let err = parse_source(Path::new("get.sql"), &src).unwrap_err();
        assert!(reason(err).contains("returns"));
    }
}

#[test]
fn missing_name_fails() {
    let err = parse_source(Path::new("x.sql"), "-- param: id int\nSELECT 1;").unwrap_err();
    assert!(reason(err).contains("missing -- name metadata"));

    let err = parse_source(Path::new("x.sql"), "-- name: :exec\nSELECT 1;").unwrap_err();
    assert!(reason(err).contains("missing -- name metadata"));
}

#[test]
fn unknown_or_missing_marker_fails() {
    let err = parse_source(Path::new("x.sql"), "-- name: Get :few\nSELECT 1;").unwrap_err();
    assert!(reason(err).contains(":few"));

    let err = parse_source(Path::new("x.sql"), "-- name: Get\nSELECT 1;").unwrap_err();
    assert!(reason(err).contains("marker"));
}

#[test]
fn second_name_header_fails() {
    let src = "-- name: A :exec\nSELECT 1;\n-- name: B :exec\nSELECT 2;";
    let err = parse_source(Path::new("x.sql"), src).unwrap_err();
    assert!(reason(err).contains("second name header"));
}

#[test]
fn empty_body_fails() {
    let err = parse_source(Path::new("x.sql"), "-- name: Ping :exec\n\n   \n").unwrap_err();
    assert!(reason(err).contains("empty"));
}

#[test]
fn declaration_without_type_fails() {
    let err = parse_source(Path::new("x.sql"), "-- name: P :exec\n-- param: id\nSELECT 1;").unwrap_err();
    assert!(reason(err).contains("needs a name and a type"));

    let src = "-- name: P :one\n-- returns: id int, name\nSELECT 1;";
    let err = parse_source(Path::new("x.sql"), src).unwrap_err();
    assert!(reason(err).contains("needs a name and a type"));
}

#[test]
fn identifiers_cannot_start_with_a_digit() {
    let err = parse_source(Path::new("x.sql"), "-- name: P :exec\n-- param: 1st int\nSELECT 1;").unwrap_err();
    assert!(reason(err).contains("invalid identifier \"1st\""));

    let src = "-- name: P :exec\n-- param: _first int\nSELECT 1;";
    assert_eq!(parse_source(Path::new("x.sql"), src).unwrap().params[0].name, "_first");
}

#[test]
fn colliding_field_names_fail() {
    let src = "-- name: P :exec\n-- param: user_id int\n-- param: userId int\nSELECT 1;";
    let err = parse_source(Path::new("x.sql"), src).unwrap_err();
    assert!(reason(err).contains("duplicate parameter userId"));

    let src = "-- name: P :many\n-- returns: id int\n-- returns: id bigint\nSELECT 1;";
    let err = parse_source(Path::new("x.sql"), src).unwrap_err();
    assert!(reason(err).contains("duplicate result column id"));
}

#[test]
fn error_names_the_file() {
    let err = parse_source(Path::new("sql/broken.sql"), "SELECT 1;").unwrap_err();
    assert!(err.to_string().contains("sql/broken.sql"));
}

#[test]
fn duplicate_names_across_files_fail() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.sql");
    let b = dir.path().join("b.sql");
    fs::write(&a, "-- name: Ping :exec\nSELECT 1;").unwrap();
    fs::write(&b, "-- name: ping :exec\nSELECT 2;").unwrap();

    match parse_files(&[&a, &b]).unwrap_err() {
        Error::DuplicateProcedure { first, second, .. } => {
            assert_eq!(first, a);
            assert_eq!(second, b);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn parse_files_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.sql");
    let bad = dir.path().join("bad.sql");
    fs::write(&good, "-- name: Ping :exec\nSELECT 1;").unwrap();
    fs::write(&bad, "SELECT 1;").unwrap();
    assert!(parse_files(&[&good, &bad]).is_err());
}

#[test]
fn missing_file_is_io_error() {
    let err = parse_file(Path::new("/definitely/not/here.sql")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}
