use sqlproc::codegen::naming::{
    escape_rust_keyword, is_rust_identifier, sql_const_name, to_json_name, to_pascal, to_rust_ident,
};
use sqlproc::codegen::queries::{call_signature, statement};
use sqlproc::codegen::schema_models::model_name;
use sqlproc::codegen::{
    map_type, write_module_root, Artifact, CodeGenerator, GeneratorOptions, SchemaModelGenerator,
    Tags, TargetType, TypeMap,
};
use sqlproc::parser::{parse_file, parse_source};
use sqlproc::{Dialect, Error, Table, TableColumn};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/procedures")
        .join(name)
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn artifact<'a>(artifacts: &'a [Artifact], name: &str) -> &'a str {
    &artifacts
        .iter()
        .find(|a| a.file_name == name)
        .unwrap_or_else(|| panic!("missing {name}"))
        .contents
}

fn generator(dialect: Dialect) -> CodeGenerator {
    CodeGenerator::new(GeneratorOptions {
        dialect,
        ..GeneratorOptions::default()
    })
    .unwrap()
}

#[test]
fn casing_rules() {
    assert_eq!(to_pascal("get_user"), "GetUser");
    assert_eq!(to_pascal("user-id"), "UserId");
    assert_eq!(to_pascal("GetUser"), "GetUser");
    assert_eq!(to_pascal("getUser"), "GetUser");
    assert_eq!(to_pascal("USER_ID"), "UserId");
    assert_eq!(to_json_name("created_at"), "createdAt");
    assert_eq!(to_json_name("Name"), "name");
    assert_eq!(to_rust_ident("GetUser"), "get_user");
    assert_eq!(to_rust_ident("type"), "r#type");
    assert_eq!(escape_rust_keyword("self"), "self_");
    assert_eq!(sql_const_name("GetUser"), "GET_USER_SQL");
    assert!(is_rust_identifier("generated"));
    assert!(!is_rust_identifier("my-module"));
    assert!(!is_rust_identifier("mod"));
}

#[test]
fn type_mapping_is_case_insensitive() {
    for t in ["INT", "int", "Int4", "integer", "serial"] {
        assert_eq!(map_type(t), TargetType::Int32, "{t}");
    }
    assert_eq!(map_type("SMALLINT"), TargetType::Int16);
    assert_eq!(map_type("int2"), TargetType::Int16);
    assert_eq!(map_type("bigserial"), TargetType::Int64);
    assert_eq!(map_type("int8"), TargetType::Int64);
    assert_eq!(map_type("varchar(20)"), TargetType::Text);
    assert_eq!(map_type("uuid"), TargetType::Text);
    assert_eq!(map_type("boolean"), TargetType::Bool);
    assert_eq!(map_type("numeric(10,2)"), TargetType::Float64);
    assert_eq!(map_type("double precision"), TargetType::Float64);
    assert_eq!(map_type("timestamptz"), TargetType::Timestamp);
    assert_eq!(map_type("date"), TargetType::Timestamp);
    assert_eq!(map_type("jsonb"), TargetType::Bytes);
}

#[test]
fn unrecognized_types_fall_back() {
    assert_eq!(map_type("interval"), TargetType::Unknown("interval".into()));
    assert_eq!(map_type("INT[]"), TargetType::Unknown("int[]".into()));
    assert_eq!(map_type("_int4"), TargetType::Unknown("_int4".into()));
    assert_eq!(map_type("Geometry").rust_type(), "serde_json::Value");
}

#[test]
fn nullable_wraps_every_type() {
    assert_eq!(map_type("int").nullable_type(), "Option<i32>");
    assert_eq!(map_type("jsonb").nullable_type(), "Option<Vec<u8>>");
    assert_eq!(map_type("text").rust_type(), "String");
    assert_eq!(map_type("text").param_type(), "&str");
}

#[test]
fn overrides_win_over_builtin_rules() {
    let types = TypeMap::with_overrides([("CITEXT", "String"), ("int", "u32")]);
    assert_eq!(types.map("citext"), TargetType::Custom("String".into()));
    assert_eq!(types.map("INT"), TargetType::Custom("u32".into()));
    assert_eq!(types.map("text"), TargetType::Text);
}

#[test]
fn statements_call_the_snake_case_routine() {
    let get_user = parse_file(&fixture("get_user.sql")).unwrap();
    let ping = parse_file(&fixture("ping.sql")).unwrap();
    assert_eq!(statement(&get_user, Dialect::Postgres), "SELECT * FROM get_user($1)");
    assert_eq!(statement(&get_user, Dialect::Sqlite), "SELECT * FROM get_user(?)");
    assert_eq!(statement(&ping, Dialect::Postgres), "SELECT ping()");

    let list = parse_file(&fixture("list_users.sql")).unwrap();
    assert_eq!(statement(&list, Dialect::Postgres), "SELECT * FROM list_users($1, $2)");
}

#[test]
fn exec_procedure_takes_only_the_executor() {
    let ping = parse_file(&fixture("ping.sql")).unwrap();
    let sig = call_signature(&ping, &TypeMap::new());
    assert_eq!(
        sig.render(),
        "pub async fn ping<'c, D>(executor: D) -> Result<(), sqlx::Error>"
    );

    let artifacts = generator(Dialect::Postgres).render(&[ping]).unwrap();
    let queries = artifact(&artifacts, "queries.rs");
    assert!(queries.contains("pub const PING_SQL: &str = \"SELECT ping()\";"));
    assert!(squash(queries).contains("db::exec(executor,sqlx::query(PING_SQL)).await.map(|_|())"));
    assert!(!queries.contains("use super::models"));

    let models = artifact(&artifacts, "models.rs");
    assert!(!models.contains("pub struct"));
}

#[test]
fn one_procedure_returns_row_or_not_found() {
    let get_user = parse_file(&fixture("get_user.sql")).unwrap();
    let sig = call_signature(&get_user, &TypeMap::new());
    assert_eq!(sig.params, vec![("user_id".to_string(), "i32".to_string())]);
    assert_eq!(sig.output, "GetUserRow");

    let artifacts = generator(Dialect::Postgres).render(&[get_user]).unwrap();
    let models = squash(artifact(&artifacts, "models.rs"));
    assert!(models.contains("pubstructGetUserRow{pubid:i32,pubname:String,}"));
    assert!(models.contains("sqlx::FromRow"));

    let queries = artifact(&artifacts, "queries.rs");
    assert!(queries.contains("RowNotFound"));
    let queries = squash(queries);
    assert!(queries.contains("pubasyncfnget_user<'c,D>("));
    assert!(queries.contains("user_id:i32"));
    assert!(queries.contains("->Result<GetUserRow,sqlx::Error>"));
    assert!(queries.contains("db::query_one(executor,sqlx::query_as(GET_USER_SQL).bind(user_id))"));
    assert!(queries.contains("usesuper::models::{GetUserRow};") || queries.contains("usesuper::models::GetUserRow;"));

    let db = artifact(&artifacts, "db.rs");
    assert!(db.contains("pub fn is_not_found(err: &sqlx::Error) -> bool"));
    assert!(squash(db).contains("pubtraitDbtx<'c>:Executor<'c,Database=Postgres>{}"));
}

#[test]
fn many_procedure_returns_vec_and_imports_chrono() {
    let list = parse_file(&fixture("list_users.sql")).unwrap();
    let sig = call_signature(&list, &TypeMap::new());
    assert_eq!(sig.output, "Vec<ListUsersRow>");
    assert_eq!(
        sig.params,
        vec![
            ("name_prefix".to_string(), "&str".to_string()),
            ("created_after".to_string(), "DateTime<Utc>".to_string()),
        ]
    );

    let artifacts = generator(Dialect::Postgres).render(&[list]).unwrap();
    let models = artifact(&artifacts, "models.rs");
    assert!(models.contains("use chrono::{DateTime, Utc};"));
    assert!(models.contains("#[serde(rename = \"createdAt\")]"));
    assert!(models.contains("pub balance: f64,"));
    let queries = artifact(&artifacts, "queries.rs");
    assert!(queries.contains("use chrono::{DateTime, Utc};"));
    assert!(squash(queries).contains("db::query_many(executor,"));
}

#[test]
fn every_artifact_is_valid_rust_with_banner() {
    let procs: Vec<_> = ["get_user.sql", "list_users.sql", "ping.sql"]
        .iter()
        .map(|f| parse_file(&fixture(f)).unwrap())
        .collect();
    for dialect in [Dialect::Postgres, Dialect::Mysql, Dialect::Sqlite] {
        let artifacts = generator(dialect).render(&procs).unwrap();
        let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["db.rs", "models.rs", "queries.rs"]);
        for artifact in &artifacts {
            assert!(artifact.contents.starts_with("// ----"));
            assert!(artifact.contents.contains("DO NOT EDIT"));
            syn::parse_file(&artifact.contents)
                .unwrap_or_else(|e| panic!("{} ({dialect}): {e}", artifact.file_name));
        }
    }
}

#[test]
fn keyword_and_executor_parameters_are_escaped() {
    let src = "-- name: Find :many\n-- param: type text\n-- param: executor int\n-- returns: type text\nSELECT 1;";
    let proc = parse_source(Path::new("find.sql"), src).unwrap();
    let sig = call_signature(&proc, &TypeMap::new());
    let names: Vec<_> = sig.params.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["r#type", "executor_"]);

    let artifacts = generator(Dialect::Postgres).render(&[proc]).unwrap();
    for artifact in &artifacts {
        syn::parse_file(&artifact.contents).unwrap();
    }
    assert!(artifact(&artifacts, "models.rs").contains("pub r#type: String,"));
}

#[test]
fn suffixed_keyword_columns_keep_their_column_name() {
    let src = "-- name: Who :one\n-- returns: self int, type text\nSELECT 1;";
    let proc = parse_source(Path::new("who.sql"), src).unwrap();
    let artifacts = generator(Dialect::Sqlite).render(&[proc]).unwrap();
    let models = squash(artifact(&artifacts, "models.rs"));
    assert!(models.contains(r#"#[sqlx(rename="self")]#[serde(rename="self")]pubself_:i32,"#));
    // Raw identifiers already decode and serialize as the bare column name.
    assert!(models.contains(",pubr#type:String,"));
    assert!(!models.contains(r#"rename="type""#));
}

#[test]
fn unknown_types_are_documented() {
    let src = "-- name: Shapes :many\n-- returns: area geometry\nSELECT 1;";
    let proc = parse_source(Path::new("shapes.sql"), src).unwrap();
    let artifacts = generator(Dialect::Postgres).render(&[proc]).unwrap();
    let models = artifact(&artifacts, "models.rs");
    assert!(models.contains("Declared as `geometry`"));
    assert!(models.contains("pub area: serde_json::Value,"));
}

#[test]
fn empty_or_duplicate_batches_are_rejected() {
    let gen = generator(Dialect::Postgres);
    assert!(matches!(gen.render(&[]).unwrap_err(), Error::NoProcedures));

    let ping = parse_file(&fixture("ping.sql")).unwrap();
    let err = gen.render(&[ping.clone(), ping]).unwrap_err();
    assert!(matches!(err, Error::DuplicateProcedure { .. }));
}

#[test]
fn module_name_must_be_an_identifier() {
    let err = CodeGenerator::new(GeneratorOptions {
        module_name: "my-db".into(),
        ..GeneratorOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, Error::InvalidModuleName(name) if name == "my-db"));

    let gen = CodeGenerator::new(GeneratorOptions {
        module_name: "  ".into(),
        ..GeneratorOptions::default()
    })
    .unwrap();
    assert_eq!(gen.module_name(), "generated");
}

#[test]
fn generate_writes_files_and_module_root() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("db");
    let files = [fixture("ping.sql"), fixture("get_user.sql")];

    let written = generator(Dialect::Postgres).generate_files(&files, &out).unwrap();
    let names: Vec<_> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["db.rs", "models.rs", "queries.rs", "mod.rs"]);

    let root = fs::read_to_string(out.join("mod.rs")).unwrap();
    assert!(root.contains("pub mod db;"));
    assert!(root.contains("pub mod queries;"));
    assert!(!root.contains("schema_models"));
    assert!(root.contains("pub use db::{is_not_found, Dbtx};"));
}

fn users_table(schema: &str) -> Table {
    Table {
        schema: schema.into(),
        name: "user_accounts".into(),
        columns: vec![
            TableColumn {
                name: "email".into(),
                db_type: "varchar".into(),
                nullable: true,
            },
            TableColumn {
                name: "id".into(),
                db_type: "int4".into(),
                nullable: false,
            },
        ],
    }
}

#[test]
fn schema_model_names_drop_the_default_schema() {
    assert_eq!(model_name("public", "user_accounts", Dialect::Postgres), "UserAccounts");
    assert_eq!(model_name("audit", "events", Dialect::Postgres), "AuditEvents");
    assert_eq!(model_name("main", "events", Dialect::Sqlite), "Events");
    assert_eq!(model_name("shop", "orders", Dialect::Mysql), "ShopOrders");
}

#[test]
fn schema_models_wrap_nullable_columns() {
    let gen = SchemaModelGenerator::new(GeneratorOptions::default(), Tags::default()).unwrap();
    let artifact = gen.render(&[users_table("public")]).unwrap();
    assert_eq!(artifact.file_name, "schema_models.rs");
    assert!(artifact.contents.contains("pub struct UserAccounts"));
    assert!(artifact.contents.contains("pub email: Option<String>,"));
    assert!(artifact.contents.contains("pub id: i32,"));
    assert!(artifact.contents.contains("Row of `public.user_accounts`."));
    syn::parse_file(&artifact.contents).unwrap();

    assert!(gen.render(&[]).is_none());
}

#[test]
fn schema_model_tags_control_attributes() {
    let table = Table {
        schema: "public".into(),
        name: "events".into(),
        columns: vec![TableColumn {
            name: "createdAt".into(),
            db_type: "timestamptz".into(),
            nullable: false,
        }],
    };

    let both = SchemaModelGenerator::new(GeneratorOptions::default(), Tags::parse("db,json")).unwrap();
    let src = both.render(std::slice::from_ref(&table)).unwrap().contents;
    assert!(src.contains("#[sqlx(rename = \"createdAt\")]"));
    assert!(src.contains("#[serde(rename = \"createdAt\")]"));
    assert!(src.contains("use serde::{Deserialize, Serialize};"));

    let db_only = SchemaModelGenerator::new(GeneratorOptions::default(), Tags::parse("db")).unwrap();
    let src = db_only.render(&[table]).unwrap().contents;
    assert!(src.contains("#[sqlx(rename = \"createdAt\")]"));
    assert!(!src.contains("serde"));
}

#[test]
fn module_root_lists_schema_models_alongside_bindings() {
    let dir = tempfile::tempdir().unwrap();
    generator(Dialect::Postgres)
        .generate(&[parse_file(&fixture("ping.sql")).unwrap()], dir.path())
        .unwrap();
    let gen = SchemaModelGenerator::new(GeneratorOptions::default(), Tags::default()).unwrap();
    let written = gen.generate(&[users_table("public")], dir.path()).unwrap();
    assert_eq!(written.len(), 2);

    let root = fs::read_to_string(dir.path().join("mod.rs")).unwrap();
    assert!(root.contains("pub mod schema_models;"));
    assert!(root.contains("pub mod queries;"));

    // A directory holding only schema models gets a root without bindings.
    let other = tempfile::tempdir().unwrap();
    gen.generate(&[users_table("public")], other.path()).unwrap();
    let root = fs::read_to_string(write_module_root(other.path(), "models").unwrap()).unwrap();
    assert!(root.contains("pub mod schema_models;"));
    assert!(!root.contains("Dbtx"));
}
