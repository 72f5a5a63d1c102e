//! Stored-procedure toolchain: parse annotated SQL, apply schema migrations
//! and procedure definitions, and generate typed `sqlx` bindings.

pub mod codegen;
pub mod config;
pub mod database;
pub mod error;
pub mod introspect;
pub mod ir;
pub mod migrations;
pub mod parser;
pub mod pipeline;
pub mod procedures;
pub mod resolve;

pub use codegen::{Artifact, CodeGenerator, GeneratorOptions, SchemaModelGenerator, Tags, TypeMap};
pub use config::Config;
pub use database::Database;
pub use error::{Error, Result, Stage};
pub use introspect::{load_schema_tables, SchemaModelOptions};
pub use ir::{Column, Dialect, Param, Procedure, ReturnKind, SchemaMigration, Table, TableColumn};
pub use migrations::{load_schema_migrations, MigrationReport, SchemaMigrator};
pub use parser::{parse_file, parse_files};
pub use pipeline::{run, DatabaseSource, PipelineOptions, PipelineResult};
pub use procedures::ProcedureMigrator;
pub use resolve::resolve_files;
