//! End-to-end orchestration: resolve, parse, migrate, generate, introspect.
//!
//! Stages run strictly in that order and the first failure aborts the run,
//! wrapped in [`Error::Stage`] naming where it happened.

use crate::codegen::{CodeGenerator, GeneratorOptions, SchemaModelGenerator, TypeMap, DEFAULT_MODULE};
use crate::database::Database;
use crate::error::{Error, Result, Stage};
use crate::introspect::{self, SchemaModelOptions};
use crate::ir::{Dialect, Procedure, SchemaMigration, Table};
use crate::migrations::{self, SchemaMigrator};
use crate::parser;
use crate::procedures::ProcedureMigrator;
use crate::resolve;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUT_DIR: &str = "generated";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the pipeline gets its database from.
#[derive(Debug, Default)]
pub enum DatabaseSource {
    #[default]
    None,
    /// Opened on demand and closed when the run ends.
    Url(String),
    /// Supplied by the caller; never closed here.
    Existing(Database),
}

#[derive(Debug)]
pub struct PipelineOptions {
    pub sql_inputs: Vec<PathBuf>,
    pub migration_inputs: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub module_name: String,
    /// Dialect of the generated code; inferred from the database when unset.
    pub dialect: Option<Dialect>,
    pub types: TypeMap,
    pub skip_migrate: bool,
    pub skip_generate: bool,
    pub database: DatabaseSource,
    pub schema_models: Option<SchemaModelOptions>,
    /// Deadline for the whole run; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            sql_inputs: Vec::new(),
            migration_inputs: Vec::new(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            module_name: DEFAULT_MODULE.to_string(),
            dialect: None,
            types: TypeMap::new(),
            skip_migrate: false,
            skip_generate: false,
            database: DatabaseSource::None,
            schema_models: None,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub procedures: Vec<Procedure>,
    pub schema_migrations: Vec<SchemaMigration>,
    /// Versions applied by this run.
    pub applied_migrations: Vec<i64>,
    pub out_dir: PathBuf,
    pub generated_files: Vec<PathBuf>,
    pub schema_tables: Vec<Table>,
    pub schema_files: Vec<PathBuf>,
}

/// Run the configured pipeline, bounded by `opts.timeout`.
pub async fn run(opts: PipelineOptions) -> Result<PipelineResult> {
    let timeout = opts.timeout;
    match timeout {
        Some(limit) => tokio::time::timeout(limit, run_stages(opts))
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => run_stages(opts).await,
    }
}

async fn run_stages(mut opts: PipelineOptions) -> Result<PipelineResult> {
    if opts.sql_inputs.is_empty() && opts.migration_inputs.is_empty() && opts.schema_models.is_none() {
        return Err(Error::NothingToDo);
    }

    let mut procs = Vec::new();
    if !opts.sql_inputs.is_empty() {
        let files = resolve::resolve_files(&opts.sql_inputs)
            .map_err(|e| e.in_stage(Stage::ResolveProcedures))?;
        tracing::info!("resolved {} SQL file(s)", files.len());
        procs = parser::parse_files(&files).map_err(|e| e.in_stage(Stage::ParseProcedures))?;
    } else {
        tracing::info!("no stored procedure inputs provided; skipping procedure parsing");
    }

    let mut schema_migrations = Vec::new();
    if !opts.migration_inputs.is_empty() {
        let files = resolve::resolve_files(&opts.migration_inputs)
            .map_err(|e| e.in_stage(Stage::ResolveMigrations))?;
        schema_migrations = migrations::load_schema_migrations(&files)
            .map_err(|e| e.in_stage(Stage::LoadMigrations))?;
        tracing::info!("resolved {} schema migration(s)", schema_migrations.len());
    }

    let needs_db = !opts.skip_migrate || opts.schema_models.is_some();
    let db = match std::mem::take(&mut opts.database) {
        DatabaseSource::Existing(db) => Some(db),
        DatabaseSource::Url(url) if needs_db => Some(
            Database::connect(&url)
                .await
                .map_err(|e| e.in_stage(Stage::Connect))?,
        ),
        DatabaseSource::Url(_) => {
            tracing::debug!("database not needed; not connecting");
            None
        }
        DatabaseSource::None => None,
    };

    let outcome = run_with_db(&opts, db.as_ref(), procs, schema_migrations).await;
    if let Some(db) = db {
        db.close().await;
    }
    outcome
}

async fn run_with_db(
    opts: &PipelineOptions,
    db: Option<&Database>,
    procs: Vec<Procedure>,
    schema_migrations: Vec<SchemaMigration>,
) -> Result<PipelineResult> {
    let mut applied_migrations = Vec::new();
    if !opts.skip_migrate {
        let db = db.ok_or(Error::MissingDatabase {
            stage: Stage::SchemaMigrations,
        })?;
        if !schema_migrations.is_empty() {
            tracing::info!("applying {} schema migration(s)", schema_migrations.len());
            let report = SchemaMigrator::new(db)
                .migrate(&schema_migrations)
                .await
                .map_err(|e| e.in_stage(Stage::SchemaMigrations))?;
            applied_migrations = report.applied;
        }
        if !procs.is_empty() {
            tracing::info!("applying {} stored procedure(s)", procs.len());
        }
        ProcedureMigrator::new(db)
            .migrate(&procs)
            .await
            .map_err(|e| e.in_stage(Stage::ProcedureMigrations))?;
    }

    let dialect = opts
        .dialect
        .or_else(|| db.map(Database::dialect))
        .unwrap_or_default();
    let module_name = if opts.module_name.trim().is_empty() {
        DEFAULT_MODULE.to_string()
    } else {
        opts.module_name.clone()
    };

    let mut generated_files = Vec::new();
    if !opts.skip_generate {
        if procs.is_empty() {
            tracing::info!("no procedures to generate; skipping code emission");
        } else {
            let generator = CodeGenerator::new(GeneratorOptions {
                module_name: module_name.clone(),
                dialect,
                types: opts.types.clone(),
            })
            .map_err(|e| e.in_stage(Stage::Generate))?;
            generated_files = generator
                .generate(&procs, &opts.out_dir)
                .map_err(|e| e.in_stage(Stage::Generate))?;
            tracing::info!(
                "generated module {:?} in {}",
                module_name,
                opts.out_dir.display()
            );
        }
    }

    let mut schema_tables = Vec::new();
    let mut schema_files = Vec::new();
    if let Some(schema_opts) = &opts.schema_models {
        let db = db.ok_or(Error::MissingDatabase {
            stage: Stage::Introspect,
        })?;
        let schema_opts = schema_opts.clone().with_defaults(&opts.out_dir, &module_name);
        schema_tables = introspect::load_schema_tables(db, &schema_opts.schemas)
            .await
            .map_err(|e| e.in_stage(Stage::Introspect))?;

        let out_dir = schema_opts.out_dir.clone().unwrap_or_else(|| opts.out_dir.clone());
        let generator = SchemaModelGenerator::new(
            GeneratorOptions {
                module_name: schema_opts.module_name.clone().unwrap_or(module_name),
                dialect: db.dialect(),
                types: opts.types.clone(),
            },
            schema_opts.tags,
        )
        .map_err(|e| e.in_stage(Stage::SchemaModels))?;
        schema_files = generator
            .generate(&schema_tables, &out_dir)
            .map_err(|e| e.in_stage(Stage::SchemaModels))?;

        if schema_tables.is_empty() {
            tracing::info!("no tables discovered for schema model generation");
        } else {
            tracing::info!(
                "generated {} schema model(s) in {}",
                schema_tables.len(),
                out_dir.display()
            );
        }
    }

    Ok(PipelineResult {
        procedures: procs,
        schema_migrations,
        applied_migrations,
        out_dir: opts.out_dir.clone(),
        generated_files,
        schema_tables,
        schema_files,
    })
}
