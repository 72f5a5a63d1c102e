use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sqlproc::codegen::{CodeGenerator, GeneratorOptions, SchemaModelGenerator, Tags};
use sqlproc::ir::Dialect;
use sqlproc::pipeline::{DatabaseSource, PipelineOptions};
use sqlproc::resolve::split_inputs;
use sqlproc::{Config, Database};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Config file; defaults to ./sqlproc.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the database, then generate bindings
    Run {
        #[command(flatten)]
        common: CommonArgs,
        /// Skip schema and procedure migrations
        #[arg(long)]
        skip_migrate: bool,
        /// Skip code generation
        #[arg(long)]
        skip_generate: bool,
        #[command(flatten)]
        schema: SchemaArgs,
    },
    /// Generate bindings from SQL files without touching a database
    Generate {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Apply schema migrations and procedures only
    Migrate {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Introspect tables; prints JSON unless --out is given
    Introspect {
        /// Database URL; defaults to the DATABASE_URL environment variable
        #[arg(long)]
        db: Option<String>,
        /// Schemas to include (comma-separated or repeated)
        #[arg(long, value_delimiter = ',')]
        schemas: Vec<String>,
        /// Write schema_models.rs into this directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Module name used in the generated file
        #[arg(long)]
        module: Option<String>,
        /// Attribute tags to emit, e.g. "db,json"
        #[arg(long)]
        tags: Option<String>,
    },
    /// Parse SQL files and list the procedures they declare
    Check {
        /// SQL files or directories (comma-separated or repeated)
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Database URL; defaults to the DATABASE_URL environment variable
    #[arg(long)]
    db: Option<String>,
    /// SQL files or directories with procedures (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    files: Vec<String>,
    /// Schema migration files or directories (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    migrations: Vec<String>,
    /// Output directory for generated code
    #[arg(long)]
    out: Option<PathBuf>,
    /// Module name for generated code
    #[arg(long)]
    module: Option<String>,
    /// Dialect of generated SQL (postgres, mysql, sqlite)
    #[arg(long)]
    dialect: Option<Dialect>,
    /// Deadline for the whole run in seconds; 0 disables it
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args)]
struct SchemaArgs {
    /// Also introspect the database and generate table models
    #[arg(long)]
    schema_models: bool,
    /// Schemas to introspect (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    schemas: Vec<String>,
    /// Output directory for schema models
    #[arg(long)]
    schema_out: Option<PathBuf>,
    /// Attribute tags for schema models, e.g. "db,json"
    #[arg(long)]
    tags: Option<String>,
}

fn paths(values: &[String]) -> Vec<PathBuf> {
    values.iter().flat_map(|v| split_inputs(v)).collect()
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::discover(Path::new("."))?.unwrap_or_default(),
    };
    Ok(config)
}

fn database_url(flag: Option<String>, config: &Config) -> Option<String> {
    flag.or_else(|| config.database_url.clone())
        .or_else(|| std::env::var("DATABASE_URL").ok())
}

/// Config file values with command-line flags layered on top.
fn pipeline_options(config: &Config, common: CommonArgs) -> PipelineOptions {
    let mut opts = config.pipeline_options();
    let files = paths(&common.files);
    if !files.is_empty() {
        opts.sql_inputs = files;
    }
    let migrations = paths(&common.migrations);
    if !migrations.is_empty() {
        opts.migration_inputs = migrations;
    }
    if let Some(out) = common.out {
        opts.out_dir = out;
    }
    if let Some(module) = common.module {
        opts.module_name = module;
    }
    if common.dialect.is_some() {
        opts.dialect = common.dialect;
    }
    if let Some(secs) = common.timeout {
        opts.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    opts.database = database_url(common.db, config).map_or(DatabaseSource::None, DatabaseSource::Url);
    opts
}

async fn run_pipeline(opts: PipelineOptions) -> Result<()> {
    let result = sqlproc::run(opts).await?;
    if !result.applied_migrations.is_empty() {
        println!("Applied migrations: {:?}", result.applied_migrations);
    }
    for file in result.generated_files.iter().chain(&result.schema_files) {
        println!("Wrote {}", file.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            common,
            skip_migrate,
            skip_generate,
            schema,
        } => {
            let mut opts = pipeline_options(&config, common);
            opts.skip_migrate |= skip_migrate;
            opts.skip_generate |= skip_generate;
            if schema.schema_models {
                let mut schema_opts = opts.schema_models.take().unwrap_or_default();
                if !schema.schemas.is_empty() {
                    schema_opts.schemas = schema.schemas;
                }
                if schema.schema_out.is_some() {
                    schema_opts.out_dir = schema.schema_out;
                }
                if let Some(tags) = schema.tags {
                    schema_opts.tags = Tags::parse(&tags);
                }
                opts.schema_models = Some(schema_opts);
            }
            run_pipeline(opts).await?;
        }
        Commands::Generate { common } => {
            let opts = pipeline_options(&config, common);
            let dialect = opts
                .dialect
                .or_else(|| match &opts.database {
                    DatabaseSource::Url(url) => Dialect::from_url(url),
                    _ => None,
                })
                .unwrap_or_default();
            let files = sqlproc::resolve_files(&opts.sql_inputs)?;
            let generator = CodeGenerator::new(GeneratorOptions {
                module_name: opts.module_name,
                dialect,
                types: opts.types,
            })?;
            for file in generator.generate_files(&files, &opts.out_dir)? {
                println!("Wrote {}", file.display());
            }
        }
        Commands::Migrate { common } => {
            let mut opts = pipeline_options(&config, common);
            opts.skip_migrate = false;
            opts.skip_generate = true;
            opts.schema_models = None;
            run_pipeline(opts).await?;
            println!("Migration complete");
        }
        Commands::Introspect {
            db,
            schemas,
            out,
            module,
            tags,
        } => {
            let url = database_url(db, &config)
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL not specified"))?;
            let db = Database::connect(&url).await?;
            let base = config.schema_model_options().unwrap_or_default();
            let schemas = if schemas.is_empty() { base.schemas } else { schemas };
            let tables = sqlproc::load_schema_tables(&db, &schemas).await;
            let dialect = db.dialect();
            db.close().await;
            let tables = tables?;

            match out.or(base.out_dir) {
                Some(dir) => {
                    let module_name = module
                        .or(base.module_name)
                        .or_else(|| config.module.clone())
                        .unwrap_or_default();
                    let tags = tags.as_deref().map(Tags::parse).unwrap_or(base.tags);
                    let generator = SchemaModelGenerator::new(
                        GeneratorOptions {
                            module_name,
                            dialect,
                            types: config.type_map(),
                        },
                        tags,
                    )?;
                    for file in generator.generate(&tables, &dir)? {
                        println!("Wrote {}", file.display());
                    }
                }
                None => {
                    let json = serde_json::to_string_pretty(&tables)
                        .context("serialize introspected tables")?;
                    println!("{}", json);
                }
            }
        }
        Commands::Check { files } => {
            let mut inputs = paths(&files);
            if inputs.is_empty() {
                inputs = config.files.clone();
            }
            let files = sqlproc::resolve_files(&inputs)?;
            let procs = sqlproc::parse_files(&files)?;
            for proc in &procs {
                println!(
                    "{}\t{}\t{} param(s)\t{}",
                    proc.name,
                    proc.kind,
                    proc.params.len(),
                    proc.file.display()
                );
            }
            println!("{} procedure(s) OK", procs.len());
        }
    }

    Ok(())
}
