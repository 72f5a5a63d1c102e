use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage, attached to errors raised while that stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveProcedures,
    ParseProcedures,
    ResolveMigrations,
    LoadMigrations,
    Connect,
    SchemaMigrations,
    ProcedureMigrations,
    Generate,
    Introspect,
    SchemaModels,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ResolveProcedures => "resolve SQL inputs",
            Stage::ParseProcedures => "parse SQL files",
            Stage::ResolveMigrations => "resolve migration inputs",
            Stage::LoadMigrations => "load migrations",
            Stage::Connect => "connect",
            Stage::SchemaMigrations => "schema migrations",
            Stage::ProcedureMigrations => "procedure migrations",
            Stage::Generate => "generate code",
            Stage::Introspect => "introspect schema",
            Stage::SchemaModels => "generate schema models",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no SQL files resolved from {inputs:?}")]
    NoInputs { inputs: Vec<PathBuf> },

    #[error("invalid procedure {}: {reason}", .path.display())]
    InvalidProcedure { path: PathBuf, reason: String },

    #[error("duplicate procedure {name} ({} and {})", .first.display(), .second.display())]
    DuplicateProcedure {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no procedures to generate")]
    NoProcedures,

    #[error("invalid migration filename {} (expected NN_description.sql)", .path.display())]
    InvalidMigrationFilename { path: PathBuf },

    #[error("invalid migration version in {}: {reason}", .path.display())]
    InvalidMigrationVersion { path: PathBuf, reason: String },

    #[error("migration {} is empty", .path.display())]
    EmptyMigration { path: PathBuf },

    #[error("duplicate schema migration version {version} ({} and {})", .first.display(), .second.display())]
    DuplicateMigrationVersion {
        version: i64,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no schema migration files provided")]
    NoMigrations,

    #[error("invalid module name {0:?}: must be a Rust identifier")]
    InvalidModuleName(String),

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("provide SQL inputs, migrations, or schema model options")]
    NothingToDo,

    #[error("unsupported database url {0}")]
    UnsupportedDatabaseUrl(String),

    #[error("open db: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("{stage} requires a database connection or url")]
    MissingDatabase { stage: Stage },

    #[error("migration ledger: {0}")]
    Ledger(#[source] sqlx::Error),

    #[error("apply migration {version} ({}): {source}", .path.display())]
    ApplyMigration {
        version: i64,
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("migrate {}: {source}", .path.display())]
    ApplyProcedure {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("introspect catalog: {0}")]
    Introspect(#[source] sqlx::Error),

    #[error("run exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn in_stage(self, stage: Stage) -> Self {
        Error::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The underlying error with all stage context peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// The stage that failed, if the error came out of the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
