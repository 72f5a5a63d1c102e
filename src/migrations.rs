//! Versioned schema migrations tracked in a ledger table.
//!
//! Files are named `<version>[-_]<description>.sql`. Each pending migration
//! runs in its own transaction together with its ledger insert, so a failed
//! body leaves no ledger row behind.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::ir::{Dialect, SchemaMigration};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

pub const LEDGER_TABLE: &str = "sqlproc_schema_migrations";

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)[-_]?([A-Za-z0-9_-]*)\.sql$").expect("migration filename pattern")
});

fn parse_migration(path: &Path) -> Result<SchemaMigration> {
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let caps = FILENAME_RE
        .captures(base)
        .ok_or_else(|| Error::InvalidMigrationFilename {
            path: path.to_path_buf(),
        })?;

    let version: i64 = caps[1]
        .parse()
        .map_err(|e: std::num::ParseIntError| Error::InvalidMigrationVersion {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if version <= 0 {
        return Err(Error::InvalidMigrationVersion {
            path: path.to_path_buf(),
            reason: "version must be positive".to_string(),
        });
    }

    let name = caps[2].trim_matches(|c| c == '-' || c == '_' || c == ' ');
    let name = if name.is_empty() {
        format!("migration_{}", version)
    } else {
        name.to_string()
    };

    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let sql = text.trim();
    if sql.is_empty() {
        return Err(Error::EmptyMigration {
            path: path.to_path_buf(),
        });
    }

    Ok(SchemaMigration {
        version,
        name,
        file: path.to_path_buf(),
        sql: sql.to_string(),
    })
}

/// Load migration files, sorted by version. Any malformed file or repeated
/// version fails the whole set.
pub fn load_schema_migrations<P: AsRef<Path>>(files: &[P]) -> Result<Vec<SchemaMigration>> {
    if files.is_empty() {
        return Err(Error::NoMigrations);
    }
    let mut seen: HashMap<i64, &Path> = HashMap::new();
    let mut migrations = Vec::with_capacity(files.len());
    for file in files {
        let file = file.as_ref();
        let migration = parse_migration(file)?;
        if let Some(first) = seen.insert(migration.version, file) {
            return Err(Error::DuplicateMigrationVersion {
                version: migration.version,
                first: first.to_path_buf(),
                second: file.to_path_buf(),
            });
        }
        migrations.push(migration);
    }
    migrations.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));
    Ok(migrations)
}

fn ledger_ddl(dialect: Dialect) -> String {
    let applied_at = match dialect {
        Dialect::Postgres => "applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()",
        Dialect::Mysql | Dialect::Sqlite => "applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP",
    };
    let name = match dialect {
        Dialect::Mysql => "name VARCHAR(255) NOT NULL",
        Dialect::Postgres | Dialect::Sqlite => "name TEXT NOT NULL",
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {} (version BIGINT PRIMARY KEY, {}, {})",
        LEDGER_TABLE, name, applied_at
    )
}

/// Outcome of one [`SchemaMigrator::migrate`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied by this call, in order.
    pub applied: Vec<i64>,
    /// Versions already present in the ledger.
    pub skipped: Vec<i64>,
}

pub struct SchemaMigrator<'a> {
    db: &'a Database,
}

impl<'a> SchemaMigrator<'a> {
    pub fn new(db: &'a Database) -> Self {
        SchemaMigrator { db }
    }

    /// Apply pending migrations in order, stopping at the first failure.
    pub async fn migrate(&self, migrations: &[SchemaMigration]) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        if migrations.is_empty() {
            return Ok(report);
        }
        self.ensure_ledger().await?;
        let done: HashSet<i64> = self.applied().await?.into_iter().map(|(v, _)| v).collect();

        for migration in migrations {
            if done.contains(&migration.version) {
                tracing::debug!(version = migration.version, "migration already applied");
                report.skipped.push(migration.version);
                continue;
            }
            self.apply(migration).await?;
            tracing::info!(
                version = migration.version,
                name = %migration.name,
                "applied schema migration"
            );
            report.applied.push(migration.version);
        }
        Ok(report)
    }

    /// Ledger rows as `(version, name)`, ordered by version.
    pub async fn applied(&self) -> Result<Vec<(i64, String)>> {
        self.ensure_ledger().await?;
        let sql = format!("SELECT version, name FROM {} ORDER BY version", LEDGER_TABLE);
        sqlx::query_as::<_, (i64, String)>(&sql)
            .fetch_all(self.db.pool())
            .await
            .map_err(Error::Ledger)
    }

    async fn ensure_ledger(&self) -> Result<()> {
        sqlx::query(&ledger_ddl(self.db.dialect()))
            .execute(self.db.pool())
            .await
            .map_err(Error::Ledger)?;
        Ok(())
    }

    async fn apply(&self, migration: &SchemaMigration) -> Result<()> {
        let fail = |source: sqlx::Error| Error::ApplyMigration {
            version: migration.version,
            path: migration.file.clone(),
            source,
        };

        let mut tx = self.db.pool().begin().await.map_err(fail)?;
        let dialect = self.db.dialect();
        let insert = format!(
            "INSERT INTO {} (version, name) VALUES ({}, {})",
            LEDGER_TABLE,
            dialect.placeholder(1),
            dialect.placeholder(2)
        );

        let outcome = async {
            sqlx::raw_sql(&migration.sql).execute(&mut *tx).await?;
            sqlx::query(&insert)
                .bind(migration.version)
                .bind(migration.name.as_str())
                .execute(&mut *tx)
                .await?;
            Ok::<_, sqlx::Error>(())
        }
        .await;

        match outcome {
            Ok(()) => tx.commit().await.map_err(fail),
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(version = migration.version, error = %rollback, "rollback failed");
                }
                Err(fail(err))
            }
        }
    }
}
