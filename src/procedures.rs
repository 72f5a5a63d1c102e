use crate::database::Database;
use crate::error::{Error, Result};
use crate::ir::Procedure;
use crate::parser;
use std::path::Path;

/// Submits procedure definitions to the database, one after another.
///
/// Each body is sent as-is, so it must be idempotent (`CREATE OR REPLACE`).
/// There is no rollback across procedures: those before a failure stay applied.
pub struct ProcedureMigrator<'a> {
    db: &'a Database,
}

impl<'a> ProcedureMigrator<'a> {
    pub fn new(db: &'a Database) -> Self {
        ProcedureMigrator { db }
    }

    pub async fn migrate(&self, procs: &[Procedure]) -> Result<()> {
        for proc in procs {
            if proc.sql.is_empty() {
                continue;
            }
            sqlx::raw_sql(&proc.sql)
                .execute(self.db.pool())
                .await
                .map_err(|source| Error::ApplyProcedure {
                    path: proc.file.clone(),
                    source,
                })?;
            tracing::debug!(procedure = %proc.name, file = %proc.file.display(), "applied procedure");
        }
        Ok(())
    }

    /// Parse `files` then apply them.
    pub async fn migrate_files<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<Procedure>> {
        let procs = parser::parse_files(files)?;
        self.migrate(&procs).await?;
        Ok(procs)
    }
}
