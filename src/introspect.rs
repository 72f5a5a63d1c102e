//! Catalog introspection: discover tables and columns for model generation.

use crate::codegen::Tags;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::ir::{Dialect, Table, TableColumn};
use crate::migrations::LEDGER_TABLE;
use crate::parser::normalize_type;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What to introspect and where the models go. Empty fields fall back to the
/// pipeline's output directory and module.
#[derive(Debug, Clone, Default)]
pub struct SchemaModelOptions {
    /// Restrict introspection to these schemas; empty means every user schema.
    pub schemas: Vec<String>,
    pub out_dir: Option<PathBuf>,
    pub module_name: Option<String>,
    pub tags: Tags,
}

impl SchemaModelOptions {
    pub fn with_defaults(mut self, fallback_dir: &std::path::Path, fallback_module: &str) -> Self {
        if self.out_dir.is_none() {
            self.out_dir = Some(fallback_dir.to_path_buf());
        }
        if self.module_name.as_deref().map_or(true, str::is_empty) {
            self.module_name = Some(fallback_module.to_string());
        }
        self
    }
}

/// One catalog row before grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub udt_name: String,
    pub nullable: bool,
}

type CatalogRow = (String, String, String, String, String, String);

impl From<CatalogRow> for RawColumn {
    fn from(row: CatalogRow) -> Self {
        let (schema, table, column, data_type, udt_name, is_nullable) = row;
        RawColumn {
            schema,
            table,
            column,
            data_type,
            udt_name,
            nullable: is_nullable.eq_ignore_ascii_case("yes"),
        }
    }
}

/// Catalog query for `dialect` with one placeholder per allow-listed schema.
pub fn catalog_query(dialect: Dialect, schema_count: usize) -> String {
    match dialect {
        Dialect::Postgres => {
            let mut sql = String::from(
                "SELECT table_schema::text, table_name::text, column_name::text, \
                 data_type::text, udt_name::text, is_nullable::text \
                 FROM information_schema.columns \
                 WHERE table_schema NOT IN ('pg_catalog', 'information_schema')",
            );
            if schema_count > 0 {
                sql.push_str(&format!(
                    " AND table_schema IN ({})",
                    dialect.placeholders(schema_count)
                ));
            }
            sql.push_str(" ORDER BY table_schema, table_name, ordinal_position");
            sql
        }
        Dialect::Mysql => {
            let mut sql = String::from(
                "SELECT CAST(table_schema AS CHAR), CAST(table_name AS CHAR), \
                 CAST(column_name AS CHAR), CAST(data_type AS CHAR), '', \
                 CAST(is_nullable AS CHAR) \
                 FROM information_schema.columns \
                 WHERE table_schema NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')",
            );
            if schema_count > 0 {
                sql.push_str(&format!(
                    " AND table_schema IN ({})",
                    dialect.placeholders(schema_count)
                ));
            }
            sql.push_str(" ORDER BY table_schema, table_name, ordinal_position");
            sql
        }
        // SQLite has a single "main" schema; the allow-list is applied after the query.
        Dialect::Sqlite => String::from(
            "SELECT 'main', m.name, p.name, p.type, p.type, \
             CASE WHEN p.\"notnull\" = 0 AND p.pk = 0 THEN 'YES' ELSE 'NO' END \
             FROM sqlite_master m JOIN pragma_table_info(m.name) p \
             WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%' \
             ORDER BY m.name, p.cid",
        ),
    }
}

/// Preferred declared type for a catalog column.
pub fn pick_db_type(data_type: &str, udt_name: &str) -> String {
    if !udt_name.is_empty() && !udt_name.eq_ignore_ascii_case("null") {
        normalize_type(udt_name)
    } else if !data_type.is_empty() {
        normalize_type(data_type)
    } else {
        "text".to_string()
    }
}

/// Group catalog rows into tables sorted by `(schema, name)`, with columns
/// sorted by name.
pub fn group_tables(rows: Vec<RawColumn>) -> Vec<Table> {
    let mut grouped: BTreeMap<(String, String), Vec<TableColumn>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry((row.schema, row.table))
            .or_default()
            .push(TableColumn {
                name: row.column,
                db_type: pick_db_type(&row.data_type, &row.udt_name),
                nullable: row.nullable,
            });
    }
    grouped
        .into_iter()
        .map(|((schema, name), mut columns)| {
            columns.sort_by(|a, b| a.name.cmp(&b.name));
            Table {
                schema,
                name,
                columns,
            }
        })
        .collect()
}

/// Read user tables from the live catalog. The migration ledger is left out.
pub async fn load_schema_tables(db: &Database, schemas: &[String]) -> Result<Vec<Table>> {
    let dialect = db.dialect();
    let bound = if dialect == Dialect::Sqlite { 0 } else { schemas.len() };
    let sql = catalog_query(dialect, bound);

    let mut query = sqlx::query_as::<_, CatalogRow>(&sql);
    for schema in schemas.iter().take(bound) {
        query = query.bind(schema.as_str());
    }
    let rows = query.fetch_all(db.pool()).await.map_err(Error::Introspect)?;

    let raw: Vec<RawColumn> = rows
        .into_iter()
        .map(RawColumn::from)
        .filter(|c| c.table != LEDGER_TABLE)
        .filter(|c| dialect != Dialect::Sqlite || schemas.is_empty() || schemas.contains(&c.schema))
        .collect();
    let tables = group_tables(raw);
    tracing::debug!(tables = tables.len(), %dialect, "introspected catalog");
    Ok(tables)
}
