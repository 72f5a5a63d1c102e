use crate::ir::Dialect;

/// Names of the sqlx items generated code refers to for one dialect.
pub(crate) struct SqlxNames {
    pub database: &'static str,
    pub module: &'static str,
    pub arguments: &'static str,
    pub query_result: &'static str,
    pub row: &'static str,
    pub pool: &'static str,
    pub connection: &'static str,
}

pub(crate) fn sqlx_names(dialect: Dialect) -> SqlxNames {
    match dialect {
        Dialect::Postgres => SqlxNames {
            database: "Postgres",
            module: "postgres",
            arguments: "PgArguments",
            query_result: "PgQueryResult",
            row: "PgRow",
            pool: "PgPool",
            connection: "PgConnection",
        },
        Dialect::Mysql => SqlxNames {
            database: "MySql",
            module: "mysql",
            arguments: "MySqlArguments",
            query_result: "MySqlQueryResult",
            row: "MySqlRow",
            pool: "MySqlPool",
            connection: "MySqlConnection",
        },
        Dialect::Sqlite => SqlxNames {
            database: "Sqlite",
            module: "sqlite",
            arguments: "SqliteArguments<'q>",
            query_result: "SqliteQueryResult",
            row: "SqliteRow",
            pool: "SqlitePool",
            connection: "SqliteConnection",
        },
    }
}

/// Render `db.rs`: the `Dbtx` handle trait plus the three primitives every
/// generated call goes through.
pub fn generate_executor_trait(dialect: Dialect, module_name: &str) -> String {
    let n = sqlx_names(dialect);
    let args_import = n.arguments.split('<').next().unwrap_or(n.arguments);
    let mut out = String::new();

    out.push_str(&format!(
        "//! Database handle used by the `{}` procedure calls.\n\n",
        module_name
    ));
    out.push_str(&format!(
        "use sqlx::{}::{{{}, {}, {}}};\n",
        n.module, args_import, n.query_result, n.row
    ));
    out.push_str("use sqlx::query::{Query, QueryAs};\n");
    out.push_str(&format!("use sqlx::{{Executor, FromRow, {}}};\n\n", n.database));

    out.push_str(&format!(
        "/// Anything that can run a statement: `&{}`, `&mut {}` or `&mut *transaction`.\n",
        n.pool, n.connection
    ));
    out.push_str(&format!(
        "pub trait Dbtx<'c>: Executor<'c, Database = {}> {{}}\n\n",
        n.database
    ));
    out.push_str(&format!(
        "impl<'c, E> Dbtx<'c> for E where E: Executor<'c, Database = {}> {{}}\n\n",
        n.database
    ));

    out.push_str("/// Run a statement that returns no rows.\n");
    out.push_str(&format!(
        "pub async fn exec<'q, 'c, D>(db: D, query: Query<'q, {}, {}>) -> Result<{}, sqlx::Error>\n",
        n.database, n.arguments, n.query_result
    ));
    out.push_str("where\n    'c: 'q,\n    D: Dbtx<'c> + 'q,\n{\n    query.execute(db).await\n}\n\n");

    out.push_str("/// Fetch every row; zero rows is an empty vector.\n");
    out.push_str(&format!(
        "pub async fn query_many<'q, 'c, D, R>(db: D, query: QueryAs<'q, {}, R, {}>) -> Result<Vec<R>, sqlx::Error>\n",
        n.database, n.arguments
    ));
    out.push_str(&format!(
        "where\n    'c: 'q,\n    D: Dbtx<'c> + 'q,\n    R: for<'r> FromRow<'r, {}> + Send + Unpin + 'q,\n{{\n    query.fetch_all(db).await\n}}\n\n",
        n.row
    ));

    out.push_str("/// Fetch exactly one row. No match is `sqlx::Error::RowNotFound`; see [`is_not_found`].\n");
    out.push_str(&format!(
        "pub async fn query_one<'q, 'c, D, R>(db: D, query: QueryAs<'q, {}, R, {}>) -> Result<R, sqlx::Error>\n",
        n.database, n.arguments
    ));
    out.push_str(&format!(
        "where\n    'c: 'q,\n    D: Dbtx<'c> + 'q,\n    R: for<'r> FromRow<'r, {}> + Send + Unpin + 'q,\n{{\n    query.fetch_one(db).await\n}}\n\n",
        n.row
    ));

    out.push_str("/// Whether a single-row call found nothing.\n");
    out.push_str("pub fn is_not_found(err: &sqlx::Error) -> bool {\n");
    out.push_str("    matches!(err, sqlx::Error::RowNotFound)\n}\n");

    out
}
