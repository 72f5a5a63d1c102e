use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Expected result cardinality of a procedure, declared by its `:one`,
/// `:many` or `:exec` marker.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReturnKind {
    /// `:one`, a single row.
    One,
    /// `:many`, zero or more rows.
    Many,
    /// `:exec`, no rows.
    Exec,
}

impl ReturnKind {
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            ":one" => Some(ReturnKind::One),
            ":many" => Some(ReturnKind::Many),
            ":exec" => Some(ReturnKind::Exec),
            _ => None,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            ReturnKind::One => ":one",
            ReturnKind::Many => ":many",
            ReturnKind::Exec => ":exec",
        }
    }

    pub fn returns_rows(self) -> bool {
        !matches!(self, ReturnKind::Exec)
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Normalized (trimmed, lower-cased) declared type.
    pub db_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Normalized (trimmed, lower-cased) declared type.
    pub db_type: String,
}

/// A parsed stored routine: the header contract plus the opaque SQL body.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Procedure {
    pub name: String,
    pub file: PathBuf,
    pub kind: ReturnKind,
    pub params: Vec<Param>,
    pub returns: Vec<Column>,
    /// Submitted verbatim; never inspected.
    pub sql: String,
}

impl Procedure {
    /// Name of the database routine invoked by generated calls.
    pub fn routine_name(&self) -> String {
        inflector::cases::snakecase::to_snake_case(&self.name)
    }
}

/// One versioned schema change, loaded from `<version>_<name>.sql`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SchemaMigration {
    pub version: i64,
    pub name: String,
    pub file: PathBuf,
    pub sql: String,
}

/// A table discovered through catalog introspection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<TableColumn>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub db_type: String,
    pub nullable: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl Dialect {
    /// Infer the dialect from a connection URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres") {
            Some(Dialect::Postgres)
        } else if url.starts_with("mysql") {
            Some(Dialect::Mysql)
        } else if url.starts_with("sqlite") || url.ends_with(".db") || url.starts_with("file:") {
            Some(Dialect::Sqlite)
        } else {
            None
        }
    }

    /// Positional placeholder for the 1-based argument `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Mysql | Dialect::Sqlite => "?".to_string(),
        }
    }

    pub fn placeholders(self, count: usize) -> String {
        (1..=count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Schema whose name is dropped from generated model names.
    pub fn default_schema(self) -> Option<&'static str> {
        match self {
            Dialect::Postgres => Some("public"),
            Dialect::Sqlite => Some("main"),
            Dialect::Mysql => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Sqlite => "sqlite",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::Mysql),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(format!("unknown dialect {}", other)),
        }
    }
}
