//! `sqlproc.toml` project configuration.
//!
//! ```toml
//! database_url = "postgres://localhost/app"
//! files = ["sql/procedures"]
//! migrations = ["sql/migrations"]
//! out = "src/db"
//! module = "db"
//!
//! [schema_models]
//! schemas = ["public"]
//! tags = "db,json"
//!
//! [types]
//! citext = "String"
//! ```

use crate::codegen::{Tags, TypeMap};
use crate::error::{Error, Result};
use crate::introspect::SchemaModelOptions;
use crate::ir::Dialect;
use crate::pipeline::{DatabaseSource, PipelineOptions, DEFAULT_OUT_DIR};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "sqlproc.toml";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_url: Option<String>,
    pub files: Vec<PathBuf>,
    pub migrations: Vec<PathBuf>,
    pub out: Option<PathBuf>,
    pub module: Option<String>,
    pub dialect: Option<Dialect>,
    pub skip_migrate: bool,
    pub skip_generate: bool,
    /// Zero disables the deadline.
    pub timeout_secs: Option<u64>,
    pub schema_models: Option<SchemaModelsConfig>,
    /// Declared database type to Rust type, checked before the built-in mapping.
    pub types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SchemaModelsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub schemas: Vec<String>,
    pub out: Option<PathBuf>,
    pub module: Option<String>,
    pub tags: Option<String>,
}

impl Config {
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(path, &text)
    }

    /// Load `sqlproc.toml` from `dir` if it exists.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "loading config");
        Self::load(&path).map(Some)
    }

    pub fn type_map(&self) -> TypeMap {
        TypeMap::with_overrides(self.types.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    /// `None` unless a `[schema_models]` table is present and enabled.
    pub fn schema_model_options(&self) -> Option<SchemaModelOptions> {
        let cfg = self.schema_models.as_ref().filter(|c| c.enabled)?;
        Some(SchemaModelOptions {
            schemas: cfg.schemas.clone(),
            out_dir: cfg.out.clone(),
            module_name: cfg.module.clone(),
            tags: cfg.tags.as_deref().map(Tags::parse).unwrap_or_default(),
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => PipelineOptions::default().timeout,
        }
    }

    /// Pipeline options described by this file alone.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            sql_inputs: self.files.clone(),
            migration_inputs: self.migrations.clone(),
            out_dir: self
                .out
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            module_name: self
                .module
                .clone()
                .unwrap_or_else(|| crate::codegen::DEFAULT_MODULE.to_string()),
            dialect: self.dialect,
            types: self.type_map(),
            skip_migrate: self.skip_migrate,
            skip_generate: self.skip_generate,
            database: self
                .database_url
                .clone()
                .map_or(DatabaseSource::None, DatabaseSource::Url),
            schema_models: self.schema_model_options(),
            timeout: self.timeout(),
        }
    }
}
