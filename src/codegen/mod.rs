pub mod executor;
pub mod format;
pub mod models;
pub mod naming;
pub mod queries;
pub mod schema_models;
pub mod types;

use crate::error::{Error, Result};
use crate::ir::{Dialect, Procedure, Table};
use crate::parser;
use std::fs;
use std::path::{Path, PathBuf};

pub use models::Tags;
pub use types::{map_type, TargetType, TypeMap};

pub const DEFAULT_MODULE: &str = "generated";

/// Artifacts a module root may declare, in declaration order.
const KNOWN_ARTIFACTS: &[&str] = &["db", "models", "queries", "schema_models"];

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

impl Artifact {
    fn rendered(file_name: &str, src: &str) -> Self {
        Artifact {
            file_name: file_name.to_string(),
            contents: format::finish(file_name, src),
        }
    }
}

fn module_name_or_default(name: &str) -> Result<String> {
    let name = if name.trim().is_empty() {
        DEFAULT_MODULE
    } else {
        name.trim()
    };
    if !naming::is_rust_identifier(name) {
        return Err(Error::InvalidModuleName(name.to_string()));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub module_name: String,
    pub dialect: Dialect,
    pub types: TypeMap,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            module_name: DEFAULT_MODULE.to_string(),
            dialect: Dialect::default(),
            types: TypeMap::new(),
        }
    }
}

/// Renders `db.rs`, `models.rs` and `queries.rs` for a batch of procedures.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    module_name: String,
    dialect: Dialect,
    types: TypeMap,
}

impl CodeGenerator {
    pub fn new(opts: GeneratorOptions) -> Result<Self> {
        Ok(CodeGenerator {
            module_name: module_name_or_default(&opts.module_name)?,
            dialect: opts.dialect,
            types: opts.types,
        })
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Render every artifact without touching the filesystem.
    pub fn render(&self, procs: &[Procedure]) -> Result<Vec<Artifact>> {
        if procs.is_empty() {
            return Err(Error::NoProcedures);
        }
        parser::ensure_unique_names(procs)?;

        let db = executor::generate_executor_trait(self.dialect, &self.module_name);
        let models = models::generate_models(procs, &self.types, &self.module_name);
        let queries =
            queries::generate_queries(procs, &self.types, self.dialect, &self.module_name);
        Ok(vec![
            Artifact::rendered("db.rs", &db),
            Artifact::rendered("models.rs", &models),
            Artifact::rendered("queries.rs", &queries),
        ])
    }

    /// Write the artifacts plus the module root into `output_dir`.
    pub fn generate(&self, procs: &[Procedure], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let artifacts = self.render(procs)?;
        let mut written = write_artifacts(output_dir, &artifacts)?;
        written.push(write_module_root(output_dir, &self.module_name)?);
        tracing::info!(
            module = %self.module_name,
            dir = %output_dir.display(),
            procedures = procs.len(),
            "generated procedure bindings"
        );
        Ok(written)
    }

    /// Parse `files` and generate code for them.
    pub fn generate_files<P: AsRef<Path>>(&self, files: &[P], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let procs = parser::parse_files(files)?;
        self.generate(&procs, output_dir)
    }
}

/// Renders `schema_models.rs` from introspected tables.
#[derive(Debug, Clone)]
pub struct SchemaModelGenerator {
    module_name: String,
    dialect: Dialect,
    types: TypeMap,
    tags: Tags,
}

impl SchemaModelGenerator {
    pub fn new(opts: GeneratorOptions, tags: Tags) -> Result<Self> {
        Ok(SchemaModelGenerator {
            module_name: module_name_or_default(&opts.module_name)?,
            dialect: opts.dialect,
            types: opts.types,
            tags,
        })
    }

    /// `None` when there are no tables.
    pub fn render(&self, tables: &[Table]) -> Option<Artifact> {
        if tables.is_empty() {
            return None;
        }
        let src = schema_models::generate_schema_models(
            tables,
            &self.types,
            self.dialect,
            self.tags,
            &self.module_name,
        );
        Some(Artifact::rendered("schema_models.rs", &src))
    }

    /// Write `schema_models.rs` and refresh the module root. Zero tables
    /// writes nothing.
    pub fn generate(&self, tables: &[Table], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let Some(artifact) = self.render(tables) else {
            return Ok(Vec::new());
        };
        let mut written = write_artifacts(output_dir, std::slice::from_ref(&artifact))?;
        written.push(write_module_root(output_dir, &self.module_name)?);
        Ok(written)
    }
}

/// Write each artifact in full to `dir`, creating it if needed.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        fs::write(&path, &artifact.contents).map_err(|e| Error::io(&path, e))?;
        tracing::debug!(path = %path.display(), "wrote artifact");
        written.push(path);
    }
    Ok(written)
}

/// (Re)write `mod.rs` declaring every known artifact present in `dir`, so
/// procedure bindings and schema models can share one module.
pub fn write_module_root(dir: &Path, module_name: &str) -> Result<PathBuf> {
    let present: Vec<&str> = KNOWN_ARTIFACTS
        .iter()
        .copied()
        .filter(|stem| dir.join(format!("{}.rs", stem)).is_file())
        .collect();

    let mut src = format!(
        "//! `{}`: database bindings generated by sqlproc.\n\n",
        module_name
    );
    for stem in &present {
        src.push_str(&format!("pub mod {};\n", stem));
    }
    if present.contains(&"db") {
        src.push_str("\npub use db::{is_not_found, Dbtx};\n");
    }
    if present.contains(&"queries") {
        src.push_str("pub use queries::*;\n");
    }

    let path = dir.join("mod.rs");
    fs::write(&path, format::finish("mod.rs", &src)).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}
