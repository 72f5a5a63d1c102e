//! Extracts the header contract of an annotated procedure file.
//!
//! A unit looks like:
//!
//! ```sql
//! -- name: GetUser :one
//! -- param: user_id int
//! -- returns: id int, name text
//! CREATE OR REPLACE FUNCTION get_user(p_user_id INT) ...
//! ```
//!
//! Header lines are classified independently; every other line that is not a
//! `--` comment is body text.

use crate::codegen::naming::{to_pascal, to_rust_ident};
use crate::error::{Error, Result};
use crate::ir::{Column, Param, Procedure, ReturnKind};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--\s*name:\s*([A-Za-z0-9_]*)\s*(:\S+)?").expect("name header pattern")
});
static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--\s*param:\s*(.*)$").expect("param header pattern"));
static RETURNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--\s*returns:\s*(.*)$").expect("returns header pattern"));
static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

enum Line<'a> {
    Name { name: &'a str, marker: Option<&'a str> },
    Param(&'a str),
    Returns(&'a str),
    Comment,
    Body,
}

fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = NAME_RE.captures(line) {
        return Line::Name {
            name: caps.get(1).map_or("", |m| m.as_str()),
            marker: caps.get(2).map(|m| m.as_str()),
        };
    }
    if let Some(caps) = PARAM_RE.captures(line) {
        return Line::Param(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = RETURNS_RE.captures(line) {
        return Line::Returns(caps.get(1).map_or("", |m| m.as_str()));
    }
    if line.trim_start().starts_with("--") {
        Line::Comment
    } else {
        Line::Body
    }
}

/// Lower-case a declared type and collapse its internal whitespace.
pub fn normalize_type(db_type: &str) -> String {
    db_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split `name type` into its identifier and normalized type.
fn split_declaration(decl: &str) -> std::result::Result<(String, String), String> {
    let decl = decl.trim();
    let (name, db_type) = match decl.split_once(char::is_whitespace) {
        Some((name, rest)) if !rest.trim().is_empty() => (name, rest),
        _ => return Err(format!("declaration {:?} needs a name and a type", decl)),
    };
    if !IDENT_RE.is_match(name) {
        return Err(format!("invalid identifier {:?}", name));
    }
    Ok((name.to_string(), normalize_type(db_type)))
}

/// Split on commas that are not nested inside parentheses, so that
/// `amount numeric(10,2)` stays one entry.
fn split_top_level(def: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in def.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&def[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&def[start..]);
    parts
}

fn parse_columns(def: &str) -> std::result::Result<Vec<Column>, String> {
    let mut columns = Vec::new();
    for part in split_top_level(def) {
        if part.trim().is_empty() {
            continue;
        }
        let (name, db_type) = split_declaration(part)?;
        columns.push(Column { name, db_type });
    }
    Ok(columns)
}

/// Parse one procedure unit. `path` is only used for diagnostics and is
/// recorded on the result.
pub fn parse_source(path: &Path, text: &str) -> Result<Procedure> {
    let invalid = |reason: String| Error::InvalidProcedure {
        path: path.to_path_buf(),
        reason,
    };

    let mut header: Option<(String, ReturnKind)> = None;
    let mut params = Vec::new();
    let mut returns = Vec::new();
    let mut body = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        match classify(line) {
            Line::Name { name, marker } => {
                if name.is_empty() {
                    return Err(invalid(format!("line {}: missing -- name metadata", lineno)));
                }
                let marker = marker.ok_or_else(|| {
                    invalid(format!("line {}: {} has no :one/:many/:exec marker", lineno, name))
                })?;
                let kind = ReturnKind::from_marker(marker)
                    .ok_or_else(|| invalid(format!("unknown return kind {:?}", marker)))?;
                if let Some((previous, _)) = &header {
                    return Err(invalid(format!(
                        "line {}: second name header {} (already named {})",
                        lineno, name, previous
                    )));
                }
                header = Some((name.to_string(), kind));
            }
            Line::Param(decl) => {
                let (name, db_type) =
                    split_declaration(decl).map_err(|e| invalid(format!("line {}: {}", lineno, e)))?;
                params.push(Param { name, db_type });
            }
            Line::Returns(def) => {
                let cols = parse_columns(def).map_err(|e| invalid(format!("line {}: {}", lineno, e)))?;
                returns.extend(cols);
            }
            Line::Comment => {}
            Line::Body => body.push(line),
        }
    }

    let (name, kind) = header.ok_or_else(|| invalid("missing -- name metadata".into()))?;
    if kind.returns_rows() && returns.is_empty() {
        return Err(invalid(
            "returning procedure must declare -- returns columns".into(),
        ));
    }
    ensure_distinct_fields("parameter", params.iter().map(|p| p.name.as_str())).map_err(&invalid)?;
    ensure_distinct_fields("result column", returns.iter().map(|c| c.name.as_str()))
        .map_err(&invalid)?;
    let sql = body.join("\n").trim().to_string();
    if sql.is_empty() {
        return Err(invalid("procedure SQL body is empty".into()));
    }

    Ok(Procedure {
        name,
        file: path.to_path_buf(),
        kind,
        params,
        returns,
        sql,
    })
}

/// Names that map to the same Rust identifier would collide as arguments or fields.
fn ensure_distinct_fields<'a>(
    what: &str,
    names: impl Iterator<Item = &'a str>,
) -> std::result::Result<(), String> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for name in names {
        if let Some(first) = seen.insert(to_rust_ident(name), name) {
            return Err(format!("duplicate {} {} (clashes with {})", what, name, first));
        }
    }
    Ok(())
}

/// Read and parse a single SQL file.
pub fn parse_file(path: &Path) -> Result<Procedure> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_source(path, &text)
}

/// Parse every file; the first failure aborts the batch.
pub fn parse_files<P: AsRef<Path>>(files: &[P]) -> Result<Vec<Procedure>> {
    let procs = files
        .iter()
        .map(|f| parse_file(f.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    ensure_unique_names(&procs)?;
    tracing::debug!(count = procs.len(), "parsed procedures");
    Ok(procs)
}

/// Reject two procedures that would generate the same type and call names.
pub fn ensure_unique_names(procs: &[Procedure]) -> Result<()> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for proc in procs {
        if let Some(first) = seen.insert(to_pascal(&proc.name), &proc.file) {
            return Err(Error::DuplicateProcedure {
                name: proc.name.clone(),
                first: first.clone(),
                second: proc.file.clone(),
            });
        }
    }
    Ok(())
}
