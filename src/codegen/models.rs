use super::naming::{to_json_name, to_pascal, to_rust_ident};
use super::types::{TargetType, TypeMap};
use crate::ir::Procedure;

/// Which rename attributes a generated struct carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tags {
    /// `#[sqlx(rename)]` when the field name differs from the column.
    pub db: bool,
    /// serde derives plus `#[serde(rename)]` to the json-style name.
    pub json: bool,
}

impl Default for Tags {
    fn default() -> Self {
        Tags { db: true, json: true }
    }
}

impl Tags {
    /// Parse a comma-separated key list such as `"db,json"`. Unknown keys are ignored.
    pub fn parse(spec: &str) -> Self {
        let mut tags = Tags {
            db: false,
            json: false,
        };
        for key in spec.split(',').map(str::trim) {
            match key {
                "db" => tags.db = true,
                "json" => tags.json = true,
                "" => {}
                other => tracing::warn!(tag = other, "ignoring unknown struct tag"),
            }
        }
        tags
    }
}

pub(crate) struct Field<'a> {
    pub column: &'a str,
    pub target: TargetType,
    pub nullable: bool,
}

pub(crate) fn row_type_name(proc: &Procedure) -> String {
    format!("{}Row", to_pascal(&proc.name))
}

pub(crate) fn derive_line(tags: Tags) -> String {
    let mut derives = vec!["Debug", "Clone", "PartialEq"];
    if tags.json {
        derives.push("Serialize");
        derives.push("Deserialize");
    }
    derives.push("sqlx::FromRow");
    format!("#[derive({})]\n", derives.join(", "))
}

pub(crate) fn render_struct(out: &mut String, doc: &str, name: &str, fields: &[Field<'_>], tags: Tags) {
    out.push_str(&format!("/// {}\n", doc));
    out.push_str(&derive_line(tags));
    out.push_str(&format!("pub struct {} {{\n", name));
    for field in fields {
        let ident = to_rust_ident(field.column);
        // Name sqlx and serde see for the field; `r#` is not part of it.
        let emitted = ident.trim_start_matches("r#");
        if let TargetType::Unknown(decl) = &field.target {
            tracing::warn!(column = field.column, db_type = %decl, "no Rust mapping; using serde_json::Value");
            out.push_str(&format!("    /// Declared as `{}`; no native mapping.\n", decl));
        }
        if tags.db && emitted != field.column {
            out.push_str(&format!("    #[sqlx(rename = {:?})]\n", field.column));
        }
        let json = to_json_name(field.column);
        if tags.json && json != emitted {
            out.push_str(&format!("    #[serde(rename = {:?})]\n", json));
        }
        let ty = if field.nullable {
            field.target.nullable_type()
        } else {
            field.target.rust_type()
        };
        out.push_str(&format!("    pub {}: {},\n", ident, ty));
    }
    out.push_str("}\n\n");
}

pub(crate) fn push_imports(out: &mut String, tags: Tags, needs_chrono: bool) {
    if tags.json {
        out.push_str("use serde::{Deserialize, Serialize};\n");
    }
    if needs_chrono {
        out.push_str("use chrono::{DateTime, Utc};\n");
    }
    out.push('\n');
}

/// Render `models.rs`: one row struct per procedure that returns rows,
/// fields in declared column order.
pub fn generate_models(procs: &[Procedure], types: &TypeMap, module_name: &str) -> String {
    let tags = Tags::default();
    let mut out = String::new();
    out.push_str(&format!(
        "//! Rows returned by the `{}` procedure calls.\n\n",
        module_name
    ));

    let returning: Vec<&Procedure> = procs.iter().filter(|p| p.kind.returns_rows()).collect();
    if returning.is_empty() {
        return out;
    }

    let needs_chrono = returning
        .iter()
        .flat_map(|p| &p.returns)
        .any(|c| types.map(&c.db_type).uses_chrono());
    push_imports(&mut out, tags, needs_chrono);

    for proc in returning {
        let fields: Vec<Field<'_>> = proc
            .returns
            .iter()
            .map(|c| Field {
                column: &c.name,
                target: types.map(&c.db_type),
                nullable: false,
            })
            .collect();
        let doc = format!("Row returned by `{}` ({}).", proc.routine_name(), proc.kind);
        render_struct(&mut out, &doc, &row_type_name(proc), &fields, tags);
    }

    out
}
