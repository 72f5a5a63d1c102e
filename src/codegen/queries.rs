use super::models::row_type_name;
use super::naming::{sql_const_name, to_rust_ident};
use super::types::TypeMap;
use crate::ir::{Dialect, Procedure, ReturnKind};

const EXECUTOR_ARG: &str = "executor";

/// Statement a generated call submits: a bare call for `:exec`, otherwise a
/// select of every column the routine returns.
pub fn statement(proc: &Procedure, dialect: Dialect) -> String {
    let call = format!(
        "{}({})",
        proc.routine_name(),
        dialect.placeholders(proc.params.len())
    );
    match proc.kind {
        ReturnKind::Exec => format!("SELECT {}", call),
        ReturnKind::One | ReturnKind::Many => format!("SELECT * FROM {}", call),
    }
}

/// Rust-facing shape of one generated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    pub fn_name: String,
    /// `(identifier, type)` in binding order.
    pub params: Vec<(String, String)>,
    /// Success type inside `Result<_, sqlx::Error>`.
    pub output: String,
}

impl CallSignature {
    pub fn render(&self) -> String {
        let mut args = vec![format!("{}: D", EXECUTOR_ARG)];
        args.extend(self.params.iter().map(|(name, ty)| format!("{}: {}", name, ty)));
        format!(
            "pub async fn {}<'c, D>({}) -> Result<{}, sqlx::Error>",
            self.fn_name,
            args.join(", "),
            self.output
        )
    }
}

pub fn call_signature(proc: &Procedure, types: &TypeMap) -> CallSignature {
    let params = proc
        .params
        .iter()
        .map(|p| {
            let mut ident = to_rust_ident(&p.name);
            if ident == EXECUTOR_ARG {
                ident.push('_');
            }
            (ident, types.map(&p.db_type).param_type())
        })
        .collect();
    let output = match proc.kind {
        ReturnKind::Exec => "()".to_string(),
        ReturnKind::One => row_type_name(proc),
        ReturnKind::Many => format!("Vec<{}>", row_type_name(proc)),
    };
    CallSignature {
        fn_name: to_rust_ident(&proc.name),
        params,
        output,
    }
}

fn render_call(out: &mut String, proc: &Procedure, types: &TypeMap, dialect: Dialect) {
    let sig = call_signature(proc, types);
    let sql = statement(proc, dialect);
    let konst = sql_const_name(&proc.name);

    out.push_str(&format!("pub const {}: &str = {:?};\n\n", konst, sql));
    out.push_str(&format!(
        "/// Calls `{}` ({}), declared in `{}`.\n",
        proc.routine_name(),
        proc.kind,
        proc.file.display()
    ));
    if proc.kind == ReturnKind::One {
        out.push_str("///\n/// No matching row is `sqlx::Error::RowNotFound`.\n");
    }
    out.push_str(&sig.render());
    out.push_str("\nwhere\n    D: Dbtx<'c>,\n{\n");

    let binds: String = sig
        .params
        .iter()
        .map(|(name, _)| format!(".bind({})", name))
        .collect();
    let body = match proc.kind {
        ReturnKind::Exec => format!(
            "    db::exec({}, sqlx::query({}){}).await.map(|_| ())\n",
            EXECUTOR_ARG, konst, binds
        ),
        ReturnKind::One => format!(
            "    db::query_one({}, sqlx::query_as({}){}).await\n",
            EXECUTOR_ARG, konst, binds
        ),
        ReturnKind::Many => format!(
            "    db::query_many({}, sqlx::query_as({}){}).await\n",
            EXECUTOR_ARG, konst, binds
        ),
    };
    out.push_str(&body);
    out.push_str("}\n\n");
}

/// Render `queries.rs`: one async call per procedure, in input order.
pub fn generate_queries(
    procs: &[Procedure],
    types: &TypeMap,
    dialect: Dialect,
    module_name: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "//! Typed calls for the `{}` stored procedures.\n\n",
        module_name
    ));
    out.push_str("use super::db::{self, Dbtx};\n");

    let rows: Vec<String> = procs
        .iter()
        .filter(|p| p.kind.returns_rows())
        .map(row_type_name)
        .collect();
    if !rows.is_empty() {
        out.push_str(&format!("use super::models::{{{}}};\n", rows.join(", ")));
    }
    let needs_chrono = procs
        .iter()
        .flat_map(|p| &p.params)
        .any(|p| types.map(&p.db_type).uses_chrono());
    if needs_chrono {
        out.push_str("use chrono::{DateTime, Utc};\n");
    }
    out.push('\n');

    for proc in procs {
        render_call(&mut out, proc, types, dialect);
    }
    out
}
