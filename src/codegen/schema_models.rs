use super::models::{push_imports, render_struct, Field, Tags};
use super::naming::to_pascal;
use super::types::TypeMap;
use crate::ir::{Dialect, Table};

/// Struct name for a table; the default schema is left out.
pub fn model_name(schema: &str, table: &str, dialect: Dialect) -> String {
    if schema.is_empty() || Some(schema) == dialect.default_schema() {
        to_pascal(table)
    } else {
        to_pascal(&format!("{}_{}", schema, table))
    }
}

/// Render `schema_models.rs`: one struct per introspected table.
pub fn generate_schema_models(
    tables: &[Table],
    types: &TypeMap,
    dialect: Dialect,
    tags: Tags,
    module_name: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "//! Table models introspected for the `{}` module.\n\n",
        module_name
    ));

    let needs_chrono = tables
        .iter()
        .flat_map(|t| &t.columns)
        .any(|c| types.map(&c.db_type).uses_chrono());
    push_imports(&mut out, tags, needs_chrono);

    for table in tables {
        let fields: Vec<Field<'_>> = table
            .columns
            .iter()
            .map(|c| Field {
                column: &c.name,
                target: types.map(&c.db_type),
                nullable: c.nullable,
            })
            .collect();
        let doc = if table.schema.is_empty() {
            format!("Row of `{}`.", table.name)
        } else {
            format!("Row of `{}.{}`.", table.schema, table.name)
        };
        render_struct(
            &mut out,
            &doc,
            &model_name(&table.schema, &table.name, dialect),
            &fields,
            tags,
        );
    }
    out
}
