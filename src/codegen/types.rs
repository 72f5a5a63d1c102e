//! Declared SQL type -> Rust type mapping.

use crate::parser::normalize_type;
use std::collections::BTreeMap;

/// Rust representation chosen for a declared column or parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    Int16,
    Int32,
    Int64,
    Text,
    Bool,
    Float64,
    Timestamp,
    /// Raw json bytes.
    Bytes,
    /// A user override from the `[types]` config table.
    Custom(String),
    /// No rule matched; carries the normalized declared type.
    Unknown(String),
}

impl TargetType {
    /// Owned type used in row structs.
    pub fn rust_type(&self) -> String {
        match self {
            TargetType::Int16 => "i16".into(),
            TargetType::Int32 => "i32".into(),
            TargetType::Int64 => "i64".into(),
            TargetType::Text => "String".into(),
            TargetType::Bool => "bool".into(),
            TargetType::Float64 => "f64".into(),
            TargetType::Timestamp => "DateTime<Utc>".into(),
            TargetType::Bytes => "Vec<u8>".into(),
            TargetType::Custom(ty) => ty.clone(),
            TargetType::Unknown(_) => "serde_json::Value".into(),
        }
    }

    /// Type accepted by a generated call for a bound argument.
    pub fn param_type(&self) -> String {
        match self {
            TargetType::Text => "&str".into(),
            TargetType::Bytes => "&[u8]".into(),
            TargetType::Unknown(_) => "&serde_json::Value".into(),
            other => other.rust_type(),
        }
    }

    /// Field type for a nullable column.
    pub fn nullable_type(&self) -> String {
        let base = self.rust_type();
        if base.starts_with("Option<") {
            base
        } else {
            format!("Option<{}>", base)
        }
    }

    pub fn uses_chrono(&self) -> bool {
        matches!(self, TargetType::Timestamp)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TargetType::Unknown(_))
    }
}

fn is_array(t: &str) -> bool {
    t.ends_with("[]") || t.starts_with('_')
}

/// Map a declared type. Integer families are checked by prefix first, then
/// the broader containment rules; anything else is [`TargetType::Unknown`].
pub fn map_type(db_type: &str) -> TargetType {
    let t = normalize_type(db_type);
    if is_array(&t) {
        return TargetType::Unknown(t);
    }

    if t.starts_with("smallint") || t.starts_with("smallserial") || t == "int2" {
        return TargetType::Int16;
    }
    if t.starts_with("bigint") || t.starts_with("bigserial") || t == "int8" {
        return TargetType::Int64;
    }
    if (t.starts_with("int") && !t.starts_with("interval")) || t.starts_with("serial") {
        return TargetType::Int32;
    }

    let has = |needle: &str| t.contains(needle);
    if has("char") || has("text") || has("uuid") {
        TargetType::Text
    } else if t.starts_with("bool") {
        TargetType::Bool
    } else if has("double") || has("float") || has("numeric") || has("decimal") || has("real") {
        TargetType::Float64
    } else if has("timestamp") || has("date") {
        TargetType::Timestamp
    } else if has("json") {
        TargetType::Bytes
    } else {
        TargetType::Unknown(t)
    }
}

/// [`map_type`] with user overrides consulted first.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    overrides: BTreeMap<String, String>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        TypeMap {
            overrides: overrides
                .into_iter()
                .map(|(k, v)| (normalize_type(k.as_ref()), v.into()))
                .collect(),
        }
    }

    pub fn map(&self, db_type: &str) -> TargetType {
        match self.overrides.get(&normalize_type(db_type)) {
            Some(ty) => TargetType::Custom(ty.clone()),
            None => map_type(db_type),
        }
    }
}
