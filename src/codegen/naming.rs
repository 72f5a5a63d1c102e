//! Identifier casing shared by every generated artifact.

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

fn is_delimiter(c: char) -> bool {
    c == '_' || c == '-' || c == ' '
}

fn with_first(s: &str, upper: bool) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) if upper => first.to_uppercase().collect::<String>() + chars.as_str(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// Camel-case `snake_case`, `kebab-case` or space separated words. A token
/// without delimiters keeps its inner casing; only the first letter changes.
pub fn to_camel(s: &str, export: bool) -> String {
    let s = s.trim();
    if !s.contains(is_delimiter) {
        return with_first(s, export);
    }
    let joined: String = s
        .split(is_delimiter)
        .filter(|part| !part.is_empty())
        .map(|part| with_first(&part.to_lowercase(), true))
        .collect();
    with_first(&joined, export)
}

/// Exported form used for type names: `get_user` -> `GetUser`.
pub fn to_pascal(s: &str) -> String {
    to_camel(s, true)
}

/// Json-style form used in serialization renames: `created_at` -> `createdAt`.
pub fn to_json_name(s: &str) -> String {
    to_camel(s, false)
}

/// Rust value identifier: `GetUser` -> `get_user`, escaped when it is a keyword.
pub fn to_rust_ident(s: &str) -> String {
    escape_rust_keyword(&inflector::cases::snakecase::to_snake_case(s.trim()))
}

pub fn escape_rust_keyword(name: &str) -> String {
    // These four cannot be raw identifiers.
    if matches!(name, "self" | "Self" | "crate" | "super") {
        format!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// `GetUser` -> `GET_USER_SQL`.
pub fn sql_const_name(s: &str) -> String {
    format!(
        "{}_SQL",
        inflector::cases::snakecase::to_snake_case(s.trim()).to_uppercase()
    )
}

/// Whether `s` can name a generated module.
pub fn is_rust_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic());
    starts_ok
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && s != "_"
        && !RUST_KEYWORDS.contains(&s)
}
