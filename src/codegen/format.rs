pub const BANNER: &str = "// ------------------------------------------------------------\n\
//  WARNING: THIS FILE IS AUTOGENERATED BY sqlproc. DO NOT EDIT.\n\
// ------------------------------------------------------------\n\n";

/// Pretty-print generated Rust. Source that does not parse is returned as-is
/// so output is never lost.
pub fn format_source(file_name: &str, src: &str) -> String {
    match syn::parse_file(src) {
        Ok(file) => prettyplease::unparse(&file),
        Err(err) => {
            tracing::warn!(file = file_name, error = %err, "generated source did not parse; writing it unformatted");
            src.to_string()
        }
    }
}

/// Formatted source with the banner on top.
pub fn finish(file_name: &str, src: &str) -> String {
    let mut out = String::from(BANNER);
    out.push_str(&format_source(file_name, src));
    out
}
