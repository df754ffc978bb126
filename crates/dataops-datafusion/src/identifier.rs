//! SQL identifier helpers.

use std::path::Path;

/// Fallback for names that sanitize to nothing.
const FALLBACK_NAME: &str = "t";

/// Lowercase `raw` and map every character outside `[a-z0-9_]` to `_`.
/// Names that would not start with a letter get a `t_` prefix.
pub fn sanitize_identifier(raw: &str) -> String {
    let body: String = raw
        .chars()
        .map(|ch| match ch.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '_') => c,
            _ => '_',
        })
        .collect();

    match body.chars().next() {
        None => FALLBACK_NAME.to_string(),
        Some('a'..='z') => body,
        Some(_) => format!("{FALLBACK_NAME}_{body}"),
    }
}

/// Double-quote an identifier for use in SQL text.
pub fn quote_identifier(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

/// SQL table name for a file or table path: its sanitized file stem.
pub fn default_table_name(path: &Path) -> String {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    sanitize_identifier(&stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_maps_and_prefixes() {
        assert_eq!(sanitize_identifier("Sales-2024"), "sales_2024");
        assert_eq!(sanitize_identifier("_hidden"), "t__hidden");
        assert_eq!(sanitize_identifier("9lives"), "t_9lives");
        assert_eq!(sanitize_identifier("caf\u{e9}"), "caf_");
        assert_eq!(sanitize_identifier(""), "t");
    }

    #[test]
    fn default_table_name_sanitizes() {
        assert_eq!(default_table_name(Path::new("/tmp/my-table 1")), "my_table_1");
        assert_eq!(default_table_name(Path::new("data/raw/input.csv")), "input");
        assert_eq!(default_table_name(Path::new("/tmp/123-data.parquet")), "t_123_data");
        assert_eq!(default_table_name(Path::new("")), "t");
    }

    #[test]
    fn quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("events"), "\"events\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
