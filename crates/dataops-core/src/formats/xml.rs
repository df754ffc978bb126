//! XML reader.
//!
//! The document is converted into a JSON tree first:
//!
//! - the root element becomes `{"<root tag>": <element>}`;
//! - attributes become `"@name"` keys;
//! - child elements are keyed by tag, and repeated tags collect into arrays;
//! - an element with only text becomes that string (or `null` when empty);
//!   otherwise its text is kept under `"#text"`.
//!
//! The optional dotted record path (`"root.items"`) is then followed key by
//! key, and the value it lands on becomes the records: one per element of an
//! array, or a single record for an object.

use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};
use serde_json::{Map, Value};
use snafu::prelude::*;

use crate::{dataset::Dataset, storage::read_input_to_string};

use super::{
    FormatResult, RecordPathNotFoundSnafu, StorageSnafu, XmlSnafu, display_path,
    records::{into_records, records_to_dataset},
};

const ATTR_PREFIX: char = '@';
const TEXT_KEY: &str = "#text";

/// Read an XML file, optionally descending into `record_path` first.
pub fn read_xml(path: &Path, record_path: Option<&str>) -> FormatResult<Dataset> {
    let text = read_input_to_string(path).context(StorageSnafu)?;
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(&text, opts).context(XmlSnafu {
        path: display_path(path),
    })?;

    let tree = document_to_value(&doc);
    let located = match record_path {
        Some(record_path) => follow_record_path(tree, record_path, path)?,
        None => tree,
    };

    records_to_dataset(&into_records(located), path)
}

/// Convert a parsed document into its JSON tree.
pub fn document_to_value(doc: &Document<'_>) -> Value {
    let root = doc.root_element();
    let mut map = Map::with_capacity(1);
    map.insert(root.tag_name().name().to_string(), element_to_value(root));
    Value::Object(map)
}

fn element_to_value(node: Node<'_, '_>) -> Value {
    let mut map = Map::new();

    for attr in node.attributes() {
        map.insert(
            format!("{ATTR_PREFIX}{}", attr.name()),
            Value::String(attr.value().to_string()),
        );
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let key = child.tag_name().name().to_string();
            let value = element_to_value(child);
            match map.get_mut(&key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key, value);
                }
            }
        } else if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t.trim());
            }
        }
    }

    if map.is_empty() {
        return if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        };
    }

    if !text.is_empty() {
        map.insert(TEXT_KEY.to_string(), Value::String(text));
    }
    Value::Object(map)
}

fn follow_record_path(tree: Value, record_path: &str, path: &Path) -> FormatResult<Value> {
    let mut current = tree;
    for key in record_path.split('.').filter(|k| !k.is_empty()) {
        current = match current {
            Value::Object(mut map) => match map.remove(key) {
                Some(next) => next,
                None => {
                    return RecordPathNotFoundSnafu {
                        path: display_path(path),
                        record_path,
                        key,
                    }
                    .fail();
                }
            },
            _ => {
                return RecordPathNotFoundSnafu {
                    path: display_path(path),
                    record_path,
                    key,
                }
                .fail();
            }
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::formats::FormatError;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const ITEMS: &str = r#"<?xml version="1.0"?>
<root>
  <items>
    <item id="1"><name>alpha</name><value>10</value></item>
    <item id="2"><name>beta</name><value>20</value></item>
    <item id="3"><name/><value>30</value></item>
  </items>
</root>
"#;

    #[test]
    fn converts_document_to_json_tree() -> TestResult {
        let doc = Document::parse("<a x=\"1\"><b>t</b><b>u</b><c/>tail</a>")?;
        let value = document_to_value(&doc);
        assert_eq!(
            value,
            json!({"a": {"@x": "1", "b": ["t", "u"], "c": null, "#text": "tail"}})
        );
        Ok(())
    }

    #[test]
    fn record_path_selects_repeated_elements() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("input.xml");
        fs::write(&path, ITEMS)?;

        let ds = read_xml(&path, Some("root.items.item"))?;
        assert_eq!(ds.num_rows(), 3);
        assert_eq!(ds.column_names(), vec!["@id", "name", "value"]);
        Ok(())
    }

    #[test]
    fn no_record_path_is_single_record() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("input.xml");
        fs::write(&path, ITEMS)?;

        let ds = read_xml(&path, None)?;
        assert_eq!(ds.num_rows(), 1);
        assert_eq!(ds.column_names(), vec!["root"]);
        Ok(())
    }

    #[test]
    fn missing_record_path_key_is_an_error() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("input.xml");
        fs::write(&path, ITEMS)?;

        let err = read_xml(&path, Some("root.rows")).expect_err("rows does not exist");
        assert!(matches!(err, FormatError::RecordPathNotFound { key, .. } if key == "rows"));
        Ok(())
    }

    #[test]
    fn malformed_xml_is_reported() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("bad.xml");
        fs::write(&path, "<root><open></root>")?;

        let err = read_xml(&path, None).expect_err("mismatched tags");
        assert!(matches!(err, FormatError::Xml { .. }));
        Ok(())
    }
}
