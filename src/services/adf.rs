//! Atlassian Document Format helpers
//!
//! JIRA v3 carries rich text (descriptions, comments) as ADF trees. The
//! gateway only needs to flatten them to plain text and to wrap plain text
//! into a single-paragraph document.

use serde_json::{json, Value};

/// Collects every `text` node in document order, joined with single spaces
///
/// Returns `None` when the tree holds no text at all.
pub fn extract_text(node: &Value) -> Option<String> {
    let mut texts = Vec::new();
    collect_text(node, &mut texts);

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(" "))
    }
}

fn collect_text<'a>(node: &'a Value, texts: &mut Vec<&'a str>) {
    match node {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("text") {
                texts.push(map.get("text").and_then(Value::as_str).unwrap_or(""));
            }
            if let Some(children) = map.get("content") {
                collect_text(children, texts);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, texts);
            }
        }
        _ => {}
    }
}

/// A document holding one paragraph; empty text yields an empty paragraph
pub fn paragraph(text: &str) -> Value {
    let content = if text.is_empty() {
        json!([])
    } else {
        json!([{ "type": "text", "text": text }])
    };

    json!({
        "type": "doc",
        "version": 1,
        "content": [{ "type": "paragraph", "content": content }],
    })
}
