//! Parsing for model output that is supposed to be JSON but often is not quite.

use serde_json::Value;

/// Parse `text` as JSON, or the outermost `{...}` inside it.
///
/// `None` means no structure was found; callers fall back to their heuristics.
pub fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Object-only view of [`parse_lenient`].
pub fn parse_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    match parse_lenient(text)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_clean_json() {
        assert_eq!(parse_lenient(r#" {"a": [1, 2]} "#), Some(json!({"a": [1, 2]})));
    }

    #[test]
    fn extracts_object_wrapped_in_prose() {
        assert_eq!(
            parse_lenient(r#"prefix text {"a":1} suffix"#),
            Some(json!({"a": 1}))
        );
    }

    #[test]
    fn extracts_object_from_markdown_fence() {
        let text = "Sure! Here you go:\n```json\n{\"summary\": \"calm\"}\n```\n";
        assert_eq!(parse_lenient(text), Some(json!({"summary": "calm"})));
    }

    #[test]
    fn rejects_plain_prose() {
        assert_eq!(parse_lenient("not json at all"), None);
    }

    #[test]
    fn rejects_reversed_or_broken_braces() {
        assert_eq!(parse_lenient("} nope {"), None);
        assert_eq!(parse_lenient("{ broken: json }"), None);
    }

    #[test]
    fn parse_object_ignores_non_objects() {
        assert!(parse_object("[1, 2, 3]").is_none());
        assert!(parse_object(r#"{"k": true}"#).is_some());
    }
}
