//! Pulls generated text out of whatever response shape the endpoint returned.

use serde_json::Value;

/// Extract generated text from a decoded response body.
///
/// Known candidate layouts are tried first, then any `text` field anywhere in
/// the body. If the body carries no text at all it is returned re-serialized,
/// so callers always get something to parse.
pub fn extract_text(body: &Value) -> String {
    if let Some(text) = from_first_candidate(body) {
        return text;
    }

    let mut found = Vec::new();
    collect_text_fields(body, &mut found);
    if !found.is_empty() {
        return found.join("\n");
    }

    body.to_string()
}

fn from_first_candidate(body: &Value) -> Option<String> {
    let candidate = body.get("candidates")?.as_array()?.first()?;

    // candidates[0].content -> [{parts: [{text}]}] (or a single block object)
    if let Some(content) = candidate.get("content") {
        let mut parts = Vec::new();
        for block in blocks(content) {
            for part in array_at(block, "parts") {
                if let Some(text) = part.get("text").and_then(Value::as_str)
                    && !text.is_empty()
                {
                    parts.push(text);
                }
            }
        }
        if !parts.is_empty() {
            return Some(parts.join("\n"));
        }
    }

    // older layout: candidates[0].output -> [{content: [{parts: [{text}]}]}]
    if let Some(output) = candidate.get("output") {
        let mut parts = Vec::new();
        for out in blocks(output) {
            for block in array_at(out, "content") {
                for part in array_at(block, "parts") {
                    if let Some(text) = part.get("text").and_then(Value::as_str) {
                        parts.push(text);
                    }
                }
                // some drafts put text directly on the content entry
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    parts.push(text);
                }
            }
        }
        if !parts.is_empty() {
            return Some(parts.join("\n"));
        }
    }

    None
}

/// A field that is either a list of blocks or one bare block.
fn blocks(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Object(_) => std::slice::from_ref(value),
        _ => &[],
    }
}

fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Depth-first, document order.
fn collect_text_fields<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::String(text) if key.eq_ignore_ascii_case("text") => out.push(text),
                    _ => collect_text_fields(child, out),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text_fields(item, out);
            }
        }
        _ => {}
    }
}
