/// Fence preferred when the model was asked for JSON.
const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Isolates the JSON candidate in raw model output.
///
/// Order: interior of a ```` ```json ```` fence, else interior of the first bare fence,
/// else the trimmed text. An unclosed fence yields everything after its opener.
/// Does not parse JSON.
pub fn extract_json_payload(raw: &str) -> &str {
    let text = raw.trim();

    if let Some(interior) = fenced_interior(text, JSON_FENCE) {
        return interior;
    }
    if let Some(interior) = fenced_interior(text, FENCE) {
        return interior;
    }
    text
}

fn fenced_interior<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)?;
    let body = skip_language_tag(&text[start + opener.len()..]);

    let interior = match body.find(FENCE) {
        Some(end) => &body[..end],
        None => body,
    };
    Some(interior.trim())
}

/// Drops the rest of the opening fence line when it is a bare language tag (` ```yaml `).
fn skip_language_tag(after_opener: &str) -> &str {
    let Some(newline) = after_opener.find('\n') else {
        return after_opener;
    };
    let first_line = after_opener[..newline].trim();
    let is_tag = !first_line.is_empty()
        && first_line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'));

    if is_tag {
        &after_opener[newline + 1..]
    } else {
        after_opener
    }
}
