//! Live preview of the text a document tool is about to write, read out of
//! arguments that are still streaming.

/// Argument carrying the written text, per document tool.
fn written_field(tool: &str) -> Option<&'static str> {
    match tool {
        "update_document" => Some("new_content"),
        "append_to_document" => Some("content_to_add"),
        "replace_text" => Some("new_text"),
        _ => None,
    }
}

/// Decoded prefix of the written text seen so far, or `None` when the tool
/// writes no text or its field has not started yet.
pub fn written_text(tool: &str, partial_arguments: &str) -> Option<String> {
    let key = format!("\"{}\"", written_field(tool)?);
    partial_arguments
        .match_indices(key.as_str())
        .find_map(|(at, _)| {
            let rest = partial_arguments[at + key.len()..].trim_start();
            let rest = rest.strip_prefix(':')?.trim_start();
            rest.strip_prefix('"').map(unescape_prefix)
        })
}

/// Unescapes a JSON string body up to its closing quote or the end of input.
/// An escape cut off by the end of input is dropped.
fn unescape_prefix(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => break,
            '\\' => match chars.next() {
                None => break,
                Some('n') => text.push('\n'),
                Some('r') => text.push('\r'),
                Some('t') => text.push('\t'),
                Some('b') => text.push('\u{0008}'),
                Some('f') => text.push('\u{000c}'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    if hex.len() < 4 {
                        break;
                    }
                    text.extend(u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32));
                }
                Some(other) => text.push(other),
            },
            other => text.push(other),
        }
    }
    text
}
