//! Model reply sanitizing
//!
//! Models wrap JSON in prose and code fences no matter how firmly they are
//! told not to. [`sanitize`] cuts the reply down to the span between the first
//! `{` and the last `}`; it does not parse anything.

use crate::error::ParseError;

const FENCE: &str = "```";

/// Isolate the candidate JSON object inside a raw model reply
///
/// Returns a slice of `raw`. Already-clean JSON comes back unchanged.
pub fn sanitize(raw: &str) -> Result<&str, ParseError> {
    let text = strip_code_fence(raw.trim());

    let start = text
        .find('{')
        .ok_or_else(|| ParseError::new("no JSON object found"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| ParseError::new("no closing brace found"))?;

    if end < start {
        return Err(ParseError::new(
            "last closing brace precedes the first opening brace",
        ));
    }

    Ok(&text[start..=end])
}

/// Drop a leading ```` ```lang ```` line and a trailing ```` ``` ````
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };

    // The opening fence runs to the end of its line; a one-line reply only
    // carries an optional language tag after it.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}
