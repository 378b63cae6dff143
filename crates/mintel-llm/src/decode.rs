//! Lenient JSON extraction from model completions.
//!
//! Models wrap JSON in code fences, add prose around it and sometimes stop
//! mid-structure. [`decode`] recovers the first complete JSON container and
//! reports truncation separately from other syntax problems.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::DecodeError;

/// A fence on its own line, or one opening or closing the whole text.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^[ \t]*```[\w-]*[ \t]*$)|(?:\A\s*```[\w-]*)|(?:```\s*\z)")
        .expect("valid regex")
});
static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));

/// Decodes a completion into a JSON value.
///
/// # Errors
///
/// Returns [`DecodeError::Incomplete`] when a container opens and the text
/// ends before it closes, and [`DecodeError::Malformed`] for everything else.
pub fn decode(raw: &str) -> Result<Value, DecodeError> {
    if let Ok(value) = serde_json::from_str(raw.trim()) {
        return Ok(value);
    }

    let cleaned = clean(raw);
    if let Ok(value) = serde_json::from_str(&cleaned) {
        return Ok(value);
    }

    let span = container_span(&cleaned)?;
    match serde_json::from_str(span) {
        Ok(value) => Ok(value),
        Err(first) => serde_json::from_str(&repair(span)).map_err(|_| DecodeError::Malformed {
            reason: first.to_string(),
        }),
    }
}

/// Drops code-fence lines and ASCII control characters other than `\n`,
/// `\r` and `\t`, then trims.
fn clean(raw: &str) -> String {
    let unfenced = FENCE_RE.replace_all(raw, "");
    unfenced
        .chars()
        .filter(|c| !c.is_ascii_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Finds the first `{` or `[` and returns the slice up to its matching
/// closer, ignoring brackets inside string literals.
fn container_span(text: &str) -> Result<&str, DecodeError> {
    let Some(start) = text.find(['{', '[']) else {
        return Err(DecodeError::Malformed {
            reason: "no JSON object or array found".to_owned(),
        });
    };

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return Err(DecodeError::Malformed {
                        reason: format!("unexpected '{c}' at offset {}", start + offset),
                    });
                }
                if stack.is_empty() {
                    let end = start + offset + c.len_utf8();
                    return Ok(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    Err(DecodeError::Incomplete {
        opener: text[start..].chars().next().unwrap_or('{'),
        offset: start,
    })
}

/// Low-risk textual fixes: trailing commas and typographic quotes.
fn repair(span: &str) -> String {
    let straightened: String = span
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    TRAILING_COMMA_RE.replace_all(&straightened, "$1").into_owned()
}
