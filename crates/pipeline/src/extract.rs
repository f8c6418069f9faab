//! Best-effort extractors for loosely-structured tool output.
//!
//! The upstream tools only loosely specify their output format (JSON wrapped
//! in prose, markdown fences, sometimes neither), so these are deliberate
//! scrapers with an explicit fallback order rather than strict parsers.

use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").unwrap_or_else(|e| panic!("url regex: {e}")));

/// The first top-level balanced `{...}` span in `text`, tolerant of
/// surrounding prose and markdown fences. String literals and escapes are
/// respected so braces inside JSON strings do not end the span early.
#[must_use]
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            },
            _ => {},
        }
    }
    None
}

/// Pull generated code out of raw generator output shaped like
/// `{"changes":[{type, code, ...}, ...]}`.
///
/// The `changes` array is scanned from the end backward; the first entry
/// whose `code` is a non-empty string wins. `None` when nothing parses or
/// matches.
#[must_use]
pub fn code_from_changes(raw: &str) -> Option<String> {
    let span = first_json_object(raw)?;
    let value: serde_json::Value = serde_json::from_str(span).ok()?;
    value
        .get("changes")?
        .as_array()?
        .iter()
        .rev()
        .find_map(|change| {
            let code = change.get("code")?.as_str()?;
            (!code.is_empty()).then(|| code.to_string())
        })
}

/// Pull a deployment URL out of raw deployer output.
///
/// Fallback order: a JSON `deploymentUrl` field starting with `http`, then
/// the first `https?://` match anywhere in the text.
#[must_use]
pub fn deployment_url(raw: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw.trim())
        && let Some(url) = value.get("deploymentUrl").and_then(|u| u.as_str())
        && url.starts_with("http")
    {
        return Some(url.to_string());
    }
    URL_RE.find(raw).map(|m| m.as_str().to_string())
}
