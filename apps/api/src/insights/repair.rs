//! JSON repair: recovers a JSON object from noisy model output.
//!
//! Stages, each tried before falling back to the next:
//! 1. clean (fences, curly quotes, comments)
//! 2. strict parse of the cleaned text
//! 3. brace-scan for the first balanced `{ ... }`
//! 4. strict parse of that slice, then JSON-ish preprocessing of the slice
//! 5. JSON-ish preprocessing of the whole cleaned text
//!
//! Preprocessed candidates that still fail get one more pass that quotes
//! single-quoted and bare-word value tokens.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("model returned non-JSON content")]
pub struct NonJsonContent;

// Compile-once regex patterns via OnceLock.
fn re_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```[a-z]*\n?").unwrap())
}

fn re_block_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").unwrap())
}

fn re_percent_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":\s*(-?\d+(?:\.\d+)?)\s*%").unwrap())
}

fn re_currency_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":\s*\$\s*([0-9]+(?:,[0-9]+)*(?:\.[0-9]+)?)").unwrap())
}

fn re_trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").unwrap())
}

fn re_bare_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([,{\s])([A-Za-z_][A-Za-z0-9_-]*)\s*:").unwrap())
}

fn re_single_quoted_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([\[,:{]\s*)'([^'"\\]*)'"#).unwrap())
}

fn re_bare_word_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(:\s*)([A-Za-z_][A-Za-z0-9_]*(?:[ -][A-Za-z0-9_]+)*)(\s*[,}\]\n])").unwrap()
    })
}

/// Turns raw model output into a JSON object, or `NonJsonContent` when no stage succeeds.
pub fn repair_to_object(raw: &str) -> Result<Map<String, Value>, NonJsonContent> {
    let cleaned = clean(raw);

    if let Some(object) = parse_object(&cleaned) {
        return Ok(object);
    }

    if let Some(slice) = extract_first_object(&cleaned) {
        if let Some(object) = parse_object(slice).or_else(|| parse_preprocessed(slice)) {
            return Ok(object);
        }
    }

    parse_preprocessed(&cleaned).ok_or(NonJsonContent)
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn parse_preprocessed(text: &str) -> Option<Map<String, Value>> {
    let preprocessed = preprocess_jsonish(text);
    parse_object(&preprocessed).or_else(|| parse_object(&relax_value_tokens(&preprocessed)))
}

/// Strips fences, curly quotes and comments. `//` comments are only removed when they
/// occupy the whole line, so URLs inside strings survive.
fn clean(raw: &str) -> String {
    let text = re_fence().replace_all(raw, "");
    let text = text
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let text = re_block_comment().replace_all(&text, "");
    text.lines()
        .map(|line| {
            if line.trim_start().starts_with("//") {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Returns the first balanced `{ ... }` span. Braces inside string literals,
/// including ones next to escaped quotes, do not count.
fn extract_first_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for (offset, byte) in input.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Applies `rewrite` to every span outside double-quoted string literals. Literals,
/// including their quotes and escapes, are copied through unchanged.
fn rewrite_outside_strings(text: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut span_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
                out.push_str(&text[span_start..=i]);
                span_start = i + 1;
            }
        } else if byte == b'"' {
            out.push_str(&rewrite(&text[span_start..i]));
            in_string = true;
            span_start = i;
        }
    }

    if in_string {
        out.push_str(&text[span_start..]);
    } else {
        out.push_str(&rewrite(&text[span_start..]));
    }
    out
}

/// Rewrites common JSON-ish model habits into strict JSON. Text inside string
/// literals is never touched.
fn preprocess_jsonish(text: &str) -> String {
    let text = rewrite_outside_strings(text, |span| {
        let span = re_percent_value().replace_all(span, r#": "${1}%""#);
        let span = re_currency_value().replace_all(&span, r#": "${1}""#);
        let span = re_trailing_comma().replace_all(&span, "${1}");
        re_bare_key()
            .replace_all(&span, r#"${1}"${2}":"#)
            .into_owned()
    });

    if !text.contains('"') && text.contains('\'') {
        text.replace('\'', "\"")
    } else {
        text
    }
}

/// Second tier: `['a', 'b']` → `["a", "b"]` and `: high,` → `: "high",`.
fn relax_value_tokens(text: &str) -> String {
    rewrite_outside_strings(text, |span| {
        let span = re_single_quoted_token().replace_all(span, r#"${1}"${2}""#);
        re_bare_word_value()
            .replace_all(&span, |caps: &Captures| {
                let word = &caps[2];
                if matches!(word, "true" | "false" | "null") {
                    caps[0].to_string()
                } else {
                    format!("{}\"{}\"{}", &caps[1], word, &caps[3])
                }
            })
            .into_owned()
    })
}
