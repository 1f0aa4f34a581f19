//! Permissive parsing of embedded JSON-LD blocks.
//!
//! Publisher markup is frequently invalid JSON. Strict parsing is tried first,
//! then a fixed list of repaired variants, each also read as a stream of
//! back-to-back values.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

static COMMENT_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?://\s*)?<!--\s*|\s*(?://\s*)?-->\s*$").unwrap());
static CDATA_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?://\s*)?<!\[CDATA\[\s*|\s*(?://\s*)?\]\]>\s*$").unwrap());
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Parse a raw script body into zero or more JSON values
pub fn parse_json_payloads(raw: &str) -> Vec<Value> {
    let base = raw.trim().replace('\u{feff}', "");
    let base = COMMENT_WRAPPER.replace_all(&base, "");
    let base = CDATA_WRAPPER.replace_all(&base, "").trim().to_string();
    if base.is_empty() {
        return Vec::new();
    }

    let escaped = escape_control_chars_in_strings(&base);
    let mut variants = vec![base.clone(), escaped.clone()];
    variants.push(remove_trailing_commas(&base));
    variants.push(remove_trailing_commas(&escaped));
    variants.push(insert_missing_commas(&remove_trailing_commas(&escaped)));

    let mut seen = HashSet::new();
    for (index, variant) in variants.iter().enumerate() {
        if !seen.insert(variant.as_str()) {
            continue;
        }

        if let Ok(value) = serde_json::from_str::<Value>(variant) {
            if index > 0 {
                debug!("JSON repair: variant {} parsed", index);
            }
            return vec![value];
        }

        let values = decode_concatenated(variant);
        if !values.is_empty() {
            debug!(
                "JSON repair: variant {} parsed as {} concatenated values",
                index,
                values.len()
            );
            return values;
        }
    }

    debug!("JSON repair: giving up on block of {} bytes", raw.len());
    Vec::new()
}

/// Read back-to-back JSON values (`{...}{...}`); any error discards the whole stream
fn decode_concatenated(raw: &str) -> Vec<Value> {
    let stream = serde_json::Deserializer::from_str(raw).into_iter::<Value>();
    let mut values = Vec::new();
    for item in stream {
        match item {
            Ok(value) => values.push(value),
            Err(_) => return Vec::new(),
        }
    }
    values
}

fn remove_trailing_commas(raw: &str) -> String {
    TRAILING_COMMA.replace_all(raw, "$1").into_owned()
}

/// Escape raw newlines, carriage returns and tabs that appear inside string literals
pub fn escape_control_chars_in_strings(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in raw.chars() {
        if !in_string {
            out.push(ch);
            if ch == '"' {
                in_string = true;
                escaped = false;
            }
            continue;
        }

        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => {
                out.push(ch);
                escaped = true;
            }
            '"' => {
                out.push(ch);
                in_string = false;
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Insert commas between adjacent values inside containers (`"a" "b"`, `} {`)
fn insert_missing_commas(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut depth: i32 = 0;

    let next_significant = |from: usize| chars[from..].iter().copied().find(|c| !c.is_whitespace());

    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                if depth > 0 && matches!(next_significant(i + 1), Some('"' | '{' | '[')) {
                    out.push(',');
                }
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth > 0 && matches!(next_significant(i + 1), Some('"' | '{' | '[')) {
                    out.push(',');
                }
            }
            _ => {}
        }
    }
    out
}
