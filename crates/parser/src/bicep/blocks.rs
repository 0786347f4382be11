//! Brace matching and `key: value` body parsing for Bicep text
//!
//! There is no grammar here. Block bounds come from a plain character depth
//! counter that does not know about string literals or comments, so a brace
//! inside a quoted value can end a block early.

use infra_discovery_common::{ConfigMap, ConfigValue};
use regex::Regex;
use std::sync::OnceLock;

fn key_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*|'[^']*')\s*:\s*(.*)$")
            .expect("key/value pattern is valid")
    })
}

/// Byte range `(open, close)` of the first `{ ... }` block at or after
/// `from`, where `open` and `close` index the braces themselves.
///
/// Returns `None` when no brace follows or the block never closes.
pub fn find_block(text: &str, from: usize) -> Option<(usize, usize)> {
    find_matching(text, from, b'{', b'}')
}

/// Same as [`find_block`] for `[ ... ]`
pub fn find_list(text: &str, from: usize) -> Option<(usize, usize)> {
    find_matching(text, from, b'[', b']')
}

fn find_matching(text: &str, from: usize, open: u8, close: u8) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = from + bytes.get(from..)?.iter().position(|&b| b == open)?;

    let mut depth = 0usize;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some((start, start + offset));
            }
        }
    }
    None
}

/// Parse the inside of an object block (text between the braces)
pub fn parse_object(body: &str) -> ConfigMap {
    let mut lines = body.lines();
    read_object(&mut lines)
}

/// Parse the inside of a multi-line array (text between the brackets)
pub fn parse_list(body: &str) -> Vec<ConfigValue> {
    let mut lines = body.lines();
    read_list(&mut lines)
}

fn read_object<'a>(lines: &mut impl Iterator<Item = &'a str>) -> ConfigMap {
    let mut map = ConfigMap::new();
    while let Some(line) = lines.next() {
        let line = strip_comment(line.trim());
        if line.is_empty() {
            continue;
        }
        if line.starts_with('}') {
            break;
        }

        let Some(captures) = key_value_regex().captures(line) else {
            // Anything else opening a region (e.g. a loop body) is skipped whole
            skip_region(line, lines);
            continue;
        };
        let key = captures[1].trim_matches('\'').to_string();
        let value = read_value(captures[2].trim(), lines);
        map.insert(key, value);
    }
    map
}

fn read_list<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Vec<ConfigValue> {
    let mut items = Vec::new();
    while let Some(line) = lines.next() {
        let line = strip_comment(line.trim());
        if line.is_empty() {
            continue;
        }
        if line.starts_with(']') {
            break;
        }
        items.push(read_value(line, lines));
    }
    items
}

fn read_value<'a>(raw: &str, lines: &mut impl Iterator<Item = &'a str>) -> ConfigValue {
    match raw {
        "{" => ConfigValue::Map(read_object(lines)),
        "[" => ConfigValue::List(read_list(lines)),
        _ => parse_scalar(raw),
    }
}

fn skip_region<'a>(line: &str, lines: &mut impl Iterator<Item = &'a str>) {
    let mut depth = bracket_balance(line);
    while depth > 0 {
        match lines.next() {
            Some(next) => depth += bracket_balance(next),
            None => break,
        }
    }
}

fn bracket_balance(line: &str) -> i32 {
    line.chars().fold(0, |depth, c| match c {
        '{' | '[' => depth + 1,
        '}' | ']' => depth - 1,
        _ => depth,
    })
}

/// Drop a trailing `//` comment that is outside single quotes
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quoted = false;
    for (idx, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => quoted = !quoted,
            b'/' if !quoted && bytes.get(idx + 1) == Some(&b'/') => {
                return line[..idx].trim_end();
            },
            _ => {},
        }
    }
    line
}

/// Type a single-line value: quoted strings lose their quotes, booleans,
/// `null` and integers are typed, inline `[a, b]` arrays are split and
/// anything else (expressions, references) is kept as text
pub fn parse_scalar(raw: &str) -> ConfigValue {
    let raw = raw.trim();
    match raw {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        "null" => return ConfigValue::Null,
        "{}" => return ConfigValue::Map(ConfigMap::new()),
        "[]" => return ConfigValue::List(Vec::new()),
        _ => {},
    }

    if raw.starts_with('\'') {
        return ConfigValue::String(raw.trim_matches('\'').to_string());
    }
    if let Ok(number) = raw.parse::<i64>() {
        return ConfigValue::Integer(number);
    }
    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let items = if inner.contains(',') {
            inner.split(',').map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>()
        } else {
            inner.split_whitespace().collect()
        };
        return ConfigValue::List(items.into_iter().map(parse_scalar).collect());
    }
    ConfigValue::String(raw.to_string())
}
