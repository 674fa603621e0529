//! Minimal reader for java-style property files.
//!
//! Fixture projects under test conventionally dump their observable state
//! into `.properties` files, which expectations then compare field by field.
//! Only the commonly used subset of the format is handled: `#`/`!` comments,
//! `=` and `:` separators, escaped separators in keys, and trailing-backslash
//! line continuations.

use std::collections::HashMap;

/// Parses property-file text into a key/value map.
///
/// Later occurrences of a key overwrite earlier ones, matching the behavior
/// of the format's reference implementation.
pub fn parse(text: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    let mut logical = String::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        if let Some(stripped) = continuation(line) {
            logical.push_str(stripped);
            continue;
        }

        logical.push_str(line);
        if let Some((key, value)) = split_pair(&logical) {
            props.insert(key, value);
        }
        logical.clear();
    }

    props
}

/// Returns the line body when it ends in an unescaped continuation backslash.
fn continuation(line: &str) -> Option<&str> {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    if trailing % 2 == 1 {
        Some(&line[..line.len() - 1])
    } else {
        None
    }
}

fn split_pair(line: &str) -> Option<(String, String)> {
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '\\' => escaped = !escaped,
            '=' | ':' if !escaped => {
                let key = unescape(line[..idx].trim());
                let value = line[idx + ch.len_utf8()..].trim().to_string();
                return Some((key, value));
            }
            _ => escaped = false,
        }
    }

    // A bare key with no separator maps to the empty string.
    let key = line.trim();
    if key.is_empty() {
        None
    } else {
        Some((unescape(key), String::new()))
    }
}

fn unescape(key: &str) -> String {
    key.replace("\\=", "=").replace("\\:", ":")
}
