//! Shared scalar grammar for the AGON text formats.
//!
//! Every non-JSON format (rows, columns, struct) emits and parses scalars the
//! same way; only the active delimiter differs. This module owns that shared
//! grammar: scalar formatting, the quoting predicate, escape handling, key
//! emission, delimiter-aware cell splitting, and the tabular-array detector.
//!
//! The value model itself is `serde_json::Value` built with the
//! `preserve_order` feature, so object key order is the insertion order of
//! the source document.

use crate::error::{AgonError, Result};
use serde_json::Value;

/// Characters that force quoting when they appear as the first character of
/// an unquoted string. Each is a line-dispatch or cell-dispatch marker in at
/// least one format.
const RESERVED_LEADERS: &[char] = &['@', '-', '[', '{', '"', '#', ':', ','];

/// Append a scalar value in AGON text form. `delimiter` is the active cell
/// delimiter of the surrounding context and participates in the quoting
/// decision for strings.
pub(crate) fn write_scalar(value: &Value, delimiter: char, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(s) => write_string(s, delimiter, out),
        // Containers never reach the scalar writer; the codecs dispatch them
        // to their own layouts first.
        Value::Array(_) | Value::Object(_) => out.push_str("null"),
    }
}

/// Format a JSON number:
/// - integers as plain decimal
/// - whole-valued floats with a forced `.0` so they decode back as floats
/// - other finite floats via `Display` (shortest round-trip decimal)
/// - non-finite values as `null`
fn format_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => {
            if f.fract() == 0.0 {
                format!("{f:.1}")
            } else {
                format!("{f}")
            }
        }
        _ => "null".to_string(),
    }
}

/// Append a string value, quoting only when the grammar requires it.
pub(crate) fn write_string(s: &str, delimiter: char, out: &mut String) {
    if needs_quoting(s, delimiter) {
        write_quoted(s, out);
    } else {
        out.push_str(s);
    }
}

/// Append a string in quoted form, escaping `\`, `"`, tab, newline, and
/// carriage return.
pub(crate) fn write_quoted(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

/// The quoting predicate. A string must be quoted iff:
/// - it is empty, or starts or ends with ASCII whitespace
/// - it contains the active delimiter, a newline, carriage return, or `"`
/// - its first character is one of the reserved line/cell markers
/// - it lexes as a number, boolean, or `null`
pub(crate) fn needs_quoting(s: &str, delimiter: char) -> bool {
    if s.is_empty() {
        return true;
    }
    let first = match s.chars().next() {
        Some(c) => c,
        None => return true,
    };
    let last = s.chars().next_back().unwrap_or(first);
    if first.is_ascii_whitespace() || last.is_ascii_whitespace() {
        return true;
    }
    if s.contains(delimiter) || s.contains('\n') || s.contains('\r') || s.contains('"') {
        return true;
    }
    if RESERVED_LEADERS.contains(&first) {
        return true;
    }
    if matches!(s, "true" | "false" | "null") || looks_numeric(s) {
        return true;
    }
    // Strings that would classify as structure where bare tokens are legal
    // (list items, root scalars) must be quoted to round-trip.
    lexes_as_field(s) || lexes_as_array_header(s) || lexes_as_reference(s)
}

/// Would this string parse as a `key:` / `key: value` field line?
fn lexes_as_field(s: &str) -> bool {
    let Some(pos) = s.find(':') else {
        return false;
    };
    is_bare_key(&s[..pos]) && (pos + 1 == s.len() || s.as_bytes()[pos + 1] == b' ')
}

/// Would this string parse as a `name[N]` / `name[N]:` / `name[N]{...}`
/// array header?
fn lexes_as_array_header(s: &str) -> bool {
    let Some(open) = s.find('[') else {
        return false;
    };
    let prefix = &s[..open];
    if !prefix.is_empty() && !is_bare_key(prefix) {
        return false;
    }
    let rest = &s[open + 1..];
    let Some(close) = rest.find(']') else {
        return false;
    };
    let digits = &rest[..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let tail = &rest[close + 1..];
    tail.is_empty() || tail.starts_with(':') || tail.starts_with('{')
}

/// Would this string parse as a `key @TAG(...)` template reference?
fn lexes_as_reference(s: &str) -> bool {
    let Some(space) = s.find(' ') else {
        return false;
    };
    if !is_bare_key(&s[..space]) {
        return false;
    }
    let rest = &s[space + 1..];
    let Some(body) = rest.strip_prefix('@') else {
        return false;
    };
    if !rest.ends_with(')') {
        return false;
    }
    let Some(open) = body.find('(') else {
        return false;
    };
    let tag = &body[..open];
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Strict numeric probe shared by the quoting predicate and the decoder: an
/// optional `-`, digits with at most one `.` and one exponent, including
/// leading-zero forms like `05`. Deliberately narrower than `f64::from_str`
/// (which would also accept `inf` and `NaN`).
pub(crate) fn looks_numeric(s: &str) -> bool {
    let rest = s.strip_prefix('-').unwrap_or(s);
    if rest.is_empty() {
        return false;
    }
    let mut has_dot = false;
    let mut has_exp = false;
    for (i, b) in rest.bytes().enumerate() {
        match b {
            b'0'..=b'9' => {}
            b'.' if !has_dot && !has_exp => has_dot = true,
            b'e' | b'E' if !has_exp && i > 0 => has_exp = true,
            b'+' | b'-' if has_exp => {}
            _ => return false,
        }
    }
    rest.bytes().any(|b| b.is_ascii_digit())
}

/// Parse a single scalar token (quoted or unquoted) into a JSON value.
///
/// Probe order mirrors the quoting predicate: quoted string, `null`, booleans,
/// numbers, then plain string. Anything the encoder would have quoted can
/// therefore be interpreted by its unquoted shape.
pub(crate) fn parse_scalar(token: &str) -> Value {
    let s = token.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        return Value::String(unescape(&s[1..s.len() - 1]));
    }
    match s {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if looks_numeric(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Ok(u) = s.parse::<u64>() {
            return Value::Number(u.into());
        }
        if let Ok(f) = s.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(s.to_string())
}

/// Decode the escape sequences produced by [`write_quoted`]. Unknown escapes
/// pass through with their backslash intact.
pub(crate) fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Find the byte position of the closing quote, skipping escaped characters.
/// `start` is the position just after the opening quote.
pub(crate) fn find_closing_quote(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Append an object key. Keys matching `^[A-Za-z_][A-Za-z0-9_.]*$` are
/// emitted bare; all others are quoted with the usual escapes.
pub(crate) fn write_key(key: &str, out: &mut String) {
    if is_bare_key(key) {
        out.push_str(key);
    } else {
        write_quoted(key, out);
    }
}

/// Test whether a key can be emitted without quotes.
pub(crate) fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Split a delimited cell list into values. `None` marks a missing cell (an
/// empty unquoted position), which is distinct from the quoted empty string.
///
/// A single space directly after each delimiter occurrence is accepted and
/// stripped, so `a, b` and `a,b` read the same under a comma delimiter.
pub(crate) fn split_cells(s: &str, delimiter: char) -> Result<Vec<Option<Value>>> {
    debug_assert!(delimiter.is_ascii());
    let d = delimiter as u8;
    let bytes = s.as_bytes();
    let n = bytes.len();
    let mut cells = Vec::new();
    if n == 0 {
        return Ok(cells);
    }
    let mut i = 0;
    loop {
        if i < n && bytes[i] == b'"' {
            let end = find_closing_quote(s, i + 1).ok_or_else(|| {
                AgonError::InvalidPayload(format!("Unterminated quoted cell in {s:?}"))
            })?;
            cells.push(Some(Value::String(unescape(&s[i + 1..end]))));
            i = end + 1;
            while i < n && bytes[i] != d {
                i += 1;
            }
        } else {
            let mut j = i;
            while j < n && bytes[j] != d {
                j += 1;
            }
            let token = s[i..j].trim();
            if token.is_empty() {
                cells.push(None);
            } else {
                cells.push(Some(parse_scalar(token)));
            }
            i = j;
        }
        if i >= n {
            break;
        }
        // Consume the delimiter and at most one padding space after it.
        i += 1;
        if i < n && bytes[i] == b' ' && d != b' ' {
            i += 1;
        }
        if i >= n {
            cells.push(None);
            break;
        }
    }
    Ok(cells)
}

/// True for values the scalar writer can emit directly.
pub(crate) fn is_primitive(value: &Value) -> bool {
    !value.is_object() && !value.is_array()
}

/// True when every element of the array is a primitive.
pub(crate) fn all_primitives(arr: &[Value]) -> bool {
    arr.iter().all(is_primitive)
}

/// Detect a tabular array: every element is an object with the same key set
/// and only primitive values. Returns the column order (insertion order of
/// the first element) or `None` when the array must fall back to the list
/// layout.
pub(crate) fn uniform_columns(arr: &[Value]) -> Option<Vec<String>> {
    let first = arr.first()?.as_object()?;
    if first.is_empty() {
        return None;
    }
    let columns: Vec<String> = first.keys().cloned().collect();
    if !first.values().all(is_primitive) {
        return None;
    }
    for item in &arr[1..] {
        let obj = item.as_object()?;
        if obj.len() != columns.len() {
            return None;
        }
        for column in &columns {
            if !obj.get(column).map(is_primitive).unwrap_or(false) {
                return None;
            }
        }
    }
    Some(columns)
}

/// Count the leading spaces of a line. Only spaces count as indentation;
/// a leading tab is cell content (a missing first cell in a tabular row).
pub(crate) fn count_indent(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ').count()
}

/// Two-space-per-level indentation string.
pub(crate) fn make_indent(depth: usize) -> String {
    "  ".repeat(depth)
}
