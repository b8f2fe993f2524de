//! The `@AGON rows` codec: a row-oriented text layout.
//!
//! Objects become `key: value` lines with two-space indentation for nesting.
//! Arrays pick the most compact of three sub-layouts:
//!
//! - inline for all-primitive arrays: `tags[3]: admin\tops\tdev`
//! - tabular for uniform object arrays: `users[2]{id\tname}` followed by one
//!   delimited row per element at the same indentation
//! - expanded list for everything else: `items[2]:` followed by `- ` items
//!
//! The delimiter defaults to TAB and can be overridden with a `@D=` modifier
//! line after the header. An unnamed `[N]...` header at the root decodes to
//! a bare array; a single non-field line decodes to a bare scalar.

use crate::error::{AgonError, Result};
use crate::value;
use serde_json::{Map, Value};

pub const HEADER: &str = "@AGON rows";

pub(crate) const DEFAULT_DELIMITER: char = '\t';

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a value as a complete self-describing rows payload (header, blank
/// line, body).
pub fn encode(value: &Value) -> String {
    encode_with_delimiter(value, DEFAULT_DELIMITER)
}

/// Encode with an explicit delimiter. A non-default delimiter is announced
/// with a `@D=` modifier line so the payload stays self-describing.
pub fn encode_with_delimiter(value: &Value, delimiter: char) -> String {
    let mut out = String::from(HEADER);
    if delimiter != DEFAULT_DELIMITER {
        out.push_str("\n@D=");
        out.push_str(&escape_delimiter(delimiter));
    }
    out.push_str("\n\n");
    out.push_str(&body(value, delimiter));
    out
}

/// Encode only the body (no header block). This is what the adaptive
/// selector stores in an [`crate::EncodingResult`], keeping the header
/// detached.
pub(crate) fn encode_body(value: &Value) -> String {
    body(value, DEFAULT_DELIMITER)
}

fn body(value: &Value, delimiter: char) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) => write_fields(map, 0, delimiter, &mut out),
        Value::Array(arr) => write_array_suffix(arr, 0, delimiter, &mut out),
        other => value::write_scalar(other, delimiter, &mut out),
    }
    out
}

/// Emit the fields of an object, one line each, at the given depth.
fn write_fields(map: &Map<String, Value>, depth: usize, delimiter: char, out: &mut String) {
    let indent = value::make_indent(depth);
    let mut first = true;
    for (key, val) in map {
        if !first {
            out.push('\n');
        }
        first = false;
        out.push_str(&indent);
        value::write_key(key, out);
        write_field_value(val, depth, delimiter, out);
    }
}

/// Emit whatever follows an already-written key: `: value` for scalars, a
/// `:` block for objects, or an array suffix.
fn write_field_value(val: &Value, depth: usize, delimiter: char, out: &mut String) {
    match val {
        Value::Object(map) if map.is_empty() => out.push(':'),
        Value::Object(map) => {
            out.push_str(":\n");
            write_fields(map, depth + 1, delimiter, out);
        }
        Value::Array(arr) => write_array_suffix(arr, depth, delimiter, out),
        other => {
            out.push_str(": ");
            value::write_scalar(other, delimiter, out);
        }
    }
}

/// Emit the `[N]...` suffix and body for an array. `depth` is the depth of
/// the line carrying the suffix; tabular body rows share that indentation.
fn write_array_suffix(arr: &[Value], depth: usize, delimiter: char, out: &mut String) {
    let n = arr.len();
    if arr.is_empty() {
        out.push_str("[0]:");
        return;
    }
    if let Some(columns) = value::uniform_columns(arr) {
        out.push('[');
        out.push_str(&n.to_string());
        out.push_str("]{");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            value::write_key(column, out);
        }
        out.push('}');
        let indent = value::make_indent(depth);
        for item in arr {
            out.push('\n');
            out.push_str(&indent);
            if let Value::Object(map) = item {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        out.push(delimiter);
                    }
                    if let Some(cell) = map.get(column) {
                        value::write_scalar(cell, delimiter, out);
                    }
                }
            }
        }
        return;
    }
    if value::all_primitives(arr) {
        out.push('[');
        out.push_str(&n.to_string());
        out.push_str("]: ");
        for (i, item) in arr.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            value::write_scalar(item, delimiter, out);
        }
        return;
    }
    out.push('[');
    out.push_str(&n.to_string());
    out.push_str("]:");
    write_list_items(arr, depth, delimiter, out);
}

/// Emit expanded list items. Markers sit one level below `depth`; an object
/// item puts its first field on the marker line and siblings at the content
/// column. An empty object item is the bare marker `-`.
fn write_list_items(arr: &[Value], depth: usize, delimiter: char, out: &mut String) {
    let marker_indent = value::make_indent(depth + 1);
    for item in arr {
        out.push('\n');
        out.push_str(&marker_indent);
        match item {
            Value::Object(map) if map.is_empty() => out.push('-'),
            Value::Object(map) => {
                out.push_str("- ");
                let mut first = true;
                for (key, val) in map {
                    if !first {
                        out.push('\n');
                        out.push_str(&marker_indent);
                        out.push_str("  ");
                    }
                    first = false;
                    value::write_key(key, out);
                    // Fields of a list item live at the content column, two
                    // levels below the list header.
                    write_field_value(val, depth + 2, delimiter, out);
                }
            }
            Value::Array(inner) => {
                out.push_str("- ");
                if value::all_primitives(inner) && !inner.is_empty() {
                    out.push('[');
                    out.push_str(&inner.len().to_string());
                    out.push_str("]: ");
                    for (i, v) in inner.iter().enumerate() {
                        if i > 0 {
                            out.push(delimiter);
                        }
                        value::write_scalar(v, delimiter, out);
                    }
                } else if inner.is_empty() {
                    out.push_str("[0]:");
                } else {
                    out.push('[');
                    out.push_str(&inner.len().to_string());
                    out.push_str("]:");
                    // Array items never use the tabular layout; a nested list
                    // keeps the grammar unambiguous after the marker.
                    write_list_items(inner, depth + 1, delimiter, out);
                }
            }
            other => {
                out.push_str("- ");
                value::write_scalar(other, delimiter, out);
            }
        }
    }
}

fn escape_delimiter(delimiter: char) -> String {
    match delimiter {
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        c => c.to_string(),
    }
}

pub(crate) fn parse_delimiter(spec: &str) -> char {
    match spec {
        "\\t" => '\t',
        "\\n" => '\n',
        other => other.chars().next().unwrap_or(DEFAULT_DELIMITER),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a rows payload. The `@AGON rows` header is required; use
/// [`crate::decode_as`] for headerless text with a known format.
pub fn decode(payload: &str) -> Result<Value> {
    decode_inner(payload, true)
}

/// Decode with an optional header (used by the format-directed path).
pub(crate) fn decode_lenient(payload: &str) -> Result<Value> {
    decode_inner(payload, false)
}

fn decode_inner(payload: &str, require_header: bool) -> Result<Value> {
    let text = payload.trim_start();
    if require_header && !text.starts_with(HEADER) {
        return Err(AgonError::InvalidPayload(if text.is_empty() {
            "Empty payload".to_string()
        } else {
            "Invalid header: expected @AGON rows".to_string()
        }));
    }
    let mut lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
    let mut delimiter = DEFAULT_DELIMITER;
    let mut start = 0;
    if lines.first().map(|l| l.trim_end()) == Some(HEADER) {
        start = 1;
    }
    while start < lines.len() {
        let line = lines[start].trim_end();
        if let Some(spec) = line.strip_prefix("@D=") {
            delimiter = parse_delimiter(spec);
            start += 1;
        } else if line.is_empty() {
            start += 1;
        } else {
            break;
        }
    }
    lines = lines.split_off(start);

    let parser = Parser { lines, delimiter };
    parser.parse_root()
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    delimiter: char,
}

/// One classified body line. `key` is `None` for unnamed root array headers.
enum Line {
    Scalar { key: String, token: String },
    Block { key: String },
    Inline { key: Option<String>, cells: String },
    Tabular { key: Option<String>, n: usize, columns: Vec<String> },
    ListHeader { key: Option<String>, n: usize },
    Plain,
}

impl<'a> Parser<'a> {
    fn parse_root(&self) -> Result<Value> {
        let mut first = None;
        for (i, line) in self.lines.iter().enumerate() {
            if !line.trim().is_empty() {
                first = Some(i);
                break;
            }
        }
        let Some(first) = first else {
            return Ok(Value::Object(Map::new()));
        };
        let content = self.lines[first].trim_start();

        // Unnamed array headers make the root a bare array.
        match self.classify(content)? {
            Line::Inline { key: None, cells } => {
                return Ok(Value::Array(self.parse_inline(&cells)?));
            }
            Line::Tabular { key: None, n, columns } => {
                let mut i = first + 1;
                return Ok(Value::Array(self.parse_tabular_rows(&mut i, 0, n, &columns)?));
            }
            Line::ListHeader { key: None, n } => {
                if n == 0 {
                    return Ok(Value::Array(vec![]));
                }
                let mut i = first + 1;
                return Ok(Value::Array(self.parse_list_items(&mut i, 2)?));
            }
            Line::Plain => {
                // A single non-field line is a bare scalar.
                return Ok(value::parse_scalar(content));
            }
            _ => {}
        }

        let mut i = first;
        let map = self.parse_block(&mut i, 0)?;
        Ok(Value::Object(map))
    }

    /// Parse consecutive field lines at exactly `indent` spaces into a map.
    fn parse_block(&self, i: &mut usize, indent: usize) -> Result<Map<String, Value>> {
        let mut map = Map::new();
        while *i < self.lines.len() {
            let line = self.lines[*i];
            if line.trim().is_empty() {
                *i += 1;
                continue;
            }
            let ind = value::count_indent(line);
            if ind < indent {
                break;
            }
            if ind > indent {
                // Leftover of a previous entry; tolerate and move on.
                *i += 1;
                continue;
            }
            let content = &line[ind..];
            self.parse_entry(content, &mut map, i, indent)?;
        }
        Ok(map)
    }

    /// Parse one field entry whose content line sits at `indent`, inserting
    /// into `map` and advancing `i` past everything the entry owns.
    fn parse_entry(
        &self,
        content: &str,
        map: &mut Map<String, Value>,
        i: &mut usize,
        indent: usize,
    ) -> Result<()> {
        match self.classify(content)? {
            Line::Scalar { key, token } => {
                map.insert(key, value::parse_scalar(&token));
                *i += 1;
            }
            Line::Block { key } => {
                *i += 1;
                let child = self.parse_block(i, indent + 2)?;
                map.insert(key, Value::Object(child));
            }
            Line::Inline { key: Some(key), cells } => {
                map.insert(key, Value::Array(self.parse_inline(&cells)?));
                *i += 1;
            }
            Line::Tabular { key: Some(key), n, columns } => {
                *i += 1;
                let rows = self.parse_tabular_rows(i, indent, n, &columns)?;
                map.insert(key, Value::Array(rows));
            }
            Line::ListHeader { key: Some(key), n } => {
                *i += 1;
                let items = if n == 0 {
                    vec![]
                } else {
                    self.parse_list_items(i, indent + 2)?
                };
                map.insert(key, Value::Array(items));
            }
            _ => {
                return Err(AgonError::InvalidPayload(format!(
                    "Unrecognized line {}: {content:?}",
                    *i + 1
                )));
            }
        }
        Ok(())
    }

    fn parse_inline(&self, cells: &str) -> Result<Vec<Value>> {
        let parsed = value::split_cells(cells, self.delimiter)?;
        Ok(parsed.into_iter().flatten().collect())
    }

    /// Consume up to `n` tabular body rows at `indent`. The count comes from
    /// the header, so body rows need no marker to tell them apart from the
    /// fields that follow.
    fn parse_tabular_rows(
        &self,
        i: &mut usize,
        indent: usize,
        n: usize,
        columns: &[String],
    ) -> Result<Vec<Value>> {
        let mut rows = Vec::with_capacity(n);
        while rows.len() < n && *i < self.lines.len() {
            let line = self.lines[*i];
            let ind = value::count_indent(line);
            if ind < indent && !line.trim().is_empty() {
                break;
            }
            let cells = value::split_cells(&line[ind.min(line.len())..], self.delimiter)?;
            let mut row = Map::new();
            for (column, cell) in columns.iter().zip(cells) {
                if let Some(cell) = cell {
                    row.insert(column.clone(), cell);
                }
            }
            rows.push(Value::Object(row));
            *i += 1;
        }
        Ok(rows)
    }

    /// Parse `- ` items at exactly `item_indent` spaces.
    fn parse_list_items(&self, i: &mut usize, item_indent: usize) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        while *i < self.lines.len() {
            let line = self.lines[*i];
            if line.trim().is_empty() {
                *i += 1;
                continue;
            }
            let ind = value::count_indent(line);
            if ind < item_indent {
                break;
            }
            if ind > item_indent {
                // Continuation of a previous item already consumed.
                *i += 1;
                continue;
            }
            let content = line[ind..].trim_end();
            if content == "-" {
                items.push(Value::Object(Map::new()));
                *i += 1;
                continue;
            }
            let Some(rest) = content.strip_prefix("- ") else {
                break;
            };
            items.push(self.parse_list_item(rest, i, item_indent + 2)?);
        }
        Ok(items)
    }

    /// Parse the content after a `- ` marker. `content_indent` is the column
    /// where continuation lines of this item appear.
    fn parse_list_item(&self, rest: &str, i: &mut usize, content_indent: usize) -> Result<Value> {
        // Nested array as a list item: `- [N]: ...` or `- [N]:`.
        if rest.starts_with('[') {
            match self.classify(rest)? {
                Line::Inline { key: None, cells } => {
                    *i += 1;
                    return Ok(Value::Array(self.parse_inline(&cells)?));
                }
                Line::ListHeader { key: None, n } => {
                    *i += 1;
                    let inner = if n == 0 {
                        vec![]
                    } else {
                        self.parse_list_items(i, content_indent)?
                    };
                    return Ok(Value::Array(inner));
                }
                Line::Tabular { key: None, n, columns } => {
                    *i += 1;
                    let rows = self.parse_tabular_rows(i, content_indent, n, &columns)?;
                    return Ok(Value::Array(rows));
                }
                _ => {}
            }
        }
        match self.classify(rest)? {
            Line::Plain => {
                *i += 1;
                Ok(value::parse_scalar(rest))
            }
            _ => {
                // Object item: first field on the marker line, siblings at
                // the content column.
                let mut map = Map::new();
                self.parse_entry(rest, &mut map, i, content_indent)?;
                while *i < self.lines.len() {
                    let line = self.lines[*i];
                    if line.trim().is_empty() {
                        *i += 1;
                        continue;
                    }
                    let ind = value::count_indent(line);
                    if ind != content_indent {
                        break;
                    }
                    let content = &line[ind..];
                    if matches!(self.classify(content)?, Line::Plain) {
                        break;
                    }
                    self.parse_entry(content, &mut map, i, content_indent)?;
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Classify a trimmed content line into one of the grammar's line forms.
    fn classify(&self, content: &str) -> Result<Line> {
        let content = content.trim_end_matches(' ');
        let (key, rest) = self.split_key(content)?;
        if let Some(after) = rest.strip_prefix('[') {
            if let Some(end) = after.find(']') {
                if let Ok(n) = after[..end].parse::<usize>() {
                    let tail = &after[end + 1..];
                    if let Some(cols) = tail.strip_prefix('{') {
                        if let Some(close) = cols.rfind('}') {
                            let columns = self.parse_columns(&cols[..close])?;
                            return Ok(Line::Tabular { key, n, columns });
                        }
                    }
                    if let Some(cells) = tail.strip_prefix(": ") {
                        return Ok(Line::Inline { key, cells: cells.to_string() });
                    }
                    if tail == ":" || tail == ": " {
                        return Ok(Line::ListHeader { key, n });
                    }
                }
            }
            return Ok(Line::Plain);
        }
        let Some(key) = key else {
            return Ok(Line::Plain);
        };
        if rest == ":" {
            return Ok(Line::Block { key });
        }
        if let Some(token) = rest.strip_prefix(": ") {
            return Ok(Line::Scalar { key, token: token.to_string() });
        }
        Ok(Line::Plain)
    }

    /// Split a content line into its key (possibly quoted, possibly absent)
    /// and the remainder. Unquoted keys must match the bare-key grammar.
    fn split_key<'b>(&self, content: &'b str) -> Result<(Option<String>, &'b str)> {
        if content.starts_with('"') {
            let Some(end) = value::find_closing_quote(content, 1) else {
                return Ok((None, content));
            };
            let key = value::unescape(&content[1..end]);
            return Ok((Some(key), &content[end + 1..]));
        }
        let stop = content
            .find(|c| c == ':' || c == '[')
            .unwrap_or(content.len());
        let key = &content[..stop];
        if key.is_empty() {
            return Ok((None, content));
        }
        if !value::is_bare_key(key) {
            // A bare token that cannot be a key (for example a root scalar
            // string containing a colon).
            return Ok((None, content));
        }
        Ok((Some(key.to_string()), &content[stop..]))
    }

    fn parse_columns(&self, spec: &str) -> Result<Vec<String>> {
        let cells = value::split_cells(spec, self.delimiter)?;
        Ok(cells
            .into_iter()
            .flatten()
            .map(|c| match c {
                Value::String(s) => s,
                other => other.to_string().trim_matches('"').to_string(),
            })
            .collect())
    }
}
