//! The `@AGON columns` codec: a column-oriented text layout.
//!
//! Objects and mixed arrays read like the rows layout, but arrays of uniform
//! objects are printed column-major as a small tree, which groups repeated
//! values together and tokenizes well for wide tables:
//!
//! ```text
//! users[3]
//! ├ id: 1, 2, 3
//! ├ name: Alice, Bob, Carol
//! └ email: alice@example.com, , carol@example.com
//! ```
//!
//! The in-column delimiter defaults to a comma (joined as `", "`) and can be
//! overridden with `@D=`; a tab delimiter joins with a bare tab. Tree glyphs
//! are Unicode `├`/`└` by default, or ASCII `|`/`` ` `` with
//! [`ColumnsOptions::use_ascii`]; the decoder accepts both. An empty cell
//! position marks a missing key, and trailing missing cells may be absent.

use crate::error::{AgonError, Result};
use crate::rows::parse_delimiter;
use crate::value;
use serde_json::{Map, Value};

pub const HEADER: &str = "@AGON columns";

pub(crate) const DEFAULT_DELIMITER: char = ',';

/// Encoder knobs for the columns layout.
#[derive(Debug, Clone)]
pub struct ColumnsOptions {
    /// In-column cell delimiter.
    pub delimiter: char,
    /// Emit `|` and `` ` `` instead of `├` and `└`.
    pub use_ascii: bool,
}

impl Default for ColumnsOptions {
    fn default() -> Self {
        ColumnsOptions {
            delimiter: DEFAULT_DELIMITER,
            use_ascii: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a value as a complete self-describing columns payload.
pub fn encode(value: &Value) -> String {
    encode_with(value, &ColumnsOptions::default())
}

/// Encode with explicit options. A non-default delimiter is announced with a
/// `@D=` modifier line.
pub fn encode_with(value: &Value, options: &ColumnsOptions) -> String {
    let mut out = String::from(HEADER);
    if options.delimiter != DEFAULT_DELIMITER {
        out.push_str("\n@D=");
        out.push_str(&match options.delimiter {
            '\t' => "\\t".to_string(),
            '\n' => "\\n".to_string(),
            c => c.to_string(),
        });
    }
    out.push_str("\n\n");
    out.push_str(&body(value, options));
    out
}

/// Encode only the body, for the adaptive selector's detached-header result.
pub(crate) fn encode_body(value: &Value) -> String {
    body(value, &ColumnsOptions::default())
}

fn body(value: &Value, options: &ColumnsOptions) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) => write_fields(map, 0, options, &mut out),
        Value::Array(arr) => write_array_suffix(arr, 0, options, &mut out),
        other => value::write_scalar(other, options.delimiter, &mut out),
    }
    out
}

/// The string that joins cells within a column: `", "` for the comma
/// default, the bare delimiter otherwise.
fn joiner(delimiter: char) -> String {
    if delimiter == ',' {
        ", ".to_string()
    } else {
        delimiter.to_string()
    }
}

fn write_fields(map: &Map<String, Value>, depth: usize, options: &ColumnsOptions, out: &mut String) {
    let indent = value::make_indent(depth);
    let mut first = true;
    for (key, val) in map {
        if !first {
            out.push('\n');
        }
        first = false;
        out.push_str(&indent);
        value::write_key(key, out);
        write_field_value(val, depth, options, out);
    }
}

fn write_field_value(val: &Value, depth: usize, options: &ColumnsOptions, out: &mut String) {
    match val {
        Value::Object(map) if map.is_empty() => out.push(':'),
        Value::Object(map) => {
            out.push_str(":\n");
            write_fields(map, depth + 1, options, out);
        }
        Value::Array(arr) => write_array_suffix(arr, depth, options, out),
        other => {
            out.push_str(": ");
            value::write_scalar(other, options.delimiter, out);
        }
    }
}

/// Emit the array suffix after an already-written name (or at the root with
/// no name): a columnar tree for uniform object arrays, an inline cell list
/// for primitive arrays, and `- ` items otherwise.
fn write_array_suffix(arr: &[Value], depth: usize, options: &ColumnsOptions, out: &mut String) {
    let n = arr.len();
    if arr.is_empty() {
        out.push_str("[0]:");
        return;
    }
    if let Some(columns) = value::uniform_columns(arr) {
        out.push('[');
        out.push_str(&n.to_string());
        out.push(']');
        let indent = value::make_indent(depth);
        let sep = joiner(options.delimiter);
        for (c, column) in columns.iter().enumerate() {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(glyph(c + 1 == columns.len(), options.use_ascii));
            out.push(' ');
            value::write_key(column, out);
            out.push_str(": ");
            for (r, item) in arr.iter().enumerate() {
                if r > 0 {
                    out.push_str(&sep);
                }
                if let Some(cell) = item.as_object().and_then(|m| m.get(column)) {
                    value::write_scalar(cell, options.delimiter, out);
                }
            }
        }
        return;
    }
    if value::all_primitives(arr) {
        out.push('[');
        out.push_str(&n.to_string());
        out.push_str("]: ");
        let sep = joiner(options.delimiter);
        for (i, item) in arr.iter().enumerate() {
            if i > 0 {
                out.push_str(&sep);
            }
            value::write_scalar(item, options.delimiter, out);
        }
        return;
    }
    out.push('[');
    out.push_str(&n.to_string());
    out.push_str("]:");
    write_list_items(arr, depth, options, out);
}

fn write_list_items(arr: &[Value], depth: usize, options: &ColumnsOptions, out: &mut String) {
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
                    write_field_value(val, depth + 2, options, out);
                }
            }
            Value::Array(inner) => {
                out.push_str("- ");
                if inner.is_empty() {
                    out.push_str("[0]:");
                } else if value::all_primitives(inner) {
                    out.push('[');
                    out.push_str(&inner.len().to_string());
                    out.push_str("]: ");
                    let sep = joiner(options.delimiter);
                    for (i, v) in inner.iter().enumerate() {
                        if i > 0 {
                            out.push_str(&sep);
                        }
                        value::write_scalar(v, options.delimiter, out);
                    }
                } else {
                    out.push('[');
                    out.push_str(&inner.len().to_string());
                    out.push_str("]:");
                    write_list_items(inner, depth + 1, options, out);
                }
            }
            other => {
                out.push_str("- ");
                value::write_scalar(other, options.delimiter, out);
            }
        }
    }
}

fn glyph(last: bool, ascii: bool) -> &'static str {
    match (last, ascii) {
        (false, false) => "├",
        (true, false) => "└",
        (false, true) => "|",
        (true, true) => "`",
    }
}

/// True when a content line starts with any of the four tree glyphs followed
/// by a space.
fn strip_glyph(content: &str) -> Option<&str> {
    for g in ["├ ", "└ ", "| ", "` "] {
        if let Some(rest) = content.strip_prefix(g) {
            return Some(rest);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a columns payload. The `@AGON columns` header is required; use
/// [`crate::decode_as`] for headerless text with a known format.
pub fn decode(payload: &str) -> Result<Value> {
    decode_inner(payload, true)
}

pub(crate) fn decode_lenient(payload: &str) -> Result<Value> {
    decode_inner(payload, false)
}

fn decode_inner(payload: &str, require_header: bool) -> Result<Value> {
    let text = payload.trim_start();
    if require_header && !text.starts_with(HEADER) {
        return Err(AgonError::InvalidPayload(if text.is_empty() {
            "Empty payload".to_string()
        } else {
            "Invalid header: expected @AGON columns".to_string()
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

enum Line {
    Scalar { key: String, token: String },
    Block { key: String },
    Inline { key: Option<String>, cells: String },
    /// `name[N]` with nothing after the bracket: a columnar tree follows.
    Columnar { key: Option<String>, n: usize },
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

        match self.classify(content)? {
            Line::Inline { key: None, cells } => {
                return Ok(Value::Array(self.parse_inline(&cells)?));
            }
            Line::Columnar { key: None, n } => {
                let mut i = first + 1;
                return Ok(Value::Array(self.parse_columnar(&mut i, 0, n)?));
            }
            Line::ListHeader { key: None, n } => {
                if n == 0 {
                    return Ok(Value::Array(vec![]));
                }
                let mut i = first + 1;
                return Ok(Value::Array(self.parse_list_items(&mut i, 2)?));
            }
            Line::Plain => {
                return Ok(value::parse_scalar(content));
            }
            _ => {}
        }

        let mut i = first;
        let map = self.parse_block(&mut i, 0)?;
        Ok(Value::Object(map))
    }

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
                *i += 1;
                continue;
            }
            let content = &line[ind..];
            self.parse_entry(content, &mut map, i, indent)?;
        }
        Ok(map)
    }

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
            Line::Columnar { key: Some(key), n } => {
                *i += 1;
                let rows = self.parse_columnar(i, indent, n)?;
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

    /// Read the glyph lines of a columnar block and rebuild the N row
    /// objects, keeping the column order. Missing cells (empty positions, or
    /// columns shorter than N) simply omit the key.
    fn parse_columnar(&self, i: &mut usize, indent: usize, n: usize) -> Result<Vec<Value>> {
        let mut columns: Vec<(String, Vec<Option<Value>>)> = Vec::new();
        while *i < self.lines.len() {
            let line = self.lines[*i];
            if line.trim().is_empty() {
                *i += 1;
                continue;
            }
            let ind = value::count_indent(line);
            if ind != indent {
                break;
            }
            let Some(rest) = strip_glyph(&line[ind..]) else {
                break;
            };
            let (key, tail) = self.split_key(rest)?;
            let Some(key) = key else {
                return Err(AgonError::InvalidPayload(format!(
                    "Malformed column line {}: {rest:?}",
                    *i + 1
                )));
            };
            let cells = match tail.strip_prefix(": ") {
                Some(cells) => value::split_cells(cells, self.delimiter)?,
                None if tail.trim_end() == ":" => Vec::new(),
                None => {
                    return Err(AgonError::InvalidPayload(format!(
                        "Malformed column line {}: {rest:?}",
                        *i + 1
                    )));
                }
            };
            columns.push((key, cells));
            *i += 1;
        }
        let mut rows = Vec::with_capacity(n);
        for r in 0..n {
            let mut row = Map::new();
            for (key, cells) in &columns {
                if let Some(Some(cell)) = cells.get(r) {
                    row.insert(key.clone(), cell.clone());
                }
            }
            rows.push(Value::Object(row));
        }
        Ok(rows)
    }

    fn parse_inline(&self, cells: &str) -> Result<Vec<Value>> {
        let parsed = value::split_cells(cells, self.delimiter)?;
        Ok(parsed.into_iter().flatten().collect())
    }

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
                *i += 1;
                continue;
            }
            let content = line[ind..].trim_end_matches(' ');
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

    fn parse_list_item(&self, rest: &str, i: &mut usize, content_indent: usize) -> Result<Value> {
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
                Line::Columnar { key: None, n } => {
                    *i += 1;
                    let rows = self.parse_columnar(i, content_indent, n)?;
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

    fn classify(&self, content: &str) -> Result<Line> {
        let content = content.trim_end_matches(' ');
        let (key, rest) = self.split_key(content)?;
        if let Some(after) = rest.strip_prefix('[') {
            if let Some(end) = after.find(']') {
                if let Ok(n) = after[..end].parse::<usize>() {
                    let tail = &after[end + 1..];
                    if tail.is_empty() {
                        return Ok(Line::Columnar { key, n });
                    }
                    if let Some(cells) = tail.strip_prefix(": ") {
                        return Ok(Line::Inline { key, cells: cells.to_string() });
                    }
                    if tail == ":" {
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
        if key.is_empty() || !value::is_bare_key(key) {
            return Ok((None, content));
        }
        Ok((Some(key.to_string()), &content[stop..]))
    }
}
