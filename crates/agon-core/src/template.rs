//! The `@AGON struct` codec: template factorization for repeated object
//! shapes.
//!
//! Payloads such as market quotes carry the same small object shape (for
//! example `{fmt, raw}`) dozens of times. This codec fingerprints object
//! shapes by their sorted key set, declares each shape that occurs at least
//! twice as a named template, and rewrites every occurrence as a positional
//! reference:
//!
//! ```text
//! @FR: fmt, raw
//!
//! price @FR("100.00", 100.0)
//! change @FR("+5.00", 5.0)
//! ```
//!
//! The template tag is derived from the sorted key set (uppercased first
//! alphanumeric of each key, `T`-prefixed when it would not start with a
//! letter, with numeric suffixes on collisions), so encoding is
//! deterministic. Only shapes whose values are all primitive are candidates;
//! everything else falls back to the rows-style layout with a TAB delimiter.

use crate::error::{AgonError, Result};
use crate::value;
use serde_json::{Map, Value};

pub const HEADER: &str = "@AGON struct";

/// Delimiter for rows-style parts of the body (inline arrays).
const BODY_DELIMITER: char = '\t';

/// Delimiter between template arguments.
const ARG_DELIMITER: char = ',';

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Template {
    tag: String,
    /// Sorted key tuple; arguments are written and read in this order.
    keys: Vec<String>,
}

/// The sorted key set of an object whose values are all primitive, or `None`
/// when the object cannot be expressed positionally.
fn shape_of(val: &Value) -> Option<Vec<String>> {
    let map = val.as_object()?;
    if map.is_empty() || !map.values().all(value::is_primitive) {
        return None;
    }
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    Some(keys)
}

/// Count shape occurrences at every value position (object field values and
/// array elements). The root value itself has no position and is never
/// rewritten, so it is not counted.
fn collect_shapes(val: &Value, shapes: &mut Vec<(Vec<String>, usize)>) {
    match val {
        Value::Object(map) => {
            for child in map.values() {
                note_position(child, shapes);
            }
        }
        Value::Array(arr) => {
            for child in arr {
                note_position(child, shapes);
            }
        }
        _ => {}
    }
}

fn note_position(val: &Value, shapes: &mut Vec<(Vec<String>, usize)>) {
    if let Some(shape) = shape_of(val) {
        match shapes.iter_mut().find(|(s, _)| *s == shape) {
            Some((_, count)) => *count += 1,
            None => shapes.push((shape, 1)),
        }
    }
    collect_shapes(val, shapes);
}

/// Derive the deterministic tag for a sorted key tuple, disambiguating
/// against already-assigned tags with a numeric suffix.
fn tag_for(keys: &[String], taken: &[Template]) -> String {
    let mut tag: String = keys
        .iter()
        .map(|k| {
            k.chars()
                .find(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or('X')
        })
        .collect();
    if !tag.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false) {
        tag.insert(0, 'T');
    }
    if !taken.iter().any(|t| t.tag == tag) {
        return tag;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{tag}{suffix}");
        if !taken.iter().any(|t| t.tag == candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

fn build_templates(root: &Value) -> Vec<Template> {
    let mut shapes = Vec::new();
    collect_shapes(root, &mut shapes);
    let mut templates: Vec<Template> = Vec::new();
    for (keys, count) in shapes {
        if count >= 2 {
            let tag = tag_for(&keys, &templates);
            templates.push(Template { tag, keys });
        }
    }
    templates
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a value as a complete self-describing struct payload.
pub fn encode(val: &Value) -> String {
    let mut out = String::from(HEADER);
    out.push_str("\n\n");
    out.push_str(&encode_body(val));
    out
}

/// Encode only the body: template preamble, blank line, rows-style body with
/// positional references.
pub(crate) fn encode_body(val: &Value) -> String {
    let templates = build_templates(val);
    let mut out = String::new();
    if !templates.is_empty() {
        for template in &templates {
            out.push('@');
            out.push_str(&template.tag);
            out.push_str(": ");
            for (i, key) in template.keys.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                value::write_key(key, &mut out);
            }
            out.push('\n');
        }
        out.push('\n');
    }
    match val {
        Value::Object(map) => write_fields(map, 0, &templates, &mut out),
        Value::Array(arr) => write_array_suffix(arr, 0, &templates, &mut out),
        other => value::write_scalar(other, BODY_DELIMITER, &mut out),
    }
    out
}

fn template_for<'t>(val: &Value, templates: &'t [Template]) -> Option<&'t Template> {
    let shape = shape_of(val)?;
    templates.iter().find(|t| t.keys == shape)
}

/// Write a positional reference `@TAG(v1, v2)` for an object matching a
/// template. Arguments follow the template's sorted key order.
fn write_reference(map: &Map<String, Value>, template: &Template, out: &mut String) {
    out.push('@');
    out.push_str(&template.tag);
    out.push('(');
    for (i, key) in template.keys.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if let Some(arg) = map.get(key) {
            write_argument(arg, out);
        }
    }
    out.push(')');
}

/// Arguments use the comma delimiter, with parentheses as extra quoting
/// triggers so the closing parenthesis stays unambiguous.
fn write_argument(arg: &Value, out: &mut String) {
    match arg {
        Value::String(s) => {
            if value::needs_quoting(s, ARG_DELIMITER) || s.contains('(') || s.contains(')') {
                value::write_quoted(s, out);
            } else {
                out.push_str(s);
            }
        }
        other => value::write_scalar(other, ARG_DELIMITER, out),
    }
}

fn write_fields(map: &Map<String, Value>, depth: usize, templates: &[Template], out: &mut String) {
    let indent = value::make_indent(depth);
    let mut first = true;
    for (key, val) in map {
        if !first {
            out.push('\n');
        }
        first = false;
        out.push_str(&indent);
        value::write_key(key, out);
        write_field_value(val, depth, templates, out);
    }
}

fn write_field_value(val: &Value, depth: usize, templates: &[Template], out: &mut String) {
    if let Value::Object(map) = val {
        if let Some(template) = template_for(val, templates) {
            out.push(' ');
            write_reference(map, template, out);
            return;
        }
    }
    match val {
        Value::Object(map) if map.is_empty() => out.push(':'),
        Value::Object(map) => {
            out.push_str(":\n");
            write_fields(map, depth + 1, templates, out);
        }
        Value::Array(arr) => write_array_suffix(arr, depth, templates, out),
        other => {
            out.push_str(": ");
            value::write_scalar(other, BODY_DELIMITER, out);
        }
    }
}

/// Arrays in the struct body: inline for primitives, `- ` items otherwise.
/// Object items that match a template become `- @TAG(...)` references, so
/// uniform arrays factor through the template table instead of a tabular
/// block.
fn write_array_suffix(arr: &[Value], depth: usize, templates: &[Template], out: &mut String) {
    let n = arr.len();
    if arr.is_empty() {
        out.push_str("[0]:");
        return;
    }
    if value::all_primitives(arr) {
        out.push('[');
        out.push_str(&n.to_string());
        out.push_str("]: ");
        for (i, item) in arr.iter().enumerate() {
            if i > 0 {
                out.push(BODY_DELIMITER);
            }
            value::write_scalar(item, BODY_DELIMITER, out);
        }
        return;
    }
    out.push('[');
    out.push_str(&n.to_string());
    out.push_str("]:");
    write_list_items(arr, depth, templates, out);
}

fn write_list_items(arr: &[Value], depth: usize, templates: &[Template], out: &mut String) {
    let marker_indent = value::make_indent(depth + 1);
    for item in arr {
        out.push('\n');
        out.push_str(&marker_indent);
        if let Value::Object(map) = item {
            if let Some(template) = template_for(item, templates) {
                out.push_str("- ");
                write_reference(map, template, out);
                continue;
            }
        }
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
                    write_field_value(val, depth + 2, templates, out);
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
                    for (i, v) in inner.iter().enumerate() {
                        if i > 0 {
                            out.push(BODY_DELIMITER);
                        }
                        value::write_scalar(v, BODY_DELIMITER, out);
                    }
                } else {
                    out.push('[');
                    out.push_str(&inner.len().to_string());
                    out.push_str("]:");
                    write_list_items(inner, depth + 1, templates, out);
                }
            }
            other => {
                out.push_str("- ");
                value::write_scalar(other, BODY_DELIMITER, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a struct payload. The `@AGON struct` header is required; use
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
            "Invalid header: expected @AGON struct".to_string()
        }));
    }
    let mut lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
    let mut start = 0;
    if lines.first().map(|l| l.trim_end()) == Some(HEADER) {
        start = 1;
    }

    // Preamble: template declarations, possibly interleaved with blank lines
    // (with_header() output separates the header from the preamble).
    let mut templates: Vec<Template> = Vec::new();
    while start < lines.len() {
        let line = lines[start].trim_end();
        if line.is_empty() {
            start += 1;
            continue;
        }
        if let Some((tag, keys)) = parse_declaration(line) {
            templates.push(Template { tag, keys });
            start += 1;
            continue;
        }
        if line.starts_with("@D=") {
            // Accepted for header-block symmetry; the struct body keeps its
            // fixed delimiters.
            start += 1;
            continue;
        }
        break;
    }
    lines = lines.split_off(start);

    let parser = Parser { lines, templates };
    parser.parse_root()
}

/// Parse one `@TAG: k1, k2` declaration line.
fn parse_declaration(line: &str) -> Option<(String, Vec<String>)> {
    let rest = line.strip_prefix('@')?;
    let colon = rest.find(": ")?;
    let tag = &rest[..colon];
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return None;
    }
    let keys = value::split_cells(&rest[colon + 2..], ARG_DELIMITER)
        .ok()?
        .into_iter()
        .flatten()
        .map(|c| match c {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();
    Some((tag.to_string(), keys))
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    templates: Vec<Template>,
}

enum Line {
    Scalar { key: String, token: String },
    Block { key: String },
    Inline { key: Option<String>, cells: String },
    ListHeader { key: Option<String>, n: usize },
    Reference { key: Option<String>, tag: String, args: String },
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
            Line::Reference { key: Some(key), tag, args } => {
                map.insert(key, self.resolve_reference(&tag, &args, *i)?);
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

    /// Rebuild the object for a `@TAG(args)` reference, pairing argument
    /// cells with the template's key order.
    fn resolve_reference(&self, tag: &str, args: &str, line: usize) -> Result<Value> {
        let Some(template) = self.templates.iter().find(|t| t.tag == tag) else {
            return Err(AgonError::InvalidPayload(format!(
                "Unknown template @{tag} at line {}",
                line + 1
            )));
        };
        let cells = value::split_cells(args, ARG_DELIMITER)?;
        let mut map = Map::new();
        for (key, cell) in template.keys.iter().zip(cells) {
            if let Some(cell) = cell {
                map.insert(key.clone(), cell);
            }
        }
        Ok(Value::Object(map))
    }

    fn parse_inline(&self, cells: &str) -> Result<Vec<Value>> {
        let parsed = value::split_cells(cells, BODY_DELIMITER)?;
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
        // A bare `@TAG(...)` reference as a list item.
        if let Some((tag, args)) = parse_reference(rest) {
            *i += 1;
            return self.resolve_reference(&tag, &args, *i - 1);
        }
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
        // References bind tighter than the key grammar: `key @TAG(args)` has
        // no colon before the tag.
        if let Some((key, tag, args)) = split_field_reference(content) {
            return Ok(Line::Reference { key, tag, args });
        }
        let (key, rest) = split_key(content);
        if let Some(after) = rest.strip_prefix('[') {
            if let Some(end) = after.find(']') {
                if let Ok(n) = after[..end].parse::<usize>() {
                    let tail = &after[end + 1..];
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
}

/// Match a bare `@TAG(args)` reference, returning the tag and the raw
/// argument text.
fn parse_reference(content: &str) -> Option<(String, String)> {
    let rest = content.strip_prefix('@')?;
    let open = rest.find('(')?;
    let tag = &rest[..open];
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return None;
    }
    let args = rest[open + 1..].strip_suffix(')')?;
    Some((tag.to_string(), args.to_string()))
}

/// Match a field-level reference `key @TAG(args)` (key possibly quoted).
fn split_field_reference(content: &str) -> Option<(Option<String>, String, String)> {
    let (key, rest) = split_key(content);
    let key = key?;
    let rest = rest.strip_prefix(' ')?;
    let (tag, args) = parse_reference(rest)?;
    Some((Some(key), tag, args))
}

/// Key splitting for the struct grammar: quoted keys, or a bare key ending
/// at `:`, `[`, or a space (the space form introduces a reference).
fn split_key(content: &str) -> (Option<String>, &str) {
    if content.starts_with('"') {
        let Some(end) = value::find_closing_quote(content, 1) else {
            return (None, content);
        };
        let key = value::unescape(&content[1..end]);
        return (Some(key), &content[end + 1..]);
    }
    let stop = content
        .find(|c| c == ':' || c == '[' || c == ' ')
        .unwrap_or(content.len());
    let key = &content[..stop];
    if key.is_empty() || !value::is_bare_key(key) {
        return (None, content);
    }
    (Some(key.to_string()), &content[stop..])
}
