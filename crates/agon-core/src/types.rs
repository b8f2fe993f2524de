//! Format tags and the encoding result container.

use crate::error::{AgonError, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The concrete AGON wire formats. `Json` is the baseline the adaptive
/// selector measures the others against.
///
/// The declaration order doubles as the selector's tie-break order: on equal
/// cost the earlier format wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Format {
    Json,
    Rows,
    Columns,
    Struct,
}

impl Format {
    /// All formats in selector order.
    pub const ALL: [Format; 4] = [Format::Json, Format::Rows, Format::Columns, Format::Struct];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Rows => "rows",
            Format::Columns => "columns",
            Format::Struct => "struct",
        }
    }

    /// The `@AGON ...` header line for self-describing payloads. Raw JSON
    /// carries no header.
    pub fn header(&self) -> Option<&'static str> {
        match self {
            Format::Json => None,
            Format::Rows => Some(crate::rows::HEADER),
            Format::Columns => Some(crate::columns::HEADER),
            Format::Struct => Some(crate::template::HEADER),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = AgonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Format::Json),
            "rows" => Ok(Format::Rows),
            "columns" => Ok(Format::Columns),
            "struct" => Ok(Format::Struct),
            other => Err(AgonError::InvalidPayload(format!("Unknown format: {other}"))),
        }
    }
}

/// The result of an encode call: the chosen format, the encoded body, and
/// the detached `@AGON ...` header (absent for raw JSON).
///
/// `text` never includes the header; [`EncodingResult::with_header`] joins
/// the two with a blank line to produce a payload the auto-detecting
/// [`crate::decode`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingResult {
    pub format: Format,
    pub text: String,
    pub header: Option<String>,
}

impl EncodingResult {
    pub(crate) fn new(format: Format, text: String) -> Self {
        EncodingResult {
            format,
            text,
            header: format.header().map(str::to_string),
        }
    }

    /// Byte length of the encoded body.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The body prefixed by `header + "\n\n"` when a header is present,
    /// otherwise the body alone. The result decodes via prefix detection.
    pub fn with_header(&self) -> String {
        match &self.header {
            Some(header) => format!("{header}\n\n{}", self.text),
            None => self.text.clone(),
        }
    }

    /// Decode this result back into a value using its own format tag, so no
    /// header is required on the text.
    pub fn decode(&self) -> Result<Value> {
        crate::decode::decode_as(&self.text, self.format)
    }

    /// A short prescriptive instruction telling a model how to answer in the
    /// same format. Useful as a one-line suffix on prompts that expect the
    /// model to emit AGON back.
    pub fn hint(&self) -> &'static str {
        match self.format {
            Format::Json => "Return standard JSON with the same structure as the input.",
            Format::Rows => {
                "Return in AGON rows format. Start with the @AGON rows header and a blank line. \
                 Write objects as `key: value` lines, arrays of uniform objects as \
                 name[N]{fields} followed by one tab-delimited row per line, and other arrays \
                 as name[N]: with `- ` items."
            }
            Format::Columns => {
                "Return in AGON columns format. Start with the @AGON columns header and a \
                 blank line. Write arrays of uniform objects column-major as name[N] with one \
                 ├/└ line per column, e.g. `├ col: v1, v2, v3`."
            }
            Format::Struct => {
                "Return in AGON struct format. Start with the @AGON struct header and a blank \
                 line. Declare each repeated object shape once as @TAG: key1, key2 and then \
                 reference it positionally as `key @TAG(v1, v2)`."
            }
        }
    }
}

impl fmt::Display for EncodingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
