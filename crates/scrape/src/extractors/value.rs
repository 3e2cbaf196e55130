// ABOUTME: ExtractorResult, the tagged union every extractor returns.
// ABOUTME: Covers absent, text, text lists, timestamps, images, structured maps and lists of maps.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::article::ArticleImage;
use crate::error::ExtractError;
use crate::time_parse::Timestamp;

/// Field name to result map produced by structured extractors.
pub type FieldMap = BTreeMap<String, ExtractorResult>;

/// The value produced by one extractor call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum ExtractorResult {
    #[default]
    Absent,
    Text(String),
    TextList(Vec<String>),
    Time(Timestamp),
    Images(Vec<ArticleImage>),
    Struct(FieldMap),
    StructList(Vec<FieldMap>),
}

impl ExtractorResult {
    pub fn is_absent(&self) -> bool {
        matches!(self, ExtractorResult::Absent)
    }

    /// Absent, or a value carrying nothing (blank text, empty list/map).
    pub fn is_empty(&self) -> bool {
        match self {
            ExtractorResult::Absent => true,
            ExtractorResult::Text(s) => s.is_empty(),
            ExtractorResult::TextList(v) => v.is_empty(),
            ExtractorResult::Time(_) => false,
            ExtractorResult::Images(v) => v.is_empty(),
            ExtractorResult::Struct(m) => m.is_empty(),
            ExtractorResult::StructList(v) => v.is_empty(),
        }
    }

    /// Shape name used in `TypeMismatch` errors.
    pub fn shape(&self) -> &'static str {
        match self {
            ExtractorResult::Absent => "absent",
            ExtractorResult::Text(_) => "string",
            ExtractorResult::TextList(_) => "string list",
            ExtractorResult::Time(_) => "time",
            ExtractorResult::Images(_) => "image list",
            ExtractorResult::Struct(_) => "structured map",
            ExtractorResult::StructList(_) => "structured list",
        }
    }

    /// Returns the text or `None` when absent; any other shape is a mismatch.
    pub fn as_text(&self, field: &str) -> Result<Option<&str>, ExtractError> {
        match self {
            ExtractorResult::Absent => Ok(None),
            ExtractorResult::Text(s) => Ok(Some(s.as_str())),
            other => Err(other.mismatch(field, "string")),
        }
    }

    /// Returns the timestamp or `None` when absent. Text is run through the date parser.
    pub fn as_time(&self, field: &str) -> Result<Option<Timestamp>, ExtractError> {
        match self {
            ExtractorResult::Absent => Ok(None),
            ExtractorResult::Time(t) => Ok(Some(*t)),
            ExtractorResult::Text(s) => crate::time_parse::parse_time(s),
            other => Err(other.mismatch(field, "time")),
        }
    }

    pub fn into_struct(self, field: &str) -> Result<FieldMap, ExtractError> {
        match self {
            ExtractorResult::Struct(m) => Ok(m),
            ExtractorResult::Absent => Ok(FieldMap::new()),
            other => Err(other.mismatch(field, "structured map")),
        }
    }

    pub fn mismatch(&self, field: &str, expected: &'static str) -> ExtractError {
        ExtractError::TypeMismatch {
            field: field.to_string(),
            expected,
            found: self.shape(),
        }
    }
}

impl From<String> for ExtractorResult {
    fn from(s: String) -> Self {
        ExtractorResult::Text(s)
    }
}

impl From<Option<Timestamp>> for ExtractorResult {
    fn from(t: Option<Timestamp>) -> Self {
        t.map(ExtractorResult::Time).unwrap_or_default()
    }
}

impl From<FieldMap> for ExtractorResult {
    fn from(m: FieldMap) -> Self {
        ExtractorResult::Struct(m)
    }
}
