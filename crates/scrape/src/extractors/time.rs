// ABOUTME: Temporal extractors TimeText and TimeAttribute.
// ABOUTME: Pipe a primitive read through the date parser; optional variants tolerate malformed dates.

use crate::error::ExtractError;
use crate::extractors::select::{AttributeExtractor, TextExtractor};
use crate::extractors::{Extract, ExtractionContext, ExtractorResult, Scope};
use crate::time_parse::parse_time;

/// Parses a raw string read by a primitive extractor.
///
/// Required reads turn "nothing usable" into `UnparseableDate`; optional
/// reads turn it into `Absent`.
fn to_time(raw: Option<String>, required: bool) -> Result<ExtractorResult, ExtractError> {
    let Some(raw) = raw else {
        return Ok(ExtractorResult::Absent);
    };
    match parse_time(&raw) {
        Ok(Some(t)) => Ok(ExtractorResult::Time(t)),
        Ok(None) if required => Err(ExtractError::UnparseableDate { input: raw }),
        Err(err) if required => Err(err),
        _ => {
            tracing::debug!(input = %raw, "ignoring unparseable optional date");
            Ok(ExtractorResult::Absent)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeTextExtractor {
    inner: TextExtractor,
}

impl TimeTextExtractor {
    pub fn new(selector: &str, required: bool) -> Result<Self, ExtractError> {
        Ok(Self {
            inner: TextExtractor::new(selector, required, false)?,
        })
    }
}

impl Extract for TimeTextExtractor {
    fn extract(
        &self,
        scope: Scope<'_>,
        _ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        to_time(self.inner.read(scope)?, self.inner.is_required())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAttributeExtractor {
    inner: AttributeExtractor,
}

impl TimeAttributeExtractor {
    pub fn new(selector: &str, attr: &str, required: bool) -> Result<Self, ExtractError> {
        Ok(Self {
            inner: AttributeExtractor::new(selector, attr, required)?,
        })
    }
}

impl Extract for TimeAttributeExtractor {
    fn extract(
        &self,
        scope: Scope<'_>,
        _ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        to_time(self.inner.read(scope)?, self.inner.is_required())
    }
}
