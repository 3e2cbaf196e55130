// ABOUTME: Composite extractors Structured and StructuredList.
// ABOUTME: Scope a set of field extractors to the element(s) matching a selector and collect their results.

use scraper::ElementRef;

use crate::error::ExtractError;
use crate::extractors::compiled::CssSelector;
use crate::extractors::{Extract, ExtractionContext, Extractor, ExtractorResult, FieldMap, Scope};
use crate::merge::merge_fields;

/// One entry of a structured extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// Stores the extractor's result under `name`.
    Named { name: String, extractor: Extractor },
    /// Runs a nested structured extractor and merges its fields into the parent map.
    Inline(Extractor),
}

impl FieldSpec {
    pub fn named(name: impl Into<String>, extractor: Extractor) -> Self {
        FieldSpec::Named {
            name: name.into(),
            extractor,
        }
    }
}

/// Shared implementation of `Structured` and `StructuredList`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredExtractor {
    selector: CssSelector,
    fields: Vec<FieldSpec>,
}

impl StructuredExtractor {
    pub fn new(selector: &str, fields: Vec<FieldSpec>) -> Result<Self, ExtractError> {
        let selector = CssSelector::parse(selector)?;
        if fields.is_empty() {
            return Err(ExtractError::invalid_spec(format!(
                "no fields for '{}'",
                selector.as_str()
            )));
        }
        Ok(Self { selector, fields })
    }

    pub fn selector(&self) -> &str {
        self.selector.as_str()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Structured: exactly one element must match.
    pub fn extract_one(
        &self,
        scope: Scope<'_>,
        ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        let matches = self.matches(scope)?;
        if matches.len() > 1 {
            return Err(ExtractError::ambiguous(self.selector.as_str(), matches.len()));
        }
        let fields = self.extract_fields(matches[0], ctx)?;
        Ok(ExtractorResult::Struct(fields))
    }

    /// StructuredList: one map per matching element, in document order.
    pub fn extract_list(
        &self,
        scope: Scope<'_>,
        ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        let matches = self.matches(scope)?;
        let mut items = Vec::with_capacity(matches.len());
        for el in matches {
            items.push(self.extract_fields(el, ctx)?);
        }
        Ok(ExtractorResult::StructList(items))
    }

    fn matches<'a>(&self, scope: Scope<'a>) -> Result<Vec<ElementRef<'a>>, ExtractError> {
        let matches = scope.select(self.selector.selector());
        if matches.is_empty() {
            return Err(ExtractError::not_found(self.selector.as_str()));
        }
        Ok(matches)
    }

    fn extract_fields(
        &self,
        el: ElementRef<'_>,
        ctx: &ExtractionContext,
    ) -> Result<FieldMap, ExtractError> {
        let scope = Scope::Element(el);
        let mut out = FieldMap::new();
        for spec in &self.fields {
            match spec {
                FieldSpec::Named { name, extractor } => {
                    let value = extractor
                        .extract(scope, ctx)
                        .map_err(|e| e.within(self.selector.as_str()))?;
                    out.insert(name.clone(), value);
                }
                FieldSpec::Inline(extractor) => {
                    let nested = extractor
                        .extract(scope, ctx)
                        .and_then(|v| v.into_struct(self.selector.as_str()))
                        .map_err(|e| e.within(self.selector.as_str()))?;
                    merge_fields(&mut out, nested);
                }
            }
        }
        Ok(out)
    }
}
