// ABOUTME: Extractor module: the Extract capability, the closed Extractor enum and its scopes.
// ABOUTME: Re-exports primitive, temporal, composite, metadata and date-fallback extractors plus the DSL loader.

pub mod compiled;
pub mod fallback;
pub mod loader;
pub mod metadata;
pub mod select;
pub mod structured;
pub mod time;
pub mod value;

use std::time::Instant;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ExtractError;
use crate::merge::merge_fields;

pub use self::compiled::CssSelector;
pub use self::fallback::DateFallback;
pub use self::metadata::MetadataExtractor;
pub use self::select::{AttributeExtractor, ImagesExtractor, TextExtractor};
pub use self::structured::{FieldSpec, StructuredExtractor};
pub use self::time::{TimeAttributeExtractor, TimeTextExtractor};
pub use self::value::{ExtractorResult, FieldMap};

/// The node an extractor runs against: a whole document or one element subtree.
#[derive(Clone, Copy)]
pub enum Scope<'a> {
    Document(&'a Html),
    Element(ElementRef<'a>),
}

impl<'a> Scope<'a> {
    /// Elements matching `selector` below this scope, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<ElementRef<'a>> {
        match self {
            Scope::Document(doc) => doc.select(selector).collect(),
            Scope::Element(el) => el.select(selector).collect(),
        }
    }

    /// The element at the top of this scope (`<html>` for documents).
    pub fn root(&self) -> ElementRef<'a> {
        match self {
            Scope::Document(doc) => doc.root_element(),
            Scope::Element(el) => *el,
        }
    }
}

impl<'a> From<&'a Html> for Scope<'a> {
    fn from(doc: &'a Html) -> Self {
        Scope::Document(doc)
    }
}

impl<'a> From<ElementRef<'a>> for Scope<'a> {
    fn from(el: ElementRef<'a>) -> Self {
        Scope::Element(el)
    }
}

/// Immutable per-call context.
///
/// The deadline is carried for extractors that might perform I/O; none of the
/// built-in extractors do.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub url: String,
    pub content_type: Option<String>,
    pub deadline: Option<Instant>,
}

impl ExtractionContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The source URL, when it parses as an absolute URL.
    pub fn base_url(&self) -> Option<Url> {
        Url::parse(&self.url).ok()
    }
}

/// The capability shared by every extractor variant.
pub trait Extract {
    fn extract(
        &self,
        scope: Scope<'_>,
        ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError>;
}

/// The closed set of extractor variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Extractor {
    Text(TextExtractor),
    Attribute(AttributeExtractor),
    Images(ImagesExtractor),
    TimeText(TimeTextExtractor),
    TimeAttribute(TimeAttributeExtractor),
    Structured(StructuredExtractor),
    StructuredList(StructuredExtractor),
    Metadata(MetadataExtractor),
    DateFallback(DateFallback),
    Combined(Vec<Extractor>),
}

impl Extract for Extractor {
    fn extract(
        &self,
        scope: Scope<'_>,
        ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        match self {
            Extractor::Text(e) => e.extract(scope, ctx),
            Extractor::Attribute(e) => e.extract(scope, ctx),
            Extractor::Images(e) => e.extract(scope, ctx),
            Extractor::TimeText(e) => e.extract(scope, ctx),
            Extractor::TimeAttribute(e) => e.extract(scope, ctx),
            Extractor::Structured(e) => e.extract_one(scope, ctx),
            Extractor::StructuredList(e) => e.extract_list(scope, ctx),
            Extractor::Metadata(e) => e.extract(scope, ctx),
            Extractor::DateFallback(e) => e.extract(scope, ctx),
            Extractor::Combined(parts) => extract_combined(parts, scope, ctx),
        }
    }
}

/// Runs each part in order and folds their structured results, last one winning.
fn extract_combined(
    parts: &[Extractor],
    scope: Scope<'_>,
    ctx: &ExtractionContext,
) -> Result<ExtractorResult, ExtractError> {
    let mut merged = FieldMap::new();
    for part in parts {
        let fields = part.extract(scope, ctx)?.into_struct("combined")?;
        merge_fields(&mut merged, fields);
    }
    Ok(ExtractorResult::Struct(merged))
}

impl Extractor {
    /// Required single text read.
    pub fn text(selector: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::Text(TextExtractor::new(selector, true, false)?))
    }

    /// Optional single text read.
    pub fn opt_text(selector: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::Text(TextExtractor::new(selector, false, false)?))
    }

    /// Required multi-element text read.
    pub fn texts(selector: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::Text(TextExtractor::new(selector, true, true)?))
    }

    pub fn attribute(selector: &str, attr: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::Attribute(AttributeExtractor::new(
            selector, attr, true,
        )?))
    }

    pub fn opt_attribute(selector: &str, attr: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::Attribute(AttributeExtractor::new(
            selector, attr, false,
        )?))
    }

    pub fn images(selector: &str, attr: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::Images(ImagesExtractor::new(selector, attr)?))
    }

    pub fn time_text(selector: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::TimeText(TimeTextExtractor::new(selector, true)?))
    }

    pub fn opt_time_text(selector: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::TimeText(TimeTextExtractor::new(selector, false)?))
    }

    pub fn time_attribute(selector: &str, attr: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::TimeAttribute(TimeAttributeExtractor::new(
            selector, attr, true,
        )?))
    }

    pub fn opt_time_attribute(selector: &str, attr: &str) -> Result<Self, ExtractError> {
        Ok(Extractor::TimeAttribute(TimeAttributeExtractor::new(
            selector, attr, false,
        )?))
    }

    /// Narrows to exactly one element matching `selector` and runs `fields` there.
    pub fn structured<I, K>(selector: &str, fields: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = (K, Extractor)>,
        K: Into<String>,
    {
        Ok(Extractor::Structured(StructuredExtractor::new(
            selector,
            named(fields),
        )?))
    }

    /// Runs `fields` once per element matching `selector`.
    pub fn structured_list<I, K>(selector: &str, fields: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = (K, Extractor)>,
        K: Into<String>,
    {
        Ok(Extractor::StructuredList(StructuredExtractor::new(
            selector,
            named(fields),
        )?))
    }

    /// The generic OpenGraph/oEmbed/head metadata extractor.
    pub fn metadata() -> Self {
        Extractor::Metadata(MetadataExtractor::default())
    }

    /// Wraps `inner` with the publish-date fallback chain.
    pub fn date_fallback(inner: Extractor) -> Self {
        Extractor::DateFallback(DateFallback::new(inner))
    }

    /// Metadata followed by the date fallback chain; the default article baseline.
    pub fn default_article() -> Self {
        Self::date_fallback(Self::metadata())
    }

    pub fn combined(parts: Vec<Extractor>) -> Self {
        Extractor::Combined(parts)
    }
}

fn named<I, K>(fields: I) -> Vec<FieldSpec>
where
    I: IntoIterator<Item = (K, Extractor)>,
    K: Into<String>,
{
    fields
        .into_iter()
        .map(|(name, extractor)| FieldSpec::named(name, extractor))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_combined_last_wins() {
        let e = Extractor::combined(vec![
            Extractor::structured("html", [("title", Extractor::text("h1").unwrap())]).unwrap(),
            Extractor::structured("html", [("title", Extractor::text("h2").unwrap())]).unwrap(),
        ]);
        let result = run(&e, "<h1>First</h1><h2>Second</h2>").unwrap();
        let mut expected = FieldMap::new();
        expected.insert("title".into(), text("Second"));
        assert_eq!(result, ExtractorResult::Struct(expected));
    }

    #[test]
    fn test_combined_rejects_scalar_parts() {
        let e = Extractor::combined(vec![Extractor::text("h1").unwrap()]);
        let err = run(&e, "<h1>x</h1>").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_element_scope_only_sees_descendants() {
        let d = doc("<p>outside</p><div id='box'><p>inside</p></div>");
        let sel = CssSelector::parse("#box").unwrap();
        let boxed = Scope::Document(&d).select(sel.selector())[0];
        let e = Extractor::text("p").unwrap();
        let result = e
            .extract(Scope::Element(boxed), &ExtractionContext::default())
            .unwrap();
        assert_eq!(result, text("inside"));
    }

    #[test]
    fn test_context_base_url() {
        assert!(ExtractionContext::new("not a url").base_url().is_none());
        assert_eq!(
            ExtractionContext::new("https://www.gov.br/a")
                .base_url()
                .map(|u| u.host_str().map(String::from)),
            Some(Some("www.gov.br".to_string()))
        );
    }
}
