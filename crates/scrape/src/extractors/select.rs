// ABOUTME: Primitive extractors: Text, Attribute and Images.
// ABOUTME: Enforce the required/optional and single/multiple cardinality contracts over a selector.

use scraper::ElementRef;

use crate::article::ArticleImage;
use crate::error::ExtractError;
use crate::extractors::compiled::CssSelector;
use crate::extractors::{Extract, ExtractionContext, ExtractorResult, Scope};

/// Trimmed text content of an element and all its descendants.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Finds the single element for a non-multiple read.
///
/// `Ok(None)` only for an optional read with zero matches.
fn single<'a>(
    selector: &CssSelector,
    scope: Scope<'a>,
    required: bool,
) -> Result<Option<ElementRef<'a>>, ExtractError> {
    let matches = scope.select(selector.selector());
    match matches.len() {
        0 if required => Err(ExtractError::not_found(selector.as_str())),
        0 => Ok(None),
        1 => Ok(matches.into_iter().next()),
        n => Err(ExtractError::ambiguous(selector.as_str(), n)),
    }
}

/// Reads the text content of the element(s) matching a selector.
#[derive(Debug, Clone, PartialEq)]
pub struct TextExtractor {
    selector: CssSelector,
    required: bool,
    multiple: bool,
}

impl TextExtractor {
    pub fn new(selector: &str, required: bool, multiple: bool) -> Result<Self, ExtractError> {
        Ok(Self {
            selector: CssSelector::parse(selector)?,
            required,
            multiple,
        })
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The text of the single match, or `None` when an optional read found nothing.
    pub(crate) fn read(&self, scope: Scope<'_>) -> Result<Option<String>, ExtractError> {
        let Some(el) = single(&self.selector, scope, self.required)? else {
            return Ok(None);
        };
        let text = element_text(&el);
        if !text.is_empty() {
            Ok(Some(text))
        } else if self.required {
            Err(ExtractError::EmptyValue {
                selector: self.selector.as_str().to_string(),
            })
        } else {
            Ok(None)
        }
    }
}

impl Extract for TextExtractor {
    fn extract(
        &self,
        scope: Scope<'_>,
        _ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        if !self.multiple {
            return Ok(self.read(scope)?.map(ExtractorResult::Text).unwrap_or_default());
        }

        let matches = scope.select(self.selector.selector());
        if matches.is_empty() {
            if self.required {
                return Err(ExtractError::not_found(self.selector.as_str()));
            }
            return Ok(ExtractorResult::Absent);
        }
        Ok(ExtractorResult::TextList(
            matches.iter().map(element_text).collect(),
        ))
    }
}

/// Reads a named attribute of the single element matching a selector.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeExtractor {
    selector: CssSelector,
    attr: String,
    required: bool,
}

impl AttributeExtractor {
    pub fn new(selector: &str, attr: &str, required: bool) -> Result<Self, ExtractError> {
        let attr = attr.trim();
        if attr.is_empty() {
            return Err(ExtractError::invalid_spec("empty attribute name"));
        }
        Ok(Self {
            selector: CssSelector::parse(selector)?,
            attr: attr.to_string(),
            required,
        })
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The trimmed attribute value, or `None` when an optional read found nothing.
    pub(crate) fn read(&self, scope: Scope<'_>) -> Result<Option<String>, ExtractError> {
        let Some(el) = single(&self.selector, scope, self.required)? else {
            return Ok(None);
        };
        match el.value().attr(&self.attr).map(str::trim) {
            Some(v) if !v.is_empty() => Ok(Some(v.to_string())),
            Some(_) if self.required => Err(ExtractError::EmptyValue {
                selector: self.selector.as_str().to_string(),
            }),
            None if self.required => Err(ExtractError::AttributeMissing {
                selector: self.selector.as_str().to_string(),
                attr: self.attr.clone(),
            }),
            _ => Ok(None),
        }
    }
}

impl Extract for AttributeExtractor {
    fn extract(
        &self,
        scope: Scope<'_>,
        _ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        Ok(self.read(scope)?.map(ExtractorResult::Text).unwrap_or_default())
    }
}

/// Collects every element matching a selector as an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagesExtractor {
    selector: CssSelector,
    attr: String,
}

impl ImagesExtractor {
    pub fn new(selector: &str, attr: &str) -> Result<Self, ExtractError> {
        let attr = attr.trim();
        if attr.is_empty() {
            return Err(ExtractError::invalid_spec("empty attribute name"));
        }
        Ok(Self {
            selector: CssSelector::parse(selector)?,
            attr: attr.to_string(),
        })
    }
}

/// Parses a width/height attribute, ignoring anything that is not an unsigned integer.
fn dimension(el: &ElementRef<'_>, name: &str) -> Option<u32> {
    el.value().attr(name).and_then(|v| v.trim().parse().ok())
}

impl Extract for ImagesExtractor {
    fn extract(
        &self,
        scope: Scope<'_>,
        _ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        let matches = scope.select(self.selector.selector());
        if matches.is_empty() {
            return Ok(ExtractorResult::Absent);
        }

        let mut images = Vec::with_capacity(matches.len());
        for el in &matches {
            let url = el.value().attr(&self.attr).map(str::trim).unwrap_or("");
            if url.is_empty() {
                return Err(ExtractError::AttributeMissing {
                    selector: self.selector.as_str().to_string(),
                    attr: self.attr.clone(),
                });
            }
            images.push(ArticleImage {
                url: url.to_string(),
                width: dimension(el, "width"),
                height: dimension(el, "height"),
                ..Default::default()
            });
        }
        Ok(ExtractorResult::Images(images))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::extractors::test_support::*;
    use crate::extractors::Extractor;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_required_text() {
        let e = Extractor::text("h1").unwrap();
        assert_eq!(run(&e, "<h1>  Título \n</h1>").unwrap(), text("Título"));

        let err = run(&e, "<h2>x</h2>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelectorNotFound);
        assert_eq!(err.to_string(), "'h1' not found");

        let err = run(&e, "<h1>a</h1><h1>b</h1>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);

        let err = run(&e, "<h1>   </h1>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyValue);
    }

    #[test]
    fn test_optional_text() {
        let e = Extractor::opt_text("h1").unwrap();
        assert_eq!(run(&e, "<h2>x</h2>").unwrap(), ExtractorResult::Absent);
        assert_eq!(run(&e, "<h1></h1>").unwrap(), ExtractorResult::Absent);
        let err = run(&e, "<h1>a</h1><h1>b</h1>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);
    }

    #[test]
    fn test_multiple_text() {
        let e = Extractor::texts("li").unwrap();
        assert_eq!(
            run(&e, "<ul><li> a </li><li>b</li></ul>").unwrap(),
            ExtractorResult::TextList(vec!["a".into(), "b".into()])
        );
        assert!(run(&e, "<ul></ul>").unwrap_err().is_not_found());
    }

    #[test]
    fn test_text_includes_descendants() {
        let e = Extractor::text("p").unwrap();
        assert_eq!(
            run(&e, "<p>Foo <a href='#'>link</a></p>").unwrap(),
            text("Foo link")
        );
    }

    #[test]
    fn test_required_attribute() {
        let e = Extractor::attribute("p a", "href").unwrap();
        let html = r##"<p>other</p><p>Foo <a href="#foo">link</a></p><a href="#bla">foo</a>"##;
        assert_eq!(run(&e, html).unwrap(), text("#foo"));

        let err = run(&e, "<p><a>no href</a></p>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeMissing);

        let err = run(&e, "<p><a href=' '>blank</a></p>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyValue);

        let err = run(&e, "<div><a href='#foo'>x</a></div>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelectorNotFound);
    }

    #[test]
    fn test_optional_attribute() {
        let e = Extractor::opt_attribute("p a", "href").unwrap();
        assert_eq!(run(&e, "<p><a>x</a></p>").unwrap(), ExtractorResult::Absent);
        assert_eq!(
            run(&e, "<div><a href='#foo'>x</a></div>").unwrap(),
            ExtractorResult::Absent
        );
        let err = run(&e, "<p><a href='1'>x</a><a href='2'>y</a></p>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);
    }

    #[test]
    fn test_images() {
        let e = Extractor::images("li img", "src").unwrap();
        let html = r#"<ul><li><img src="/a.png"></li><li><img src="b.png " width="500" height="900"></li></ul>"#;
        assert_eq!(
            run(&e, html).unwrap(),
            ExtractorResult::Images(vec![
                ArticleImage::new("/a.png"),
                ArticleImage {
                    url: "b.png".into(),
                    width: Some(500),
                    height: Some(900),
                    ..Default::default()
                },
            ])
        );
    }

    #[test]
    fn test_images_ignore_bad_dimensions_and_allow_zero_matches() {
        let e = Extractor::images("img", "src").unwrap();
        assert_eq!(
            run(&e, r#"<img src="a.png" width="100%">"#).unwrap(),
            ExtractorResult::Images(vec![ArticleImage::new("a.png")])
        );
        assert_eq!(run(&e, "<p>none</p>").unwrap(), ExtractorResult::Absent);
        let err = run(&e, r#"<img src="a.png"><img data-src="b.png">"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeMissing);
    }
}
