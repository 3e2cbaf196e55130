// ABOUTME: Listing-page scraper returning the article links found under a repeated container element.
// ABOUTME: Fields are compiled from DSL strings; link URLs are cleaned and resolved against the page URL.

use scraper::Html;
use url::Url;

use crate::article::ArticleLink;
use crate::error::{ExtractError, ScrapeError};
use crate::extractors::{loader, Extract, ExtractionContext, Extractor, ExtractorResult, Scope};

const URL: &str = "url";
const PUBLISHED: &str = "publishedAt";
const IMAGE: &str = "imageURL";

/// Extracts `ArticleLink`s from a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingScraper {
    extractor: Extractor,
}

impl ListingScraper {
    /// Compiles the container selector and field DSL strings.
    ///
    /// `url_spec` is required; the other two are optional.
    pub fn from_specs(
        container: &str,
        url_spec: &str,
        published_at_spec: Option<&str>,
        image_url_spec: Option<&str>,
    ) -> Result<Self, ExtractError> {
        let mut fields = vec![(URL, loader::from_str(url_spec)?)];
        if let Some(spec) = published_at_spec.filter(|s| !s.is_empty()) {
            fields.push((PUBLISHED, loader::from_str(spec)?));
        }
        if let Some(spec) = image_url_spec.filter(|s| !s.is_empty()) {
            fields.push((IMAGE, loader::from_str(spec)?));
        }
        Ok(Self {
            extractor: Extractor::structured_list(container, fields)?,
        })
    }

    pub fn run(&self, html: &str, ctx: &ExtractionContext) -> Result<Vec<ArticleLink>, ScrapeError> {
        let doc = Html::parse_document(html);
        let base = ctx.base_url();
        let wrap = |e: ExtractError| ScrapeError::extract(&ctx.url, "Listing", e);

        let items = match self.extractor.extract(Scope::Document(&doc), ctx).map_err(wrap)? {
            ExtractorResult::StructList(items) => items,
            other => return Err(wrap(other.mismatch("links", "list of maps"))),
        };

        let mut links = Vec::with_capacity(items.len());
        for fields in items {
            let raw = match fields.get(URL) {
                Some(v) => v.as_text(URL).map_err(wrap)?.unwrap_or_default(),
                None => "",
            };
            let url = fix_relative_url(base.as_ref(), raw);
            if url.is_empty() {
                continue;
            }
            let published_at = match fields.get(PUBLISHED) {
                Some(v) => v.as_time(PUBLISHED).map_err(wrap)?,
                None => None,
            };
            let image_url = match fields.get(IMAGE) {
                Some(v) => v
                    .as_text(IMAGE)
                    .map_err(wrap)?
                    .map(|s| fix_relative_url(base.as_ref(), s))
                    .filter(|s| !s.is_empty()),
                None => None,
            };
            links.push(ArticleLink {
                url,
                published_at,
                image_url,
            });
        }

        tracing::debug!(url = %ctx.url, links = links.len(), "listing scraped");
        Ok(links)
    }
}

/// Removes every whitespace character and fills the scheme and host from `base`.
fn fix_relative_url(base: Option<&Url>, raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    crate::article::resolve_url(base, &cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><body><ul class="noticias">
        <li class="item">
            <a href="/saude/pt-br/noticia-1">Primeira</a>
            <span class="data">21/06/2020 10h30</span>
            <img src="/img/1.png">
        </li>
        <li class="item">
            <a href="https://www.gov.br/saude/pt-br/noticia 2
            ">Segunda</a>
            <span class="data">22/06/2020 11h00</span>
        </li>
    </ul></body></html>"#;

    fn ctx() -> ExtractionContext {
        ExtractionContext::new("https://www.gov.br/saude/pt-br/noticias")
    }

    #[test]
    fn test_links_are_cleaned_and_resolved() {
        let scraper = ListingScraper::from_specs(
            "li.item",
            "a|href",
            Some(".data|text::time"),
            Some("img|src?"),
        )
        .unwrap();
        let links = scraper.run(PAGE, &ctx()).unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://www.gov.br/saude/pt-br/noticia-1");
        assert_eq!(
            links[0].image_url.as_deref(),
            Some("https://www.gov.br/img/1.png")
        );
        assert!(links[0].published_at.is_some());
        assert_eq!(links[1].url, "https://www.gov.br/saude/pt-br/noticia2");
        assert_eq!(links[1].image_url, None);
    }

    #[test]
    fn test_url_only() {
        let scraper = ListingScraper::from_specs("li.item", "a|href", None, None).unwrap();
        let links = scraper.run(PAGE, &ctx()).unwrap();
        assert!(links.iter().all(|l| l.published_at.is_none()));
    }

    #[test]
    fn test_bad_dsl_is_rejected() {
        let err = ListingScraper::from_specs("li.item", "a|href|", None, None).unwrap_err();
        assert!(err.is_invalid_spec());
    }

    #[test]
    fn test_missing_required_url_fails() {
        let scraper = ListingScraper::from_specs("li.item", "img|src", None, None).unwrap();
        let err = scraper.run(PAGE, &ctx()).unwrap_err();
        assert!(err.is_extract());
    }
}
