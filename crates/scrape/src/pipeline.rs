// ABOUTME: Article scrapers: run the configured extractors on a page and fold the results into one record.
// ABOUTME: CombinedScraper chains several scrapers over the same input with the merge engine.

use scraper::Html;

use crate::article::ArticleRecord;
use crate::error::ScrapeError;
use crate::extractors::{Extract, ExtractionContext, Scope};
use crate::merge::merge_all;
use crate::options::Options;
use crate::resource::decode_body;

/// Anything that turns a page into an article record.
pub trait Scrape {
    fn run(&self, html: &str, ctx: &ExtractionContext) -> Result<ArticleRecord, ScrapeError>;

    /// Decodes raw bytes with the context's charset hint and runs the scraper.
    fn run_bytes(&self, body: &[u8], ctx: &ExtractionContext) -> Result<ArticleRecord, ScrapeError> {
        let html = decode_body(body, ctx.content_type.as_deref());
        self.run(&html, ctx)
    }
}

/// Runs an ordered extractor list against one document.
#[derive(Debug, Clone)]
pub struct ArticleScraper {
    opts: Options,
}

impl ArticleScraper {
    pub fn new(opts: Options) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    fn seed(&self, html: &str, ctx: &ExtractionContext) -> ArticleRecord {
        let mut record = ArticleRecord::with_url(ctx.url.clone());
        record.found_at = Some(self.opts.clock.now());
        record.content_type = Some(
            ctx.content_type
                .clone()
                .unwrap_or_else(|| self.opts.default_content_type.clone()),
        );
        if self.opts.keep_html {
            record
                .extra
                .insert("html".into(), serde_json::Value::String(html.to_string()));
        }
        record
    }
}

impl Default for ArticleScraper {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Scrape for ArticleScraper {
    fn run(&self, html: &str, ctx: &ExtractionContext) -> Result<ArticleRecord, ScrapeError> {
        let doc = Html::parse_document(html);
        let scope = Scope::Document(&doc);
        let mut record = self.seed(html, ctx);

        for (idx, extractor) in self.opts.extractors.iter().enumerate() {
            tracing::debug!(url = %ctx.url, extractor = idx, "running extractor");
            let partial = extractor
                .extract(scope, ctx)
                .and_then(|value| value.into_struct("article"))
                .and_then(ArticleRecord::from_fields)
                .map_err(|e| ScrapeError::extract(&ctx.url, "Run", e))?;
            record.absorb(partial);
        }

        if let Some(extra) = &self.opts.merge_with {
            record.absorb(extra.clone());
        }

        if record.published_at.is_none() && record.modified_at.is_some() {
            record.published_at = record.modified_at;
        }
        record.resolve_images();
        record.refresh_hashes();

        tracing::debug!(
            url = %record.url,
            title = %record.title,
            published = record.published_at.is_some(),
            images = record.images.len(),
            "article scraped"
        );
        Ok(record)
    }
}

/// Runs several scrapers on the same input and merges their records in order.
#[derive(Default)]
pub struct CombinedScraper {
    scrapers: Vec<Box<dyn Scrape + Send + Sync>>,
}

impl CombinedScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scraper: impl Scrape + Send + Sync + 'static) -> Self {
        self.scrapers.push(Box::new(scraper));
        self
    }

    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }
}

impl Scrape for CombinedScraper {
    fn run(&self, html: &str, ctx: &ExtractionContext) -> Result<ArticleRecord, ScrapeError> {
        let records = self
            .scrapers
            .iter()
            .map(|s| s.run(html, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        let mut record = merge_all(records);
        record.refresh_hashes();
        Ok(record)
    }
}
