// ABOUTME: Configuration for article scrapers: clock, extractor list, merge-with record and content type.
// ABOUTME: ScraperBuilder provides a fluent API for constructing ArticleScraper instances.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::America::Sao_Paulo;

use crate::article::ArticleRecord;
use crate::extractors::Extractor;
use crate::pipeline::ArticleScraper;
use crate::time_parse::Timestamp;

/// Content type assumed when the HTTP layer did not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// Source of the `found_at` timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock, reported in Sao Paulo time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().with_timezone(&Sao_Paulo).fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Configuration options for an article scraper.
#[derive(Clone)]
pub struct Options {
    pub clock: Arc<dyn Clock>,
    pub extractors: Vec<Extractor>,
    pub merge_with: Option<ArticleRecord>,
    pub keep_html: bool,
    pub default_content_type: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            extractors: vec![Extractor::default_article()],
            merge_with: None,
            keep_html: false,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("extractors", &self.extractors.len())
            .field("merge_with", &self.merge_with.is_some())
            .field("keep_html", &self.keep_html)
            .field("default_content_type", &self.default_content_type)
            .finish()
    }
}

/// Builder for constructing ArticleScraper instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ScraperBuilder {
    opts: Options,
}

impl ScraperBuilder {
    /// Create a new ScraperBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the clock used for `found_at`.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.opts.clock = Arc::new(clock);
        self
    }

    /// Append an extractor after the ones already configured.
    pub fn extractor(mut self, extractor: Extractor) -> Self {
        self.opts.extractors.push(extractor);
        self
    }

    /// Append several extractors, keeping their order.
    pub fn extend_extractors(mut self, extractors: impl IntoIterator<Item = Extractor>) -> Self {
        self.opts.extractors.extend(extractors);
        self
    }

    /// Replace the whole extractor list, dropping the metadata baseline.
    pub fn extractors(mut self, extractors: Vec<Extractor>) -> Self {
        self.opts.extractors = extractors;
        self
    }

    /// Fold this record in after every extractor has run.
    pub fn merge_with(mut self, record: ArticleRecord) -> Self {
        self.opts.merge_with = Some(record);
        self
    }

    /// Keep the raw HTML under `extra["html"]`.
    pub fn keep_html(mut self, keep: bool) -> Self {
        self.opts.keep_html = keep;
        self
    }

    /// Set the content type used when the caller does not provide one.
    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.opts.default_content_type = content_type.into();
        self
    }

    /// Build the ArticleScraper with the configured options.
    pub fn build(self) -> ArticleScraper {
        ArticleScraper::new(self.opts)
    }
}

impl Default for ScraperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_options() {
        let opts = Options::default();
        assert_eq!(opts.extractors, vec![Extractor::default_article()]);
        assert!(!opts.keep_html);
        assert_eq!(opts.default_content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_system_clock_reports_sao_paulo_offset() {
        let offset = SystemClock.now().offset().local_minus_utc();
        assert!(offset == -3 * 3600 || offset == -2 * 3600);
    }

    #[test]
    fn test_fixed_clock() {
        let t = Sao_Paulo
            .with_ymd_and_hms(2020, 6, 21, 12, 0, 0)
            .single()
            .unwrap()
            .fixed_offset();
        assert_eq!(FixedClock(t).now(), t);
    }

    #[test]
    fn test_builder_appends_after_baseline() {
        let custom = Extractor::text("h1").unwrap();
        let scraper = ScraperBuilder::new().extractor(custom.clone()).build();
        assert_eq!(
            scraper.options().extractors,
            vec![Extractor::default_article(), custom]
        );
    }
}
