// ABOUTME: Main library entry point for the brinfo article scraper.
// ABOUTME: Re-exports the public API: scrapers, extractors, records, the DSL loader, registry and fetcher.

//! brinfo-scrape - declarative article extraction for Brazilian news and government sites.
//!
//! Pages are scraped by an ordered list of [`Extractor`]s. The default list
//! reads OpenGraph/oEmbed metadata and recovers a missing publish date from
//! common markup; site-specific extractors are compiled from a compact DSL
//! (`"selector|field?::time"`) and appended after it.
//!
//! # Example
//!
//! ```no_run
//! use brinfo_scrape::{loader, ExtractionContext, Scrape, ScraperBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let custom = loader::from_json(r#"{"body": {"published_at": ".documentPublished|text::time"}}"#)?;
//!     let scraper = ScraperBuilder::new().extend_extractors(custom).build();
//!     let html = std::fs::read_to_string("noticia.html")?;
//!     let record = scraper.run(&html, &ExtractionContext::new("https://www.gov.br/saude/noticia"))?;
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//!     Ok(())
//! }
//! ```

pub mod article;
pub mod dom;
pub mod error;
pub mod extractors;
pub mod listing;
pub mod merge;
pub mod options;
pub mod pipeline;
pub mod registry;
pub mod resource;
pub mod time_parse;

pub use crate::article::{ArticleImage, ArticleLink, ArticleRecord};
pub use crate::error::{ErrorCode, ErrorKind, ExtractError, ScrapeError};
pub use crate::extractors::{loader, Extract, ExtractionContext, Extractor, ExtractorResult, Scope};
pub use crate::listing::ListingScraper;
pub use crate::merge::{merge, merge_all};
pub use crate::options::{Clock, FixedClock, Options, ScraperBuilder, SystemClock};
pub use crate::pipeline::{ArticleScraper, CombinedScraper, Scrape};
pub use crate::registry::{ContentSource, ContentSourceRegistry};
pub use crate::resource::{FetchOptions, FetchResult, Fetcher};
pub use crate::time_parse::{parse_time, Timestamp};
