// ABOUTME: Pre-compiled CSS selector cache and the CssSelector handle used by extractors.
// ABOUTME: Selectors are validated once, at construction, so bad selectors fail before any HTML is read.

//! Selector caching for efficient repeated DOM queries.
//!
//! Site rules are compiled once per registry load but evaluated for every
//! scraped page; the cache keeps one parsed `Selector` per selector string.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use scraper::Selector;

use crate::error::ExtractError;

/// Entries kept before the cache is flushed.
const MAX_CACHED_SELECTORS: usize = 1024;

/// Thread-safe cache of compiled CSS selectors. Invalid selectors are cached as `None`.
static SELECTOR_CACHE: Lazy<RwLock<HashMap<String, Option<Selector>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Gets or compiles a CSS selector, caching the result.
///
/// Returns `None` if the selector is invalid.
pub fn get_or_compile(css: &str) -> Option<Selector> {
    {
        let cache = SELECTOR_CACHE.read().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(css) {
            return cached.clone();
        }
    }

    let compiled = Selector::parse(css).ok();
    let mut cache = SELECTOR_CACHE.write().unwrap_or_else(|e| e.into_inner());
    insert_bounded(&mut cache, css, compiled, MAX_CACHED_SELECTORS)
}

fn insert_bounded(
    cache: &mut HashMap<String, Option<Selector>>,
    css: &str,
    compiled: Option<Selector>,
    cap: usize,
) -> Option<Selector> {
    if let Some(existing) = cache.get(css) {
        return existing.clone();
    }
    if cache.len() >= cap {
        tracing::debug!(entries = cache.len(), "selector cache full, flushing");
        cache.clear();
    }
    cache.insert(css.to_string(), compiled.clone());
    compiled
}

/// A validated CSS selector that remembers its source text for error messages.
#[derive(Clone)]
pub struct CssSelector {
    source: String,
    compiled: Selector,
}

impl CssSelector {
    /// Compiles `css`, failing with `InvalidSpec` for empty or malformed selectors.
    pub fn parse(css: &str) -> Result<Self, ExtractError> {
        let css = css.trim();
        if css.is_empty() {
            return Err(ExtractError::invalid_spec("empty selector"));
        }
        let compiled = get_or_compile(css)
            .ok_or_else(|| ExtractError::invalid_spec(format!("invalid selector '{}'", css)))?;
        Ok(Self {
            source: css.to_string(),
            compiled,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.compiled
    }
}

impl fmt::Debug for CssSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CssSelector({:?})", self.source)
    }
}

impl PartialEq for CssSelector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
