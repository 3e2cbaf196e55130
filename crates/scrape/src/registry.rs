// ABOUTME: Registry of content sources, each pairing a site host with the extractors tuned for it.
// ABOUTME: Sources are looked up by id or host and can be loaded from a JSON file of DSL configs.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::ScrapeError;
use crate::extractors::{loader, Extractor};

/// A site whose pages are scraped with a dedicated extractor list.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSource {
    pub id: String,
    pub host: String,
    pub extractors: Vec<Extractor>,
}

#[derive(Debug, Deserialize)]
struct SourceConfig {
    id: String,
    host: String,
    #[serde(default)]
    extractors: Option<serde_json::Value>,
}

/// Content sources indexed by id and by host.
#[derive(Debug, Default, Clone)]
pub struct ContentSourceRegistry {
    sources: Vec<ContentSource>,
    by_id: HashMap<String, usize>,
    by_host: HashMap<String, usize>,
}

impl ContentSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: ContentSource) -> Result<(), ScrapeError> {
        let fail = |msg: String| ScrapeError::registry("Register", Some(anyhow::anyhow!(msg)));

        if source.id.trim().is_empty() {
            return Err(fail("content source has an empty id".into()));
        }
        if source.host.trim().is_empty() {
            return Err(fail(format!("content source '{}' has an empty host", source.id)));
        }
        if self.by_id.contains_key(&source.id) {
            return Err(fail(format!("content source id '{}' already registered", source.id)));
        }
        if self.by_host.contains_key(&source.host) {
            return Err(fail(format!(
                "content source host '{}' already registered",
                source.host
            )));
        }

        let idx = self.sources.len();
        self.by_id.insert(source.id.clone(), idx);
        self.by_host.insert(source.host.clone(), idx);
        tracing::debug!(id = %source.id, host = %source.host, "content source registered");
        self.sources.push(source);
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Result<&ContentSource, ScrapeError> {
        self.by_id.get(id).map(|&i| &self.sources[i]).ok_or_else(|| {
            ScrapeError::registry(
                "FindByID",
                Some(anyhow::anyhow!("content source id '{}' not found", id)),
            )
        })
    }

    pub fn find_by_host(&self, host: &str) -> Result<&ContentSource, ScrapeError> {
        self.get_by_host(host).ok_or_else(|| {
            ScrapeError::registry(
                "FindByHost",
                Some(anyhow::anyhow!("content source host '{}' not found", host)),
            )
        })
    }

    pub fn get_by_host(&self, host: &str) -> Option<&ContentSource> {
        self.by_host.get(host).map(|&i| &self.sources[i])
    }

    /// The source registered for the host of `url`, if any.
    pub fn for_url(&self, url: &str) -> Option<&ContentSource> {
        let parsed = Url::parse(url).ok()?;
        self.get_by_host(parsed.host_str()?)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentSource> {
        self.sources.iter()
    }

    /// Builds a registry from a JSON array of `{ "id", "host", "extractors" }`.
    ///
    /// Every DSL string is compiled here, so a bad config fails at load time.
    pub fn from_json(json: &str) -> Result<Self, ScrapeError> {
        let configs: Vec<SourceConfig> = serde_json::from_str(json).map_err(|e| {
            ScrapeError::registry("Load", Some(anyhow::anyhow!("invalid sources JSON: {}", e)))
        })?;

        let mut registry = Self::new();
        for cfg in configs {
            let extractors = match &cfg.extractors {
                Some(value) => loader::from_value(value).map_err(|e| {
                    ScrapeError::registry(
                        "Load",
                        Some(anyhow::Error::new(e).context(format!("content source '{}'", cfg.id))),
                    )
                })?,
                None => Vec::new(),
            };
            registry.register(ContentSource {
                id: cfg.id,
                host: cfg.host,
                extractors,
            })?;
        }
        Ok(registry)
    }

    pub fn load_file(path: &Path) -> Result<Self, ScrapeError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::registry(
                "Load",
                Some(anyhow::Error::new(e).context(format!("reading {}", path.display()))),
            )
        })?;
        Self::from_json(&json)
    }
}
