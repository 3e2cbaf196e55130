// ABOUTME: Resource handling: blocking HTTP fetching with an optional on-disk cache, plus charset decoding.
// ABOUTME: Non-200 responses are Fetch errors; cached bodies are keyed by the SHA-1 of the URL.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;

use crate::article::content_hash;
use crate::error::ScrapeError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Options for fetching a resource.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub cache_dir: Option<PathBuf>,
    pub headers: HashMap<String, String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache_dir: None,
            headers: HashMap::new(),
        }
    }
}

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub from_cache: bool,
}

impl FetchResult {
    /// Decode the body as UTF-8 text, using charset hints from the content-type header.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Drops a leading UTF-8 byte-order mark.
pub fn strip_bom(body: &[u8]) -> &[u8] {
    body.strip_prefix(UTF8_BOM).unwrap_or(body)
}

/// Decode body bytes to a String using the content-type charset, or detection when absent.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let body = strip_bom(body);
    if let Some(charset) = content_type.and_then(extract_charset) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
            let (decoded, _, _) = encoding.decode(body);
            return decoded.into_owned();
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from a Content-Type header.
pub fn extract_charset(content_type: &str) -> Option<String> {
    content_type.to_lowercase().split(';').find_map(|part| {
        part.trim()
            .strip_prefix("charset=")
            .map(|c| c.trim_matches('"').trim_matches('\'').to_string())
    })
}

/// Validates that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str, op: &str) -> Result<url::Url, ScrapeError> {
    if url.trim().is_empty() {
        return Err(ScrapeError::invalid_input(
            url,
            op,
            Some(anyhow::anyhow!("empty URL")),
        ));
    }
    let parsed = url::Url::parse(url).map_err(|e| {
        ScrapeError::invalid_input(url, op, Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(ScrapeError::invalid_input(
            url,
            op,
            Some(anyhow::anyhow!("scheme must be http or https")),
        )),
    }
}

/// Disk cache of fetched pages: `<sha1>.html` plus `<sha1>.content-type`.
#[derive(Debug, Clone)]
struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    fn paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let key = content_hash(url);
        (
            self.dir.join(format!("{}.html", key)),
            self.dir.join(format!("{}.content-type", key)),
        )
    }

    fn load(&self, url: &str) -> Option<FetchResult> {
        let (body_path, ct_path) = self.paths(url);
        let body = fs::read(&body_path).ok()?;
        let content_type = fs::read_to_string(&ct_path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Some(FetchResult {
            status: 200,
            url: url.to_string(),
            final_url: url.to_string(),
            content_type,
            body: Bytes::from(body),
            from_cache: true,
        })
    }

    fn store(&self, result: &FetchResult) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let (body_path, ct_path) = self.paths(&result.url);
        fs::write(&body_path, &result.body)?;
        fs::write(&ct_path, result.content_type.as_deref().unwrap_or(""))?;
        Ok(())
    }
}

/// Blocking HTTP client for article and listing pages.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::blocking::Client,
    headers: HashMap<String, String>,
    cache: Option<DiskCache>,
}

impl Fetcher {
    pub fn new(opts: FetchOptions) -> Result<Self, ScrapeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(opts.user_agent)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| ScrapeError::fetch("", "NewFetcher", Some(anyhow::Error::new(e))))?;
        Ok(Self {
            client,
            headers: opts.headers,
            cache: opts.cache_dir.map(|dir| DiskCache { dir }),
        })
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache.as_ref().map(|c| c.dir.as_path())
    }

    /// Fetch `url`, serving it from the disk cache when one is configured.
    pub fn fetch(&self, url: &str) -> Result<FetchResult, ScrapeError> {
        validate_url(url, "Fetch")?;

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.load(url)) {
            tracing::debug!(url, "served from cache");
            return Ok(hit);
        }

        let result = self.fetch_remote(url)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&result) {
                tracing::warn!(url, error = %e, "failed to write cache entry");
            }
        }
        Ok(result)
    }

    fn fetch_remote(&self, url: &str) -> Result<FetchResult, ScrapeError> {
        let mut request = self.client.get(url);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().map_err(|e| {
            ScrapeError::fetch(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
        })?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ScrapeError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!(
                    "HTTP status {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )),
            ));
        }

        if let Some(len) = response.content_length() {
            if len as usize > MAX_CONTENT_LENGTH {
                return Err(ScrapeError::fetch(
                    url,
                    "Fetch",
                    Some(anyhow::anyhow!("content too large")),
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().map_err(|e| {
            ScrapeError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("failed to read body: {}", e)),
            )
        })?;
        if body.len() > MAX_CONTENT_LENGTH {
            return Err(ScrapeError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }

        tracing::debug!(url, status = status.as_u16(), bytes = body.len(), "fetched");
        Ok(FetchResult {
            status: status.as_u16(),
            url: url.to_string(),
            final_url,
            content_type,
            body,
            from_cache: false,
        })
    }
}
