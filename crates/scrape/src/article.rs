// ABOUTME: ArticleRecord, ArticleImage and ArticleLink, the records produced by the scrapers.
// ABOUTME: Handles field mapping from extractor results, content hashes and ingestion validation.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::ExtractError;
use crate::extractors::loader::normalize_field_name;
use crate::extractors::value::{ExtractorResult, FieldMap};
use crate::time_parse::Timestamp;

/// An image referenced by an article.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticleImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ArticleImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }

    /// Secure URL when advertised, plain URL otherwise.
    pub fn preferred_url(&self) -> &str {
        self.secure_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.url)
    }
}

/// The canonical extracted article.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleRecord {
    pub url: String,
    pub url_hash: String,
    pub title: String,
    pub full_text: String,
    pub full_text_hash: String,
    pub excerpt: String,
    pub found_at: Option<Timestamp>,
    pub published_at: Option<Timestamp>,
    #[serde(rename = "updated_at")]
    pub modified_at: Option<Timestamp>,
    pub image_url: String,
    pub images: Vec<ArticleImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "brinfo")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A link found on a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Hex-encoded SHA-1 of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves `raw` against `base`.
///
/// Absolute URLs, and anything that cannot be joined, are returned trimmed but
/// otherwise unchanged.
pub fn resolve_url(base: Option<&Url>, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    match base.and_then(|b| b.join(raw).ok()) {
        Some(u) => u.to_string(),
        None => raw.to_string(),
    }
}

fn hash_or_empty(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        content_hash(text)
    }
}

impl ArticleRecord {
    /// A record whose `url` and `url_hash` are already set.
    pub fn with_url(url: impl Into<String>) -> Self {
        let mut record = Self::default();
        record.set_url(url);
        record
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.url_hash = hash_or_empty(&self.url);
    }

    pub fn set_full_text(&mut self, text: impl Into<String>) {
        self.full_text = text.into();
        self.full_text_hash = hash_or_empty(&self.full_text);
    }

    /// Recomputes both fingerprints from the current field values.
    pub fn refresh_hashes(&mut self) {
        self.url_hash = hash_or_empty(&self.url);
        self.full_text_hash = hash_or_empty(&self.full_text);
    }

    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Key under which the record is stored downstream.
    pub fn storage_key(&self, source_guid: &str) -> String {
        format!(
            "{}/article-{}-{}.json",
            source_guid, self.url_hash, self.full_text_hash
        )
    }

    /// Builds a partial record from a structured extractor result.
    ///
    /// Keys are normalized through the field-name aliases; unknown keys land in
    /// `extra` as JSON. Absent values are skipped.
    pub fn from_fields(fields: FieldMap) -> Result<Self, ExtractError> {
        let mut record = Self::default();
        for (key, value) in fields {
            if value.is_absent() {
                continue;
            }
            let key = normalize_field_name(&key);
            match key.as_str() {
                "url" => record.set_url(text_field(&value, &key)?),
                "title" => record.title = text_field(&value, &key)?,
                "fullText" => record.set_full_text(text_field(&value, &key)?),
                "excerpt" => record.excerpt = text_field(&value, &key)?,
                "imageURL" => record.image_url = text_field(&value, &key)?,
                "sourceID" => record.source_id = Some(text_field(&value, &key)?),
                "contentType" => record.content_type = Some(text_field(&value, &key)?),
                "publishedAt" => record.published_at = value.as_time(&key)?,
                "modifiedAt" => record.modified_at = value.as_time(&key)?,
                "foundAt" => record.found_at = value.as_time(&key)?,
                "images" => record.images = images_field(value, &key)?,
                _ => {
                    let json = serde_json::to_value(&value).unwrap_or(serde_json::Value::Null);
                    record.extra.insert(key, json);
                }
            }
        }
        Ok(record)
    }

    /// Checks the record is complete enough to hand to the ingestion pipeline.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate_for_ingestion(&self, now: Timestamp) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.url.is_empty() {
            problems.push("missing url".to_string());
        }
        if self.url_hash.is_empty() {
            problems.push("missing url_hash".to_string());
        }
        if self.title.is_empty() {
            problems.push("missing title".to_string());
        }
        if self.full_text.is_empty() {
            problems.push("missing full_text".to_string());
        }
        if self.full_text_hash.is_empty() {
            problems.push("missing full_text_hash".to_string());
        }
        if self.published_at.is_none() {
            problems.push("missing published_at".to_string());
        }
        if self.found_at.is_none() {
            problems.push("missing found_at".to_string());
        }

        let horizon = now + Duration::hours(12);
        if self.published_at.is_some_and(|t| t >= horizon) {
            problems.push("published_at in the future".to_string());
        }
        if self.modified_at.is_some_and(|t| t >= horizon) {
            problems.push("updated_at in the future".to_string());
        }

        if !self.image_url.is_empty() {
            let absolute = Url::parse(&self.image_url)
                .map(|u| u.has_host())
                .unwrap_or(false);
            if !absolute {
                problems.push("image_url is not absolute".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Makes image URLs absolute and defaults `image_url` to the first image.
    pub fn resolve_images(&mut self) {
        let base = Url::parse(&self.url).ok();
        for img in &mut self.images {
            img.url = resolve_url(base.as_ref(), &img.url);
            if let Some(secure) = img.secure_url.as_mut() {
                *secure = resolve_url(base.as_ref(), secure);
            }
        }
        if !self.image_url.is_empty() {
            self.image_url = resolve_url(base.as_ref(), &self.image_url);
        } else if let Some(first) = self.images.first() {
            self.image_url = first.url.clone();
        }
    }
}

fn text_field(value: &ExtractorResult, key: &str) -> Result<String, ExtractError> {
    Ok(value.as_text(key)?.unwrap_or_default().to_string())
}

fn images_field(value: ExtractorResult, key: &str) -> Result<Vec<ArticleImage>, ExtractError> {
    match value {
        ExtractorResult::Images(images) => Ok(images),
        ExtractorResult::TextList(urls) => Ok(urls.into_iter().map(ArticleImage::new).collect()),
        ExtractorResult::Text(url) => Ok(vec![ArticleImage::new(url)]),
        other => Err(other.mismatch(key, "image list")),
    }
}
