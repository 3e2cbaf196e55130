// ABOUTME: The merge engine folding partial extraction results into one record.
// ABOUTME: Last non-empty value wins; images concatenate; extra is a shallow key union.

use crate::article::ArticleRecord;
use crate::extractors::value::{ExtractorResult, FieldMap};

fn take_text(base: &mut String, incoming: String) -> bool {
    if incoming.is_empty() {
        return false;
    }
    *base = incoming;
    true
}

fn take_opt<T>(base: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *base = incoming;
    }
}

fn take_opt_text(base: &mut Option<String>, incoming: Option<String>) {
    take_opt(base, incoming.filter(|s| !s.is_empty()));
}

impl ArticleRecord {
    /// Folds `incoming` into this record.
    ///
    /// Hashes are recomputed from the new `url`/`full_text` rather than copied
    /// from `incoming`.
    pub fn absorb(&mut self, incoming: ArticleRecord) {
        let ArticleRecord {
            url,
            url_hash: _,
            title,
            full_text,
            full_text_hash: _,
            excerpt,
            found_at,
            published_at,
            modified_at,
            image_url,
            images,
            source_id,
            content_type,
            extra,
        } = incoming;

        if take_text(&mut self.url, url) {
            let url = std::mem::take(&mut self.url);
            self.set_url(url);
        }
        take_text(&mut self.title, title);
        if take_text(&mut self.full_text, full_text) {
            let text = std::mem::take(&mut self.full_text);
            self.set_full_text(text);
        }
        take_text(&mut self.excerpt, excerpt);
        take_opt(&mut self.found_at, found_at);
        take_opt(&mut self.published_at, published_at);
        take_opt(&mut self.modified_at, modified_at);
        take_text(&mut self.image_url, image_url);
        self.images.extend(images);
        take_opt_text(&mut self.source_id, source_id);
        take_opt_text(&mut self.content_type, content_type);
        self.extra.extend(extra);
    }
}

/// Returns `base` with `incoming` folded in.
pub fn merge(mut base: ArticleRecord, incoming: ArticleRecord) -> ArticleRecord {
    base.absorb(incoming);
    base
}

/// Left-to-right fold: the last record supplying a value wins.
pub fn merge_all<I>(records: I) -> ArticleRecord
where
    I: IntoIterator<Item = ArticleRecord>,
{
    records.into_iter().fold(ArticleRecord::default(), merge)
}

/// Merges two extractor field maps with the same precedence rules as records.
///
/// List-shaped values (images, text lists) concatenate and nested maps merge
/// recursively; any other non-empty incoming value replaces the base one.
pub fn merge_fields(base: &mut FieldMap, incoming: FieldMap) {
    for (key, value) in incoming {
        if value.is_empty() {
            base.entry(key).or_insert(value);
            continue;
        }
        match (base.get_mut(&key), value) {
            (Some(ExtractorResult::Images(existing)), ExtractorResult::Images(more)) => {
                existing.extend(more)
            }
            (Some(ExtractorResult::TextList(existing)), ExtractorResult::TextList(more)) => {
                existing.extend(more)
            }
            (Some(ExtractorResult::Struct(existing)), ExtractorResult::Struct(more)) => {
                merge_fields(existing, more)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
