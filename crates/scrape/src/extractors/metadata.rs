// ABOUTME: Generic metadata extractor reading OpenGraph, oEmbed-style and <head> signals.
// ABOUTME: Produces the baseline title, excerpt, full text, image URL and article dates with cleanup rules.

//! Metadata extractor.
//!
//! This is the per-site default: it needs no configuration and works on any
//! page that follows OpenGraph conventions. The "oEmbed" values are the ones a
//! generated oEmbed document would carry (OpenGraph and Twitter card fields,
//! then the first content image as thumbnail).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::article::{resolve_url, ArticleImage};
use crate::dom::scoring::main_content;
use crate::dom::text::text_lines;
use crate::error::ExtractError;
use crate::extractors::compiled::get_or_compile;
use crate::extractors::select::element_text;
use crate::extractors::{Extract, ExtractionContext, ExtractorResult, FieldMap, Scope};
use crate::time_parse::{parse_rfc3339, Timestamp};

static TRAILING_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\|.*$").unwrap());

static META_PROPERTY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property]").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static HTML_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("html[lang]").unwrap());

/// Extracts the generic article baseline from page metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataExtractor;

/// Raw signals read from the page before cleanup.
#[derive(Debug, Default)]
struct PageInfo {
    page_title: String,
    description: String,
    og_title: String,
    og_description: String,
    og_site_name: String,
    og_type: String,
    og_images: Vec<ArticleImage>,
    published_time: Option<Timestamp>,
    modified_time: Option<Timestamp>,
    canonical_url: String,
    language: String,
}

/// The values an oEmbed document generated for the page would carry.
#[derive(Debug, Default)]
struct GeneratedOembed {
    title: String,
    description: String,
    provider_name: String,
    thumbnail_url: String,
}

fn first_attr(scope: Scope<'_>, css: &str, attr: &str) -> String {
    get_or_compile(css)
        .and_then(|sel| {
            scope
                .select(&sel)
                .into_iter()
                .find_map(|el| el.value().attr(attr).map(|v| v.trim().to_string()))
        })
        .unwrap_or_default()
}

fn meta_name(scope: Scope<'_>, name: &str) -> String {
    first_attr(scope, &format!("meta[name='{}']", name), "content")
}

fn read_page_info(scope: Scope<'_>) -> PageInfo {
    let mut info = PageInfo {
        page_title: scope
            .select(&TITLE_SELECTOR)
            .first()
            .map(element_text)
            .unwrap_or_default(),
        description: meta_name(scope, "description"),
        canonical_url: first_attr(scope, "link[rel='canonical']", "href"),
        ..Default::default()
    };

    info.language = if scope.root().value().name() == "html" {
        scope.root().value().attr("lang").unwrap_or("").to_string()
    } else {
        scope
            .select(&HTML_SELECTOR)
            .first()
            .and_then(|el| el.value().attr("lang"))
            .unwrap_or("")
            .to_string()
    };

    for el in scope.select(&META_PROPERTY_SELECTOR) {
        let property = el.value().attr("property").unwrap_or("").trim();
        let content = el.value().attr("content").unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        match property {
            "og:title" => set_once(&mut info.og_title, content),
            "og:description" => set_once(&mut info.og_description, content),
            "og:site_name" => set_once(&mut info.og_site_name, content),
            "og:type" => set_once(&mut info.og_type, content),
            "og:image" | "og:image:url" => info.og_images.push(ArticleImage::new(content)),
            "og:image:secure_url" => {
                if let Some(img) = info.og_images.last_mut() {
                    img.secure_url = Some(content.to_string());
                }
            }
            "og:image:type" => {
                if let Some(img) = info.og_images.last_mut() {
                    img.mime_type = Some(content.to_string());
                }
            }
            "og:image:width" => {
                if let Some(img) = info.og_images.last_mut() {
                    img.width = content.parse().ok();
                }
            }
            "og:image:height" => {
                if let Some(img) = info.og_images.last_mut() {
                    img.height = content.parse().ok();
                }
            }
            "article:published_time" if info.published_time.is_none() => {
                info.published_time = parse_rfc3339(content)
            }
            "article:modified_time" if info.modified_time.is_none() => {
                info.modified_time = parse_rfc3339(content)
            }
            _ => {}
        }
    }

    info
}

fn set_once(slot: &mut String, value: &str) {
    if slot.is_empty() {
        *slot = value.to_string();
    }
}

fn generate_oembed(
    scope: Scope<'_>,
    info: &PageInfo,
    content: &[ElementRef<'_>],
    base: Option<&Url>,
) -> GeneratedOembed {
    let or_else = |a: &str, b: String| if a.is_empty() { b } else { a.to_string() };

    let thumbnail = info
        .og_images
        .first()
        .map(|img| img.preferred_url().to_string())
        .filter(|u| !u.is_empty())
        .or_else(|| Some(meta_name(scope, "twitter:image")).filter(|u| !u.is_empty()))
        .or_else(|| Some(first_attr(scope, "link[rel='image_src']", "href")).filter(|u| !u.is_empty()))
        .or_else(|| {
            content
                .iter()
                .flat_map(|block| block.select(&IMG_SELECTOR))
                .filter_map(|img| img.value().attr("src"))
                .map(str::trim)
                .find(|src| !src.is_empty())
                .map(String::from)
        })
        .map(|u| resolve_url(base, &u))
        .unwrap_or_default();

    GeneratedOembed {
        title: or_else(&info.og_title, meta_name(scope, "twitter:title")),
        description: or_else(&info.og_description, meta_name(scope, "twitter:description")),
        provider_name: or_else(&info.og_site_name, meta_name(scope, "application-name")),
        thumbnail_url: thumbnail,
    }
}

fn clean_title(info: &PageInfo, oembed: &GeneratedOembed, site_name: &str) -> String {
    let mut title = if oembed.title.is_empty() {
        info.page_title.clone()
    } else {
        oembed.title.clone()
    };

    if !title.is_empty() && !site_name.is_empty() {
        for sep in [" - ", " | "] {
            if let Some(stripped) = title.strip_suffix(&format!("{}{}", sep, site_name)) {
                title = stripped.to_string();
            }
        }
    }
    if let Some(caps) = TRAILING_SEGMENT_RE.captures(&title) {
        title = caps[1].to_string();
    }
    title.trim().to_string()
}

/// An excerpt is kept only if it has more than four words once ellipses are trimmed.
fn is_good_excerpt(excerpt: &str) -> bool {
    if excerpt.is_empty() || excerpt == "..." {
        return false;
    }
    excerpt.trim_matches('.').split(' ').count() > 4
}

fn clean_excerpt(info: &PageInfo, oembed: &GeneratedOembed, title: &str) -> String {
    let excerpt = if info.description.is_empty() {
        oembed.description.trim()
    } else {
        info.description.trim()
    };
    if !is_good_excerpt(excerpt) {
        return String::new();
    }
    excerpt
        .strip_prefix(title)
        .unwrap_or(excerpt)
        .trim()
        .to_string()
}

fn full_text(content: &[ElementRef<'_>], title: &str, excerpt: &str) -> String {
    content
        .iter()
        .flat_map(|block| text_lines(*block))
        .filter(|line| line != title && line != excerpt)
        .collect::<Vec<_>>()
        .join("\n")
}

fn image_url(info: &PageInfo, oembed: &GeneratedOembed, base: Option<&Url>) -> String {
    info.og_images
        .iter()
        .find(|img| img.has_dimensions() && !img.preferred_url().is_empty())
        .map(|img| resolve_url(base, img.preferred_url()))
        .unwrap_or_else(|| oembed.thumbnail_url.clone())
}

fn text_or_absent(s: String) -> ExtractorResult {
    if s.is_empty() {
        ExtractorResult::Absent
    } else {
        ExtractorResult::Text(s)
    }
}

impl Extract for MetadataExtractor {
    fn extract(
        &self,
        scope: Scope<'_>,
        ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        let base = ctx.base_url();
        let info = read_page_info(scope);
        let content = main_content(scope.root());
        let oembed = generate_oembed(scope, &info, &content, base.as_ref());

        let site_name = if info.og_site_name.is_empty() {
            oembed.provider_name.clone()
        } else {
            info.og_site_name.clone()
        };
        let title = clean_title(&info, &oembed, &site_name);
        let excerpt = clean_excerpt(&info, &oembed, &title);
        let body = full_text(&content, &title, &excerpt);
        let image = image_url(&info, &oembed, base.as_ref());

        tracing::debug!(
            url = %ctx.url,
            title = %title,
            has_published_at = info.published_time.is_some(),
            "metadata extracted"
        );

        let mut page = FieldMap::new();
        page.insert("site_name".into(), text_or_absent(site_name));
        page.insert("og_type".into(), text_or_absent(info.og_type.clone()));
        page.insert(
            "canonical_url".into(),
            text_or_absent(info.canonical_url.clone()),
        );
        page.insert("language".into(), text_or_absent(info.language.clone()));

        let mut fields = FieldMap::new();
        fields.insert("title".into(), text_or_absent(title));
        fields.insert("excerpt".into(), text_or_absent(excerpt));
        fields.insert("fullText".into(), text_or_absent(body));
        fields.insert("imageURL".into(), text_or_absent(image));
        fields.insert("publishedAt".into(), info.published_time.into());
        fields.insert("modifiedAt".into(), info.modified_time.into());
        fields.insert("htmlinfo".into(), ExtractorResult::Struct(page));
        Ok(ExtractorResult::Struct(fields))
    }
}
