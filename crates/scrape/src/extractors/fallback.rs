// ABOUTME: Date-fallback resolver wrapping a baseline extractor that may miss the publish date.
// ABOUTME: Tries meta tags, RDFa rnews markup and <time pubdate> in order, recovering from per-step failures.

use once_cell::sync::Lazy;

use crate::error::ExtractError;
use crate::extractors::{Extract, ExtractionContext, Extractor, ExtractorResult, FieldMap, Scope};
use crate::time_parse::Timestamp;

const PUBLISHED: &str = "publishedAt";
const MODIFIED: &str = "modifiedAt";

/// One step of the chain and the field names holding its candidate dates.
struct Step {
    name: &'static str,
    extractor: Extractor,
    published: &'static [&'static str],
    modified: &'static [&'static str],
}

static STEPS: Lazy<Vec<Step>> = Lazy::new(|| {
    vec![
        Step {
            name: "meta",
            extractor: Extractor::structured(
                "head",
                [
                    (
                        "published",
                        Extractor::opt_time_attribute(
                            "meta[property='article:published_time']",
                            "content",
                        )
                        .unwrap(),
                    ),
                    (
                        "modified",
                        Extractor::opt_time_attribute(
                            "meta[property='article:modified_time']",
                            "content",
                        )
                        .unwrap(),
                    ),
                ],
            )
            .unwrap(),
            published: &["published"],
            modified: &["modified"],
        },
        Step {
            name: "rnews",
            extractor: Extractor::structured(
                r#"body [vocab*="schema.org"][typeof=Article][prefix*=rnews]"#,
                [
                    (
                        "published",
                        Extractor::opt_time_text(r#"[property="rnews:datePublished"]"#).unwrap(),
                    ),
                    (
                        "modified",
                        Extractor::opt_time_text(r#"[property="rnews:dateModified"]"#).unwrap(),
                    ),
                ],
            )
            .unwrap(),
            published: &["published"],
            modified: &["modified"],
        },
        Step {
            name: "article-time",
            extractor: Extractor::structured(
                "article",
                [
                    (
                        "pubdate",
                        Extractor::opt_time_attribute("time[pubdate]", "pubdate").unwrap(),
                    ),
                    (
                        "datetime",
                        Extractor::opt_time_attribute("time[pubdate]", "datetime").unwrap(),
                    ),
                ],
            )
            .unwrap(),
            published: &["pubdate", "datetime"],
            modified: &[],
        },
    ]
});

fn first_time(
    fields: &FieldMap,
    keys: &[&str],
) -> Result<Option<Timestamp>, ExtractError> {
    for key in keys {
        if let Some(value) = fields.get(*key) {
            if let Some(t) = value.as_time(key)? {
                return Ok(Some(t));
            }
        }
    }
    Ok(None)
}

/// Dates found by the fallback chain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FoundDates {
    pub published_at: Option<Timestamp>,
    pub modified_at: Option<Timestamp>,
}

/// Runs the fallback chain against `scope`.
///
/// The first step yielding a publish date wins. The first modification date
/// seen in any step up to that point is kept alongside it; when no step has a
/// publish date, that modification date stands in for it.
/// Steps that fail on the document's content count as "nothing found".
pub fn find_dates(scope: Scope<'_>, ctx: &ExtractionContext) -> Result<FoundDates, ExtractError> {
    let mut first_modified: Option<Timestamp> = None;

    for step in STEPS.iter() {
        let fields = match step.extractor.extract(scope, ctx) {
            Ok(value) => value.into_struct(step.name)?,
            Err(err) if err.is_data_error() => {
                tracing::debug!(step = step.name, error = %err, "date fallback step found nothing");
                continue;
            }
            Err(err) => return Err(err),
        };

        let published = first_time(&fields, step.published)?;
        let modified = first_time(&fields, step.modified)?;
        if first_modified.is_none() {
            first_modified = modified;
        }
        if published.is_some() {
            tracing::debug!(step = step.name, "publish date recovered");
            return Ok(FoundDates {
                published_at: published,
                modified_at: first_modified,
            });
        }
    }

    Ok(FoundDates {
        published_at: first_modified,
        modified_at: first_modified,
    })
}

/// Decorates a baseline extractor with the publish-date fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub struct DateFallback {
    inner: Box<Extractor>,
}

impl DateFallback {
    pub fn new(inner: Extractor) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Extract for DateFallback {
    fn extract(
        &self,
        scope: Scope<'_>,
        ctx: &ExtractionContext,
    ) -> Result<ExtractorResult, ExtractError> {
        let mut fields = self.inner.extract(scope, ctx)?.into_struct("baseline")?;

        let published = match fields.get(PUBLISHED) {
            Some(v) => v.as_time(PUBLISHED)?,
            None => None,
        };
        if published.is_some() {
            return Ok(ExtractorResult::Struct(fields));
        }

        let modified = match fields.get(MODIFIED) {
            Some(v) => v.as_time(MODIFIED)?,
            None => None,
        };
        if let Some(modified) = modified {
            fields.insert(PUBLISHED.into(), ExtractorResult::Time(modified));
            return Ok(ExtractorResult::Struct(fields));
        }

        let found = find_dates(scope, ctx)?;
        fields.insert(PUBLISHED.into(), found.published_at.into());
        if found.modified_at.is_some() {
            fields.insert(MODIFIED.into(), found.modified_at.into());
        }
        Ok(ExtractorResult::Struct(fields))
    }
}
