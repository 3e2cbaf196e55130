// ABOUTME: DSL compiler turning "selector | field[?][::time]" strings and JSON objects into extractors.
// ABOUTME: All validation happens here so a broken site rule fails before any HTML is processed.

//! Extractor DSL.
//!
//! ```text
//! spec     := selector "|" field [ "?" ] [ "::" cast ]
//! selector := any non-empty text up to the last unescaped "|" ("\|" for a literal pipe)
//! field    := "text" | attribute-name
//! cast     := "time"
//! ```
//!
//! A JSON config maps field names to specs. String values are gathered into
//! one `Structured("html", ...)` group; an object value is a group whose key
//! is its root selector. Groups run in declaration order with the `html`
//! group last, so its fields win ties.

use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::extractors::structured::{FieldSpec, StructuredExtractor};
use crate::extractors::Extractor;

/// Canonical spelling of a field name, accepting snake_case aliases.
pub fn normalize_field_name(name: &str) -> String {
    match name {
        "published_at" => "publishedAt",
        "updated_at" | "modified_at" | "updatedAt" => "modifiedAt",
        "image_url" => "imageURL",
        "full_text" => "fullText",
        "found_at" => "foundAt",
        "source_id" => "sourceID",
        "content_type" => "contentType",
        other => other,
    }
    .to_string()
}

/// A parsed but not yet compiled DSL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecParts {
    pub selector: String,
    pub field: String,
    pub optional: bool,
    pub time: bool,
}

/// Byte index of the last `|` not preceded by a backslash.
fn last_unescaped_pipe(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (0..bytes.len())
        .rev()
        .find(|&i| bytes[i] == b'|' && (i == 0 || bytes[i - 1] != b'\\'))
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Splits a DSL string into its parts without compiling the selector.
pub fn parse_spec(spec: &str) -> Result<SpecParts, ExtractError> {
    let invalid = |reason: String| ExtractError::invalid_spec(format!("{:?}: {}", spec, reason));

    let pipe = last_unescaped_pipe(spec).ok_or_else(|| invalid("missing '|'".into()))?;
    let selector = spec[..pipe].trim().replace("\\|", "|");
    if selector.is_empty() {
        return Err(invalid("empty selector".into()));
    }

    let rest = spec[pipe + 1..].trim();
    let (head, cast) = match rest.split_once("::") {
        Some((head, cast)) => (head.trim(), Some(cast.trim())),
        None => (rest, None),
    };

    let time = match cast {
        None => false,
        Some("time") => true,
        Some(other) => return Err(invalid(format!("cast to '{}' not supported", other))),
    };

    let split = head.find(|c: char| !is_field_char(c)).unwrap_or(head.len());
    let (field, modifier) = head.split_at(split);
    if field.is_empty() {
        return Err(invalid("empty field".into()));
    }
    let optional = match modifier.trim() {
        "" => false,
        "?" => true,
        other => return Err(invalid(format!("modifier '{}' not supported", other))),
    };

    Ok(SpecParts {
        selector,
        field: field.to_string(),
        optional,
        time,
    })
}

/// Compiles one DSL string into a primitive or temporal extractor.
pub fn from_str(spec: &str) -> Result<Extractor, ExtractError> {
    let SpecParts {
        selector,
        field,
        optional,
        time,
    } = parse_spec(spec)?;

    match (field.as_str(), time, optional) {
        ("text", false, false) => Extractor::text(&selector),
        ("text", false, true) => Extractor::opt_text(&selector),
        ("text", true, false) => Extractor::time_text(&selector),
        ("text", true, true) => Extractor::opt_time_text(&selector),
        (attr, false, false) => Extractor::attribute(&selector, attr),
        (attr, false, true) => Extractor::opt_attribute(&selector, attr),
        (attr, true, false) => Extractor::time_attribute(&selector, attr),
        (attr, true, true) => Extractor::opt_time_attribute(&selector, attr),
    }
}

/// Compiles a JSON config string. See the module docs for the layout.
pub fn from_json(json: &str) -> Result<Vec<Extractor>, ExtractError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ExtractError::invalid_spec(format!("invalid JSON: {}", e)))?;
    from_value(&value)
}

/// Compiles an already parsed JSON config.
pub fn from_value(value: &Value) -> Result<Vec<Extractor>, ExtractError> {
    let object = value
        .as_object()
        .ok_or_else(|| ExtractError::invalid_spec("extractor config must be a JSON object"))?;
    if object.is_empty() {
        return Err(ExtractError::invalid_spec("empty extractor config"));
    }

    let mut groups = Vec::new();
    let mut document_fields = Vec::new();
    for (key, value) in object {
        match value {
            Value::String(spec) => document_fields.push(field_from(key, spec)?),
            Value::Object(nested) => groups.push(Extractor::Structured(group_from(key, nested)?)),
            other => return Err(not_a_spec(key, other)),
        }
    }

    if !document_fields.is_empty() {
        groups.push(Extractor::Structured(StructuredExtractor::new(
            "html",
            document_fields,
        )?));
    }
    Ok(groups)
}

fn field_from(key: &str, spec: &str) -> Result<FieldSpec, ExtractError> {
    let extractor = from_str(spec).map_err(|e| match e {
        ExtractError::InvalidSpec { reason } => {
            ExtractError::invalid_spec(format!("field '{}': {}", key, reason))
        }
        other => other,
    })?;
    Ok(FieldSpec::named(normalize_field_name(key), extractor))
}

/// A nested object: `selector` scopes its entries; nested objects become inline groups.
fn group_from(selector: &str, object: &Map<String, Value>) -> Result<StructuredExtractor, ExtractError> {
    if object.is_empty() {
        return Err(ExtractError::invalid_spec(format!(
            "empty group for '{}'",
            selector
        )));
    }
    let mut fields = Vec::with_capacity(object.len());
    for (key, value) in object {
        match value {
            Value::String(spec) => fields.push(field_from(key, spec)?),
            Value::Object(nested) => fields.push(FieldSpec::Inline(Extractor::Structured(
                group_from(key, nested)?,
            ))),
            other => return Err(not_a_spec(key, other)),
        }
    }
    StructuredExtractor::new(selector, fields)
}

fn not_a_spec(key: &str, value: &Value) -> ExtractError {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Array(_) => "array",
        Value::String(_) | Value::Object(_) => "value",
    };
    ExtractError::invalid_spec(format!(
        "field '{}': expected a spec string or object, found {}",
        key, kind
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::test_support::*;
    use crate::extractors::{ExtractorResult, FieldMap};
    use chrono::TimeZone;
    use chrono_tz::America::Sao_Paulo;
    use pretty_assertions::assert_eq;

    const LINKS: &str = r##"<p>other</p><p>Foo <a href="#foo">link</a></p><a href="#bla">foo</a>"##;
    const NO_LINKS: &str = r##"<p>other</p><div>Foo <a href="#foo">link</a></div><a href="#bla">foo</a>"##;

    fn march_20() -> ExtractorResult {
        ExtractorResult::Time(
            Sao_Paulo
                .with_ymd_and_hms(2020, 3, 20, 18, 30, 0)
                .single()
                .unwrap()
                .fixed_offset(),
        )
    }

    #[test]
    fn test_parse_spec_parts() {
        assert_eq!(
            parse_spec(" time.pub | pubdate?::time ").unwrap(),
            SpecParts {
                selector: "time.pub".into(),
                field: "pubdate".into(),
                optional: true,
                time: true,
            }
        );
        assert_eq!(parse_spec("a[href] | data-src").unwrap().field, "data-src");
    }

    #[test]
    fn test_escaped_pipe_stays_in_selector() {
        let parts = parse_spec(r#"a[title="x\|y"] | href"#).unwrap();
        assert_eq!(parts.selector, r#"a[title="x|y"]"#);
        assert_eq!(parts.field, "href");
    }

    #[test]
    fn test_invalid_specs() {
        for bad in [
            "p a",
            " | text",
            "p a | ",
            "p a | text!",
            "p a | text??",
            "p a | text::date",
            "p[ | text",
        ] {
            let err = from_str(bad).unwrap_err();
            assert!(err.is_invalid_spec(), "{} -> {:?}", bad, err);
        }
    }

    #[test]
    fn test_required_attribute() {
        let e = from_str("p a | href").unwrap();
        assert_eq!(run(&e, LINKS).unwrap(), text("#foo"));
        assert!(run(&e, NO_LINKS).unwrap_err().is_not_found());
    }

    #[test]
    fn test_optional_attribute() {
        let e = from_str("p a | href?").unwrap();
        assert_eq!(run(&e, LINKS).unwrap(), text("#foo"));
        assert_eq!(run(&e, NO_LINKS).unwrap(), ExtractorResult::Absent);
    }

    #[test]
    fn test_text() {
        assert_eq!(run(&from_str("p a | text").unwrap(), LINKS).unwrap(), text("link"));
        assert_eq!(
            run(&from_str("p a | text?").unwrap(), NO_LINKS).unwrap(),
            ExtractorResult::Absent
        );
    }

    #[test]
    fn test_time_casts() {
        let attr = from_str("time.pub | pubdate::time").unwrap();
        let html = r#"<p>Foo <time class="pub" pubdate="2020-03-20 18:30:00">x</time></p>"#;
        assert_eq!(run(&attr, html).unwrap(), march_20());

        let text_time = from_str("p em | text?::time").unwrap();
        assert_eq!(
            run(&text_time, "<p>Foo <em>20/03/2020 18:30</em></p>").unwrap(),
            march_20()
        );
        assert_eq!(
            run(&text_time, "<div>Foo <em>20/03/2020 18:30</em></div>").unwrap(),
            ExtractorResult::Absent
        );
    }

    #[test]
    fn test_field_name_aliases() {
        assert_eq!(normalize_field_name("published_at"), "publishedAt");
        assert_eq!(normalize_field_name("updated_at"), "modifiedAt");
        assert_eq!(normalize_field_name("modified_at"), "modifiedAt");
        assert_eq!(normalize_field_name("image_url"), "imageURL");
        assert_eq!(normalize_field_name("full_text"), "fullText");
        assert_eq!(normalize_field_name("title"), "title");
    }

    #[test]
    fn test_from_json_groups() {
        let extractors = from_json(
            r#"{
                "title": "h1 | text",
                "article.main": { "published_at": "time | datetime::time" },
                "image_url": "img.destaque | src?"
            }"#,
        )
        .unwrap();
        assert_eq!(extractors.len(), 2);

        let Extractor::Structured(group) = &extractors[0] else {
            panic!("expected a group");
        };
        assert_eq!(group.selector(), "article.main");
        let Extractor::Structured(html) = &extractors[1] else {
            panic!("expected the html group");
        };
        assert_eq!(html.selector(), "html");

        let page = r#"<h1>Título</h1><article class="main"><time datetime="2020-03-20 18:30:00">x</time></article>"#;
        let ExtractorResult::Struct(fields) = run(&extractors[0], page).unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(fields["publishedAt"], march_20());

        let ExtractorResult::Struct(fields) = run(&extractors[1], page).unwrap() else {
            panic!("expected a map");
        };
        let mut expected = FieldMap::new();
        expected.insert("title".into(), text("Título"));
        expected.insert("imageURL".into(), ExtractorResult::Absent);
        assert_eq!(fields, expected);
    }

    #[test]
    fn test_from_json_nested_groups_flatten() {
        let extractors = from_json(
            r#"{ "article": { "title": "h1 | text", "footer": { "author": "span | text" } } }"#,
        )
        .unwrap();
        let page = "<article><h1>T</h1><footer><span>Ana</span></footer></article>";
        let ExtractorResult::Struct(fields) = run(&extractors[0], page).unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(fields["title"], text("T"));
        assert_eq!(fields["author"], text("Ana"));
    }

    #[test]
    fn test_from_json_rejects_malformed_configs() {
        for bad in [
            "[]",
            "{}",
            r#"{"title": 1}"#,
            r#"{"title": "h1 | text", "bad": "p | text!"}"#,
            r#"{"article": {}}"#,
            "{not json",
        ] {
            let err = from_json(bad).unwrap_err();
            assert!(err.is_invalid_spec(), "{} -> {:?}", bad, err);
        }
    }
}
