// ABOUTME: Locale-aware date parsing for Brazilian news pages, normalized to America/Sao_Paulo.
// ABOUTME: Applies Portuguese rewrite rules to a canonical form before standard and fuzzy fallbacks.

//! Temporal parser.
//!
//! Government sites publish dates in a handful of Portuguese idioms
//! ("21/02/2020 - 16h50", "21 de fevereiro de 2020 às 16:26", ...). Each idiom
//! is a [`RewriteRule`] that turns a match into the canonical
//! `DD/MM/YYYY HH:MM:SS` form understood by a single day-first parser. Inputs
//! no rule recognizes go through RFC3339/RFC2822, a list of common layouts and
//! finally `dateparser`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::America::Sao_Paulo;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::ExtractError;

/// Timestamps produced by the engine, always carrying the Sao Paulo offset in effect.
pub type Timestamp = DateTime<FixedOffset>;

const CANONICAL_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// A locale idiom and the function mapping its captures to the canonical form.
struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    rewrite: fn(&Captures) -> Option<String>,
}

static RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule {
            name: "numeric",
            pattern: Regex::new(
                r"^(\d{1,2})/(\d{1,2})/(\d{2,4})(?:\s|-)+(\d{1,2})[hH:](\d{1,2})(?:[mM:](\d{1,2})s?)?[mM]?$",
            )
            .unwrap(),
            rewrite: rewrite_numeric,
        },
        RewriteRule {
            name: "long-form",
            pattern: Regex::new(
                r"(?i)^(\d{1,2})º?\s+de\s+(\p{L}+)\s+de\s+(\d{4})(?:\s*(?:,|-|às|as|a\s+s)?\s*(\d{1,2})[hH:](\d{1,2})(?:[mM:](\d{1,2}))?)?$",
            )
            .unwrap(),
            rewrite: rewrite_long_form,
        },
        RewriteRule {
            name: "slash-month-ampm",
            pattern: Regex::new(
                r"(?i)^(\d{1,2})/(\p{L}+)\.?/(\d{4})\s+(\d{1,2}):(\d{1,2})\s*([ap])\.?\s?m\.?$",
            )
            .unwrap(),
            rewrite: rewrite_slash_month_ampm,
        },
    ]
});

/// Maps a Portuguese month name or abbreviation, accented or not, to its number.
pub fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().trim_end_matches('.') {
        "janeiro" | "jan" => 1,
        "fevereiro" | "fev" => 2,
        "março" | "marco" | "mar" => 3,
        "abril" | "abr" => 4,
        "maio" | "mai" => 5,
        "junho" | "jun" => 6,
        "julho" | "jul" => 7,
        "agosto" | "ago" => 8,
        "setembro" | "set" => 9,
        "outubro" | "out" => 10,
        "novembro" | "nov" => 11,
        "dezembro" | "dez" => 12,
        _ => return None,
    };
    Some(month)
}

fn capture_u32(caps: &Captures, idx: usize) -> Option<u32> {
    match caps.get(idx) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

fn expand_year(year: u32) -> u32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

fn canonical(day: u32, month: u32, year: u32, hour: u32, minute: u32, second: u32) -> String {
    format!(
        "{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
        day, month, year, hour, minute, second
    )
}

fn rewrite_numeric(caps: &Captures) -> Option<String> {
    Some(canonical(
        capture_u32(caps, 1)?,
        capture_u32(caps, 2)?,
        expand_year(capture_u32(caps, 3)?),
        capture_u32(caps, 4)?,
        capture_u32(caps, 5)?,
        capture_u32(caps, 6)?,
    ))
}

fn rewrite_long_form(caps: &Captures) -> Option<String> {
    Some(canonical(
        capture_u32(caps, 1)?,
        month_number(caps.get(2)?.as_str())?,
        capture_u32(caps, 3)?,
        capture_u32(caps, 4)?,
        capture_u32(caps, 5)?,
        capture_u32(caps, 6)?,
    ))
}

fn rewrite_slash_month_ampm(caps: &Captures) -> Option<String> {
    let hour = capture_u32(caps, 4)?;
    if hour == 0 || hour > 12 {
        return None;
    }
    let pm = caps.get(6)?.as_str().eq_ignore_ascii_case("p");
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    Some(canonical(
        capture_u32(caps, 1)?,
        month_number(caps.get(2)?.as_str())?,
        capture_u32(caps, 3)?,
        hour,
        capture_u32(caps, 5)?,
        0,
    ))
}

/// Interprets a wall-clock time in Sao Paulo, picking the earliest instant on DST overlaps.
fn localize(naive: &NaiveDateTime) -> Option<Timestamp> {
    Sao_Paulo
        .from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

fn normalize(dt: DateTime<impl TimeZone>) -> Timestamp {
    dt.with_timezone(&Sao_Paulo).fixed_offset()
}

/// Zero and epoch dates mean the source had no real date.
fn is_sentinel(dt: &Timestamp) -> bool {
    dt.timestamp() == 0 || dt.year() <= 1
}

/// Strict RFC3339 parse, as OpenGraph article times are declared.
pub fn parse_rfc3339(input: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(input.trim())
        .ok()
        .map(normalize)
        .filter(|dt| !is_sentinel(dt))
}

/// Parses a free-form date string into a Sao Paulo timestamp.
///
/// Returns `Ok(None)` for blank input and for sentinel (zero/epoch) dates, and
/// `UnparseableDate` only when every strategy fails.
pub fn parse_time(input: &str) -> Result<Option<Timestamp>, ExtractError> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(None);
    }

    match parse_any(s) {
        Some(dt) if is_sentinel(&dt) => Ok(None),
        Some(dt) => Ok(Some(dt)),
        None => Err(ExtractError::UnparseableDate {
            input: s.to_string(),
        }),
    }
}

fn parse_any(s: &str) -> Option<Timestamp> {
    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(s) {
            let Some(canonical) = (rule.rewrite)(&caps) else {
                continue;
            };
            if let Some(dt) = NaiveDateTime::parse_from_str(&canonical, CANONICAL_FORMAT)
                .ok()
                .and_then(|naive| localize(&naive))
            {
                tracing::trace!(rule = rule.name, input = s, "date matched locale rule");
                return Some(dt);
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(normalize(dt));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(normalize(dt));
    }

    let formats_with_tz = [
        // "2020-06-21T15:53:10-0300"
        "%Y-%m-%dT%H:%M:%S%z",
        // "2020-06-21 15:53:10 -03:00"
        "%Y-%m-%d %H:%M:%S %:z",
        // "2020-06-21 15:53:10 -0300"
        "%Y-%m-%d %H:%M:%S %z",
        // "2020-06-21T15:53-03:00"
        "%Y-%m-%dT%H:%M%:z",
    ];
    for fmt in &formats_with_tz {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(normalize(dt));
        }
    }

    // No offset given: the wall clock is Brazilian.
    let formats_naive = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    for fmt in &formats_naive {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(&naive);
        }
    }

    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return localize(&date.and_time(NaiveTime::MIN));
        }
    }

    dateparser::parse_with(s, &Sao_Paulo, NaiveTime::MIN)
        .ok()
        .map(normalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn civil(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        Sao_Paulo
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap()
            .fixed_offset()
    }

    #[test]
    fn test_numeric_with_h_separator() {
        let dt = parse_time("21/02/2020 16h50").unwrap().unwrap();
        assert_eq!(dt, civil(2020, 2, 21, 16, 50));
    }

    #[test]
    fn test_numeric_with_dash_between_date_and_time() {
        assert_eq!(
            parse_time("21/02/2020 - 16h50").unwrap(),
            Some(civil(2020, 2, 21, 16, 50))
        );
        assert_eq!(
            parse_time("21/02/2020 - 16:50").unwrap(),
            Some(civil(2020, 2, 21, 16, 50))
        );
    }

    #[test]
    fn test_numeric_single_digits_and_seconds() {
        let dt = parse_time("2/3/2021 9h05m30").unwrap().unwrap();
        assert_eq!(dt.day(), 2);
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.hour(), 9);
        assert_eq!(dt.minute(), 5);
        assert_eq!(dt.second(), 30);
    }

    #[test]
    fn test_numeric_is_day_first() {
        let dt = parse_time("05/11/2019 10:00").unwrap().unwrap();
        assert_eq!(dt.month(), 11);
        assert_eq!(dt.day(), 5);
    }

    #[test]
    fn test_long_form_portuguese() {
        assert_eq!(
            parse_time("21 de fevereiro de 2020 às 16:26").unwrap(),
            Some(civil(2020, 2, 21, 16, 26))
        );
        assert_eq!(
            parse_time("3 de Março de 2020 às 9h15").unwrap(),
            Some(civil(2020, 3, 3, 9, 15))
        );
        assert_eq!(
            parse_time("3 de marco de 2020").unwrap(),
            Some(civil(2020, 3, 3, 0, 0))
        );
    }

    #[test]
    fn test_slash_month_ampm() {
        assert_eq!(
            parse_time("10/jan/2020 3:15 pm").unwrap(),
            Some(civil(2020, 1, 10, 15, 15))
        );
        assert_eq!(
            parse_time("10/Dez/2019 12:05 AM").unwrap(),
            Some(civil(2019, 12, 10, 0, 5))
        );
    }

    #[test]
    fn test_rfc3339_is_normalized_to_sao_paulo() {
        let dt = parse_time("2020-06-21T18:53:10Z").unwrap().unwrap();
        assert_eq!(dt, civil(2020, 6, 21, 15, 53) + chrono::Duration::seconds(10));
        assert_eq!(dt.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_naive_iso_is_sao_paulo_wall_clock() {
        let dt = parse_time("2020-06-21 15:53:10").unwrap().unwrap();
        assert_eq!(dt.hour(), 15);
        assert_eq!(dt.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_blank_is_none() {
        assert_eq!(parse_time("").unwrap(), None);
        assert_eq!(parse_time("  \n ").unwrap(), None);
    }

    #[test]
    fn test_epoch_is_treated_as_missing() {
        assert_eq!(parse_time("1970-01-01T00:00:00Z").unwrap(), None);
    }

    #[test]
    fn test_garbage_is_unparseable() {
        let err = parse_time("publicado ontem").unwrap_err();
        assert!(err.is_unparseable_date());
    }

    #[test]
    fn test_month_table_variants() {
        assert_eq!(month_number("Março"), Some(3));
        assert_eq!(month_number("marco"), Some(3));
        assert_eq!(month_number("set."), Some(9));
        assert_eq!(month_number("march"), None);
    }
}
