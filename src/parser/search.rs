//! Readings search grammar.
//!
//! A search string is a single predicate, sniffed by field prefix:
//! `device:lab-1`, `ts:2024-01-15`, `t:>25`, `t:20-30`, `h:55`,
//! `co2:>=800`. A string without a recognized prefix is a
//! case-insensitive substring match against `device_id`.

use regex::Regex;
use std::sync::OnceLock;

/// Numeric reading columns addressable from the search grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    TemperatureC,
    HumidityPct,
    Lux,
    Sound,
    Co2Ppm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Eq(f64),
    Gt(f64),
    Lt(f64),
    Ge(f64),
    Le(f64),
    /// Inclusive on both bounds.
    Between(f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchFilter {
    /// Substring match against `device_id`, case-insensitive.
    Device(String),
    /// Calendar-date match against `ts` (`YYYY-MM-DD`).
    DateEquals(String),
    /// Substring match against the textual rendering of `ts`.
    TsContains(String),
    Numeric {
        field: NumericField,
        cmp: Comparison,
    },
}

/// Parse a raw search string into a filter. Empty and whitespace-only
/// input yields no filter. Malformed values behind a recognized numeric
/// prefix fall back to the default device substring match rather than
/// erroring, matching the forgiving behavior of the search box.
#[must_use]
pub fn parse_search(search: &str) -> Option<SearchFilter> {
    let trimmed = search.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some((prefix, value)) = trimmed.split_once(':') {
        let value = value.trim();
        if !value.is_empty() {
            match prefix.to_lowercase().as_str() {
                "d" | "device" => return Some(SearchFilter::Device(value.to_string())),
                "ts" | "date" | "time" => return Some(parse_ts_value(value)),
                "t" | "temp" => {
                    if let Some(cmp) = parse_numeric_value(value) {
                        return Some(SearchFilter::Numeric {
                            field: NumericField::TemperatureC,
                            cmp,
                        });
                    }
                }
                "h" | "humidity" => {
                    if let Some(cmp) = parse_numeric_value(value) {
                        return Some(SearchFilter::Numeric {
                            field: NumericField::HumidityPct,
                            cmp,
                        });
                    }
                }
                "lux" | "l" => {
                    if let Some(cmp) = parse_numeric_value(value) {
                        return Some(SearchFilter::Numeric {
                            field: NumericField::Lux,
                            cmp,
                        });
                    }
                }
                "s" | "sound" => {
                    if let Some(cmp) = parse_numeric_value(value) {
                        return Some(SearchFilter::Numeric {
                            field: NumericField::Sound,
                            cmp,
                        });
                    }
                }
                "co2" | "air" | "aq" => {
                    if let Some(cmp) = parse_numeric_value(value) {
                        return Some(SearchFilter::Numeric {
                            field: NumericField::Co2Ppm,
                            cmp,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    Some(SearchFilter::Device(trimmed.to_string()))
}

/// `YYYY-MM-DD` matches the calendar date; anything else is a substring
/// match against the timestamp text.
fn parse_ts_value(value: &str) -> SearchFilter {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("Invalid regex pattern defined in code")
    });

    if re.is_match(value)
        && chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
    {
        SearchFilter::DateEquals(value.to_string())
    } else {
        SearchFilter::TsContains(value.to_string())
    }
}

/// Range (`20-30`), operator (`>25`, `>=25`, `<25`, `<=25`, `=25`) or
/// bare exact value (`25`). Ranges are unsigned; operators and exact
/// values accept anything `f64` parses.
fn parse_numeric_value(value: &str) -> Option<Comparison> {
    static RANGE_RE: OnceLock<Regex> = OnceLock::new();
    let range_re = RANGE_RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)?)-(\d+(?:\.\d+)?)$")
            .expect("Invalid regex pattern defined in code")
    });

    if let Some(caps) = range_re.captures(value) {
        let low: f64 = caps.get(1)?.as_str().parse().ok()?;
        let high: f64 = caps.get(2)?.as_str().parse().ok()?;
        return Some(Comparison::Between(low, high));
    }

    if let Some(rest) = value.strip_prefix(">=") {
        return rest.trim().parse().ok().map(Comparison::Ge);
    }
    if let Some(rest) = value.strip_prefix("<=") {
        return rest.trim().parse().ok().map(Comparison::Le);
    }
    if let Some(rest) = value.strip_prefix('>') {
        return rest.trim().parse().ok().map(Comparison::Gt);
    }
    if let Some(rest) = value.strip_prefix('<') {
        return rest.trim().parse().ok().map(Comparison::Lt);
    }
    if let Some(rest) = value.strip_prefix('=') {
        return rest.trim().parse().ok().map(Comparison::Eq);
    }

    value.parse().ok().map(Comparison::Eq)
}
