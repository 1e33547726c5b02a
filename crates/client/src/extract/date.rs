//! Release date normalization.
//!
//! Album pages print dates like `March 20th, 2020`, `May 2001` or just
//! `1998`. Partial dates resolve to the first day of the missing unit.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)(st|nd|rd|th)").expect("invalid regex"));

/// Output layout for [`format_date`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    #[default]
    Iso,
    /// `DD.MM.YYYY`
    Dotted,
    /// `MM/DD/YYYY`
    Us,
}

impl DateFormat {
    fn pattern(self) -> &'static str {
        match self {
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::Dotted => "%d.%m.%Y",
            DateFormat::Us => "%m/%d/%Y",
        }
    }
}

/// Parse a page date and render it in `format`.
///
/// Returns an empty string for blank or unreadable input.
pub fn format_date(raw: &str, format: DateFormat) -> String {
    parse_date(raw).map(|d| d.format(format.pattern()).to_string()).unwrap_or_default()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = ORDINAL.replacen(trimmed, 1, "$1");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    // Month-year before day formats: "%B %d %Y" also matches "May 2001".
    for fmt in ["%B %Y", "%b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {cleaned}"), &format!("%d {fmt}")) {
            return plausible(date);
        }
    }

    for fmt in ["%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return plausible(date);
        }
    }

    if cleaned.len() == 4 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return cleaned.parse().ok().and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)).and_then(plausible);
    }

    None
}

/// Pages never carry years before 1000; anything earlier is a misread.
fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    (date.year() >= 1000).then_some(date)
}
