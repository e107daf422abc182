//! Lenient date parsing for watch-list columns.

use chrono::NaiveDate;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Tried in order after month names have been expanded.
const FORMATS: [&str; 11] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d-%B-%Y",
    "%d-%B-%y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%B %d, %y",
    "%Y-%B-%d",
];

/// Textual placeholders for "no value".
pub fn is_absent(text: &str) -> bool {
    matches!(text.trim(), "" | "na" | "NA" | "N/A" | "nan" | "NaN" | "--")
}

/// Replaces month abbreviations ("Sep", "sept", "OCT") with full names.
pub fn normalize_months(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut word = String::new();
    for ch in text.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_alphabetic() {
            word.push(ch);
            continue;
        }
        if !word.is_empty() {
            out.push_str(expand_month(&word).unwrap_or(word.as_str()));
            word.clear();
        }
        out.push(ch);
    }
    out.pop();
    out
}

fn expand_month(word: &str) -> Option<&'static str> {
    if word.len() < 3 {
        return None;
    }
    let lower = word.to_ascii_lowercase();
    MONTHS
        .iter()
        .find(|m| m.to_ascii_lowercase().starts_with(&lower))
        .copied()
}

/// Parses the date formats found in exported watch-lists; `None` for
/// placeholders and anything unrecognised.
pub fn parse_lenient(text: &str) -> Option<NaiveDate> {
    if is_absent(text) {
        return None;
    }
    let text = text.trim();
    if let Some(date) = parse_compact(text) {
        return Some(date);
    }
    let normalized = normalize_months(text);
    let candidates = [
        normalized.as_str(),
        // drop a trailing time of day
        normalized.split_whitespace().next().unwrap_or_default(),
    ];
    candidates.iter().find_map(|candidate| {
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
    })
}

/// `YYYYMMDD` with no separators.
fn parse_compact(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = text[..4].parse().ok()?;
    let month = text[4..6].parse().ok()?;
    let day = text[6..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
