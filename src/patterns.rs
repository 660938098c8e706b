//! Text patterns used by layout detection
//!
//! All detection rules live here as data: field-name patterns, the time-range
//! pattern, the document date pattern and the year-marker table.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ground names that do not follow the `<name> <digit><letter>` shape
pub const KNOWN_GROUNDS: &[&str] = &[
    "TALIN TEKONURMI",
    "KESKUSPUISTON KENTTÄ",
    "PALLOKENTTÄ ETELÄ",
    "PALLOKENTTÄ POHJOINEN",
];

/// Age cohorts that may be embedded in team names as a two-digit marker
pub const YEAR_COHORTS: &[&str] = &[
    "2008", "2009", "2010", "2011", "2012", "2013", "2014", "2015", "2016", "2017", "2018",
    "2019", "2020",
];

static TIME_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}\.\d{2}\s*-\s*\d{2}\.\d{2}$").unwrap());

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}\.\d{1,2}\.\d{4}").unwrap());

static NUMBERED_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\p{L}[\p{L}-]*)\s+(\d{1,2})([a-z])$").unwrap());

static YEAR_MARKERS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    YEAR_COHORTS
        .iter()
        .map(|&label| {
            let marker = &label[2..];
            let re = Regex::new(&format!(r"(?i)\b[PT]?{}\b", marker)).unwrap();
            (re, label)
        })
        .collect()
});

/// `true` when `text` is exactly a `HH.MM - HH.MM` time range
pub fn is_time_range(text: &str) -> bool {
    TIME_RANGE_RE.is_match(text)
}

/// First `D.M.YYYY` date found in `text`
pub fn find_date(text: &str) -> Option<&str> {
    DATE_RE.find(text).map(|m| m.as_str())
}

/// A field name of the form `<base> <number><letter>`, e.g. "FIELD 3C"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedField {
    pub base: String,
    pub number: String,
    pub letter: char,
}

impl NumberedField {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = NUMBERED_FIELD_RE.captures(text.trim())?;
        let letter = caps[3].chars().next()?.to_ascii_uppercase();
        Some(Self {
            base: caps[1].to_string(),
            number: caps[2].to_string(),
            letter,
        })
    }

    /// The sub-field sharing this field's pitch ("3A" pairs with "3B").
    ///
    /// Only the first letter of a pair (A, C, E, ...) has a partner.
    pub fn partner_letter(&self) -> Option<char> {
        let offset = (self.letter as u8).checked_sub(b'A')?;
        if offset % 2 == 0 && offset < 25 {
            Some((b'A' + offset + 1) as char)
        } else {
            None
        }
    }

    pub fn with_letter(&self, letter: char) -> String {
        format!("{} {}{}", self.base, self.number, letter)
    }
}

/// Compiled field-name patterns
#[derive(Debug, Clone)]
pub struct PatternSet {
    grounds: Vec<Regex>,
}

impl PatternSet {
    /// Built-in ground names plus any extra names from configuration
    pub fn new(extra_grounds: &[String]) -> Self {
        let grounds = KNOWN_GROUNDS
            .iter()
            .copied()
            .chain(extra_grounds.iter().map(String::as_str))
            .filter_map(|name| ground_regex(name))
            .collect();
        Self { grounds }
    }

    /// `true` when the token text names a field
    pub fn is_field_name(&self, text: &str) -> bool {
        let text = text.trim();
        NUMBERED_FIELD_RE.is_match(text) || self.grounds.iter().any(|re| re.is_match(text))
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn ground_regex(name: &str) -> Option<Regex> {
    let words: Vec<String> = name.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i)^{}(?:\s+\d{{1,2}}[a-z]?)?$", words.join(r"\s+"));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Ignoring ground name {:?}: {}", name, e);
            None
        }
    }
}

/// Scan `text` for an embedded cohort marker; earliest match wins
pub fn find_year_marker(text: &str) -> Option<&'static str> {
    YEAR_MARKERS
        .iter()
        .filter_map(|(re, label)| re.find(text).map(|m| (m.start(), *label)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, label)| label)
}
