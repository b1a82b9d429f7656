//! Record filter rules
//!
//! A harvest restricted to one publication year keeps only the records
//! whose date tag carries that year. Evaluation is pure and total: a date
//! value that does not start with a year is simply not a match.

use crate::harvest::Record;
use crate::ConfigError;
use serde::Deserialize;

/// How a record's years are compared with the target year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YearMatch {
    /// Some date value's year equals the target year
    #[default]
    Equals,

    /// Some date value has a well-formed year, whatever it is.
    ///
    /// One publisher's harvester has always behaved this way. It keeps
    /// records from every year, so it is only used when asked for explicitly.
    AnyWellFormed,
}

/// Parses a configured target year: exactly four ASCII digits
pub fn parse_target_year(value: &str) -> Result<u16, ConfigError> {
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        value
            .parse()
            .map_err(|_| ConfigError::InvalidYear(value.to_string()))
    } else {
        Err(ConfigError::InvalidYear(value.to_string()))
    }
}

/// The year at the start of a date value, if it starts with four digits
pub fn leading_year(value: &str) -> Option<u16> {
    let prefix = value.trim_start().get(..4)?;
    if prefix.bytes().all(|b| b.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

/// A per-harvest inclusion rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    /// Tag path searched in the record metadata
    pub tag_path: String,
    pub year: u16,
    pub mode: YearMatch,
}

impl FilterRule {
    pub fn new(tag_path: impl Into<String>, year: &str, mode: YearMatch) -> Result<Self, ConfigError> {
        Ok(Self {
            tag_path: tag_path.into(),
            year: parse_target_year(year)?,
            mode,
        })
    }

    /// Decides whether a record belongs to this harvest
    pub fn matches(&self, record: &Record) -> bool {
        let mut years = record
            .values(&self.tag_path)
            .into_iter()
            .filter_map(leading_year);

        match self.mode {
            YearMatch::Equals => years.any(|year| year == self.year),
            YearMatch::AnyWellFormed => years.next().is_some(),
        }
    }
}

/// Free-function form of [`FilterRule::matches`]
pub fn matches(record: &Record, rule: &FilterRule) -> bool {
    rule.matches(record)
}
