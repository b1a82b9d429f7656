//! OAI-PMH request parameters
//!
//! Builds the query strings for the verbs the crawl seed issues and
//! validates the datestamps that bound a selective harvest.

use crate::ConfigError;
use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt;
use url::Url;

/// An OAI-PMH datestamp at day or second granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OaiDate {
    Day(NaiveDate),
    Second(NaiveDateTime),
}

impl OaiDate {
    const DAY_FORMAT: &'static str = "%Y-%m-%d";
    const SECOND_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%SZ";

    /// Parses `YYYY-MM-DD` or `YYYY-MM-DDThh:mm:ssZ`
    ///
    /// Anything else, including unpadded fields, is rejected: the server
    /// would answer `badArgument` and the harvest is misconfigured either way.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        if let Ok(date) = NaiveDate::parse_from_str(value, Self::DAY_FORMAT) {
            if date.format(Self::DAY_FORMAT).to_string() == value {
                return Ok(Self::Day(date));
            }
        }
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, Self::SECOND_FORMAT) {
            if datetime.format(Self::SECOND_FORMAT).to_string() == value {
                return Ok(Self::Second(datetime));
            }
        }
        Err(ConfigError::InvalidDate(value.to_string()))
    }

    fn is_day(&self) -> bool {
        matches!(self, Self::Day(_))
    }

    fn compare(&self, other: &OaiDate) -> Option<Ordering> {
        match (self, other) {
            (Self::Day(a), Self::Day(b)) => Some(a.cmp(b)),
            (Self::Second(a), Self::Second(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for OaiDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(date) => write!(f, "{}", date.format(Self::DAY_FORMAT)),
            Self::Second(datetime) => write!(f, "{}", datetime.format(Self::SECOND_FORMAT)),
        }
    }
}

/// Optional `from`/`until` bounds of a selective harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<OaiDate>,
    pub until: Option<OaiDate>,
}

impl DateRange {
    /// Parses and cross-checks both bounds
    pub fn parse(from: Option<&str>, until: Option<&str>) -> Result<Self, ConfigError> {
        let from = from.map(OaiDate::parse).transpose()?;
        let until = until.map(OaiDate::parse).transpose()?;

        if let (Some(f), Some(u)) = (&from, &until) {
            if f.is_day() != u.is_day() {
                return Err(ConfigError::Validation(format!(
                    "from '{}' and until '{}' must use the same granularity",
                    f, u
                )));
            }
            if f.compare(u) == Some(Ordering::Greater) {
                return Err(ConfigError::Validation(format!(
                    "from '{}' is after until '{}'",
                    f, u
                )));
            }
        }

        Ok(Self { from, until })
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.until.is_none()
    }
}

/// A single OAI-PMH request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OaiRequest {
    Identify,
    ListRecords {
        metadata_prefix: String,
        set_spec: Option<String>,
        range: DateRange,
    },
    /// Continuation of a `ListRecords` result
    Resume { token: String },
}

impl OaiRequest {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Identify => "Identify",
            Self::ListRecords { .. } | Self::Resume { .. } => "ListRecords",
        }
    }

    /// Query parameters in the order they are sent
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("verb", self.verb().to_string())];
        match self {
            Self::Identify => {}
            Self::ListRecords {
                metadata_prefix,
                set_spec,
                range,
            } => {
                params.push(("metadataPrefix", metadata_prefix.clone()));
                if let Some(set) = set_spec {
                    params.push(("set", set.clone()));
                }
                if let Some(from) = &range.from {
                    params.push(("from", from.to_string()));
                }
                if let Some(until) = &range.until {
                    params.push(("until", until.to_string()));
                }
            }
            Self::Resume { token } => params.push(("resumptionToken", token.clone())),
        }
        params
    }

    /// Resolves the request against an OAI-PMH endpoint
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in self.parameters() {
                query.append_pair(name, &value);
            }
        }
        url
    }
}
