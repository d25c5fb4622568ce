//! Query parameter definitions
//!
//! Raw string parameters as they arrive on the query string, and the
//! typed values the handlers work with.

use std::fmt::Display;
use std::str::FromStr;

use crate::domain::DomainError;

// =========================================================================
// Parameter parsing
// =========================================================================

/// Parse an optional filter parameter.
///
/// Absent and empty values yield `None`. Values that fail to parse also
/// yield `None`: a malformed filter disables that filter rather than
/// failing the request.
pub fn parse_optional<T>(field: &'static str, raw: Option<&str>) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = raw.filter(|value| !value.is_empty())?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(field, value = raw, error = %e, "Ignoring unparsable filter parameter");
            None
        }
    }
}

/// Parse a required parameter, failing with `MissingParameter` when it is
/// absent, empty or not parsable.
pub fn parse_required<T: FromStr>(field: &'static str, raw: Option<&str>) -> Result<T, DomainError> {
    raw.filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
        .ok_or(DomainError::MissingParameter(field))
}

/// Query string as ordered key/value pairs
pub type QueryPairs = Vec<(String, String)>;

/// First value for `key`; later repeats of a parameter are ignored.
fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

// =========================================================================
// Listing
// =========================================================================

/// Raw listing parameters
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub user: Option<String>,
    pub day: Option<String>,
    pub threshold: Option<String>,
}

impl ListParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            user: first_value(pairs, "user"),
            day: first_value(pairs, "day"),
            threshold: first_value(pairs, "threshold"),
        }
    }
}

/// Independent listing filters; every `None` means "no filter".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Account on either side of the transfer
    pub user: Option<i64>,
    /// Any timestamp within the UTC day to list
    pub day: Option<i64>,
    /// Minimum `sum`, inclusive
    pub threshold: Option<i64>,
}

impl ListFilter {
    pub fn with_user(mut self, user: i64) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_day(mut self, day: i64) -> Self {
        self.day = Some(day);
        self
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

impl From<&ListParams> for ListFilter {
    fn from(params: &ListParams) -> Self {
        Self {
            user: parse_optional("user", params.user.as_deref()),
            day: parse_optional("day", params.day.as_deref()),
            threshold: parse_optional("threshold", params.threshold.as_deref()),
        }
    }
}

// =========================================================================
// Balance
// =========================================================================

/// Raw balance parameters
#[derive(Debug, Clone, Default)]
pub struct BalanceParams {
    pub user: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

impl BalanceParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            user: first_value(pairs, "user"),
            since: first_value(pairs, "since"),
            until: first_value(pairs, "until"),
        }
    }
}

/// Net balance request over `[since, until)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceQuery {
    pub user: i64,
    pub since: i64,
    pub until: i64,
}

impl BalanceQuery {
    pub fn new(user: i64, since: i64, until: i64) -> Self {
        Self { user, since, until }
    }
}

impl TryFrom<&BalanceParams> for BalanceQuery {
    type Error = DomainError;

    /// Fields are checked in the order `user`, `since`, `until`; the first
    /// failure is reported.
    fn try_from(params: &BalanceParams) -> Result<Self, Self::Error> {
        Ok(Self {
            user: parse_required("user", params.user.as_deref())?,
            since: parse_required("since", params.since.as_deref())?,
            until: parse_required("until", params.until.as_deref())?,
        })
    }
}
