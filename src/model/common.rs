//! Enums shared across entities. Parsing is case-insensitive and happens at the request boundary.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: '{value}' (expected one of {})", .expected.join(", "))]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

/// Match `s` against `variants` ignoring ASCII case.
pub(crate) fn parse_variant<T: Copy>(
    kind: &'static str,
    s: &str,
    variants: &[(&'static str, T)],
    expected: &'static [&'static str],
) -> Result<T, ParseEnumError> {
    let s = s.trim();
    variants
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(s))
        .map(|(_, v)| *v)
        .ok_or_else(|| ParseEnumError {
            kind,
            value: s.to_string(),
            expected,
        })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "sort order",
            s,
            &[("asc", SortOrder::Asc), ("desc", SortOrder::Desc)],
            &["asc", "desc"],
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckStatus {
    Pass,
    Fail,
    Warn,
}

impl FromStr for HealthCheckStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "health check status",
            s,
            &[
                ("pass", HealthCheckStatus::Pass),
                ("fail", HealthCheckStatus::Fail),
                ("warn", HealthCheckStatus::Warn),
            ],
            &["pass", "fail", "warn"],
        )
    }
}

impl fmt::Display for HealthCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthCheckStatus::Pass => "pass",
            HealthCheckStatus::Fail => "fail",
            HealthCheckStatus::Warn => "warn",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ignoring_case() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!(" asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("Warn".parse::<HealthCheckStatus>().unwrap(), HealthCheckStatus::Warn);
    }

    #[test]
    fn reports_expected_values() {
        let err = "sideways".parse::<SortOrder>().unwrap_err();
        assert_eq!(err.to_string(), "invalid sort order: 'sideways' (expected one of asc, desc)");
    }
}
