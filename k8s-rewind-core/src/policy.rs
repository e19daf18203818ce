use std::{fmt::Display, num::NonZeroU64, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static POLICY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<sign>[+-])?(?P<value>\d+)$").expect("policy regex is valid"));

/// Which revision a deployment should be rolled back to.
///
/// Only an explicit revision number and the `-1` relative step are executable.
/// Any other relative offset (most notably `+1`, "roll forward") is accepted as
/// input so it can be reported, but every workload is skipped when it's used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackPolicy {
    SpecificRevision(NonZeroU64),
    PreviousRevision,
    Relative(i64),
}

impl RollbackPolicy {
    pub fn is_supported(&self) -> bool {
        !matches!(self, RollbackPolicy::Relative(_))
    }

    pub fn describe(&self) -> String {
        match self {
            RollbackPolicy::SpecificRevision(revision) => format!("revision {revision}"),
            RollbackPolicy::PreviousRevision => "previous revision (-1)".to_owned(),
            RollbackPolicy::Relative(offset) => format!("relative offset {offset:+} (unsupported)"),
        }
    }
}

impl Display for RollbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackPolicy::SpecificRevision(revision) => write!(f, "{revision}"),
            RollbackPolicy::PreviousRevision => f.write_str("-1"),
            RollbackPolicy::Relative(offset) => write!(f, "{offset:+}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyParseError {
    #[error("Rollback policy can't be empty!")]
    Empty,
    #[error("'{}' is not a valid rollback policy! Expected '-1', '+1' or a revision number", .0)]
    Malformed(String),
    #[error("Revision numbers start at 1, '{}' is not a valid revision!", .0)]
    ZeroRevision(String),
    #[error("'{}' is out of range!", .0)]
    OutOfRange(String),
}

impl FromStr for RollbackPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            return Err(PolicyParseError::Empty);
        }

        let captures = POLICY_REGEX
            .captures(s)
            .ok_or_else(|| PolicyParseError::Malformed(s.to_owned()))?;
        let value: u64 = captures["value"]
            .parse()
            .map_err(|_| PolicyParseError::OutOfRange(s.to_owned()))?;

        match captures.name("sign").map(|m| m.as_str()) {
            None => NonZeroU64::new(value)
                .map(RollbackPolicy::SpecificRevision)
                .ok_or_else(|| PolicyParseError::ZeroRevision(s.to_owned())),
            Some(_) if value == 0 => Err(PolicyParseError::ZeroRevision(s.to_owned())),
            Some("-") if value == 1 => Ok(RollbackPolicy::PreviousRevision),
            Some(sign) => {
                let offset =
                    i64::try_from(value).map_err(|_| PolicyParseError::OutOfRange(s.to_owned()))?;

                Ok(RollbackPolicy::Relative(if sign == "-" { -offset } else { offset }))
            }
        }
    }
}
