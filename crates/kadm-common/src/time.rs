//! Semantic time values for principal attributes.
//!
//! The administration service stores times as seconds since the epoch and
//! durations as seconds, with `0` meaning "unset". These types give unset
//! values a meaning instead: an unset expiry never arrives, an unset
//! historical timestamp never happened, an unset lifetime is unbounded.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A point in time that may be infinitely far in the past or future.
///
/// Variant order gives the natural ordering: `NegInfinity < At(_) < PosInfinity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Moment {
    /// Before every representable time; an event that never happened.
    NegInfinity,
    At(DateTime<Utc>),
    /// After every representable time; a deadline that never arrives.
    PosInfinity,
}

impl Moment {
    /// Decode an expiry-like epoch value. Non-positive values mean "never expires".
    pub fn from_expiry_epoch(secs: i64) -> Self {
        if secs > 0 {
            DateTime::from_timestamp(secs, 0).map_or(Self::PosInfinity, Self::At)
        } else {
            Self::PosInfinity
        }
    }

    /// Decode a historical epoch value. Non-positive values mean "never happened".
    pub fn from_history_epoch(secs: i64) -> Self {
        if secs > 0 {
            DateTime::from_timestamp(secs, 0).map_or(Self::NegInfinity, Self::At)
        } else {
            Self::NegInfinity
        }
    }

    /// Encode for the wire. Infinities and pre-epoch times become `0`;
    /// sub-second precision is dropped.
    pub fn to_epoch(self) -> i64 {
        match self {
            Self::At(t) if t.timestamp() > 0 => t.timestamp(),
            _ => 0,
        }
    }

    pub fn from_timestamp(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self::At)
    }

    pub fn is_infinite(&self) -> bool {
        !matches!(self, Self::At(_))
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(t) => Some(*t),
            _ => None,
        }
    }
}

/// Truncates to whole seconds, the precision the service stores.
impl From<DateTime<Utc>> for Moment {
    fn from(t: DateTime<Utc>) -> Self {
        Self::At(t.trunc_subsecs(0))
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegInfinity => f.write_str("-infinity"),
            Self::At(t) => write!(f, "{}", t.to_rfc3339()),
            Self::PosInfinity => f.write_str("+infinity"),
        }
    }
}

/// A ticket lifetime, either bounded by a duration or unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifetime {
    Bounded(Duration),
    Unbounded,
}

impl Lifetime {
    /// Decode a duration in seconds. Non-positive values mean "unbounded".
    pub fn from_seconds(secs: i64) -> Self {
        if secs > 0 {
            Self::Bounded(Duration::from_secs(secs as u64))
        } else {
            Self::Unbounded
        }
    }

    /// Encode for the wire. Unbounded and sub-second durations become `0`.
    pub fn to_seconds(self) -> i64 {
        match self {
            Self::Bounded(d) if d.as_secs() >= 1 => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            _ => 0,
        }
    }

    pub fn hours(hours: u64) -> Self {
        Self::Bounded(Duration::from_secs(hours * 3600))
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl From<Duration> for Lifetime {
    fn from(d: Duration) -> Self {
        Self::Bounded(d)
    }
}
