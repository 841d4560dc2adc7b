// crates/rule-gate-core/src/duration.rs
// ============================================================================
// Module: Rule Durations
// Description: Prometheus-style duration values used by rule groups and rules.
// Purpose: Reject malformed `for`, `keep_firing_for`, and `interval` values.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Rule documents express durations as concatenated unit segments such as
//! `1h30m` or `500ms`. Units must appear at most once and in descending order
//! (`y`, `w`, `d`, `h`, `m`, `s`, `ms`). The bare literal `0` is accepted.
//!
//! ## Invariants
//! - Parsed values are stored as whole milliseconds.
//! - Overflowing inputs are rejected rather than saturated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Visitor;
use thiserror::Error;

// ============================================================================
// SECTION: Units
// ============================================================================

/// Milliseconds in one second.
const SECOND_MS: u64 = 1_000;
/// Milliseconds in one minute.
const MINUTE_MS: u64 = 60 * SECOND_MS;
/// Milliseconds in one hour.
const HOUR_MS: u64 = 60 * MINUTE_MS;
/// Milliseconds in one day.
const DAY_MS: u64 = 24 * HOUR_MS;

/// Duration units in the only order they may appear.
const UNITS: &[(&str, u64)] = &[
    ("y", 365 * DAY_MS),
    ("w", 7 * DAY_MS),
    ("d", DAY_MS),
    ("h", HOUR_MS),
    ("m", MINUTE_MS),
    ("s", SECOND_MS),
    ("ms", 1),
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Errors returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// Empty duration string.
    #[error("duration must not be empty")]
    Empty,
    /// Segment without digits or with an unknown unit.
    #[error("invalid duration {0:?}")]
    Malformed(String),
    /// Units repeated or out of descending order.
    #[error("duration {0:?} has units out of order")]
    OutOfOrder(String),
    /// Value does not fit in 64-bit milliseconds.
    #[error("duration {0:?} is too large")]
    Overflow(String),
}

/// A non-negative duration with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RuleDuration {
    /// Total duration in milliseconds.
    millis: u64,
}

impl RuleDuration {
    /// Builds a duration from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            millis,
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.millis
    }

    /// Parses a duration string such as `5m` or `1h30m`.
    ///
    /// # Errors
    ///
    /// Returns [`DurationError`] when the text is empty, malformed, out of
    /// order, or overflows.
    pub fn parse(text: &str) -> Result<Self, DurationError> {
        if text.is_empty() {
            return Err(DurationError::Empty);
        }
        if text == "0" {
            return Ok(Self::from_millis(0));
        }
        let mut rest = text;
        let mut last_rank: Option<usize> = None;
        let mut total: u64 = 0;
        while !rest.is_empty() {
            let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits_len == 0 {
                return Err(DurationError::Malformed(text.to_string()));
            }
            let (digits, tail) = rest.split_at(digits_len);
            let unit_len = tail.bytes().take_while(u8::is_ascii_alphabetic).count();
            let (unit, tail) = tail.split_at(unit_len);
            let rank = UNITS
                .iter()
                .position(|(name, _)| *name == unit)
                .ok_or_else(|| DurationError::Malformed(text.to_string()))?;
            if last_rank.is_some_and(|last| rank <= last) {
                return Err(DurationError::OutOfOrder(text.to_string()));
            }
            let value: u64 =
                digits.parse().map_err(|_| DurationError::Overflow(text.to_string()))?;
            total = value
                .checked_mul(UNITS[rank].1)
                .and_then(|segment| total.checked_add(segment))
                .ok_or_else(|| DurationError::Overflow(text.to_string()))?;
            last_rank = Some(rank);
            rest = tail;
        }
        Ok(Self::from_millis(total))
    }
}

impl fmt::Display for RuleDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis == 0 {
            return f.write_str("0s");
        }
        let mut remaining = self.millis;
        for (name, size) in UNITS {
            let count = remaining / size;
            if count > 0 {
                write!(f, "{count}{name}")?;
                remaining -= count * size;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for RuleDuration {
    type Err = DurationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

// ============================================================================
// SECTION: Serde
// ============================================================================

impl<'de> Deserialize<'de> for RuleDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RuleDurationVisitor)
    }
}

/// Accepts duration strings and the bare integer `0`.
struct RuleDurationVisitor;

impl Visitor<'_> for RuleDurationVisitor {
    type Value = RuleDuration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration such as 30s or 1h30m")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        RuleDuration::parse(value).map_err(E::custom)
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        RuleDuration::parse(&value.to_string()).map_err(E::custom)
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        RuleDuration::parse(&value.to_string()).map_err(E::custom)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
