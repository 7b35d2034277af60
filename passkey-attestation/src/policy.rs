//! Replaceable checks injected into validators.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{AttestationError, PolicyError, StructuralError};

/// Decides whether a statement's version is acceptable.
///
/// Implementations must be safe to share between concurrent ceremonies; they are held behind an
/// `Arc` by the validators.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
pub trait VersionPolicy {
    /// Check `version`, returning it as a number when accepted.
    ///
    /// A version that is not a number is a [`StructuralError`]; a number the deployment does not
    /// accept is a [`PolicyError`].
    fn validate(&self, version: &str) -> Result<u64, AttestationError>;
}

/// Accept any non-negative integer version at or above a minimum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinimumVersion {
    minimum: Option<u64>,
}

impl MinimumVersion {
    /// Accept any non-negative version.
    pub fn any() -> Self {
        Self { minimum: None }
    }

    /// Accept versions at or above `minimum`.
    pub fn at_least(minimum: u64) -> Self {
        Self {
            minimum: Some(minimum),
        }
    }
}

impl From<Option<u64>> for MinimumVersion {
    fn from(minimum: Option<u64>) -> Self {
        Self { minimum }
    }
}

impl VersionPolicy for MinimumVersion {
    fn validate(&self, version: &str) -> Result<u64, AttestationError> {
        let parsed = version
            .parse::<i64>()
            .map_err(|e| StructuralError::MalformedField {
                field: "ver",
                reason: e.to_string(),
            })?;
        let version = u64::try_from(parsed).map_err(|_| PolicyError::NegativeVersion(parsed))?;
        match self.minimum {
            Some(minimum) if version < minimum => {
                Err(PolicyError::VersionTooLow { version, minimum }.into())
            }
            _ => Ok(version),
        }
    }
}

/// The interval around the ceremony time a signed timestamp must fall in. Both ends are
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    backward: Duration,
    forward: Duration,
}

impl FreshnessWindow {
    /// A window from `backward` before to `forward` after the ceremony time.
    pub fn new(backward: Duration, forward: Duration) -> Self {
        Self { backward, forward }
    }

    /// Check a timestamp in milliseconds since the Unix epoch against `ceremony_time`.
    ///
    /// The window is computed at nanosecond precision, so a ceremony time with a sub-millisecond
    /// part never widens it.
    pub fn check(&self, timestamp_ms: i64, ceremony_time: SystemTime) -> Result<(), PolicyError> {
        let now = unix_nanos(ceremony_time);
        // first and last whole milliseconds inside the window
        let earliest_ms = div_ceil(now - nanos(self.backward), NANOS_PER_MILLI);
        let latest_ms = (now + nanos(self.forward)).div_euclid(NANOS_PER_MILLI);
        let timestamp = i128::from(timestamp_ms);

        if timestamp < earliest_ms {
            return Err(PolicyError::TimestampTooOld {
                timestamp_ms,
                earliest_ms,
            });
        }
        if timestamp > latest_ms {
            return Err(PolicyError::TimestampInFuture {
                timestamp_ms,
                latest_ms,
            });
        }
        Ok(())
    }
}

const NANOS_PER_MILLI: i128 = 1_000_000;

fn nanos(duration: Duration) -> i128 {
    // the nanoseconds of any Duration fit in an i128
    i128::try_from(duration.as_nanos()).unwrap_or(i128::MAX)
}

/// Nanoseconds since the Unix epoch, negative before it.
fn unix_nanos(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => nanos(after),
        Err(before) => -nanos(before.duration()),
    }
}

fn div_ceil(value: i128, divisor: i128) -> i128 {
    -(-value).div_euclid(divisor)
}
