//! Archive timestamp conversion.
//!
//! Archive engines report timestamps as Windows FILETIME values: 64-bit
//! counts of 100-nanosecond ticks since January 1, 1601 (UTC). Metadata is
//! surfaced to callers as signed Unix seconds, computed by
//! [`filetime_to_unix_secs`].
//!
//! # Example
//!
//! ```rust
//! use arcgate::timestamp::{filetime_to_unix_secs, Timestamp};
//!
//! assert_eq!(filetime_to_unix_secs(116_444_736_000_000_000), 0);
//!
//! let ts = Timestamp::from_unix_secs(86_400).unwrap();
//! assert_eq!(ts.as_unix_secs(), 86_400);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of 100-nanosecond ticks per second.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Seconds between 1601-01-01 and 1970-01-01.
///
/// 369 years of 365 days plus the 89 leap days in that span.
pub const UNIX_EPOCH_OFFSET_SECS: i64 = 60 * 60 * 24 * (89 + 365 * 369);

/// FILETIME value of the Unix epoch.
const FILETIME_UNIX_EPOCH: u64 = UNIX_EPOCH_OFFSET_SECS as u64 * TICKS_PER_SECOND;

/// Converts FILETIME ticks to Unix seconds.
///
/// Ticks are truncated to whole seconds before the epoch offset is
/// subtracted, so the result is the floor of the exact value. No timezone
/// adjustment is applied.
#[inline]
pub const fn filetime_to_unix_secs(ticks: u64) -> i64 {
    (ticks / TICKS_PER_SECOND) as i64 - UNIX_EPOCH_OFFSET_SECS
}

/// A raw FILETIME value reported by an archive engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    filetime: u64,
}

impl Timestamp {
    /// Wraps a raw FILETIME value.
    #[inline]
    pub const fn from_filetime(filetime: u64) -> Self {
        Self { filetime }
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Returns `None` if the value falls outside the FILETIME range.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        let since_1601 = secs.checked_add(UNIX_EPOCH_OFFSET_SECS)?;
        let since_1601 = u64::try_from(since_1601).ok()?;
        since_1601
            .checked_mul(TICKS_PER_SECOND)
            .map(Self::from_filetime)
    }

    /// Returns the raw FILETIME value.
    #[inline]
    pub const fn as_filetime(&self) -> u64 {
        self.filetime
    }

    /// Returns whole Unix seconds, see [`filetime_to_unix_secs`].
    #[inline]
    pub const fn as_unix_secs(&self) -> i64 {
        filetime_to_unix_secs(self.filetime)
    }

    /// Converts to a `SystemTime` with full 100ns precision.
    pub fn as_system_time(&self) -> SystemTime {
        if self.filetime >= FILETIME_UNIX_EPOCH {
            let ticks = self.filetime - FILETIME_UNIX_EPOCH;
            UNIX_EPOCH + ticks_to_duration(ticks)
        } else {
            let ticks = FILETIME_UNIX_EPOCH - self.filetime;
            UNIX_EPOCH - ticks_to_duration(ticks)
        }
    }
}

fn ticks_to_duration(ticks: u64) -> Duration {
    let secs = ticks / TICKS_PER_SECOND;
    let nanos = ((ticks % TICKS_PER_SECOND) * 100) as u32;
    Duration::new(secs, nanos)
}

impl From<u64> for Timestamp {
    fn from(filetime: u64) -> Self {
        Self::from_filetime(filetime)
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> SystemTime {
        ts.as_system_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_offset_constant() {
        assert_eq!(UNIX_EPOCH_OFFSET_SECS, 11_644_473_600);
        assert_eq!(FILETIME_UNIX_EPOCH, 116_444_736_000_000_000);
    }

    #[test]
    fn test_unix_epoch_maps_to_zero() {
        assert_eq!(filetime_to_unix_secs(FILETIME_UNIX_EPOCH), 0);
    }

    #[test]
    fn test_one_second_before_epoch() {
        assert_eq!(
            filetime_to_unix_secs(FILETIME_UNIX_EPOCH - TICKS_PER_SECOND),
            -1
        );
        // a single tick before the epoch still truncates down to -1
        assert_eq!(filetime_to_unix_secs(FILETIME_UNIX_EPOCH - 1), -1);
    }

    #[test]
    fn test_sub_second_ticks_truncate() {
        assert_eq!(filetime_to_unix_secs(FILETIME_UNIX_EPOCH + 15_000_000), 1);
    }

    #[test]
    fn test_filetime_zero() {
        assert_eq!(filetime_to_unix_secs(0), -UNIX_EPOCH_OFFSET_SECS);
    }

    #[test]
    fn test_from_unix_secs() {
        let ts = Timestamp::from_unix_secs(0).unwrap();
        assert_eq!(ts.as_filetime(), FILETIME_UNIX_EPOCH);

        let ts = Timestamp::from_unix_secs(-1).unwrap();
        assert_eq!(ts.as_filetime(), FILETIME_UNIX_EPOCH - TICKS_PER_SECOND);

        assert!(Timestamp::from_unix_secs(-UNIX_EPOCH_OFFSET_SECS - 1).is_none());
    }

    #[test]
    fn test_system_time() {
        let ts = Timestamp::from_filetime(FILETIME_UNIX_EPOCH + 12_345_678);
        let expected = UNIX_EPOCH + Duration::new(1, 234_567_800);
        assert_eq!(ts.as_system_time(), expected);

        let before = Timestamp::from_unix_secs(-3600).unwrap();
        assert_eq!(
            SystemTime::from(before),
            UNIX_EPOCH - Duration::from_secs(3600)
        );
    }
}
