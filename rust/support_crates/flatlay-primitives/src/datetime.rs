use std::fmt;

use bytemuck::{Pod, Zeroable};

use crate::{
    MAX_TICKS, TICKS_PER_DAY, TICKS_PER_HOUR, TICKS_PER_MILLISECOND, TICKS_PER_MINUTE,
    TICKS_PER_SECOND, TICKS_TILL_UNIX_TIME,
};

/// A point in time counted in 100-nanosecond ticks since 0001-01-01T00:00:00
/// (compatible with .NET `DateTime` ticks).
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct DateTime {
    ticks: i64,
}

impl DateTime {
    pub const MIN: DateTime = DateTime { ticks: 0 };
    pub const MAX: DateTime = DateTime { ticks: MAX_TICKS };
    pub const UNIX_EPOCH: DateTime = DateTime {
        ticks: TICKS_TILL_UNIX_TIME,
    };

    /// Creates a `DateTime` from ticks, returning `None` when the value is outside
    /// `0..=MAX_TICKS`.
    pub fn from_ticks(ticks: i64) -> Option<DateTime> {
        (0..=MAX_TICKS)
            .contains(&ticks)
            .then_some(DateTime { ticks })
    }

    pub fn from_unix_millis(millis: i64) -> Option<DateTime> {
        millis
            .checked_mul(TICKS_PER_MILLISECOND)
            .and_then(|t| t.checked_add(TICKS_TILL_UNIX_TIME))
            .and_then(DateTime::from_ticks)
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn unix_millis(&self) -> i64 {
        (self.ticks - TICKS_TILL_UNIX_TIME).div_euclid(TICKS_PER_MILLISECOND)
    }

    pub fn checked_add(self, span: TimeSpan) -> Option<DateTime> {
        self.ticks
            .checked_add(span.ticks)
            .and_then(DateTime::from_ticks)
    }

    /// Returns the interval elapsed from `earlier` to `self`.
    pub fn since(self, earlier: DateTime) -> TimeSpan {
        TimeSpan::from_ticks(self.ticks - earlier.ticks)
    }
}

/// A signed time interval in 100-nanosecond ticks.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct TimeSpan {
    ticks: i64,
}

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan { ticks: 0 };
    pub const MIN: TimeSpan = TimeSpan { ticks: i64::MIN };
    pub const MAX: TimeSpan = TimeSpan { ticks: i64::MAX };

    pub const fn from_ticks(ticks: i64) -> TimeSpan {
        TimeSpan { ticks }
    }

    pub const fn from_millis(millis: i64) -> TimeSpan {
        TimeSpan {
            ticks: millis * TICKS_PER_MILLISECOND,
        }
    }

    pub const fn from_seconds(seconds: i64) -> TimeSpan {
        TimeSpan {
            ticks: seconds * TICKS_PER_SECOND,
        }
    }

    pub const fn from_minutes(minutes: i64) -> TimeSpan {
        TimeSpan {
            ticks: minutes * TICKS_PER_MINUTE,
        }
    }

    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn total_seconds(&self) -> f64 {
        self.ticks as f64 / TICKS_PER_SECOND as f64
    }

    pub fn is_negative(&self) -> bool {
        self.ticks < 0
    }
}

impl fmt::Display for TimeSpan {
    /// Formats as `[-][d.]hh:mm:ss[.fffffff]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let ticks = self.ticks.unsigned_abs();
        let days = ticks / TICKS_PER_DAY as u64;
        let hours = ticks % TICKS_PER_DAY as u64 / TICKS_PER_HOUR as u64;
        let minutes = ticks % TICKS_PER_HOUR as u64 / TICKS_PER_MINUTE as u64;
        let seconds = ticks % TICKS_PER_MINUTE as u64 / TICKS_PER_SECOND as u64;
        let fraction = ticks % TICKS_PER_SECOND as u64;
        write!(f, "{sign}")?;
        if days != 0 {
            write!(f, "{days}.")?;
        }
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")?;
        if fraction != 0 {
            write!(f, ".{fraction:07}")?;
        }
        Ok(())
    }
}

/// A local clock reading paired with its offset from UTC.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct DateTimeOffset {
    clock_ticks: i64,
    offset_minutes: i64,
}

impl DateTimeOffset {
    /// Creates a value from a local clock reading and its UTC offset.
    ///
    /// The offset must be within +/-14 hours, as for .NET `DateTimeOffset`.
    pub fn new(local: DateTime, offset: TimeSpan) -> Option<DateTimeOffset> {
        let offset_minutes = offset.ticks() / TICKS_PER_MINUTE;
        if offset.ticks() % TICKS_PER_MINUTE != 0 || offset_minutes.abs() > 14 * 60 {
            return None;
        }
        Some(DateTimeOffset {
            clock_ticks: local.ticks(),
            offset_minutes,
        })
    }

    pub fn local(&self) -> DateTime {
        DateTime {
            ticks: self.clock_ticks,
        }
    }

    pub fn offset(&self) -> TimeSpan {
        TimeSpan::from_minutes(self.offset_minutes)
    }

    /// Returns the same instant on the UTC clock.
    pub fn utc(&self) -> Option<DateTime> {
        DateTime::from_ticks(self.clock_ticks - self.offset_minutes * TICKS_PER_MINUTE)
    }
}
