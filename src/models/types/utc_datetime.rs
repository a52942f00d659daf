use std::ops::{Add, Sub};
use time::{Duration, OffsetDateTime, UtcOffset};

/// An instant that is always kept in UTC.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> UtcDateTime {
        UtcDateTime(OffsetDateTime::now_utc())
    }

    pub fn from_unix_timestamp(timestamp: i64) -> Result<UtcDateTime, time::error::ComponentRange> {
        OffsetDateTime::from_unix_timestamp(timestamp).map(UtcDateTime)
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.0.unix_timestamp()
    }
}

impl From<OffsetDateTime> for UtcDateTime {
    fn from(value: OffsetDateTime) -> Self {
        UtcDateTime(value.to_offset(UtcOffset::UTC))
    }
}

impl From<UtcDateTime> for OffsetDateTime {
    fn from(value: UtcDateTime) -> Self {
        value.0
    }
}

impl Add<Duration> for UtcDateTime {
    type Output = UtcDateTime;

    fn add(self, rhs: Duration) -> Self::Output {
        UtcDateTime(self.0 + rhs)
    }
}

impl Sub<Duration> for UtcDateTime {
    type Output = UtcDateTime;

    fn sub(self, rhs: Duration) -> Self::Output {
        UtcDateTime(self.0 - rhs)
    }
}

impl Sub<UtcDateTime> for UtcDateTime {
    type Output = Duration;

    fn sub(self, rhs: UtcDateTime) -> Self::Output {
        self.0 - rhs.0
    }
}
