use std::time::{SystemTime, UNIX_EPOCH};

use time::macros::format_description;
use time::OffsetDateTime;

/// Wall-clock source for point timestamps and session names.
pub trait Clock {
    fn now_nanos(&self) -> i64;

    /// `YYYYMMDDhhmmss`, used as the suffix of session directory names.
    fn datetime_stamp(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0)
    }

    fn datetime_stamp(&self) -> String {
        let now = OffsetDateTime::now_utc();
        now.format(format_description!("[year][month][day][hour][minute][second]"))
            .unwrap_or_else(|_| now.unix_timestamp().to_string())
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedClock {
    pub nanos: i64,
    pub stamp: String,
}

impl FixedClock {
    pub fn new(nanos: i64, stamp: impl Into<String>) -> Self {
        FixedClock {
            nanos,
            stamp: stamp.into(),
        }
    }
}

impl Clock for FixedClock {
    fn now_nanos(&self) -> i64 {
        self.nanos
    }

    fn datetime_stamp(&self) -> String {
        self.stamp.clone()
    }
}
