//! Wall-clock access, isolated so "today" can be pinned in tests.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// UTC+9, the zone whose calendar day decides which entry a save lands on.
pub const DEFAULT_REFERENCE_OFFSET_SECS: i32 = 9 * 3600;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn offset(&self) -> FixedOffset;

    /// Calendar date in the reference zone.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset()).date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            offset: reference_offset(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            offset: reference_offset(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_REFERENCE_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}
