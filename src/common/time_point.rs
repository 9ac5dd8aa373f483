use std::cmp::Ordering;

use crate::proto::Sample;

pub const F64_MARGIN: f64 = 0.000000001;

/// Milliseconds since unix epoch.
pub type Timestamp = i64;
pub type Value = f64;

#[derive(Clone, Copy, Debug)]
pub struct TimePoint {
    pub timestamp: Timestamp,
    pub value: Value,
}

impl TimePoint {
    pub fn new(timestamp: Timestamp, value: Value) -> TimePoint {
        TimePoint { timestamp, value }
    }
}

impl Eq for TimePoint {}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp.eq(&other.timestamp) && (self.value - other.value).abs() < F64_MARGIN
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&TimePoint> for Sample {
    fn from(t: &TimePoint) -> Self {
        Sample { timestamp: t.timestamp, value: t.value }
    }
}

impl From<&Sample> for TimePoint {
    fn from(s: &Sample) -> Self {
        TimePoint { timestamp: s.timestamp, value: s.value }
    }
}
