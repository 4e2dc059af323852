//! Domain types shared by every stage of a planning run.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Loads within this tolerance of a vehicle's capacity still fit.
pub const CAPACITY_EPSILON: f64 = 1e-9;

/// A point on the map (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A normalized pickup. Immutable once loaded into a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandPoint {
    pub id: String,
    pub location: Location,
    pub weight_kg: f64,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
}

impl DemandPoint {
    /// A point that may be visited at any time.
    pub fn new(id: impl Into<String>, location: Location, weight_kg: f64) -> Self {
        Self {
            id: id.into(),
            location,
            weight_kg,
            window_start: Timestamp::MIN,
            window_end: Timestamp::MAX,
        }
    }

    pub fn with_window(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.window_start = start;
        self.window_end = end;
        self
    }

    /// True when the pickup carries an explicit window start.
    pub fn has_window_start(&self) -> bool {
        self.window_start != Timestamp::MIN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Depot {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: String,
    pub capacity_kg: f64,
    pub available_from: Timestamp,
    pub available_until: Timestamp,
}

impl Vehicle {
    /// A vehicle with no shift bounds (available from the Unix epoch onwards).
    pub fn new(id: impl Into<String>, capacity_kg: f64) -> Self {
        Self {
            id: id.into(),
            capacity_kg,
            available_from: Timestamp::UNIX_EPOCH,
            available_until: Timestamp::MAX,
        }
    }

    pub fn with_availability(mut self, from: Timestamp, until: Timestamp) -> Self {
        self.available_from = from;
        self.available_until = until;
        self
    }

    pub fn fits(&self, load_kg: f64) -> bool {
        load_kg <= self.capacity_kg + CAPACITY_EPSILON
    }
}

/// Why a demand point ended up outside every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnassignedReason {
    CapacityExceeded,
    WindowMissed,
    ShiftOverrun,
    /// Every route with weight to spare already visits the stop limit.
    StopLimitReached,
}

impl UnassignedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnassignedReason::CapacityExceeded => "CapacityExceeded",
            UnassignedReason::WindowMissed => "WindowMissed",
            UnassignedReason::ShiftOverrun => "ShiftOverrun",
            UnassignedReason::StopLimitReached => "StopLimitReached",
        }
    }
}

/// Converts a timestamp to whole seconds for schedule arithmetic.
pub(crate) fn to_seconds(ts: Timestamp) -> i64 {
    ts.as_second()
}

/// Inverse of [`to_seconds`], clamping to the representable range.
pub(crate) fn from_seconds(seconds: i64) -> Timestamp {
    match Timestamp::from_second(seconds) {
        Ok(ts) => ts,
        Err(_) if seconds < 0 => Timestamp::MIN,
        Err(_) => Timestamp::MAX,
    }
}
