//! Demand source adapter.
//!
//! Pickup records arrive from citizens, the bin simulator or the request
//! store with loosely typed fields. [`normalize`] turns them into
//! [`DemandPoint`]s, dropping records it cannot place on the map and
//! reporting each drop as a [`SkippedRecord`].

use std::collections::HashSet;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DemandConfig;
use crate::model::{DemandPoint, Location};

/// A pickup record as received. Numeric fields accept numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPickup {
    #[serde(default, alias = "requestId", alias = "bin_id", skip_serializing_if = "Option::is_none")]
    pub citizen_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
    /// Explicit weight in kilograms; wins over volume when present.
    #[serde(
        default,
        rename = "approxGarbageWeight",
        alias = "weight_kg",
        skip_serializing_if = "Option::is_none"
    )]
    pub approx_garbage_weight: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_waste_volume_liters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_time_window_start: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_time_window_end: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    InvalidCoordinates,
    InvalidWeight,
    InvalidTimeWindow,
    DuplicateId,
}

/// A raw record that did not become a demand point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Zero-based position in the input.
    pub index: usize,
    pub id: Option<String>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedDemand {
    /// Valid points, in input order.
    pub points: Vec<DemandPoint>,
    pub skipped: Vec<SkippedRecord>,
}

pub fn normalize(raw_pickups: &[RawPickup], config: &DemandConfig) -> NormalizedDemand {
    let mut demand = NormalizedDemand::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (index, raw) in raw_pickups.iter().enumerate() {
        let id = raw
            .citizen_id
            .as_ref()
            .and_then(as_identifier)
            .unwrap_or_else(|| format!("P{}", index + 1));

        match normalize_one(&id, raw, config) {
            Ok(point) if seen_ids.insert(point.id.clone()) => demand.points.push(point),
            Ok(_) => skip(&mut demand, index, Some(id), SkipReason::DuplicateId),
            Err(reason) => skip(&mut demand, index, Some(id), reason),
        }
    }

    debug!(
        points = demand.points.len(),
        skipped = demand.skipped.len(),
        "normalized pickup records"
    );
    demand
}

fn skip(demand: &mut NormalizedDemand, index: usize, id: Option<String>, reason: SkipReason) {
    warn!(index, id = id.as_deref().unwrap_or("-"), ?reason, "skipping pickup record");
    demand.skipped.push(SkippedRecord { index, id, reason });
}

fn normalize_one(id: &str, raw: &RawPickup, config: &DemandConfig) -> Result<DemandPoint, SkipReason> {
    let lat = raw.latitude.as_ref().and_then(as_number);
    let lon = raw.longitude.as_ref().and_then(as_number);
    let location = match (lat, lon) {
        (Some(lat), Some(lon)) => Location::new(lat, lon),
        _ => return Err(SkipReason::InvalidCoordinates),
    };
    if !location.is_valid() {
        return Err(SkipReason::InvalidCoordinates);
    }

    let weight_kg = resolve_weight(raw, config)?;

    let window_start = parse_window_bound(raw.pickup_time_window_start.as_ref())?;
    let window_end = parse_window_bound(raw.pickup_time_window_end.as_ref())?;
    if let (Some(start), Some(end)) = (window_start, window_end) {
        if end < start {
            return Err(SkipReason::InvalidTimeWindow);
        }
    }

    Ok(DemandPoint::new(id, location, weight_kg).with_window(
        window_start.unwrap_or(Timestamp::MIN),
        window_end.unwrap_or(Timestamp::MAX),
    ))
}

fn resolve_weight(raw: &RawPickup, config: &DemandConfig) -> Result<f64, SkipReason> {
    let weight = match raw.approx_garbage_weight.as_ref() {
        Some(value) => as_number(value).ok_or(SkipReason::InvalidWeight)?,
        None => {
            let volume = match raw.estimated_waste_volume_liters.as_ref() {
                Some(value) => as_number(value).ok_or(SkipReason::InvalidWeight)?,
                None => config.nominal_volume_liters,
            };
            volume * config.volume_factor
        }
    };

    if weight.is_finite() && weight >= 0.0 {
        Ok(weight)
    } else {
        Err(SkipReason::InvalidWeight)
    }
}

fn parse_window_bound(value: Option<&Value>) -> Result<Option<Timestamp>, SkipReason> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<Timestamp>()
            .map(Some)
            .map_err(|_| SkipReason::InvalidTimeWindow),
        Some(_) => Err(SkipReason::InvalidTimeWindow),
    }
}

/// Coerce a number or numeric string; anything else is missing.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn as_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
