//! Fleet construction from request parameters and configured defaults.

use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use serde::Deserialize;

use crate::config::PlannerConfig;
use crate::error::PlanningError;
use crate::model::{DemandPoint, Vehicle, from_seconds, to_seconds};

/// An explicitly described vehicle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub capacity_kg: f64,
    #[serde(default)]
    pub available_from: Option<Timestamp>,
    #[serde(default)]
    pub available_until: Option<Timestamp>,
}

/// What a caller said about the fleet. Unset fields fall back to configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetSpec {
    pub num_vehicles: Option<i64>,
    pub vehicle_capacity_kg: Option<f64>,
    pub date: Option<Date>,
    pub vehicles: Option<Vec<VehicleSpec>>,
}

pub fn build_fleet(
    spec: &FleetSpec,
    points: &[DemandPoint],
    config: &PlannerConfig,
) -> Result<Vec<Vehicle>, PlanningError> {
    let (shift_from, shift_until) = shift_bounds(spec.date, points, config)?;

    if let Some(explicit) = &spec.vehicles {
        check_fleet_size(explicit.len(), config)?;
        return explicit_fleet(explicit, shift_from, shift_until);
    }

    let count = match spec.num_vehicles {
        Some(requested) => usize::try_from(requested)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| PlanningError::invalid("num_vehicles must be at least 1"))?,
        None => config.default_num_vehicles,
    };
    check_fleet_size(count, config)?;

    let capacity_kg = spec
        .vehicle_capacity_kg
        .unwrap_or(config.default_vehicle_capacity_kg);
    validate_capacity(capacity_kg)?;

    Ok((1..=count)
        .map(|n| {
            Vehicle::new(format!("truck-{n}"), capacity_kg).with_availability(shift_from, shift_until)
        })
        .collect())
}

/// Rejects fleets above the configured size before anything is allocated.
fn check_fleet_size(count: usize, config: &PlannerConfig) -> Result<(), PlanningError> {
    if count > config.max_fleet_size {
        return Err(PlanningError::invalid(format!(
            "fleet may have at most {} vehicles, {count} requested",
            config.max_fleet_size
        )));
    }
    Ok(())
}

fn explicit_fleet(
    specs: &[VehicleSpec],
    shift_from: Timestamp,
    shift_until: Timestamp,
) -> Result<Vec<Vehicle>, PlanningError> {
    if specs.is_empty() {
        return Err(PlanningError::invalid("vehicles must not be empty"));
    }

    let mut fleet: Vec<Vehicle> = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        validate_capacity(spec.capacity_kg)?;

        let id = spec
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("truck-{}", i + 1));
        if fleet.iter().any(|vehicle| vehicle.id == id) {
            return Err(PlanningError::invalid(format!("duplicate vehicle id '{id}'")));
        }

        let from = spec.available_from.unwrap_or(shift_from);
        let until = spec.available_until.unwrap_or(shift_until);
        if until < from {
            return Err(PlanningError::invalid(format!(
                "vehicle '{id}' is available until before it is available from"
            )));
        }

        fleet.push(Vehicle::new(id, spec.capacity_kg).with_availability(from, until));
    }
    Ok(fleet)
}

fn validate_capacity(capacity_kg: f64) -> Result<(), PlanningError> {
    if capacity_kg.is_finite() && capacity_kg > 0.0 {
        Ok(())
    } else {
        Err(PlanningError::invalid("vehicle capacity must be a positive number"))
    }
}

/// Working hours of the fleet.
///
/// With a service date the configured shift applies (UTC). Without one the
/// shift opens at the earliest pickup window start, or the Unix epoch when no
/// pickup names one.
fn shift_bounds(
    date: Option<Date>,
    points: &[DemandPoint],
    config: &PlannerConfig,
) -> Result<(Timestamp, Timestamp), PlanningError> {
    let shift_seconds = config.shift_seconds();
    if shift_seconds <= 0 {
        return Err(PlanningError::invalid("shift end must be later than shift start"));
    }

    let from = match date {
        Some(date) => date
            .to_datetime(config.shift_start)
            .to_zoned(TimeZone::UTC)
            .map_err(|err| PlanningError::invalid(format!("invalid date {date}: {err}")))?
            .timestamp(),
        None => points
            .iter()
            .filter(|point| point.has_window_start())
            .map(|point| point.window_start)
            .min()
            .unwrap_or(Timestamp::UNIX_EPOCH),
    };

    let until = from_seconds(to_seconds(from).saturating_add(shift_seconds));
    Ok((from, until))
}
