//! Configuration management
//!
//! Depot coordinates and fleet defaults are explicit inputs injected at run
//! start. [`PlannerConfig::default`] documents every default;
//! [`ServiceConfig::from_env`] overrides them from the environment.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use jiff::civil::{self, Time};

use crate::haversine::DEFAULT_SPEED_KMH;
use crate::model::Location;

/// Accra, where the collection fleet is based.
pub const DEFAULT_DEPOT: Location = Location::new(5.6037, -0.1870);
pub const DEFAULT_NUM_VEHICLES: usize = 1;
pub const DEFAULT_VEHICLE_CAPACITY_KG: f64 = 2000.0;
pub const DEFAULT_NOMINAL_VOLUME_LITERS: f64 = 50.0;
pub const DEFAULT_VOLUME_FACTOR: f64 = 1.0;
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
/// Largest fleet a single request may ask for.
pub const DEFAULT_MAX_FLEET_SIZE: usize = 500;
pub const DEFAULT_PLANNING_TIMEOUT_SECS: u64 = 30;

/// How pickup records are turned into weights.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandConfig {
    /// Volume assumed for a pickup that states neither weight nor volume.
    pub nominal_volume_liters: f64,
    /// Kilograms per liter of waste.
    pub volume_factor: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            nominal_volume_liters: DEFAULT_NOMINAL_VOLUME_LITERS,
            volume_factor: DEFAULT_VOLUME_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceModelKind {
    Haversine,
    Euclidean,
    Osrm,
}

impl FromStr for DistanceModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haversine" => Ok(DistanceModelKind::Haversine),
            "euclidean" => Ok(DistanceModelKind::Euclidean),
            "osrm" => Ok(DistanceModelKind::Osrm),
            other => anyhow::bail!("unknown distance model '{other}'"),
        }
    }
}

/// Planning defaults for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub depot: Location,
    pub default_num_vehicles: usize,
    pub default_vehicle_capacity_kg: f64,
    /// Upper bound on vehicles per request, explicit or generated.
    pub max_fleet_size: usize,
    /// Stops a single route may visit; `None` leaves routes bounded by
    /// capacity and time alone.
    pub max_stops_per_route: Option<usize>,
    pub demand: DemandConfig,
    pub speed_kmh: f64,
    /// Hard ceiling on applied local-search moves per route.
    pub max_iterations: usize,
    /// Shift bounds (UTC) used when a request names a service date.
    pub shift_start: Time,
    pub shift_end: Time,
    pub distance_model: DistanceModelKind,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            depot: DEFAULT_DEPOT,
            default_num_vehicles: DEFAULT_NUM_VEHICLES,
            default_vehicle_capacity_kg: DEFAULT_VEHICLE_CAPACITY_KG,
            max_fleet_size: DEFAULT_MAX_FLEET_SIZE,
            max_stops_per_route: None,
            demand: DemandConfig::default(),
            speed_kmh: DEFAULT_SPEED_KMH,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            shift_start: civil::time(8, 0, 0, 0),
            shift_end: civil::time(18, 0, 0, 0),
            distance_model: DistanceModelKind::Haversine,
        }
    }
}

impl PlannerConfig {
    /// Shift length in seconds.
    pub fn shift_seconds(&self) -> i64 {
        let start = i64::from(self.shift_start.hour()) * 3600 + i64::from(self.shift_start.minute()) * 60;
        let end = i64::from(self.shift_end.hour()) * 3600 + i64::from(self.shift_end.minute()) * 60;
        end - start
    }
}

/// Service-level configuration (HTTP server and collaborators).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub planning_timeout: Duration,
    /// OSRM base URL, required when the distance model is `osrm`.
    pub osrm_url: Option<String>,
    /// Fall back to haversine when OSRM is unreachable.
    pub osrm_fallback: bool,
    /// Persisted pickup store; the smart-bin simulator is used when unset.
    pub demand_source_url: Option<String>,
    pub planner: PlannerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            planning_timeout: Duration::from_secs(DEFAULT_PLANNING_TIMEOUT_SECS),
            osrm_url: None,
            osrm_fallback: true,
            demand_source_url: None,
            planner: PlannerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServiceConfig::default();
        let mut planner = PlannerConfig::default();

        let depot_lat = parse_var(&lookup, "FLEET_DEPOT_LAT")?.unwrap_or(planner.depot.lat);
        let depot_lon = parse_var(&lookup, "FLEET_DEPOT_LON")?.unwrap_or(planner.depot.lon);
        planner.depot = Location::new(depot_lat, depot_lon);
        if !planner.depot.is_valid() {
            anyhow::bail!("FLEET_DEPOT_LAT/FLEET_DEPOT_LON must be valid coordinates");
        }

        if let Some(n) = parse_var::<usize, _>(&lookup, "FLEET_DEFAULT_VEHICLES")? {
            if n == 0 {
                anyhow::bail!("FLEET_DEFAULT_VEHICLES must be at least 1");
            }
            planner.default_num_vehicles = n;
        }
        if let Some(capacity) = parse_var::<f64, _>(&lookup, "FLEET_VEHICLE_CAPACITY_KG")? {
            if !(capacity.is_finite() && capacity > 0.0) {
                anyhow::bail!("FLEET_VEHICLE_CAPACITY_KG must be a positive number");
            }
            planner.default_vehicle_capacity_kg = capacity;
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, "FLEET_MAX_FLEET_SIZE")? {
            if limit == 0 {
                anyhow::bail!("FLEET_MAX_FLEET_SIZE must be at least 1");
            }
            planner.max_fleet_size = limit;
        }
        if planner.default_num_vehicles > planner.max_fleet_size {
            anyhow::bail!("FLEET_DEFAULT_VEHICLES must not exceed FLEET_MAX_FLEET_SIZE");
        }
        if let Some(stops) = parse_var(&lookup, "FLEET_MAX_STOPS_PER_ROUTE")? {
            planner.max_stops_per_route = Some(stops);
        }
        if let Some(volume) = parse_var(&lookup, "FLEET_NOMINAL_VOLUME_L")? {
            planner.demand.nominal_volume_liters = volume;
        }
        if let Some(factor) = parse_var(&lookup, "FLEET_VOLUME_FACTOR")? {
            planner.demand.volume_factor = factor;
        }
        if let Some(speed) = parse_var::<f64, _>(&lookup, "FLEET_SPEED_KMH")? {
            if !(speed.is_finite() && speed > 0.0) {
                anyhow::bail!("FLEET_SPEED_KMH must be a positive number");
            }
            planner.speed_kmh = speed;
        }
        if let Some(iterations) = parse_var(&lookup, "FLEET_MAX_ITERATIONS")? {
            planner.max_iterations = iterations;
        }
        if let Some(start) = parse_var(&lookup, "FLEET_SHIFT_START")? {
            planner.shift_start = start;
        }
        if let Some(end) = parse_var(&lookup, "FLEET_SHIFT_END")? {
            planner.shift_end = end;
        }
        if planner.shift_seconds() <= 0 {
            anyhow::bail!("FLEET_SHIFT_END must be later than FLEET_SHIFT_START");
        }
        if let Some(model) = parse_var(&lookup, "FLEET_DISTANCE_MODEL")? {
            planner.distance_model = model;
        }

        let osrm_url = lookup("OSRM_URL").filter(|url| !url.trim().is_empty());
        if planner.distance_model == DistanceModelKind::Osrm && osrm_url.is_none() {
            anyhow::bail!("OSRM_URL must be set when FLEET_DISTANCE_MODEL=osrm");
        }

        let planning_timeout = parse_var(&lookup, "PLANNING_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.planning_timeout);

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            planning_timeout,
            osrm_url,
            osrm_fallback: parse_var(&lookup, "OSRM_FALLBACK")?.unwrap_or(defaults.osrm_fallback),
            demand_source_url: lookup("DEMAND_SOURCE_URL").filter(|url| !url.trim().is_empty()),
            planner,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.planner, PlannerConfig::default());
        assert_eq!(config.planner.depot, DEFAULT_DEPOT);
        assert_eq!(config.planner.shift_seconds(), 10 * 3600);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert!(config.osrm_url.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("FLEET_DEPOT_LAT", "6.6885"),
            ("FLEET_DEPOT_LON", "-1.6244"),
            ("FLEET_DEFAULT_VEHICLES", "3"),
            ("FLEET_VEHICLE_CAPACITY_KG", "1500"),
            ("FLEET_SHIFT_START", "06:30"),
            ("FLEET_DISTANCE_MODEL", "euclidean"),
            ("PLANNING_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.planner.depot, Location::new(6.6885, -1.6244));
        assert_eq!(config.planner.default_num_vehicles, 3);
        assert_eq!(config.planner.default_vehicle_capacity_kg, 1500.0);
        assert_eq!(config.planner.shift_start, civil::time(6, 30, 0, 0));
        assert_eq!(config.planner.distance_model, DistanceModelKind::Euclidean);
        assert_eq!(config.planning_timeout, Duration::from_secs(5));
    }

    #[test]
    fn osrm_requires_a_url() {
        let err = ServiceConfig::from_lookup(lookup(&[("FLEET_DISTANCE_MODEL", "osrm")])).unwrap_err();
        assert!(err.to_string().contains("OSRM_URL"));
    }

    #[test]
    fn zero_vehicles_rejected() {
        assert!(ServiceConfig::from_lookup(lookup(&[("FLEET_DEFAULT_VEHICLES", "0")])).is_err());
    }

    #[test]
    fn fleet_and_stop_limits_are_read() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("FLEET_MAX_FLEET_SIZE", "20"),
            ("FLEET_MAX_STOPS_PER_ROUTE", "10"),
        ]))
        .unwrap();
        assert_eq!(config.planner.max_fleet_size, 20);
        assert_eq!(config.planner.max_stops_per_route, Some(10));

        assert!(ServiceConfig::from_lookup(lookup(&[("FLEET_MAX_FLEET_SIZE", "0")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[("FLEET_MAX_STOPS_PER_ROUTE", "-1")])).is_err());
        assert!(
            ServiceConfig::from_lookup(lookup(&[
                ("FLEET_DEFAULT_VEHICLES", "30"),
                ("FLEET_MAX_FLEET_SIZE", "20"),
            ]))
            .is_err()
        );
    }

    #[test]
    fn garbage_values_name_the_key() {
        let err = ServiceConfig::from_lookup(lookup(&[("FLEET_SPEED_KMH", "fast")])).unwrap_err();
        assert!(format!("{err:#}").contains("FLEET_SPEED_KMH"));
    }
}
