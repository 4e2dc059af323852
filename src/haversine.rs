//! Haversine cost model (default, and fallback when OSRM is unavailable).
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than a road network (ignores roads) but always available.

use crate::error::PlanningError;
use crate::matrix::pairwise_matrix;
use crate::model::Location;
use crate::traits::{DistanceMatrixProvider, Leg, RawMatrix, TravelCostModel};

/// Average driving speed assumption for time estimation.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Estimates travel using straight-line distance and an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineModel {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineModel {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineModel {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Calculate haversine distance between two points in kilometers.
    pub fn haversine_km(from: Location, to: Location) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lon = (to.lon - from.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

/// Convert distance in km to travel time in seconds.
pub(crate) fn km_to_seconds(km: f64, speed_kmh: f64) -> i64 {
    let hours = km / speed_kmh;
    (hours * 3600.0).round() as i64
}

impl TravelCostModel for HaversineModel {
    fn leg(&self, from: Location, to: Location) -> Leg {
        let distance_km = Self::haversine_km(from, to);
        Leg {
            distance_km,
            duration_secs: km_to_seconds(distance_km, self.speed_kmh),
        }
    }
}

impl DistanceMatrixProvider for HaversineModel {
    fn matrix_for(&self, locations: &[Location]) -> Result<RawMatrix, PlanningError> {
        Ok(pairwise_matrix(self, locations))
    }
}
