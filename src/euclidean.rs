//! Planar cost model over an equirectangular projection.
//!
//! Cheaper than haversine and accurate enough at city scale, where the
//! curvature error is negligible.

use crate::error::PlanningError;
use crate::haversine::{DEFAULT_SPEED_KMH, km_to_seconds};
use crate::matrix::pairwise_matrix;
use crate::model::Location;
use crate::traits::{DistanceMatrixProvider, Leg, RawMatrix, TravelCostModel};

/// Kilometers per degree of latitude.
const KM_PER_DEGREE: f64 = 111.32;

#[derive(Debug, Clone)]
pub struct EuclideanModel {
    pub speed_kmh: f64,
}

impl Default for EuclideanModel {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl EuclideanModel {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    pub fn planar_km(from: Location, to: Location) -> f64 {
        let mean_lat = ((from.lat + to.lat) / 2.0).to_radians();
        let dx = (to.lon - from.lon) * mean_lat.cos() * KM_PER_DEGREE;
        let dy = (to.lat - from.lat) * KM_PER_DEGREE;
        dx.hypot(dy)
    }
}

impl TravelCostModel for EuclideanModel {
    fn leg(&self, from: Location, to: Location) -> Leg {
        let distance_km = Self::planar_km(from, to);
        Leg {
            distance_km,
            duration_secs: km_to_seconds(distance_km, self.speed_kmh),
        }
    }
}

impl DistanceMatrixProvider for EuclideanModel {
    fn matrix_for(&self, locations: &[Location]) -> Result<RawMatrix, PlanningError> {
        Ok(pairwise_matrix(self, locations))
    }
}
