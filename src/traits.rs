//! Seams between the routing engine and its collaborators.
//!
//! Cost models, matrix providers and demand sources are swappable; the
//! engine only ever talks to them through these traits.

use jiff::civil::Date;

use crate::demand::RawPickup;
use crate::error::PlanningError;
use crate::model::Location;

/// Travel distance and time for a single leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub distance_km: f64,
    pub duration_secs: i64,
}

/// Pairwise travel cost between two coordinates.
///
/// Implementations must be symmetric and non-negative.
pub trait TravelCostModel {
    fn leg(&self, from: Location, to: Location) -> Leg;
}

/// Square distance and duration tables, indexed by the provided location order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatrix {
    pub distances_km: Vec<Vec<f64>>,
    pub durations_secs: Vec<Vec<i64>>,
}

/// Provides a distance/time matrix for a set of locations.
///
/// Road-network providers may fail; pairwise models never do.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[Location]) -> Result<RawMatrix, PlanningError>;
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for Box<P> {
    fn matrix_for(&self, locations: &[Location]) -> Result<RawMatrix, PlanningError> {
        (**self).matrix_for(locations)
    }
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for &P {
    fn matrix_for(&self, locations: &[Location]) -> Result<RawMatrix, PlanningError> {
        (**self).matrix_for(locations)
    }
}

/// Supplies the raw pickups for a service date.
pub trait DemandSource {
    fn fetch(&self, date: Date) -> Result<Vec<RawPickup>, PlanningError>;
}
