use crate::matrix::TravelMatrix;
use crate::model::{DemandPoint, Vehicle};

/// Read-only view of one planning run, shared by every stage.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    pub points: &'a [DemandPoint],
    pub vehicles: &'a [Vehicle],
    pub matrix: &'a TravelMatrix,
    /// Stops a single route may visit.
    pub max_stops: Option<usize>,
}

impl<'a> Problem<'a> {
    pub fn new(points: &'a [DemandPoint], vehicles: &'a [Vehicle], matrix: &'a TravelMatrix) -> Self {
        Self {
            points,
            vehicles,
            matrix,
            max_stops: None,
        }
    }

    pub fn with_stop_limit(mut self, max_stops: Option<usize>) -> Self {
        self.max_stops = max_stops;
        self
    }

    /// Whether a route of `count` stops stays within the stop limit.
    pub fn allows_stops(&self, count: usize) -> bool {
        self.max_stops.is_none_or(|limit| count <= limit)
    }

    pub fn load(&self, stops: &[usize]) -> f64 {
        stops.iter().map(|&stop| self.points[stop].weight_kg).sum()
    }

    pub fn id(&self, stop: usize) -> &str {
        &self.points[stop].id
    }

    pub fn max_capacity(&self) -> f64 {
        self.vehicles
            .iter()
            .map(|vehicle| vehicle.capacity_kg)
            .fold(0.0, f64::max)
    }
}
