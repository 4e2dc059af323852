//! Per-run travel matrix.
//!
//! [`TravelMatrix`] is the memoizing facade every stage reads costs through.
//! It is built once at the start of a run over deduplicated locations, so an
//! identical coordinate pair is never computed twice, and it is dropped with
//! the run.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{PlanningError, Upstream};
use crate::model::{DemandPoint, Location};
use crate::traits::{DistanceMatrixProvider, RawMatrix, TravelCostModel};

/// A stop in a route walk: the depot or a demand point (by index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Depot,
    Point(usize),
}

/// Build a matrix from a symmetric pairwise model, evaluating each
/// unordered pair once.
pub fn pairwise_matrix<M: TravelCostModel + ?Sized>(model: &M, locations: &[Location]) -> RawMatrix {
    let n = locations.len();
    let mut distances_km = vec![vec![0.0; n]; n];
    let mut durations_secs = vec![vec![0; n]; n];

    for i in 0..n {
        for j in i + 1..n {
            let leg = model.leg(locations[i], locations[j]);
            distances_km[i][j] = leg.distance_km;
            distances_km[j][i] = leg.distance_km;
            durations_secs[i][j] = leg.duration_secs;
            durations_secs[j][i] = leg.duration_secs;
        }
    }

    RawMatrix {
        distances_km,
        durations_secs,
    }
}

#[derive(Debug, Clone)]
pub struct TravelMatrix {
    size: usize,
    distances_km: Vec<f64>,
    durations_secs: Vec<i64>,
    /// Matrix cell of each node; slot 0 is the depot, slot k + 1 is point k.
    cells: Vec<usize>,
}

impl TravelMatrix {
    pub fn build<P>(depot: Location, points: &[DemandPoint], provider: &P) -> Result<Self, PlanningError>
    where
        P: DistanceMatrixProvider + ?Sized,
    {
        let mut locations = Vec::with_capacity(points.len() + 1);
        locations.push(depot);
        locations.extend(points.iter().map(|point| point.location));

        let (unique, cells) = dedupe_locations(&locations);
        debug!(
            nodes = locations.len(),
            unique = unique.len(),
            "requesting travel matrix"
        );

        let raw = provider.matrix_for(&unique)?;
        validate_shape(&raw, unique.len())?;

        let size = unique.len();
        let distances_km = raw.distances_km.into_iter().flatten().collect();
        let durations_secs = raw.durations_secs.into_iter().flatten().collect();

        Ok(Self {
            size,
            distances_km,
            durations_secs,
            cells,
        })
    }

    fn cell(&self, node: Node) -> usize {
        match node {
            Node::Depot => self.cells[0],
            Node::Point(index) => self.cells[index + 1],
        }
    }

    pub fn distance(&self, from: Node, to: Node) -> f64 {
        self.distances_km[self.cell(from) * self.size + self.cell(to)]
    }

    pub fn duration(&self, from: Node, to: Node) -> i64 {
        self.durations_secs[self.cell(from) * self.size + self.cell(to)]
    }

    /// Total distance of depot → stops → depot.
    pub fn route_distance(&self, stops: &[usize]) -> f64 {
        let mut total = 0.0;
        let mut prev = Node::Depot;
        for &stop in stops {
            total += self.distance(prev, Node::Point(stop));
            prev = Node::Point(stop);
        }
        total + self.distance(prev, Node::Depot)
    }

    /// Number of distinct locations the provider was asked for.
    pub fn unique_locations(&self) -> usize {
        self.size
    }
}

fn validate_shape(raw: &RawMatrix, n: usize) -> Result<(), PlanningError> {
    let square = raw.distances_km.len() == n
        && raw.durations_secs.len() == n
        && raw.distances_km.iter().all(|row| row.len() == n)
        && raw.durations_secs.iter().all(|row| row.len() == n);
    if !square {
        return Err(PlanningError::upstream(
            Upstream::DistanceProvider,
            format!("expected a {n}x{n} matrix"),
        ));
    }

    let sane = raw
        .distances_km
        .iter()
        .flatten()
        .all(|d| d.is_finite() && *d >= 0.0)
        && raw.durations_secs.iter().flatten().all(|t| *t >= 0);
    if !sane {
        return Err(PlanningError::upstream(
            Upstream::DistanceProvider,
            "matrix contains negative or non-finite entries",
        ));
    }

    Ok(())
}

fn dedupe_locations(locations: &[Location]) -> (Vec<Location>, Vec<usize>) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unique = Vec::new();
    let mut cells = Vec::with_capacity(locations.len());
    for location in locations {
        let key = location_key(*location);
        let cell = *seen.entry(key).or_insert_with(|| {
            unique.push(*location);
            unique.len() - 1
        });
        cells.push(cell);
    }
    (unique, cells)
}

fn location_key(location: Location) -> String {
    format!("{:.6},{:.6}", location.lat, location.lon)
}

/// Tries a primary provider and falls back to a secondary one when the
/// primary is unreachable.
#[derive(Debug, Clone)]
pub struct FallbackMatrix<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackMatrix<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P, F> DistanceMatrixProvider for FallbackMatrix<P, F>
where
    P: DistanceMatrixProvider,
    F: DistanceMatrixProvider,
{
    fn matrix_for(&self, locations: &[Location]) -> Result<RawMatrix, PlanningError> {
        match self.primary.matrix_for(locations) {
            Err(PlanningError::UpstreamUnavailable { message, .. }) => {
                warn!(%message, "primary distance provider unavailable, using fallback");
                self.fallback.matrix_for(locations)
            }
            other => other,
        }
    }
}
