//! Planning run orchestration.
//!
//! A run validates its input, builds the travel matrix, clusters demand into
//! vehicle routes, sequences every route in parallel and assembles the plan.

use std::collections::HashSet;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::clustering::cluster;
use crate::config::{DEFAULT_MAX_ITERATIONS, PlannerConfig};
use crate::demand::{NormalizedDemand, RawPickup, normalize};
use crate::error::PlanningError;
use crate::fleet::{FleetSpec, build_fleet};
use crate::matrix::TravelMatrix;
use crate::model::{Depot, Location, Vehicle};
use crate::plan::{Plan, assemble};
use crate::problem::Problem;
use crate::sequencer::{SequencedRoute, sequence};
use crate::traits::DistanceMatrixProvider;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Hard ceiling on improving moves per route.
    pub max_iterations: usize,
    /// Stops a single route may visit.
    pub max_stops_per_route: Option<usize>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_stops_per_route: None,
        }
    }
}

/// Everything a single run plans over.
#[derive(Debug, Clone)]
pub struct PlanningInput {
    pub depot: Depot,
    pub vehicles: Vec<Vehicle>,
    pub demand: NormalizedDemand,
}

pub fn solve<P>(input: PlanningInput, provider: &P, options: &SolveOptions) -> Result<Plan, PlanningError>
where
    P: DistanceMatrixProvider + ?Sized,
{
    validate(&input)?;
    let PlanningInput {
        depot,
        vehicles,
        demand: NormalizedDemand { points, skipped },
    } = input;

    if points.is_empty() {
        info!(skipped = skipped.len(), "no demand to plan");
        return Ok(Plan::no_demand(skipped));
    }

    let started = Instant::now();
    let matrix = TravelMatrix::build(depot.location, &points, provider)?;
    let problem = Problem::new(&points, &vehicles, &matrix).with_stop_limit(options.max_stops_per_route);

    let clustering = cluster(&problem);
    debug!(
        routes = clustering.routes.len(),
        unassigned = clustering.unassigned.len(),
        "clustered demand"
    );

    let routes: Vec<SequencedRoute> = clustering
        .routes
        .par_iter()
        .map(|route| sequence(route, &problem, options.max_iterations))
        .collect::<Result<_, _>>()?;

    let plan = assemble(&problem, routes, clustering.unassigned, skipped)?;

    info!(
        points = points.len(),
        vehicles = vehicles.len(),
        routes = plan.summary().total_routes,
        unassigned = plan.summary().total_unassigned,
        distance_km = plan.summary().total_distance,
        status = plan.status().as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "planning run finished"
    );
    Ok(plan)
}

fn validate(input: &PlanningInput) -> Result<(), PlanningError> {
    if !input.depot.location.is_valid() {
        return Err(PlanningError::invalid("depot location is out of range"));
    }
    if input.vehicles.is_empty() {
        return Err(PlanningError::invalid("at least one vehicle is required"));
    }

    let mut vehicle_ids = HashSet::new();
    for vehicle in &input.vehicles {
        if !(vehicle.capacity_kg.is_finite() && vehicle.capacity_kg > 0.0) {
            return Err(PlanningError::invalid(format!(
                "vehicle '{}' capacity must be a positive number",
                vehicle.id
            )));
        }
        if vehicle.available_until < vehicle.available_from {
            return Err(PlanningError::invalid(format!(
                "vehicle '{}' availability ends before it starts",
                vehicle.id
            )));
        }
        if !vehicle_ids.insert(vehicle.id.as_str()) {
            return Err(PlanningError::invalid(format!("duplicate vehicle id '{}'", vehicle.id)));
        }
    }

    let mut point_ids = HashSet::new();
    for point in &input.demand.points {
        if !point.location.is_valid() || !(point.weight_kg.is_finite() && point.weight_kg >= 0.0) {
            return Err(PlanningError::invalid(format!("demand point '{}' is malformed", point.id)));
        }
        if !point_ids.insert(point.id.as_str()) {
            return Err(PlanningError::invalid(format!("duplicate demand point id '{}'", point.id)));
        }
    }

    Ok(())
}

/// A request as callers phrase it: raw pickups plus optional overrides.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub pickups: Vec<RawPickup>,
    pub depot: Option<Location>,
    pub fleet: FleetSpec,
    /// Overrides the configured stop limit.
    pub max_stops_per_route: Option<usize>,
}

/// Configured front door to [`solve`].
#[derive(Debug, Clone)]
pub struct Planner<P> {
    config: PlannerConfig,
    provider: P,
}

impl<P: DistanceMatrixProvider> Planner<P> {
    pub fn new(config: PlannerConfig, provider: P) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn plan(&self, request: PlanRequest) -> Result<Plan, PlanningError> {
        let demand = normalize(&request.pickups, &self.config.demand);
        let vehicles = build_fleet(&request.fleet, &demand.points, &self.config)?;
        let input = PlanningInput {
            depot: Depot {
                location: request.depot.unwrap_or(self.config.depot),
            },
            vehicles,
            demand,
        };
        let options = SolveOptions {
            max_iterations: self.config.max_iterations,
            max_stops_per_route: request.max_stops_per_route.or(self.config.max_stops_per_route),
        };
        solve(input, &self.provider, &options)
    }
}
