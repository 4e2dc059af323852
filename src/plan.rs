//! Plan assembly.
//!
//! A [`Plan`] is built once per run from sequenced routes and is read-only
//! afterwards. [`assemble`] checks the partition and capacity invariants
//! before handing it out; a violation there is a defect, not bad input.

use jiff::Timestamp;
use serde::Serialize;
use tracing::error;

use crate::clustering::UnassignedPoint;
use crate::demand::SkippedRecord;
use crate::error::PlanningError;
use crate::feasibility::schedule;
use crate::model::{Location, UnassignedReason, from_seconds, to_seconds};
use crate::problem::Problem;
use crate::sequencer::SequencedRoute;

/// Allowed gap between a route's reported and recomputed distance.
const DISTANCE_TOLERANCE_KM: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Every demand point is routed.
    Ok,
    /// Some demand points could not be routed.
    Partial,
    /// Nothing to route.
    NoDemand,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Ok => "ok",
            PlanStatus::Partial => "partial",
            PlanStatus::NoDemand => "no_demand",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStop {
    pub id: String,
    pub location: Location,
    pub weight_kg: f64,
    /// 1-based position in the route.
    pub order: usize,
    pub estimated_arrival: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub stop_count: usize,
    pub total_distance: f64,
    pub total_load_kg: f64,
    pub load_utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute {
    vehicle_id: String,
    capacity_kg: f64,
    stops: Vec<PlannedStop>,
    summary: RouteSummary,
    seed_distance: f64,
}

impl PlannedRoute {
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn capacity_kg(&self) -> f64 {
        self.capacity_kg
    }

    pub fn stops(&self) -> &[PlannedStop] {
        &self.stops
    }

    pub fn summary(&self) -> &RouteSummary {
        &self.summary
    }

    /// Distance of the seed order the local search started from: the
    /// nearest-neighbor tour, or the clustering order when that tour was
    /// infeasible.
    pub fn seed_distance(&self) -> f64 {
        self.seed_distance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnassignedDemand {
    pub id: String,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub total_routes: usize,
    pub total_unassigned: usize,
    pub total_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    status: PlanStatus,
    routes: Vec<PlannedRoute>,
    unassigned: Vec<UnassignedDemand>,
    skipped: Vec<SkippedRecord>,
    summary: PlanSummary,
}

impl Plan {
    /// Plan for a run with no routable demand.
    pub fn no_demand(skipped: Vec<SkippedRecord>) -> Self {
        Self {
            status: PlanStatus::NoDemand,
            routes: Vec::new(),
            unassigned: Vec::new(),
            skipped,
            summary: PlanSummary {
                total_routes: 0,
                total_unassigned: 0,
                total_distance: 0.0,
            },
        }
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn routes(&self) -> &[PlannedRoute] {
        &self.routes
    }

    pub fn unassigned(&self) -> &[UnassignedDemand] {
        &self.unassigned
    }

    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn summary(&self) -> &PlanSummary {
        &self.summary
    }
}

pub fn assemble(
    problem: &Problem<'_>,
    routes: Vec<SequencedRoute>,
    unassigned: Vec<UnassignedPoint>,
    skipped: Vec<SkippedRecord>,
) -> Result<Plan, PlanningError> {
    if problem.points.is_empty() {
        return Ok(Plan::no_demand(skipped));
    }

    verify(problem, &routes, &unassigned).inspect_err(|err| {
        if let PlanningError::SolverFault { message, context } = err {
            error!(%message, %context, points = problem.points.len(), "plan failed verification");
        }
    })?;

    let planned: Vec<PlannedRoute> = routes
        .iter()
        .filter(|route| !route.stops.is_empty())
        .map(|route| planned_route(problem, route))
        .collect();

    let unassigned: Vec<UnassignedDemand> = unassigned
        .iter()
        .map(|entry| UnassignedDemand {
            id: problem.id(entry.point_index).to_string(),
            reason: entry.reason,
        })
        .collect();

    let status = if unassigned.is_empty() {
        PlanStatus::Ok
    } else {
        PlanStatus::Partial
    };
    let summary = PlanSummary {
        total_routes: planned.len(),
        total_unassigned: unassigned.len(),
        total_distance: planned.iter().map(|route| route.summary.total_distance).sum(),
    };

    Ok(Plan {
        status,
        routes: planned,
        unassigned,
        skipped,
        summary,
    })
}

fn planned_route(problem: &Problem<'_>, route: &SequencedRoute) -> PlannedRoute {
    let vehicle = &problem.vehicles[route.vehicle_index];
    let timeline = schedule(&route.stops, to_seconds(vehicle.available_from), problem);

    let stops = route
        .stops
        .iter()
        .zip(&timeline.arrivals)
        .enumerate()
        .map(|(position, (&stop, &arrival))| {
            let point = &problem.points[stop];
            PlannedStop {
                id: point.id.clone(),
                location: point.location,
                weight_kg: point.weight_kg,
                order: position + 1,
                estimated_arrival: from_seconds(arrival),
            }
        })
        .collect();

    let total_load_kg = problem.load(&route.stops);
    PlannedRoute {
        vehicle_id: vehicle.id.clone(),
        capacity_kg: vehicle.capacity_kg,
        stops,
        summary: RouteSummary {
            stop_count: route.stops.len(),
            total_distance: route.distance_km,
            total_load_kg,
            load_utilization: total_load_kg / vehicle.capacity_kg,
        },
        seed_distance: route.seed_distance_km,
    }
}

fn verify(
    problem: &Problem<'_>,
    routes: &[SequencedRoute],
    unassigned: &[UnassignedPoint],
) -> Result<(), PlanningError> {
    let mut placements = vec![0usize; problem.points.len()];
    let mut vehicle_used = vec![false; problem.vehicles.len()];

    for route in routes {
        let vehicle = problem.vehicles.get(route.vehicle_index).ok_or_else(|| {
            PlanningError::fault(
                "route references an unknown vehicle",
                format!("vehicle_index={}", route.vehicle_index),
            )
        })?;
        if std::mem::replace(&mut vehicle_used[route.vehicle_index], true) {
            return Err(PlanningError::fault(
                "vehicle assigned more than one route",
                format!("vehicle={}", vehicle.id),
            ));
        }

        let load = problem.load(&route.stops);
        if !vehicle.fits(load) {
            return Err(PlanningError::fault(
                "route load exceeds vehicle capacity",
                format!("vehicle={} load_kg={load} capacity_kg={}", vehicle.id, vehicle.capacity_kg),
            ));
        }

        if !problem.allows_stops(route.stops.len()) {
            return Err(PlanningError::fault(
                "route exceeds the stop limit",
                format!("vehicle={} stops={}", vehicle.id, route.stops.len()),
            ));
        }

        let recomputed = problem.matrix.route_distance(&route.stops);
        if (recomputed - route.distance_km).abs() > DISTANCE_TOLERANCE_KM {
            return Err(PlanningError::fault(
                "route distance drifted from the travel matrix",
                format!(
                    "vehicle={} reported_km={} recomputed_km={recomputed}",
                    vehicle.id, route.distance_km
                ),
            ));
        }

        for &stop in &route.stops {
            count_placement(&mut placements, stop)?;
        }
    }

    for entry in unassigned {
        count_placement(&mut placements, entry.point_index)?;
    }

    if let Some(missing) = placements.iter().position(|&count| count == 0) {
        return Err(PlanningError::fault(
            "demand point neither routed nor unassigned",
            format!("point={}", problem.id(missing)),
        ));
    }
    if let Some(twice) = placements.iter().position(|&count| count > 1) {
        return Err(PlanningError::fault(
            "demand point placed more than once",
            format!("point={} placements={}", problem.id(twice), placements[twice]),
        ));
    }

    Ok(())
}

fn count_placement(placements: &mut [usize], stop: usize) -> Result<(), PlanningError> {
    let slot = placements
        .get_mut(stop)
        .ok_or_else(|| PlanningError::fault("route references an unknown point", format!("index={stop}")))?;
    *slot += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DemandPoint, Vehicle};
    use crate::problem::fixtures::{grid_matrix, point};

    fn fixture() -> (Vec<DemandPoint>, Vec<Vehicle>) {
        (
            vec![
                point("a", 1.0, 0.0, 30.0),
                point("b", 2.0, 0.0, 20.0),
                point("c", 0.0, 5.0, 70.0),
            ],
            vec![Vehicle::new("truck-1", 100.0), Vehicle::new("truck-2", 100.0)],
        )
    }

    fn sequenced(vehicle_index: usize, stops: Vec<usize>, problem: &Problem<'_>) -> SequencedRoute {
        let distance_km = problem.matrix.route_distance(&stops);
        SequencedRoute {
            vehicle_index,
            stops,
            distance_km,
            seed_distance_km: distance_km,
            iterations: 0,
        }
    }

    #[test]
    fn complete_partition_is_ok() {
        let (points, vehicles) = fixture();
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let routes = vec![sequenced(0, vec![0, 1], &problem), sequenced(1, vec![2], &problem)];
        let plan = assemble(&problem, routes, vec![], vec![]).unwrap();

        assert_eq!(plan.status(), PlanStatus::Ok);
        assert_eq!(plan.summary().total_routes, 2);
        assert_eq!(plan.summary().total_distance, 4.0 + 10.0);

        let first = &plan.routes()[0];
        assert_eq!(first.vehicle_id(), "truck-1");
        assert_eq!(first.summary().total_load_kg, 50.0);
        assert_eq!(first.summary().load_utilization, 0.5);
        let orders: Vec<usize> = first.stops().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2]);
        // epoch start, one minute per km
        assert_eq!(first.stops()[1].estimated_arrival.as_second(), 120);
    }

    #[test]
    fn unassigned_points_make_the_plan_partial() {
        let (points, vehicles) = fixture();
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let unassigned = vec![UnassignedPoint {
            point_index: 2,
            reason: UnassignedReason::CapacityExceeded,
        }];
        let plan = assemble(&problem, vec![sequenced(0, vec![1, 0], &problem)], unassigned, vec![]).unwrap();

        assert_eq!(plan.status(), PlanStatus::Partial);
        assert_eq!(plan.unassigned()[0].id, "c");
        assert_eq!(plan.summary().total_unassigned, 1);
    }

    #[test]
    fn missing_point_is_a_solver_fault() {
        let (points, vehicles) = fixture();
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let err = assemble(&problem, vec![sequenced(0, vec![0, 1], &problem)], vec![], vec![]).unwrap_err();
        assert!(matches!(err, PlanningError::SolverFault { ref context, .. } if context == "point=c"));
    }

    #[test]
    fn duplicate_point_is_a_solver_fault() {
        let (points, vehicles) = fixture();
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let routes = vec![sequenced(0, vec![0, 1], &problem), sequenced(1, vec![2, 0], &problem)];
        assert!(assemble(&problem, routes, vec![], vec![]).is_err());
    }

    #[test]
    fn overloaded_route_is_a_solver_fault() {
        let (points, vehicles) = fixture();
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let routes = vec![sequenced(0, vec![0, 1, 2], &problem)];
        let err = assemble(&problem, routes, vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn route_over_the_stop_limit_is_a_solver_fault() {
        let (points, vehicles) = fixture();
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix).with_stop_limit(Some(1));

        let routes = vec![sequenced(0, vec![0, 1], &problem), sequenced(1, vec![2], &problem)];
        let err = assemble(&problem, routes, vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("stop limit"));
    }

    #[test]
    fn drifted_distance_is_a_solver_fault() {
        let (points, vehicles) = fixture();
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let mut route = sequenced(0, vec![0, 1], &problem);
        route.distance_km += 0.5;
        let routes = vec![route, sequenced(1, vec![2], &problem)];
        assert!(assemble(&problem, routes, vec![], vec![]).is_err());
    }

    #[test]
    fn empty_demand_is_no_demand() {
        let vehicles = vec![Vehicle::new("truck-1", 100.0)];
        let matrix = grid_matrix(&[]);
        let problem = Problem::new(&[], &vehicles, &matrix);

        let plan = assemble(&problem, vec![], vec![], vec![]).unwrap();
        assert_eq!(plan.status(), PlanStatus::NoDemand);
        assert_eq!(plan.summary().total_distance, 0.0);
    }
}
