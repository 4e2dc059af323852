//! Route sequencing: nearest-neighbor seed improved by local search.

use tracing::debug;

use crate::clustering::ClusterRoute;
use crate::error::PlanningError;
use crate::feasibility::is_feasible;
use crate::matrix::Node;
use crate::problem::Problem;

/// Moves must beat the current cost by more than this to count.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct SequencedRoute {
    pub vehicle_index: usize,
    pub stops: Vec<usize>,
    pub distance_km: f64,
    /// Distance of the seed order the search started from (nearest-neighbor
    /// tour, or clustering order when that tour is infeasible).
    pub seed_distance_km: f64,
    /// Improving moves applied.
    pub iterations: usize,
}

pub fn sequence(
    route: &ClusterRoute,
    problem: &Problem<'_>,
    max_iterations: usize,
) -> Result<SequencedRoute, PlanningError> {
    let vehicle = &problem.vehicles[route.vehicle_index];

    let nearest = nearest_neighbor(&route.stops, problem);
    let seed = if is_feasible(&nearest, vehicle, problem) {
        nearest
    } else if is_feasible(&route.stops, vehicle, problem) {
        route.stops.clone()
    } else {
        return Err(PlanningError::fault(
            "clustered route is infeasible for its vehicle",
            format!("vehicle={} stops={}", vehicle.id, route.stops.len()),
        ));
    };

    let seed_distance_km = problem.matrix.route_distance(&seed);
    let mut stops = seed;
    let mut cost = seed_distance_km;
    let mut iterations = 0;

    while iterations < max_iterations {
        let Some((candidate, candidate_cost)) = improving_move(&stops, cost, route.vehicle_index, problem)
        else {
            break;
        };
        stops = candidate;
        cost = candidate_cost;
        iterations += 1;
    }

    debug!(
        vehicle = %vehicle.id,
        stops = stops.len(),
        seed_km = seed_distance_km,
        final_km = cost,
        iterations,
        "sequenced route"
    );

    Ok(SequencedRoute {
        vehicle_index: route.vehicle_index,
        distance_km: problem.matrix.route_distance(&stops),
        stops,
        seed_distance_km,
        iterations,
    })
}

/// Greedy tour from the depot, always driving to the closest unvisited stop.
/// Equal distances go to the lowest id.
pub fn nearest_neighbor(stops: &[usize], problem: &Problem<'_>) -> Vec<usize> {
    let mut remaining = stops.to_vec();
    let mut tour = Vec::with_capacity(stops.len());
    let mut current = Node::Depot;

    while !remaining.is_empty() {
        let mut best = 0;
        for k in 1..remaining.len() {
            let d = problem.matrix.distance(current, Node::Point(remaining[k]));
            let best_d = problem.matrix.distance(current, Node::Point(remaining[best]));
            if d < best_d || (d == best_d && problem.id(remaining[k]) < problem.id(remaining[best])) {
                best = k;
            }
        }
        let next = remaining.remove(best);
        tour.push(next);
        current = Node::Point(next);
    }

    tour
}

/// First strictly improving feasible move: 2-opt, then or-opt.
fn improving_move(
    stops: &[usize],
    cost: f64,
    vehicle_index: usize,
    problem: &Problem<'_>,
) -> Option<(Vec<usize>, f64)> {
    let n = stops.len();
    if n < 2 {
        return None;
    }
    let vehicle = &problem.vehicles[vehicle_index];
    let accept = |candidate: &[usize]| {
        let candidate_cost = problem.matrix.route_distance(candidate);
        (candidate_cost < cost - IMPROVEMENT_EPSILON && is_feasible(candidate, vehicle, problem))
            .then_some(candidate_cost)
    };

    // 2-opt: reverse stops[i..=j]
    for i in 0..n - 1 {
        for j in i + 1..n {
            let mut candidate = stops.to_vec();
            candidate[i..=j].reverse();
            if let Some(candidate_cost) = accept(&candidate) {
                return Some((candidate, candidate_cost));
            }
        }
    }

    // or-opt: move one stop elsewhere
    for from in 0..n {
        for to in 0..n {
            if to == from {
                continue;
            }
            let mut candidate = stops.to_vec();
            let stop = candidate.remove(from);
            candidate.insert(to, stop);
            if let Some(candidate_cost) = accept(&candidate) {
                return Some((candidate, candidate_cost));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DemandPoint, Vehicle};
    use crate::problem::fixtures::{grid_matrix, point, ts};

    fn route(stops: Vec<usize>) -> ClusterRoute {
        ClusterRoute {
            vehicle_index: 0,
            stops,
        }
    }

    #[test]
    fn nearest_neighbor_prefers_closest_then_lowest_id() {
        let points = vec![
            point("z", 2.0, 0.0, 1.0),
            point("y", 1.0, 0.0, 1.0),
            point("b", 0.0, 3.0, 1.0),
            point("a", 3.0, 0.0, 1.0),
        ];
        let vehicles = vec![Vehicle::new("truck-1", 100.0)];
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        // y (1 km), z (1 km on), a (1 km on), then b
        assert_eq!(nearest_neighbor(&[0, 1, 2, 3], &problem), vec![1, 0, 3, 2]);

        let tied = vec![point("q", 1.0, 0.0, 1.0), point("p", 0.0, 1.0, 1.0)];
        let matrix = grid_matrix(&tied);
        let problem = Problem::new(&tied, &vehicles, &matrix);
        assert_eq!(nearest_neighbor(&[0, 1], &problem), vec![1, 0]);
    }

    #[test]
    fn local_search_never_worse_than_seed() {
        let points: Vec<DemandPoint> = (0..9)
            .map(|n| point(&format!("s{n}"), ((n * 7) % 9) as f64, ((n * 4) % 5) as f64, 1.0))
            .collect();
        let vehicles = vec![Vehicle::new("truck-1", 100.0)];
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let result = sequence(&route((0..9).collect()), &problem, 1000).unwrap();
        assert!(result.distance_km <= result.seed_distance_km + 1e-9);
        let mut sorted = result.stops.clone();
        sorted.sort();
        assert_eq!(sorted, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn two_opt_untangles_a_crossing() {
        let points = vec![
            point("a", 0.0, 10.0, 1.0),
            point("b", 10.0, 10.0, 1.0),
            point("c", 10.0, 0.0, 1.0),
        ];
        let vehicles = vec![Vehicle::new("truck-1", 100.0)];
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let crossed = [0, 2, 1];
        assert_eq!(matrix.route_distance(&crossed), 60.0);
        assert_eq!(
            improving_move(&crossed, 60.0, 0, &problem),
            Some((vec![0, 1, 2], 40.0))
        );

        let result = sequence(&route(crossed.to_vec()), &problem, 1000).unwrap();
        assert_eq!(result.distance_km, 40.0);
        assert_eq!(result.iterations, 0, "nearest-neighbor seed is already optimal");
    }

    #[test]
    fn iteration_ceiling_is_respected() {
        let points: Vec<DemandPoint> = (0..8)
            .map(|n| point(&format!("s{n}"), ((n * 5) % 8) as f64, ((n * 3) % 7) as f64, 1.0))
            .collect();
        let vehicles = vec![Vehicle::new("truck-1", 100.0)];
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let result = sequence(&route((0..8).collect()), &problem, 0).unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.distance_km, result.seed_distance_km);
    }

    #[test]
    fn infeasible_nearest_neighbor_seed_falls_back_to_cluster_order() {
        // nearest-neighbor visits "near" first and then misses "urgent"
        let points = vec![
            point("near", 1.0, 0.0, 1.0),
            point("urgent", 0.0, 5.0, 1.0)
                .with_window(ts("2024-05-01T08:00:00Z"), ts("2024-05-01T08:06:00Z")),
        ];
        let vehicles = vec![Vehicle::new("truck-1", 100.0)
            .with_availability(ts("2024-05-01T08:00:00Z"), ts("2024-05-01T18:00:00Z"))];
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        assert_eq!(nearest_neighbor(&[1, 0], &problem), vec![0, 1]);
        let result = sequence(&route(vec![1, 0]), &problem, 1000).unwrap();
        assert_eq!(result.stops, vec![1, 0]);
        assert!(is_feasible(&result.stops, &vehicles[0], &problem));
        // the reported seed is the clustering order, not the rejected tour
        assert_eq!(result.seed_distance_km, 12.0);
        assert_eq!(result.seed_distance_km, problem.matrix.route_distance(&[1, 0]));
    }

    #[test]
    fn infeasible_cluster_is_a_solver_fault() {
        let points = vec![point("a", 1.0, 0.0, 80.0), point("b", 2.0, 0.0, 80.0)];
        let vehicles = vec![Vehicle::new("truck-1", 100.0)];
        let matrix = grid_matrix(&points);
        let problem = Problem::new(&points, &vehicles, &matrix);

        let err = sequence(&route(vec![0, 1]), &problem, 1000).unwrap_err();
        assert!(matches!(err, PlanningError::SolverFault { .. }));
    }
}
