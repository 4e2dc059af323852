//! Capacity-aware clustering.
//!
//! Points are grouped into vehicle-sized routes with the Clarke-Wright
//! savings heuristic, routes are handed to vehicles largest load first, and
//! whatever found no vehicle is repaired by cheapest feasible insertion into
//! the routes that did. A configured stop limit caps every route alongside
//! vehicle capacity.

use tracing::debug;

use crate::feasibility::{check, is_feasible, windows_feasible_from};
use crate::matrix::Node;
use crate::model::{CAPACITY_EPSILON, UnassignedReason, Vehicle, to_seconds};
use crate::problem::Problem;

/// Stops grouped for one vehicle, in visiting order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRoute {
    pub vehicle_index: usize,
    pub stops: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnassignedPoint {
    pub point_index: usize,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clustering {
    /// Non-empty routes, ordered by vehicle index.
    pub routes: Vec<ClusterRoute>,
    /// Ordered by point index.
    pub unassigned: Vec<UnassignedPoint>,
}

#[derive(Debug, Clone, Copy)]
struct Saving {
    value: f64,
    i: usize,
    j: usize,
}

pub fn cluster(problem: &Problem<'_>) -> Clustering {
    let mut unassigned = Vec::new();
    let mut candidates = Vec::with_capacity(problem.points.len());

    for index in 0..problem.points.len() {
        match singleton_rejection(index, problem) {
            Some(reason) => unassigned.push(UnassignedPoint {
                point_index: index,
                reason,
            }),
            None => candidates.push(index),
        }
    }

    let routes = merge_by_savings(&candidates, problem);
    let (mut assigned, leftover) = assign_to_vehicles(routes, problem);
    repair(&mut assigned, leftover, problem, &mut unassigned);

    unassigned.sort_by_key(|entry| entry.point_index);
    let routes: Vec<ClusterRoute> = assigned
        .into_iter()
        .enumerate()
        .filter(|(_, stops)| !stops.is_empty())
        .map(|(vehicle_index, stops)| ClusterRoute {
            vehicle_index,
            stops,
        })
        .collect();

    debug!(
        routes = routes.len(),
        unassigned = unassigned.len(),
        "clustering finished"
    );
    Clustering { routes, unassigned }
}

/// Why a point cannot be served even on its own, if it cannot.
fn singleton_rejection(index: usize, problem: &Problem<'_>) -> Option<UnassignedReason> {
    if !problem.allows_stops(1) {
        return Some(UnassignedReason::StopLimitReached);
    }

    let single = [index];
    if problem
        .vehicles
        .iter()
        .any(|vehicle| is_feasible(&single, vehicle, problem))
    {
        return None;
    }

    if problem.points[index].weight_kg > problem.max_capacity() + CAPACITY_EPSILON {
        return Some(UnassignedReason::CapacityExceeded);
    }

    let reason = fleet_order(problem)
        .into_iter()
        .map(|v| &problem.vehicles[v])
        .find(|vehicle| vehicle.fits(problem.points[index].weight_kg))
        .and_then(|vehicle| first_timing_reason(&single, vehicle, problem))
        .unwrap_or(UnassignedReason::WindowMissed);
    Some(reason)
}

fn first_timing_reason(
    stops: &[usize],
    vehicle: &Vehicle,
    problem: &Problem<'_>,
) -> Option<UnassignedReason> {
    check(stops, vehicle, problem)
        .violations
        .iter()
        .filter_map(|violation| violation.reason())
        .find(|reason| *reason != UnassignedReason::CapacityExceeded)
}

/// Vehicle indices by capacity descending, then id.
fn fleet_order(problem: &Problem<'_>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..problem.vehicles.len()).collect();
    order.sort_by(|&a, &b| {
        let (va, vb) = (&problem.vehicles[a], &problem.vehicles[b]);
        vb.capacity_kg
            .total_cmp(&va.capacity_kg)
            .then_with(|| va.id.cmp(&vb.id))
    });
    order
}

fn savings(candidates: &[usize], problem: &Problem<'_>) -> Vec<Saving> {
    let matrix = problem.matrix;
    let mut list = Vec::with_capacity(candidates.len() * candidates.len().saturating_sub(1) / 2);
    for (a, &i) in candidates.iter().enumerate() {
        for &j in &candidates[a + 1..] {
            let value = matrix.distance(Node::Depot, Node::Point(i))
                + matrix.distance(Node::Depot, Node::Point(j))
                - matrix.distance(Node::Point(i), Node::Point(j));
            list.push(Saving { value, i, j });
        }
    }

    list.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| pair_key(a, problem).cmp(&pair_key(b, problem)))
    });
    list
}

fn pair_key<'p>(saving: &Saving, problem: &'p Problem<'_>) -> (&'p str, &'p str) {
    let (a, b) = (problem.id(saving.i), problem.id(saving.j));
    if a <= b { (a, b) } else { (b, a) }
}

fn merge_by_savings(candidates: &[usize], problem: &Problem<'_>) -> Vec<Vec<usize>> {
    let mut routes: Vec<Option<Vec<usize>>> = candidates.iter().map(|&i| Some(vec![i])).collect();
    let mut route_of: Vec<Option<usize>> = vec![None; problem.points.len()];
    for (slot, &i) in candidates.iter().enumerate() {
        route_of[i] = Some(slot);
    }

    let max_capacity = problem.max_capacity();
    let fleet_start = problem
        .vehicles
        .iter()
        .map(|vehicle| to_seconds(vehicle.available_from))
        .min()
        .unwrap_or(0);
    let mut live = candidates.len();
    let mut merges = 0usize;

    for saving in savings(candidates, problem) {
        if saving.value <= 0.0 && live <= problem.vehicles.len() {
            break;
        }
        let (Some(ri), Some(rj)) = (route_of[saving.i], route_of[saving.j]) else {
            continue;
        };
        if ri == rj {
            continue;
        }
        let (Some(left), Some(right)) = (routes[ri].as_ref(), routes[rj].as_ref()) else {
            continue;
        };
        if problem.load(left) + problem.load(right) > max_capacity + CAPACITY_EPSILON
            || !problem.allows_stops(left.len() + right.len())
        {
            continue;
        }

        let merged = merge_candidates(left, right, saving.i, saving.j)
            .into_iter()
            .find(|sequence| windows_feasible_from(sequence, fleet_start, problem));
        let Some(merged) = merged else {
            continue;
        };

        for &stop in &merged {
            route_of[stop] = Some(ri);
        }
        routes[ri] = Some(merged);
        routes[rj] = None;
        live -= 1;
        merges += 1;
    }

    debug!(candidates = candidates.len(), merges, routes = live, "savings merge done");
    routes.into_iter().flatten().collect()
}

/// Orientations that join `i` and `j` end to start, in preference order.
fn merge_candidates(ri: &[usize], rj: &[usize], i: usize, j: usize) -> Vec<Vec<usize>> {
    let is_start = |route: &[usize], p: usize| route.first() == Some(&p);
    let is_end = |route: &[usize], p: usize| route.last() == Some(&p);

    let mut out = Vec::new();
    if is_end(ri, i) && is_start(rj, j) {
        out.push([ri, rj].concat());
    }
    if is_end(rj, j) && is_start(ri, i) {
        out.push([rj, ri].concat());
    }
    if is_end(ri, i) && is_end(rj, j) {
        out.push(ri.iter().chain(rj.iter().rev()).copied().collect());
    }
    if is_start(ri, i) && is_start(rj, j) {
        out.push(ri.iter().rev().chain(rj).copied().collect());
    }
    out
}

/// Give each route the first unused vehicle that can run it.
///
/// Returns per-vehicle stop lists (empty for idle vehicles) and the points
/// of routes nobody could take.
fn assign_to_vehicles(mut routes: Vec<Vec<usize>>, problem: &Problem<'_>) -> (Vec<Vec<usize>>, Vec<usize>) {
    routes.sort_by(|a, b| {
        problem
            .load(b)
            .total_cmp(&problem.load(a))
            .then_with(|| lowest_id(a, problem).cmp(&lowest_id(b, problem)))
    });

    let order = fleet_order(problem);
    let mut assigned: Vec<Vec<usize>> = vec![Vec::new(); problem.vehicles.len()];
    let mut used = vec![false; problem.vehicles.len()];
    let mut leftover = Vec::new();

    for route in routes {
        let vehicle = order
            .iter()
            .copied()
            .find(|&v| !used[v] && is_feasible(&route, &problem.vehicles[v], problem));
        match vehicle {
            Some(v) => {
                used[v] = true;
                assigned[v] = route;
            }
            None => leftover.extend(route),
        }
    }

    (assigned, leftover)
}

fn lowest_id<'p>(route: &[usize], problem: &'p Problem<'_>) -> &'p str {
    route
        .iter()
        .map(|&stop| problem.id(stop))
        .min()
        .unwrap_or("")
}

fn repair(
    assigned: &mut [Vec<usize>],
    mut leftover: Vec<usize>,
    problem: &Problem<'_>,
    unassigned: &mut Vec<UnassignedPoint>,
) {
    if leftover.is_empty() {
        return;
    }
    leftover.sort_by(|&a, &b| problem.id(a).cmp(problem.id(b)));
    debug!(points = leftover.len(), "repairing overflow");

    for point in leftover {
        match cheapest_insertion(assigned, point, problem) {
            Some((v, position)) => assigned[v].insert(position, point),
            None => unassigned.push(UnassignedPoint {
                point_index: point,
                reason: insertion_failure(assigned, point, problem),
            }),
        }
    }
}

fn cheapest_insertion(assigned: &[Vec<usize>], point: usize, problem: &Problem<'_>) -> Option<(usize, usize)> {
    let mut best: Option<(f64, usize, usize)> = None;

    for (v, stops) in assigned.iter().enumerate() {
        let vehicle = &problem.vehicles[v];
        if !vehicle.fits(problem.load(stops) + problem.points[point].weight_kg)
            || !problem.allows_stops(stops.len() + 1)
        {
            continue;
        }
        let base = problem.matrix.route_distance(stops);

        for position in 0..=stops.len() {
            let mut candidate = stops.clone();
            candidate.insert(position, point);
            if !is_feasible(&candidate, vehicle, problem) {
                continue;
            }
            let delta = problem.matrix.route_distance(&candidate) - base;
            let better = best.is_none_or(|(best_delta, _, _)| delta < best_delta);
            if better {
                best = Some((delta, v, position));
            }
        }
    }

    best.map(|(_, v, position)| (v, position))
}

fn insertion_failure(assigned: &[Vec<usize>], point: usize, problem: &Problem<'_>) -> UnassignedReason {
    let weight = problem.points[point].weight_kg;
    let mut with_weight_room = assigned
        .iter()
        .enumerate()
        .filter(|(v, stops)| problem.vehicles[*v].fits(problem.load(stops) + weight))
        .peekable();
    if with_weight_room.peek().is_none() {
        return UnassignedReason::CapacityExceeded;
    }

    match with_weight_room.find(|(_, stops)| problem.allows_stops(stops.len() + 1)) {
        None => UnassignedReason::StopLimitReached,
        Some((v, stops)) => {
            let mut appended = stops.clone();
            appended.push(point);
            first_timing_reason(&appended, &problem.vehicles[v], problem)
                .unwrap_or(UnassignedReason::WindowMissed)
        }
    }
}
