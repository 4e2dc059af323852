//! Feasibility and constraint checking.
//!
//! Everything here is pure: routes are described by their stop order and
//! nothing is mutated. The same checks gate clustering merges and every
//! local-search move.

use jiff::Timestamp;
use serde::Serialize;

use crate::matrix::Node;
use crate::model::{UnassignedReason, Vehicle, from_seconds, to_seconds};
use crate::problem::Problem;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Violation {
    CapacityExceeded {
        load_kg: f64,
        capacity_kg: f64,
    },
    WindowMissed {
        stop_id: String,
        arrival: Timestamp,
        window_end: Timestamp,
    },
    EmptyRoute,
    /// The truck is back at the depot after its shift ends.
    ShiftOverrun {
        return_at: Timestamp,
        available_until: Timestamp,
    },
}

impl Violation {
    pub fn reason(&self) -> Option<UnassignedReason> {
        match self {
            Violation::CapacityExceeded { .. } => Some(UnassignedReason::CapacityExceeded),
            Violation::WindowMissed { .. } => Some(UnassignedReason::WindowMissed),
            Violation::ShiftOverrun { .. } => Some(UnassignedReason::ShiftOverrun),
            Violation::EmptyRoute => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeasibilityReport {
    pub violations: Vec<Violation>,
}

impl FeasibilityReport {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Simulated timeline of a route, in seconds since the epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// Arrival at each stop, before any waiting.
    pub arrivals: Vec<i64>,
    pub return_at: i64,
}

/// Walk the route from `start`, accumulating leg travel times.
///
/// A truck that arrives before a stop's window opens waits there; waiting
/// costs nothing.
pub fn schedule(stops: &[usize], start: i64, problem: &Problem<'_>) -> Schedule {
    let mut time = start;
    let mut prev = Node::Depot;
    let mut arrivals = Vec::with_capacity(stops.len());

    for &stop in stops {
        time = time.saturating_add(problem.matrix.duration(prev, Node::Point(stop)));
        arrivals.push(time);
        time = time.max(to_seconds(problem.points[stop].window_start));
        prev = Node::Point(stop);
    }

    Schedule {
        arrivals,
        return_at: time.saturating_add(problem.matrix.duration(prev, Node::Depot)),
    }
}

/// Full check of a route for a vehicle, collecting every violation.
pub fn check(stops: &[usize], vehicle: &Vehicle, problem: &Problem<'_>) -> FeasibilityReport {
    let mut violations = Vec::new();

    if stops.is_empty() {
        violations.push(Violation::EmptyRoute);
        return FeasibilityReport { violations };
    }

    let load_kg = problem.load(stops);
    if !vehicle.fits(load_kg) {
        violations.push(Violation::CapacityExceeded {
            load_kg,
            capacity_kg: vehicle.capacity_kg,
        });
    }

    let timeline = schedule(stops, to_seconds(vehicle.available_from), problem);
    for (&stop, &arrival) in stops.iter().zip(&timeline.arrivals) {
        let point = &problem.points[stop];
        if arrival > to_seconds(point.window_end) {
            violations.push(Violation::WindowMissed {
                stop_id: point.id.clone(),
                arrival: from_seconds(arrival),
                window_end: point.window_end,
            });
        }
    }

    if timeline.return_at > to_seconds(vehicle.available_until) {
        violations.push(Violation::ShiftOverrun {
            return_at: from_seconds(timeline.return_at),
            available_until: vehicle.available_until,
        });
    }

    FeasibilityReport { violations }
}

/// Short-circuiting variant of [`check`] for hot loops.
pub fn is_feasible(stops: &[usize], vehicle: &Vehicle, problem: &Problem<'_>) -> bool {
    !stops.is_empty()
        && vehicle.fits(problem.load(stops))
        && windows_feasible_from(stops, to_seconds(vehicle.available_from), problem)
        && schedule(stops, to_seconds(vehicle.available_from), problem).return_at
            <= to_seconds(vehicle.available_until)
}

/// Time-window pre-check: every stop reached by its window end when the
/// route leaves the depot at `start`.
pub fn windows_feasible_from(stops: &[usize], start: i64, problem: &Problem<'_>) -> bool {
    let mut time = start;
    let mut prev = Node::Depot;
    for &stop in stops {
        let point = &problem.points[stop];
        time = time.saturating_add(problem.matrix.duration(prev, Node::Point(stop)));
        if time > to_seconds(point.window_end) {
            return false;
        }
        time = time.max(to_seconds(point.window_start));
        prev = Node::Point(stop);
    }
    true
}
