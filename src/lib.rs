//! fleet-planner
//!
//! Capacitated route planning for a waste-pickup fleet: one day's pickups
//! and a fleet in, a deterministic set of truck routes out, with every
//! pickup either routed or reported as unassigned.

pub mod api;
pub mod clustering;
pub mod config;
pub mod demand;
pub mod error;
pub mod euclidean;
pub mod feasibility;
pub mod fleet;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod plan;
pub mod problem;
pub mod providers;
pub mod sequencer;
pub mod solver;
pub mod sources;
pub mod traits;

pub use error::{PlanningError, Upstream};
pub use plan::{Plan, PlanStatus};
pub use solver::{PlanRequest, Planner, PlanningInput, SolveOptions, solve};
