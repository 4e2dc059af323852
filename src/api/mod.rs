//! HTTP service.
//!
//! Planning is CPU-bound and its collaborators use blocking clients, so each
//! run goes to the blocking pool under the configured planning timeout.

mod error;
mod wire;

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::error::PlanningError;
use crate::fleet::FleetSpec;
use crate::plan::Plan;
use crate::providers::{demand_source, distance_provider};
use crate::solver::{PlanRequest, Planner};

pub use error::ApiError;
pub use wire::{DynamicRouteRequest, RouteRequest, RouteResponse, parse_date};

pub struct AppState {
    pub config: ServiceConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/routes/generate", post(generate_routes))
        .route("/routes/dynamic", post(dynamic_routes))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate_routes(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Json(body) = payload?;
    let request = body.into_plan_request()?;
    info!(pickups = request.pickups.len(), "route generation requested");

    let plan = run_planning(&state, move |config| {
        let provider = distance_provider(config)?;
        Planner::new(config.planner.clone(), provider).plan(request)
    })
    .await?;

    Ok(Json(RouteResponse::from(&plan)))
}

async fn dynamic_routes(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DynamicRouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Json(body) = payload?;
    let date = parse_date(&body.date)?;
    let max_stops_per_route = body.max_stops_per_route;
    info!(%date, "dynamic route generation requested");

    let fleet = FleetSpec {
        num_vehicles: body.num_trucks,
        vehicle_capacity_kg: body.vehicle_capacity_kg,
        date: Some(date),
        vehicles: None,
    };
    let plan = run_planning(&state, move |config| {
        let pickups = demand_source(config)?.fetch(date)?;
        let provider = distance_provider(config)?;
        Planner::new(config.planner.clone(), provider).plan(PlanRequest {
            pickups,
            depot: None,
            fleet,
            max_stops_per_route,
        })
    })
    .await?;

    Ok(Json(RouteResponse::from(&plan)))
}

/// Run a planning job on the blocking pool. A job that outlives the timeout
/// is abandoned and its result dropped.
async fn run_planning<F>(state: &Arc<AppState>, job: F) -> Result<Plan, ApiError>
where
    F: FnOnce(&ServiceConfig) -> Result<Plan, PlanningError> + Send + 'static,
{
    let timeout = state.config.planning_timeout;
    let state = Arc::clone(state);
    let handle = tokio::task::spawn_blocking(move || job(&state.config));

    let result = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            error!(error = %join_error, "planning task failed");
            Err(PlanningError::fault("planning task failed", join_error.to_string()))
        }
        Err(_) => Err(PlanningError::TimedOut),
    };

    result.map_err(|err| {
        if err.is_retryable() {
            warn!(error = %err, timeout_secs = timeout.as_secs_f64(), "planning aborted, caller may retry");
        }
        ApiError::from(err)
    })
}
