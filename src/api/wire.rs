//! JSON contract of the route generation endpoints.

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::demand::{RawPickup, SkippedRecord};
use crate::error::PlanningError;
use crate::fleet::{FleetSpec, VehicleSpec};
use crate::model::Location;
use crate::plan::{Plan, PlanSummary};
use crate::solver::PlanRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    pub pickup_data: Vec<RawPickup>,
    /// `[lat, lon]`
    #[serde(default)]
    pub depot_location: Option<[f64; 2]>,
    #[serde(default)]
    pub num_vehicles: Option<i64>,
    #[serde(default)]
    pub vehicle_capacity_kg: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub vehicles: Option<Vec<VehicleSpec>>,
    #[serde(default)]
    pub max_stops_per_route: Option<usize>,
}

impl RouteRequest {
    pub fn into_plan_request(self) -> Result<PlanRequest, PlanningError> {
        let date = self.date.as_deref().map(parse_date).transpose()?;
        Ok(PlanRequest {
            pickups: self.pickup_data,
            depot: self.depot_location.map(|[lat, lon]| Location::new(lat, lon)),
            fleet: FleetSpec {
                num_vehicles: self.num_vehicles,
                vehicle_capacity_kg: self.vehicle_capacity_kg,
                date,
                vehicles: self.vehicles,
            },
            max_stops_per_route: self.max_stops_per_route,
        })
    }
}

/// Plan the simulated (or stored) demand of a day.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicRouteRequest {
    pub date: String,
    #[serde(default)]
    pub num_trucks: Option<i64>,
    #[serde(default)]
    pub vehicle_capacity_kg: Option<f64>,
    #[serde(default)]
    pub max_stops_per_route: Option<usize>,
}

pub fn parse_date(raw: &str) -> Result<Date, PlanningError> {
    raw.trim()
        .parse::<Date>()
        .map_err(|_| PlanningError::invalid(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteResponse {
    pub status: &'static str,
    pub routes: Vec<Vec<RouteStop>>,
    pub unassigned: Vec<UnassignedEntry>,
    pub summary: PlanSummary,
    pub route_summaries: Vec<RouteSummaryEntry>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteStop {
    pub citizen_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "approxGarbageWeight")]
    pub approx_garbage_weight: f64,
    pub order: usize,
    pub estimated_arrival: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnassignedEntry {
    pub citizen_id: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummaryEntry {
    pub vehicle_id: String,
    pub capacity_kg: f64,
    pub stop_count: usize,
    pub total_distance: f64,
    pub total_load_kg: f64,
    pub load_utilization: f64,
    pub seed_distance: f64,
}

impl From<&Plan> for RouteResponse {
    fn from(plan: &Plan) -> Self {
        let routes = plan
            .routes()
            .iter()
            .map(|route| {
                route
                    .stops()
                    .iter()
                    .map(|stop| RouteStop {
                        citizen_id: stop.id.clone(),
                        latitude: stop.location.lat,
                        longitude: stop.location.lon,
                        approx_garbage_weight: stop.weight_kg,
                        order: stop.order,
                        estimated_arrival: stop.estimated_arrival,
                    })
                    .collect()
            })
            .collect();

        let route_summaries = plan
            .routes()
            .iter()
            .map(|route| RouteSummaryEntry {
                vehicle_id: route.vehicle_id().to_string(),
                capacity_kg: route.capacity_kg(),
                stop_count: route.summary().stop_count,
                total_distance: route.summary().total_distance,
                total_load_kg: route.summary().total_load_kg,
                load_utilization: route.summary().load_utilization,
                seed_distance: route.seed_distance(),
            })
            .collect();

        Self {
            status: plan.status().as_str(),
            routes,
            unassigned: plan
                .unassigned()
                .iter()
                .map(|entry| UnassignedEntry {
                    citizen_id: entry.id.clone(),
                    reason: entry.reason.as_str(),
                })
                .collect(),
            summary: plan.summary().clone(),
            route_summaries,
            skipped: plan.skipped().to_vec(),
        }
    }
}
