//! End-to-end planning tests
//!
//! Drives the planner from raw pickup records to a finished plan and checks
//! the plan-level guarantees: partition, capacity, determinism and the
//! status/reason reporting.

mod fixtures;

use std::collections::HashMap;

use fixtures::{TestPickup, accra_pickups, raw};
use fleet_planner::config::PlannerConfig;
use fleet_planner::fleet::{FleetSpec, VehicleSpec};
use fleet_planner::haversine::HaversineModel;
use fleet_planner::model::UnassignedReason;
use fleet_planner::sources::SimulatedDemandSource;
use fleet_planner::traits::DemandSource;
use fleet_planner::{Plan, PlanRequest, PlanStatus, Planner};
use jiff::civil::date;

// ============================================================================
// Helpers
// ============================================================================

fn planner() -> Planner<HaversineModel> {
    Planner::new(PlannerConfig::default(), HaversineModel::default())
}

fn fleet(num_vehicles: i64, capacity_kg: f64) -> FleetSpec {
    FleetSpec {
        num_vehicles: Some(num_vehicles),
        vehicle_capacity_kg: Some(capacity_kg),
        ..FleetSpec::default()
    }
}

fn plan(pickups: &[TestPickup], fleet: FleetSpec) -> Plan {
    planner()
        .plan(PlanRequest {
            pickups: raw(pickups),
            depot: None,
            fleet,
            ..PlanRequest::default()
        })
        .expect("planning succeeds")
}

/// How often each id shows up across routes and the unassigned list.
fn placements(plan: &Plan) -> HashMap<String, usize> {
    let mut seen = HashMap::new();
    for route in plan.routes() {
        for stop in route.stops() {
            *seen.entry(stop.id.clone()).or_default() += 1;
        }
    }
    for entry in plan.unassigned() {
        *seen.entry(entry.id.clone()).or_default() += 1;
    }
    seen
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn every_pickup_is_routed_or_unassigned_exactly_once() {
    let pickups = accra_pickups();
    for (vehicles, capacity) in [(1, 2000.0), (3, 600.0), (2, 300.0), (5, 150.0)] {
        let plan = plan(&pickups, fleet(vehicles, capacity));
        let seen = placements(&plan);

        assert_eq!(seen.len(), pickups.len(), "fleet {vehicles}x{capacity}");
        assert!(seen.values().all(|&count| count == 1), "fleet {vehicles}x{capacity}");
    }
}

#[test]
fn no_route_exceeds_its_vehicle_capacity() {
    let plan = plan(&accra_pickups(), fleet(4, 400.0));
    assert!(!plan.routes().is_empty());

    for route in plan.routes() {
        assert!(
            route.summary().total_load_kg <= route.capacity_kg() + 1e-9,
            "{} carries {} kg",
            route.vehicle_id(),
            route.summary().total_load_kg
        );
        assert!(route.summary().load_utilization <= 1.0 + 1e-9);
    }
}

#[test]
fn identical_requests_give_byte_identical_plans() {
    let first = serde_json::to_string(&plan(&accra_pickups(), fleet(3, 600.0))).unwrap();
    let second = serde_json::to_string(&plan(&accra_pickups(), fleet(3, 600.0))).unwrap();
    assert_eq!(first, second);
}

#[test]
fn local_search_never_loses_to_its_seed() {
    let plan = plan(&accra_pickups(), fleet(2, 1000.0));
    for route in plan.routes() {
        assert!(route.summary().total_distance <= route.seed_distance() + 1e-9);
    }
}

#[test]
fn summary_totals_match_routes() {
    let plan = plan(&accra_pickups(), fleet(3, 600.0));
    let distance: f64 = plan.routes().iter().map(|r| r.summary().total_distance).sum();

    assert_eq!(plan.summary().total_routes, plan.routes().len());
    assert_eq!(plan.summary().total_unassigned, plan.unassigned().len());
    assert!((plan.summary().total_distance - distance).abs() < 1e-9);
    for route in plan.routes() {
        let orders: Vec<usize> = route.stops().iter().map(|s| s.order).collect();
        assert_eq!(orders, (1..=route.stops().len()).collect::<Vec<_>>());
    }
}

// ============================================================================
// Status and reasons
// ============================================================================

#[test]
fn empty_input_is_no_demand() {
    let plan = plan(&[], fleet(2, 2000.0));
    assert_eq!(plan.status(), PlanStatus::NoDemand);
    assert!(plan.routes().is_empty());
    assert!(plan.unassigned().is_empty());
}

#[test]
fn only_invalid_records_is_no_demand_with_skips() {
    let pickups = vec![TestPickup::new("nowhere").location(120.0, 0.0)];
    let plan = plan(&pickups, fleet(1, 2000.0));
    assert_eq!(plan.status(), PlanStatus::NoDemand);
    assert_eq!(plan.skipped().len(), 1);
}

#[test]
fn single_pickup_plans_ok() {
    let pickups = vec![TestPickup::at("solo", &fixtures::ACCRA_MALL).weight(120.0)];
    let plan = plan(&pickups, FleetSpec::default());

    assert_eq!(plan.status(), PlanStatus::Ok);
    assert_eq!(plan.routes().len(), 1);
    let stop = &plan.routes()[0].stops()[0];
    assert_eq!(stop.id, "solo");
    assert_eq!(stop.order, 1);
    assert!(plan.summary().total_distance > 0.0);
}

#[test]
fn two_heavy_pickups_overflow_one_truck() {
    let pickups = vec![
        TestPickup::at("h1", &fixtures::DZORWULU).weight(1500.0),
        TestPickup::at("h2", &fixtures::EAST_LEGON).weight(1500.0),
    ];
    let plan = plan(&pickups, fleet(1, 2000.0));

    assert_eq!(plan.status(), PlanStatus::Partial);
    assert_eq!(plan.routes().len(), 1);
    assert_eq!(plan.unassigned().len(), 1);
    assert_eq!(plan.unassigned()[0].reason, UnassignedReason::CapacityExceeded);
}

#[test]
fn pickup_heavier_than_any_truck_is_capacity_exceeded() {
    let pickups = vec![
        TestPickup::at("huge", &fixtures::TESHIE).weight(5000.0),
        TestPickup::at("small", &fixtures::LABADI_BEACH).weight(10.0),
    ];
    let plan = plan(&pickups, fleet(2, 2000.0));

    assert_eq!(plan.status(), PlanStatus::Partial);
    assert_eq!(plan.unassigned()[0].id, "huge");
    assert_eq!(plan.unassigned()[0].reason, UnassignedReason::CapacityExceeded);
}

#[test]
fn window_closed_before_the_shift_is_window_missed() {
    let pickups = vec![
        TestPickup::at("early", &fixtures::MAKOLA_MARKET)
            .window("2024-05-01T05:00:00Z", "2024-05-01T07:00:00Z"),
        TestPickup::at("any", &fixtures::OXFORD_STREET),
    ];
    let spec = FleetSpec {
        date: Some(date(2024, 5, 1)),
        ..fleet(1, 2000.0)
    };
    let plan = plan(&pickups, spec);

    assert_eq!(plan.status(), PlanStatus::Partial);
    assert_eq!(plan.unassigned().len(), 1);
    assert_eq!(plan.unassigned()[0].id, "early");
    assert_eq!(plan.unassigned()[0].reason, UnassignedReason::WindowMissed);
}

#[test]
fn arrivals_start_at_the_shift_and_respect_windows() {
    let pickups = vec![
        TestPickup::at("late-window", &fixtures::KANESHIE_MARKET)
            .window("2024-05-01T11:00:00Z", "2024-05-01T12:00:00Z"),
        TestPickup::at("open", &fixtures::DZORWULU),
    ];
    let spec = FleetSpec {
        date: Some(date(2024, 5, 1)),
        ..fleet(1, 2000.0)
    };
    let plan = plan(&pickups, spec);
    assert_eq!(plan.status(), PlanStatus::Ok);

    let shift_start: jiff::Timestamp = "2024-05-01T08:00:00Z".parse().unwrap();
    let window_end: jiff::Timestamp = "2024-05-01T12:00:00Z".parse().unwrap();
    let stops = plan.routes()[0].stops();
    assert!(stops.iter().all(|s| s.estimated_arrival > shift_start));
    let late = stops.iter().find(|s| s.id == "late-window").unwrap();
    assert!(late.estimated_arrival <= window_end);
}

// ============================================================================
// Fleet shapes and demand sources
// ============================================================================

#[test]
fn explicit_vehicles_are_used_as_given() {
    let spec = FleetSpec {
        vehicles: Some(vec![
            VehicleSpec {
                id: Some("compactor".into()),
                capacity_kg: 1200.0,
                available_from: None,
                available_until: None,
            },
            VehicleSpec {
                id: Some("pickup-van".into()),
                capacity_kg: 400.0,
                available_from: None,
                available_until: None,
            },
        ]),
        ..FleetSpec::default()
    };
    let plan = plan(&accra_pickups(), spec);

    for route in plan.routes() {
        assert!(["compactor", "pickup-van"].contains(&route.vehicle_id()));
    }
    assert_eq!(placements(&plan).len(), 15);
}

#[test]
fn simulated_day_fits_the_default_truck() {
    let pickups = SimulatedDemandSource::default().fetch(date(2024, 5, 14)).unwrap();
    let plan = planner()
        .plan(PlanRequest {
            pickups: pickups.clone(),
            depot: None,
            fleet: FleetSpec {
                date: Some(date(2024, 5, 14)),
                ..FleetSpec::default()
            },
            ..PlanRequest::default()
        })
        .unwrap();

    if pickups.is_empty() {
        assert_eq!(plan.status(), PlanStatus::NoDemand);
    } else {
        assert_eq!(plan.status(), PlanStatus::Ok);
        let routed: usize = plan.routes().iter().map(|r| r.stops().len()).sum();
        assert_eq!(routed, pickups.len());
    }
}

#[test]
fn fleet_validation_fails_before_planning() {
    let err = planner()
        .plan(PlanRequest {
            pickups: raw(&accra_pickups()),
            depot: None,
            fleet: fleet(0, 2000.0),
            ..PlanRequest::default()
        })
        .unwrap_err();
    assert!(matches!(err, fleet_planner::PlanningError::InputValidation(_)));
}
