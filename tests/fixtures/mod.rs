//! Test fixtures for fleet-planner.
//!
//! Provides realistic test data including:
//! - Real Accra locations (from OpenStreetMap)
//! - A builder for pickup records as citizens submit them

#![allow(dead_code)]

pub mod accra_locations;

pub use accra_locations::*;

use fleet_planner::demand::RawPickup;
use serde_json::{Value, json};

/// Builder for pickup records with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestPickup {
    id: String,
    lat: f64,
    lon: f64,
    weight_kg: Option<f64>,
    window: Option<(String, String)>,
}

impl TestPickup {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            lat: 0.0,
            lon: 0.0,
            weight_kg: Some(50.0),
            window: None,
        }
    }

    pub fn at(id: &str, place: &Place) -> Self {
        Self::new(id).location(place.lat, place.lon)
    }

    pub fn location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }

    pub fn weight(mut self, kg: f64) -> Self {
        self.weight_kg = Some(kg);
        self
    }

    pub fn window(mut self, start: &str, end: &str) -> Self {
        self.window = Some((start.to_string(), end.to_string()));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "citizen_id": self.id,
            "latitude": self.lat,
            "longitude": self.lon,
        });
        if let Some(weight) = self.weight_kg {
            value["approxGarbageWeight"] = json!(weight);
        }
        if let Some((start, end)) = &self.window {
            value["pickup_time_window_start"] = json!(start);
            value["pickup_time_window_end"] = json!(end);
        }
        value
    }

    pub fn build(&self) -> RawPickup {
        serde_json::from_value(self.to_json()).expect("fixture pickup is valid JSON")
    }
}

/// One pickup at every fixture location, weights cycling 40..=180 kg.
pub fn accra_pickups() -> Vec<TestPickup> {
    ALL.iter()
        .enumerate()
        .map(|(i, place)| TestPickup::at(&format!("C{:03}", i + 1), place).weight(40.0 + 20.0 * (i % 8) as f64))
        .collect()
}

pub fn raw(pickups: &[TestPickup]) -> Vec<RawPickup> {
    pickups.iter().map(TestPickup::build).collect()
}
