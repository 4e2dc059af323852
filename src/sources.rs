//! Demand sources: the smart-bin simulator and the persisted request store.

use std::time::Duration;

use jiff::civil::Date;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::{debug, info};

use crate::demand::RawPickup;
use crate::error::{PlanningError, Upstream};
use crate::traits::DemandSource;

/// A fixed collection bin the simulator draws fill levels for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub id: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub capacity_kg: f64,
}

impl Bin {
    pub const fn new(id: &'static str, lat: f64, lon: f64, capacity_kg: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            capacity_kg,
        }
    }
}

/// Sample bins around central Accra.
pub const PREDEFINED_BINS: &[Bin] = &[
    Bin::new("B001", 5.605, -0.187, 100.0),
    Bin::new("B002", 5.610, -0.190, 150.0),
    Bin::new("B003", 5.600, -0.180, 100.0),
    Bin::new("B004", 5.615, -0.175, 200.0),
    Bin::new("B005", 5.595, -0.195, 100.0),
    Bin::new("B006", 5.608, -0.170, 150.0),
    Bin::new("B007", 5.602, -0.200, 100.0),
    Bin::new("B008", 5.612, -0.185, 200.0),
    Bin::new("B009", 5.598, -0.178, 150.0),
    Bin::new("B010", 5.606, -0.192, 100.0),
];

/// Fill percentage above which a bin needs collecting.
const COLLECTION_THRESHOLD_PERCENT: u32 = 75;

/// Deterministic per-day fill simulation.
///
/// The generator is seeded with the day of month, so a date always yields
/// the same pickups while different days differ.
#[derive(Debug, Clone)]
pub struct SimulatedDemandSource {
    bins: Vec<Bin>,
}

impl Default for SimulatedDemandSource {
    fn default() -> Self {
        Self::new(PREDEFINED_BINS.to_vec())
    }
}

impl SimulatedDemandSource {
    pub fn new(bins: Vec<Bin>) -> Self {
        Self { bins }
    }

    pub fn simulate(&self, date: Date) -> Vec<RawPickup> {
        let mut rng = StdRng::seed_from_u64(date.day() as u64);
        let mut pickups = Vec::new();

        for bin in &self.bins {
            let fill_percent: u32 = rng.random_range(70..=100);
            if fill_percent <= COLLECTION_THRESHOLD_PERCENT {
                continue;
            }

            let waste_kg = (bin.capacity_kg * f64::from(fill_percent) / 100.0)
                .floor()
                .max(1.0);
            pickups.push(RawPickup {
                citizen_id: Some(json!(bin.id)),
                latitude: Some(json!(bin.lat)),
                longitude: Some(json!(bin.lon)),
                approx_garbage_weight: Some(json!(waste_kg)),
                ..RawPickup::default()
            });
        }

        debug!(%date, bins = self.bins.len(), full = pickups.len(), "simulated bin fill levels");
        pickups
    }
}

impl DemandSource for SimulatedDemandSource {
    fn fetch(&self, date: Date) -> Result<Vec<RawPickup>, PlanningError> {
        Ok(self.simulate(date))
    }
}

/// Reads persisted pickup requests from the web application's store.
#[derive(Debug, Clone)]
pub struct HttpDemandSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpDemandSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PlanningError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlanningError::upstream(Upstream::DemandSource, err))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn pickups_url(&self, date: Date) -> String {
        format!("{}/pickups?date={}", self.base_url, date)
    }
}

impl DemandSource for HttpDemandSource {
    fn fetch(&self, date: Date) -> Result<Vec<RawPickup>, PlanningError> {
        let url = self.pickups_url(date);
        let pickups = self
            .client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<Vec<RawPickup>>())
            .map_err(|err| PlanningError::upstream(Upstream::DemandSource, err))?;

        info!(%date, count = pickups.len(), "fetched persisted pickups");
        Ok(pickups)
    }
}
