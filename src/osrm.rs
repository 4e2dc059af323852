//! OSRM HTTP adapter for road-network distance matrices.

use serde::Deserialize;
use thiserror::Error;

use crate::error::{PlanningError, Upstream};
use crate::model::Location;
use crate::traits::{DistanceMatrixProvider, RawMatrix};

/// Cost assigned to pairs OSRM cannot route between.
const UNREACHABLE_KM: f64 = 1_000_000.0;
const UNREACHABLE_SECS: i64 = 1_000_000_000;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum OsrmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OSRM returned {code}: {message}")]
    Api { code: String, message: String },

    #[error("OSRM response is missing {0}")]
    Incomplete(&'static str),
}

impl From<OsrmError> for PlanningError {
    fn from(err: OsrmError) -> Self {
        PlanningError::upstream(Upstream::DistanceProvider, err)
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, OsrmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn table_url(&self, locations: &[Location]) -> String {
        let coords = locations
            .iter()
            .map(|location| format!("{:.6},{:.6}", location.lon, location.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?annotations=distance,duration",
            self.config.base_url, self.config.profile, coords
        )
    }

    fn fetch_table(&self, locations: &[Location]) -> Result<RawMatrix, OsrmError> {
        let body = self
            .client
            .get(self.table_url(locations))
            .send()?
            .error_for_status()?
            .json::<OsrmTableResponse>()?;

        if body.code != "Ok" {
            return Err(OsrmError::Api {
                code: body.code,
                message: body.message.unwrap_or_default(),
            });
        }

        let distances = body.distances.ok_or(OsrmError::Incomplete("distances"))?;
        let durations = body.durations.ok_or(OsrmError::Incomplete("durations"))?;

        Ok(RawMatrix {
            distances_km: distances
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|meters| meters.map_or(UNREACHABLE_KM, |m| m / 1000.0))
                        .collect()
                })
                .collect(),
            durations_secs: durations
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|secs| secs.map_or(UNREACHABLE_SECS, |s| s.round() as i64))
                        .collect()
                })
                .collect(),
        })
    }
}

impl DistanceMatrixProvider for OsrmClient {
    fn matrix_for(&self, locations: &[Location]) -> Result<RawMatrix, PlanningError> {
        if locations.is_empty() {
            return Ok(RawMatrix {
                distances_km: Vec::new(),
                durations_secs: Vec::new(),
            });
        }

        Ok(self.fetch_table(locations)?)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}
