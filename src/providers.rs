//! Collaborator wiring from service configuration.
//!
//! Blocking HTTP clients are built here, so call these from a blocking
//! context (a CLI run or `spawn_blocking`), never on an async worker.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{DistanceModelKind, ServiceConfig};
use crate::error::{PlanningError, Upstream};
use crate::euclidean::EuclideanModel;
use crate::haversine::HaversineModel;
use crate::matrix::FallbackMatrix;
use crate::osrm::{OsrmClient, OsrmConfig};
use crate::sources::{HttpDemandSource, SimulatedDemandSource};
use crate::traits::{DemandSource, DistanceMatrixProvider};

pub type BoxedProvider = Box<dyn DistanceMatrixProvider + Send + Sync>;
pub type BoxedDemandSource = Box<dyn DemandSource + Send + Sync>;

const DEMAND_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn distance_provider(config: &ServiceConfig) -> Result<BoxedProvider, PlanningError> {
    let speed_kmh = config.planner.speed_kmh;
    match config.planner.distance_model {
        DistanceModelKind::Haversine => Ok(Box::new(HaversineModel::new(speed_kmh))),
        DistanceModelKind::Euclidean => Ok(Box::new(EuclideanModel::new(speed_kmh))),
        DistanceModelKind::Osrm => {
            let base_url = config.osrm_url.clone().ok_or_else(|| {
                PlanningError::upstream(Upstream::DistanceProvider, "OSRM_URL is not configured")
            })?;
            let osrm = OsrmClient::new(OsrmConfig {
                base_url,
                ..OsrmConfig::default()
            });

            match (osrm, config.osrm_fallback) {
                (Ok(client), true) => Ok(Box::new(FallbackMatrix::new(client, HaversineModel::new(speed_kmh)))),
                (Ok(client), false) => Ok(Box::new(client)),
                (Err(err), true) => {
                    warn!(error = %err, "OSRM client unavailable, using haversine");
                    Ok(Box::new(HaversineModel::new(speed_kmh)))
                }
                (Err(err), false) => Err(err.into()),
            }
        }
    }
}

pub fn demand_source(config: &ServiceConfig) -> Result<BoxedDemandSource, PlanningError> {
    match &config.demand_source_url {
        Some(url) => {
            debug!(%url, "reading pickups from the request store");
            Ok(Box::new(HttpDemandSource::new(url.clone(), DEMAND_SOURCE_TIMEOUT)?))
        }
        None => Ok(Box::new(SimulatedDemandSource::default())),
    }
}
