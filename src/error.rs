//! Error taxonomy for planning runs.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// External collaborator a run depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    DemandSource,
    DistanceProvider,
}

impl Upstream {
    /// Status value surfaced to callers so they can tell retryable faults apart.
    pub fn status_code(&self) -> &'static str {
        match self {
            Upstream::DemandSource => "error_demand_source_unavailable",
            Upstream::DistanceProvider => "error_distance_provider_unavailable",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::DemandSource => write!(f, "demand source"),
            Upstream::DistanceProvider => write!(f, "distance provider"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlanningError {
    /// Client fault. Never retried internally.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Upstream unreachable or returned garbage. Safe to retry with backoff.
    #[error("{upstream} unavailable: {message}")]
    UpstreamUnavailable { upstream: Upstream, message: String },

    /// Internal invariant violated. Always a defect; the run returns no plan.
    #[error("solver fault: {message}")]
    SolverFault { message: String, context: String },

    #[error("planning timed out")]
    TimedOut,
}

impl PlanningError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PlanningError::InputValidation(message.into())
    }

    pub fn upstream(upstream: Upstream, message: impl fmt::Display) -> Self {
        PlanningError::UpstreamUnavailable {
            upstream,
            message: message.to_string(),
        }
    }

    pub fn fault(message: impl Into<String>, context: impl Into<String>) -> Self {
        PlanningError::SolverFault {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Whether the same request may succeed later. Surfaced to HTTP callers
    /// as the `retryable` flag of error bodies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlanningError::UpstreamUnavailable { .. } | PlanningError::TimedOut
        )
    }
}
