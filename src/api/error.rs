use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::PlanningError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable {
        message: String,
        status: &'static str,
        retryable: bool,
    },
    InternalServerError { message: String, details: String },
    TimedOut { retryable: bool },
}

impl From<PlanningError> for ApiError {
    fn from(error: PlanningError) -> Self {
        let retryable = error.is_retryable();
        match error {
            PlanningError::InputValidation(message) => ApiError::BadRequest(message),
            PlanningError::UpstreamUnavailable { upstream, message } => ApiError::Unavailable {
                message: format!("{upstream} unavailable: {message}"),
                status: upstream.status_code(),
                retryable,
            },
            PlanningError::SolverFault { message, context } => ApiError::InternalServerError {
                message: format!("solver fault: {message}"),
                details: context,
            },
            PlanningError::TimedOut => ApiError::TimedOut { retryable },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Unavailable {
                message,
                status,
                retryable,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": message, "status": status, "retryable": retryable })),
            )
                .into_response(),
            ApiError::InternalServerError { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message, "details": details })),
            )
                .into_response(),
            ApiError::TimedOut { retryable } => (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({
                    "error": PlanningError::TimedOut.to_string(),
                    "status": "error_planning_timed_out",
                    "retryable": retryable
                })),
            )
                .into_response(),
        }
    }
}
