use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bazaar_core::DomainError;
use bazaar_infra::{AssessmentError, TierError};

pub fn assessment_error_to_response(err: AssessmentError) -> axum::response::Response {
    match err {
        AssessmentError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        e @ AssessmentError::InvalidTransition { .. } => {
            json_error(StatusCode::CONFLICT, "invalid_transition", e.to_string())
        }
        AssessmentError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "listing not found")
        }
        AssessmentError::ConcurrencyConflict(msg) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        AssessmentError::Unauthorized => {
            json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized")
        }
        e @ AssessmentError::Deserialize { .. } => internal("deserialize_error", e),
        e @ AssessmentError::Store(_) => internal("store_error", e),
        e @ AssessmentError::TierLookup(_) => internal("tier_lookup_error", e),
        AssessmentError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn tier_error_to_response(err: TierError) -> axum::response::Response {
    match err {
        TierError::Invalid(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        other => internal("tier_store_error", other),
    }
}

fn internal(code: &'static str, err: impl std::fmt::Display) -> axum::response::Response {
    tracing::error!(error = %err, code, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// A blocking engine call panicked or was cancelled.
pub fn task_failed(err: tokio::task::JoinError) -> axum::response::Response {
    internal("task_failed", err)
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_id",
        format!("invalid {what} id"),
    )
}
