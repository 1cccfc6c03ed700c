use serde::Serialize;
use std::convert::Infallible;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge};
use warp::{Rejection, Reply};

use crate::analysis::validation::ValidationError;
use crate::error::ComputationError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl warp::reject::Reject for ApiError {}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Computation(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Computation(_) => "computation_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

fn reply(status: StatusCode, error: &'static str, detail: impl Into<String>) -> warp::reply::Response {
    let body = ErrorBody { error, detail: detail.into() };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Turns every rejection into a JSON error body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if err.is_not_found() {
        return Ok(reply(StatusCode::NOT_FOUND, "not_found", "Not Found"));
    }

    if let Some(api_err) = err.find::<ApiError>() {
        match api_err {
            ApiError::Internal(cause) => error!("Internal error: {}", cause),
            _ => warn!("{}: {}", api_err.kind(), api_err),
        }
        let detail = match api_err {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        return Ok(reply(api_err.status(), api_err.kind(), detail));
    }

    if err.find::<PayloadTooLarge>().is_some() {
        return Ok(reply(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", "Request body too large"));
    }

    if err.find::<LengthRequired>().is_some() {
        return Ok(reply(
            StatusCode::LENGTH_REQUIRED,
            "length_required",
            "A content-length header is required",
        ));
    }

    if err.find::<MethodNotAllowed>().is_some() {
        return Ok(reply(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "Method Not Allowed"));
    }

    error!("Unhandled rejection: {:?}", err);
    Ok(reply(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_and_body(rejection: Rejection) -> (StatusCode, serde_json::Value) {
        let response = handle_rejection(rejection).await.unwrap().into_response();
        let status = response.status();
        let bytes = warp::hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_maps_to_422() {
        let rejection: Rejection = ApiError::from(ValidationError::EmptyList("values")).into();
        let (status, body) = status_and_body(rejection).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["detail"], "values must not be empty");
    }

    #[tokio::test]
    async fn test_computation_maps_to_500() {
        let rejection: Rejection = ApiError::from(ComputationError::DegenerateSeries).into();
        let (status, body) = status_and_body(rejection).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "computation_error");
        assert!(body["detail"].as_str().unwrap().starts_with("Degenerate series"));
    }

    #[tokio::test]
    async fn test_internal_cause_is_not_leaked() {
        let rejection: Rejection = ApiError::Internal("worker panicked at src/x.rs".into()).into();
        let (status, body) = status_and_body(rejection).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["detail"], "Internal server error");
    }

    fn fail(err: ApiError) -> Result<(), Rejection> {
        let outcome: Result<(), ApiError> = Err(err);
        outcome?;
        Ok(())
    }

    #[test]
    fn test_api_error_propagates_as_rejection() {
        let rejection = fail(ValidationError::NonPositiveSteps.into()).unwrap_err();

        assert!(matches!(
            rejection.find::<ApiError>(),
            Some(ApiError::Validation(ValidationError::NonPositiveSteps))
        ));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (status, body) = status_and_body(warp::reject::not_found()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }
}
