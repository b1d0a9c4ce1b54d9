use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::store::{Entity, StoreError};

/// Message reported for any rejected restaurant pizza value.
pub const VALIDATION_ERRORS: &str = "validation errors";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("{}", .0.join(", "))]
    BadRequest(Vec<String>),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(entity) => ApiError::NotFound(entity),
            StoreError::Validation(e) => {
                warn!(reason = %e, "rejected restaurant pizza");
                ApiError::BadRequest(vec![VALIDATION_ERRORS.to_string()])
            }
            e @ (StoreError::ReferencedEntityMissing(..) | StoreError::ConstraintViolation(..)) => {
                ApiError::BadRequest(vec![e.to_string()])
            }
            e @ (StoreError::Database(_) | StoreError::Pool(_) | StoreError::Migration(_)) => {
                ApiError::InternalError(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(vec![rejection.body_text()])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(vec![rejection.body_text()])
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::InternalError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(entity) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{entity} not found") })),
            )
                .into_response(),
            ApiError::BadRequest(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::InternalError(msg) => {
                error!(%msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": msg })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorsResponse {
    /// Reasons the request was rejected
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationError;

    #[test]
    fn test_store_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound(Entity::Restaurant)),
            ApiError::NotFound(Entity::Restaurant)
        ));

        match ApiError::from(StoreError::Validation(ValidationError::PriceOutOfRange {
            price: 31,
        })) {
            ApiError::BadRequest(errors) => assert_eq!(errors, vec!["validation errors"]),
            other => panic!("unexpected {other:?}"),
        }

        match ApiError::from(StoreError::ReferencedEntityMissing(Entity::Pizza, 9)) {
            ApiError::BadRequest(errors) => assert_eq!(errors, vec!["Pizza 9 does not exist"]),
            other => panic!("unexpected {other:?}"),
        }

        match ApiError::from(StoreError::ConstraintViolation(
            Entity::Restaurant,
            "CHECK constraint failed: restaurants_name_not_empty".to_string(),
        )) {
            ApiError::BadRequest(errors) => assert_eq!(
                errors,
                vec!["Invalid Restaurant: CHECK constraint failed: restaurants_name_not_empty"]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_not_found_renders_error_body() {
        let response = ApiError::NotFound(Entity::Restaurant).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
