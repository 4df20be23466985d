use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"error": "Order not found"}))]
pub struct ErrorResponse {
    /// Human-readable error description
    #[schema(example = "Order not found")]
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// The raw message carried to the client, without the variant prefix
    /// used in logs. The status endpoint's wire contract fixes exact
    /// bodies like `{"error":"Invalid status"}`.
    fn client_message(&self) -> String {
        match self {
            ServiceError::DatabaseError(err) => err.to_string(),
            ServiceError::NotFound(msg)
            | ServiceError::ValidationError(msg)
            | ServiceError::InvalidStatus(msg)
            | ServiceError::InvalidOperation(msg)
            | ServiceError::InternalError(msg) => msg.clone(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_)
            | ServiceError::InvalidStatus(_)
            | ServiceError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(
            ServiceError::NotFound("Order not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InvalidStatus("Invalid status".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InternalError("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_message_drops_log_prefix() {
        let err = ServiceError::InvalidStatus("Invalid status".into());
        assert_eq!(err.client_message(), "Invalid status");
        assert_eq!(err.to_string(), "Invalid status: Invalid status");
    }
}
