// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConfigError;
use crate::database::manager::DatabaseError;
use crate::database::store::StoreError;

/// The `{responseCode, errorMessage}` envelope every failure is reported in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub response_code: u16,
    pub error_message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Error drawn from the configuration; passed through untouched.
    Structured(ErrorBody),

    /// Anything unexpected, reported as a 500.
    Internal(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Structured(body) => body.response_code,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Structured(body) => &body.error_message,
            ApiError::Internal(msg) => msg,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Structured(body) => body.clone(),
            ApiError::Internal(msg) => ErrorBody {
                response_code: 500,
                error_message: msg.clone(),
            },
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.body()).unwrap_or(Value::Null)
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ApiError::Structured(_))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::internal("Database error occurred")
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn internal_errors_serialise_as_500() {
        let err = ApiError::internal("boom");
        assert_eq!(err.to_json(), json!({"responseCode": 500, "errorMessage": "boom"}));
    }

    #[test]
    fn structured_errors_keep_their_code() {
        let err = ApiError::Structured(ErrorBody {
            response_code: 404,
            error_message: "Not here".to_string(),
        });
        assert_eq!(err.status_code(), 404);
        assert!(err.is_structured());
        assert_eq!(err.to_string(), "Not here");
    }

    #[test]
    fn unusable_status_falls_back_to_500() {
        let err = ApiError::Structured(ErrorBody {
            response_code: 42,
            error_message: "odd".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
