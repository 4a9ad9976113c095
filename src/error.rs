//! # Error Handling
//!
//! Unified error handling for the Provisioning API: the saga-facing
//! [`ProvisionError`] taxonomy and the HTTP-facing [`ApiError`] with a
//! consistent problem+json response format and trace ID propagation.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::identity::CredentialErrorKind;
use crate::telemetry;

/// Outcome taxonomy of a provisioning saga run.
///
/// Fatal step failures surface as one of these after compensation has run;
/// non-fatal step failures never appear here (they are logged and the run
/// still succeeds). Compensation failures are logged, never surfaced.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Invalid request fields or an unresolvable program. Fails before any
    /// write, so there is nothing to compensate.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The identity service rejected or failed credential creation.
    #[error("credential creation failed ({kind}): {message}")]
    CredentialCreation {
        kind: CredentialErrorKind,
        message: String,
    },

    /// A datastore write failed after retries were exhausted.
    #[error("persistence failure at step '{step}': {message}")]
    Persistence { step: &'static str, message: String },
}

impl ProvisionError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn persistence<S: Into<String>>(step: &'static str, message: S) -> Self {
        Self::Persistence {
            step,
            message: message.into(),
        }
    }

    /// Stable error-kind label for logs and metrics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::CredentialCreation { .. } => "credential_creation",
            Self::Persistence { .. } => "persistence",
        }
    }
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Extract current trace ID from the active tracing span (falls back to a
    /// generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<ProvisionError> for ApiError {
    fn from(error: ProvisionError) -> Self {
        match error {
            ProvisionError::Validation { message } => {
                Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
            }
            ProvisionError::CredentialCreation { kind, message } => match kind {
                CredentialErrorKind::EmailAlreadyRegistered => Self::new(
                    StatusCode::CONFLICT,
                    "EMAIL_ALREADY_REGISTERED",
                    "An account with this email already exists",
                ),
                CredentialErrorKind::InvalidEmail | CredentialErrorKind::WeakPassword => {
                    Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
                }
                CredentialErrorKind::Unavailable => Self::new(
                    StatusCode::BAD_GATEWAY,
                    "IDENTITY_PROVIDER_ERROR",
                    "Identity provider request failed",
                )
                .with_details(json!({ "provider_message": message })),
            },
            ProvisionError::Persistence { step, message } => {
                tracing::error!(step, error = %message, "Persistence failure surfaced to caller");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Datastore unavailable, please retry",
                )
                .with_retry_after(30)
            }
        }
    }
}

impl From<crate::stores::StoreError> for ApiError {
    fn from(error: crate::stores::StoreError) -> Self {
        match error {
            crate::stores::StoreError::NotFound(what) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Not found: {}", what),
            ),
            crate::stores::StoreError::Unavailable(message) => {
                tracing::error!(error = %message, "Datastore unavailable");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Datastore unavailable, please retry",
                )
                .with_retry_after(30)
            }
        }
    }
}

impl From<crate::reassignment::ReassignError> for ApiError {
    fn from(error: crate::reassignment::ReassignError) -> Self {
        use crate::reassignment::ReassignError;

        match error {
            ReassignError::Validation(message) => {
                Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
            }
            ReassignError::TenantNotFound(id) => Self::new(
                StatusCode::NOT_FOUND,
                "TENANT_NOT_FOUND",
                &format!("Target tenant does not exist: {}", id),
            ),
            ReassignError::Unavailable(message) => {
                tracing::error!(error = %message, "Reassignment datastore failure");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Datastore unavailable, please retry",
                )
                .with_retry_after(30)
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    runtime_err
        .as_database_error()
        .is_some_and(|db_error| db_error.is_unique_violation())
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
        );

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test error message"));
        assert!(error.trace_id.is_some());
    }

    #[test]
    fn test_validation_error_maps_to_400() {
        let api_error: ApiError = ProvisionError::validation("tenant name is required").into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.code, Box::from("VALIDATION_FAILED"));
        assert!(api_error.message.contains("tenant name"));
    }

    #[test]
    fn test_duplicate_email_maps_to_409() {
        let api_error: ApiError = ProvisionError::CredentialCreation {
            kind: CredentialErrorKind::EmailAlreadyRegistered,
            message: "EMAIL_EXISTS".to_string(),
        }
        .into();
        assert_eq!(api_error.status, StatusCode::CONFLICT);
        assert_eq!(api_error.code, Box::from("EMAIL_ALREADY_REGISTERED"));
    }

    #[test]
    fn test_persistence_error_maps_to_503_with_retry_after() {
        let api_error: ApiError =
            ProvisionError::persistence("create_tenant", "pool exhausted").into();
        assert_eq!(api_error.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api_error.retry_after, Some(30));

        let response = api_error.into_response();
        assert_eq!(response.headers().get("retry-after").unwrap(), "30");
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_identity_provider_outage_maps_to_502() {
        let api_error: ApiError = ProvisionError::CredentialCreation {
            kind: CredentialErrorKind::Unavailable,
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(api_error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api_error.code, Box::from("IDENTITY_PROVIDER_ERROR"));
        assert!(api_error.details.is_some());
    }

    #[test]
    fn test_database_error_mapping() {
        let db_error = sea_orm::DbErr::RecordNotFound("tenant".to_string());
        let api_error: ApiError = db_error.into();

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.code, Box::from("NOT_FOUND"));
    }

    #[test]
    fn test_kind_labels_are_stable() {
        assert_eq!(
            ProvisionError::validation("x").kind_label(),
            "validation"
        );
        assert_eq!(
            ProvisionError::persistence("s", "x").kind_label(),
            "persistence"
        );
    }
}
