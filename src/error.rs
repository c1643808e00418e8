// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::manager::DatabaseError;
use crate::filter::FilterError;
use crate::geocoder::GeocoderError;

pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const DUPLICATE_FIELD: &str = "Duplicate field value entered";
pub const SERVER_ERROR: &str = "Server Error";

/// Every client-visible failure; the only place error bodies are produced
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    /// One message per violated field constraint
    ValidationError(Vec<String>),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::ValidationError(messages) => messages.join(", "),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => {
                if msg.is_empty() { SERVER_ERROR.to_string() } else { msg.clone() }
            }
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "status": false,
            "message": self.message(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(messages: Vec<String>) -> Self {
        ApiError::ValidationError(messages)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// "<Resource> <value> not found", used for unknown and malformed ids alike
    pub fn resource_not_found(resource: &str, value: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, value))
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unique_violation() {
            tracing::debug!("Unique constraint violated: {}", err);
            return ApiError::bad_request(DUPLICATE_FIELD);
        }
        match err {
            DatabaseError::Filter(filter_err) => filter_err.into(),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
            | DatabaseError::Sqlx(sqlx::Error::PoolClosed)
            | DatabaseError::Sqlx(sqlx::Error::Io(_)) => {
                tracing::error!("Database connection error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Log the real error but return generic message
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error(SERVER_ERROR)
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<GeocoderError> for ApiError {
    fn from(err: GeocoderError) -> Self {
        tracing::error!("Geocoder error: {}", err);
        ApiError::bad_gateway("Geocoding service unavailable")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) => ApiError::unauthorized(NOT_AUTHORIZED),
            other => {
                tracing::error!("Auth error: {}", other);
                ApiError::internal_server_error(SERVER_ERROR)
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        // Stable ordering for clients and tests
        fields.sort_by(|a, b| a.0.cmp(b.0));
        let messages = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect();
        ApiError::validation_error(messages)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self.message());
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", self.message());
        }
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 6, message = "Minimum is 6 characters"))]
        password: String,
        #[validate(email(message = "Please enter a valid email"))]
        email: String,
    }

    #[test]
    fn envelope_has_status_false_and_message() {
        let body = ApiError::unauthorized(NOT_AUTHORIZED).to_json();
        assert_eq!(body, json!({ "status": false, "message": "Not authorized to access this route" }));
    }

    #[test]
    fn validation_messages_are_combined_in_field_order() {
        let errors = Sample { password: "123".into(), email: "nope".into() }.validate().unwrap_err();
        let api: ApiError = errors.into();
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(api.message(), "Please enter a valid email, Minimum is 6 characters");
    }

    #[test]
    fn resource_not_found_message() {
        let err = ApiError::resource_not_found("Bootcamp", "abc");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Bootcamp abc not found");
    }

    #[test]
    fn unknown_failures_fall_back_to_server_error() {
        let err: ApiError = DatabaseError::QueryError("syntax error at or near".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Server Error");
        assert_eq!(ApiError::internal_server_error("").message(), "Server Error");
    }

    #[test]
    fn invalid_tokens_map_to_not_authorized() {
        let err: ApiError = AuthError::InvalidToken("ExpiredSignature".into()).into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), NOT_AUTHORIZED);
    }

    #[test]
    fn filter_errors_are_bad_requests() {
        let err: ApiError = DatabaseError::Filter(FilterError::InvalidColumn("bogus".into())).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Unknown field: bogus");
    }
}
