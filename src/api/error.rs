//! HTTP mapping for [`ModerationError`]

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::error::{FieldError, ModerationError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
        }
    }
}

impl ModerationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ModerationError::Validation(_) | ModerationError::Blocked => StatusCode::BAD_REQUEST,
            ModerationError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ModerationError::NotFound(_) => StatusCode::NOT_FOUND,
            ModerationError::Forbidden(_) => StatusCode::FORBIDDEN,
            ModerationError::Conflict(_) => StatusCode::CONFLICT,
            ModerationError::Ledger(_) | ModerationError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            ModerationError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = match self {
            ModerationError::Validation(details) => ErrorBody {
                error: "Validation failed".to_string(),
                details,
            },
            // Never echo the matched terms back to the submitter
            ModerationError::Blocked => ErrorBody::new(
                "Your submission contains inappropriate content. Please revise and try again.",
            ),
            ModerationError::RateLimited { .. } => {
                ErrorBody::new("Too many submissions. Please wait before posting again.")
            }
            ModerationError::NotFound(what) => ErrorBody::new(format!("Not found: {}", what)),
            ModerationError::Forbidden(msg) | ModerationError::Conflict(msg) => ErrorBody::new(msg),
            ModerationError::Ledger(e) | ModerationError::Store(e) => {
                error!(error = %e, "Request failed on storage");
                ErrorBody::new("Server error")
            }
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Field, StoreError};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ModerationError::Validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ModerationError::Blocked.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ModerationError::RateLimited { retry_after_secs: 3 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ModerationError::Conflict("stale".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ModerationError::Ledger(StoreError::ProfileNotFound("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ModerationError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "42");
    }

    #[test]
    fn test_validation_body_lists_fields() {
        let body = ErrorBody {
            error: "Validation failed".to_string(),
            details: vec![FieldError::new(Field::Title, "Title is required")],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"][0]["field"], "title");
        assert_eq!(json["details"][0]["message"], "Title is required");
    }
}
