use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::query::QueryError;

const NOT_READY: &str = "Currently rebuilding the torrent index. Please try again in a moment!";
const INVALID_CATEGORY: &str = "Invalid categoryName specified. Please try again. Full list of valid categories available at / endpoint.";
const NO_ENDPOINT: &str = "API endpoint does not exist.";

/// Error response returned by every endpoint.
///
/// Serialises as `{ "error": "<message>" }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn not_ready() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, NOT_READY)
    }

    pub fn invalid_category() -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_CATEGORY)
    }

    pub fn no_endpoint() -> Self {
        Self::new(StatusCode::NOT_FOUND, NO_ENDPOINT)
    }

    /// Generic server error pointing at the administrator, with no internals.
    pub fn internal(admin_email: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "Something bad happened! If this problem persists, please email me: {admin_email}"
            ),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotReady => Self::not_ready(),
            QueryError::NotFound(_) => Self::invalid_category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_map_to_distinct_statuses() {
        assert_eq!(
            ApiError::from(QueryError::NotReady).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(QueryError::NotFound("books".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_error_names_contact_only() {
        let err = ApiError::internal("ops@example.org");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.body.error.ends_with("ops@example.org"));
    }
}
