// Common DTOs for public API
//
// These types are shared across multiple API endpoints.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use campus_notify_core::NotifyError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Convert to axum response tuple
    pub fn into_response(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

/// Error tuple returned by every handler
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a service error onto an HTTP status.
///
/// Store and internal failures are logged and reported without detail.
pub fn api_error(err: NotifyError) -> ApiError {
    match err {
        NotifyError::Validation(msg) => {
            ErrorResponse::new(msg).into_response(StatusCode::BAD_REQUEST)
        }
        NotifyError::NotFound(msg) => ErrorResponse::new(msg).into_response(StatusCode::NOT_FOUND),
        other => {
            tracing::error!(error = %other, "Request failed");
            ErrorResponse::new("Internal server error")
                .into_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Path extractor whose rejection uses the JSON error body
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                Err(ErrorResponse::new(rejection.body_text()).into_response(rejection.status()))
            }
        }
    }
}

/// Response wrapper for list endpoints.
/// All list endpoints return responses wrapped in a `data` field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    /// Array of items returned by the list operation.
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let (status, Json(body)) = api_error(NotifyError::validation("message cannot be empty"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "message cannot be empty");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let (status, _) = api_error(NotifyError::not_found("user with ID 9 not found"));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_error_hides_detail() {
        let (status, Json(body)) = api_error(NotifyError::store("connection reset"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_path_rejection_is_json() {
        use axum::{body::Body, http::Request, routing::get, Router};
        use http_body_util::BodyExt;
        use tower::ServiceExt;

        let app = Router::new().route(
            "/items/:id",
            get(|ApiPath(id): ApiPath<i64>| async move { id.to_string() }),
        );

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/items/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!error.error.is_empty());

        let response = app
            .oneshot(Request::builder().uri("/items/12").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_list_response_serialization() {
        let json = serde_json::to_string(&ListResponse::new(vec![1, 2])).unwrap();
        assert_eq!(json, r#"{"data":[1,2]}"#);
    }
}
