// Notification HTTP routes
// Decision: Handlers stay thin; every rule lives in NotificationService

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use campus_notify_core::{
    BroadcastSummary, Notification, NotificationId, NotificationService, NotifyError, Page,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::common::{api_error, ApiError, ApiPath, ListResponse};

// ============================================
// Request / response DTOs
// ============================================

/// Request to create a notification and push it to the user's live sessions
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    /// Recipient user ID.
    #[schema(example = 42)]
    pub user_id: Option<UserId>,
    /// Human-readable text. Must not be empty.
    #[serde(default)]
    #[schema(example = "Your event registration was approved")]
    pub message: String,
    /// Classification tag. Defaults to "general".
    #[serde(rename = "type", default)]
    #[schema(example = "approval")]
    pub notification_type: Option<String>,
}

/// Request to send the same notification to every user
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    #[serde(default)]
    #[schema(example = "The campus portal will be down for maintenance tonight")]
    pub message: String,
    #[serde(rename = "type", default)]
    #[schema(example = "info")]
    pub notification_type: Option<String>,
}

/// Query parameters for the per-user listing
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct ListNotificationsQuery {
    /// Maximum number of notifications to return (omitted or 0: all)
    pub limit: Option<usize>,
    /// Number of notifications to skip (default: 0)
    pub offset: Option<usize>,
}

impl From<ListNotificationsQuery> for Page {
    fn from(query: ListNotificationsQuery) -> Self {
        Page::new(query.limit, query.offset.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub user_id: UserId,
    pub unread_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadAllResponse {
    pub success: bool,
    /// Number of notifications that were unread before the call
    pub updated: u64,
}

// ============================================
// App State and Routes
// ============================================

/// App state for notification routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }
}

/// Create notification routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/v1/notifications/broadcast", post(broadcast_notification))
        .route("/v1/notifications/:notification_id/read", put(mark_read))
        .route(
            "/v1/users/:user_id/notifications",
            get(list_user_notifications),
        )
        .route(
            "/v1/users/:user_id/notifications/unread-count",
            get(unread_count),
        )
        .route(
            "/v1/users/:user_id/notifications/read-all",
            put(mark_all_read),
        )
        .with_state(state)
}

// ============================================
// HTTP Handlers
// ============================================

/// GET /v1/notifications - List every notification
#[utoipa::path(
    get,
    path = "/v1/notifications",
    responses(
        (status = 200, description = "All notifications, newest first", body = ListResponse<Notification>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Notification>>, ApiError> {
    let notifications = state.service.list_all().await.map_err(api_error)?;
    Ok(Json(ListResponse::new(notifications)))
}

/// POST /v1/notifications - Create a notification and push it live
#[utoipa::path(
    post,
    path = "/v1/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Invalid request", body = super::ErrorResponse),
        (status = 404, description = "User not found", body = super::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let user_id = req
        .user_id
        .ok_or_else(|| api_error(NotifyError::validation("user_id is required")))?;

    let notification = state
        .service
        .create_and_notify(
            user_id,
            &req.message,
            req.notification_type.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(api_error)?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// POST /v1/notifications/broadcast - Notify every user
#[utoipa::path(
    post,
    path = "/v1/notifications/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Per-user outcome counts", body = BroadcastSummary),
        (status = 400, description = "Invalid request", body = super::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn broadcast_notification(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Result<Json<BroadcastSummary>, ApiError> {
    let summary = state
        .service
        .broadcast_to_all_users(
            &req.message,
            req.notification_type.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(api_error)?;

    Ok(Json(summary))
}

/// PUT /v1/notifications/{notification_id}/read - Mark one notification read
#[utoipa::path(
    put,
    path = "/v1/notifications/{notification_id}/read",
    params(
        ("notification_id" = i64, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = MarkReadResponse),
        (status = 400, description = "Invalid notification ID", body = super::ErrorResponse),
        (status = 404, description = "Notification not found", body = super::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    ApiPath(notification_id): ApiPath<NotificationId>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    state
        .service
        .mark_read(notification_id)
        .await
        .map_err(api_error)?;

    Ok(Json(MarkReadResponse { success: true }))
}

/// GET /v1/users/{user_id}/notifications - Pull a user's notifications
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/notifications",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ListNotificationsQuery
    ),
    responses(
        (status = 200, description = "Notifications, newest first", body = ListResponse<Notification>),
        (status = 400, description = "Invalid user ID", body = super::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn list_user_notifications(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ListResponse<Notification>>, ApiError> {
    let notifications = state
        .service
        .list_for_user(user_id, query.into())
        .await
        .map_err(api_error)?;

    Ok(Json(ListResponse::new(notifications)))
}

/// GET /v1/users/{user_id}/notifications/unread-count - Count unread notifications
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/notifications/unread-count",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 400, description = "Invalid user ID", body = super::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread_count = state
        .service
        .unread_count(user_id)
        .await
        .map_err(api_error)?;

    Ok(Json(UnreadCountResponse {
        user_id,
        unread_count,
    }))
}

/// PUT /v1/users/{user_id}/notifications/read-all - Mark all of a user's notifications read
#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/notifications/read-all",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Notifications marked as read", body = ReadAllResponse),
        (status = 400, description = "Invalid user ID", body = super::ErrorResponse),
        (status = 404, description = "User not found", body = super::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<ReadAllResponse>, ApiError> {
    let updated = state
        .service
        .mark_all_read(user_id)
        .await
        .map_err(api_error)?;

    Ok(Json(ReadAllResponse {
        success: true,
        updated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_type_is_optional() {
        let req: CreateNotificationRequest =
            serde_json::from_str(r#"{"user_id": 7, "message": "hello"}"#).unwrap();
        assert_eq!(req.user_id, Some(7));
        assert_eq!(req.notification_type, None);

        let req: CreateNotificationRequest =
            serde_json::from_str(r#"{"user_id": 7, "message": "hello", "type": "info"}"#).unwrap();
        assert_eq!(req.notification_type.as_deref(), Some("info"));
    }

    #[test]
    fn test_create_request_tolerates_missing_fields() {
        let req: CreateNotificationRequest = serde_json::from_str("{}").unwrap();
        assert!(req.user_id.is_none());
        assert!(req.message.is_empty());
    }

    #[test]
    fn test_list_query_into_page() {
        let page: Page = ListNotificationsQuery {
            limit: Some(5),
            offset: None,
        }
        .into();
        assert_eq!(page, Page::new(Some(5), 0));
        assert_eq!(Page::from(ListNotificationsQuery::default()), Page::all());
    }
}
