// OpenAPI specification generation
//
// This module defines the OpenAPI spec for the Campus Notify API.
// It is used by both the API server (for Swagger UI)
// and the export-openapi binary (for static spec generation).

use crate::api;
use crate::api::{ErrorResponse, ListResponse};
use campus_notify_core::{BroadcastSummary, Notification};
use utoipa::OpenApi;

/// OpenAPI documentation for the Campus Notify API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::notifications::list_notifications,
        api::notifications::create_notification,
        api::notifications::broadcast_notification,
        api::notifications::mark_read,
        api::notifications::list_user_notifications,
        api::notifications::unread_count,
        api::notifications::mark_all_read,
        api::stream::stream_notifications,
    ),
    components(
        schemas(
            Notification,
            BroadcastSummary,
            ErrorResponse,
            ListResponse<Notification>,
            api::notifications::CreateNotificationRequest,
            api::notifications::BroadcastRequest,
            api::notifications::ListNotificationsQuery,
            api::notifications::UnreadCountResponse,
            api::notifications::MarkReadResponse,
            api::notifications::ReadAllResponse,
        )
    ),
    tags(
        (name = "notifications", description = "Notification creation, retrieval and live streaming (SSE)")
    ),
    info(
        title = "Campus Notify API",
        version = "0.1.0",
        description = "API for persisting user notifications and pushing them to live sessions",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_notification_paths() {
        let json = ApiDoc::to_json().unwrap();
        assert!(json.contains("/v1/notifications/broadcast"));
        assert!(json.contains("/v1/users/{user_id}/notifications/stream"));
    }
}
