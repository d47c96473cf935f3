// Live notification stream (SSE)
// Decision: One delivery loop task per connection; the response body drains its frames
//
// Heartbeats come from the delivery loop itself, so axum's KeepAlive is not used.
// When the client disconnects the body stream is dropped, the frame channel closes
// and the loop unregisters the session.

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, Sse},
    routing::get,
    Router,
};
use campus_notify_core::{ChannelSink, Frame, NotificationService, UserId};
use futures::{
    stream::{self, Stream},
    StreamExt,
};
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::ReceiverStream;

use super::common::{api_error, ApiError, ApiPath};

/// SSE event sent once when the stream opens
pub const CONNECTED_EVENT: &str = "connected";

/// Frames buffered between the delivery loop and the response body
const FRAME_BUFFER: usize = 16;

/// App state for stream routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }
}

/// Create stream routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/users/:user_id/notifications/stream",
            get(stream_notifications),
        )
        .with_state(state)
}

fn to_sse(frame: Frame) -> SseEvent {
    SseEvent::default().event(frame.event).data(frame.data)
}

/// GET /v1/users/{user_id}/notifications/stream - Stream live notifications (SSE)
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/notifications/stream",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Notification stream", content_type = "text/event-stream"),
        (status = 400, description = "Invalid user ID", body = super::ErrorResponse),
        (status = 404, description = "User not found", body = super::ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notifications"
)]
pub async fn stream_notifications(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let subscription = state.service.open_session(user_id).await.map_err(api_error)?;
    let session_id = subscription.session_id;

    let (sink, frames) = ChannelSink::channel(FRAME_BUFFER);
    // The loop outlives this handler; its outcome is logged when it ends
    let handle = state.service.spawn_delivery(subscription, sink);
    tokio::spawn(async move {
        match handle.await {
            Ok(outcome) => tracing::info!(
                session_id = %outcome.session_id,
                reason = ?outcome.reason,
                notifications_sent = outcome.notifications_sent,
                heartbeats_sent = outcome.heartbeats_sent,
                "Notification stream closed"
            ),
            Err(e) => tracing::error!(error = %e, "Delivery loop task failed"),
        }
    });

    tracing::info!(session_id = %session_id, "Starting notification stream");

    let connected = SseEvent::default()
        .event(CONNECTED_EVENT)
        .data(format!(r#"{{"session_id":"{session_id}"}}"#));

    let stream = stream::once(async move { connected })
        .chain(ReceiverStream::new(frames).map(to_sse))
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_notify_core::delivery::HEARTBEAT_EVENT;

    #[test]
    fn test_heartbeat_frame_keeps_event_name() {
        let frame = Frame::heartbeat();
        assert_eq!(frame.event, HEARTBEAT_EVENT);
        // SseEvent has no public accessors; building one must not panic
        let _ = to_sse(frame);
    }
}
