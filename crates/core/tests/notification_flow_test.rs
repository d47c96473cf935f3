// End-to-end tests for notification creation and live delivery
//
// These tests wire the service to in-memory backends and drive real
// delivery loops through channel sinks.

use std::sync::Arc;
use std::time::Duration;

use campus_notify_core::memory::{InMemoryNotificationStore, InMemoryUserDirectory};
use campus_notify_core::{
    ChannelSink, CloseReason, Frame, Notification, NotificationService, NotifyConfig, Page,
    SessionState,
};

fn service_with_users(ids: &[i64]) -> Arc<NotificationService> {
    let store = Arc::new(InMemoryNotificationStore::new());
    let users = Arc::new(InMemoryUserDirectory::with_users(ids.iter().copied()));
    Arc::new(NotificationService::new(store, users, NotifyConfig::default()))
}

fn decode(frame: &Frame) -> Notification {
    serde_json::from_str(&frame.data).expect("notification frame should carry a notification")
}

async fn next_notification(frames: &mut tokio::sync::mpsc::Receiver<Frame>) -> Notification {
    let frame = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("sink closed");
    assert_eq!(frame.event, "notification");
    decode(&frame)
}

#[tokio::test]
async fn test_two_sessions_receive_notification_in_order() {
    let service = service_with_users(&[42]);

    let (sink1, mut frames1) = ChannelSink::channel(8);
    let (sink2, mut frames2) = ChannelSink::channel(8);
    let sub1 = service.open_session(42).await.unwrap();
    let sub2 = service.open_session(42).await.unwrap();
    let _h1 = service.spawn_delivery(sub1, sink1);
    let _h2 = service.spawn_delivery(sub2, sink2);

    service.create_and_notify(42, "earlier", "general").await.unwrap();
    service.create_and_notify(42, "hi", "info").await.unwrap();

    for frames in [&mut frames1, &mut frames2] {
        let first = next_notification(frames).await;
        assert_eq!(first.message, "earlier");

        let second = next_notification(frames).await;
        assert_eq!(second.message, "hi");
        assert_eq!(second.notification_type, "info");
        assert_eq!(second.user_id, 42);
        assert!(!second.is_read);
    }
}

#[tokio::test]
async fn test_pull_recovers_notifications_created_while_offline() {
    let service = service_with_users(&[7]);

    service.create_and_notify(7, "while offline", "").await.unwrap();

    let (sink, mut frames) = ChannelSink::channel(8);
    let sub = service.open_session(7).await.unwrap();
    let _handle = service.spawn_delivery(sub, sink);

    let pulled = service.list_for_user(7, Page::all()).await.unwrap();
    assert_eq!(pulled.len(), 1);
    assert_eq!(pulled[0].message, "while offline");
    assert!(frames.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_unregisters_session() {
    let service = service_with_users(&[3]);

    let (sink, frames) = ChannelSink::channel(8);
    let sub = service.open_session(3).await.unwrap();
    let session_id = sub.session_id;
    let handle = service.spawn_delivery(sub, sink);
    assert_eq!(service.live_sessions(3), 1);

    drop(frames);
    let outcome = handle.await.unwrap();

    assert_eq!(outcome.session_id, session_id);
    assert_eq!(outcome.reason, CloseReason::TransportClosed);
    assert_eq!(outcome.state, SessionState::Closed);
    assert_eq!(service.live_sessions(3), 0);

    // Creation still succeeds with nobody listening
    service.create_and_notify(3, "after close", "").await.unwrap();
}

#[tokio::test]
async fn test_shutdown_terminates_all_delivery_loops() {
    let service = service_with_users(&[1, 2]);

    let mut handles = Vec::new();
    let mut receivers = Vec::new();
    for user_id in [1, 1, 2] {
        let (sink, frames) = ChannelSink::channel(4);
        let sub = service.open_session(user_id).await.unwrap();
        handles.push(service.spawn_delivery(sub, sink));
        receivers.push(frames);
    }

    assert_eq!(service.shutdown(), 3);

    for handle in handles {
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("delivery loop did not stop")
            .unwrap();
        assert_eq!(outcome.reason, CloseReason::QueueReleased);
    }
}

#[tokio::test]
async fn test_concurrent_creates_and_registrations() {
    let ids: Vec<i64> = (1..=8).collect();
    let service = service_with_users(&ids);

    let mut tasks = Vec::new();
    for &user_id in &ids {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let sub = service.open_session(user_id).await.unwrap();
            for i in 0..5 {
                service
                    .create_and_notify(user_id, &format!("msg {i}"), "")
                    .await
                    .unwrap();
            }
            service.close_session(&sub.session_id);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for &user_id in &ids {
        let rows = service.list_for_user(user_id, Page::all()).await.unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(service.live_sessions(user_id), 0);
    }
}

#[tokio::test]
async fn test_broadcast_with_invalid_identity() {
    let service = service_with_users(&[1, 2, 3]);

    let summary = service
        .broadcast_to_users(&[1, 2, -4, 3], "Club fair on Friday", "event")
        .await;

    assert_eq!(summary.success_count, 3);
    assert_eq!(summary.error_count, 1);
    assert_eq!(service.list_all().await.unwrap().len(), 3);
}
