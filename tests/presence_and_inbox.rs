//! Read-state and presence bookkeeping across users

mod common;

use bulletin::notify::ServerFrame;
use bulletin::types::{BulletinError, ChannelKey, NotificationId, UserId, Visibility};
use common::{publish, state, student};

#[tokio::test]
async fn mark_read_is_scoped_to_owner() {
    let state = state();
    publish(&state, "Dorm inspection", Visibility::Student, "General").await;

    let mine = state.inbox.list(&student("s1")).await.unwrap();
    let id = mine[0].id.clone();

    assert!(matches!(
        state.inbox.mark_read(&student("s2"), &id).await,
        Err(BulletinError::NotFound(_))
    ));
    assert_eq!(state.inbox.unread_count(&student("s1")).await.unwrap(), 1);

    let marked = state.inbox.mark_read(&student("s1"), &id).await.unwrap();
    assert!(marked.read);
    // Again is a no-op, not an error
    assert!(state.inbox.mark_read(&student("s1"), &id).await.unwrap().read);
    assert_eq!(state.inbox.unread_count(&student("s1")).await.unwrap(), 0);

    assert!(matches!(
        state
            .inbox
            .mark_read(&student("s1"), &NotificationId::generate())
            .await,
        Err(BulletinError::NotFound(_))
    ));
}

#[tokio::test]
async fn mark_all_read_is_idempotent() {
    let state = state();
    for title in ["Fees due", "Lab closed", "Club fair"] {
        publish(&state, title, Visibility::All, "General").await;
    }
    let reader = student("s3");
    assert_eq!(state.inbox.unread_count(&reader).await.unwrap(), 3);

    assert_eq!(state.inbox.mark_all_read(&reader).await.unwrap(), 3);
    assert_eq!(state.inbox.mark_all_read(&reader).await.unwrap(), 0);
    assert_eq!(state.inbox.unread_count(&reader).await.unwrap(), 0);

    // Other users keep their unread state
    assert_eq!(state.inbox.unread_count(&student("s1")).await.unwrap(), 3);
}

#[tokio::test]
async fn several_tabs_all_receive_pushes() {
    let state = state();
    let key = ChannelKey::for_user(&UserId::from("s2"));
    let (tx1, mut rx1) = state.presence.channel();
    let (tx2, mut rx2) = state.presence.channel();
    let first = state.presence.join(key.clone(), tx1);
    state.presence.join(key.clone(), tx2);

    let stats = state.presence.stats();
    assert_eq!(stats.connected_users, 1);
    assert_eq!(stats.open_channels, 2);

    let report = state
        .newsroom
        .remind(&common::admin(), "student".parse().unwrap(), "Buses delayed")
        .await
        .unwrap();
    assert_eq!(report.pushed, 1);

    assert!(matches!(rx1.recv().await, Some(ServerFrame::Notification { .. })));
    assert!(matches!(rx2.recv().await, Some(ServerFrame::Notification { .. })));

    state.presence.leave(&key, first);
    assert!(state.presence.is_connected(&key));
}

#[tokio::test]
async fn dropped_receiver_is_pruned_on_push() {
    let state = state();
    let key = ChannelKey::for_user(&UserId::from("s1"));
    let (tx, rx) = state.presence.channel();
    state.presence.join(key.clone(), tx);
    drop(rx);

    let report = state
        .newsroom
        .remind(&common::admin(), "student".parse().unwrap(), "Assembly at 9")
        .await
        .unwrap();
    assert_eq!(report.pushed, 0);
    assert_eq!(report.persisted, 3);
    assert!(!state.presence.is_connected(&key));
}
