//! Notification read-state for the calling user

use std::sync::Arc;
use tracing::debug;

use crate::auth::Caller;
use crate::store::NotificationDirectory;
use crate::types::{BulletinError, NotificationId, Result};

use super::model::Notification;

pub struct Inbox {
    notifications: Arc<dyn NotificationDirectory>,
}

impl Inbox {
    pub fn new(notifications: Arc<dyn NotificationDirectory>) -> Self {
        Self { notifications }
    }

    /// Caller's notifications, newest event first
    pub async fn list(&self, caller: &Caller) -> Result<Vec<Notification>> {
        self.notifications.list_for(&caller.id).await
    }

    /// Mark one notification read. Someone else's notification is reported
    /// as missing; marking twice is fine.
    pub async fn mark_read(&self, caller: &Caller, id: &NotificationId) -> Result<Notification> {
        let marked = self
            .notifications
            .mark_read(&caller.id, id)
            .await?
            .ok_or_else(|| BulletinError::NotFound("Notification not found".into()))?;
        debug!(user = %caller.id, notification = %id, "Notification read");
        Ok(marked)
    }

    pub async fn mark_all_read(&self, caller: &Caller) -> Result<u64> {
        let changed = self.notifications.mark_all_read(&caller.id).await?;
        debug!(user = %caller.id, changed, "All notifications read");
        Ok(changed)
    }

    pub async fn unread_count(&self, caller: &Caller) -> Result<u64> {
        self.notifications.unread_count(&caller.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::model::NotificationMessage;
    use crate::store::MemoryNotificationDirectory;
    use crate::types::{Scope, UserRole};
    use chrono::Utc;

    fn message() -> NotificationMessage {
        NotificationMessage {
            title: "Reminder".into(),
            body: "Fees due".into(),
            scope: Scope::All,
            news_id: None,
        }
    }

    #[tokio::test]
    async fn test_mark_read_is_owner_scoped_and_idempotent() {
        let dir = Arc::new(MemoryNotificationDirectory::new());
        let inbox = Inbox::new(dir.clone());
        let owner = Caller::new("u1".into(), "u", UserRole::Student, false);
        let other = Caller::new("u2".into(), "v", UserRole::Student, false);

        let n = dir
            .insert(message().for_recipient(owner.id.clone(), 1, Utc::now()))
            .await
            .unwrap();

        assert!(matches!(
            inbox.mark_read(&other, &n.id).await,
            Err(BulletinError::NotFound(_))
        ));
        assert!(inbox.mark_read(&owner, &n.id).await.unwrap().read);
        assert!(inbox.mark_read(&owner, &n.id).await.unwrap().read);
        assert_eq!(inbox.unread_count(&owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_counts_changes() {
        let dir = Arc::new(MemoryNotificationDirectory::new());
        let inbox = Inbox::new(dir.clone());
        let owner = Caller::new("u1".into(), "u", UserRole::Student, false);
        for seq in 1..=3 {
            dir.insert(message().for_recipient(owner.id.clone(), seq, Utc::now()))
                .await
                .unwrap();
        }

        assert_eq!(inbox.unread_count(&owner).await.unwrap(), 3);
        assert_eq!(inbox.mark_all_read(&owner).await.unwrap(), 3);
        assert_eq!(inbox.mark_all_read(&owner).await.unwrap(), 0);

        let listed = inbox.list(&owner).await.unwrap();
        let seqs: Vec<i64> = listed.iter().map(|n| n.seq).collect();
        assert_eq!(seqs, vec![3, 2, 1]);
    }

    #[test]
    fn test_unknown_user_has_empty_inbox() {
        let inbox = Inbox::new(Arc::new(MemoryNotificationDirectory::new()));
        let nobody = Caller::new("ghost".into(), "g", UserRole::Faculty, false);

        let listed = tokio_test::assert_ok!(tokio_test::block_on(inbox.list(&nobody)));
        assert!(listed.is_empty());
        assert_eq!(
            tokio_test::block_on(inbox.mark_all_read(&nobody)).unwrap(),
            0
        );
        tokio_test::assert_err!(tokio_test::block_on(
            inbox.mark_read(&nobody, &NotificationId::generate())
        ));
    }
}
