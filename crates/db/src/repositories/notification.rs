//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use peersup_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a notification.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let notification = self.find_by_id(id).await?;
        if let Some(n) = notification {
            n.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Get notifications for a user (paginated).
    pub async fn find_by_recipient(
        &self,
        recipient_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .order_by_desc(notification::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(notification::Column::Id.lt(id));
        }

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a notification as read.
    pub async fn mark_as_read(&self, id: &str) -> AppResult<()> {
        let notification = self.find_by_id(id).await?;
        if let Some(n) = notification {
            let mut active: notification::ActiveModel = n.into();
            active.is_read = Set(true);
            active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, recipient_id: &str) -> AppResult<u64> {
        use sea_orm::UpdateResult;

        let result: UpdateResult = Notification::update_many()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::IsRead.eq(false))
            .col_expr(notification::Column::IsRead, true.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, recipient_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete all notifications for a user.
    pub async fn delete_all_for_recipient(&self, recipient_id: &str) -> AppResult<u64> {
        use sea_orm::DeleteResult;

        let result: DeleteResult = Notification::delete_many()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_notification(id: &str, recipient_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient_id.to_string(),
            actor_id: Some("client1".to_string()),
            notification_type: NotificationType::RescheduleAccepted,
            session_id: Some("sess1".to_string()),
            reschedule_request_id: Some("req1".to_string()),
            body: None,
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_recipient() {
        let notifications = vec![
            create_test_notification("n1", "supporter1"),
            create_test_notification("n2", "supporter1"),
        ];
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([notifications.clone()])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo
            .find_by_recipient("supporter1", 10, None, false)
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_count_unread() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo.count_unread("supporter1").await.unwrap();
        assert_eq!(result, 2);
    }
}
