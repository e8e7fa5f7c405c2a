//! Notification service.
//!
//! Persists one notification row per workflow transition and hands a push
//! payload to the configured [`PushDelivery`]. The row is the source of
//! truth: push failures are logged and never surfaced or rolled back.

use std::sync::Arc;

use crate::services::push::{NoOpPush, PushDelivery, PushPayload};
use chrono::{DateTime, Utc};
use peersup_common::{AppResult, IdGenerator};
use peersup_db::{
    entities::notification::{self, NotificationType},
    repositories::NotificationRepository,
};
use sea_orm::Set;
use serde_json::json;

/// Format a timestamp as the date part of a notification payload.
fn payload_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Format a timestamp as the time part of a notification payload.
fn payload_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    push: Arc<dyn PushDelivery>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service without push delivery.
    #[must_use]
    pub fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            push: Arc::new(NoOpPush),
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new notification service with a push transport.
    #[must_use]
    pub fn with_push(
        notification_repo: NotificationRepository,
        push: Arc<dyn PushDelivery>,
    ) -> Self {
        Self {
            notification_repo,
            push,
            id_gen: IdGenerator::new(),
        }
    }

    /// Notify a client that the supporter proposed a new session time.
    pub async fn notify_reschedule_requested(
        &self,
        client_id: &str,
        supporter_id: &str,
        session_id: &str,
        request_id: &str,
        counterparty_name: &str,
        proposed_at: DateTime<Utc>,
        response_deadline: DateTime<Utc>,
    ) -> AppResult<notification::Model> {
        let body = json!({
            "counterpartyName": counterparty_name,
            "proposedDate": payload_date(proposed_at),
            "proposedTime": payload_time(proposed_at),
            "responseDeadline": response_deadline.to_rfc3339(),
        });

        self.create_internal(
            client_id,
            Some(supporter_id),
            NotificationType::RescheduleRequested,
            Some(session_id),
            Some(request_id),
            body,
            format!("{counterparty_name} proposed a new session time"),
        )
        .await
    }

    /// Notify a supporter that the client accepted; includes the new time.
    pub async fn notify_reschedule_accepted(
        &self,
        supporter_id: &str,
        client_id: &str,
        session_id: &str,
        request_id: &str,
        counterparty_name: &str,
        new_scheduled_at: DateTime<Utc>,
    ) -> AppResult<notification::Model> {
        let body = json!({
            "counterpartyName": counterparty_name,
            "newDate": payload_date(new_scheduled_at),
            "newTime": payload_time(new_scheduled_at),
        });

        self.create_internal(
            supporter_id,
            Some(client_id),
            NotificationType::RescheduleAccepted,
            Some(session_id),
            Some(request_id),
            body,
            format!(
                "{counterparty_name} accepted the new time: {} at {}",
                payload_date(new_scheduled_at),
                payload_time(new_scheduled_at)
            ),
        )
        .await
    }

    /// Notify a supporter that the client declined; the original time stands.
    pub async fn notify_reschedule_declined(
        &self,
        supporter_id: &str,
        client_id: &str,
        session_id: &str,
        request_id: &str,
        counterparty_name: &str,
        original_scheduled_at: DateTime<Utc>,
    ) -> AppResult<notification::Model> {
        let body = json!({
            "counterpartyName": counterparty_name,
            "originalDate": payload_date(original_scheduled_at),
            "originalTime": payload_time(original_scheduled_at),
        });

        self.create_internal(
            supporter_id,
            Some(client_id),
            NotificationType::RescheduleDeclined,
            Some(session_id),
            Some(request_id),
            body,
            format!(
                "{counterparty_name} declined the reschedule; the session stays at {} {}",
                payload_date(original_scheduled_at),
                payload_time(original_scheduled_at)
            ),
        )
        .await
    }

    /// Notify a party that a session was auto-cancelled at the deadline.
    pub async fn notify_session_auto_cancelled(
        &self,
        recipient_id: &str,
        session_id: &str,
        request_id: &str,
        refunded_cents: i64,
    ) -> AppResult<notification::Model> {
        let body = json!({
            "refundedCents": refunded_cents,
        });

        self.create_internal(
            recipient_id,
            None,
            NotificationType::SessionAutoCancelled,
            Some(session_id),
            Some(request_id),
            body,
            "The session was cancelled because the reschedule deadline passed".to_string(),
        )
        .await
    }

    /// Notify a client that their refund settled.
    pub async fn notify_refund_issued(
        &self,
        client_id: &str,
        session_id: &str,
        amount_cents: i64,
    ) -> AppResult<notification::Model> {
        let body = json!({
            "amountCents": amount_cents,
        });

        self.create_internal(
            client_id,
            None,
            NotificationType::RefundIssued,
            Some(session_id),
            None,
            body,
            "Your refund has been issued".to_string(),
        )
        .await
    }

    /// Internal helper to create notifications.
    async fn create_internal(
        &self,
        recipient_id: &str,
        actor_id: Option<&str>,
        notification_type: NotificationType,
        session_id: Option<&str>,
        request_id: Option<&str>,
        body: serde_json::Value,
        push_text: String,
    ) -> AppResult<notification::Model> {
        let notification_id = self.id_gen.generate();
        let model = notification::ActiveModel {
            id: Set(notification_id),
            recipient_id: Set(recipient_id.to_string()),
            actor_id: Set(actor_id.map(std::string::ToString::to_string)),
            notification_type: Set(notification_type.clone()),
            session_id: Set(session_id.map(std::string::ToString::to_string)),
            reschedule_request_id: Set(request_id.map(std::string::ToString::to_string)),
            body: Set(Some(body.clone())),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let notification = self.notification_repo.create(model).await?;

        let type_str = match notification_type {
            NotificationType::RescheduleRequested => "rescheduleRequested",
            NotificationType::RescheduleAccepted => "rescheduleAccepted",
            NotificationType::RescheduleDeclined => "rescheduleDeclined",
            NotificationType::SessionAutoCancelled => "sessionAutoCancelled",
            NotificationType::RefundIssued => "refundIssued",
        };

        let payload = PushPayload {
            notification_type: type_str.to_string(),
            title: "Peersup".to_string(),
            body: push_text,
            data: body,
        };

        if let Err(e) = self.push.deliver(recipient_id, &payload).await {
            tracing::warn!(error = %e, recipient_id, "Failed to deliver push notification");
        }

        Ok(notification)
    }

    /// Get notifications for a user.
    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_recipient(user_id, limit, until_id, unread_only)
            .await
    }

    /// Mark a notification as read.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        // Verify the notification belongs to the user
        let notification = self.notification_repo.find_by_id(notification_id).await?;
        if let Some(n) = notification
            && n.recipient_id == user_id
        {
            self.notification_repo.mark_as_read(notification_id).await?;
        }
        Ok(())
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Delete a notification.
    pub async fn delete(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        // Verify the notification belongs to the user
        let notification = self.notification_repo.find_by_id(notification_id).await?;
        if let Some(n) = notification
            && n.recipient_id == user_id
        {
            self.notification_repo.delete(notification_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};


    fn accepted_notification(id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: "supporter1".to_string(),
            actor_id: Some("client1".to_string()),
            notification_type: NotificationType::RescheduleAccepted,
            session_id: Some("sess1".to_string()),
            reschedule_request_id: Some("req1".to_string()),
            body: Some(json!({
                "counterpartyName": "Alice",
                "newDate": "2026-08-12",
                "newTime": "14:30",
            })),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_accepted_notification_carries_new_time() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[accepted_notification("n1")]])
                .into_connection(),
        );
        let service = NotificationService::new(NotificationRepository::new(db));

        let new_time = Utc.with_ymd_and_hms(2026, 8, 12, 14, 30, 0).unwrap();
        let result = service
            .notify_reschedule_accepted("supporter1", "client1", "sess1", "req1", "Alice", new_time)
            .await
            .unwrap();

        let body = result.body.unwrap();
        assert_eq!(body["newDate"], "2026-08-12");
        assert_eq!(body["newTime"], "14:30");
    }

    #[tokio::test]
    async fn test_mark_as_read_ignores_foreign_notification() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[accepted_notification("n1")]])
                .into_connection(),
        );
        let service = NotificationService::new(NotificationRepository::new(db));

        // Recipient is supporter1; someone else marking it read is a no-op.
        service.mark_as_read("client9", "n1").await.unwrap();
    }

    #[test]
    fn test_payload_date_time_formatting() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 7, 0).unwrap();
        assert_eq!(payload_date(at), "2026-01-05");
        assert_eq!(payload_time(at), "09:07");
    }
}
