//! Reschedule negotiation service.
//!
//! Owns the lifecycle of a reschedule proposal: a supporter proposes a new
//! session time, the client accepts or declines before the response
//! deadline, and unanswered proposals are settled by the deadline sweeper
//! (auto-cancelling the session with a full refund). All transitions out of
//! `pending` are single-shot; the store arbitrates races between a late
//! client response and the sweeper.

use chrono::{DateTime, Utc};
use peersup_common::{AppError, AppResult, IdGenerator};
use peersup_db::entities::reschedule_request::{self, RescheduleStatus};
use peersup_db::entities::session::SessionStatus;
use peersup_db::repositories::{RescheduleRequestRepository, SessionRepository, UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::deadline::response_deadline_for;
use crate::services::notification::NotificationService;

/// Maximum requests settled per sweeper tick.
const SWEEP_BATCH_SIZE: u64 = 100;

/// Input for proposing a reschedule.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRescheduleInput {
    pub session_id: String,
    pub proposed_scheduled_at: DateTime<Utc>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Service governing the reschedule request lifecycle.
#[derive(Clone)]
pub struct RescheduleService {
    reschedule_repo: RescheduleRequestRepository,
    session_repo: SessionRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl RescheduleService {
    /// Create a new reschedule service.
    #[must_use]
    pub fn new(
        reschedule_repo: RescheduleRequestRepository,
        session_repo: SessionRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            reschedule_repo,
            session_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a reschedule request by ID, restricted to its two parties.
    pub async fn get_by_id_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> AppResult<reschedule_request::Model> {
        let request = self.reschedule_repo.get_by_id(id).await?;

        if request.client_id != user_id && request.supporter_id != user_id {
            return Err(AppError::Forbidden(
                "Not a party to this reschedule request".to_string(),
            ));
        }

        Ok(request)
    }

    /// List requests the client can still act on: pending and unexpired.
    ///
    /// Requests past their deadline are never returned, even before the
    /// sweeper has settled them.
    pub async fn list_actionable_for_client(
        &self,
        client_id: &str,
        limit: u64,
    ) -> AppResult<Vec<reschedule_request::Model>> {
        self.reschedule_repo
            .find_actionable_for_client(client_id, Utc::now(), limit)
            .await
    }

    /// Count requests the client can still act on.
    pub async fn count_actionable_for_client(&self, client_id: &str) -> AppResult<u64> {
        self.reschedule_repo
            .count_actionable_for_client(client_id, Utc::now())
            .await
    }

    /// List requests proposed by a supporter, newest first.
    pub async fn list_for_supporter(
        &self,
        supporter_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<reschedule_request::Model>> {
        self.reschedule_repo
            .find_by_supporter(supporter_id, limit, offset)
            .await
    }

    /// Propose a new time for a scheduled session.
    ///
    /// The response deadline is the original session time minus the lead
    /// window; proposals inside the lead window are rejected because the
    /// client would have no time to respond.
    pub async fn propose(
        &self,
        supporter_id: &str,
        input: ProposeRescheduleInput,
    ) -> AppResult<reschedule_request::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let session = self.session_repo.get_by_id(&input.session_id).await?;

        if session.supporter_id != supporter_id {
            return Err(AppError::Forbidden(
                "Not the supporter of this session".to_string(),
            ));
        }

        if session.status != SessionStatus::Scheduled {
            return Err(AppError::Validation(
                "Only scheduled sessions can be rescheduled".to_string(),
            ));
        }

        if self
            .reschedule_repo
            .find_pending_by_session(&session.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A reschedule request is already pending for this session".to_string(),
            ));
        }

        let now = Utc::now();
        let original_scheduled_at: DateTime<Utc> = session.scheduled_at.into();
        let proposed_scheduled_at = input.proposed_scheduled_at;

        if proposed_scheduled_at <= now {
            return Err(AppError::Validation(
                "Proposed time must be in the future".to_string(),
            ));
        }

        if proposed_scheduled_at == original_scheduled_at {
            return Err(AppError::Validation(
                "Proposed time matches the current session time".to_string(),
            ));
        }

        let deadline = response_deadline_for(original_scheduled_at);
        if deadline <= now {
            return Err(AppError::Validation(
                "Too close to the session time to propose a reschedule".to_string(),
            ));
        }

        let supporter = self.user_repo.get_by_id(&session.supporter_id).await?;

        let id = self.id_gen.generate();
        let model = reschedule_request::ActiveModel {
            id: Set(id),
            session_id: Set(session.id.clone()),
            supporter_id: Set(session.supporter_id.clone()),
            client_id: Set(session.client_id.clone()),
            original_scheduled_at: Set(session.scheduled_at),
            proposed_scheduled_at: Set(proposed_scheduled_at.into()),
            status: Set(RescheduleStatus::Pending),
            reason: Set(input.reason),
            response_deadline: Set(deadline.into()),
            created_at: Set(now.into()),
            responded_at: Set(None),
        };

        let request = self.reschedule_repo.create(model).await?;

        // Best-effort: the stored request is authoritative either way.
        if let Err(e) = self
            .notification_service
            .notify_reschedule_requested(
                &request.client_id,
                &request.supporter_id,
                &request.session_id,
                &request.id,
                supporter.presented_name(),
                proposed_scheduled_at,
                deadline,
            )
            .await
        {
            tracing::warn!(error = %e, request_id = %request.id, "Failed to notify client of reschedule proposal");
        }

        Ok(request)
    }

    /// Accept a pending request as the client.
    ///
    /// Moves the session to the proposed time and notifies the supporter.
    /// Races with the deadline sweeper resolve in the store: whichever
    /// transition commits first wins, the other sees a conflict.
    pub async fn accept(&self, request_id: &str, client_id: &str) -> AppResult<reschedule_request::Model> {
        let request = self.reschedule_repo.get_by_id(request_id).await?;

        if request.client_id != client_id {
            return Err(AppError::Forbidden(
                "Not the client of this reschedule request".to_string(),
            ));
        }

        if !request.status.is_pending() {
            return Err(AppError::Conflict(
                "Reschedule request is no longer pending".to_string(),
            ));
        }

        let now = Utc::now();
        let deadline: DateTime<Utc> = request.response_deadline.into();
        if now >= deadline {
            return Err(AppError::Conflict(
                "The response deadline has passed".to_string(),
            ));
        }

        self.reschedule_repo
            .accept_and_move_session(&request, now)
            .await?;

        // The transition is committed; notification problems must not
        // surface as a failed accept.
        match self.user_repo.get_by_id(client_id).await {
            Ok(client) => {
                if let Err(e) = self
                    .notification_service
                    .notify_reschedule_accepted(
                        &request.supporter_id,
                        client_id,
                        &request.session_id,
                        &request.id,
                        client.presented_name(),
                        request.proposed_scheduled_at.into(),
                    )
                    .await
                {
                    tracing::warn!(error = %e, request_id = %request.id, "Failed to notify supporter of acceptance");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, request_id = %request.id, "Failed to load client for acceptance notification");
            }
        }

        let mut accepted = request;
        accepted.status = RescheduleStatus::Accepted;
        accepted.responded_at = Some(now.into());
        Ok(accepted)
    }

    /// Decline a pending request as the client. The original time stands.
    ///
    /// Irreversible: there is no undo, which is why clients confirm before
    /// calling this.
    pub async fn decline(
        &self,
        request_id: &str,
        client_id: &str,
    ) -> AppResult<reschedule_request::Model> {
        let request = self.reschedule_repo.get_by_id(request_id).await?;

        if request.client_id != client_id {
            return Err(AppError::Forbidden(
                "Not the client of this reschedule request".to_string(),
            ));
        }

        if !request.status.is_pending() {
            return Err(AppError::Conflict(
                "Reschedule request is no longer pending".to_string(),
            ));
        }

        let now = Utc::now();
        let deadline: DateTime<Utc> = request.response_deadline.into();
        if now >= deadline {
            return Err(AppError::Conflict(
                "The response deadline has passed".to_string(),
            ));
        }

        self.reschedule_repo.mark_declined(&request.id, now).await?;

        // The transition is committed; notification problems must not
        // surface as a failed decline.
        match self.user_repo.get_by_id(client_id).await {
            Ok(client) => {
                if let Err(e) = self
                    .notification_service
                    .notify_reschedule_declined(
                        &request.supporter_id,
                        client_id,
                        &request.session_id,
                        &request.id,
                        client.presented_name(),
                        request.original_scheduled_at.into(),
                    )
                    .await
                {
                    tracing::warn!(error = %e, request_id = %request.id, "Failed to notify supporter of decline");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, request_id = %request.id, "Failed to load client for decline notification");
            }
        }

        let mut declined = request;
        declined.status = RescheduleStatus::Declined;
        declined.responded_at = Some(now.into());
        Ok(declined)
    }

    // ==================== Processing Methods (for the sweeper) ====================

    /// Settle pending requests whose response deadline has passed.
    ///
    /// Returns the number of requests settled this tick. Failures on
    /// individual requests are logged and skipped so one bad row cannot
    /// stall the sweep.
    pub async fn process_expired(&self) -> AppResult<u64> {
        let now = Utc::now();
        let due = self
            .reschedule_repo
            .find_deadline_passed(now, SWEEP_BATCH_SIZE)
            .await?;

        let mut settled = 0;
        for request in due {
            match self.settle_unanswered(&request, now).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        request_id = %request.id,
                        "Failed to settle unanswered reschedule request"
                    );
                }
            }
        }

        Ok(settled)
    }

    /// Settle one unanswered request.
    ///
    /// The normal path auto-cancels the session with a full refund, in one
    /// transaction with the request transition. When the session has already
    /// left `scheduled` by other means there is nothing to cancel, and the
    /// request is closed as plain `expired`.
    async fn settle_unanswered(
        &self,
        request: &reschedule_request::Model,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let session = self.session_repo.find_by_id(&request.session_id).await?;

        let Some(session) = session else {
            return self.reschedule_repo.mark_expired(&request.id).await;
        };

        if session.status != SessionStatus::Scheduled {
            return self.reschedule_repo.mark_expired(&request.id).await;
        }

        let refund_id = self.id_gen.generate();
        let performed = self
            .reschedule_repo
            .auto_cancel_with_refund(request, &session, &refund_id, now)
            .await?;

        if !performed {
            // Lost the race with a client response or a concurrent session
            // transition; the next tick re-examines whatever remains.
            return Ok(false);
        }

        for recipient in [&request.client_id, &request.supporter_id] {
            if let Err(e) = self
                .notification_service
                .notify_session_auto_cancelled(
                    recipient,
                    &request.session_id,
                    &request.id,
                    session.price_cents,
                )
                .await
            {
                tracing::warn!(
                    error = %e,
                    request_id = %request.id,
                    recipient,
                    "Failed to notify of auto-cancellation"
                );
            }
        }

        Ok(true)
    }

    /// Delete terminal requests older than the retention period.
    pub async fn cleanup_old_requests(&self, retention_days: u32) -> AppResult<u64> {
        self.reschedule_repo
            .delete_old_terminal(i64::from(retention_days))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use peersup_db::entities::session::{self, SessionKind};
    use peersup_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_session(id: &str, status: SessionStatus, scheduled_in_hours: i64) -> session::Model {
        session::Model {
            id: id.to_string(),
            client_id: "client1".to_string(),
            supporter_id: "supporter1".to_string(),
            kind: SessionKind::Video,
            status,
            scheduled_at: (Utc::now() + Duration::hours(scheduled_in_hours)).into(),
            duration_minutes: 50,
            price_cents: 4500,
            cancel_reason: None,
            cancelled_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_request(
        id: &str,
        status: RescheduleStatus,
        deadline_in_hours: i64,
    ) -> reschedule_request::Model {
        let original = Utc::now() + Duration::hours(deadline_in_hours + 3);
        reschedule_request::Model {
            id: id.to_string(),
            session_id: "sess1".to_string(),
            supporter_id: "supporter1".to_string(),
            client_id: "client1".to_string(),
            original_scheduled_at: original.into(),
            proposed_scheduled_at: (original + Duration::hours(24)).into(),
            status,
            reason: None,
            response_deadline: (Utc::now() + Duration::hours(deadline_in_hours)).into(),
            created_at: Utc::now().into(),
            responded_at: None,
        }
    }

    fn service_with(
        reschedule_db: Arc<DatabaseConnection>,
        session_db: Arc<DatabaseConnection>,
        user_db: Arc<DatabaseConnection>,
    ) -> RescheduleService {
        let notification_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        RescheduleService::new(
            RescheduleRequestRepository::new(reschedule_db),
            SessionRepository::new(session_db),
            UserRepository::new(user_db),
            NotificationService::new(NotificationRepository::new(notification_db)),
        )
    }

    fn mock_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    #[tokio::test]
    async fn test_accept_rejects_wrong_client() {
        let request = test_request("req1", RescheduleStatus::Pending, 5);
        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );
        let service = service_with(reschedule_db, mock_db(), mock_db());

        let result = service.accept("req1", "someone_else").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_accept_on_declined_request_is_conflict() {
        let request = test_request("req1", RescheduleStatus::Declined, 5);
        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );
        let service = service_with(reschedule_db, mock_db(), mock_db());

        let result = service.accept("req1", "client1").await;
        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("no longer pending")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accept_past_deadline_is_conflict() {
        let request = test_request("req1", RescheduleStatus::Pending, -1);
        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );
        let service = service_with(reschedule_db, mock_db(), mock_db());

        let result = service.accept("req1", "client1").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_decline_on_settled_request_is_conflict() {
        let request = test_request("req1", RescheduleStatus::Accepted, 5);
        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );
        let service = service_with(reschedule_db, mock_db(), mock_db());

        let result = service.decline("req1", "client1").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_propose_rejects_foreign_supporter() {
        let session = test_session("sess1", SessionStatus::Scheduled, 24);
        let session_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[session]])
                .into_connection(),
        );
        let service = service_with(mock_db(), session_db, mock_db());

        let input = ProposeRescheduleInput {
            session_id: "sess1".to_string(),
            proposed_scheduled_at: Utc::now() + Duration::hours(48),
            reason: None,
        };
        let result = service.propose("intruder", input).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_propose_rejects_cancelled_session() {
        let session = test_session("sess1", SessionStatus::Cancelled, 24);
        let session_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[session]])
                .into_connection(),
        );
        let service = service_with(mock_db(), session_db, mock_db());

        let input = ProposeRescheduleInput {
            session_id: "sess1".to_string(),
            proposed_scheduled_at: Utc::now() + Duration::hours(48),
            reason: None,
        };
        let result = service.propose("supporter1", input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_propose_rejects_second_pending_request() {
        let session = test_session("sess1", SessionStatus::Scheduled, 24);
        let existing = test_request("req0", RescheduleStatus::Pending, 21);
        let session_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[session]])
                .into_connection(),
        );
        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );
        let service = service_with(reschedule_db, session_db, mock_db());

        let input = ProposeRescheduleInput {
            session_id: "sess1".to_string(),
            proposed_scheduled_at: Utc::now() + Duration::hours(48),
            reason: None,
        };
        let result = service.propose("supporter1", input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_propose_rejects_inside_lead_window() {
        // Session two hours out: the 3h response window has already closed.
        let session = test_session("sess1", SessionStatus::Scheduled, 2);
        let session_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[session]])
                .into_connection(),
        );
        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<reschedule_request::Model>::new()])
                .into_connection(),
        );
        let service = service_with(reschedule_db, session_db, mock_db());

        let input = ProposeRescheduleInput {
            session_id: "sess1".to_string(),
            proposed_scheduled_at: Utc::now() + Duration::hours(48),
            reason: None,
        };
        let result = service.propose("supporter1", input).await;
        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Too close")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_settle_unanswered_expires_when_session_already_cancelled() {
        let request = test_request("req1", RescheduleStatus::Pending, -1);
        let session = test_session("sess1", SessionStatus::Cancelled, 2);

        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([sea_orm::MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let session_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[session]])
                .into_connection(),
        );
        let service = service_with(reschedule_db, session_db, mock_db());

        let settled = service
            .settle_unanswered(&request, Utc::now())
            .await
            .unwrap();
        assert!(settled);
    }

    #[tokio::test]
    async fn test_get_by_id_for_user_rejects_third_party() {
        let request = test_request("req1", RescheduleStatus::Pending, 5);
        let reschedule_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );
        let service = service_with(reschedule_db, mock_db(), mock_db());

        let result = service.get_by_id_for_user("req1", "stranger").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
