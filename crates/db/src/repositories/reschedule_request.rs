//! Reschedule request repository.
//!
//! All transitions out of `pending` are guarded updates: the status filter
//! makes the store the arbiter of races between the client's response and
//! the deadline sweeper. Whichever transition commits first wins; the loser
//! sees zero affected rows.

use std::sync::Arc;

use crate::entities::refund::{self, RefundStatus};
use crate::entities::reschedule_request::RescheduleStatus;
use crate::entities::session::{self, SessionStatus};
use crate::entities::{RescheduleRequest, Session, reschedule_request};
use chrono::{DateTime, Utc};
use peersup_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};

/// Error message for transitions attempted on a settled request.
const NO_LONGER_PENDING: &str = "Reschedule request is no longer pending";

/// Reschedule request repository for database operations.
#[derive(Clone)]
pub struct RescheduleRequestRepository {
    db: Arc<DatabaseConnection>,
}

impl RescheduleRequestRepository {
    /// Create a new reschedule request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reschedule request by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<reschedule_request::Model>> {
        RescheduleRequest::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a reschedule request by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<reschedule_request::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reschedule request {id} not found")))
    }

    /// Find the pending request for a session, if any.
    pub async fn find_pending_by_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<reschedule_request::Model>> {
        RescheduleRequest::find()
            .filter(reschedule_request::Column::SessionId.eq(session_id))
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find requests a client can still act on: pending, deadline not passed.
    ///
    /// Requests past their deadline are excluded even before the sweeper has
    /// settled them, so they are never presented as actionable.
    pub async fn find_actionable_for_client(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<reschedule_request::Model>> {
        RescheduleRequest::find()
            .filter(reschedule_request::Column::ClientId.eq(client_id))
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .filter(reschedule_request::Column::ResponseDeadline.gt(now))
            .order_by_asc(reschedule_request::Column::ResponseDeadline)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count actionable requests for a client.
    pub async fn count_actionable_for_client(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        RescheduleRequest::find()
            .filter(reschedule_request::Column::ClientId.eq(client_id))
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .filter(reschedule_request::Column::ResponseDeadline.gt(now))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find requests proposed by a supporter (paginated, newest first).
    pub async fn find_by_supporter(
        &self,
        supporter_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<reschedule_request::Model>> {
        RescheduleRequest::find()
            .filter(reschedule_request::Column::SupporterId.eq(supporter_id))
            .order_by_desc(reschedule_request::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find pending requests whose response deadline has passed.
    pub async fn find_deadline_passed(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<reschedule_request::Model>> {
        RescheduleRequest::find()
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .filter(reschedule_request::Column::ResponseDeadline.lte(now))
            .order_by_asc(reschedule_request::Column::ResponseDeadline)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new reschedule request.
    pub async fn create(
        &self,
        model: reschedule_request::ActiveModel,
    ) -> AppResult<reschedule_request::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Accept a pending request and move the session to the proposed time.
    ///
    /// Both rows change in one transaction. Fails with a conflict if the
    /// request already left `pending`.
    pub async fn accept_and_move_session(
        &self,
        request: &reschedule_request::Model,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = RescheduleRequest::update_many()
            .col_expr(
                reschedule_request::Column::Status,
                Expr::value(RescheduleStatus::Accepted),
            )
            .col_expr(
                reschedule_request::Column::RespondedAt,
                Expr::value(Some(DateTimeWithTimeZone::from(now))),
            )
            .filter(reschedule_request::Column::Id.eq(&request.id))
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Err(AppError::Conflict(NO_LONGER_PENDING.to_string()));
        }

        let session_updated = Session::update_many()
            .col_expr(
                session::Column::ScheduledAt,
                Expr::value(request.proposed_scheduled_at),
            )
            .col_expr(
                session::Column::UpdatedAt,
                Expr::value(Some(DateTimeWithTimeZone::from(now))),
            )
            .filter(session::Column::Id.eq(&request.session_id))
            .filter(session::Column::Status.eq(SessionStatus::Scheduled))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if session_updated.rows_affected == 0 {
            // The session left `scheduled` while the request sat open.
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Err(AppError::Conflict(
                "Session is no longer scheduled".to_string(),
            ));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Decline a pending request. The session is left untouched.
    pub async fn mark_declined(&self, id: &str, now: DateTime<Utc>) -> AppResult<()> {
        let result = RescheduleRequest::update_many()
            .col_expr(
                reschedule_request::Column::Status,
                Expr::value(RescheduleStatus::Declined),
            )
            .col_expr(
                reschedule_request::Column::RespondedAt,
                Expr::value(Some(DateTimeWithTimeZone::from(now))),
            )
            .filter(reschedule_request::Column::Id.eq(id))
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(NO_LONGER_PENDING.to_string()));
        }
        Ok(())
    }

    /// Close a pending request whose session no longer needs cancelling.
    ///
    /// `responded_at` stays unset: the client never acted. Returns whether
    /// the transition happened (false means a response won the race).
    pub async fn mark_expired(&self, id: &str) -> AppResult<bool> {
        let result = RescheduleRequest::update_many()
            .col_expr(
                reschedule_request::Column::Status,
                Expr::value(RescheduleStatus::Expired),
            )
            .filter(reschedule_request::Column::Id.eq(id))
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Settle an unanswered request: request to `auto_cancelled`, session to
    /// `cancelled`, and a full refund row, all in one transaction.
    ///
    /// A client must never observe the cancelled session without its refund,
    /// so the three writes commit or roll back together. Returns whether the
    /// transition happened; false means either the client's response or the
    /// session's own lifecycle won the race, and nothing was changed.
    pub async fn auto_cancel_with_refund(
        &self,
        request: &reschedule_request::Model,
        session: &session::Model,
        refund_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let request_updated = RescheduleRequest::update_many()
            .col_expr(
                reschedule_request::Column::Status,
                Expr::value(RescheduleStatus::AutoCancelled),
            )
            .filter(reschedule_request::Column::Id.eq(&request.id))
            .filter(reschedule_request::Column::Status.eq(RescheduleStatus::Pending))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if request_updated.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        let session_updated = Session::update_many()
            .col_expr(
                session::Column::Status,
                Expr::value(SessionStatus::Cancelled),
            )
            .col_expr(
                session::Column::CancelReason,
                Expr::value(Some(
                    "Reschedule response deadline passed".to_string(),
                )),
            )
            .col_expr(
                session::Column::CancelledAt,
                Expr::value(Some(DateTimeWithTimeZone::from(now))),
            )
            .col_expr(
                session::Column::UpdatedAt,
                Expr::value(Some(DateTimeWithTimeZone::from(now))),
            )
            .filter(session::Column::Id.eq(&session.id))
            .filter(session::Column::Status.eq(SessionStatus::Scheduled))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if session_updated.rows_affected == 0 {
            // The session left `scheduled` under us; the caller settles the
            // request as plain expired instead.
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        let refund = refund::ActiveModel {
            id: sea_orm::Set(refund_id.to_string()),
            session_id: sea_orm::Set(session.id.clone()),
            client_id: sea_orm::Set(session.client_id.clone()),
            amount_cents: sea_orm::Set(session.price_cents),
            status: sea_orm::Set(RefundStatus::Pending),
            provider_ref: sea_orm::Set(None),
            failure_reason: sea_orm::Set(None),
            attempt_count: sea_orm::Set(0),
            created_at: sea_orm::Set(now.into()),
            issued_at: sea_orm::Set(None),
        };
        refund
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    /// Delete terminal requests older than the retention period.
    pub async fn delete_old_terminal(&self, older_than_days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(older_than_days);

        let result = RescheduleRequest::delete_many()
            .filter(reschedule_request::Column::Status.ne(RescheduleStatus::Pending))
            .filter(reschedule_request::Column::CreatedAt.lt(cutoff))
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
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_request(id: &str, session_id: &str) -> reschedule_request::Model {
        let original = Utc::now() + Duration::hours(24);
        reschedule_request::Model {
            id: id.to_string(),
            session_id: session_id.to_string(),
            supporter_id: "supporter1".to_string(),
            client_id: "client1".to_string(),
            original_scheduled_at: original.into(),
            proposed_scheduled_at: (original + Duration::hours(48)).into(),
            status: RescheduleStatus::Pending,
            reason: Some("Schedule conflict".to_string()),
            response_deadline: (original - Duration::hours(3)).into(),
            created_at: Utc::now().into(),
            responded_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let request = create_test_request("req1", "sess1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request.clone()]])
                .into_connection(),
        );

        let repo = RescheduleRequestRepository::new(db);
        let result = repo.find_by_id("req1").await.unwrap();
        assert_eq!(result.unwrap().id, "req1");
    }

    #[tokio::test]
    async fn test_find_pending_by_session_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<reschedule_request::Model>::new()])
                .into_connection(),
        );

        let repo = RescheduleRequestRepository::new(db);
        let result = repo.find_pending_by_session("sess1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mark_declined_conflict_when_settled() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = RescheduleRequestRepository::new(db);
        let result = repo.mark_declined("req1", Utc::now()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_mark_declined_success() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = RescheduleRequestRepository::new(db);
        repo.mark_declined("req1", Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_expired_reports_lost_race() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = RescheduleRequestRepository::new(db);
        let settled = repo.mark_expired("req1").await.unwrap();
        assert!(!settled);
    }

    #[tokio::test]
    async fn test_accept_conflict_rolls_back() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = RescheduleRequestRepository::new(db);
        let request = create_test_request("req1", "sess1");
        let result = repo.accept_and_move_session(&request, Utc::now()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
