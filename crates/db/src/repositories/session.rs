//! Session repository.

use std::sync::Arc;

use crate::entities::session::SessionStatus;
use crate::entities::{Session, session};
use chrono::{DateTime, Utc};
use peersup_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Session repository for database operations.
#[derive(Clone)]
pub struct SessionRepository {
    db: Arc<DatabaseConnection>,
}

impl SessionRepository {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a session by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<session::Model>> {
        Session::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a session by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<session::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    /// Find sessions where the user is either party (paginated).
    pub async fn find_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<session::Model>> {
        Session::find()
            .filter(
                Condition::any()
                    .add(session::Column::ClientId.eq(user_id))
                    .add(session::Column::SupporterId.eq(user_id)),
            )
            .order_by_asc(session::Column::ScheduledAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find upcoming scheduled sessions for a user.
    pub async fn find_upcoming_for_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<session::Model>> {
        Session::find()
            .filter(
                Condition::any()
                    .add(session::Column::ClientId.eq(user_id))
                    .add(session::Column::SupporterId.eq(user_id)),
            )
            .filter(session::Column::Status.eq(SessionStatus::Scheduled))
            .filter(session::Column::ScheduledAt.gt(now))
            .order_by_asc(session::Column::ScheduledAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count sessions for a client.
    pub async fn count_by_client(&self, client_id: &str) -> AppResult<u64> {
        Session::find()
            .filter(session::Column::ClientId.eq(client_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new session.
    pub async fn create(&self, model: session::ActiveModel) -> AppResult<session::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a session.
    pub async fn update(&self, model: session::ActiveModel) -> AppResult<session::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Cancel a scheduled session.
    ///
    /// The status guard makes the transition single-shot: a session that
    /// already left `scheduled` is not touched.
    pub async fn mark_cancelled(
        &self,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = Session::update_many()
            .col_expr(session::Column::Status, Expr::value(SessionStatus::Cancelled))
            .col_expr(
                session::Column::CancelReason,
                Expr::value(Some(reason.to_string())),
            )
            .col_expr(
                session::Column::CancelledAt,
                Expr::value(Some(sea_orm::prelude::DateTimeWithTimeZone::from(now))),
            )
            .col_expr(
                session::Column::UpdatedAt,
                Expr::value(Some(sea_orm::prelude::DateTimeWithTimeZone::from(now))),
            )
            .filter(session::Column::Id.eq(id))
            .filter(session::Column::Status.eq(SessionStatus::Scheduled))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Session is no longer scheduled".to_string(),
            ));
        }
        Ok(())
    }

    /// Mark a session as completed.
    pub async fn mark_completed(&self, id: &str, now: DateTime<Utc>) -> AppResult<()> {
        let result = Session::update_many()
            .col_expr(session::Column::Status, Expr::value(SessionStatus::Completed))
            .col_expr(
                session::Column::UpdatedAt,
                Expr::value(Some(sea_orm::prelude::DateTimeWithTimeZone::from(now))),
            )
            .filter(session::Column::Id.eq(id))
            .filter(session::Column::Status.eq(SessionStatus::Scheduled))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Session is no longer scheduled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::session::SessionKind;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_session(id: &str, client_id: &str, supporter_id: &str) -> session::Model {
        session::Model {
            id: id.to_string(),
            client_id: client_id.to_string(),
            supporter_id: supporter_id.to_string(),
            kind: SessionKind::Video,
            status: SessionStatus::Scheduled,
            scheduled_at: (Utc::now() + chrono::Duration::hours(24)).into(),
            duration_minutes: 50,
            price_cents: 4500,
            cancel_reason: None,
            cancelled_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let session = create_test_session("sess1", "client1", "supporter1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[session.clone()]])
                .into_connection(),
        );

        let repo = SessionRepository::new(db);
        let result = repo.find_by_id("sess1").await.unwrap();
        assert_eq!(result.unwrap().id, "sess1");
    }

    #[tokio::test]
    async fn test_mark_cancelled_conflict_when_not_scheduled() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = SessionRepository::new(db);
        let result = repo
            .mark_cancelled("sess1", "deadline passed", Utc::now())
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
