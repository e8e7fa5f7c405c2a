//! Refund repository.

use std::sync::Arc;

use crate::entities::refund::RefundStatus;
use crate::entities::{Refund, refund};
use chrono::{DateTime, Utc};
use peersup_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Refund repository for database operations.
#[derive(Clone)]
pub struct RefundRepository {
    db: Arc<DatabaseConnection>,
}

impl RefundRepository {
    /// Create a new refund repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a refund by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<refund::Model>> {
        Refund::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a refund by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<refund::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Refund {id} not found")))
    }

    /// Find the refund for a session, if any.
    pub async fn find_by_session(&self, session_id: &str) -> AppResult<Option<refund::Model>> {
        Refund::find()
            .filter(refund::Column::SessionId.eq(session_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find refunds awaiting settlement, oldest first.
    ///
    /// Failed refunds below the attempt ceiling are retried alongside fresh
    /// ones.
    pub async fn find_unsettled(
        &self,
        max_attempts: i32,
        limit: u64,
    ) -> AppResult<Vec<refund::Model>> {
        Refund::find()
            .filter(
                refund::Column::Status
                    .eq(RefundStatus::Pending)
                    .or(refund::Column::Status.eq(RefundStatus::Failed)),
            )
            .filter(refund::Column::AttemptCount.lt(max_attempts))
            .order_by_asc(refund::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new refund record.
    pub async fn create(&self, model: refund::ActiveModel) -> AppResult<refund::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a refund as settled with the payment provider.
    pub async fn mark_issued(
        &self,
        id: &str,
        provider_ref: &str,
        now: DateTime<Utc>,
    ) -> AppResult<refund::Model> {
        let refund = self.get_by_id(id).await?;
        let attempt_count = refund.attempt_count;
        let mut active: refund::ActiveModel = refund.into();
        active.status = Set(RefundStatus::Issued);
        active.provider_ref = Set(Some(provider_ref.to_string()));
        active.failure_reason = Set(None);
        active.attempt_count = Set(attempt_count + 1);
        active.issued_at = Set(Some(now.into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a failed settlement attempt.
    pub async fn mark_failed(&self, id: &str, reason: &str) -> AppResult<refund::Model> {
        let refund = self.get_by_id(id).await?;
        let attempt_count = refund.attempt_count;
        let mut active: refund::ActiveModel = refund.into();
        active.status = Set(RefundStatus::Failed);
        active.failure_reason = Set(Some(reason.to_string()));
        active.attempt_count = Set(attempt_count + 1);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_refund(id: &str, session_id: &str) -> refund::Model {
        refund::Model {
            id: id.to_string(),
            session_id: session_id.to_string(),
            client_id: "client1".to_string(),
            amount_cents: 4500,
            status: RefundStatus::Pending,
            provider_ref: None,
            failure_reason: None,
            attempt_count: 0,
            created_at: Utc::now().into(),
            issued_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_session() {
        let refund = create_test_refund("ref1", "sess1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[refund.clone()]])
                .into_connection(),
        );

        let repo = RefundRepository::new(db);
        let result = repo.find_by_session("sess1").await.unwrap();
        assert_eq!(result.unwrap().id, "ref1");
    }

    #[tokio::test]
    async fn test_mark_issued_sets_receipt() {
        let refund = create_test_refund("ref1", "sess1");
        let mut issued = refund.clone();
        issued.status = RefundStatus::Issued;
        issued.provider_ref = Some("re_123".to_string());
        issued.attempt_count = 1;
        issued.issued_at = Some(Utc::now().into());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[refund], [issued.clone()]])
                .into_connection(),
        );

        let repo = RefundRepository::new(db);
        let result = repo.mark_issued("ref1", "re_123", Utc::now()).await.unwrap();
        assert_eq!(result.status, RefundStatus::Issued);
        assert_eq!(result.provider_ref.as_deref(), Some("re_123"));
    }
}
