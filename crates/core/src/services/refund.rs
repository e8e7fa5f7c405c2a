//! Refund settlement service.
//!
//! Refund rows are created transactionally by the reschedule sweeper; this
//! service settles them with the payment provider afterwards. A failed
//! attempt is recorded and retried on the next sweep, up to the attempt
//! ceiling.

use std::sync::Arc;

use crate::services::notification::NotificationService;
use crate::services::payments::PaymentGateway;
use chrono::Utc;
use peersup_common::AppResult;
use peersup_db::repositories::RefundRepository;

/// Settlement attempts before a refund is left for manual follow-up.
pub const MAX_SETTLEMENT_ATTEMPTS: i32 = 5;

/// Batch size per settlement sweep.
const SETTLE_BATCH_SIZE: u64 = 50;

/// Service for settling recorded refunds with the payment provider.
#[derive(Clone)]
pub struct RefundService {
    refund_repo: RefundRepository,
    gateway: Arc<dyn PaymentGateway>,
    notification_service: NotificationService,
}

impl RefundService {
    /// Create a new refund service.
    #[must_use]
    pub fn new(
        refund_repo: RefundRepository,
        gateway: Arc<dyn PaymentGateway>,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            refund_repo,
            gateway,
            notification_service,
        }
    }

    /// Settle unsettled refunds. Returns the number settled this run.
    ///
    /// Gateway failures mark the row failed and move on; the row is retried
    /// next sweep until the attempt ceiling.
    pub async fn process_unsettled(&self) -> AppResult<u64> {
        let unsettled = self
            .refund_repo
            .find_unsettled(MAX_SETTLEMENT_ATTEMPTS, SETTLE_BATCH_SIZE)
            .await?;

        let mut issued = 0;
        for refund in unsettled {
            match self
                .gateway
                .issue_refund(&refund.session_id, &refund.client_id, refund.amount_cents)
                .await
            {
                Ok(provider_ref) => {
                    self.refund_repo
                        .mark_issued(&refund.id, &provider_ref, Utc::now())
                        .await?;
                    issued += 1;

                    if let Err(e) = self
                        .notification_service
                        .notify_refund_issued(
                            &refund.client_id,
                            &refund.session_id,
                            refund.amount_cents,
                        )
                        .await
                    {
                        tracing::warn!(
                            error = %e,
                            refund_id = %refund.id,
                            "Failed to notify client of issued refund"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        refund_id = %refund.id,
                        attempt = refund.attempt_count + 1,
                        "Refund settlement attempt failed"
                    );
                    self.refund_repo
                        .mark_failed(&refund.id, &e.to_string())
                        .await?;
                }
            }
        }

        Ok(issued)
    }

    /// Look up the refund for a session, if one exists.
    pub async fn find_by_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<peersup_db::entities::refund::Model>> {
        self.refund_repo.find_by_session(session_id).await
    }
}
