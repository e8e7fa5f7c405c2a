//! Scheduler job executor wired to the core services.

use peersup_core::{RefundService, RescheduleService};

use crate::scheduler::JobExecutor;

/// Executes scheduled workflow jobs against the core services.
#[derive(Clone)]
pub struct WorkflowExecutor {
    reschedule_service: RescheduleService,
    refund_service: RefundService,
}

impl WorkflowExecutor {
    /// Create a new workflow executor.
    #[must_use]
    pub const fn new(
        reschedule_service: RescheduleService,
        refund_service: RefundService,
    ) -> Self {
        Self {
            reschedule_service,
            refund_service,
        }
    }
}

#[async_trait::async_trait]
impl JobExecutor for WorkflowExecutor {
    async fn process_expired_reschedules(
        &self,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.reschedule_service.process_expired().await?)
    }

    async fn process_unsettled_refunds(
        &self,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.refund_service.process_unsettled().await?)
    }

    async fn cleanup_old_requests(
        &self,
        retention_days: u32,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .reschedule_service
            .cleanup_old_requests(retention_days)
            .await?)
    }
}
