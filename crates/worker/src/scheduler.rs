//! Scheduled jobs for periodic workflow maintenance.
//!
//! The reschedule workflow's passive transitions (expiry, auto-cancel,
//! refund settlement) are enforced by polling sweeps. Each job runs on its
//! own tokio interval; a failed tick is logged and the next tick proceeds.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use peersup_common::config::SchedulerSettings;
use tokio::time::interval;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between reschedule-deadline sweeps (default: 30 seconds).
    pub reschedule_sweep_interval: Duration,
    /// Interval between refund settlement runs (default: 1 minute).
    pub refund_process_interval: Duration,
    /// Retention period for terminal reschedule requests in days.
    pub request_retention_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reschedule_sweep_interval: Duration::from_secs(30),
            refund_process_interval: Duration::from_secs(60),
            request_retention_days: 90,
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            reschedule_sweep_interval: Duration::from_secs(settings.reschedule_sweep_seconds),
            refund_process_interval: Duration::from_secs(settings.refund_process_seconds),
            request_retention_days: settings.request_retention_days,
        }
    }
}

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Settle pending reschedule requests past their response deadline.
    async fn process_expired_reschedules(
        &self,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    /// Settle recorded refunds with the payment provider.
    async fn process_unsettled_refunds(
        &self,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    /// Prune terminal reschedule requests past the retention period.
    async fn cleanup_old_requests(
        &self,
        retention_days: u32,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Run the scheduler with the given configuration and executor.
pub async fn run_scheduler<E: JobExecutor + 'static>(config: SchedulerConfig, executor: Arc<E>) {
    let executor_sweep = executor.clone();
    let executor_refund = executor.clone();
    let executor_cleanup = executor;

    let sweep_interval = config.reschedule_sweep_interval;
    let refund_interval = config.refund_process_interval;
    let retention_days = config.request_retention_days;

    // Spawn deadline sweep task
    tokio::spawn(async move {
        let mut interval = interval(sweep_interval);
        loop {
            interval.tick().await;
            match executor_sweep.process_expired_reschedules().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Settled expired reschedule requests");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to sweep expired reschedule requests");
                }
            }
        }
    });

    // Spawn refund settlement task
    tokio::spawn(async move {
        let mut interval = interval(refund_interval);
        loop {
            interval.tick().await;
            match executor_refund.process_unsettled_refunds().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Settled refunds");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to process unsettled refunds");
                }
            }
        }
    });

    // Spawn cleanup task (daily)
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(86400));
        loop {
            interval.tick().await;
            match executor_cleanup.cleanup_old_requests(retention_days).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(
                            count,
                            retention_days,
                            "Cleaned up old reschedule requests"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to cleanup old reschedule requests");
                }
            }
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.reschedule_sweep_interval, Duration::from_secs(30));
        assert_eq!(config.refund_process_interval, Duration::from_secs(60));
        assert_eq!(config.request_retention_days, 90);
    }

    #[test]
    fn test_scheduler_config_from_settings() {
        let settings = SchedulerSettings {
            reschedule_sweep_seconds: 10,
            refund_process_seconds: 120,
            request_retention_days: 30,
        };
        let config = SchedulerConfig::from(&settings);
        assert_eq!(config.reschedule_sweep_interval, Duration::from_secs(10));
        assert_eq!(config.refund_process_interval, Duration::from_secs(120));
        assert_eq!(config.request_retention_days, 30);
    }
}
