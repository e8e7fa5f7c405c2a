//! Payment gateway seam.
//!
//! Refund settlement is delegated to an external payment provider. The trait
//! keeps core logic independent of the provider SDK; deployments wire in a
//! real adapter, tests and development use [`NoOpGateway`].

use async_trait::async_trait;
use peersup_common::AppResult;

/// Trait for settling refunds with the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Issue a full refund to the client for a cancelled session.
    ///
    /// Returns the provider's receipt reference on success.
    async fn issue_refund(
        &self,
        session_id: &str,
        client_id: &str,
        amount_cents: i64,
    ) -> AppResult<String>;
}

/// A no-op implementation of `PaymentGateway` for testing or development.
#[derive(Clone, Default)]
pub struct NoOpGateway;

#[async_trait]
impl PaymentGateway for NoOpGateway {
    async fn issue_refund(
        &self,
        session_id: &str,
        _client_id: &str,
        _amount_cents: i64,
    ) -> AppResult<String> {
        Ok(format!("noop-refund-{session_id}"))
    }
}
