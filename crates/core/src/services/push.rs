//! Push delivery seam.
//!
//! Core services hand finished payloads to a [`PushDelivery`] implementation
//! without depending on the transport. The worker crate provides the
//! webhook-backed implementation; [`NoOpPush`] serves tests and deployments
//! without a push relay.

use async_trait::async_trait;
use peersup_common::AppResult;
use serde::{Deserialize, Serialize};

/// A push payload handed to the delivery transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    /// Notification type string, matching the persisted notification.
    pub notification_type: String,
    /// Short title for the device banner.
    pub title: String,
    /// Body text for the device banner.
    pub body: String,
    /// Structured payload the app deep-links from.
    pub data: serde_json::Value,
}

/// Trait for delivering push notifications to a user's devices.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    /// Deliver a payload to all devices of `recipient_id`.
    ///
    /// Delivery is best-effort: callers log failures and move on. The
    /// persisted notification row is the source of truth either way.
    async fn deliver(&self, recipient_id: &str, payload: &PushPayload) -> AppResult<()>;
}

/// A no-op implementation of `PushDelivery` for testing or when no push
/// relay is configured.
#[derive(Clone, Default)]
pub struct NoOpPush;

#[async_trait]
impl PushDelivery for NoOpPush {
    async fn deliver(&self, _recipient_id: &str, _payload: &PushPayload) -> AppResult<()> {
        Ok(())
    }
}
