//! Webhook-backed push delivery.
//!
//! Posts signed payloads to the configured push relay (the service that
//! fans out to the mobile apps). Payloads are signed with HMAC-SHA256 over
//! the request body so the relay can verify origin.

use async_trait::async_trait;
use chrono::Utc;
use peersup_common::{AppError, AppResult};
use peersup_core::{PushDelivery, PushPayload};
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;

/// Envelope posted to the push relay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushEnvelope<'a> {
    recipient_id: &'a str,
    timestamp: String,
    #[serde(flatten)]
    payload: &'a PushPayload,
}

/// Webhook-backed implementation of [`PushDelivery`].
#[derive(Clone)]
pub struct WebhookPush {
    http_client: Arc<reqwest::Client>,
    url: String,
    secret: String,
}

impl WebhookPush {
    /// Create a new webhook push transport.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(url: String, secret: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client: Arc::new(http_client),
            url,
            secret,
        }
    }

    /// Sign a payload with HMAC-SHA256.
    fn sign_payload(&self, payload: &str) -> String {
        use hmac::{Hmac, Mac};

        type HmacSha256 = Hmac<Sha256>;

        #[allow(clippy::expect_used)] // HMAC accepts keys of any size
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl PushDelivery for WebhookPush {
    async fn deliver(&self, recipient_id: &str, payload: &PushPayload) -> AppResult<()> {
        let envelope = PushEnvelope {
            recipient_id,
            timestamp: Utc::now().to_rfc3339(),
            payload,
        };
        let body = serde_json::to_string(&envelope)
            .map_err(|e| AppError::Internal(format!("Failed to serialize push payload: {e}")))?;
        let signature = self.sign_payload(&body);

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Peersup-Signature", &signature)
            .header("User-Agent", "Peersup-Push/1.0")
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Request failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::ExternalService(format!(
                "HTTP {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_payload_is_deterministic() {
        let push = WebhookPush::new("https://relay.example".to_string(), "secret".to_string());
        let a = push.sign_payload("{\"hello\":\"world\"}");
        let b = push.sign_payload("{\"hello\":\"world\"}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // SHA-256 hex digest
    }

    #[test]
    fn test_sign_payload_varies_with_secret() {
        let push_a = WebhookPush::new("https://relay.example".to_string(), "one".to_string());
        let push_b = WebhookPush::new("https://relay.example".to_string(), "two".to_string());
        assert_ne!(push_a.sign_payload("body"), push_b.sign_payload("body"));
    }
}
