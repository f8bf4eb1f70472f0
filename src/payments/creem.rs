use std::{future::Future, pin::Pin};

use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

use super::BillingApi;

type HmacSha256 = Hmac<Sha256>;

/// Verify a webhook signature: HMAC-SHA256 over the raw request body,
/// hex-encoded. The body must be the exact bytes the provider signed -
/// re-serializing parsed JSON can change byte layout and break the digest.
///
/// Neither the secret nor the computed digest is ever logged.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks. The length check
    // is not constant-time, but signature length is not secret (always 64
    // hex chars for SHA-256).
    let expected_bytes = expected.as_bytes();
    let provided_bytes = signature.as_bytes();

    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(provided_bytes).into()
}

/// Client for the provider's REST API.
#[derive(Debug, Clone)]
pub struct CreemClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CreemClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn do_cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        let url = format!("{}/subscriptions/{}/cancel", self.base_url, subscription_id);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Creem API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Creem API error ({}): {}",
                status, error_text
            )));
        }

        Ok(())
    }
}

impl BillingApi for CreemClient {
    fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let subscription_id = subscription_id.to_string();
        Box::pin(async move { self.do_cancel_subscription(&subscription_id).await })
    }
}
