use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::db::AppState;
use crate::error::WebhookError;
use crate::payments::verify_webhook_signature;

use super::reconcile::{process_event, ProcessOutcome};

pub const SIGNATURE_HEADER: &str = "creem-signature";

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Inbound webhook endpoint. The body is taken as raw bytes so the signature
/// is verified over the exact bytes the provider signed; JSON parsing happens
/// only after verification succeeds.
pub async fn handle_creem_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or(WebhookError::ConfigurationMissing)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::SignatureInvalid)?;

    if !verify_webhook_signature(secret, &body, signature) {
        warn!("webhook rejected: signature verification failed");
        return Err(WebhookError::SignatureInvalid);
    }

    let raw_body = std::str::from_utf8(&body)
        .map_err(|e| WebhookError::MalformedPayload(format!("body is not utf-8: {}", e)))?;

    let mut conn = state.db.get()?;
    let outcome = process_event(&mut conn, &state.tiers, raw_body)?;

    let message = match outcome {
        ProcessOutcome::Applied { .. } => None,
        ProcessOutcome::Duplicate { .. } => Some("duplicate event".to_string()),
        ProcessOutcome::Ignored { event_type } => {
            Some(format!("unhandled event type: {}", event_type))
        }
    };
    Ok(Json(WebhookAck {
        received: true,
        message,
    }))
}
