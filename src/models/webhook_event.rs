use serde::Serialize;

/// Idempotency-ledger row. Created once per unique event identity, inside
/// the same transaction as the domain mutation it guards, and never updated.
/// If the transaction rolls back the row rolls back with it, so a failed
/// attempt stays eligible for retry.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEventRecord {
    /// `"{object_id}_{event_type}"` - object ids are reused across event
    /// types, so the type is part of the identity.
    pub event_id: String,
    pub event_type: String,
    pub provider: String,
    /// Raw request body as delivered.
    pub payload: String,
    pub processed_at: i64,
}
