//! Wire types for provider webhook payloads.
//!
//! The envelope carries a declared `eventType` plus an untyped `object`;
//! objects are deserialized into a typed variant per event type, with
//! structural field-presence probes guarding the dispatch where the wire
//! format lacks a discriminant on the nested object itself.

use serde::Deserialize;
use serde_json::Value;

pub const PROVIDER: &str = "creem";

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub object: Value,
}

/// Closed set of recognized event types. Anything else is skipped, not an
/// error - providers add new types over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted,
    PaymentSucceeded,
    SubscriptionActive,
    SubscriptionUpdated,
    SubscriptionCanceled,
    SubscriptionExpired,
    SubscriptionPastDue,
    SubscriptionPaid,
}

impl EventKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "checkout.completed" => Some(Self::CheckoutCompleted),
            "payment.succeeded" => Some(Self::PaymentSucceeded),
            "subscription.active" => Some(Self::SubscriptionActive),
            "subscription.updated" => Some(Self::SubscriptionUpdated),
            "subscription.canceled" => Some(Self::SubscriptionCanceled),
            "subscription.expired" => Some(Self::SubscriptionExpired),
            "subscription.past_due" => Some(Self::SubscriptionPastDue),
            "subscription.paid" => Some(Self::SubscriptionPaid),
            _ => None,
        }
    }
}

/// Event identity for deduplication. Object ids are reused across distinct
/// event types (the same subscription appears in `subscription.updated` and
/// `subscription.canceled`), so the type must be part of the identity or
/// legitimate transitions would be suppressed as duplicates.
pub fn event_identity(object_id: &str, event_type: &str) -> String {
    format!("{}_{}", object_id, event_type)
}

/// The provider represents references either as a bare string id or as an
/// object with an `id` field; both shapes must resolve uniformly.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(String),
    Object { id: String },
}

impl ObjectRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Object { id } => id,
        }
    }
}

/// Metadata bag attached by our own checkout creation. Keys are validated at
/// the point of use, not trusted blindly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMetadata {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "paymentMode")]
    pub payment_mode: Option<String>,
    #[serde(rename = "tierId")]
    pub tier_id: Option<String>,
    #[serde(rename = "billingCycle")]
    pub billing_cycle: Option<String>,
    #[serde(rename = "cancelUrl")]
    pub cancel_url: Option<String>,
    #[serde(rename = "failureUrl")]
    pub failure_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutObject {
    pub id: String,
    pub customer: Option<ObjectRef>,
    pub order: Option<OrderObject>,
    /// Embedded subscription object, or a bare id, for subscription-mode
    /// checkouts.
    pub subscription: Option<Value>,
    pub metadata: Option<EventMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderObject {
    pub transaction: String,
    pub amount_due: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: Option<ObjectRef>,
    pub product: Option<ObjectRef>,
    pub status: Option<String>,
    /// Unix seconds or RFC 3339, depending on provider API version.
    pub current_period_start_date: Option<Value>,
    pub current_period_end_date: Option<Value>,
    pub canceled_at: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentObject {
    pub id: String,
    pub customer: Option<ObjectRef>,
    pub amount: Option<i64>,
    pub amount_paid: Option<i64>,
    pub currency: Option<String>,
    pub subscription_id: Option<String>,
    pub subscription: Option<ObjectRef>,
    pub product_id: Option<String>,
    pub billing_reason: Option<String>,
    pub lines: Option<LineCollection>,
    pub metadata: Option<EventMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineCollection {
    #[serde(default)]
    pub data: Vec<LineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub period: Option<LinePeriod>,
    pub product_id: Option<String>,
}

/// Billing period bounds in unix seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LinePeriod {
    pub start: i64,
    pub end: i64,
}

// ============ Structural shape probes ============
//
// The nested object carries no discriminant of its own, so dispatch is
// guarded by field presence.

pub fn is_checkout_shape(object: &Value) -> bool {
    object.get("order").is_some()
}

pub fn is_subscription_shape(object: &Value) -> bool {
    object.get("current_period_end_date").is_some()
}

pub fn is_payment_shape(object: &Value) -> bool {
    object.get("amount").is_some() || object.get("amount_paid").is_some()
}

/// Normalize a provider timestamp: unix seconds as a number, or an RFC 3339
/// string.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_str()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_includes_event_type() {
        assert_eq!(
            event_identity("sub_1", "subscription.updated"),
            "sub_1_subscription.updated"
        );
        assert_ne!(
            event_identity("sub_1", "subscription.updated"),
            event_identity("sub_1", "subscription.canceled")
        );
    }

    #[test]
    fn object_ref_handles_both_shapes() {
        let bare: ObjectRef = serde_json::from_value(json!("cus_123")).unwrap();
        let object: ObjectRef = serde_json::from_value(json!({"id": "cus_123"})).unwrap();
        assert_eq!(bare.id(), "cus_123");
        assert_eq!(object.id(), "cus_123");
    }

    #[test]
    fn probes_discriminate_shapes() {
        let checkout = json!({"id": "ch_1", "order": {"transaction": "ord_1"}});
        let subscription = json!({"id": "sub_1", "current_period_end_date": 1700000000});
        let payment = json!({"id": "pay_1", "amount": 999});
        let paid_invoice = json!({"id": "in_1", "amount_paid": 999});

        assert!(is_checkout_shape(&checkout));
        assert!(!is_checkout_shape(&payment));

        assert!(is_subscription_shape(&subscription));
        assert!(!is_subscription_shape(&checkout));

        assert!(is_payment_shape(&payment));
        assert!(is_payment_shape(&paid_invoice));
        assert!(!is_payment_shape(&subscription));
    }

    #[test]
    fn timestamps_parse_from_unix_and_rfc3339() {
        assert_eq!(parse_timestamp(&json!(1700000000)), Some(1700000000));
        assert_eq!(
            parse_timestamp(&json!("2023-11-14T22:13:20Z")),
            Some(1700000000)
        );
        assert_eq!(parse_timestamp(&json!("not a date")), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
    }

    #[test]
    fn metadata_uses_camel_case_keys() {
        let meta: EventMetadata = serde_json::from_value(json!({
            "userId": "u1",
            "paymentMode": "one_time",
            "tierId": "basic",
        }))
        .unwrap();
        assert_eq!(meta.user_id.as_deref(), Some("u1"));
        assert_eq!(meta.payment_mode.as_deref(), Some("one_time"));
        assert_eq!(meta.tier_id.as_deref(), Some("basic"));
        assert!(meta.billing_cycle.is_none());
    }

    #[test]
    fn unrecognized_event_type_is_none() {
        assert!(EventKind::parse("subscription.trialing_ended").is_none());
        assert!(EventKind::parse("checkout.completed").is_some());
    }
}
