//! Signature verification and idempotency ledger behavior.

mod common;

use paysync::db::queries;
use paysync::error::WebhookError;
use paysync::handlers::webhooks::{process_event, ProcessOutcome};
use paysync::models::TierCatalog;
use paysync::payments::verify_webhook_signature;

use common::*;

const SECRET: &str = "whsec_test_secret";

// ============ Signature verification ============

#[test]
fn accepts_valid_signature() {
    let payload = br#"{"eventType":"checkout.completed","object":{}}"#;
    let signature = sign(SECRET, payload);
    assert!(verify_webhook_signature(SECRET, payload, &signature));
}

#[test]
fn rejects_tampered_payload() {
    let payload = br#"{"eventType":"checkout.completed","object":{}}"#;
    let signature = sign(SECRET, payload);
    let tampered = br#"{"eventType":"checkout.completed","object":{"id":"x"}}"#;
    assert!(!verify_webhook_signature(SECRET, tampered, &signature));
}

#[test]
fn rejects_wrong_secret() {
    let payload = br#"{"eventType":"checkout.completed","object":{}}"#;
    let signature = sign("whsec_other", payload);
    assert!(!verify_webhook_signature(SECRET, payload, &signature));
}

#[test]
fn rejects_wrong_length_signature() {
    let payload = b"payload";
    assert!(!verify_webhook_signature(SECRET, payload, "deadbeef"));
    assert!(!verify_webhook_signature(SECRET, payload, ""));
}

// ============ Idempotency ============

#[test]
fn duplicate_delivery_is_a_no_op() {
    let mut conn = setup_test_db();
    let tiers = TierCatalog::builtin();
    create_test_user(&conn, "u1", "u1@example.com");

    let body = checkout_one_time_event("u1").to_string();

    let first = process_event(&mut conn, &tiers, &body).unwrap();
    assert!(matches!(first, ProcessOutcome::Applied { .. }));

    let second = process_event(&mut conn, &tiers, &body).unwrap();
    assert!(matches!(second, ProcessOutcome::Duplicate { .. }));

    assert_eq!(count_rows(&conn, "payments"), 1);
    assert_eq!(count_rows(&conn, "webhook_events"), 1);

    let record = queries::get_webhook_event(&conn, "ch_1_checkout.completed")
        .unwrap()
        .unwrap();
    assert_eq!(record.event_type, "checkout.completed");
    assert_eq!(record.provider, "creem");
    assert_eq!(record.payload, body);
}

#[test]
fn same_object_different_event_types_both_apply() {
    let mut conn = setup_test_db();
    let tiers = TierCatalog::builtin();
    let user = create_test_user(&conn, "u1", "u1@example.com");
    queries::set_user_customer_id(&conn, &user.id, "cus_1").unwrap();

    let updated = subscription_lifecycle_event("subscription.updated", "sub_1", "active");
    let canceled = subscription_lifecycle_event("subscription.canceled", "sub_1", "canceled");

    let first = process_event(&mut conn, &tiers, &updated.to_string()).unwrap();
    assert!(matches!(first, ProcessOutcome::Applied { .. }));

    // Same object id, different event type: a distinct identity, not a dup.
    let second = process_event(&mut conn, &tiers, &canceled.to_string()).unwrap();
    assert!(matches!(second, ProcessOutcome::Applied { .. }));

    let third = process_event(&mut conn, &tiers, &canceled.to_string()).unwrap();
    assert!(matches!(third, ProcessOutcome::Duplicate { .. }));

    assert_eq!(count_rows(&conn, "webhook_events"), 2);
    let sub = queries::get_subscription(&conn, "sub_1").unwrap().unwrap();
    assert_eq!(sub.status.as_str(), "canceled");
}

#[test]
fn unrecognized_event_type_leaves_no_ledger_row() {
    let mut conn = setup_test_db();
    let tiers = TierCatalog::builtin();

    let body = serde_json::json!({
        "eventType": "subscription.trialing_ended",
        "object": {"id": "sub_1"}
    })
    .to_string();

    let outcome = process_event(&mut conn, &tiers, &body).unwrap();
    assert!(matches!(outcome, ProcessOutcome::Ignored { .. }));
    assert_eq!(count_rows(&conn, "webhook_events"), 0);
}

// ============ Transactional rollback ============

#[test]
fn failed_event_rolls_back_ledger_and_retry_succeeds() {
    let mut conn = setup_test_db();
    let tiers = TierCatalog::builtin();

    let body = checkout_one_time_event("u1").to_string();

    // No such user yet: the handler fails and the ledger row must roll back
    // with it, otherwise the provider's retry would be swallowed as a dup.
    let err = process_event(&mut conn, &tiers, &body).unwrap_err();
    assert!(matches!(err, WebhookError::UserNotFound(_)));
    assert_eq!(count_rows(&conn, "webhook_events"), 0);
    assert_eq!(count_rows(&conn, "payments"), 0);

    create_test_user(&conn, "u1", "u1@example.com");

    let outcome = process_event(&mut conn, &tiers, &body).unwrap();
    assert!(matches!(outcome, ProcessOutcome::Applied { .. }));
    assert_eq!(count_rows(&conn, "webhook_events"), 1);
    assert_eq!(count_rows(&conn, "payments"), 1);
}

#[test]
fn malformed_envelope_is_an_error() {
    let mut conn = setup_test_db();
    let tiers = TierCatalog::builtin();

    let err = process_event(&mut conn, &tiers, "not json at all").unwrap_err();
    assert!(matches!(err, WebhookError::MalformedPayload(_)));

    // Valid JSON but missing the object id.
    let body = serde_json::json!({
        "eventType": "checkout.completed",
        "object": {"order": {"transaction": "ord_1", "amount_due": 1, "currency": "usd"}}
    })
    .to_string();
    let err = process_event(&mut conn, &tiers, &body).unwrap_err();
    assert!(matches!(
        err,
        WebhookError::MissingRequiredField("object.id")
    ));
    assert_eq!(count_rows(&conn, "webhook_events"), 0);
}

#[test]
fn shape_mismatch_is_rejected() {
    let mut conn = setup_test_db();
    let tiers = TierCatalog::builtin();
    let user = create_test_user(&conn, "u1", "u1@example.com");
    queries::set_user_customer_id(&conn, &user.id, "cus_1").unwrap();

    // Declared subscription.updated but carries no subscription fields.
    let body = serde_json::json!({
        "eventType": "subscription.updated",
        "object": {"id": "sub_1", "amount": 999}
    })
    .to_string();

    let err = process_event(&mut conn, &tiers, &body).unwrap_err();
    assert!(matches!(err, WebhookError::MalformedPayload(_)));
    assert_eq!(count_rows(&conn, "webhook_events"), 0);
}
