//! Webhook reconciliation: applies a verified provider event to local state
//! inside a single transaction shared with the idempotency ledger.
//!
//! Commit points and rollback semantics:
//! - unrecognized event type: no transaction is opened, no ledger row exists,
//!   and the caller acknowledges with success;
//! - duplicate: the transaction commits with no state mutation;
//! - handler failure: the transaction is dropped, rolling back both the
//!   mutation and the ledger row, so a provider retry starts clean.

use rusqlite::Connection;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::queries;
use crate::error::WebhookError;
use crate::models::{
    PaymentType, SubscriptionStatus, TierCatalog, UpsertPayment, UpsertSubscription,
};

use super::events::{
    event_identity, is_payment_shape, is_subscription_shape, parse_timestamp,
    CheckoutObject, EventKind, ObjectRef, PaymentObject, SubscriptionObject, WebhookEnvelope,
    PROVIDER,
};

/// Outcome of processing one verified webhook delivery. All three variants
/// are acknowledged to the provider with success.
#[derive(Debug)]
pub enum ProcessOutcome {
    Applied { event_type: String },
    Duplicate { event_id: String },
    Ignored { event_type: String },
}

/// Process a verified webhook body end to end: parse, dedupe, reconcile.
///
/// `raw_body` must already have passed signature verification.
pub fn process_event(
    conn: &mut Connection,
    tiers: &TierCatalog,
    raw_body: &str,
) -> Result<ProcessOutcome, WebhookError> {
    let envelope: WebhookEnvelope = serde_json::from_str(raw_body)
        .map_err(|e| WebhookError::MalformedPayload(format!("envelope: {}", e)))?;

    // Unknown types are skipped before any transaction is opened, so the
    // ledger never records identities for events we do not handle.
    let Some(kind) = EventKind::parse(&envelope.event_type) else {
        info!(event_type = %envelope.event_type, "skipping unrecognized webhook event type");
        return Ok(ProcessOutcome::Ignored {
            event_type: envelope.event_type,
        });
    };

    let object_id = envelope
        .object
        .get("id")
        .and_then(Value::as_str)
        .ok_or(WebhookError::MissingRequiredField("object.id"))?;
    let event_id = event_identity(object_id, &envelope.event_type);

    let tx = conn.transaction()?;

    if queries::is_event_processed(&tx, &event_id)? {
        info!(event_id = %event_id, "duplicate webhook event, skipping");
        tx.commit()?;
        return Ok(ProcessOutcome::Duplicate { event_id });
    }

    // The ledger insert and the domain mutation share this transaction. A
    // concurrent delivery of the same identity loses the insert race here
    // and degrades to the duplicate path.
    if !queries::try_record_webhook_event(
        &tx,
        &event_id,
        &envelope.event_type,
        PROVIDER,
        raw_body,
    )? {
        info!(event_id = %event_id, "webhook event recorded concurrently, skipping");
        tx.commit()?;
        return Ok(ProcessOutcome::Duplicate { event_id });
    }

    dispatch(&tx, tiers, kind, &envelope)?;

    tx.commit()?;
    info!(event_id = %event_id, event_type = %envelope.event_type, "webhook event applied");
    Ok(ProcessOutcome::Applied {
        event_type: envelope.event_type,
    })
}

/// Route a recognized event to its reconciliation handler, guarding each
/// route with a structural probe on the nested object.
fn dispatch(
    conn: &Connection,
    tiers: &TierCatalog,
    kind: EventKind,
    envelope: &WebhookEnvelope,
) -> Result<(), WebhookError> {
    match kind {
        EventKind::CheckoutCompleted => {
            let object = parse_object::<CheckoutObject>(&envelope.object, "checkout")?;
            handle_checkout_completed(conn, tiers, &object)
        }
        EventKind::PaymentSucceeded => {
            if !is_payment_shape(&envelope.object) {
                return Err(shape_mismatch(&envelope.event_type, "payment"));
            }
            let object = parse_object::<PaymentObject>(&envelope.object, "payment")?;
            // Renewal charges arrive as payment.succeeded with a billing
            // reason marker; they advance the subscription period first.
            if object.billing_reason.as_deref() == Some("subscription_cycle") {
                handle_renewal_from_payment(conn, tiers, &object)
            } else {
                handle_payment_succeeded(conn, tiers, &object)
            }
        }
        EventKind::SubscriptionActive
        | EventKind::SubscriptionUpdated
        | EventKind::SubscriptionCanceled
        | EventKind::SubscriptionExpired
        | EventKind::SubscriptionPastDue => {
            if !is_subscription_shape(&envelope.object) {
                return Err(shape_mismatch(&envelope.event_type, "subscription"));
            }
            let object = parse_object::<SubscriptionObject>(&envelope.object, "subscription")?;
            handle_subscription_lifecycle(conn, tiers, &object)
        }
        EventKind::SubscriptionPaid => {
            // Some provider API versions emit the renewal as a paid invoice,
            // others as the subscription object itself.
            if is_payment_shape(&envelope.object) {
                let object = parse_object::<PaymentObject>(&envelope.object, "payment")?;
                handle_renewal_from_payment(conn, tiers, &object)
            } else if is_subscription_shape(&envelope.object) {
                let object =
                    parse_object::<SubscriptionObject>(&envelope.object, "subscription")?;
                handle_renewal_from_subscription(conn, tiers, &object)
            } else {
                Err(shape_mismatch(&envelope.event_type, "payment or subscription"))
            }
        }
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(
    object: &Value,
    expected: &str,
) -> Result<T, WebhookError> {
    serde_json::from_value(object.clone())
        .map_err(|e| WebhookError::MalformedPayload(format!("{} object: {}", expected, e)))
}

fn shape_mismatch(event_type: &str, expected: &str) -> WebhookError {
    WebhookError::MalformedPayload(format!(
        "event {} does not carry a {} object",
        event_type, expected
    ))
}

fn extract_customer_id(customer: Option<&ObjectRef>) -> Result<String, WebhookError> {
    customer
        .map(|c| c.id().to_string())
        .ok_or(WebhookError::MissingRequiredField("customer"))
}

// ============ checkout.completed ============

/// The checkout event is the only place the user<->customer binding is
/// created; every other handler requires it to already exist.
fn handle_checkout_completed(
    conn: &Connection,
    tiers: &TierCatalog,
    object: &CheckoutObject,
) -> Result<(), WebhookError> {
    let customer_id = extract_customer_id(object.customer.as_ref())?;
    let order = object
        .order
        .as_ref()
        .ok_or(WebhookError::MissingRequiredField("order"))?;
    let metadata = object.metadata.clone().unwrap_or_default();
    let user_id = metadata
        .user_id
        .clone()
        .ok_or(WebhookError::MissingRequiredField("metadata.userId"))?;

    if !queries::set_user_customer_id(conn, &user_id, &customer_id)? {
        return Err(WebhookError::UserNotFound(user_id));
    }

    match metadata.payment_mode.as_deref() {
        Some("subscription") => {
            let subscription = object
                .subscription
                .as_ref()
                .ok_or(WebhookError::MissingRequiredField("subscription"))?;
            let (subscription_id, product_id) = match subscription.as_str() {
                // Bare id reference: record the subscription as active with
                // unknown periods until the first lifecycle event fills
                // them in.
                Some(id) => {
                    // tierId in the metadata is already an internal tier id.
                    let product_id = metadata
                        .tier_id
                        .clone()
                        .unwrap_or_else(|| order.transaction.clone());
                    queries::upsert_subscription(
                        conn,
                        &UpsertSubscription {
                            subscription_id: id.to_string(),
                            user_id: user_id.clone(),
                            customer_id: customer_id.clone(),
                            product_id: product_id.clone(),
                            status: SubscriptionStatus::Active,
                            current_period_start: None,
                            current_period_end: None,
                            canceled_at: None,
                        },
                    )?;
                    (id.to_string(), product_id)
                }
                None => {
                    let embedded: SubscriptionObject = parse_object(subscription, "subscription")?;
                    let upsert =
                        subscription_from_object(&embedded, &user_id, &customer_id, tiers)?;
                    queries::upsert_subscription(conn, &upsert)?;
                    (upsert.subscription_id, upsert.product_id)
                }
            };
            queries::upsert_payment(
                conn,
                &UpsertPayment {
                    payment_id: order.transaction.clone(),
                    user_id,
                    customer_id,
                    subscription_id: Some(subscription_id),
                    product_id,
                    amount: order.amount_due,
                    currency: order.currency.clone(),
                    status: "succeeded".to_string(),
                    payment_type: PaymentType::Subscription,
                },
            )?;
            Ok(())
        }
        Some("one_time") => {
            let product_id = metadata
                .tier_id
                .clone()
                .unwrap_or_else(|| order.transaction.clone());
            queries::upsert_payment(
                conn,
                &UpsertPayment {
                    payment_id: order.transaction.clone(),
                    user_id,
                    customer_id,
                    subscription_id: None,
                    product_id,
                    amount: order.amount_due,
                    currency: order.currency.clone(),
                    status: "succeeded".to_string(),
                    payment_type: PaymentType::OneTime,
                },
            )?;
            Ok(())
        }
        Some(other) => Err(WebhookError::UnsupportedPaymentMode(other.to_string())),
        None => Err(WebhookError::MissingRequiredField("metadata.paymentMode")),
    }
}

// ============ Subscription lifecycle ============

fn subscription_from_object(
    object: &SubscriptionObject,
    user_id: &str,
    customer_id: &str,
    tiers: &TierCatalog,
) -> Result<UpsertSubscription, WebhookError> {
    let status: SubscriptionStatus = object
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or(WebhookError::MissingRequiredField("status"))?;
    let raw_product = object
        .product
        .as_ref()
        .map(|p| p.id().to_string())
        .ok_or(WebhookError::MissingRequiredField("product"))?;

    Ok(UpsertSubscription {
        subscription_id: object.id.clone(),
        user_id: user_id.to_string(),
        customer_id: customer_id.to_string(),
        product_id: tiers.resolve_or_raw(&raw_product),
        status,
        current_period_start: object
            .current_period_start_date
            .as_ref()
            .and_then(parse_timestamp),
        current_period_end: object
            .current_period_end_date
            .as_ref()
            .and_then(parse_timestamp),
        canceled_at: object.canceled_at.as_ref().and_then(parse_timestamp),
    })
}

/// All lifecycle transitions converge on one full-overwrite upsert; the
/// incoming event's values win unconditionally.
fn handle_subscription_lifecycle(
    conn: &Connection,
    tiers: &TierCatalog,
    object: &SubscriptionObject,
) -> Result<(), WebhookError> {
    let customer_id = extract_customer_id(object.customer.as_ref())?;
    let user = queries::find_user_by_customer_id(conn, &customer_id)?
        .ok_or_else(|| WebhookError::UserNotFound(customer_id.clone()))?;

    let upsert = subscription_from_object(object, &user.id, &customer_id, tiers)?;
    info!(
        subscription_id = %upsert.subscription_id,
        status = %upsert.status,
        "applying subscription lifecycle event"
    );
    queries::upsert_subscription(conn, &upsert)?;
    Ok(())
}

// ============ Renewal ============

fn line_item_period(object: &PaymentObject) -> Option<(i64, i64)> {
    object
        .lines
        .as_ref()
        .and_then(|lines| lines.data.first())
        .and_then(|line| line.period)
        .map(|p| (p.start, p.end))
}

fn first_line_product(object: &PaymentObject) -> Option<String> {
    object
        .lines
        .as_ref()
        .and_then(|lines| lines.data.iter().find_map(|line| line.product_id.clone()))
}

/// Advance the subscription's billing period and force it active. When no
/// row exists yet (renewal raced ahead of checkout) a fresh active row is
/// created, which requires the customer binding to already resolve.
fn advance_subscription(
    conn: &Connection,
    tiers: &TierCatalog,
    subscription_id: &str,
    customer: Option<&ObjectRef>,
    product_hint: Option<&str>,
    period_start: i64,
    period_end: i64,
) -> Result<(), WebhookError> {
    if queries::renew_subscription(conn, subscription_id, period_start, period_end)? {
        info!(subscription_id = %subscription_id, "advanced subscription billing period");
        return Ok(());
    }

    warn!(
        subscription_id = %subscription_id,
        "renewal for unseen subscription, creating row"
    );
    let customer_id = extract_customer_id(customer)?;
    let user = queries::find_user_by_customer_id(conn, &customer_id)?
        .ok_or_else(|| WebhookError::UserNotFound(customer_id.clone()))?;
    let raw_product = product_hint.ok_or(WebhookError::MissingRequiredField("product_id"))?;

    queries::upsert_subscription(
        conn,
        &UpsertSubscription {
            subscription_id: subscription_id.to_string(),
            user_id: user.id,
            customer_id,
            product_id: tiers.resolve_or_raw(raw_product),
            status: SubscriptionStatus::Active,
            current_period_start: Some(period_start),
            current_period_end: Some(period_end),
            canceled_at: None,
        },
    )?;
    Ok(())
}

fn handle_renewal_from_payment(
    conn: &Connection,
    tiers: &TierCatalog,
    object: &PaymentObject,
) -> Result<(), WebhookError> {
    let subscription_id = object
        .subscription_id
        .clone()
        .or_else(|| object.subscription.as_ref().map(|r| r.id().to_string()))
        .unwrap_or_else(|| object.id.clone());
    let (start, end) = line_item_period(object).ok_or(WebhookError::UnresolvablePeriod)?;
    let product_hint = object.product_id.clone().or_else(|| first_line_product(object));

    advance_subscription(
        conn,
        tiers,
        &subscription_id,
        object.customer.as_ref(),
        product_hint.as_deref(),
        start,
        end,
    )?;

    // The triggering event is itself a payment, so the charge is recorded
    // alongside the period advance.
    handle_payment_succeeded(conn, tiers, object)
}

fn handle_renewal_from_subscription(
    conn: &Connection,
    tiers: &TierCatalog,
    object: &SubscriptionObject,
) -> Result<(), WebhookError> {
    let start = object
        .current_period_start_date
        .as_ref()
        .and_then(parse_timestamp);
    let end = object
        .current_period_end_date
        .as_ref()
        .and_then(parse_timestamp);
    let (Some(start), Some(end)) = (start, end) else {
        return Err(WebhookError::UnresolvablePeriod);
    };
    let product_hint = object.product.as_ref().map(|p| p.id().to_string());

    advance_subscription(
        conn,
        tiers,
        &object.id,
        object.customer.as_ref(),
        product_hint.as_deref(),
        start,
        end,
    )
}

// ============ payment.succeeded ============

fn handle_payment_succeeded(
    conn: &Connection,
    tiers: &TierCatalog,
    object: &PaymentObject,
) -> Result<(), WebhookError> {
    let customer_id = extract_customer_id(object.customer.as_ref())?;
    let user = queries::find_user_by_customer_id(conn, &customer_id)?
        .ok_or_else(|| WebhookError::UserNotFound(customer_id.clone()))?;

    let raw_product = object
        .product_id
        .clone()
        .or_else(|| first_line_product(object))
        .ok_or(WebhookError::MissingRequiredField("product_id"))?;
    let amount = object
        .amount
        .or(object.amount_paid)
        .ok_or(WebhookError::MissingRequiredField("amount"))?;
    let currency = object
        .currency
        .clone()
        .ok_or(WebhookError::MissingRequiredField("currency"))?;
    let metadata = object.metadata.clone().unwrap_or_default();
    let payment_type = metadata
        .payment_mode
        .as_deref()
        .and_then(|m| m.parse().ok())
        .unwrap_or(PaymentType::Subscription);
    let subscription_id = object
        .subscription_id
        .clone()
        .or_else(|| object.subscription.as_ref().map(|r| r.id().to_string()));

    queries::upsert_payment(
        conn,
        &UpsertPayment {
            payment_id: object.id.clone(),
            user_id: user.id,
            customer_id,
            subscription_id,
            product_id: tiers.resolve_or_raw(&raw_product),
            amount,
            currency,
            status: "succeeded".to_string(),
            payment_type,
        },
    )?;
    Ok(())
}
