use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    query_one, PAYMENT_COLS, SUBSCRIPTION_COLS, USER_COLS, WEBHOOK_EVENT_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let ts = now();
    conn.execute(
        "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, input.email, input.name, ts, ts],
    )?;
    Ok(User {
        id,
        email: input.email.clone(),
        name: input.name.clone(),
        creem_customer_id: None,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

/// Customer resolver: the only path from a provider customer id to an
/// internal user once the binding exists. No caching, no fallback.
pub fn find_user_by_customer_id(conn: &Connection, customer_id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE creem_customer_id = ?1", USER_COLS),
        &[&customer_id],
    )
}

/// Persist the user<->customer binding established by checkout completion.
/// Returns false when no such user row exists.
pub fn set_user_customer_id(conn: &Connection, user_id: &str, customer_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET creem_customer_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![customer_id, now(), user_id],
    )?;
    Ok(affected > 0)
}

// ============ Idempotency ledger ============

pub fn is_event_processed(conn: &Connection, event_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM webhook_events WHERE event_id = ?1",
        params![event_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Record an event identity in the ledger. Relies on the PRIMARY KEY
/// constraint: returns false when a concurrent delivery already inserted the
/// row, so the loser of the race degrades to the duplicate no-op path.
pub fn try_record_webhook_event(
    conn: &Connection,
    event_id: &str,
    event_type: &str,
    provider: &str,
    payload: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (event_id, event_type, provider, payload, processed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![event_id, event_type, provider, payload, now()],
    )?;
    Ok(affected > 0)
}

pub fn get_webhook_event(conn: &Connection, event_id: &str) -> Result<Option<WebhookEventRecord>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM webhook_events WHERE event_id = ?1",
            WEBHOOK_EVENT_COLS
        ),
        &[&event_id],
    )
}

pub fn purge_old_webhook_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - retention_days * 86400;
    let deleted = conn.execute(
        "DELETE FROM webhook_events WHERE processed_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

// ============ Subscriptions ============

/// Upsert a subscription row. Mutable fields are overwritten wholesale with
/// the incoming event's values (last-write-wins).
pub fn upsert_subscription(conn: &Connection, input: &UpsertSubscription) -> Result<()> {
    let ts = now();
    conn.execute(
        "INSERT INTO subscriptions (subscription_id, user_id, customer_id, product_id, status, \
             current_period_start, current_period_end, canceled_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
         ON CONFLICT(subscription_id) DO UPDATE SET \
             user_id = excluded.user_id, \
             customer_id = excluded.customer_id, \
             product_id = excluded.product_id, \
             status = excluded.status, \
             current_period_start = excluded.current_period_start, \
             current_period_end = excluded.current_period_end, \
             canceled_at = excluded.canceled_at, \
             updated_at = excluded.updated_at",
        params![
            input.subscription_id,
            input.user_id,
            input.customer_id,
            input.product_id,
            input.status.as_str(),
            input.current_period_start,
            input.current_period_end,
            input.canceled_at,
            ts,
        ],
    )?;
    Ok(())
}

pub fn get_subscription(conn: &Connection, subscription_id: &str) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM subscriptions WHERE subscription_id = ?1",
            SUBSCRIPTION_COLS
        ),
        &[&subscription_id],
    )
}

/// Advance an existing subscription's billing period and force it active.
/// Returns false when no row exists yet (renewal arrived before checkout).
pub fn renew_subscription(
    conn: &Connection,
    subscription_id: &str,
    period_start: i64,
    period_end: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE subscriptions SET status = 'active', current_period_start = ?1, \
             current_period_end = ?2, updated_at = ?3 \
         WHERE subscription_id = ?4",
        params![period_start, period_end, now(), subscription_id],
    )?;
    Ok(affected > 0)
}

/// Local status transition for the admin cancel action. The provider's own
/// `subscription.canceled` webhook will land afterwards and overwrite the
/// same fields (last-write-wins either way).
pub fn mark_subscription_canceled(
    conn: &Connection,
    subscription_id: &str,
    canceled_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE subscriptions SET status = 'canceled', canceled_at = ?1, updated_at = ?2 \
         WHERE subscription_id = ?3",
        params![canceled_at, now(), subscription_id],
    )?;
    Ok(affected > 0)
}

// ============ Payments ============

pub fn upsert_payment(conn: &Connection, input: &UpsertPayment) -> Result<()> {
    let ts = now();
    conn.execute(
        "INSERT INTO payments (payment_id, user_id, customer_id, subscription_id, product_id, \
             amount, currency, status, payment_type, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10) \
         ON CONFLICT(payment_id) DO UPDATE SET \
             user_id = excluded.user_id, \
             customer_id = excluded.customer_id, \
             subscription_id = excluded.subscription_id, \
             product_id = excluded.product_id, \
             amount = excluded.amount, \
             currency = excluded.currency, \
             status = excluded.status, \
             payment_type = excluded.payment_type, \
             updated_at = excluded.updated_at",
        params![
            input.payment_id,
            input.user_id,
            input.customer_id,
            input.subscription_id,
            input.product_id,
            input.amount,
            input.currency,
            input.status,
            input.payment_type.as_str(),
            ts,
        ],
    )?;
    Ok(())
}

pub fn get_payment(conn: &Connection, payment_id: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE payment_id = ?1", PAYMENT_COLS),
        &[&payment_id],
    )
}
