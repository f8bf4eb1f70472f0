#![allow(dead_code)]

use hmac::{Hmac, Mac};
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use sha2::Sha256;

use paysync::db::init_db;
use paysync::models::User;

pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_db(&conn).unwrap();
    conn
}

/// Insert a user with a fixed id so payloads can reference it directly.
pub fn create_test_user(conn: &Connection, id: &str, email: &str) -> User {
    conn.execute(
        "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?1, ?2, ?3, 0, 0)",
        params![id, email, "Test User"],
    )
    .unwrap();
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: "Test User".to_string(),
        creem_customer_id: None,
        created_at: 0,
        updated_at: 0,
    }
}

pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

// ============ Payload builders ============

pub fn checkout_one_time_event(user_id: &str) -> Value {
    json!({
        "eventType": "checkout.completed",
        "object": {
            "id": "ch_1",
            "customer": {"id": "cus_1"},
            "order": {"transaction": "ord_1", "amount_due": 1999, "currency": "usd"},
            "metadata": {"userId": user_id, "paymentMode": "one_time", "tierId": "basic"}
        }
    })
}

pub fn checkout_subscription_event(user_id: &str) -> Value {
    json!({
        "eventType": "checkout.completed",
        "object": {
            "id": "ch_2",
            "customer": {"id": "cus_1"},
            "order": {"transaction": "ord_2", "amount_due": 2999, "currency": "usd"},
            "subscription": {
                "id": "sub_1",
                "product": {"id": "prod_pro_monthly"},
                "status": "active",
                "current_period_start_date": 1700000000,
                "current_period_end_date": 1702592000
            },
            "metadata": {"userId": user_id, "paymentMode": "subscription", "tierId": "pro"}
        }
    })
}

pub fn subscription_lifecycle_event(event_type: &str, subscription_id: &str, status: &str) -> Value {
    json!({
        "eventType": event_type,
        "object": {
            "id": subscription_id,
            "customer": "cus_1",
            "product": "prod_pro_monthly",
            "status": status,
            "current_period_start_date": 1700000000,
            "current_period_end_date": 1702592000
        }
    })
}

pub fn renewal_payment_event(subscription_id: &str, start: i64, end: i64) -> Value {
    json!({
        "eventType": "payment.succeeded",
        "object": {
            "id": "in_1",
            "customer": "cus_1",
            "amount_paid": 2999,
            "currency": "usd",
            "subscription_id": subscription_id,
            "billing_reason": "subscription_cycle",
            "lines": {
                "data": [{
                    "period": {"start": start, "end": end},
                    "product_id": "prod_pro_monthly"
                }]
            }
        }
    })
}

pub fn plain_payment_event(payment_id: &str) -> Value {
    json!({
        "eventType": "payment.succeeded",
        "object": {
            "id": payment_id,
            "customer": "cus_1",
            "amount": 999,
            "currency": "usd",
            "product_id": "prod_basic_monthly"
        }
    })
}
