//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, creem_customer_id, created_at, updated_at";

pub const SUBSCRIPTION_COLS: &str = "subscription_id, user_id, customer_id, product_id, status, \
     current_period_start, current_period_end, canceled_at, created_at, updated_at";

pub const PAYMENT_COLS: &str = "payment_id, user_id, customer_id, subscription_id, product_id, \
     amount, currency, status, payment_type, created_at, updated_at";

pub const WEBHOOK_EVENT_COLS: &str = "event_id, event_type, provider, payload, processed_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            creem_customer_id: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl FromRow for Subscription {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subscription {
            subscription_id: row.get(0)?,
            user_id: row.get(1)?,
            customer_id: row.get(2)?,
            product_id: row.get(3)?,
            status: parse_enum(row, 4, "status")?,
            current_period_start: row.get(5)?,
            current_period_end: row.get(6)?,
            canceled_at: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for Payment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Payment {
            payment_id: row.get(0)?,
            user_id: row.get(1)?,
            customer_id: row.get(2)?,
            subscription_id: row.get(3)?,
            product_id: row.get(4)?,
            amount: row.get(5)?,
            currency: row.get(6)?,
            status: row.get(7)?,
            payment_type: parse_enum(row, 8, "payment_type")?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl FromRow for WebhookEventRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(WebhookEventRecord {
            event_id: row.get(0)?,
            event_type: row.get(1)?,
            provider: row.get(2)?,
            payload: row.get(3)?,
            processed_at: row.get(4)?,
        })
    }
}
