use rusqlite::Connection;

/// Initialize the database schema. All timestamps are unix seconds.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Users (identity). The webhook path only ever writes creem_customer_id,
        -- set on first checkout completion and used by the customer resolver
        -- for every event after that.
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            creem_customer_id TEXT UNIQUE,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_customer ON users(creem_customer_id)
            WHERE creem_customer_id IS NOT NULL;

        -- Subscriptions (one row per provider-assigned id, never deleted).
        CREATE TABLE IF NOT EXISTS subscriptions (
            subscription_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            customer_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN (
                'active', 'trialing', 'canceled', 'past_due',
                'incomplete', 'unpaid', 'expired'
            )),
            current_period_start INTEGER,
            current_period_end INTEGER,
            canceled_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_customer ON subscriptions(customer_id);

        -- Payments (append-mostly; a payment_id is upserted, never duplicated).
        CREATE TABLE IF NOT EXISTS payments (
            payment_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            customer_id TEXT NOT NULL,
            subscription_id TEXT,
            product_id TEXT NOT NULL,
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL,
            payment_type TEXT NOT NULL CHECK (payment_type IN ('subscription', 'one_time')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payments_user ON payments(user_id);
        CREATE INDEX IF NOT EXISTS idx_payments_subscription ON payments(subscription_id)
            WHERE subscription_id IS NOT NULL;

        -- Idempotency ledger. The PRIMARY KEY is the uniqueness constraint
        -- the dedup relies on; rows are inserted in the same transaction as
        -- the domain mutation and roll back with it.
        CREATE TABLE IF NOT EXISTS webhook_events (
            event_id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            provider TEXT NOT NULL,
            payload TEXT NOT NULL,
            processed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_webhook_events_age ON webhook_events(processed_at);
        "#,
    )
}
