//! paysync - payment-provider webhook reconciliation service
//!
//! Receives asynchronous event notifications from the payment provider,
//! authenticates them, applies each event to domain state exactly once
//! despite at-least-once delivery, and reconciles the resulting
//! subscription/payment/user records.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod payments;
