use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Subscription,
    OneTime,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::OneTime => "one_time",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(Self::Subscription),
            "one_time" => Ok(Self::OneTime),
            _ => Err(()),
        }
    }
}

/// One row per provider-assigned payment/order id. Append-mostly: a given
/// payment_id is upserted, never duplicated.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub payment_id: String,
    pub user_id: String,
    pub customer_id: String,
    /// None for one-time purchases.
    pub subscription_id: Option<String>,
    pub product_id: String,
    /// Minor units (cents).
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_type: PaymentType,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for the reconciler's payment upsert.
#[derive(Debug, Clone)]
pub struct UpsertPayment {
    pub payment_id: String,
    pub user_id: String,
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub product_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_type: PaymentType,
}
