use serde::{Deserialize, Serialize};

/// User identity. The webhook path mutates exactly one field here:
/// `creem_customer_id`, set on the first completed checkout and used by the
/// customer resolver for every later event that carries no userId metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Payment-provider customer id (cus_xxx). None until first checkout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creem_customer_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
}
