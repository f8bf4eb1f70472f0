mod creem;

pub use creem::*;

use std::{future::Future, pin::Pin};

use crate::error::Result;

/// Outbound provider API. Held behind `Arc<dyn BillingApi>` in the app state
/// so tests can substitute it; the webhook ingestion path never calls it.
pub trait BillingApi: Send + Sync {
    /// Cancel a subscription on the provider side.
    fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
