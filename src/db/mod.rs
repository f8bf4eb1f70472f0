mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::models::TierCatalog;
use crate::payments::BillingApi;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Pure product-id -> tier lookup consumed by the reconciler.
    pub tiers: Arc<TierCatalog>,
    /// Outbound provider API, injected so tests can substitute it.
    pub billing: Arc<dyn BillingApi>,
    /// Webhook signing secret. None rejects inbound webhooks with a
    /// configuration error.
    pub webhook_secret: Option<Arc<str>>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
