pub mod creem;
pub mod events;
pub mod reconcile;

pub use creem::handle_creem_webhook;
pub use reconcile::{process_event, ProcessOutcome};

use axum::{routing::post, Router};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/creem", post(handle_creem_webhook))
}
