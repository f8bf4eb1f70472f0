use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use tracing::info;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::Subscription;

pub fn router() -> Router<AppState> {
    Router::new().route("/subscriptions/{id}/cancel", post(cancel_subscription))
}

/// Cancel a subscription on the provider, then mark it canceled locally. The
/// provider's own `subscription.canceled` webhook will arrive later and
/// overwrite the same fields.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Subscription>> {
    // Connection scoped so it is not held across the outbound call.
    {
        let conn = state.db.get()?;
        if queries::get_subscription(&conn, &id)?.is_none() {
            return Err(AppError::NotFound(format!("subscription {}", id)));
        }
    }

    state.billing.cancel_subscription(&id).await?;

    let conn = state.db.get()?;
    queries::mark_subscription_canceled(&conn, &id, Utc::now().timestamp())?;
    let subscription = queries::get_subscription(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("subscription {}", id)))?;

    info!(subscription_id = %id, "subscription canceled via admin endpoint");
    Ok(Json(subscription))
}
