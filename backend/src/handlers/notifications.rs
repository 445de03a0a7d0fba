use axum::{extract::State, response::Json, routing::post, Router};
use std::sync::Arc;

use crate::auth::middleware::AdminUser;
use crate::error::ApiResult;
use crate::jobs::{BatchReport, DueNotifierJob};
use crate::AppState;

pub fn notification_routes() -> Router<Arc<AppState>> {
    Router::new().route("/run", post(run_batch))
}

/// Manual trigger for the daily notifier, same code path as the cron job.
/// There is no dedup guard: running it twice on one day notifies twice.
async fn run_batch(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<BatchReport>> {
    tracing::info!("Due-date notifier triggered manually by {}", admin.username);

    let report = DueNotifierJob::from_state(&state).run().await?;

    Ok(Json(report))
}
