use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::auth::middleware::AuthUser;
use crate::error::ApiResult;
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::AppState;
use duetrack_shared::NotificationLog;

pub fn log_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_logs))
}

/// Delivery history, newest first. The log table is append-only; this is the
/// only read surface and there is no write surface in the API.
async fn list_logs(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<PaginatedResponse<NotificationLog>>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notification_logs")
        .fetch_one(&state.db_pool)
        .await?;

    let logs = sqlx::query_as::<_, NotificationLog>(
        "SELECT * FROM notification_logs ORDER BY sent_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(PaginatedResponse::new(logs, &params, total)))
}
