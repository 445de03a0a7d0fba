pub mod customers;
pub mod logs;
pub mod notifications;
pub mod templates;
pub mod users;

pub use customers::customer_routes;
pub use logs::log_routes;
pub use notifications::notification_routes;
pub use templates::template_routes;
pub use users::user_routes;

use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;

use crate::AppState;

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = crate::database::health_check(&state.db_pool).await;

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "database": db_ok,
        })),
    )
}
