use axum::{extract::State, response::Json, routing::get, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::error::{ApiResult, AppError};
use crate::AppState;
use duetrack_shared::NotificationTemplate;

/// Partial update of the shared notification template. Absent fields keep
/// their stored value; each sub-template tracks its own update timestamp.
#[derive(Debug, Deserialize, Validate)]
pub struct TemplateUpdate {
    #[validate(length(min = 1, max = 1600))]
    pub sms_body: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub email_subject: Option<String>,
    #[validate(length(min = 1))]
    pub email_html: Option<String>,
}

pub fn template_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_template).put(update_template))
}

async fn get_template(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> ApiResult<Json<NotificationTemplate>> {
    let template = sqlx::query_as::<_, NotificationTemplate>(
        "SELECT sms_body, sms_updated_at, email_subject, email_html, email_updated_at
         FROM notification_templates WHERE id = TRUE",
    )
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Notification template".to_string()))?;

    Ok(Json(template))
}

async fn update_template(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<TemplateUpdate>,
) -> ApiResult<Json<NotificationTemplate>> {
    payload.validate()?;

    let template = sqlx::query_as::<_, NotificationTemplate>(
        r#"
        INSERT INTO notification_templates
            (id, sms_body, sms_updated_at, email_subject, email_html, email_updated_at)
        VALUES (TRUE, COALESCE($1, ''), NOW(), COALESCE($2, ''), COALESCE($3, ''), NOW())
        ON CONFLICT (id) DO UPDATE SET
            sms_body = COALESCE($1, notification_templates.sms_body),
            sms_updated_at = CASE
                WHEN $1 IS NOT NULL THEN NOW()
                ELSE notification_templates.sms_updated_at
            END,
            email_subject = COALESCE($2, notification_templates.email_subject),
            email_html = COALESCE($3, notification_templates.email_html),
            email_updated_at = CASE
                WHEN $2 IS NOT NULL OR $3 IS NOT NULL THEN NOW()
                ELSE notification_templates.email_updated_at
            END
        RETURNING sms_body, sms_updated_at, email_subject, email_html, email_updated_at
        "#,
    )
    .bind(&payload.sms_body)
    .bind(&payload.email_subject)
    .bind(&payload.email_html)
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!("Notification template updated by {}", admin.username);

    Ok(Json(template))
}
