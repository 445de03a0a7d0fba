use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AdminUser;
use crate::auth::UserResponse;
use crate::error::{ApiResult, AppError};
use crate::AppState;
use duetrack_shared::User;

const BCRYPT_COST: u32 = 10;

#[derive(Debug, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: String,
}

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", axum::routing::delete(delete_user))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
        .fetch_all(&state.db_pool)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<UserCreate>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    payload.validate()?;

    if payload.role != "admin" && payload.role != "staff" {
        return Err(AppError::BadRequest(format!(
            "Unknown role '{}', expected 'admin' or 'staff'",
            payload.role
        )));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
            .bind(&payload.username)
            .bind(&payload.email)
            .fetch_optional(&state.db_pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Username or email already in use".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, BCRYPT_COST)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.role)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if id == admin.id {
        return Err(AppError::Conflict(
            "Cannot delete the currently authenticated account".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
