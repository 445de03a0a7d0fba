pub mod jwt;
pub mod middleware;

use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiResult, AppError};
use crate::AppState;
use duetrack_shared::User;
use middleware::AuthUser;

const BCRYPT_COST: u32 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/change-password", post(change_password))
        .route("/me", get(me))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Same error for unknown user and bad password.
    if !bcrypt::verify(&req.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let issued = jwt::create_jwt(&user, &state.config.jwt_secret)?;

    tracing::info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: user.into(),
    }))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
            .bind(&req.username)
            .bind(&req.email)
            .fetch_optional(&state.db_pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Username or email already in use".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&req.password, BCRYPT_COST)?;

    // Self-registration always yields a staff account; admins are created
    // through the user management endpoints.
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, role)
        VALUES ($1, $2, $3, $4, 'staff')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&req.username)
    .bind(&req.email)
    .bind(&password_hash)
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!("Registered user {}", user.username);

    Ok((
        axum::http::StatusCode::CREATED,
        Json(UserResponse::from(user)),
    ))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    if !bcrypt::verify(&req.current_password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let password_hash = bcrypt::hash(&req.new_password, BCRYPT_COST)?;

    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user.id)
        .bind(&password_hash)
        .execute(&state.db_pool)
        .await?;

    tracing::info!("User {} changed their password", user.username);

    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}
