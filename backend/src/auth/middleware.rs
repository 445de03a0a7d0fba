use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::jwt;
use crate::error::AppError;
use crate::AppState;
use duetrack_shared::User;

/// Authenticated user extractor
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Authenticated user that must hold the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized("Missing authorization header".to_string()).into_response()
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid authorization format".to_string()).into_response()
        })?;

        let token_data = jwt::verify_jwt(token, &state.config.jwt_secret)
            .map_err(|e| AppError::from(e).into_response())?;

        // The token may outlive the account; the row is the source of truth.
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(token_data.claims.sub)
            .fetch_optional(&state.db_pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()).into_response())?
            .ok_or_else(|| {
                AppError::Unauthorized("User not found".to_string()).into_response()
            })?;

        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(
                AppError::Forbidden("Administrator role required".to_string()).into_response(),
            );
        }

        Ok(AdminUser(user))
    }
}
