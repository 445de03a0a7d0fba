use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use duetrack_shared::User;

/// Sessions last four hours; staff log in at the start of a shift.
const TOKEN_LIFETIME_HOURS: i64 = 4;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // Subject (user ID)
    pub username: String,
    pub role: String,
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
}

#[derive(Debug)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

pub fn create_jwt(user: &User, secret: &str) -> Result<TokenResponse, jsonwebtoken::errors::Error> {
    let expires_at = Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS);

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        exp: expires_at.timestamp(),
        iat: Utc::now().timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(TokenResponse { token, expires_at })
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "maria".to_string(),
            email: "maria@example.com".to_string(),
            password_hash: "x".to_string(),
            role: "staff".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_jwt_round_trip() {
        let user = sample_user();
        let issued = create_jwt(&user, "test-secret").unwrap();

        let data = verify_jwt(&issued.token, "test-secret").unwrap();
        assert_eq!(data.claims.sub, user.id);
        assert_eq!(data.claims.username, "maria");
        assert_eq!(data.claims.role, "staff");
        assert!(data.claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let issued = create_jwt(&sample_user(), "test-secret").unwrap();
        assert!(verify_jwt(&issued.token, "other-secret").is_err());
    }

    #[test]
    fn test_jwt_rejects_garbage() {
        assert!(verify_jwt("not.a.token", "test-secret").is_err());
    }
}
