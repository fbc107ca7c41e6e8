//! Stateless password-reset tokens.
//!
//! A token is an HS256 JWT whose `reset_password` claim holds the user id and
//! whose `exp` claim bounds its lifetime. Verification fails closed: a bad
//! signature, an expired token and garbage input all look the same.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Serialize, Deserialize)]
struct ResetClaims {
    reset_password: i32,
    exp: i64,
}

pub fn issue_reset_password_token(
    secret: &str,
    user_id: i32,
    expires_in: Duration,
) -> Result<String, AppError> {
    let claims = ResetClaims {
        reset_password: user_id,
        exp: (Utc::now() + expires_in).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::system_exception(format!("token encode failed: {}", e)))
}

pub fn verify_reset_password_token(secret: &str, token: &str) -> Option<i32> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims.reset_password)
    .ok()
}
