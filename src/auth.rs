use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::store::users;

pub const SESSION_COOKIE: &str = "session";

/// The logged-in user. Rejects anonymous requests with a redirect to the
/// login page that remembers where the visitor was going.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

/// The logged-in user, if any.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<user::Model>);

#[derive(Serialize, Deserialize)]
struct SessionClaims {
    uid: i32,
    exp: i64,
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let (db, config) = match app_state(req) {
            Some(state) => state,
            None => {
                return Box::pin(async { Err(AppError::system_exception("app state missing").into()) });
            }
        };
        let token = extract_token(req);

        Box::pin(async move {
            let token = token.ok_or_else(|| AppError::need_login(next.clone()))?;
            match authenticate_token(&db, &config, &token).await? {
                Some(user) => Ok(CurrentUser(user)),
                None => Err(AppError::need_login(next).into()),
            }
        })
    }
}

impl FromRequest for MaybeUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let (db, config) = match app_state(req) {
            Some(state) => state,
            None => return Box::pin(async { Ok(MaybeUser(None)) }),
        };
        let token = extract_token(req);

        Box::pin(async move {
            if let Some(token) = token {
                let user = authenticate_token(&db, &config, &token).await?;
                return Ok(MaybeUser(user));
            }
            Ok(MaybeUser(None))
        })
    }
}

fn app_state(req: &HttpRequest) -> Option<(web::Data<DatabaseConnection>, web::Data<AppConfig>)> {
    let db = req.app_data::<web::Data<DatabaseConnection>>()?.clone();
    let config = req.app_data::<web::Data<AppConfig>>()?.clone();
    Some((db, config))
}

fn extract_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves the session token to a user and stamps `last_seen`. An invalid or
/// expired token, or a deleted account, is an anonymous visitor.
async fn authenticate_token(
    db: &DatabaseConnection,
    config: &AppConfig,
    token: &str,
) -> Result<Option<user::Model>, AppError> {
    let Some(user_id) = decode_session_token(&config.secret_key, token) else {
        debug!("rejected session token");
        return Ok(None);
    };
    let Some(user) = users::find_by_id(db, user_id).await? else {
        return Ok(None);
    };
    Ok(Some(users::touch_last_seen(db, user).await?))
}

pub fn issue_session_token(secret: &str, user_id: i32, lifetime: Duration) -> Result<String, AppError> {
    let claims = SessionClaims {
        uid: user_id,
        exp: (Utc::now() + lifetime).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::system_exception(format!("session encode failed: {}", e)))
}

fn decode_session_token(secret: &str, token: &str) -> Option<i32> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    decode::<SessionClaims>(token, &key, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims.uid)
        .ok()
}

/// Cookie for a fresh login. With `remember` the cookie outlives the browser
/// session; without it the browser drops it on exit.
pub fn login_cookie(config: &AppConfig, user_id: i32, remember: bool) -> Result<Cookie<'static>, AppError> {
    let lifetime = if remember {
        Duration::days(config.remember_cookie_days)
    } else {
        Duration::hours(config.session_lifetime_hours)
    };
    let token = issue_session_token(&config.secret_key, user_id, lifetime)?;
    let mut cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    if remember {
        cookie.set_max_age(CookieDuration::days(config.remember_cookie_days));
    }
    Ok(cookie)
}

pub fn logout_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_round_trip() {
        let token = issue_session_token("s3cret", 5, Duration::hours(1)).unwrap();
        assert_eq!(decode_session_token("s3cret", &token), Some(5));
        assert_eq!(decode_session_token("other", &token), None);
    }

    #[test]
    fn expired_session_token_is_anonymous() {
        let token = issue_session_token("s3cret", 5, Duration::hours(-2)).unwrap();
        assert_eq!(decode_session_token("s3cret", &token), None);
    }

    #[test]
    fn remember_me_sets_max_age() {
        let config = AppConfig::for_tests();
        let short = login_cookie(&config, 1, false).unwrap();
        assert!(short.max_age().is_none());
        assert!(short.http_only().unwrap_or(false));

        let long = login_cookie(&config, 1, true).unwrap();
        assert_eq!(long.max_age(), Some(CookieDuration::days(365)));
    }
}
