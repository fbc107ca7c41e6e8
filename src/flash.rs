//! One-shot messages carried across a redirect in a cookie.

use actix_web::cookie::Cookie;
use actix_web::HttpRequest;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub const FLASH_COOKIE: &str = "flash";

/// Messages waiting in the request's flash cookie.
pub fn pending(req: &HttpRequest) -> Vec<String> {
    req.cookie(FLASH_COOKIE)
        .and_then(|c| decode(c.value()))
        .unwrap_or_default()
}

pub fn cookie(messages: &[String]) -> Cookie<'static> {
    let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(messages).unwrap_or_default());
    Cookie::build(FLASH_COOKIE, encoded)
        .path("/")
        .http_only(true)
        .finish()
}

pub fn removal() -> Cookie<'static> {
    let mut c = Cookie::build(FLASH_COOKIE, "").path("/").finish();
    c.make_removal();
    c
}

fn decode(value: &str) -> Option<Vec<String>> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}
