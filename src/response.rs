use actix_web::{
    http::{header, StatusCode},
    HttpRequest, HttpResponse,
};

use crate::entity::user;
use crate::flash;
use crate::templates;

pub fn html_response(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Renders `content` inside the site layout and consumes pending flashes.
pub fn page(
    req: &HttpRequest,
    current: Option<&user::Model>,
    title: &str,
    content: String,
) -> HttpResponse {
    let flashes = flash::pending(req);
    let mut builder = HttpResponse::Ok();
    builder.content_type("text/html; charset=utf-8");
    if !flashes.is_empty() {
        builder.cookie(flash::removal());
    }
    builder.body(templates::layout(title, current, &flashes, &content))
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

/// Redirects and queues `message` for the next rendered page.
pub fn redirect_with_flash(req: &HttpRequest, location: &str, message: impl Into<String>) -> HttpResponse {
    let mut messages = flash::pending(req);
    messages.push(message.into());
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .cookie(flash::cookie(&messages))
        .finish()
}

/// Only same-site relative paths are honoured as post-login targets.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        Some(next.to_string())
    } else {
        None
    }
}
