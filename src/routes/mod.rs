use actix_web::{web, HttpResponse};
use sea_orm::{ConnectionTrait, Select};
use serde::Deserialize;

use crate::entity::{post as post_entity, user as user_entity};
use crate::error::AppError;
use crate::store::posts;
use crate::templates::Pager;

/// Builds the full application around an in-memory database for handler tests.
#[cfg(test)]
macro_rules! test_app {
    ($db:expr, $sender:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($crate::config::AppConfig::for_tests()))
                .app_data(actix_web::web::Data::new($db.clone()))
                .app_data(actix_web::web::Data::<dyn $crate::mail::EmailSender>::from(
                    $sender.clone() as $crate::mail::SharedSender,
                ))
                .wrap(actix_web::middleware::ErrorHandlers::new().handler(
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    $crate::error::report_internal_error,
                ))
                .configure($crate::routes::config)
                .default_service(actix_web::web::to($crate::routes::not_found)),
        )
        .await
    };
}

mod auth;
mod post;
mod user;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.configure(post::config)
        .configure(user::config)
        .configure(auth::config);
}

pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::not_found())
}

/// `?page=N`. Anything that is not a positive number means the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }
}

/// Loads one page of `select` with authors attached, plus the links to the
/// neighbouring pages of `path`.
async fn post_page<C: ConnectionTrait>(
    db: &C,
    select: Select<post_entity::Entity>,
    page: u64,
    per_page: u64,
    path: &str,
) -> Result<(Vec<(post_entity::Model, user_entity::Model)>, Pager), AppError> {
    let page = posts::paginate(db, select, page, per_page).await?;
    let pager = Pager {
        prev: page
            .has_prev()
            .then(|| format!("{}?page={}", path, (page.page - 1).min(page.total_pages.max(1)))),
        next: page.has_next().then(|| format!("{}?page={}", path, page.page + 1)),
    };
    let items = posts::with_authors(db, page.items).await?;
    Ok((items, pager))
}
