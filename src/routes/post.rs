use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::{post_page, PageQuery};
use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::forms::{FormErrors, PostForm};
use crate::response::{page, redirect_with_flash};
use crate::store::posts;
use crate::templates;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(["/", "/index"])
            .route(web::get().to(index))
            .route(web::post().to(create_post)),
    )
    .service(web::resource("/explore").route(web::get().to(explore)));
}

async fn render_index(
    req: &HttpRequest,
    db: &DatabaseConnection,
    config: &AppConfig,
    user: &CurrentUser,
    query: &PageQuery,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<HttpResponse, AppError> {
    let (items, pager) = post_page(
        db,
        posts::following_posts(user.0.id),
        query.number(),
        config.posts_per_page,
        "/index",
    )
    .await?;
    let content = templates::index(&user.0, Some((form, errors)), &items, &pager);
    Ok(page(req, Some(&user.0), "Home", content))
}

async fn index(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    user: CurrentUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    render_index(
        &req,
        db.get_ref(),
        config.get_ref(),
        &user,
        &query,
        &PostForm::default(),
        &FormErrors::default(),
    )
    .await
}

async fn create_post(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    user: CurrentUser,
    query: web::Query<PageQuery>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return render_index(&req, db.get_ref(), config.get_ref(), &user, &query, &form, &errors)
            .await;
    }

    let txn = db.begin().await?;
    let created = posts::create(&txn, user.0.id, form.post.trim(), Utc::now()).await?;
    txn.commit().await?;
    info!("user {} posted {}", user.0.login, created.id);
    Ok(redirect_with_flash(&req, "/index", "Your post is now live!"))
}

async fn explore(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    user: CurrentUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let (items, pager) = post_page(
        db.get_ref(),
        posts::explore(),
        query.number(),
        config.posts_per_page,
        "/explore",
    )
    .await?;
    let content = templates::index(&user.0, None, &items, &pager);
    Ok(page(&req, Some(&user.0), "Explore", content))
}
