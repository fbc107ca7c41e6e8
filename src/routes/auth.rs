use actix_web::{http::header, web, HttpRequest, HttpResponse};
use log::{info, warn};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;

use crate::auth::{login_cookie, logout_cookie, MaybeUser};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::forms::{
    FormErrors, LoginForm, RegistrationForm, ResetPasswordForm, ResetPasswordRequestForm,
};
use crate::mail::{self, EmailSender};
use crate::password::check_password;
use crate::response::{page, redirect, redirect_with_flash, safe_next};
use crate::store::users;
use crate::templates;
use crate::token::verify_reset_password_token;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/login")
            .route(web::get().to(login_form))
            .route(web::post().to(login)),
    )
    .service(web::resource("/logout").route(web::get().to(logout)))
    .service(
        web::resource("/register")
            .route(web::get().to(register_form))
            .route(web::post().to(register)),
    )
    .service(
        web::resource("/reset_password_request")
            .route(web::get().to(reset_request_form))
            .route(web::post().to(reset_request)),
    )
    .service(
        web::resource("/reset_password/{token}")
            .route(web::get().to(reset_password_form))
            .route(web::post().to(reset_password)),
    );
}

#[derive(Debug, Default, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

fn render_login(req: &HttpRequest, form: &LoginForm, errors: &FormErrors, next: Option<&str>) -> HttpResponse {
    page(req, None, "Sign In", templates::login(form, errors, next))
}

async fn login_form(req: HttpRequest, user: MaybeUser, query: web::Query<NextQuery>) -> HttpResponse {
    if user.0.is_some() {
        return redirect("/index");
    }
    let next = safe_next(query.next.as_deref());
    render_login(&req, &LoginForm::default(), &FormErrors::default(), next.as_deref())
}

async fn login(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    user: MaybeUser,
    query: web::Query<NextQuery>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    if user.0.is_some() {
        return Ok(redirect("/index"));
    }
    let next = safe_next(query.next.as_deref());
    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(render_login(&req, &form, &errors, next.as_deref()));
    }

    let found = users::find_by_login(db.get_ref(), form.login.trim()).await?;
    let Some(user) = found.filter(|u| check_password(u.password_hash.as_deref(), &form.password)) else {
        warn!("failed login for {:?}", form.login.trim());
        return Ok(redirect_with_flash(&req, "/login", "Invalid login or password"));
    };

    let cookie = login_cookie(&config, user.id, form.remember())?;
    info!("user {} logged in", user.login);
    let target = next.unwrap_or_else(|| "/index".to_string());
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, target))
        .cookie(cookie)
        .finish())
}

async fn logout() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/index"))
        .cookie(logout_cookie())
        .finish()
}

async fn register_form(req: HttpRequest, user: MaybeUser) -> HttpResponse {
    if user.0.is_some() {
        return redirect("/index");
    }
    page(
        &req,
        None,
        "Register",
        templates::register(&RegistrationForm::default(), &FormErrors::default()),
    )
}

async fn register(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    user: MaybeUser,
    form: web::Form<RegistrationForm>,
) -> Result<HttpResponse, AppError> {
    if user.0.is_some() {
        return Ok(redirect("/index"));
    }
    let txn = db.begin().await?;
    let errors = form.validate(&txn).await?;
    if !errors.is_empty() {
        return Ok(page(&req, None, "Register", templates::register(&form, &errors)));
    }

    let created = users::create(&txn, form.login.trim(), form.email.trim(), &form.password).await?;
    txn.commit().await?;
    info!("registered user {} ({})", created.login, created.id);
    Ok(redirect_with_flash(
        &req,
        "/login",
        "Congratulations, you are now a registered user!",
    ))
}

async fn reset_request_form(req: HttpRequest, user: MaybeUser) -> HttpResponse {
    if user.0.is_some() {
        return redirect("/index");
    }
    let form = ResetPasswordRequestForm::default();
    page(
        &req,
        None,
        "Reset Password",
        templates::reset_password_request(&form, &FormErrors::default()),
    )
}

async fn reset_request(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    sender: web::Data<dyn EmailSender>,
    user: MaybeUser,
    form: web::Form<ResetPasswordRequestForm>,
) -> Result<HttpResponse, AppError> {
    if user.0.is_some() {
        return Ok(redirect("/index"));
    }
    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(page(
            &req,
            None,
            "Reset Password",
            templates::reset_password_request(&form, &errors),
        ));
    }

    // Same answer whether or not the address is known.
    if let Some(user) = users::find_by_email(db.get_ref(), form.email.trim()).await? {
        let email = mail::password_reset_email(&config, &user)?;
        mail::dispatch(sender.into_inner(), email);
        info!("password reset requested for user {}", user.id);
    }
    Ok(redirect_with_flash(
        &req,
        "/login",
        "Check your email for the instructions to reset your password",
    ))
}

async fn reset_password_form(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    user: MaybeUser,
    path: web::Path<String>,
) -> HttpResponse {
    let token = path.into_inner();
    if user.0.is_some() || verify_reset_password_token(&config.secret_key, &token).is_none() {
        return redirect("/index");
    }
    page(
        &req,
        None,
        "Reset Password",
        templates::reset_password(&token, &FormErrors::default()),
    )
}

async fn reset_password(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    user: MaybeUser,
    path: web::Path<String>,
    form: web::Form<ResetPasswordForm>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    if user.0.is_some() {
        return Ok(redirect("/index"));
    }
    let Some(user_id) = verify_reset_password_token(&config.secret_key, &token) else {
        return Ok(redirect("/index"));
    };
    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(page(
            &req,
            None,
            "Reset Password",
            templates::reset_password(&token, &errors),
        ));
    }

    let txn = db.begin().await?;
    if users::find_by_id(&txn, user_id).await?.is_none() {
        return Ok(redirect("/index"));
    }
    users::set_password(&txn, user_id, &form.password).await?;
    txn.commit().await?;
    info!("password reset for user {}", user_id);
    Ok(redirect_with_flash(&req, "/login", "Your password has been reset."))
}
