use actix_web::dev::ServiceResponse;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{http::header, http::StatusCode, web, HttpResponse, ResponseError};
use log::error;
use sea_orm::{DbErr, TransactionError};
use thiserror::Error;

use crate::config::AppConfig;
use crate::mail::{self, EmailSender};
use crate::response::html_response;
use crate::templates;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("login required")]
    LoginRequired { next: String },
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn need_login(next: impl Into<String>) -> Self {
        Self::LoginRequired { next: next.into() }
    }

    pub fn system_exception(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        Self::Internal(format!("database error: {}", err))
    }
}

impl From<TransactionError<AppError>> for AppError {
    fn from(err: TransactionError<AppError>) -> Self {
        match err {
            TransactionError::Connection(e) => e.into(),
            TransactionError::Transaction(app) => app,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::LoginRequired { .. } => StatusCode::FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::NotFound => html_response(StatusCode::NOT_FOUND, templates::not_found_page()),
            Self::LoginRequired { next } => {
                let location = format!("/login?next={}", urlencoding::encode(next));
                HttpResponse::Found()
                    .insert_header((header::LOCATION, location))
                    .finish()
            }
            Self::Internal(msg) => {
                error!("internal error: {}", msg);
                html_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    templates::internal_error_page(),
                )
            }
        }
    }
}

/// `ErrorHandlers` hook for 500 responses: when an SMTP server is configured
/// the admins get a "Microblog Failure" mail naming the request and the error.
pub fn report_internal_error<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let req = res.request();
    if let (Some(config), Some(sender)) = (
        req.app_data::<web::Data<AppConfig>>(),
        req.app_data::<web::Data<dyn EmailSender>>(),
    ) {
        if let Some(host) = &config.mail.server {
            let request = format!("{} {}", req.method(), req.uri());
            let error = res
                .response()
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "internal server error".to_string());
            for email in mail::error_report_emails(config, host, &request, &error) {
                mail::dispatch(sender.clone().into_inner(), email);
            }
        }
    }
    Ok(ErrorHandlerResponse::Response(res.map_into_left_body()))
}
