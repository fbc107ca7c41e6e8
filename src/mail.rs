use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info};

use crate::config::{AppConfig, MailConfig};
use crate::entity::user;
use crate::error::AppError;
use crate::templates;
use crate::token::issue_reset_password_token;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), String>;
}

pub type SharedSender = Arc<dyn EmailSender>;

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    pub fn new(host: &str, config: &MailConfig) -> Result<Self, String> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|e| e.to_string())?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), String> {
        let from: Mailbox = email.from.parse().map_err(|e| format!("{:?}", e))?;
        let to: Mailbox = email.to.parse().map_err(|e| format!("{:?}", e))?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|e| e.to_string())?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Used when no SMTP server is configured: the message goes to the log.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), String> {
        info!(
            "mail to={} subject={:?}\n{}",
            email.to, email.subject, email.text_body
        );
        Ok(())
    }
}

pub fn sender_from_config(config: &AppConfig) -> SharedSender {
    match &config.mail.server {
        Some(host) => match SmtpEmailSender::new(host, &config.mail) {
            Ok(sender) => Arc::new(sender),
            Err(e) => {
                error!("smtp setup for {} failed, falling back to log: {}", host, e);
                Arc::new(LogEmailSender)
            }
        },
        None => Arc::new(LogEmailSender),
    }
}

pub fn password_reset_email(config: &AppConfig, user: &user::Model) -> Result<OutgoingEmail, AppError> {
    let token = issue_reset_password_token(
        &config.secret_key,
        user.id,
        Duration::seconds(config.reset_token_expires_in),
    )?;
    let url = format!("{}/reset_password/{}", config.base_url, token);
    let (text_body, html_body) = templates::reset_password_email(&user.login, &url);
    Ok(OutgoingEmail {
        from: config.mail_sender(),
        to: user.email.clone(),
        subject: "[Microblog] Reset Your Password".to_string(),
        text_body,
        html_body,
    })
}

/// Failure report for the admins, one message per address.
pub fn error_report_emails(config: &AppConfig, mail_host: &str, request: &str, error: &str) -> Vec<OutgoingEmail> {
    let text_body = format!("{}\n\n{}\n", request, error);
    let html_body = format!(
        "<p>{}</p><pre>{}</pre>",
        html_escape::encode_text(request),
        html_escape::encode_text(error)
    );
    config
        .admins
        .iter()
        .map(|admin| OutgoingEmail {
            from: format!("no-reply@{}", mail_host),
            to: admin.clone(),
            subject: "Microblog Failure".to_string(),
            text_body: text_body.clone(),
            html_body: html_body.clone(),
        })
        .collect()
}

pub async fn deliver(sender: SharedSender, email: OutgoingEmail) {
    if let Err(e) = sender.send_email(&email).await {
        error!("mail to {} failed: {}", email.to, e);
    }
}

/// Sends in the background; failures are logged only.
pub fn dispatch(sender: SharedSender, email: OutgoingEmail) {
    actix_web::rt::spawn(deliver(sender, email));
}
