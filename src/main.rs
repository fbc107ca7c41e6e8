mod auth;
mod avatar;
mod config;
mod db;
mod entity;
mod error;
mod flash;
mod forms;
mod mail;
mod password;
mod response;
mod routes;
mod store;
mod templates;
mod token;

use actix_web::{http::StatusCode, middleware, web, App, HttpServer};
use config::AppConfig;
use db::connect_db;
use log::info;
use mail::{sender_from_config, EmailSender};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let server_port = config.server_port;
    match &config.mail.server {
        Some(host) => info!("sending mail through {}:{}", host, config.mail.port),
        None => info!("MAIL_SERVER not set, outgoing mail is logged"),
    }

    let server = HttpServer::new(move || {
        // The SMTP pool needs the worker's runtime, so each worker builds its own.
        let sender = web::Data::<dyn EmailSender>::from(sender_from_config(&config));
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(sender)
            .wrap(
                middleware::ErrorHandlers::new()
                    .handler(StatusCode::INTERNAL_SERVER_ERROR, error::report_internal_error),
            )
            .wrap(middleware::Logger::default())
            .configure(routes::config)
            .default_service(web::to(routes::not_found))
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}
