use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub secret_key: String,
    pub posts_per_page: u64,
    pub reset_token_expires_in: i64,
    pub session_lifetime_hours: i64,
    pub remember_cookie_days: i64,
    pub mail: MailConfig,
    pub admins: Vec<String>,
    pub base_url: String,
}

#[derive(Clone, Default)]
pub struct MailConfig {
    pub server: Option<String>,
    pub port: u16,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = parse_env("SERVER_PORT", 5000);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "./app.db".to_string());
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        let secret_key = env::var("SECRET_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "you-will-never-guess".to_string());

        let mail = MailConfig {
            server: non_empty_var("MAIL_SERVER"),
            port: parse_env("MAIL_PORT", 25),
            use_tls: env::var("MAIL_USE_TLS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            username: non_empty_var("MAIL_USERNAME"),
            password: non_empty_var("MAIL_PASSWORD"),
        };

        let admins = env::var("ADMINS")
            .unwrap_or_else(|_| "admin@example.com".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base_url = non_empty_var("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", server_port));

        Self {
            server_port,
            sqlite_path,
            database_url,
            secret_key,
            posts_per_page: parse_env::<u64>("POSTS_PER_PAGE", 3).max(1),
            reset_token_expires_in: parse_env("RESET_TOKEN_EXPIRES_IN", 600),
            session_lifetime_hours: parse_env("SESSION_LIFETIME_HOURS", 24),
            remember_cookie_days: parse_env("REMEMBER_COOKIE_DAYS", 365),
            mail,
            admins,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}?mode=rwc", path)
    }

    /// Sender address for outgoing mail.
    pub fn mail_sender(&self) -> String {
        self.admins
            .first()
            .cloned()
            .unwrap_or_else(|| "admin@example.com".to_string())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            server_port: 5000,
            sqlite_path: String::new(),
            database_url: Some("sqlite::memory:".to_string()),
            secret_key: "test-secret".to_string(),
            posts_per_page: 3,
            reset_token_expires_in: 600,
            session_lifetime_hours: 24,
            remember_cookie_days: 365,
            mail: MailConfig::default(),
            admins: vec!["admin@example.com".to_string()],
            base_url: "http://localhost:5000".to_string(),
        }
    }
}
