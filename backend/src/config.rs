use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    /// Minutes of keep-alive silence after which an active session is
    /// reported as stale by the admin read side.
    pub session_stale_minutes: i64,
    pub initial_admin_email: Option<String>,
    pub initial_admin_password: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/orgdash".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .unwrap_or(12);

        let session_stale_minutes = env::var("SESSION_STALE_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let initial_admin_email = env::var("INITIAL_ADMIN_EMAIL").ok();
        let initial_admin_password = env::var("INITIAL_ADMIN_PASSWORD").ok();

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expiration_hours,
            session_stale_minutes,
            initial_admin_email,
            initial_admin_password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_falls_back_to_defaults() {
        let config = Config::load().expect("load config");
        assert!(config.jwt_expiration_hours > 0);
        assert!(config.session_stale_minutes > 0);
    }
}
