pub mod auth;
pub mod database;
pub mod firebase;
pub mod openai;
pub mod server;
pub mod storage;

use once_cell::sync::Lazy;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server: server::ServerConfig,
    pub database: database::DatabaseConfig,
    pub auth: auth::AuthConfig,
    pub openai: openai::OpenAiConfig,
    pub firebase: firebase::FirebaseConfig,
    pub storage: storage::StorageConfig,

    /// Deployment environment. Error details are only exposed when this is `local`.
    pub app_env: String,
    pub version: String,

    // Logging
    pub log_level: String,
    /// Emit JSON log lines instead of plain text (`STUDENTLINK_LOG_FORMAT=json`)
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server: server::ServerConfig::from_env(),
            database: database::DatabaseConfig::from_env(),
            auth: auth::AuthConfig::from_env(),
            openai: openai::OpenAiConfig::from_env(),
            firebase: firebase::FirebaseConfig::from_env(),
            storage: storage::StorageConfig::from_env(),

            app_env: env::var("STUDENTLINK_ENV").unwrap_or_else(|_| "production".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            log_level: env::var("STUDENTLINK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: is_json_format(env::var("STUDENTLINK_LOG_FORMAT").ok().as_deref()),
        }
    }

    pub fn is_local(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("local")
    }
}

fn is_json_format(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_defaults_to_text() {
        assert!(!is_json_format(None));
        assert!(!is_json_format(Some("text")));
        assert!(is_json_format(Some("JSON")));
        assert!(is_json_format(Some(" json ")));
    }
}
