use std::env;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret. A temporary one is generated at startup when unset.
    pub jwt_secret: Option<String>,
    pub jwt_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    /// Lifetime of password reset tokens, in minutes
    pub reset_token_ttl_minutes: i64,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
    pub bootstrap_admin_name: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: env::var("STUDENTLINK_JWT_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            jwt_ttl_seconds: env::var("STUDENTLINK_JWT_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            bcrypt_cost: env::var("STUDENTLINK_BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            reset_token_ttl_minutes: env::var("STUDENTLINK_RESET_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            bootstrap_admin_email: env::var("STUDENTLINK_ADMIN_EMAIL").ok(),
            bootstrap_admin_password: env::var("STUDENTLINK_ADMIN_PASSWORD").ok(),
            bootstrap_admin_name: env::var("STUDENTLINK_ADMIN_NAME")
                .unwrap_or_else(|_| "System Administrator".to_string()),
        }
    }
}
