use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CONFIG;
use crate::error::{AppError, Result};
use crate::models::enums::Role;
use crate::models::user;

// In-memory signing secret cache
static JWT_SECRET: Lazy<RwLock<Option<String>>> = Lazy::new(|| RwLock::new(None));

/// JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub jti: String, // JWT ID, used for revocation
    #[serde(default)]
    pub ver: i32, // User token version at issue time
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))
    }

    pub fn expires_at(&self) -> chrono::DateTime<Utc> {
        chrono::DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Get the HS256 signing secret
fn get_secret() -> String {
    // Fast path: check cache with read lock
    {
        let cache = JWT_SECRET.read();
        if let Some(secret) = cache.as_ref() {
            return secret.clone();
        }
    }

    let mut cache = JWT_SECRET.write();

    // Another thread might have initialized while we waited
    if let Some(secret) = cache.as_ref() {
        return secret.clone();
    }

    let secret = match CONFIG.auth.jwt_secret.clone() {
        Some(secret) => secret,
        None => {
            tracing::warn!("STUDENTLINK_JWT_SECRET not set, generating temporary signing secret");
            generate_random_string(32)
        }
    };

    *cache = Some(secret.clone());
    secret
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, CONFIG.auth.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Create a JWT access token carrying the user's role and department
pub fn create_access_token(user: &user::Model) -> Result<String> {
    issue_token(user, CONFIG.auth.jwt_ttl_seconds)
}

fn issue_token(user: &user::Model, ttl_seconds: i64) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: user.id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        ver: user.token_version,
        role: user.role,
        department_id: user.department_id,
    };

    let secret = get_secret();
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), &claims, &encoding_key).map_err(|e| e.into())
}

/// Decode and validate a JWT token
pub fn decode_token(token: &str) -> Result<Claims> {
    let secret = get_secret();
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // No clock skew tolerance for expiration check
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
    Ok(token_data.claims)
}

/// Generate a cryptographically secure random string (hex)
pub fn generate_random_string(length: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..length).map(|_| rng.random()).collect();
    hex::encode(bytes)
}

/// SHA-256 of a password reset token, hex encoded
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, department_id: Option<i64>) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 42,
            student_id: None,
            employee_id: Some("EMP-001".to_string()),
            name: "Jane Cruz".to_string(),
            email: "jane@bestlink.edu.ph".to_string(),
            password: String::new(),
            role,
            department_id,
            phone: None,
            avatar: None,
            preferences: None,
            is_active: true,
            token_version: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_carries_role_and_department() {
        let token = create_access_token(&user(Role::DepartmentHead, Some(3))).unwrap();
        let claims = decode_token(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::DepartmentHead);
        assert_eq!(claims.department_id, Some(3));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_carries_user_token_version() {
        let mut u = user(Role::Student, Some(2));
        u.token_version = 3;
        let claims = decode_token(&create_access_token(&u).unwrap()).unwrap();

        assert_eq!(claims.ver, 3);
    }

    #[test]
    fn test_each_token_has_unique_jti() {
        let u = user(Role::Staff, None);
        let a = decode_token(&create_access_token(&u).unwrap()).unwrap();
        let b = decode_token(&create_access_token(&u).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = issue_token(&user(Role::Admin, None), -10).unwrap();
        assert!(decode_token(&token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let token = create_access_token(&user(Role::Student, None)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(decode_token(&tampered).is_err());
    }

    #[test]
    fn test_password_round_trip() {
        let hash = bcrypt::hash("secret-pass", 4).unwrap();
        assert!(verify_password("secret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
        assert!(!verify_password("secret-pass", "not-a-hash"));
    }

    #[test]
    fn test_reset_token_hash_is_stable() {
        let a = hash_reset_token("abc");
        assert_eq!(a, hash_reset_token("abc"));
        assert_ne!(a, hash_reset_token("abd"));
        assert_eq!(a.len(), 64);
    }
}
