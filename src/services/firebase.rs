//! Firebase Cloud Messaging (HTTP v1) push provider.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::firebase::FirebaseConfig;
use crate::error::{AppError, Result};
use crate::services::notification::{PushMessage, PushOutcome, PushProvider};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const FCM_BASE_URL: &str = "https://fcm.googleapis.com/v1";

/// Refresh the access token this long before Google expires it
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Service-account assertion exchanged for an access token
#[derive(Debug, Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Clone)]
struct Credentials {
    project_id: String,
    client_email: String,
    private_key: String,
}

pub struct FirebaseService {
    credentials: Credentials,
    client: reqwest::Client,
    access_token: Mutex<Option<CachedToken>>,
}

impl FirebaseService {
    /// Build the service when credentials are configured
    pub fn from_config(config: &FirebaseConfig) -> Option<Self> {
        let credentials = Credentials {
            project_id: config.project_id.clone()?,
            client_email: config.client_email.clone()?,
            private_key: config.private_key.clone()?,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .ok()?;

        Some(Self {
            credentials,
            client,
            access_token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        let now = Utc::now().timestamp();
        self.access_token
            .lock()
            .as_ref()
            .filter(|t| t.expires_at - TOKEN_REFRESH_MARGIN_SECS > now)
            .map(|t| t.value.clone())
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let now = Utc::now().timestamp();
        let claims = ServiceAccountClaims {
            iss: &self.credentials.client_email,
            scope: MESSAGING_SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Firebase token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        *self.access_token.lock() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });

        Ok(token.access_token)
    }

    fn send_url(&self) -> String {
        format!(
            "{}/projects/{}/messages:send",
            FCM_BASE_URL, self.credentials.project_id
        )
    }

    async fn deliver(&self, token: &str, message: &PushMessage) -> Result<PushOutcome> {
        let access_token = self.access_token().await?;

        let payload = json!({
            "message": {
                "token": token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": message.data,
                "android": { "priority": "high" },
                "apns": { "payload": { "aps": { "sound": "default" } } },
            }
        });

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(PushOutcome::Delivered);
        }

        let body = response.text().await.unwrap_or_default();
        Ok(classify_failure(status.as_u16(), &body))
    }
}

/// Map an FCM error response onto a push outcome
fn classify_failure(status: u16, body: &str) -> PushOutcome {
    if status == 404
        || body.contains("UNREGISTERED")
        || body.contains("registration-token-not-registered")
    {
        PushOutcome::InvalidToken
    } else {
        PushOutcome::Failed(format!("FCM returned {}: {}", status, body))
    }
}

#[async_trait]
impl PushProvider for FirebaseService {
    async fn send(&self, token: &str, message: &PushMessage) -> PushOutcome {
        match self.deliver(token, message).await {
            Ok(outcome) => outcome,
            Err(e) => PushOutcome::Failed(e.to_string()),
        }
    }
}
