use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequest, FromRequestParts, Request},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;
use crate::services::RequestOrigin;

/// JSON body that is deserialized and then checked with `validator`
///
/// Both kinds of failure are reported as 422 with a field error map.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            let mut errors = BTreeMap::new();
            errors.insert("body".to_string(), vec![e.body_text()]);
            AppError::Validation {
                message: "The given data was invalid".to_string(),
                errors,
            }
        }
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Expected a JSON request body".to_string())
        }
        other => AppError::BadRequest(other.body_text()),
    }
}

/// Client address and user agent, recorded in audit entries
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub RequestOrigin);

impl ClientInfo {
    pub fn origin(&self) -> &RequestOrigin {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(ClientInfo(RequestOrigin {
            ip_address: forwarded_ip(&parts.headers).or(peer),
            user_agent,
        }))
    }
}

/// First address of `X-Forwarded-For`, then `X-Real-IP`
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(first.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1, max = 5))]
        name: String,
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_validated_json_accepts_valid_body() {
        let ValidatedJson(payload) =
            ValidatedJson::<Payload>::from_request(json_request(r#"{"name":"abc"}"#), &())
                .await
                .unwrap();
        assert_eq!(payload.name, "abc");
    }

    #[tokio::test]
    async fn test_validated_json_rejects_long_field() {
        let result =
            ValidatedJson::<Payload>::from_request(json_request(r#"{"name":"abcdefgh"}"#), &())
                .await;
        match result {
            Err(AppError::Validation { errors, .. }) => assert!(errors.contains_key("name")),
            _ => panic!("expected validation error"),
        }
    }

    #[tokio::test]
    async fn test_validated_json_rejects_wrong_type() {
        let result =
            ValidatedJson::<Payload>::from_request(json_request(r#"{"name":5}"#), &()).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_forwarded_ip_prefers_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("203.0.113.7"));

        headers.remove("x-forwarded-for");
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("10.0.0.2"));
    }
}
