//! Thin JSON client for the Google Cloud REST APIs
//!
//! Each submodule carries the wire types of one API together with the URL
//! builders the external clients use. [`GcpClient`] handles bearer auth and
//! turns Google's error envelope into [`OperatorError::Gcp`].

pub mod auth;
pub mod compute;
pub mod iam;
pub mod kms;
pub mod pubsub;
pub mod redis;
pub mod sqladmin;
pub mod storage;

use crate::error::{OperatorError, Result};
use auth::TokenSource;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Authenticated JSON client shared by all GCP API wrappers.
#[derive(Clone)]
pub struct GcpClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
}

impl GcpClient {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>) -> Self {
        Self { http, tokens }
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send(self.http.request(Method::GET, url)).await
    }

    pub async fn post<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.request(Method::POST, url).json(body)).await
    }

    pub async fn put<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.request(Method::PUT, url).json(body)).await
    }

    pub async fn patch<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.request(Method::PATCH, url).json(body)).await
    }

    /// DELETE, discarding whatever operation or empty body comes back.
    pub async fn delete(&self, url: &str) -> Result<()> {
        let _: Value = self.send(self.http.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let token = self.tokens.token().await?;
        let response = request
            .header(ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        let url = response.url().clone();
        let body = response.bytes().await?;
        debug!(%status, url = %url, "GCP API response");

        if !status.is_success() {
            return Err(decode_error(status, &body));
        }
        decode_body(&body)
    }
}

/// Decode a success body; an empty body decodes as JSON `null`.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(body)?)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Turn a non-2xx response into an error, preferring Google's envelope.
pub fn decode_error(status: StatusCode, body: &[u8]) -> OperatorError {
    let message = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(s) if !s.is_empty() => format!("{} ({})", envelope.error.message, s),
            _ => envelope.error.message,
        },
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    };
    OperatorError::Gcp {
        code: status.as_u16(),
        message: if message.is_empty() {
            status.to_string()
        } else {
            message
        },
    }
}

/// Last path segment of a GCP resource name or self-link.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Parse a uint64 that GCP transmits as a JSON string.
pub fn parse_id(id: Option<&str>) -> Option<u64> {
    id.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_error_envelope() {
        let body = br#"{"error": {"code": 404, "message": "The resource 'x' was not found", "status": "NOT_FOUND"}}"#;
        let err = decode_error(StatusCode::NOT_FOUND, body);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "GCP API error 404: The resource 'x' was not found (NOT_FOUND)"
        );
    }

    #[test]
    fn test_decode_error_plain_body() {
        let err = decode_error(StatusCode::BAD_GATEWAY, b"upstream failed\n");
        assert_eq!(err.to_string(), "GCP API error 502: upstream failed");
    }

    #[test]
    fn test_decode_error_empty_body() {
        let err = decode_error(StatusCode::CONFLICT, b"");
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "GCP API error 409: 409 Conflict");
    }

    #[test]
    fn test_decode_empty_body() {
        let v: Value = decode_body(b"").unwrap();
        assert_eq!(v, Value::Null);
        let opt: Option<compute::Network> = decode_body(b"  ").unwrap();
        assert!(opt.is_none());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(
            last_segment("https://www.googleapis.com/compute/v1/projects/p/global/networks/net"),
            "net"
        );
        assert_eq!(last_segment("plain"), "plain");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some("1234567890123")), Some(1234567890123));
        assert_eq!(parse_id(Some("abc")), None);
        assert_eq!(parse_id(None), None);
    }
}
