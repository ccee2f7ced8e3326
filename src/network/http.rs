//! Shared HTTP plumbing for every backend.
//!
//! All backends go through [`HttpClient`] so status handling is uniform:
//! anything outside 2xx becomes [`Error::RemoteService`] carrying the status,
//! the URL and the response text.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("bns-tx/", env!("CARGO_PKG_VERSION"));

// ═══════════════════════════════════════════════════════════════════════════════
// ACKNOWLEDGEMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A backend's acceptance of a submitted transaction or zone file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastAck {
    /// HTTP status of the accepting response
    pub status: u16,
    /// Response body, parsed as JSON when possible, otherwise a JSON string
    pub body: serde_json::Value,
}

impl BroadcastAck {
    /// Build from a successful response
    pub async fn from_response(response: Response) -> Result<Self> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        Ok(Self { status, body })
    }

    /// Embedded `error` field of a JSON body, if any
    pub fn embedded_error(&self) -> Option<&serde_json::Value> {
        self.body.get("error").filter(|e| !e.is_null())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Thin wrapper over a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Create a client with the given request timeout
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { inner })
    }

    /// GET without status checking
    pub async fn get(&self, url: &str) -> Result<Response> {
        debug!(url, "GET");
        Ok(self.inner.get(url).send().await?)
    }

    /// GET and decode a JSON body, failing on non-2xx
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = ensure_success(url, self.get(url).await?).await?;
        decode_json(url, response).await
    }

    /// POST a JSON body without status checking
    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        debug!(url, "POST json");
        Ok(self.inner.post(url).json(body).send().await?)
    }

    /// POST a single url-encoded form field without status checking
    pub async fn post_form_field(&self, url: &str, field: &str, value: &str) -> Result<Response> {
        debug!(url, field, "POST form");
        Ok(self.inner.post(url).form(&[(field, value)]).send().await?)
    }
}

/// Pass 2xx responses through; turn everything else into `RemoteService`
pub async fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(url, status = status.as_u16(), "remote service rejected request");
    Err(Error::RemoteService {
        status: status.as_u16(),
        url: url.to_string(),
        body,
    })
}

/// Decode a JSON response body
pub async fn decode_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| Error::Deserialization(format!("{}: {}", url, e)))
}

/// Submit with a POST and require both a 2xx status and no embedded `error`
pub async fn acknowledge(url: &str, response: Response) -> Result<BroadcastAck> {
    let ack = BroadcastAck::from_response(ensure_success(url, response).await?).await?;
    if ack.embedded_error().is_some() {
        warn!(url, status = ack.status, "remote service reported an error in a success response");
        return Err(Error::RemoteService {
            status: ack.status,
            url: url.to_string(),
            body: ack.body.to_string(),
        });
    }
    Ok(ack)
}

/// Join a base URL and a path without doubling slashes
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.org/", "/v1/x"), "https://a.org/v1/x");
        assert_eq!(join_url("https://a.org", "v1/x"), "https://a.org/v1/x");
    }

    #[test]
    fn test_embedded_error() {
        let ack = BroadcastAck {
            status: 200,
            body: serde_json::json!({"error": "core indicates an error like this"}),
        };
        assert!(ack.embedded_error().is_some());

        let ack = BroadcastAck { status: 202, body: serde_json::json!({}) };
        assert!(ack.embedded_error().is_none());

        let ack = BroadcastAck {
            status: 202,
            body: serde_json::Value::String("transaction submitted".into()),
        };
        assert!(ack.embedded_error().is_none());
    }
}
