//! Thin authenticated wrapper around the Mapbox REST API.
//!
//! Every request gets the configured access token appended as the
//! `access_token` query parameter, and any status outside 200–399 is turned
//! into an [`ApiError`]. No retry and no pooling: each call opens a fresh
//! connection and failures go straight back to the caller.

use std::fmt;

use reqwest::header::{CONNECTION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{ApiError, ProviderError};

/// Base URL all relative endpoints are resolved against.
pub const MAPBOX_ENDPOINT: &str = "https://api.mapbox.com/";

pub const APPLICATION_JSON: &str = "application/json";

#[derive(Clone)]
pub struct Client {
    base_url: String,
    access_token: Option<String>,
    http: reqwest::Client,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Client {
    pub fn new(access_token: Option<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(MAPBOX_ENDPOINT, access_token)
    }

    /// Create a client against a non-default base URL (proxies, mock servers).
    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .user_agent(concat!("mapbox-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            access_token: access_token.filter(|t| !t.is_empty()),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a relative endpoint such as `tokens/v2/alice`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Send a request and classify the response.
    ///
    /// The content type header is only attached when there is a body: some
    /// endpoints reject bodyless requests that carry one.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
        content_type: &str,
    ) -> Result<Response, ProviderError> {
        let url = self.endpoint_url(endpoint);
        tracing::debug!(method = %method, endpoint, "sending request to Mapbox");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(CONNECTION, "close");

        if let Some(token) = &self.access_token {
            req = req.query(&[("access_token", token.as_str())]);
        }

        if let Some(body) = body {
            tracing::trace!(endpoint, bytes = body.len(), "with payload");
            if !content_type.is_empty() {
                req = req.header(CONTENT_TYPE, content_type);
            }
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        tracing::debug!(method = %method, endpoint, status, "received response");

        if !(200..400).contains(&status) {
            let body = resp.text().await?;
            tracing::debug!(endpoint, status, body = %body, "Mapbox request failed");
            return Err(ApiError::from_body(status, endpoint, &body).into());
        }

        Ok(resp)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Response, ProviderError> {
        self.request(Method::GET, endpoint, None, APPLICATION_JSON).await
    }

    pub async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<Response, ProviderError> {
        self.request(Method::POST, endpoint, Some(body), APPLICATION_JSON)
            .await
    }

    pub async fn patch(&self, endpoint: &str, body: Vec<u8>) -> Result<Response, ProviderError> {
        self.request(Method::PATCH, endpoint, Some(body), APPLICATION_JSON)
            .await
    }

    pub async fn put(&self, endpoint: &str, body: Vec<u8>) -> Result<Response, ProviderError> {
        self.request(Method::PUT, endpoint, Some(body), APPLICATION_JSON)
            .await
    }

    /// PUT without a body.
    pub async fn put_only(&self, endpoint: &str) -> Result<Response, ProviderError> {
        self.request(Method::PUT, endpoint, None, APPLICATION_JSON).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Response, ProviderError> {
        self.request(Method::DELETE, endpoint, None, APPLICATION_JSON)
            .await
    }
}

/// Serialize a request payload, naming `step` in the error.
pub fn encode_json<T: Serialize>(value: &T, step: &'static str) -> Result<Vec<u8>, ProviderError> {
    serde_json::to_vec(value).map_err(|source| ProviderError::Encode { step, source })
}

/// Read a response body fully and decode it, naming `step` in the error.
pub async fn decode_json<T: DeserializeOwned>(
    resp: Response,
    step: &'static str,
) -> Result<T, ProviderError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|source| ProviderError::Decode { step, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = Client::new(Some("pk.test".into())).unwrap();
        assert_eq!(client.base_url(), MAPBOX_ENDPOINT);
        assert_eq!(
            client.endpoint_url("tokens/v2/alice"),
            "https://api.mapbox.com/tokens/v2/alice"
        );
    }

    #[test]
    fn test_endpoint_url_joins_slashes() {
        let client = Client::with_base_url("http://127.0.0.1:9000", None).unwrap();
        assert_eq!(client.endpoint_url("/tokens/v2/a"), "http://127.0.0.1:9000/tokens/v2/a");
        let client = Client::with_base_url("http://127.0.0.1:9000/", None).unwrap();
        assert_eq!(client.endpoint_url("tokens/v2/a"), "http://127.0.0.1:9000/tokens/v2/a");
    }

    #[test]
    fn test_empty_token_is_not_configured() {
        let client = Client::new(Some(String::new())).unwrap();
        assert!(format!("{:?}", client).contains("access_token: None"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = Client::new(Some("sk.secret".into())).unwrap();
        let dbg = format!("{:?}", client);
        assert!(!dbg.contains("sk.secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_encode_json_names_step() {
        let body = encode_json(&serde_json::json!({"note": "n"}), "token create body").unwrap();
        assert_eq!(body, br#"{"note":"n"}"#);
    }
}
