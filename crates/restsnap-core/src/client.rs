//! Fetch collaborator trait and the reqwest-backed controller client

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

/// External fetch collaborator driven by the walk engine.
///
/// `Ok(None)` signals "resource exists but has no body" and is treated
/// identically to an empty collection downstream.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Option<Value>>;
}

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Controller base URL; may carry a path prefix.
    pub base_url: String,
    /// API key for bearer authentication.
    pub api_key: Option<String>,
    /// Username for basic authentication.
    pub username: Option<String>,
    /// Password for basic authentication.
    pub password: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries for rate-limited or transient failures.
    pub max_retries: u32,
    /// Fallback delay for 429 responses without a Retry-After header.
    pub retry_after_secs: u64,
    /// Accept invalid TLS certificates (lab controllers).
    pub insecure: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            username: None,
            password: None,
            timeout_secs: 30,
            max_retries: 5,
            retry_after_secs: 60,
            insecure: false,
        }
    }
}

/// Controller HTTP client: bearer or basic auth, bounded retries with
/// Retry-After-aware rate-limit handling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    max_retries: u32,
    retry_after_secs: u64,
}

impl HttpClient {
    /// Create a client with default configuration and no credentials.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(HttpClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Create a client with API key authentication.
    pub fn with_api_key(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_config(HttpClientConfig {
            base_url: base_url.to_string(),
            api_key: Some(api_key.to_string()),
            ..Default::default()
        })
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|err| Error::Configuration(format!("invalid base URL: {}", err)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("restsnap/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            client,
            // Request URIs are concatenated, not URL-joined, so a path
            // prefix in the base survives.
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            username: config.username,
            password: config.password,
            max_retries: config.max_retries,
            retry_after_secs: config.retry_after_secs,
        })
    }

    /// Verify that usable credentials exist before traversal begins.
    ///
    /// Vendor-specific handshakes live outside the collector; an API key or
    /// a credential pair is all the walk engine requires up front.
    pub async fn authenticate(&self) -> Result<bool> {
        if self.api_key.is_none() && (self.username.is_none() || self.password.is_none()) {
            tracing::error!("no API key or username/password configured");
            return Ok(false);
        }
        tracing::info!(base_url = %self.base_url, "authentication configured");
        Ok(true)
    }

    fn add_auth_headers(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        } else if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let credentials = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            builder = builder.header("Authorization", format!("Basic {}", credentials));
        }
        builder
    }

    /// Execute a request with bounded retries: 429 honors Retry-After, 5xx
    /// and transport errors back off exponentially.
    async fn execute_with_retry(&self, builder: RequestBuilder) -> Result<Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let request = match builder.try_clone() {
                Some(cloned) => cloned,
                None => return builder.send().await.map_err(Error::Http),
            };

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                        let wait = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|value| value.to_str().ok())
                            .and_then(|value| value.parse::<u64>().ok())
                            .unwrap_or(self.retry_after_secs);
                        tracing::info!(url = %response.url(), wait, "rate limited, retrying");
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                        continue;
                    }
                    if status.is_server_error() && attempt < self.max_retries {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    let retryable = err.is_timeout() || err.is_connect() || err.is_request();
                    last_error = Some(err);
                    if retryable && attempt < self.max_retries {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    break;
                }
            }
        }

        match last_error {
            Some(err) => Err(Error::Http(err)),
            None => Err(Error::Network("request failed after retries".to_string())),
        }
    }
}

/// Exponential backoff capped at 3.2s.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(100u64 * (1u64 << attempt.min(5)))
}

#[async_trait]
impl Fetch for HttpClient {
    async fn fetch(&self, uri: &str) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, uri);
        tracing::debug!(%url, "GET");

        let builder = self.add_auth_headers(self.client.get(&url));
        let response = self.execute_with_retry(builder).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(%url, status = status.as_u16(), "GET failed");
            return Err(Error::Api {
                message,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&body)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}
