//! Plain HTTP fetching for sources that do not need a browser
//!
//! Every request goes through the shared `RateLimiter` under the fetcher's
//! consumer key and carries a user agent picked at random from the
//! configured list.

use super::AdapterError;
use crate::config::HttpConfig;
use crate::pool::RateLimiter;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Builds the HTTP client shared by every adapter
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(user_agent) = config.user_agents.first() {
        builder = builder.user_agent(user_agent.clone());
    }

    builder.build()
}

/// Rate-limited GET requests on behalf of one consumer
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    settings: Arc<HttpConfig>,
    limiter: Arc<RateLimiter>,
    consumer: String,
}

impl Fetcher {
    pub fn new(
        client: Client,
        settings: Arc<HttpConfig>,
        limiter: Arc<RateLimiter>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            client,
            settings,
            limiter,
            consumer: consumer.into(),
        }
    }

    /// Rate limiter key for this fetcher
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    fn pick_user_agent(&self) -> Option<String> {
        self.settings
            .user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
    }

    /// Fetches `url` and returns the response body
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Body of a 2xx response
    /// * `Err(AdapterError::NotFound)` - HTTP 404
    /// * `Err(AdapterError::Http)` - Any other non-success status
    /// * `Err(AdapterError::Timeout | Unavailable | Network)` - Transport failures
    pub async fn get_text(&self, url: &str) -> Result<String, AdapterError> {
        self.limiter.throttle(&self.consumer).await;

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, self.settings.accept_language.as_str());
        if let Some(user_agent) = self.pick_user_agent() {
            request = request.header(USER_AGENT, user_agent);
        }

        let response = request.send().await.map_err(|e| classify(url, e))?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AdapterError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(AdapterError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::trace!("GET {} -> {}", url, status);
        response.text().await.map_err(|e| classify(url, e))
    }

    /// Fetches `url` and decodes a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AdapterError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON from {}: {}", url, e)))
    }
}

fn classify(url: &str, e: reqwest::Error) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Timeout(url.to_string())
    } else if e.is_connect() {
        AdapterError::Unavailable(format!("connection failed for {}", url))
    } else {
        AdapterError::Network(e.to_string())
    }
}
