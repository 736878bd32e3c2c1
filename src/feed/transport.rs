//! Feed transports.
//!
//! A feed is retrieved through an ordered chain of strategies: a plain GET
//! first, then any configured relays. The first strategy that returns a body
//! wins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::FeedsConfig;
use crate::error::{PresswatchError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Placeholder replaced by the percent-encoded feed URL in relay templates.
pub const URL_PLACEHOLDER: &str = "{url}";

/// A way of retrieving the raw bytes of a feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> String;

    /// Retrieve the feed body.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Build the HTTP client shared by all strategies.
pub fn build_client(config: &FeedsConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(config.timeout_secs)))
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| PresswatchError::Feed(format!("failed to create HTTP client: {}", e)))
}

/// GET `url` and return the body, enforcing a size limit.
async fn get_limited(client: &Client, url: &str, max_size: u64) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PresswatchError::Feed(format!("failed to fetch feed: {}", e)))?;

    if !response.status().is_success() {
        return Err(PresswatchError::Feed(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    if let Some(content_length) = response.content_length() {
        if content_length > max_size {
            return Err(PresswatchError::Feed(format!(
                "feed too large: {} bytes (max {} bytes)",
                content_length, max_size
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PresswatchError::Feed(format!("failed to read response: {}", e)))?;

    // Chunked responses carry no length header
    if bytes.len() as u64 > max_size {
        return Err(PresswatchError::Feed(format!(
            "feed too large: {} bytes (max {} bytes)",
            bytes.len(),
            max_size
        )));
    }

    Ok(bytes.to_vec())
}

/// Plain GET of the feed URL.
pub struct Direct {
    client: Client,
    max_size: u64,
}

impl Direct {
    /// Create a direct transport.
    pub fn new(client: Client, max_size: u64) -> Self {
        Self { client, max_size }
    }
}

#[async_trait]
impl FeedTransport for Direct {
    fn name(&self) -> String {
        "direct".to_string()
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        get_limited(&self.client, url, self.max_size).await
    }
}

/// GET through a relay such as `https://api.allorigins.win/raw?url={url}`.
pub struct Relay {
    client: Client,
    template: String,
    max_size: u64,
}

impl Relay {
    /// Create a relay transport from a URL template containing `{url}`.
    pub fn new(client: Client, template: impl Into<String>, max_size: u64) -> Self {
        Self {
            client,
            template: template.into(),
            max_size,
        }
    }

    /// The relay URL for a given feed URL.
    pub fn relay_url(&self, url: &str) -> String {
        self.template
            .replace(URL_PLACEHOLDER, &urlencoding::encode(url))
    }
}

#[async_trait]
impl FeedTransport for Relay {
    fn name(&self) -> String {
        match url::Url::parse(&self.template) {
            Ok(u) => format!("relay {}", u.host_str().unwrap_or("?")),
            Err(_) => "relay".to_string(),
        }
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        get_limited(&self.client, &self.relay_url(url), self.max_size).await
    }
}

/// Ordered fallback list of transports.
pub struct TransportChain {
    strategies: Vec<Box<dyn FeedTransport>>,
}

impl TransportChain {
    /// Create a chain from explicit strategies.
    pub fn new(strategies: Vec<Box<dyn FeedTransport>>) -> Self {
        Self { strategies }
    }

    /// Direct first, then each configured relay in order.
    pub fn from_config(config: &FeedsConfig) -> Result<Self> {
        let client = build_client(config)?;
        let max_size = config.max_feed_size_bytes;

        let mut strategies: Vec<Box<dyn FeedTransport>> =
            vec![Box::new(Direct::new(client.clone(), max_size))];
        for template in &config.relays {
            strategies.push(Box::new(Relay::new(client.clone(), template, max_size)));
        }

        Ok(Self::new(strategies))
    }

    /// Number of strategies in the chain.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the chain has no strategies.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl FeedTransport for TransportChain {
    fn name(&self) -> String {
        let names: Vec<String> = self.strategies.iter().map(|s| s.name()).collect();
        names.join(" -> ")
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_error =
            PresswatchError::Feed("no transport strategies configured".to_string());

        for strategy in &self.strategies {
            match strategy.get(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    debug!(strategy = %strategy.name(), url, error = %e, "Transport failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
