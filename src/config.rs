//! Configuration module for presswatch.

use serde::Deserialize;
use std::path::Path;

use crate::{PresswatchError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/presswatch.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/presswatch.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (required to serve).
    #[serde(default)]
    pub jwt_secret: String,
    /// Session token lifetime in days.
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: u64,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

fn default_token_expiry_days() -> u64 {
    7
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            token_expiry_days: default_token_expiry_days(),
        }
    }
}

/// A single configured feed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    /// Label shown as the article source.
    pub label: String,
    /// Feed URL.
    pub url: String,
    /// Whether articles must pass the keyword check.
    #[serde(default)]
    pub filtered: bool,
    /// Number of entries read from the top of the feed.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

fn default_fetch_limit() -> usize {
    10
}

impl FeedSource {
    /// Create a feed source.
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            filtered: false,
            fetch_limit: default_fetch_limit(),
        }
    }

    /// Mark the feed as keyword-filtered.
    pub fn filtered(mut self) -> Self {
        self.filtered = true;
        self
    }

    /// Set the fetch limit.
    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }
}

/// Feed pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Configured feeds, in priority order.
    #[serde(default = "default_sources")]
    pub sources: Vec<FeedSource>,
    /// Relevance keywords for filtered feeds.
    #[serde(default = "default_relevance_keywords")]
    pub keywords: Vec<String>,
    /// Relay URL templates tried after a direct fetch fails (`{url}` is replaced).
    #[serde(default)]
    pub relays: Vec<String>,
    /// Accepted articles per filtered feed.
    #[serde(default = "default_max_relevant")]
    pub max_relevant_per_filtered_feed: usize,
    /// Articles kept in the final document.
    #[serde(default = "default_max_total")]
    pub max_total: usize,
    /// Maximum description length in characters.
    #[serde(default = "default_max_description")]
    pub max_description_length: usize,
    /// Total request timeout in seconds.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User agent sent with feed requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allow feeds on private or loopback hosts.
    #[serde(default)]
    pub allow_private_hosts: bool,
    /// Exit non-zero when every feed failed.
    #[serde(default)]
    pub fail_when_all_feeds_fail: bool,
    /// Path of the JSON artifact.
    #[serde(default = "default_json_output")]
    pub json_output: String,
    /// Path of the HTML dashboard.
    #[serde(default = "default_html_output")]
    pub html_output: String,
    /// Marker opening the injected data block.
    #[serde(default = "default_marker_start")]
    pub marker_start: String,
    /// Marker closing the injected data block.
    #[serde(default = "default_marker_end")]
    pub marker_end: String,
}

fn default_max_relevant() -> usize {
    5
}

fn default_max_total() -> usize {
    50
}

fn default_max_description() -> usize {
    400
}

fn default_feed_timeout() -> u64 {
    15
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; HPPFeedBot/1.0)".to_string()
}

fn default_json_output() -> String {
    "feeds.json".to_string()
}

fn default_html_output() -> String {
    "index.html".to_string()
}

fn default_marker_start() -> String {
    "/* __FEEDS_DATA_START__ */".to_string()
}

fn default_marker_end() -> String {
    "/* __FEEDS_DATA_END__ */".to_string()
}

fn default_relevance_keywords() -> Vec<String> {
    [
        // HPP technology
        "high pressure processing",
        " hpp ",
        "hpp-",
        "hpp:",
        "hpp\u{2014}",
        "pascalization",
        "ultra-high pressure",
        "cold pressed",
        "hyperbaric",
        // Manufacturers
        "hiperbaric",
        "quintus",
        "avure",
        "nc hyperbaric",
        "stansted fluid",
        // Food safety
        "listeria",
        "salmonella",
        "e. coli",
        "e.coli",
        "campylobacter",
        "food recall",
        "food safety alert",
        "food contamination",
        "contamination recall",
        "outbreak",
        "pathogen",
        "foodborne",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

const GOOGLE_NEWS_US: &str = "https://news.google.com/rss/search?hl=en-US&gl=US&ceid=US:en&q=";
const GOOGLE_NEWS_UK: &str = "https://news.google.com/rss/search?hl=en-GB&gl=GB&ceid=GB:en&q=";

/// (label, url, filtered, fetch limit)
const DEFAULT_DIRECT_FEEDS: &[(&str, &str, bool, usize)] = &[
    (
        "Hiperbaric Blog",
        "https://www.hiperbaric.com/en/hpp-technology/hpp-blog/rss.xml",
        false,
        10,
    ),
    ("Food Safety News", "https://www.foodsafetynews.com/feed", true, 20),
    ("New Food Magazine", "https://www.newfoodmagazine.com/feed", true, 20),
    ("Food Dive", "https://www.fooddive.com/feeds/news/", true, 20),
    (
        "FoodNavigator EU",
        "https://www.foodnavigator.com/Info/FoodNavigator-RSS",
        true,
        20,
    ),
    (
        "FoodNavigator USA",
        "https://www.foodnavigator-usa.com/Info/FoodNavigator-USA-RSS",
        true,
        20,
    ),
    (
        "Food Manufacture UK",
        "https://www.foodmanufacture.co.uk/Info/FoodManufacture-RSS",
        true,
        20,
    ),
    ("EFSA Food Safety", "https://www.efsa.europa.eu/en/news/rss", true, 20),
    (
        "UK Food Standards Agency",
        "https://www.food.gov.uk/news-alerts/feed",
        true,
        20,
    ),
];

const DEFAULT_US_SEARCHES: &[(&str, &str)] = &[
    ("Hiperbaric News", "Hiperbaric+%22high+pressure%22"),
    (
        "Quintus Technologies",
        "%22Quintus+Technologies%22+%22high+pressure%22",
    ),
    (
        "HPP Equipment Makers",
        "%22Avure%22+OR+%22NC+Hyperbaric%22+OR+%22Stansted+Fluid%22+%22high+pressure%22",
    ),
    (
        "HPP Manufacturers",
        "%22high+pressure+processing%22+manufacturer+OR+equipment+OR+machine",
    ),
    (
        "Listeria Outbreaks",
        "listeria+outbreak+food+recall+contamination",
    ),
    (
        "Salmonella Outbreaks",
        "salmonella+outbreak+food+recall+contamination",
    ),
    (
        "HPP Healthcare & Medical",
        "%22high+pressure+processing%22+medical+OR+healthcare+OR+pharmaceutical+OR+biotech",
    ),
    (
        "HPP Cosmetics & Beauty",
        "%22high+pressure+processing%22+cosmetics+OR+skincare+OR+beauty+OR+%22personal+care%22",
    ),
    (
        "HPP Dairy",
        "%22high+pressure%22+dairy+OR+milk+OR+cheese+OR+yogurt+processing",
    ),
    (
        "HPP Seafood",
        "%22high+pressure%22+seafood+OR+shellfish+OR+oyster+OR+shrimp+processing",
    ),
    (
        "HPP Juices & Beverages",
        "%22high+pressure%22+juice+OR+beverage+OR+smoothie+OR+cold-pressed",
    ),
    (
        "HPP Meat & Deli",
        "%22high+pressure%22+meat+OR+deli+OR+charcuterie+OR+%22ready-to-eat%22+processing",
    ),
    (
        "HPP Soups & Meals",
        "%22high+pressure%22+soup+OR+%22ready+meal%22+OR+%22prepared+food%22+processing",
    ),
    (
        "HPP Innovation & Research",
        "%22high+pressure+processing%22+innovation+OR+research+OR+study+OR+technology",
    ),
];

const DEFAULT_UK_SEARCHES: &[(&str, &str)] = &[
    (
        "UK HPP Industry",
        "%22high+pressure+processing%22+UK+OR+Britain+OR+England",
    ),
    (
        "UK & EU Food Safety",
        "food+safety+recall+contamination+UK+OR+Europe+OR+EFSA",
    ),
    (
        "EU HPP & Food Tech",
        "%22high+pressure%22+food+technology+Europe+OR+EU+OR+European",
    ),
    (
        "UK Food Industry News",
        "food+drink+industry+UK+processing+innovation",
    ),
];

/// Google News searches are already scoped by their query, so they are unfiltered.
fn default_sources() -> Vec<FeedSource> {
    let direct = DEFAULT_DIRECT_FEEDS
        .iter()
        .map(|&(label, url, filtered, limit)| FeedSource {
            label: label.to_string(),
            url: url.to_string(),
            filtered,
            fetch_limit: limit,
        });
    let us = DEFAULT_US_SEARCHES
        .iter()
        .map(|&(label, q)| FeedSource::new(label, format!("{GOOGLE_NEWS_US}{q}")).with_fetch_limit(5));
    let uk = DEFAULT_UK_SEARCHES
        .iter()
        .map(|&(label, q)| FeedSource::new(label, format!("{GOOGLE_NEWS_UK}{q}")).with_fetch_limit(5));

    direct.chain(us).chain(uk).collect()
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            keywords: default_relevance_keywords(),
            relays: vec![],
            max_relevant_per_filtered_feed: default_max_relevant(),
            max_total: default_max_total(),
            max_description_length: default_max_description(),
            timeout_secs: default_feed_timeout(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
            allow_private_hosts: false,
            fail_when_all_feeds_fail: false,
            json_output: default_json_output(),
            html_output: default_html_output(),
            marker_start: default_marker_start(),
            marker_end: default_marker_end(),
        }
    }
}

/// Mailbox monitor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Keywords searched for (subject, body, sender).
    #[serde(default = "default_monitor_keywords")]
    pub keywords: Vec<String>,
    /// Recipient of the digest.
    #[serde(default = "default_recipient")]
    pub recipient: String,
    /// OAuth client credentials file.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
    /// Stored OAuth token file.
    #[serde(default = "default_token_file")]
    pub token_file: String,
    /// File holding the last successful run as epoch seconds.
    #[serde(default = "default_last_run_file")]
    pub last_run_file: String,
    /// Maximum snippet length in the digest.
    #[serde(default = "default_snippet_max_len")]
    pub snippet_max_len: usize,
    /// Messages requested per list page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Gmail API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds.
    #[serde(default = "default_monitor_timeout")]
    pub timeout_secs: u64,
}

fn default_monitor_keywords() -> Vec<String> {
    [
        "HPP",
        "high pressure processing",
        "high-pressure processing",
        "pascalisation",
        "pascalization",
        "Hiperbaric",
        "Quintus",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_recipient() -> String {
    "alerts@example.com".to_string()
}

fn default_credentials_file() -> String {
    "credentials.json".to_string()
}

fn default_token_file() -> String {
    "token.json".to_string()
}

fn default_last_run_file() -> String {
    ".last_run_timestamp".to_string()
}

fn default_snippet_max_len() -> usize {
    300
}

fn default_page_size() -> u32 {
    100
}

fn default_api_base() -> String {
    "https://gmail.googleapis.com".to_string()
}

fn default_monitor_timeout() -> u64 {
    30
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            keywords: default_monitor_keywords(),
            recipient: default_recipient(),
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
            last_run_file: default_last_run_file(),
            snippet_max_len: default_snippet_max_len(),
            page_size: default_page_size(),
            api_base: default_api_base(),
            timeout_secs: default_monitor_timeout(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed pipeline configuration.
    #[serde(default)]
    pub feeds: FeedsConfig,
    /// Mailbox monitor configuration.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PresswatchError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PresswatchError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PRESSWATCH_JWT_SECRET`: Override the JWT secret key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("PRESSWATCH_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.web.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the settings needed to serve the API.
    pub fn validate_web(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(PresswatchError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via PRESSWATCH_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.web.token_expiry_days == 0 {
            return Err(PresswatchError::Config(
                "token_expiry_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the feed pipeline settings.
    pub fn validate_feeds(&self) -> Result<()> {
        let feeds = &self.feeds;
        if feeds.marker_start.is_empty() || feeds.marker_end.is_empty() {
            return Err(PresswatchError::Config(
                "feed markers must not be empty".to_string(),
            ));
        }
        if feeds.marker_start == feeds.marker_end {
            return Err(PresswatchError::Config(
                "marker_start and marker_end must differ".to_string(),
            ));
        }
        if feeds.timeout_secs == 0 {
            return Err(PresswatchError::Config(
                "feeds.timeout_secs must be at least 1".to_string(),
            ));
        }
        if let Some(relay) = feeds.relays.iter().find(|r| !r.contains("{url}")) {
            return Err(PresswatchError::Config(format!(
                "relay template has no {{url}} placeholder: {relay}"
            )));
        }
        Ok(())
    }
}
