//! Gmail search, message parsing and sending.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{error, info};

use crate::error::{PresswatchError, Result};

/// Null or missing lists deserialize as empty.
fn deserialize_null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Reference to a message in a list result.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    /// Message ID.
    pub id: String,
}

/// One page of a message search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Matching messages on this page.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub messages: Vec<MessageRef>,
    /// Token for the next page, if any.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A message header.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Body of a MIME part.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    /// Base64url-encoded content.
    #[serde(default)]
    pub data: Option<String>,
}

/// A MIME part; the top-level payload is one too.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Headers of this part.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub headers: Vec<MessageHeader>,
    /// Body of this part.
    #[serde(default)]
    pub body: PartBody,
    /// Child parts.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub parts: Vec<MessagePart>,
}

/// A full message as returned with `format=full`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    /// Message ID.
    pub id: String,
    /// Receive time in epoch milliseconds, as a decimal string.
    #[serde(default)]
    pub internal_date: Option<String>,
    /// Short plain-text excerpt computed by the API.
    #[serde(default)]
    pub snippet: Option<String>,
    /// MIME tree.
    #[serde(default)]
    pub payload: MessagePart,
}

impl GmailMessage {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Receive time in epoch seconds; 0 when absent or unparseable.
    pub fn epoch(&self) -> i64 {
        self.internal_date
            .as_deref()
            .and_then(|d| d.trim().parse::<i64>().ok())
            .map(|ms| ms / 1000)
            .unwrap_or(0)
    }
}

/// A message matching the search, ready for the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMatch {
    /// Message ID.
    pub id: String,
    /// Subject header.
    pub subject: String,
    /// From header.
    pub sender: String,
    /// Date header, verbatim.
    pub date: String,
    /// Receive time in epoch seconds.
    pub epoch: i64,
    /// Cleaned, length-capped excerpt.
    pub snippet: String,
}

/// Operations the monitor needs from a mailbox.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// One page of messages matching `query`.
    async fn list_messages(&self, query: &str, page_token: Option<&str>) -> Result<MessagePage>;

    /// Fetch a full message.
    async fn get_message(&self, id: &str) -> Result<GmailMessage>;

    /// Send a raw RFC 2822 message, base64url-encoded.
    async fn send_raw(&self, raw: &str) -> Result<()>;
}

/// Gmail REST API client.
pub struct GmailClient {
    http: Client,
    base_url: String,
    access_token: String,
    page_size: u32,
}

impl GmailClient {
    /// Create a client for the authenticated user.
    pub fn new(http: Client, base_url: &str, access_token: impl Into<String>, page_size: u32) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            page_size,
        }
    }

    /// Build the HTTP client used for mailbox and token calls.
    pub fn http_client(timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PresswatchError::Mail(format!("failed to create HTTP client: {}", e)))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me{}", self.base_url, path)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| PresswatchError::Mail(format!("invalid API response: {}", e)))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(PresswatchError::Mail(format!(
                "Gmail API error {}: {}",
                status.as_u16(),
                message
            )))
        }
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_messages(&self, query: &str, page_token: Option<&str>) -> Result<MessagePage> {
        let page_size = self.page_size.to_string();
        let mut params = vec![("q", query), ("maxResults", page_size.as_str())];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response = self
            .http
            .get(self.api_url("/messages"))
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| PresswatchError::Mail(format!("message list failed: {}", e)))?;

        Self::handle_response(response).await
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let response = self
            .http
            .get(self.api_url(&format!("/messages/{}", urlencoding::encode(id))))
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| PresswatchError::Mail(format!("message fetch failed: {}", e)))?;

        Self::handle_response(response).await
    }

    async fn send_raw(&self, raw: &str) -> Result<()> {
        let response = self
            .http
            .post(self.api_url("/messages/send"))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| PresswatchError::Mail(format!("send failed: {}", e)))?;

        Self::handle_response::<serde_json::Value>(response).await?;
        Ok(())
    }
}

/// Format epoch seconds as a Gmail `after:` date (`YYYY/MM/DD`, UTC).
///
/// ```
/// use presswatch::monitor::epoch_to_gmail_date;
///
/// assert_eq!(epoch_to_gmail_date(1_700_000_000), "2023/11/14");
/// ```
pub fn epoch_to_gmail_date(epoch: i64) -> String {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .unwrap_or_default()
        .format("%Y/%m/%d")
        .to_string()
}

/// Build the search query: keywords OR-ed together, multi-word or
/// hyphenated ones quoted, plus an `after:` filter when `since > 0`.
pub fn build_query(keywords: &[String], since: i64) -> String {
    let terms: Vec<String> = keywords
        .iter()
        .map(|kw| {
            if kw.contains(' ') || kw.contains('-') {
                format!("\"{}\"", kw)
            } else {
                kw.clone()
            }
        })
        .collect();

    let mut query = format!("({})", terms.join(" OR "));
    if since > 0 {
        query.push_str(" after:");
        query.push_str(&epoch_to_gmail_date(since));
    }
    query
}

fn first_plain_text(part: &MessagePart) -> Option<String> {
    if part.mime_type == "text/plain" {
        if let Some(data) = part.body.data.as_deref().filter(|d| !d.is_empty()) {
            if let Ok(bytes) = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')) {
                let text = String::from_utf8_lossy(&bytes).trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }

    part.parts.iter().find_map(first_plain_text)
}

/// Collapse whitespace and cap at `max` characters, appending `…` when cut.
pub fn clean_snippet(text: &str, max: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    match cleaned.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &cleaned[..idx]),
        None => cleaned,
    }
}

/// The first `text/plain` part of the message, else the API snippet.
pub fn extract_snippet(msg: &GmailMessage, max: usize) -> String {
    let text = first_plain_text(&msg.payload)
        .or_else(|| msg.snippet.clone())
        .unwrap_or_default();
    clean_snippet(&text, max)
}

/// Turn a full message into a digest entry.
pub fn parse_message(msg: &GmailMessage, snippet_max: usize) -> MailMatch {
    MailMatch {
        id: msg.id.clone(),
        subject: msg.header("subject").unwrap_or("(no subject)").to_string(),
        sender: msg.header("from").unwrap_or("(unknown sender)").to_string(),
        date: msg.header("date").unwrap_or_default().to_string(),
        epoch: msg.epoch(),
        snippet: extract_snippet(msg, snippet_max),
    }
}

/// Find messages matching `keywords` received strictly after `since`,
/// newest first.
///
/// A failing list call aborts the search; a message that cannot be fetched
/// is logged and skipped.
pub async fn search(
    mailbox: &dyn Mailbox,
    keywords: &[String],
    since: i64,
    snippet_max: usize,
) -> Result<Vec<MailMatch>> {
    let query = build_query(keywords, since);
    info!("Gmail query: {}", query);

    let mut refs = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = mailbox.list_messages(&query, page_token.as_deref()).await?;
        refs.extend(page.messages);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    info!("Found {} candidate message(s)", refs.len());

    let mut matches = Vec::new();
    for msg_ref in refs {
        match mailbox.get_message(&msg_ref.id).await {
            Ok(msg) => {
                let parsed = parse_message(&msg, snippet_max);
                if parsed.epoch > since {
                    matches.push(parsed);
                }
            }
            Err(e) => error!(id = %msg_ref.id, error = %e, "Could not fetch message"),
        }
    }

    matches.sort_by(|a, b| b.epoch.cmp(&a.epoch));
    info!("{} new message(s) after timestamp filter", matches.len());
    Ok(matches)
}
