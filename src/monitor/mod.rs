//! Mailbox monitor.
//!
//! One pass per invocation: search the mailbox for keyword matches received
//! since the last run, mail a digest of them, then record the run.

pub mod digest;
pub mod gmail;
pub mod oauth;
pub mod state;

use std::path::Path;

use chrono::Utc;
use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::error::Result;

pub use digest::{build_digest, build_mime, digest_subject, encode_raw, escape_html, Digest};
pub use gmail::{
    build_query, clean_snippet, epoch_to_gmail_date, extract_snippet, parse_message, search,
    GmailClient, GmailMessage, MailMatch, Mailbox, MessagePage,
};
pub use oauth::{authorize, ClientSecrets, StoredToken};
pub use state::{load_last_run, save_last_run};

/// Command-line switches for a monitor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Stop after authorization.
    pub auth_only: bool,
    /// Print the digest instead of sending it, and leave the timestamp alone.
    pub dry_run: bool,
    /// Search from this epoch instead of the stored timestamp.
    pub since: Option<i64>,
}

/// Outcome of a monitor run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// Messages found.
    pub matches: usize,
    /// Whether the digest was sent.
    pub sent: bool,
    /// Plain-text digest produced by a dry run with matches.
    pub dry_run_digest: Option<String>,
    /// Timestamp written to the state file, if any.
    pub saved_timestamp: Option<i64>,
}

/// Search, report and record once against `mailbox`.
pub async fn run_pass(
    mailbox: &dyn Mailbox,
    config: &MonitorConfig,
    options: MonitorOptions,
) -> Result<MonitorReport> {
    let state_path = Path::new(&config.last_run_file);
    let since = match options.since {
        Some(since) => since,
        None => load_last_run(state_path),
    };
    let run_start = Utc::now().timestamp();

    let matches = search(mailbox, &config.keywords, since, config.snippet_max_len).await?;
    let mut report = MonitorReport {
        matches: matches.len(),
        ..MonitorReport::default()
    };

    if matches.is_empty() {
        info!("No new matching messages since last run");
    } else {
        info!(count = matches.len(), "Preparing digest");
        let digest = build_digest(&matches, Utc::now());

        if options.dry_run {
            info!("Dry run, digest not sent");
            report.dry_run_digest = Some(digest.plain);
        } else {
            let raw = encode_raw(&build_mime(&digest, &config.recipient));
            match mailbox.send_raw(&raw).await {
                Ok(()) => {
                    info!(recipient = %config.recipient, count = matches.len(), "Digest sent");
                    report.sent = true;
                }
                Err(e) => error!(error = %e, "Failed to send digest"),
            }
        }
    }

    if !options.dry_run {
        save_last_run(state_path, run_start)?;
        report.saved_timestamp = Some(run_start);
    }

    Ok(report)
}

/// Authorize against the Gmail API and run one pass.
pub async fn run(config: &MonitorConfig, options: MonitorOptions) -> Result<MonitorReport> {
    info!("Mail monitor starting");

    let http = GmailClient::http_client(config.timeout_secs)?;
    let token = authorize(
        &http,
        Path::new(&config.credentials_file),
        Path::new(&config.token_file),
    )
    .await?;

    if options.auth_only {
        info!("Authorization complete");
        return Ok(MonitorReport::default());
    }

    let client = GmailClient::new(http, &config.api_base, token.access_token, config.page_size);
    let report = run_pass(&client, config, options).await?;

    info!(matches = report.matches, sent = report.sent, "Mail monitor finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PresswatchError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeMailbox {
        messages: Vec<serde_json::Value>,
        fail_list: bool,
        fail_send: bool,
        sent: Mutex<Vec<String>>,
    }

    impl FakeMailbox {
        fn new(messages: Vec<serde_json::Value>) -> Self {
            Self {
                messages,
                fail_list: false,
                fail_send: false,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailbox for FakeMailbox {
        async fn list_messages(&self, _query: &str, _page_token: Option<&str>) -> Result<MessagePage> {
            if self.fail_list {
                return Err(PresswatchError::Mail("list failed".to_string()));
            }
            let page = serde_json::json!({
                "messages": self.messages.iter().map(|m| serde_json::json!({"id": m["id"]})).collect::<Vec<_>>()
            });
            Ok(serde_json::from_value(page).unwrap())
        }

        async fn get_message(&self, id: &str) -> Result<GmailMessage> {
            self.messages
                .iter()
                .find(|m| m["id"] == id)
                .map(|m| serde_json::from_value(m.clone()).unwrap())
                .ok_or_else(|| PresswatchError::Mail("gone".to_string()))
        }

        async fn send_raw(&self, raw: &str) -> Result<()> {
            if self.fail_send {
                return Err(PresswatchError::Mail("send failed".to_string()));
            }
            self.sent.lock().unwrap().push(raw.to_string());
            Ok(())
        }
    }

    fn msg(id: &str, millis: i64, subject: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "internalDate": millis.to_string(),
            "snippet": "snippet",
            "payload": {"headers": [{"name": "Subject", "value": subject}]}
        })
    }

    fn config(dir: &Path) -> MonitorConfig {
        MonitorConfig {
            last_run_file: dir.join("last_run.txt").display().to_string(),
            ..MonitorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_pass_sends_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mailbox = FakeMailbox::new(vec![msg("a", 2_000_000, "A"), msg("b", 500_000, "B")]);

        let options = MonitorOptions {
            since: Some(1_000),
            ..MonitorOptions::default()
        };
        let report = run_pass(&mailbox, &config, options).await.unwrap();

        assert_eq!(report.matches, 1);
        assert!(report.sent);
        assert_eq!(mailbox.sent.lock().unwrap().len(), 1);
        let saved = report.saved_timestamp.unwrap();
        assert_eq!(load_last_run(Path::new(&config.last_run_file)), saved);
    }

    #[tokio::test]
    async fn test_dry_run_never_sends_or_saves() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mailbox = FakeMailbox::new(vec![msg("a", 2_000_000, "Pressure news")]);

        let options = MonitorOptions {
            dry_run: true,
            ..MonitorOptions::default()
        };
        let report = run_pass(&mailbox, &config, options).await.unwrap();

        assert!(!report.sent);
        assert!(report.saved_timestamp.is_none());
        assert!(report.dry_run_digest.unwrap().contains("[1] Pressure news"));
        assert!(mailbox.sent.lock().unwrap().is_empty());
        assert!(!Path::new(&config.last_run_file).exists());
    }

    #[tokio::test]
    async fn test_no_matches_still_saves() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mailbox = FakeMailbox::new(Vec::new());

        let report = run_pass(&mailbox, &config, MonitorOptions::default()).await.unwrap();

        assert_eq!(report.matches, 0);
        assert!(!report.sent);
        assert!(report.saved_timestamp.is_some());
        assert!(mailbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut mailbox = FakeMailbox::new(vec![msg("a", 2_000_000, "A")]);
        mailbox.fail_send = true;

        let report = run_pass(&mailbox, &config, MonitorOptions::default()).await.unwrap();
        assert_eq!(report.matches, 1);
        assert!(!report.sent);
        assert!(report.saved_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_search_failure_aborts_without_saving() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut mailbox = FakeMailbox::new(Vec::new());
        mailbox.fail_list = true;

        let result = run_pass(&mailbox, &config, MonitorOptions::default()).await;
        assert!(matches!(result, Err(PresswatchError::Mail(_))));
        assert!(!Path::new(&config.last_run_file).exists());
    }

    #[tokio::test]
    async fn test_stored_timestamp_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        save_last_run(Path::new(&config.last_run_file), 1_500).unwrap();
        let mailbox = FakeMailbox::new(vec![msg("old", 1_000_000, "Old"), msg("new", 2_000_000, "New")]);

        let options = MonitorOptions {
            dry_run: true,
            ..MonitorOptions::default()
        };
        let report = run_pass(&mailbox, &config, options).await.unwrap();
        assert_eq!(report.matches, 1);
        assert!(report.dry_run_digest.unwrap().contains("New"));
    }
}
