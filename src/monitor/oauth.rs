//! OAuth2 credentials for the mailbox.
//!
//! The consent flow happens outside this program: it leaves a client
//! credentials file (as downloaded from the Google Cloud console) and a
//! token file holding a refresh token. This module loads both and refreshes
//! the access token when it has expired.

use std::path::Path;

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PresswatchError, Result};
use crate::feed::writer::write_atomic;

/// Scopes the stored token must carry.
pub const GMAIL_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
];

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth client identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    /// Client ID.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Layout of the downloaded credentials file.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a credentials document in either the "installed" or "web"
    /// layout.
    pub fn parse(json: &str) -> Result<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| PresswatchError::Config(format!("invalid credentials file: {}", e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            PresswatchError::Config(
                "credentials file has neither an \"installed\" nor a \"web\" section".to_string(),
            )
        })
    }

    /// Load the credentials file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PresswatchError::Config(format!(
                "credentials file not found at {}. Download the OAuth client \
                 credentials from the Google Cloud console and place them there.",
                path.display()
            )));
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

/// Access token persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as epoch seconds.
    #[serde(default)]
    pub expires_at: i64,
}

impl StoredToken {
    /// Load the token file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PresswatchError::Auth(format!(
                "no stored token at {}. Complete the OAuth consent flow for scopes {} \
                 and save the resulting token there.",
                path.display(),
                GMAIL_SCOPES.join(", ")
            )));
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| PresswatchError::Auth(format!("invalid token file: {}", e)))
    }

    /// Save the token file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())?;
        info!("Token saved to {}", path.display());
        Ok(())
    }

    /// Whether the access token should be refreshed before use.
    pub fn is_expired(&self, now: i64) -> bool {
        self.access_token.is_empty() || now + EXPIRY_SKEW_SECS >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Exchange the refresh token for a new access token.
pub async fn refresh(client: &Client, secrets: &ClientSecrets, token: &StoredToken) -> Result<StoredToken> {
    let refresh_token = token.refresh_token.as_deref().ok_or_else(|| {
        PresswatchError::Auth(
            "stored token has expired and carries no refresh token; re-run the consent flow"
                .to_string(),
        )
    })?;

    let response = client
        .post(&secrets.token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
        ])
        .send()
        .await
        .map_err(|e| PresswatchError::Auth(format!("token refresh failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PresswatchError::Auth(format!(
            "token refresh rejected ({}): {}",
            status, body
        )));
    }

    let refreshed: RefreshResponse = response
        .json()
        .await
        .map_err(|e| PresswatchError::Auth(format!("invalid token response: {}", e)))?;

    Ok(StoredToken {
        access_token: refreshed.access_token,
        // Google only returns a new refresh token when it rotates one
        refresh_token: refreshed.refresh_token.or_else(|| token.refresh_token.clone()),
        expires_at: Utc::now().timestamp() + refreshed.expires_in.unwrap_or(3600),
    })
}

/// Load credentials and the stored token, refreshing and saving it when it
/// has expired. Returns a token ready for API calls.
pub async fn authorize(client: &Client, credentials_path: &Path, token_path: &Path) -> Result<StoredToken> {
    let secrets = ClientSecrets::load(credentials_path)?;
    let token = StoredToken::load(token_path)?;

    if !token.is_expired(Utc::now().timestamp()) {
        return Ok(token);
    }

    info!("Refreshing expired OAuth2 token");
    let token = refresh(client, &secrets, &token).await?;
    token.save(token_path)?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_layout() {
        let secrets = ClientSecrets::parse(
            r#"{"installed":{"client_id":"id","client_secret":"s","token_uri":"https://t/token"}}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "id");
        assert_eq!(secrets.token_uri, "https://t/token");
    }

    #[test]
    fn test_parse_web_layout_default_token_uri() {
        let secrets =
            ClientSecrets::parse(r#"{"web":{"client_id":"id","client_secret":"s"}}"#).unwrap();
        assert_eq!(secrets.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_parse_unknown_layout() {
        assert!(matches!(
            ClientSecrets::parse(r#"{"other":{}}"#),
            Err(PresswatchError::Config(_))
        ));
        assert!(ClientSecrets::parse("not json").is_err());
    }

    #[test]
    fn test_missing_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ClientSecrets::load(&dir.path().join("credentials.json")),
            Err(PresswatchError::Config(_))
        ));
        assert!(matches!(
            StoredToken::load(&dir.path().join("token.json")),
            Err(PresswatchError::Auth(_))
        ));
    }

    #[test]
    fn test_token_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: 123,
        };

        token.save(&path).unwrap();
        assert_eq!(StoredToken::load(&path).unwrap(), token);
    }

    #[test]
    fn test_is_expired() {
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: 1_000,
        };
        assert!(!token.is_expired(900));
        assert!(token.is_expired(950));
        assert!(token.is_expired(2_000));

        let empty = StoredToken {
            access_token: String::new(),
            ..token
        };
        assert!(empty.is_expired(0));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let secrets = ClientSecrets::parse(r#"{"installed":{"client_id":"id","client_secret":"s"}}"#)
            .unwrap();
        let token = StoredToken {
            access_token: "old".to_string(),
            refresh_token: None,
            expires_at: 0,
        };
        let result = refresh(&Client::new(), &secrets, &token).await;
        assert!(matches!(result, Err(PresswatchError::Auth(_))));
    }
}
