//! Credentials for the Tailscale API
//!
//! Two kinds of credential are supported:
//! - a static API key, used as-is
//! - an OAuth access token obtained with the client-credentials grant
//!
//! OAuth tokens are cached in a small JSON file so that consecutive commands
//! do not each perform a token exchange. The file holds a single token for a
//! single tailnet.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::api::send_with_retry;
use crate::error::ApiError;
use crate::retry::RetryConfig;

/// Tokens this close to expiry are treated as expired
pub const EXPIRY_MARGIN_SECS: u64 = 60;

/// Lifetime assumed when the token endpoint does not report one
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// An OAuth access token as persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub tailnet: String,
    pub access_token: String,
    pub token_type: String,
    /// Unix seconds
    pub expires_at: u64,
}

impl StoredToken {
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_add(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_at(&self, now: u64) -> Option<Duration> {
        self.expires_at
            .checked_sub(now)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// The credential a command authenticates with
#[derive(Debug, Clone)]
pub enum Credential {
    ApiKey(String),
    OAuth(StoredToken),
}

impl Credential {
    /// The bearer value sent with every request
    pub fn bearer(&self) -> &str {
        match self {
            Credential::ApiKey(key) => key,
            Credential::OAuth(token) => &token.access_token,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::ApiKey(_) => "API key",
            Credential::OAuth(_) => "OAuth token",
        }
    }
}

/// File-backed storage for the OAuth token
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/tailnet-admin/token.json`
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(Self::new(dir.join("tailnet-admin").join("token.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored token, `None` if nothing is stored
    pub async fn load(&self) -> Result<Option<StoredToken>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).context(format!("Failed to read token file {:?}", self.path))
            }
        };

        let token = serde_json::from_str(&raw)
            .context(format!("Token file {:?} is corrupt, run logout and auth again", self.path))?;
        Ok(Some(token))
    }

    pub async fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create config directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, json)
            .await
            .context(format!("Failed to write token file {:?}", self.path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .context("Failed to restrict token file permissions")?;
        }

        debug!("Stored token at {:?}", self.path);
        Ok(())
    }

    /// Deletes the stored token; returns whether one existed
    pub async fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context(format!("Failed to remove token file {:?}", self.path)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges OAuth client credentials for an access token
pub async fn request_token(
    client: &Client,
    api_url: &str,
    client_id: &str,
    client_secret: &str,
    tailnet: &str,
    retry_config: &RetryConfig,
) -> Result<StoredToken, ApiError> {
    let url = format!("{}/oauth/token", api_url.trim_end_matches('/'));
    info!("Requesting OAuth token for tailnet {}", tailnet);

    let form = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("grant_type", "client_credentials"),
    ];

    let resp = send_with_retry(|| client.post(&url).form(&form[..]), retry_config)
        .await
        .map_err(|e| match e {
            ApiError::Status { status, message } if status == 400 || status == 401 => {
                ApiError::Auth(format!("token endpoint rejected the client credentials: {}", message))
            }
            other => other,
        })?;

    let token: TokenResponse = resp.json().await?;
    if token.access_token.is_empty() {
        return Err(ApiError::Auth("token endpoint returned an empty token".to_string()));
    }

    Ok(StoredToken {
        tailnet: tailnet.to_string(),
        access_token: token.access_token,
        token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
        expires_at: unix_now() + token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
    })
}
