//! Runtime settings and credential selection
//!
//! Settings come from command-line flags, which clap backs with environment
//! variables; `main` loads a `.env` file before parsing so it feeds the same
//! path. Blank values count as unset.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::{debug, info};

use crate::auth::{request_token, Credential, StoredToken, TokenStore};
use crate::cli::Cli;
use crate::error::AdminError;
use crate::retry::RetryConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    pub tailnet: Option<String>,
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_url: String,
    pub timeout: Duration,
    pub json: bool,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            tailnet: non_blank(&cli.tailnet),
            api_key: non_blank(&cli.api_key),
            client_id: non_blank(&cli.client_id),
            client_secret: non_blank(&cli.client_secret),
            api_url: cli.api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(cli.timeout_ms),
            json: cli.json,
        }
    }

    /// The tailnet to operate on, falling back to the stored token's
    pub fn require_tailnet(&self, stored: Option<&StoredToken>) -> Result<String, AdminError> {
        self.tailnet
            .clone()
            .or_else(|| stored.map(|t| t.tailnet.clone()))
            .ok_or_else(|| {
                AdminError::Configuration(
                    "tailnet is required; use --tailnet or set TAILSCALE_TAILNET".to_string(),
                )
            })
    }

    /// OAuth client ID and secret, when both are configured
    pub fn client_credentials(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// The tailnet and credential when an API key is configured
    ///
    /// Never touches the token file, so a missing or damaged one cannot
    /// get in the way of key-based runs.
    pub fn api_key_connection(&self) -> Result<Option<(String, Credential)>, AdminError> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };
        let tailnet = self.require_tailnet(None)?;
        Ok(Some((tailnet, Credential::ApiKey(key.clone()))))
    }

    /// The tailnet and credential a command connects with
    ///
    /// The token file is read only when no API key is configured; its
    /// tailnet then fills in for a missing `--tailnet`.
    pub async fn connection(
        &self,
        store: &TokenStore,
        http: &Client,
    ) -> Result<(String, Credential)> {
        if let Some(found) = self.api_key_connection()? {
            return Ok(found);
        }

        let stored = store.load().await?;
        let tailnet = self.require_tailnet(stored.as_ref())?;
        let credential = self.credential(&tailnet, store, http).await?;
        Ok((tailnet, credential))
    }

    /// Picks the credential for `tailnet`
    ///
    /// In order: an API key; a stored, unexpired OAuth token for the same
    /// tailnet; a fresh token from the client credentials, which is then
    /// stored.
    pub async fn credential(
        &self,
        tailnet: &str,
        store: &TokenStore,
        http: &Client,
    ) -> Result<Credential> {
        if let Some(key) = &self.api_key {
            debug!("Using API key");
            return Ok(Credential::ApiKey(key.clone()));
        }

        let stored = store.load().await?;
        if let Some(token) = stored.filter(|t| t.tailnet == tailnet && !t.is_expired()) {
            debug!("Using stored OAuth token");
            return Ok(Credential::OAuth(token));
        }

        let Some((client_id, client_secret)) = self.client_credentials() else {
            return Err(AdminError::Configuration(
                "no usable credentials; set TAILSCALE_API_KEY, or TAILSCALE_CLIENT_ID and \
                 TAILSCALE_CLIENT_SECRET, or run `tailnet-admin auth`"
                    .to_string(),
            )
            .into());
        };

        let token = request_token(
            http,
            &self.api_url,
            client_id,
            client_secret,
            tailnet,
            &RetryConfig::default(),
        )
        .await?;
        store.save(&token).await?;
        info!("Obtained new OAuth token for {}", tailnet);

        Ok(Credential::OAuth(token))
    }
}
