//! Tailscale REST API client
//!
//! This module provides:
//! - [`DeviceApi`], the seam between the tag engine and the service
//! - [`TailscaleClient`], its `reqwest` implementation, which also lists API
//!   keys for the `keys` command
//! - the wire records the service returns, converted into crate types at
//!   this boundary
//!
//! Requests carry the credential as a bearer token. Rate limiting (429),
//! server errors, timeouts and connection failures are retried with
//! exponential backoff; everything else is returned on the first failure.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directory::Device;
use crate::error::ApiError;
use crate::retry::{with_exponential_backoff, RetryConfig};
use crate::tag::{from_api_tags, to_api_tags, TagSet};

/// Production API endpoint
pub const DEFAULT_API_URL: &str = "https://api.tailscale.com/api/v2";

/// Operations the tag engine needs from the service
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Lists every device in the tailnet, tags included
    async fn list_devices(&self) -> Result<Vec<Device>, ApiError>;

    /// Replaces a device's tags with `tags`
    async fn set_device_tags(&self, device_id: &str, tags: &TagSet) -> Result<(), ApiError>;
}

/// A device as returned by `GET /tailnet/{tailnet}/devices`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub last_seen: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        let name = if record.hostname.is_empty() {
            record.name
        } else {
            record.hostname
        };

        Device {
            id: record.id,
            name,
            tags: from_api_tags(&record.tags),
            ip: record.addresses.into_iter().next().unwrap_or_default(),
            os: record.os,
            last_seen: record.last_seen,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

/// An API key as listed by `GET /tailnet/{tailnet}/keys`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub expires: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyList {
    #[serde(default)]
    pub keys: Vec<ApiKey>,
}

#[derive(Serialize)]
struct TagsBody {
    tags: Vec<String>,
}

/// Builds a `reqwest` client with the crate's connection settings
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(concat!("tailnet-admin/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .context("Failed to create HTTP client")
}

/// Sends a request with retries and turns non-success statuses into errors
///
/// `request` is called once per attempt since a `RequestBuilder` cannot be
/// reused after sending.
pub(crate) async fn send_with_retry<F>(
    request: F,
    retry_config: &RetryConfig,
) -> Result<Response, ApiError>
where
    F: Fn() -> RequestBuilder,
{
    with_exponential_backoff(
        || async {
            let resp = request().send().await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp);
            }

            let body = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!("Rate limited by the API: {}", status);
            } else if status.is_server_error() {
                warn!("Server error from the API: {}", status);
            } else {
                debug!("Request rejected: {}", status);
            }

            Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            })
        },
        ApiError::is_retriable,
        retry_config,
    )
    .await
}

/// Pulls the `message` field out of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Authenticated client for one tailnet
pub struct TailscaleClient {
    client: Client,
    base_url: String,
    tailnet: String,
    token: String,
    retry_config: RetryConfig,
}

impl TailscaleClient {
    /// Creates a client for `tailnet` authenticating with `token`
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, normally [`DEFAULT_API_URL`]
    /// * `tailnet` - Tailnet name, e.g. `example.com`
    /// * `token` - An API key or an OAuth access token; both are sent as
    ///   bearer credentials
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    ///
    /// A client using the default [`RetryConfig`]
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use tailnet_admin::api::{DeviceApi, TailscaleClient, DEFAULT_API_URL};
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = TailscaleClient::new(
    ///     DEFAULT_API_URL,
    ///     "example.com",
    ///     "tskey-api-xxxx",
    ///     Duration::from_secs(10),
    /// )?;
    /// let devices = client.list_devices().await?;
    /// println!("{} devices", devices.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        base_url: &str,
        tailnet: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            tailnet: tailnet.to_string(),
            token: token.to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn tailnet(&self) -> &str {
        &self.tailnet
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Lists the tailnet's API keys
    pub async fn list_keys(&self) -> Result<Vec<ApiKey>, ApiError> {
        let url = self.url(&format!("/tailnet/{}/keys", self.tailnet));
        debug!("GET {}", url);

        let resp = send_with_retry(
            || self.client.get(&url).bearer_auth(&self.token),
            &self.retry_config,
        )
        .await?;

        let list: KeyList = resp.json().await?;
        Ok(list.keys)
    }
}

#[async_trait]
impl DeviceApi for TailscaleClient {
    async fn list_devices(&self) -> Result<Vec<Device>, ApiError> {
        let url = self.url(&format!("/tailnet/{}/devices", self.tailnet));
        debug!("GET {}", url);

        let resp = send_with_retry(
            || self.client.get(&url).bearer_auth(&self.token),
            &self.retry_config,
        )
        .await?;

        let list: DeviceList = resp.json().await?;
        Ok(list.devices.into_iter().map(Device::from).collect())
    }

    async fn set_device_tags(&self, device_id: &str, tags: &TagSet) -> Result<(), ApiError> {
        let url = self.url(&format!("/device/{}/tags", device_id));
        let body = TagsBody {
            tags: to_api_tags(tags),
        };
        debug!("POST {} {:?}", url, body.tags);

        send_with_retry(
            || self.client.post(&url).bearer_auth(&self.token).json(&body),
            &self.retry_config,
        )
        .await?;

        Ok(())
    }
}
