//! HTTP client for the vendor REST API.
//!
//! Handles authentication headers, status checking and JSON decoding. The
//! higher-level meaning of each payload is validated by the callers
//! (resolver, dispatcher, poller).

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use super::traits::{DeviceApi, LiveViewApi};
use super::types::{
    CommandInitiateResponse, CommandKind, CommandStatusResponse, DeviceType,
    LiveViewConfigResponse,
};
use crate::config::Config;
use crate::context::{AccountContext, UrlBuilder};
use crate::protocol_constants::COMMAND_STATUS_PATH;
use crate::utils::now_millis;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to the REST API.
#[derive(Debug, Error)]
pub enum CloudError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success HTTP status.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// No token or account id was available.
    #[error("Missing bearer token or account id")]
    MissingCredentials,

    /// Response body was not the expected JSON.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Convenient Result alias for REST operations.
pub type CloudResult<T> = Result<T, CloudError>;

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Authenticated REST client bound to one account.
pub struct CloudClient {
    client: Client,
    account: AccountContext,
    config: Config,
}

impl CloudClient {
    /// Creates a client for the given account.
    ///
    /// # Errors
    /// Returns `CloudError::Http` if the underlying HTTP client cannot be built.
    pub fn new(account: AccountContext, config: Config) -> CloudResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, account, config))
    }

    /// Creates a client reusing an existing HTTP client.
    pub fn with_client(client: Client, account: AccountContext, config: Config) -> Self {
        Self {
            client,
            account,
            config,
        }
    }

    /// Returns the account this client acts for.
    #[must_use]
    pub fn account(&self) -> &AccountContext {
        &self.account
    }

    fn urls(&self) -> UrlBuilder {
        UrlBuilder::new(self.config.api_base_url.as_str(), &self.account)
    }

    async fn get_json<T: DeserializeOwned>(&self, label: &str, url: &str) -> CloudResult<T> {
        self.account.ensure_authenticated()?;
        log::debug!("[Cloud] GET {} -> {}", label, url);

        let start = Instant::now();
        let res = self
            .client
            .get(url)
            .bearer_auth(self.account.token())
            .send()
            .await;
        log::debug!(
            "[Cloud] {} completed in {:?}: {:?}",
            label,
            start.elapsed(),
            res.as_ref().map(|r| r.status())
        );

        let res = res?;
        let status = res.status();
        let body = res.text().await?;
        decode_response(status, &body)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        label: &str,
        url: &str,
        payload: serde_json::Value,
    ) -> CloudResult<T> {
        self.account.ensure_authenticated()?;
        log::debug!("[Cloud] POST {} -> {}", label, url);

        let start = Instant::now();
        let res = self
            .client
            .post(url)
            .bearer_auth(self.account.token())
            .json(&payload)
            .send()
            .await;
        log::debug!(
            "[Cloud] {} completed in {:?}: {:?}",
            label,
            start.elapsed(),
            res.as_ref().map(|r| r.status())
        );

        let res = res?;
        let status = res.status();
        let body = res.text().await?;
        decode_response(status, &body)
    }
}

/// Checks the HTTP status and decodes a JSON body.
fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &str) -> CloudResult<T> {
    if !status.is_success() {
        return Err(CloudError::HttpStatus(status.as_u16(), error_message(body)));
    }
    if body.trim().is_empty() {
        return Err(CloudError::Malformed("empty response body".into()));
    }
    serde_json::from_str(body).map_err(|e| CloudError::Malformed(e.to_string()))
}

/// Extracts the API's `message` field from an error body, if any.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[async_trait]
impl LiveViewApi for CloudClient {
    async fn fetch_liveview_config(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
    ) -> CloudResult<LiveViewConfigResponse> {
        let url = self
            .urls()
            .param("network_id", network_id)
            .param("device_id", device_id)
            .param("device_kind", device_type.collection())
            .build(&self.config.liveview_config_path);
        self.get_json("liveview_config", &url).await
    }
}

#[async_trait]
impl DeviceApi for CloudClient {
    async fn start_command(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
        kind: CommandKind,
    ) -> CloudResult<CommandInitiateResponse> {
        let url = self
            .urls()
            .param("network_id", network_id)
            .param("device_id", device_id)
            .build(kind.dispatch_path(device_type));
        self.post_json(kind.as_str(), &url, json!({})).await
    }

    async fn command_status(
        &self,
        network_id: u64,
        command_id: u64,
    ) -> CloudResult<CommandStatusResponse> {
        let url = self
            .urls()
            .param("network_id", network_id)
            .param("command_id", command_id)
            .build(COMMAND_STATUS_PATH);
        self.get_json("command_status", &url).await
    }

    fn thumbnail_url(&self, network_id: u64, device_id: u64, device_type: DeviceType) -> String {
        let url = self
            .urls()
            .param("network_id", network_id)
            .param("device_id", device_id)
            .build(device_type.thumbnail_asset_path());
        format!("{}?ts={}", url, now_millis())
    }
}
