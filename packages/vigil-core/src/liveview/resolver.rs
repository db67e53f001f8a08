//! Live-view descriptor resolution.
//!
//! [`ConfigResolver`] performs one authenticated lookup per stream attempt
//! and validates the payload into an immutable [`StreamConnectionDescriptor`].
//! It never retries: any failure is reported as
//! [`VigilError::ConfigResolution`].

use std::fmt;
use std::sync::Arc;

use crate::cloud::{DeviceType, LiveViewApi, LiveViewConfigResponse, WireId};
use crate::error::{VigilError, VigilResult};
use crate::utils::redact;

/// Everything needed to open and negotiate one live-view socket.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamConnectionDescriptor {
    /// WebSocket endpoint of the streaming middleware.
    pub endpoint: String,
    /// Account tier/region forwarded to the middleware.
    pub region: String,
    token: String,
    pub account_id: String,
    pub network_id: String,
    pub camera_id: String,
    /// Camera type as reported by the API.
    pub camera_type: String,
    /// Device category the descriptor was requested for.
    pub device_type: DeviceType,
}

impl StreamConnectionDescriptor {
    /// Returns the short-lived stream credential.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Validates a REST payload into a descriptor.
    ///
    /// # Errors
    /// Returns `VigilError::ConfigResolution` naming the first missing or blank field,
    /// or if the endpoint is not a `ws://`/`wss://` URL.
    pub fn from_response(
        response: LiveViewConfigResponse,
        device_type: DeviceType,
    ) -> VigilResult<Self> {
        let endpoint = required_text(response.stream_url, "stream_url")?;
        if !(endpoint.starts_with("wss://") || endpoint.starts_with("ws://")) {
            return Err(VigilError::ConfigResolution(format!(
                "stream_url is not a WebSocket URL: {}",
                endpoint
            )));
        }

        Ok(Self {
            endpoint,
            region: required_text(response.account_tier, "account_tier")?,
            token: required_text(response.api_token, "api_token")?,
            account_id: required_id(response.account_id, "account_id")?,
            network_id: required_id(response.network_id, "network_id")?,
            camera_id: required_id(response.camera_id, "camera_id")?,
            camera_type: required_text(response.camera_type, "camera_type")?,
            device_type,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_test(device_type: DeviceType) -> Self {
        Self {
            endpoint: "wss://relay.test/liveview".to_string(),
            region: "u011".to_string(),
            token: "stream-token".to_string(),
            account_id: "1".to_string(),
            network_id: "2".to_string(),
            camera_id: "3".to_string(),
            camera_type: device_type.as_str().to_string(),
            device_type,
        }
    }
}

impl fmt::Debug for StreamConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnectionDescriptor")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("token", &redact(&self.token))
            .field("account_id", &self.account_id)
            .field("network_id", &self.network_id)
            .field("camera_id", &self.camera_id)
            .field("camera_type", &self.camera_type)
            .field("device_type", &self.device_type)
            .finish()
    }
}

fn required_text(value: Option<String>, field: &str) -> VigilResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| VigilError::ConfigResolution(format!("missing field '{}'", field)))
}

fn required_id(value: Option<WireId>, field: &str) -> VigilResult<String> {
    value
        .and_then(|v| v.non_blank())
        .ok_or_else(|| VigilError::ConfigResolution(format!("missing field '{}'", field)))
}

/// Resolves devices into stream connection descriptors.
#[derive(Clone)]
pub struct ConfigResolver {
    api: Arc<dyn LiveViewApi>,
}

impl ConfigResolver {
    /// Creates a resolver backed by the given API.
    pub fn new(api: Arc<dyn LiveViewApi>) -> Self {
        Self { api }
    }

    /// Fetches and validates the descriptor for one device.
    ///
    /// # Errors
    /// Returns `VigilError::ConfigResolution` on missing credentials, transport
    /// errors, non-success status or an incomplete payload.
    pub async fn resolve(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
    ) -> VigilResult<StreamConnectionDescriptor> {
        log::info!(
            "[LiveView] Resolving config for {} {} on network {}",
            device_type,
            device_id,
            network_id
        );

        let response = self
            .api
            .fetch_liveview_config(network_id, device_id, device_type)
            .await
            .map_err(|e| {
                log::warn!("[LiveView] Config request failed: {}", e);
                VigilError::ConfigResolution(e.to_string())
            })?;

        let descriptor = StreamConnectionDescriptor::from_response(response, device_type)?;
        log::debug!("[LiveView] Resolved {:?}", descriptor);
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudError, CloudResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticApi {
        response: fn() -> CloudResult<LiveViewConfigResponse>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LiveViewApi for StaticApi {
        async fn fetch_liveview_config(
            &self,
            _network_id: u64,
            _device_id: u64,
            _device_type: DeviceType,
        ) -> CloudResult<LiveViewConfigResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.response)()
        }
    }

    fn complete_response() -> CloudResult<LiveViewConfigResponse> {
        Ok(LiveViewConfigResponse {
            account_tier: Some("u011".into()),
            api_token: Some("t0k3n".into()),
            account_id: Some(WireId::Number(1)),
            network_id: Some(WireId::Number(2)),
            camera_id: Some(WireId::Text("3".into())),
            camera_type: Some("owl".into()),
            stream_url: Some("wss://relay.example/ws".into()),
        })
    }

    fn resolver(response: fn() -> CloudResult<LiveViewConfigResponse>) -> (ConfigResolver, Arc<StaticApi>) {
        let api = Arc::new(StaticApi {
            response,
            calls: AtomicUsize::new(0),
        });
        (ConfigResolver::new(api.clone()), api)
    }

    #[tokio::test]
    async fn complete_payload_resolves() {
        let (resolver, _) = resolver(complete_response);
        let descriptor = resolver.resolve(2, 3, DeviceType::Owl).await.unwrap();
        assert_eq!(descriptor.endpoint, "wss://relay.example/ws");
        assert_eq!(descriptor.token(), "t0k3n");
        assert_eq!(descriptor.camera_id, "3");
    }

    #[tokio::test]
    async fn unauthorized_is_a_resolution_failure_without_retry() {
        let (resolver, api) =
            resolver(|| Err(CloudError::HttpStatus(401, "Unauthorized".into())));
        let err = resolver.resolve(2, 3, DeviceType::Owl).await.unwrap_err();
        assert_eq!(err.code(), "config_resolution_failed");
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_token_field_is_rejected() {
        let (resolver, _) = resolver(|| {
            let mut response = complete_response()?;
            response.api_token = None;
            Ok(response)
        });
        let err = resolver.resolve(2, 3, DeviceType::Owl).await.unwrap_err();
        assert_eq!(
            err,
            VigilError::ConfigResolution("missing field 'api_token'".into())
        );
    }

    #[tokio::test]
    async fn non_websocket_endpoint_is_rejected() {
        let (resolver, _) = resolver(|| {
            let mut response = complete_response()?;
            response.stream_url = Some("https://relay.example/ws".into());
            Ok(response)
        });
        assert!(resolver.resolve(2, 3, DeviceType::Owl).await.is_err());
    }

    #[test]
    fn debug_output_redacts_stream_token() {
        let descriptor = StreamConnectionDescriptor::for_test(DeviceType::Camera);
        let out = format!("{:?}", descriptor);
        assert!(!out.contains("stream-token"));
    }
}
