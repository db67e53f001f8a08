//! Trait abstractions for cloud API operations.
//!
//! These traits enable dependency injection for testability and modularity.
//! The resolver, dispatcher and poller depend on traits rather than on the
//! concrete HTTP client.

use async_trait::async_trait;

use super::client::CloudResult;
use super::types::{
    CommandInitiateResponse, CommandKind, CommandStatusResponse, DeviceType,
    LiveViewConfigResponse,
};

/// Trait for live-view descriptor lookups.
///
/// Used by `ConfigResolver` to obtain stream connection details.
#[async_trait]
pub trait LiveViewApi: Send + Sync {
    /// Fetches the live-view descriptor for a device.
    ///
    /// # Arguments
    /// * `network_id` - Network the device belongs to
    /// * `device_id` - Device identifier
    /// * `device_type` - Device category, selects the REST collection
    async fn fetch_liveview_config(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
    ) -> CloudResult<LiveViewConfigResponse>;
}

/// Trait for asynchronous device commands and device media.
///
/// Used by `CommandDispatcher`, `CommandPoller` and the thumbnail refresh flow.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Starts a long-running command on a device.
    async fn start_command(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
        kind: CommandKind,
    ) -> CloudResult<CommandInitiateResponse>;

    /// Queries the status of a previously started command.
    async fn command_status(
        &self,
        network_id: u64,
        command_id: u64,
    ) -> CloudResult<CommandStatusResponse>;

    /// Returns the URL of a device's current thumbnail image.
    fn thumbnail_url(&self, network_id: u64, device_id: u64, device_type: DeviceType) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for all cloud operations.
#[async_trait]
pub trait CloudApi: LiveViewApi + DeviceApi {}

/// Blanket implementation for any type implementing all traits.
impl<T: LiveViewApi + DeviceApi> CloudApi for T {}
