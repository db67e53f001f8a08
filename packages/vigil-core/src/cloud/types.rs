//! Wire types for the vendor REST API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VigilError;
use crate::protocol_constants::{
    CAMERA_THUMBNAIL_ASSET_PATH, DOORBELL_THUMBNAIL_ASSET_PATH, OWL_THUMBNAIL_ASSET_PATH,
    REFRESH_CAMERA_THUMBNAIL_PATH, REFRESH_DOORBELL_THUMBNAIL_PATH, REFRESH_OWL_THUMBNAIL_PATH,
};

// ─────────────────────────────────────────────────────────────────────────────
// Devices
// ─────────────────────────────────────────────────────────────────────────────

/// Category of a vision-capable device (one that can stream and has a thumbnail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Sync-module attached camera.
    Camera,
    /// Video doorbell ("lotus").
    Doorbell,
    /// Wired indoor/mini camera ("owl").
    Owl,
}

impl DeviceType {
    /// Returns the device type as sent to the live-view middleware.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Doorbell => "doorbell",
            Self::Owl => "owl",
        }
    }

    /// Returns the collection segment used in REST paths (e.g. `doorbells`).
    #[must_use]
    pub const fn collection(&self) -> &'static str {
        match self {
            Self::Camera => "cameras",
            Self::Doorbell => "doorbells",
            Self::Owl => "owls",
        }
    }

    /// Returns the path template of the thumbnail image for this device type.
    #[must_use]
    pub const fn thumbnail_asset_path(&self) -> &'static str {
        match self {
            Self::Camera => CAMERA_THUMBNAIL_ASSET_PATH,
            Self::Doorbell => DOORBELL_THUMBNAIL_ASSET_PATH,
            Self::Owl => OWL_THUMBNAIL_ASSET_PATH,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "camera" | "superior" => Ok(Self::Camera),
            "doorbell" | "lotus" => Ok(Self::Doorbell),
            "owl" => Ok(Self::Owl),
            other => Err(VigilError::InvalidRequest(format!(
                "'{}' is not a vision device type",
                other
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of long-running device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Capture a fresh thumbnail image.
    Thumbnail,
}

impl CommandKind {
    /// Returns the command name as reported by the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
        }
    }

    /// Returns the path template that starts this command on a device.
    #[must_use]
    pub const fn dispatch_path(&self, device_type: DeviceType) -> &'static str {
        match (self, device_type) {
            (Self::Thumbnail, DeviceType::Camera) => REFRESH_CAMERA_THUMBNAIL_PATH,
            (Self::Thumbnail, DeviceType::Doorbell) => REFRESH_DOORBELL_THUMBNAIL_PATH,
            (Self::Thumbnail, DeviceType::Owl) => REFRESH_OWL_THUMBNAIL_PATH,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier that the API reports either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    /// Returns the identifier as a string, or `None` if it is blank.
    #[must_use]
    pub fn non_blank(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.trim().to_string()),
        }
    }
}

/// Response of the live-view descriptor endpoint.
///
/// Every field is optional on the wire; validation happens in the resolver
/// so a missing field becomes a resolution failure instead of a decode panic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveViewConfigResponse {
    #[serde(default, alias = "region", alias = "account_region")]
    pub account_tier: Option<String>,
    #[serde(default, alias = "token")]
    pub api_token: Option<String>,
    #[serde(default, alias = "accountId")]
    pub account_id: Option<WireId>,
    #[serde(default, alias = "networkId")]
    pub network_id: Option<WireId>,
    #[serde(default, alias = "cameraId")]
    pub camera_id: Option<WireId>,
    #[serde(default, alias = "cameraType")]
    pub camera_type: Option<String>,
    #[serde(default, alias = "streamEndpoint")]
    pub stream_url: Option<String>,
}

/// Response of a command dispatch request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandInitiateResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub network_id: Option<u64>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Present for commands the API refused.
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of a command status request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandStatusResponse {
    #[serde(default)]
    pub complete: bool,
    /// 0 means success.
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
}
