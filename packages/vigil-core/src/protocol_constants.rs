//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the vendor cloud API and the live-view
//! middleware. Changing them would break compatibility with the remote end.

// ─────────────────────────────────────────────────────────────────────────────
// REST API
// ─────────────────────────────────────────────────────────────────────────────

/// Base URL template for the vendor REST API.
///
/// `{{tier}}` is replaced with the account tier (e.g. `prod`, `u011`).
pub const REST_BASE_URL: &str = "https://rest-{{tier}}.immedia-semi.com/";

/// Tier used when the account does not report one.
pub const DEFAULT_TIER: &str = "prod";

/// Live-view connection descriptor for a vision device.
pub const LIVEVIEW_CONFIG_PATH: &str =
    "api/v1/accounts/{{account_id}}/networks/{{network_id}}/{{device_kind}}/{{device_id}}/liveview";

/// Thumbnail refresh command for doorbells ("lotus" devices).
pub const REFRESH_DOORBELL_THUMBNAIL_PATH: &str =
    "api/v1/accounts/{{account_id}}/networks/{{network_id}}/doorbells/{{device_id}}/thumbnail";

/// Thumbnail refresh command for indoor/mini cameras ("owl" devices).
pub const REFRESH_OWL_THUMBNAIL_PATH: &str =
    "api/v1/accounts/{{account_id}}/networks/{{network_id}}/owls/{{device_id}}/thumbnail";

/// Thumbnail refresh command for sync-module attached cameras.
pub const REFRESH_CAMERA_THUMBNAIL_PATH: &str =
    "network/{{network_id}}/camera/{{device_id}}/thumbnail";

/// Status of a previously dispatched command.
pub const COMMAND_STATUS_PATH: &str = "network/{{network_id}}/command/{{command_id}}";

/// Thumbnail asset for doorbells.
pub const DOORBELL_THUMBNAIL_ASSET_PATH: &str =
    "api/v3/media/accounts/{{account_id}}/networks/{{network_id}}/lotus/{{device_id}}/thumbnail/thumbnail.jpg";

/// Thumbnail asset for owl cameras.
pub const OWL_THUMBNAIL_ASSET_PATH: &str =
    "api/v3/media/accounts/{{account_id}}/networks/{{network_id}}/owl/{{device_id}}/thumbnail/thumbnail.jpg";

/// Thumbnail asset for sync-module attached cameras.
pub const CAMERA_THUMBNAIL_ASSET_PATH: &str =
    "api/v3/media/accounts/{{account_id}}/networks/{{network_id}}/superior/{{device_id}}/thumbnail/thumbnail.jpg";

/// Status value reported by the command API for a successful command.
pub const COMMAND_STATUS_SUCCESS: i64 = 0;

// ─────────────────────────────────────────────────────────────────────────────
// Command Polling
// ─────────────────────────────────────────────────────────────────────────────

/// Default number of status requests before a command is considered timed out.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;

/// Default wait between two status requests (milliseconds).
///
/// The wait is constant per attempt; total elapsed time grows linearly.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Timeout applied to every REST request (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Live-View Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Control command requesting the live view to start.
pub const LIVEVIEW_START_COMMAND: &str = "liveview:start";

/// Control command requesting the live view to stop.
pub const LIVEVIEW_STOP_COMMAND: &str = "liveview:stop";

/// Container/codec string of the fragmented MP4 delivered by the middleware.
///
/// Sinks that need to declare a decoder type (e.g. an MSE source buffer) use this.
pub const LIVEVIEW_MIME_TYPE: &str = "video/mp4; codecs=\"avc1.640029,mp4a.40.2\"";
