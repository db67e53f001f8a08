//! Vendor cloud REST API.
//!
//! This module wraps the request/response endpoints the streaming and
//! command core depends on:
//!
//! - live-view descriptor resolution
//! - device command dispatch and status polling
//! - thumbnail asset URL construction
//!
//! Services depend on the [`LiveViewApi`] and [`DeviceApi`] traits rather
//! than on [`CloudClient`] directly.

mod client;
pub mod traits;
pub mod types;

pub use client::{CloudClient, CloudError, CloudResult};
pub use traits::{CloudApi, DeviceApi, LiveViewApi};
pub use types::{
    CommandInitiateResponse, CommandKind, CommandStatusResponse, DeviceType,
    LiveViewConfigResponse, WireId,
};
