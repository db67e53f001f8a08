//! Event system for dashboard observers.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the live-view and command services
//! - [`BroadcastEventBridge`] for fan-out to any number of subscribers
//! - Event types for live-view sessions and device commands

mod bridge;
pub(crate) mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::cloud::{CommandKind, DeviceType};
use crate::liveview::ConnectionState;

/// Events broadcast to observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Events from live-view sessions.
    LiveView(LiveViewEvent),

    /// Events from device commands.
    Command(CommandEvent),
}

/// Events related to a live-view session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LiveViewEvent {
    /// The session moved to a new connection state.
    StateChanged {
        #[serde(rename = "networkId")]
        network_id: u64,
        #[serde(rename = "deviceId")]
        device_id: u64,
        state: ConnectionState,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Local playback was paused or resumed.
    PlaybackChanged {
        #[serde(rename = "networkId")]
        network_id: u64,
        #[serde(rename = "deviceId")]
        device_id: u64,
        playing: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The session failed.
    Failed {
        #[serde(rename = "networkId")]
        network_id: u64,
        #[serde(rename = "deviceId")]
        device_id: u64,
        /// Machine-readable error code.
        code: String,
        /// Error message describing the failure.
        error: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to device commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CommandEvent {
    /// The cloud accepted a command.
    Dispatched {
        #[serde(rename = "commandId")]
        command_id: u64,
        #[serde(rename = "networkId")]
        network_id: u64,
        #[serde(rename = "deviceId")]
        device_id: u64,
        #[serde(rename = "deviceType")]
        device_type: DeviceType,
        kind: CommandKind,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A command reported completion.
    Completed {
        #[serde(rename = "commandId")]
        command_id: u64,
        /// Status requests issued before completion.
        attempts: u32,
        /// Result URL, when the command produces one.
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A command failed to dispatch or timed out.
    Failed {
        #[serde(rename = "commandId", skip_serializing_if = "Option::is_none")]
        command_id: Option<u64>,
        #[serde(rename = "deviceId")]
        device_id: u64,
        code: String,
        error: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl From<LiveViewEvent> for BroadcastEvent {
    fn from(event: LiveViewEvent) -> Self {
        BroadcastEvent::LiveView(event)
    }
}

impl From<CommandEvent> for BroadcastEvent {
    fn from(event: CommandEvent) -> Self {
        BroadcastEvent::Command(event)
    }
}
