//! Vigil Core - live-view streaming and device commands for cloud cameras.
//!
//! This crate implements the engineering core of a camera dashboard: it
//! negotiates a live view over a control/data socket, feeds the binary media
//! segments into an incremental playback sink one append at a time, and
//! drives long-running device commands (thumbnail refresh) to completion by
//! polling.
//!
//! # Architecture
//!
//! - [`cloud`]: REST client and payload types for the vendor API
//! - [`context`]: Account credentials and URL template formatting
//! - [`liveview`]: Config resolution, socket channel, segment feeder and the [`LiveView`] facade
//! - [`command`]: Command dispatch and fixed-interval status polling
//! - [`events`]: Event system for dashboard observers
//! - [`bootstrap`]: Service wiring
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! Collaborators sit behind traits so the core runs against any backend:
//!
//! - [`LiveViewApi`](cloud::LiveViewApi) / [`DeviceApi`](cloud::DeviceApi): REST operations
//! - [`Connector`](liveview::Connector): Opening stream sockets
//! - [`PlaybackSink`](liveview::PlaybackSink) / [`SinkProvider`](liveview::SinkProvider): Media consumers
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod cloud;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod liveview;
pub mod protocol_constants;
pub mod utils;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_services, BootstrappedServices};
pub use cloud::{CloudClient, CloudError, CommandKind, DeviceType};
pub use command::{
    CommandDispatcher, CommandPoller, CommandService, CommandState, CommandTicket, PollOutcome,
};
pub use config::Config;
pub use context::{AccountContext, UrlBuilder};
pub use error::{ErrorCode, VigilError, VigilResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, CommandEvent, EventEmitter, LiveViewEvent,
    LoggingEventEmitter, NoopEventEmitter,
};
pub use liveview::{
    ConnectionState, FileSinkProvider, LiveView, PlaybackSink, SinkProvider, StreamStats,
    StreamTarget,
};
pub use utils::now_millis;
