//! Event emitter abstraction for decoupling services from delivery.
//!
//! Services depend on the [`EventEmitter`] trait rather than concrete
//! broadcast channels, so tests and embedders can plug in their own sink.

use super::{CommandEvent, LiveViewEvent};

/// Trait for emitting domain events without knowledge of delivery.
///
/// Emission happens from synchronous code paths (sometimes while a session
/// lock is held), so implementations must not block.
pub trait EventEmitter: Send + Sync {
    /// Emits a live-view session event.
    fn emit_live_view(&self, event: LiveViewEvent);

    /// Emits a device command event.
    fn emit_command(&self, event: CommandEvent);
}

/// No-op emitter for tests and embedders that only poll state.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_live_view(&self, _event: LiveViewEvent) {}

    fn emit_command(&self, _event: CommandEvent) {}
}

/// Logging emitter for debugging event flow.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_live_view(&self, event: LiveViewEvent) {
        tracing::debug!(?event, "live_view_event");
    }

    fn emit_command(&self, event: CommandEvent) {
        tracing::debug!(?event, "command_event");
    }
}
