//! Exclusive owner of the live-view socket.

use super::frame::{self, InboundFrame};
use super::resolver::StreamConnectionDescriptor;
use super::transport::{SocketHandle, TransportEvent};
use crate::error::{VigilError, VigilResult};

/// Holds the one socket a session may have open.
///
/// The channel is claimed with [`open`](Self::open) before connecting so a
/// second connect attempt for the same session is rejected. Every exit path
/// ([`close`](Self::close), [`disconnect`](Self::disconnect),
/// [`release`](Self::release)) drops the handle and frees the claim.
#[derive(Debug, Default)]
pub struct StreamControlChannel {
    handle: Option<SocketHandle>,
    claimed: bool,
}

impl StreamControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the channel for a new connection.
    ///
    /// # Errors
    /// Returns `VigilError::InvalidRequest` if a connection is already
    /// pending or open.
    pub fn open(&mut self) -> VigilResult<()> {
        if self.claimed {
            return Err(VigilError::InvalidRequest(
                "stream channel already has a connection".into(),
            ));
        }
        self.claimed = true;
        Ok(())
    }

    /// Stores the freshly opened socket and sends the start frame on it.
    ///
    /// On error the handle is dropped and the claim freed.
    pub fn on_open(
        &mut self,
        handle: SocketHandle,
        descriptor: &StreamConnectionDescriptor,
    ) -> VigilResult<()> {
        let sent = frame::start_frame(descriptor)
            .map_err(|e| VigilError::Protocol(e.to_string()))
            .and_then(|text| handle.send_text(text).map_err(VigilError::from));

        match sent {
            Ok(()) => {
                log::debug!(
                    "[LiveView] Start frame sent for {} {}",
                    descriptor.device_type,
                    descriptor.camera_id
                );
                self.handle = Some(handle);
                self.claimed = true;
                Ok(())
            }
            Err(e) => {
                self.claimed = false;
                Err(e)
            }
        }
    }

    /// Local stop: sends the stop frame (when requested), then closes.
    pub fn close(&mut self, send_stop: bool) {
        if let Some(handle) = self.handle.take() {
            if send_stop {
                if let Err(e) = handle.send_text(frame::stop_frame()) {
                    log::warn!("[LiveView] Could not send stop frame: {}", e);
                }
            }
            handle.close();
        }
        self.claimed = false;
    }

    /// Closes without a stop frame (the remote side already stopped).
    pub fn disconnect(&mut self) {
        self.close(false);
    }

    /// Drops the handle without closing (the socket is already gone).
    pub fn release(&mut self) {
        self.handle = None;
        self.claimed = false;
    }

    /// Returns true while a socket handle is held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

/// Classifies a message event. Lifecycle events (close, error) return `None`.
pub fn classify(event: &TransportEvent) -> Option<InboundFrame> {
    match event {
        TransportEvent::Binary(data) => Some(InboundFrame::Data(data.clone())),
        TransportEvent::Text(text) => Some(InboundFrame::from_text(text)),
        TransportEvent::Closed | TransportEvent::Error(_) => None,
    }
}
