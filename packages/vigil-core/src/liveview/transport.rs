//! Stream socket abstraction.
//!
//! A [`Connector`] opens one socket and hands back a [`TransportLink`]: a
//! [`SocketHandle`] for outbound control frames and a receiver of inbound
//! [`TransportEvent`]s. The WebSocket implementation runs a writer task and
//! a reader task per connection; the session logic itself never touches the
//! socket directly, which keeps it testable with channel-backed fakes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Errors raised by the stream socket.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket could not be opened.
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// A frame could not be queued for sending.
    #[error("Failed to send frame: {0}")]
    Send(String),

    /// The socket is no longer open.
    #[error("Socket closed")]
    Closed,
}

/// Event observed on an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text message (control frame).
    Text(String),
    /// Binary message (media segment).
    Binary(Bytes),
    /// Peer or network closed the socket.
    Closed,
    /// Socket error; no further events follow.
    Error(String),
}

/// Frame queued for the writer side of a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the socket after all previously queued frames.
    Close,
}

/// Exclusive handle to an open socket.
///
/// Dropping the handle cancels the reader side of the connection.
#[derive(Debug)]
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    cancel: CancellationToken,
}

impl SocketHandle {
    /// Creates a handle from its parts.
    pub fn new(outbound: mpsc::UnboundedSender<OutboundFrame>, cancel: CancellationToken) -> Self {
        Self { outbound, cancel }
    }

    /// Queues a text frame.
    ///
    /// # Errors
    /// Returns `TransportError::Send` if the writer side has already shut down.
    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(OutboundFrame::Text(text))
            .map_err(|_| TransportError::Send("writer task has shut down".into()))
    }

    /// Requests an orderly close after pending frames are flushed.
    pub fn close(&self) {
        // Writer already gone means the socket is closed anyway
        let _ = self.outbound.send(OutboundFrame::Close);
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// An open socket: outbound handle plus inbound event stream.
#[derive(Debug)]
pub struct TransportLink {
    pub handle: SocketHandle,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens stream sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `endpoint` and returns the open link.
    ///
    /// Resolving the future corresponds to the transport "open" event.
    async fn connect(&self, endpoint: &str) -> Result<TransportLink, TransportError>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a new connector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> Result<TransportLink, TransportError> {
        log::info!("[WS] Connecting to {}", endpoint);

        let (stream, _) = connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let cancel = CancellationToken::new();

        // Writer: drains queued frames in order, then closes the socket
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            log::warn!("[WS] Send failed: {}", e);
                            break;
                        }
                    }
                    OutboundFrame::Close => break,
                }
            }
            let _ = write.close().await;
            log::debug!("[WS] Writer task terminated");
        });

        // Reader: forwards messages until close, error or cancellation
        let reader_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    msg = read.next() => match msg {
                        Some(Ok(Message::Binary(data))) => {
                            if event_tx.send(TransportEvent::Binary(data)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Text(text))) => {
                            if event_tx.send(TransportEvent::Text(text.as_str().to_string())).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            let _ = event_tx.send(TransportEvent::Closed);
                            break;
                        }
                        Some(Ok(_)) => {} // Ping/Pong handled by tungstenite
                        Some(Err(e)) => {
                            let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                    }
                }
            }
            log::debug!("[WS] Reader task terminated");
        });

        log::info!("[WS] Connected to {}", endpoint);
        Ok(TransportLink {
            handle: SocketHandle::new(out_tx, cancel),
            events: event_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_handle_cancels_reader() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = SocketHandle::new(tx, cancel.clone());
        drop(handle);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn send_after_writer_shutdown_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = SocketHandle::new(tx, CancellationToken::new());
        assert!(matches!(
            handle.send_text("x".into()),
            Err(TransportError::Send(_))
        ));
    }

    #[test]
    fn close_is_queued_after_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SocketHandle::new(tx, CancellationToken::new());
        handle.send_text("stop".into()).unwrap();
        handle.close();
        assert_eq!(rx.try_recv().unwrap(), OutboundFrame::Text("stop".into()));
        assert_eq!(rx.try_recv().unwrap(), OutboundFrame::Close);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_to_connect() {
        let err = WebSocketConnector::new()
            .connect("ws://127.0.0.1:1/liveview")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
