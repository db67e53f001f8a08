//! Live-view streaming session.
//!
//! A live view is negotiated over a single socket that carries two kinds of
//! messages: JSON control frames (start/stop acknowledgements) and binary
//! media segments. The pieces, leaves first:
//!
//! - [`resolver`]: turns a device into a [`StreamConnectionDescriptor`]
//! - [`state`]: the [`ConnectionState`] machine and its transitions
//! - [`frame`]: control frame encoding and inbound classification
//! - [`transport`]: socket abstraction ([`Connector`]) and the WebSocket implementation
//! - [`channel`]: [`StreamControlChannel`], owner of the socket handle
//! - [`sink`]: the [`PlaybackSink`] capability and the file-backed relay sink
//! - [`feeder`]: [`SegmentFeeder`], one-append-in-flight delivery into a sink
//! - [`session`]: [`StreamSession`], the aggregate reacting to socket and sink events
//! - [`facade`]: [`LiveView`], the public start/pause/resume/stop surface

pub mod channel;
pub mod facade;
pub mod feeder;
pub mod frame;
pub mod resolver;
pub mod session;
pub mod sink;
pub mod state;
pub mod transport;

pub use channel::StreamControlChannel;
pub use facade::LiveView;
pub use feeder::{FeederStats, SegmentFeeder};
pub use frame::{ControlCommand, InboundFrame};
pub use resolver::{ConfigResolver, StreamConnectionDescriptor};
pub use session::{StreamSession, StreamStats, StreamTarget};
pub use sink::{
    FileSink, FileSinkProvider, PlaybackSink, SinkError, SinkNotifier, SinkProvider,
    SinkReadiness, SinkSignal,
};
pub use state::{ConnectionState, StateInput};
pub use transport::{
    Connector, OutboundFrame, SocketHandle, TransportError, TransportEvent, TransportLink,
    WebSocketConnector,
};
