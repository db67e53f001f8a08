//! Live-view session aggregate.
//!
//! [`StreamSession`] owns the connection state, the control channel and the
//! segment feeder for one live view. It is purely synchronous: the facade
//! performs the async work (resolution, connect) and the driver task feeds
//! socket and sink events in, one at a time.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use super::channel::{self, StreamControlChannel};
use super::feeder::SegmentFeeder;
use super::frame::{ControlCommand, InboundFrame};
use super::resolver::StreamConnectionDescriptor;
use super::sink::SinkSignal;
use super::state::{ConnectionState, StateInput};
use super::transport::{SocketHandle, TransportEvent};
use crate::cloud::DeviceType;
use crate::error::{VigilError, VigilResult};
use crate::events::{EventEmitter, LiveViewEvent};
use crate::utils::now_millis;

/// Device a live view is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamTarget {
    pub network_id: u64,
    pub device_id: u64,
    pub device_type: DeviceType,
}

impl StreamTarget {
    pub fn new(network_id: u64, device_id: u64, device_type: DeviceType) -> Self {
        Self {
            network_id,
            device_id,
            device_type,
        }
    }
}

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    pub segments_received: u64,
    pub segments_appended: u64,
    pub bytes_appended: u64,
    pub queued: usize,
    /// Text frames that could not be decoded.
    pub malformed_frames: u64,
}

/// State of one live-view attempt.
pub struct StreamSession {
    target: StreamTarget,
    state: ConnectionState,
    channel: StreamControlChannel,
    feeder: SegmentFeeder,
    descriptor: Option<StreamConnectionDescriptor>,
    playing: bool,
    malformed_frames: u64,
    last_error: Option<VigilError>,
    emitter: Arc<dyn EventEmitter>,
}

impl StreamSession {
    pub fn new(target: StreamTarget, feeder: SegmentFeeder, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            target,
            state: ConnectionState::Idle,
            channel: StreamControlChannel::new(),
            feeder,
            descriptor: None,
            playing: false,
            malformed_frames: 0,
            last_error: None,
            emitter,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn target(&self) -> StreamTarget {
        self.target
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the local playback flag.
    #[must_use]
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Returns the error that moved the session to `Failed`, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&VigilError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        let feeder = self.feeder.stats();
        StreamStats {
            segments_received: feeder.segments_received,
            segments_appended: feeder.segments_appended,
            bytes_appended: feeder.bytes_appended,
            queued: feeder.queued,
            malformed_frames: self.malformed_frames,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Negotiation
    // ─────────────────────────────────────────────────────────────────────────

    /// Enters `ResolvingConfig`. Returns false if the session is already active.
    pub fn begin(&mut self) -> bool {
        self.transition(StateInput::StartRequested)
    }

    /// Stores the resolved descriptor and claims the channel for connecting.
    pub fn on_config_resolved(&mut self, descriptor: StreamConnectionDescriptor) -> VigilResult<()> {
        if self.state != ConnectionState::ResolvingConfig {
            return Err(VigilError::InvalidRequest(format!(
                "config resolved while {}",
                self.state
            )));
        }
        self.channel.open()?;
        self.descriptor = Some(descriptor);
        self.transition(StateInput::ConfigResolved);
        Ok(())
    }

    /// Records a failed resolution. No socket was ever opened.
    pub fn on_config_failed(&mut self, error: VigilError) {
        log::warn!(
            "[LiveView] Config resolution failed for device {}: {}",
            self.target.device_id,
            error
        );
        if self.transition(StateInput::ConfigFailed) {
            self.record_failure(error);
        }
    }

    /// Stores the open socket and sends the start frame.
    pub fn on_transport_open(&mut self, handle: SocketHandle) {
        let Some(descriptor) = self.descriptor.as_ref() else {
            self.fail(VigilError::InvalidRequest("socket opened without descriptor".into()));
            return;
        };
        if self.state != ConnectionState::Connecting {
            log::debug!("[LiveView] Dropping socket opened while {}", self.state);
            return;
        }
        match self.channel.on_open(handle, descriptor) {
            Ok(()) => {
                self.transition(StateInput::TransportOpened);
            }
            Err(e) => self.fail(e),
        }
    }

    /// Records a failed connect.
    pub fn on_connect_failed(&mut self, error: VigilError) {
        log::warn!(
            "[LiveView] Connect failed for device {}: {}",
            self.target.device_id,
            error
        );
        self.channel.release();
        self.fail(error);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound events
    // ─────────────────────────────────────────────────────────────────────────

    /// Handles one socket event.
    pub fn on_transport_event(&mut self, event: TransportEvent) {
        if let Some(frame) = channel::classify(&event) {
            self.on_frame(frame);
            return;
        }
        match event {
            TransportEvent::Closed => self.on_peer_closed(),
            TransportEvent::Error(reason) => {
                log::warn!("[LiveView] Socket error: {}", reason);
                self.channel.release();
                self.fail(VigilError::Transport(reason));
            }
            TransportEvent::Text(_) | TransportEvent::Binary(_) => {}
        }
    }

    /// Handles one sink signal.
    pub fn on_sink_signal(&mut self, signal: SinkSignal) {
        let result = match signal {
            SinkSignal::Ready => self.feeder.on_sink_ready(),
            SinkSignal::AppendComplete => self.feeder.on_append_complete(),
            SinkSignal::Failed(reason) => {
                self.fail(VigilError::Sink(reason));
                return;
            }
        };
        if let Err(e) = result {
            self.fail(e.into());
        }
    }

    fn on_frame(&mut self, frame: InboundFrame) {
        match frame {
            InboundFrame::Data(segment) => self.on_segment(segment),
            InboundFrame::Control(ControlCommand::Start) => self.on_start_ack(),
            InboundFrame::Control(ControlCommand::Stop) => self.on_stop_ack(),
            InboundFrame::Control(ControlCommand::Unknown) => {
                log::debug!("[LiveView] Ignoring unknown control command");
            }
            InboundFrame::Malformed(e) => {
                self.malformed_frames += 1;
                log::warn!("[LiveView] {}", e);
            }
        }
    }

    fn on_segment(&mut self, segment: Bytes) {
        if !self.state.holds_socket() || self.state == ConnectionState::Stopping {
            log::trace!("[LiveView] Segment ignored while {}", self.state);
            return;
        }
        if let Err(e) = self.feeder.enqueue(segment) {
            self.fail(e.into());
        }
    }

    fn on_start_ack(&mut self) {
        if self.transition(StateInput::StartAcked) {
            log::info!("[LiveView] Streaming device {}", self.target.device_id);
            self.set_playing(true);
        }
    }

    fn on_stop_ack(&mut self) {
        if !self.transition(StateInput::StopAcked) {
            return;
        }
        log::info!("[LiveView] Remote stop for device {}", self.target.device_id);
        self.channel.disconnect();
        self.teardown();
        self.transition(StateInput::Released);
    }

    fn on_peer_closed(&mut self) {
        self.channel.release();
        if self.transition(StateInput::TransportClosed) {
            log::info!("[LiveView] Socket closed by peer");
            self.teardown();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Pauses local playback. Returns false unless the session was streaming.
    pub fn pause(&mut self) -> bool {
        if !self.transition(StateInput::PauseRequested) {
            return false;
        }
        self.set_playing(false);
        true
    }

    /// Resumes local playback. Returns false unless the session was paused.
    pub fn resume(&mut self) -> bool {
        if !self.transition(StateInput::ResumeRequested) {
            return false;
        }
        self.set_playing(true);
        true
    }

    /// Local stop. Idempotent; a no-op unless the session is active.
    pub fn stop(&mut self) {
        let was_open = self.state.is_transport_open();
        if !self.transition(StateInput::StopRequested) {
            return;
        }
        log::info!("[LiveView] Stopping device {}", self.target.device_id);
        self.channel.close(was_open);
        self.teardown();
        self.transition(StateInput::Released);
    }

    /// Forces `Failed`, releasing the socket and the sink.
    pub fn fail(&mut self, error: VigilError) {
        if self.state.is_terminal() {
            return;
        }
        let was_open = self.state.is_transport_open();
        if self.channel.is_open() {
            // Still healthy: tell the middleware we are leaving
            self.channel.close(was_open);
        } else {
            self.channel.release();
        }
        self.teardown();
        if self.transition(StateInput::TransportFailed) {
            log::error!("[LiveView] Session failed: {}", error);
            self.record_failure(error);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn teardown(&mut self) {
        self.feeder.clear();
        self.set_playing(false);
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        self.feeder.set_playing(playing);
        self.emitter.emit_live_view(LiveViewEvent::PlaybackChanged {
            network_id: self.target.network_id,
            device_id: self.target.device_id,
            playing,
            timestamp: now_millis(),
        });
    }

    fn record_failure(&mut self, error: VigilError) {
        self.emitter.emit_live_view(LiveViewEvent::Failed {
            network_id: self.target.network_id,
            device_id: self.target.device_id,
            code: error.code().to_string(),
            error: error.to_string(),
            timestamp: now_millis(),
        });
        self.last_error = Some(error);
    }

    fn transition(&mut self, input: StateInput) -> bool {
        let Some(next) = self.state.next(input) else {
            log::trace!("[LiveView] {:?} ignored while {}", input, self.state);
            return false;
        };
        log::debug!("[LiveView] {} -> {} ({:?})", self.state, next, input);
        self.state = next;
        self.emitter.emit_live_view(LiveViewEvent::StateChanged {
            network_id: self.target.network_id,
            device_id: self.target.device_id,
            state: next,
            timestamp: now_millis(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::emitter::tests::RecordingEmitter;
    use crate::liveview::feeder::tests::RecordingSink;
    use crate::liveview::sink::{SinkNotifier, SinkReadiness};
    use crate::liveview::transport::OutboundFrame;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        session: StreamSession,
        sink: RecordingSink,
        outbound: mpsc::UnboundedReceiver<OutboundFrame>,
        cancel: CancellationToken,
        emitter: Arc<RecordingEmitter>,
    }

    impl Harness {
        fn sent(&mut self) -> Vec<OutboundFrame> {
            std::iter::from_fn(|| self.outbound.try_recv().ok()).collect()
        }

        fn ack_start(&mut self) {
            self.session.on_transport_event(TransportEvent::Text(
                r#"{"command":"liveview:start","data":{}}"#.into(),
            ));
        }
    }

    /// Session advanced to `AwaitingAck` over an in-memory socket.
    fn awaiting_ack() -> Harness {
        let sink = RecordingSink::new(SinkReadiness::Ready);
        let (notifier, _rx) = SinkNotifier::channel();
        let feeder = SegmentFeeder::new(Box::new(sink.clone()), notifier);
        let emitter = Arc::new(RecordingEmitter::default());
        let target = StreamTarget::new(2, 3, DeviceType::Doorbell);
        let mut session = StreamSession::new(target, feeder, emitter.clone());

        assert!(session.begin());
        session
            .on_config_resolved(StreamConnectionDescriptor::for_test(DeviceType::Doorbell))
            .unwrap();
        let (tx, outbound) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        session.on_transport_open(SocketHandle::new(tx, cancel.clone()));
        assert_eq!(session.state(), ConnectionState::AwaitingAck);

        Harness {
            session,
            sink,
            outbound,
            cancel,
            emitter,
        }
    }

    fn complete_append(h: &mut Harness) {
        h.sink.finish();
        h.session.on_sink_signal(SinkSignal::AppendComplete);
    }

    #[test]
    fn open_sends_exactly_one_start_frame() {
        let mut h = awaiting_ack();
        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], OutboundFrame::Text(t) if t.contains("liveview:start")));
    }

    #[test]
    fn segments_before_ack_are_appended_in_order() {
        let mut h = awaiting_ack();
        for chunk in [&b"init"[..], b"seg1", b"seg2"] {
            h.session
                .on_transport_event(TransportEvent::Binary(Bytes::copy_from_slice(chunk)));
        }
        complete_append(&mut h);
        complete_append(&mut h);
        h.ack_start();

        assert_eq!(h.session.state(), ConnectionState::Streaming);
        assert!(h.session.playing());
        let appended: Vec<_> = h.sink.appended.lock().iter().cloned().collect();
        assert_eq!(appended, vec!["init", "seg1", "seg2"]);
        assert_eq!(h.session.stats().segments_received, 3);
    }

    #[test]
    fn pause_and_resume_toggle_playback_only() {
        let mut h = awaiting_ack();
        assert!(!h.session.pause());
        h.ack_start();

        assert!(h.session.pause());
        assert_eq!(h.session.state(), ConnectionState::Paused);
        assert!(!h.session.playing());
        assert_eq!(*h.sink.playing.lock(), Some(false));

        // Segments keep flowing while paused
        h.session
            .on_transport_event(TransportEvent::Binary(Bytes::from_static(b"seg")));
        assert_eq!(h.sink.appended.lock().len(), 1);

        assert!(h.session.resume());
        assert!(!h.session.resume());
        assert_eq!(h.session.state(), ConnectionState::Streaming);
        assert!(h.session.playing());
    }

    #[test]
    fn stop_sends_stop_frame_and_is_idempotent() {
        let mut h = awaiting_ack();
        h.ack_start();
        h.sent();

        h.session.stop();
        assert_eq!(h.session.state(), ConnectionState::Closed);
        assert_eq!(
            h.sent(),
            vec![
                OutboundFrame::Text(crate::liveview::frame::stop_frame()),
                OutboundFrame::Close
            ]
        );
        assert!(h.cancel.is_cancelled());
        assert!(h.sink.torn_down.load(std::sync::atomic::Ordering::SeqCst));

        h.session.stop();
        assert!(h.sent().is_empty());
        assert_eq!(h.session.state(), ConnectionState::Closed);
    }

    #[test]
    fn remote_stop_closes_without_stop_frame() {
        let mut h = awaiting_ack();
        h.ack_start();
        h.sent();

        h.session.on_transport_event(TransportEvent::Text(
            r#"{"command":"liveview:stop"}"#.into(),
        ));
        assert_eq!(h.session.state(), ConnectionState::Closed);
        assert_eq!(h.sent(), vec![OutboundFrame::Close]);
    }

    #[test]
    fn transport_error_fails_and_releases_handle() {
        let mut h = awaiting_ack();
        h.sent();
        h.session
            .on_transport_event(TransportEvent::Error("connection reset".into()));

        assert_eq!(h.session.state(), ConnectionState::Failed);
        assert!(h.cancel.is_cancelled());
        assert!(h.sent().is_empty());
        assert_eq!(
            h.session.last_error(),
            Some(&VigilError::Transport("connection reset".into()))
        );
        assert!(h
            .emitter
            .live_view
            .lock()
            .iter()
            .any(|e| matches!(e, LiveViewEvent::Failed { .. })));

        // Terminal: later events change nothing
        h.session
            .on_transport_event(TransportEvent::Binary(Bytes::from_static(b"late")));
        h.session.stop();
        assert_eq!(h.session.state(), ConnectionState::Failed);
    }

    #[test]
    fn peer_close_moves_to_closed() {
        let mut h = awaiting_ack();
        h.ack_start();
        h.session.on_transport_event(TransportEvent::Closed);
        assert_eq!(h.session.state(), ConnectionState::Closed);
        assert!(!h.session.playing());
    }

    #[test]
    fn malformed_text_is_counted_not_fatal() {
        let mut h = awaiting_ack();
        h.session
            .on_transport_event(TransportEvent::Text("{not json".into()));
        h.session
            .on_transport_event(TransportEvent::Text(r#"{"command":"liveview:ping"}"#.into()));

        assert_eq!(h.session.state(), ConnectionState::AwaitingAck);
        assert_eq!(h.session.stats().malformed_frames, 1);
    }

    #[test]
    fn sink_failure_fails_session_and_closes_socket() {
        let mut h = awaiting_ack();
        h.ack_start();
        h.sent();

        h.session.on_sink_signal(SinkSignal::Failed("disk full".into()));
        assert_eq!(h.session.state(), ConnectionState::Failed);
        assert_eq!(
            h.sent(),
            vec![
                OutboundFrame::Text(crate::liveview::frame::stop_frame()),
                OutboundFrame::Close
            ]
        );
    }

    #[test]
    fn config_failure_never_touches_a_socket() {
        let sink = RecordingSink::new(SinkReadiness::Ready);
        let (notifier, _rx) = SinkNotifier::channel();
        let feeder = SegmentFeeder::new(Box::new(sink), notifier);
        let mut session = StreamSession::new(
            StreamTarget::new(1, 1, DeviceType::Camera),
            feeder,
            Arc::new(RecordingEmitter::default()),
        );
        session.begin();
        session.on_config_failed(VigilError::ConfigResolution("HTTP 401".into()));

        assert_eq!(session.state(), ConnectionState::Failed);
        assert!(matches!(
            session.last_error(),
            Some(VigilError::ConfigResolution(_))
        ));
    }

    #[test]
    fn begin_is_rejected_while_active() {
        let mut h = awaiting_ack();
        assert!(!h.session.begin());
        assert_eq!(h.session.state(), ConnectionState::AwaitingAck);
    }
}
