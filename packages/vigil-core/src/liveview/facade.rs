//! Public live-view surface.
//!
//! [`LiveView`] is the only component shared with callers. It serializes
//! access to the current [`StreamSession`] behind a mutex that is never held
//! across an await: resolution and connect run unlocked, and each step
//! re-checks a generation counter so a `stop` (or a newer `start`) issued in
//! the meantime wins.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::feeder::SegmentFeeder;
use super::resolver::ConfigResolver;
use super::session::{StreamSession, StreamStats, StreamTarget};
use super::sink::{SinkNotifier, SinkProvider, SinkSignal};
use super::state::ConnectionState;
use super::transport::{Connector, TransportEvent};
use crate::cloud::LiveViewApi;
use crate::error::{VigilError, VigilResult};
use crate::events::EventEmitter;

#[derive(Default)]
struct Slot {
    generation: u64,
    session: Option<StreamSession>,
    driver: Option<CancellationToken>,
}

impl Slot {
    /// Returns the session if it still belongs to `generation` and is in `state`.
    fn session_in(&mut self, generation: u64, state: ConnectionState) -> Option<&mut StreamSession> {
        if self.generation != generation {
            return None;
        }
        self.session.as_mut().filter(|s| s.state() == state)
    }
}

/// Start/pause/resume/stop control over one live view at a time.
pub struct LiveView {
    resolver: ConfigResolver,
    connector: Arc<dyn Connector>,
    sinks: Arc<dyn SinkProvider>,
    emitter: Arc<dyn EventEmitter>,
    shared: Arc<Mutex<Slot>>,
}

impl LiveView {
    pub fn new(
        api: Arc<dyn LiveViewApi>,
        connector: Arc<dyn Connector>,
        sinks: Arc<dyn SinkProvider>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            resolver: ConfigResolver::new(api),
            connector,
            sinks,
            emitter,
            shared: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Starts a live view of `target`.
    ///
    /// Returns once the start frame has been sent (state `AwaitingAck`); the
    /// acknowledgement and media arrive on a background task. Calling `start`
    /// again for the same device while a session is active is a no-op.
    ///
    /// # Errors
    /// Returns the resolution or connect error (the session is then `Failed`),
    /// or `VigilError::InvalidRequest` if another device is being viewed.
    pub async fn start(&self, target: StreamTarget) -> VigilResult<()> {
        let Some((generation, sink_rx)) = self.begin(target)? else {
            return Ok(());
        };

        let resolved = self
            .resolver
            .resolve(target.network_id, target.device_id, target.device_type)
            .await;

        let endpoint = {
            let mut slot = self.shared.lock();
            let Some(session) = slot.session_in(generation, ConnectionState::ResolvingConfig)
            else {
                log::debug!("[LiveView] Start superseded during config resolution");
                return Ok(());
            };
            match resolved {
                Ok(descriptor) => {
                    let endpoint = descriptor.endpoint.clone();
                    session.on_config_resolved(descriptor)?;
                    endpoint
                }
                Err(e) => {
                    session.on_config_failed(e.clone());
                    return Err(e);
                }
            }
        };

        log::info!("[LiveView] Connecting to {}", endpoint);
        let connected = self.connector.connect(&endpoint).await;

        let mut slot = self.shared.lock();
        let Some(session) = slot.session_in(generation, ConnectionState::Connecting) else {
            // Dropping the link closes the late socket
            log::debug!("[LiveView] Start superseded during connect");
            return Ok(());
        };
        let link = match connected {
            Ok(link) => link,
            Err(e) => {
                let error = VigilError::from(e);
                session.on_connect_failed(error.clone());
                return Err(error);
            }
        };

        session.on_transport_open(link.handle);
        if session.state() != ConnectionState::AwaitingAck {
            return Err(session
                .last_error()
                .cloned()
                .unwrap_or_else(|| VigilError::Transport("start frame not sent".into())));
        }

        let cancel = CancellationToken::new();
        slot.driver = Some(cancel.clone());
        drop(slot);

        tokio::spawn(drive(
            Arc::clone(&self.shared),
            generation,
            link.events,
            sink_rx,
            cancel,
        ));
        Ok(())
    }

    /// Pauses local playback. No-op unless streaming.
    pub fn pause(&self) -> bool {
        self.with_session(StreamSession::pause).unwrap_or(false)
    }

    /// Resumes local playback. No-op unless paused.
    pub fn resume(&self) -> bool {
        self.with_session(StreamSession::resume).unwrap_or(false)
    }

    /// Stops the current session. Idempotent; safe before the socket opens.
    pub fn stop(&self) {
        let mut slot = self.shared.lock();
        if let Some(session) = slot.session.as_mut() {
            session.stop();
        }
        if let Some(driver) = slot.driver.take() {
            driver.cancel();
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.with_session(|s| s.state()).unwrap_or_default()
    }

    #[must_use]
    pub fn playing(&self) -> bool {
        self.with_session(|s| s.playing()).unwrap_or(false)
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.with_session(|s| s.stats()).unwrap_or_default()
    }

    /// Returns the error of the last failed session.
    #[must_use]
    pub fn last_error(&self) -> Option<VigilError> {
        self.with_session(|s| s.last_error().cloned()).flatten()
    }

    /// Returns the device of the current (or last) session.
    #[must_use]
    pub fn target(&self) -> Option<StreamTarget> {
        self.with_session(|s| s.target())
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut StreamSession) -> T) -> Option<T> {
        self.shared.lock().session.as_mut().map(f)
    }

    /// Installs a fresh session in `ResolvingConfig` and returns its generation.
    /// Returns `None` when the same device is already live.
    fn begin(
        &self,
        target: StreamTarget,
    ) -> VigilResult<Option<(u64, mpsc::UnboundedReceiver<SinkSignal>)>> {
        let mut slot = self.shared.lock();
        if let Some(current) = slot.session.as_ref() {
            if current.state().is_active() {
                if current.target() == target {
                    log::debug!(
                        "[LiveView] Start ignored, device {} already {}",
                        target.device_id,
                        current.state()
                    );
                    return Ok(None);
                }
                return Err(VigilError::InvalidRequest(format!(
                    "live view already active for device {}",
                    current.target().device_id
                )));
            }
        }

        let sink = self.sinks.create_sink(&target)?;
        let (notifier, sink_rx) = SinkNotifier::channel();
        let mut session = StreamSession::new(
            target,
            SegmentFeeder::new(sink, notifier),
            Arc::clone(&self.emitter),
        );
        session.begin();

        slot.generation += 1;
        slot.session = Some(session);
        if let Some(driver) = slot.driver.take() {
            driver.cancel();
        }
        Ok(Some((slot.generation, sink_rx)))
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Feeds socket events and sink signals into the session of `generation`
/// until it ends, is replaced, or the facade cancels it.
async fn drive(
    shared: Arc<Mutex<Slot>>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut sink_rx: mpsc::UnboundedReceiver<SinkSignal>,
    cancel: CancellationToken,
) {
    loop {
        let running = tokio::select! {
            _ = cancel.cancelled() => false,
            event = events.recv() => {
                let event = event.unwrap_or(TransportEvent::Closed);
                apply(&shared, generation, |s| s.on_transport_event(event))
            }
            Some(signal) = sink_rx.recv() => {
                apply(&shared, generation, |s| s.on_sink_signal(signal))
            }
        };
        if !running {
            break;
        }
    }
    log::debug!("[LiveView] Driver for session {} finished", generation);
}

/// Applies `f` to the session of `generation`. Returns false once it is gone or terminal.
fn apply(shared: &Mutex<Slot>, generation: u64, f: impl FnOnce(&mut StreamSession)) -> bool {
    let mut slot = shared.lock();
    if slot.generation != generation {
        return false;
    }
    let Some(session) = slot.session.as_mut() else {
        return false;
    };
    f(session);
    !session.state().is_terminal()
}
