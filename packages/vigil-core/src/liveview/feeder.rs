//! Ordered, one-at-a-time delivery of media segments into a sink.

use std::collections::VecDeque;

use bytes::Bytes;
use serde::Serialize;

use super::sink::{PlaybackSink, SinkError, SinkNotifier, SinkReadiness};

/// Counters exposed through session stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeederStats {
    /// Segments handed to the feeder.
    pub segments_received: u64,
    /// Segments whose append completed.
    pub segments_appended: u64,
    /// Bytes whose append completed.
    pub bytes_appended: u64,
    /// Segments waiting in the queue.
    pub queued: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkInit {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    TornDown,
}

/// FIFO of pending segments in front of a [`PlaybackSink`].
///
/// The sink is initialized lazily on the first segment. At most one append
/// is outstanding at any time; the next one is issued when the sink reports
/// completion.
pub struct SegmentFeeder {
    sink: Box<dyn PlaybackSink>,
    notifier: SinkNotifier,
    pending: VecDeque<Bytes>,
    /// Length of the outstanding append, if any.
    in_flight: Option<usize>,
    init: SinkInit,
    stats: FeederStats,
}

impl SegmentFeeder {
    pub fn new(sink: Box<dyn PlaybackSink>, notifier: SinkNotifier) -> Self {
        Self {
            sink,
            notifier,
            pending: VecDeque::new(),
            in_flight: None,
            init: SinkInit::Uninitialized,
            stats: FeederStats::default(),
        }
    }

    /// Queues a segment and appends it immediately if the sink is idle.
    ///
    /// # Errors
    /// Returns the sink error if initialization or the append fails.
    pub fn enqueue(&mut self, segment: Bytes) -> Result<(), SinkError> {
        match self.init {
            SinkInit::TornDown | SinkInit::Failed => {
                log::trace!("[Feeder] Dropping segment, sink unavailable");
                return Ok(());
            }
            SinkInit::Uninitialized => {
                self.stats.segments_received += 1;
                self.pending.push_back(segment);
                self.initialize()?;
            }
            SinkInit::Initializing | SinkInit::Ready => {
                self.stats.segments_received += 1;
                self.pending.push_back(segment);
            }
        }
        self.drain()
    }

    /// Handles the sink's deferred readiness signal.
    pub fn on_sink_ready(&mut self) -> Result<(), SinkError> {
        if self.init == SinkInit::Initializing {
            log::debug!("[Feeder] Sink ready, {} segment(s) queued", self.pending.len());
            self.init = SinkInit::Ready;
        }
        self.drain()
    }

    /// Handles completion of the outstanding append.
    pub fn on_append_complete(&mut self) -> Result<(), SinkError> {
        let Some(len) = self.in_flight.take() else {
            log::warn!("[Feeder] Append completion without an outstanding append");
            return Ok(());
        };
        self.stats.segments_appended += 1;
        self.stats.bytes_appended += len as u64;
        if self.sink.is_busy() {
            log::trace!("[Feeder] Sink signalled completion while still busy");
        }
        self.drain()
    }

    /// Forwards the local playback flag to the sink.
    pub fn set_playing(&mut self, playing: bool) {
        if self.init != SinkInit::TornDown {
            self.sink.set_playing(playing);
        }
    }

    /// Discards queued segments and tears the sink down. Idempotent.
    pub fn clear(&mut self) {
        if self.init == SinkInit::TornDown {
            return;
        }
        let dropped = self.pending.len();
        self.pending.clear();
        self.in_flight = None;
        self.sink.teardown();
        self.init = SinkInit::TornDown;
        if dropped > 0 {
            log::debug!("[Feeder] Discarded {} queued segment(s)", dropped);
        }
    }

    /// Returns true once the sink has been initialized (or is initializing).
    #[must_use]
    pub fn sink_initialized(&self) -> bool {
        matches!(self.init, SinkInit::Initializing | SinkInit::Ready)
    }

    #[must_use]
    pub fn stats(&self) -> FeederStats {
        FeederStats {
            queued: self.pending.len(),
            ..self.stats
        }
    }

    fn initialize(&mut self) -> Result<(), SinkError> {
        self.init = SinkInit::Initializing;
        match self.sink.initialize(self.notifier.clone()) {
            Ok(SinkReadiness::Ready) => {
                self.init = SinkInit::Ready;
                Ok(())
            }
            Ok(SinkReadiness::Pending) => Ok(()),
            Err(e) => {
                log::error!("[Feeder] Sink initialization failed: {}", e);
                self.init = SinkInit::Failed;
                self.pending.clear();
                Err(e)
            }
        }
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        if self.init != SinkInit::Ready || self.in_flight.is_some() {
            return Ok(());
        }
        let Some(segment) = self.pending.pop_front() else {
            return Ok(());
        };

        let len = segment.len();
        self.in_flight = Some(len);
        if let Err(e) = self.sink.append(segment) {
            log::error!("[Feeder] Append of {} bytes failed: {}", len, e);
            self.in_flight = None;
            self.init = SinkInit::Failed;
            self.pending.clear();
            return Err(e);
        }
        Ok(())
    }
}
