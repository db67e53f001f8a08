//! Playback sink capability.
//!
//! A sink is the incremental, append-driven consumer of media segments (an
//! MSE source buffer in a browser, a file or pipe in a headless relay). The
//! [`SegmentFeeder`](super::feeder::SegmentFeeder) guarantees that at most
//! one append is outstanding; sinks report completion asynchronously
//! through the [`SinkNotifier`] they receive at initialization.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::session::StreamTarget;
use crate::protocol_constants::LIVEVIEW_MIME_TYPE;

/// Errors raised by a playback sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink could not be created or opened.
    #[error("Sink initialization failed: {0}")]
    Initialize(String),

    /// A segment could not be handed to the sink.
    #[error("Sink append failed: {0}")]
    Append(String),

    /// `append` was called before `initialize`.
    #[error("Sink used before initialization")]
    NotInitialized,
}

/// Whether a sink can accept appends right after `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkReadiness {
    /// Appends may start immediately.
    Ready,
    /// The sink will send [`SinkSignal::Ready`] once it can accept appends.
    Pending,
}

/// Asynchronous notifications from a sink back to its feeder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSignal {
    /// A sink that initialized as `Pending` is now ready.
    Ready,
    /// The outstanding append finished.
    AppendComplete,
    /// The sink hit an unrecoverable error.
    Failed(String),
}

/// Sender side of a sink's completion channel.
#[derive(Debug, Clone)]
pub struct SinkNotifier {
    tx: mpsc::UnboundedSender<SinkSignal>,
}

impl SinkNotifier {
    /// Creates a notifier and the receiver the session drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SinkSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Signals that the sink became ready.
    pub fn ready(&self) {
        self.send(SinkSignal::Ready);
    }

    /// Signals that the outstanding append finished.
    pub fn append_complete(&self) {
        self.send(SinkSignal::AppendComplete);
    }

    /// Signals an unrecoverable sink error.
    pub fn failed(&self, reason: impl Into<String>) {
        self.send(SinkSignal::Failed(reason.into()));
    }

    fn send(&self, signal: SinkSignal) {
        if self.tx.send(signal).is_err() {
            // Session already torn down
            log::trace!("[Sink] Signal dropped, no session listening");
        }
    }
}

/// Incremental playback buffer consuming ordered media segments.
pub trait PlaybackSink: Send {
    /// Prepares the sink. Called at most once per session, on the first segment.
    fn initialize(&mut self, notifier: SinkNotifier) -> Result<SinkReadiness, SinkError>;

    /// Starts appending one segment. Completion is reported through the notifier.
    fn append(&mut self, segment: Bytes) -> Result<(), SinkError>;

    /// Returns true while the sink is processing an append.
    fn is_busy(&self) -> bool;

    /// Toggles local playback. Appends continue while paused.
    fn set_playing(&mut self, _playing: bool) {}

    /// Releases resources at session teardown.
    fn teardown(&mut self) {}
}

/// Creates one sink per live-view session.
pub trait SinkProvider: Send + Sync {
    /// Creates the sink for a session targeting `target`.
    fn create_sink(&self, target: &StreamTarget) -> Result<Box<dyn PlaybackSink>, SinkError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// File Sink
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only file sink used by the headless relay.
///
/// The file is created on initialization, which happens lazily when the
/// first segment arrives. Writes run on a background task; each finished
/// write signals `AppendComplete`.
pub struct FileSink {
    path: PathBuf,
    busy: Arc<AtomicBool>,
    writer: Option<mpsc::UnboundedSender<Bytes>>,
}

impl FileSink {
    /// Creates a sink that will write to `path` (truncating it).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy: Arc::new(AtomicBool::new(false)),
            writer: None,
        }
    }

    /// Returns the output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlaybackSink for FileSink {
    fn initialize(&mut self, notifier: SinkNotifier) -> Result<SinkReadiness, SinkError> {
        if self.writer.is_some() {
            return Err(SinkError::Initialize("already initialized".into()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SinkError::Initialize(e.to_string()))?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        let path = self.path.clone();
        let busy = Arc::clone(&self.busy);

        runtime.spawn(async move {
            let mut file = match tokio::fs::File::create(&path).await {
                Ok(file) => file,
                Err(e) => {
                    log::error!("[Sink] Failed to create {}: {}", path.display(), e);
                    notifier.failed(e.to_string());
                    return;
                }
            };
            log::info!("[Sink] Writing {} to {}", LIVEVIEW_MIME_TYPE, path.display());
            notifier.ready();

            while let Some(segment) = rx.recv().await {
                let written = match file.write_all(&segment).await {
                    Ok(()) => file.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    log::error!("[Sink] Write to {} failed: {}", path.display(), e);
                    busy.store(false, Ordering::SeqCst);
                    notifier.failed(e.to_string());
                    return;
                }
                busy.store(false, Ordering::SeqCst);
                notifier.append_complete();
            }

            log::debug!("[Sink] Writer for {} finished", path.display());
        });

        self.writer = Some(tx);
        Ok(SinkReadiness::Pending)
    }

    fn append(&mut self, segment: Bytes) -> Result<(), SinkError> {
        let writer = self.writer.as_ref().ok_or(SinkError::NotInitialized)?;
        self.busy.store(true, Ordering::SeqCst);
        writer.send(segment).map_err(|_| {
            self.busy.store(false, Ordering::SeqCst);
            SinkError::Append("writer task has shut down".into())
        })
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn teardown(&mut self) {
        // Closing the channel lets the writer flush and exit
        self.writer = None;
    }
}

/// Provides a [`FileSink`] writing to a fixed path for every session.
#[derive(Debug, Clone)]
pub struct FileSinkProvider {
    path: PathBuf,
}

impl FileSinkProvider {
    /// Creates a provider writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SinkProvider for FileSinkProvider {
    fn create_sink(&self, target: &StreamTarget) -> Result<Box<dyn PlaybackSink>, SinkError> {
        log::debug!(
            "[Sink] File sink for {} {} -> {}",
            target.device_type,
            target.device_id,
            self.path.display()
        );
        Ok(Box::new(FileSink::new(self.path.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_before_initialize_fails() {
        let mut sink = FileSink::new("/nonexistent/never-written.mp4");
        assert!(matches!(
            sink.append(Bytes::from_static(b"x")),
            Err(SinkError::NotInitialized)
        ));
        assert!(!sink.is_busy());
    }

    #[test]
    fn initialize_outside_runtime_fails_cleanly() {
        let (notifier, _rx) = SinkNotifier::channel();
        let mut sink = FileSink::new("/tmp/never-written.mp4");
        assert!(matches!(
            sink.initialize(notifier),
            Err(SinkError::Initialize(_))
        ));
    }

    #[tokio::test]
    async fn file_sink_writes_segments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.mp4");
        let (notifier, mut rx) = SinkNotifier::channel();
        let mut sink = FileSink::new(&path);

        assert_eq!(sink.initialize(notifier).unwrap(), SinkReadiness::Pending);
        assert_eq!(rx.recv().await, Some(SinkSignal::Ready));

        for chunk in [&b"moov"[..], b"moof1", b"moof2"] {
            sink.append(Bytes::copy_from_slice(chunk)).unwrap();
            assert_eq!(rx.recv().await, Some(SinkSignal::AppendComplete));
            assert!(!sink.is_busy());
        }

        sink.teardown();
        // Every append completed, so the bytes are already in the file
        assert_eq!(std::fs::read(&path).unwrap(), b"moovmoof1moof2");
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (notifier, _rx) = SinkNotifier::channel();
        let mut sink = FileSink::new(dir.path().join("a.mp4"));
        sink.initialize(notifier.clone()).unwrap();
        assert!(sink.initialize(notifier).is_err());
    }

    #[tokio::test]
    async fn unwritable_path_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (notifier, mut rx) = SinkNotifier::channel();
        let mut sink = FileSink::new(dir.path().join("missing").join("a.mp4"));
        sink.initialize(notifier).unwrap();
        assert!(matches!(rx.recv().await, Some(SinkSignal::Failed(_))));
    }
}
