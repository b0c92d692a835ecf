//! Chunked audio recording
//!
//! Turns a live microphone track into one finished artifact. The platform
//! encoder delivers binary fragments on a short fixed interval; the recorder
//! buffers them in arrival order, runs a 1-second elapsed counter for the UI,
//! and on `stop()` assembles everything into a single immutable
//! [`Recording`]. `cancel()` tears the same machinery down without producing
//! anything.
//!
//! Both timers are plain tokio tasks whose handles are retained and aborted
//! on every exit path; a recorder that is dropped mid-recording aborts them
//! too.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::device::types::{MediaKind, MediaTrack};
use crate::error::{MediaError, MediaResult};

/// Fragment cadence used when none is configured
pub const DEFAULT_CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Container/codec requested from the platform encoder
pub const DEFAULT_RECORDING_MIME: &str = "audio/webm;codecs=opus";

/// Platform capability that encodes a live audio track into timed fragments
#[async_trait]
pub trait CaptureEncoder: Send + Sync + std::fmt::Debug {
    /// Whether the platform can encode the given MIME type
    fn is_mime_supported(&self, mime: &str) -> bool;

    /// Begin encoding. Fragments arrive on the returned channel once per
    /// `chunk_interval` until the receiver is dropped or the track stops.
    async fn start_capture(
        &self,
        track: &MediaTrack,
        chunk_interval: Duration,
    ) -> MediaResult<mpsc::UnboundedReceiver<Bytes>>;
}

/// A finished recording artifact
#[derive(Debug, Clone)]
pub struct Recording {
    /// Fragments assembled in arrival order
    pub data: Bytes,
    /// MIME type of `data`
    pub mime_type: String,
    /// Seconds counted by the elapsed timer while recording
    pub duration_seconds: u64,
    /// When recording started
    pub started_at: DateTime<Utc>,
}

impl Recording {
    /// True for a recording stopped before any fragment arrived
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct ActiveRecording {
    fragments: mpsc::UnboundedReceiver<Bytes>,
    elapsed: Arc<AtomicU64>,
    started_at: DateTime<Utc>,
    counter_task: JoinHandle<()>,
}

/// Captures one microphone track into a [`Recording`]
#[derive(Debug)]
pub struct AudioRecorder {
    encoder: Arc<dyn CaptureEncoder>,
    mime_type: String,
    chunk_interval: Duration,
    active: Mutex<Option<ActiveRecording>>,
}

impl std::fmt::Debug for ActiveRecording {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRecording")
            .field("started_at", &self.started_at)
            .field("elapsed", &self.elapsed.load(Ordering::Relaxed))
            .finish()
    }
}

impl AudioRecorder {
    /// Create a recorder over the given encoder with default settings
    pub fn new(encoder: Arc<dyn CaptureEncoder>) -> Self {
        Self {
            encoder,
            mime_type: DEFAULT_RECORDING_MIME.to_string(),
            chunk_interval: DEFAULT_CHUNK_INTERVAL,
            active: Mutex::new(None),
        }
    }

    /// Override the fragment cadence
    pub fn with_chunk_interval(mut self, interval: Duration) -> Self {
        self.chunk_interval = interval;
        self
    }

    /// Override the requested recording format
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = mime.into();
        self
    }

    /// Whether a recording is in progress
    pub fn is_recording(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Seconds elapsed in the current recording, 0 when idle
    pub fn elapsed_seconds(&self) -> u64 {
        self.active
            .lock()
            .as_ref()
            .map(|r| r.elapsed.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Begin recording from a live microphone track.
    ///
    /// Fails with `RecorderUnavailable` when the platform cannot encode the
    /// configured format or the track is not a live audio track. A recording
    /// already in progress is cancelled first.
    pub async fn start(&self, track: &MediaTrack) -> MediaResult<()> {
        if !self.encoder.is_mime_supported(&self.mime_type) {
            return Err(MediaError::recorder_unavailable(format!(
                "no encoder for {}",
                self.mime_type
            )));
        }
        if track.kind() != MediaKind::Audio || !track.is_live() {
            return Err(MediaError::recorder_unavailable(
                "recording needs a live audio track",
            ));
        }

        let fragments = self.encoder.start_capture(track, self.chunk_interval).await?;

        let elapsed = Arc::new(AtomicU64::new(0));
        let counter = elapsed.clone();
        let counter_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            // the first tick completes immediately; the count starts at zero
            ticker.tick().await;
            loop {
                ticker.tick().await;
                counter.fetch_add(1, Ordering::AcqRel);
            }
        });

        let mut active = self.active.lock();
        if let Some(prior) = active.take() {
            debug!("recording already in progress, discarding it");
            prior.counter_task.abort();
        }
        *active = Some(ActiveRecording {
            fragments,
            elapsed,
            started_at: Utc::now(),
            counter_task,
        });
        info!(mime = %self.mime_type, "recording started");
        Ok(())
    }

    /// Stop recording and assemble the artifact.
    ///
    /// Returns `None` when no recording is in progress. A recording stopped
    /// before any fragment arrived yields a zero-duration artifact, not an
    /// error.
    pub fn stop(&self) -> Option<Recording> {
        let mut session = self.active.lock().take()?;
        session.counter_task.abort();

        // flush everything the encoder delivered; dropping the receiver
        // afterwards ends the encoder side
        let mut data = Vec::new();
        let mut fragment_count = 0usize;
        while let Ok(fragment) = session.fragments.try_recv() {
            data.extend_from_slice(&fragment);
            fragment_count += 1;
        }

        let duration_seconds = session.elapsed.load(Ordering::Acquire);
        info!(fragment_count, duration_seconds, "recording stopped");
        Some(Recording {
            data: Bytes::from(data),
            mime_type: self.mime_type.clone(),
            duration_seconds,
            started_at: session.started_at,
        })
    }

    /// Discard the current recording without producing an artifact.
    /// No-op when idle.
    pub fn cancel(&self) {
        if let Some(session) = self.active.lock().take() {
            session.counter_task.abort();
            debug!("recording cancelled, fragments discarded");
        }
    }
}

impl Drop for AudioRecorder {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// In-memory encoder emitting a fixed payload per interval; used by tests
/// and local development.
#[derive(Debug)]
pub struct MockCaptureEncoder {
    payload: Bytes,
    supported: bool,
}

impl MockCaptureEncoder {
    /// An encoder that supports every format
    pub fn new() -> Self {
        Self {
            payload: Bytes::from_static(&[0u8; 320]),
            supported: true,
        }
    }

    /// An encoder that rejects every format
    pub fn unsupported() -> Self {
        Self {
            payload: Bytes::new(),
            supported: false,
        }
    }

    /// Override the per-fragment payload
    pub fn with_payload(mut self, payload: Bytes) -> Self {
        self.payload = payload;
        self
    }
}

impl Default for MockCaptureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureEncoder for MockCaptureEncoder {
    fn is_mime_supported(&self, _mime: &str) -> bool {
        self.supported
    }

    async fn start_capture(
        &self,
        track: &MediaTrack,
        chunk_interval: Duration,
    ) -> MediaResult<mpsc::UnboundedReceiver<Bytes>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let payload = self.payload.clone();
        let track = track.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(chunk_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !track.is_live() || tx.send(payload.clone()).is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
