//! Voice clip playback serialization
//!
//! Ticket threads can hold many voice clips; across all of them, at most one
//! may be playing at any instant. The manager caches one playback handle per
//! clip identity (created lazily on first play, reused afterwards) and stops
//! and rewinds whatever is playing before starting the next clip.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Platform capability that opens a playable handle for a clip URL
#[async_trait]
pub trait PlaybackBackend: Send + Sync + std::fmt::Debug {
    /// Open (and begin decoding) the clip at `url`
    async fn open(&self, url: &str) -> MediaResult<Arc<dyn PlaybackHandle>>;
}

/// One decodable clip. Handles are cached and reused across plays.
#[async_trait]
pub trait PlaybackHandle: Send + Sync + std::fmt::Debug {
    /// Start (or resume) playout
    async fn play(&self) -> MediaResult<()>;

    /// Stop playout, keeping the position
    fn pause(&self);

    /// Reset the position to zero
    fn rewind(&self);

    /// Whether the handle is currently playing
    fn is_playing(&self) -> bool;
}

/// Enforces the at-most-one-playing-clip invariant
#[derive(Debug)]
pub struct VoicePlaybackManager {
    backend: Arc<dyn PlaybackBackend>,
    handles: DashMap<String, Arc<dyn PlaybackHandle>>,
    current: Mutex<Option<String>>,
}

impl VoicePlaybackManager {
    /// Create a manager over the given backend
    pub fn new(backend: Arc<dyn PlaybackBackend>) -> Self {
        Self {
            backend,
            handles: DashMap::new(),
            current: Mutex::new(None),
        }
    }

    /// Play a clip, stopping and rewinding whatever is currently playing.
    ///
    /// A decode/format failure surfaces `PlaybackUnsupported`, clears the
    /// currently-playing marker, and leaves every other clip untouched.
    pub async fn play(&self, clip_id: &str, url: &str) -> MediaResult<()> {
        let mut current = self.current.lock().await;
        self.halt(&mut current);

        let handle = match self.handle_for(clip_id, url).await {
            Ok(handle) => handle,
            Err(error) => {
                warn!(clip_id, %error, "clip could not be opened");
                return Err(error);
            }
        };

        match handle.play().await {
            Ok(()) => {
                *current = Some(clip_id.to_string());
                debug!(clip_id, "clip playing");
                Ok(())
            }
            Err(error) => {
                warn!(clip_id, %error, "clip playback failed");
                Err(error)
            }
        }
    }

    /// Stop the clip if it is the one playing; otherwise behave as [`play`].
    ///
    /// [`play`]: VoicePlaybackManager::play
    pub async fn toggle(&self, clip_id: &str, url: &str) -> MediaResult<()> {
        {
            let mut current = self.current.lock().await;
            if current.as_deref() == Some(clip_id) {
                if let Some(handle) = self.handles.get(clip_id) {
                    handle.pause();
                }
                *current = None;
                return Ok(());
            }
        }
        self.play(clip_id, url).await
    }

    /// Stop whatever is playing, if anything
    pub async fn stop_current(&self) {
        let mut current = self.current.lock().await;
        self.halt(&mut current);
    }

    /// Identity of the clip currently playing
    pub async fn currently_playing(&self) -> Option<String> {
        self.current.lock().await.clone()
    }

    fn halt(&self, current: &mut Option<String>) {
        if let Some(previous) = current.take() {
            if let Some(handle) = self.handles.get(&previous) {
                handle.pause();
                handle.rewind();
            }
        }
    }

    async fn handle_for(&self, clip_id: &str, url: &str) -> MediaResult<Arc<dyn PlaybackHandle>> {
        if let Some(handle) = self.handles.get(clip_id) {
            return Ok(handle.clone());
        }
        let handle = self.backend.open(url).await?;
        self.handles.insert(clip_id.to_string(), handle.clone());
        Ok(handle)
    }
}

/// In-memory playback backend with per-URL decode failure injection
#[derive(Debug, Default)]
pub struct MockPlaybackBackend {
    handles: parking_lot::Mutex<Vec<(String, Arc<MockPlaybackHandle>)>>,
    broken_urls: parking_lot::Mutex<Vec<String>>,
}

impl MockPlaybackBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a URL as undecodable: its handle opens but fails on play
    pub fn break_url(&self, url: impl Into<String>) {
        self.broken_urls.lock().push(url.into());
    }

    /// The handle opened for a URL, if any
    pub fn handle(&self, url: &str) -> Option<Arc<MockPlaybackHandle>> {
        self.handles
            .lock()
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, h)| h.clone())
    }

    /// Number of handles opened over the backend's lifetime
    pub fn opened_count(&self) -> usize {
        self.handles.lock().len()
    }
}

#[async_trait]
impl PlaybackBackend for MockPlaybackBackend {
    async fn open(&self, url: &str) -> MediaResult<Arc<dyn PlaybackHandle>> {
        let broken = self.broken_urls.lock().iter().any(|u| u == url);
        let handle = Arc::new(MockPlaybackHandle::new(broken));
        self.handles.lock().push((url.to_string(), handle.clone()));
        Ok(handle)
    }
}

/// Mock handle tracking playing state and a fake position
#[derive(Debug)]
pub struct MockPlaybackHandle {
    playing: std::sync::atomic::AtomicBool,
    position_ms: std::sync::atomic::AtomicU64,
    broken: bool,
}

impl MockPlaybackHandle {
    fn new(broken: bool) -> Self {
        Self {
            playing: std::sync::atomic::AtomicBool::new(false),
            position_ms: std::sync::atomic::AtomicU64::new(0),
            broken,
        }
    }

    /// Fake position, settable by tests to simulate mid-clip state
    pub fn position_ms(&self) -> u64 {
        self.position_ms.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Simulate playout progress
    pub fn set_position_ms(&self, position: u64) {
        self.position_ms
            .store(position, std::sync::atomic::Ordering::Release);
    }
}

#[async_trait]
impl PlaybackHandle for MockPlaybackHandle {
    async fn play(&self) -> MediaResult<()> {
        if self.broken {
            return Err(MediaError::playback_unsupported("decode failure"));
        }
        self.playing.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, std::sync::atomic::Ordering::Release);
    }

    fn rewind(&self) {
        self.position_ms.store(0, std::sync::atomic::Ordering::Release);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(std::sync::atomic::Ordering::Acquire)
    }
}
