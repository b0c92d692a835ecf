//! In-memory capture backend for tests and local development
//!
//! The mock keeps an inventory of fake devices, records every constraint set
//! it is asked for, and can be scripted to fail with any `MediaError` kind.
//! It also keeps a census of every track it ever opened so tests can assert
//! that no acquisition leaks a live track.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::device::platform::MediaBackend;
use crate::device::types::{MediaConstraints, MediaKind, MediaTrack};
use crate::error::{MediaError, MediaResult};

/// One entry in the mock device inventory
#[derive(Debug, Clone)]
pub struct MockDevice {
    /// Which slot the device fills
    pub kind: MediaKind,
    /// Human-readable label, copied onto opened tracks
    pub label: String,
}

impl MockDevice {
    /// Create an inventory entry
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        Self { kind, label: label.into() }
    }
}

/// Scriptable in-memory [`MediaBackend`]
#[derive(Debug)]
pub struct MockMediaBackend {
    secure: AtomicBool,
    devices: Mutex<Vec<MockDevice>>,
    scripted_failures: Mutex<VecDeque<MediaError>>,
    opened: Mutex<Vec<MediaTrack>>,
    requests: Mutex<Vec<MediaConstraints>>,
    level: Mutex<f32>,
}

impl MockMediaBackend {
    /// A secure-context backend with one camera and one microphone
    pub fn new() -> Self {
        Self {
            secure: AtomicBool::new(true),
            devices: Mutex::new(vec![
                MockDevice::new(MediaKind::Video, "Mock Camera"),
                MockDevice::new(MediaKind::Audio, "Mock Microphone"),
            ]),
            scripted_failures: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            level: Mutex::new(0.5),
        }
    }

    /// A backend reporting a non-secure hosting context
    pub fn insecure() -> Self {
        let backend = Self::new();
        backend.secure.store(false, Ordering::Release);
        backend
    }

    /// A secure backend with an empty device inventory
    pub fn without_devices() -> Self {
        let backend = Self::new();
        backend.devices.lock().clear();
        backend
    }

    /// Queue a failure for the next `open_tracks` call
    pub fn fail_next(&self, error: MediaError) {
        self.scripted_failures.lock().push_back(error);
    }

    /// Queue the same failure for the next `n` `open_tracks` calls
    pub fn fail_times(&self, error: MediaError, n: usize) {
        let mut failures = self.scripted_failures.lock();
        for _ in 0..n {
            failures.push_back(error.clone());
        }
    }

    /// Set the level reported by `sample_level`
    pub fn set_level(&self, level: f32) {
        *self.level.lock() = level.clamp(0.0, 1.0);
    }

    /// Number of tracks opened over the backend's lifetime
    pub fn opened_track_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// Number of opened tracks that are still live (not stopped)
    pub fn live_track_count(&self) -> usize {
        self.opened.lock().iter().filter(|t| t.is_live()).count()
    }

    /// Number of `open_tracks` calls observed
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every constraint set passed to `open_tracks`, in order
    pub fn seen_constraints(&self) -> Vec<MediaConstraints> {
        self.requests.lock().clone()
    }

    fn find_device(&self, kind: MediaKind) -> MediaResult<MockDevice> {
        self.devices
            .lock()
            .iter()
            .find(|d| d.kind == kind)
            .cloned()
            .ok_or_else(|| MediaError::device_not_found(format!("no {kind} device attached")))
    }
}

impl Default for MockMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    fn is_secure_context(&self) -> bool {
        self.secure.load(Ordering::Acquire)
    }

    async fn open_tracks(&self, constraints: &MediaConstraints) -> MediaResult<Vec<MediaTrack>> {
        self.requests.lock().push(constraints.clone());

        if let Some(error) = self.scripted_failures.lock().pop_front() {
            return Err(error);
        }

        if !constraints.wants_video() && !constraints.wants_audio() {
            return Err(MediaError::constraints_unsatisfiable(
                "constraint set requests no media",
            ));
        }

        let mut tracks = Vec::new();
        if constraints.wants_video() {
            let device = self.find_device(MediaKind::Video)?;
            tracks.push(MediaTrack::new(MediaKind::Video, device.label));
        }
        if constraints.wants_audio() {
            let device = self.find_device(MediaKind::Audio)?;
            tracks.push(MediaTrack::new(MediaKind::Audio, device.label));
        }

        self.opened.lock().extend(tracks.iter().cloned());
        Ok(tracks)
    }

    fn sample_level(&self, track: &MediaTrack) -> MediaResult<f32> {
        if track.kind() != MediaKind::Audio {
            return Err(MediaError::unsupported("level sampling needs an audio track"));
        }
        if !track.is_live() {
            return Err(MediaError::device_not_found("track is stopped"));
        }
        Ok(*self.level.lock())
    }
}
