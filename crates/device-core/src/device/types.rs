//! Core types for capture-device acquisition
//!
//! Track handles are cheap clones over shared state so that a call controller,
//! the acquisition registry, and a toggle button can all refer to the same
//! live device slot.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Kind of capture track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Microphone input
    Audio,
    /// Camera input
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Logical owner slot for an acquisition.
///
/// At most one acquisition is outstanding per purpose; starting a new one for
/// the same purpose releases the prior one first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionPurpose {
    /// Media for the active call
    Call,
    /// The camera preview in the device-test modal
    CameraTest,
    /// The microphone check in the device-test modal
    MicrophoneTest,
}

impl fmt::Display for AcquisitionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionPurpose::Call => write!(f, "call"),
            AcquisitionPurpose::CameraTest => write!(f, "camera-test"),
            AcquisitionPurpose::MicrophoneTest => write!(f, "microphone-test"),
        }
    }
}

/// Preferred camera parameters. Every field is a preference, not a
/// requirement; `None` accepts whatever the device offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoConstraints {
    /// Preferred capture width in pixels
    pub ideal_width: Option<u32>,
    /// Preferred capture height in pixels
    pub ideal_height: Option<u32>,
    /// Preferred frame rate
    pub ideal_frame_rate: Option<u32>,
}

impl VideoConstraints {
    /// 720p at 30 fps, the call default
    pub fn hd() -> Self {
        Self {
            ideal_width: Some(1280),
            ideal_height: Some(720),
            ideal_frame_rate: Some(30),
        }
    }

    /// Accept any camera the platform offers
    pub fn any() -> Self {
        Self::default()
    }
}

/// Preferred microphone parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    /// Request echo cancellation
    pub echo_cancellation: bool,
    /// Request noise suppression
    pub noise_suppression: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

impl AudioConstraints {
    /// Accept any microphone with no processing requirements
    pub fn any() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
        }
    }
}

/// A full acquisition request: which device slots are wanted and with what
/// preferences. `minimal()` derives the fallback set used when the ideal
/// preferences are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaConstraints {
    /// Camera request, absent for audio-only features
    pub video: Option<VideoConstraints>,
    /// Microphone request
    pub audio: Option<AudioConstraints>,
}

impl MediaConstraints {
    /// Camera + microphone with the call-quality preferences
    pub fn call_defaults() -> Self {
        Self {
            video: Some(VideoConstraints::hd()),
            audio: Some(AudioConstraints::default()),
        }
    }

    /// Microphone only (voice recording, microphone test)
    pub fn audio_only() -> Self {
        Self {
            video: None,
            audio: Some(AudioConstraints::default()),
        }
    }

    /// Camera only (camera test)
    pub fn video_only() -> Self {
        Self {
            video: Some(VideoConstraints::hd()),
            audio: None,
        }
    }

    /// The fallback set: same device slots, no preferences. Used for the
    /// single retry after a constraint-related rejection.
    pub fn minimal(&self) -> Self {
        Self {
            video: self.video.map(|_| VideoConstraints::any()),
            audio: self.audio.map(|_| AudioConstraints::any()),
        }
    }

    /// Whether a camera track is requested
    pub fn wants_video(&self) -> bool {
        self.video.is_some()
    }

    /// Whether a microphone track is requested
    pub fn wants_audio(&self) -> bool {
        self.audio.is_some()
    }
}

#[derive(Debug)]
struct TrackInner {
    id: String,
    kind: MediaKind,
    label: String,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

/// A live handle to one capture device slot.
///
/// Enabling/disabling flips transmission without touching the hardware;
/// `stop()` ends the capture for good and is idempotent.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    /// Create a live track for the given device label
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                label: label.into(),
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Opaque track identifier
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Track kind (audio or video)
    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    /// Device label the track was opened from
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the track is currently transmitting
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Enable or disable transmission without re-acquiring the device
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    /// Flip the enabled state, returning the new value
    pub fn toggle_enabled(&self) -> bool {
        // fetch_xor returns the previous value
        !self.inner.enabled.fetch_xor(true, Ordering::AcqRel)
    }

    /// Permanently stop the capture. Safe to call repeatedly.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
    }

    /// Whether the track is still capturing
    pub fn is_live(&self) -> bool {
        !self.inner.stopped.load(Ordering::Acquire)
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_keeps_slots_and_drops_preferences() {
        let ideal = MediaConstraints::call_defaults();
        let minimal = ideal.minimal();
        assert!(minimal.wants_video());
        assert!(minimal.wants_audio());
        assert_eq!(minimal.video, Some(VideoConstraints::any()));
        assert_eq!(minimal.audio, Some(AudioConstraints::any()));

        let audio = MediaConstraints::audio_only().minimal();
        assert!(!audio.wants_video());
        assert!(audio.wants_audio());
    }

    #[test]
    fn track_toggle_and_stop() {
        let track = MediaTrack::new(MediaKind::Video, "Integrated Camera");
        assert!(track.is_enabled());
        assert!(!track.toggle_enabled());
        assert!(!track.is_enabled());
        assert!(track.toggle_enabled());

        assert!(track.is_live());
        track.stop();
        track.stop();
        assert!(!track.is_live());
    }
}
