//! Device-core: capture hardware and media artifacts for livecall
//!
//! This crate owns every interaction with capture hardware and locally
//! produced media in the live-call subsystem:
//!
//! - **Acquisition**: [`device::MediaDeviceManager`] hands out scoped
//!   [`device::MediaAcquisition`] guards, one per purpose, with constraint
//!   fallback and a classified error taxonomy.
//! - **Recording**: [`recorder::AudioRecorder`] captures a microphone track
//!   into timed fragments and assembles one playable artifact.
//! - **Ringtone**: [`ringtone::RingtoneSynthesizer`] generates the periodic
//!   two-tone ringing cue with no audio asset.
//! - **Playback**: [`playback::VoicePlaybackManager`] serializes voice-clip
//!   playout so at most one clip plays at a time.
//! - **Metering**: [`level::MicLevelMonitor`] samples the microphone level
//!   for the device-test modal.
//!
//! The platform capture capability sits behind trait seams
//! ([`device::MediaBackend`], [`recorder::CaptureEncoder`],
//! [`ringtone::ToneSink`], [`playback::PlaybackBackend`]); the hosting
//! application provides the production implementations, and in-memory mocks
//! ship here for tests and local development.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use livecall_device_core::device::{
//!     AcquisitionPurpose, MediaConstraints, MediaDeviceManager, MockMediaBackend,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = MediaDeviceManager::new(Arc::new(MockMediaBackend::new()));
//!
//! // acquire camera + microphone for a call
//! let acquisition = manager
//!     .acquire(AcquisitionPurpose::Call, MediaConstraints::call_defaults())
//!     .await?;
//!
//! // mute the microphone without re-acquiring the device
//! if let Some(mic) = acquisition.audio_track() {
//!     mic.set_enabled(false);
//! }
//!
//! // every exit path releases; release is idempotent
//! manager.release(AcquisitionPurpose::Call);
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod error;
pub mod level;
pub mod playback;
pub mod recorder;
pub mod ringtone;

pub use device::{
    AcquisitionPurpose, AudioConstraints, MediaAcquisition, MediaBackend, MediaConstraints,
    MediaDeviceManager, MediaKind, MediaTrack, MockMediaBackend, VideoConstraints,
};
pub use error::{MediaError, MediaResult};
pub use level::MicLevelMonitor;
pub use playback::{PlaybackBackend, PlaybackHandle, VoicePlaybackManager};
pub use recorder::{AudioRecorder, CaptureEncoder, Recording};
pub use ringtone::{RingtoneSynthesizer, TonePulse, ToneSink};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
