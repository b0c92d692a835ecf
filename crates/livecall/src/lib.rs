//! Livecall: the live communication subsystem for support-desk dashboards
//!
//! One dependency pulling in both layers:
//!
//! - [`device`] ([`livecall-device-core`](livecall_device_core)): capture
//!   acquisition, chunked audio recording, ringtone synthesis, voice-clip
//!   playback, mic-level metering.
//! - [`call`] ([`livecall-call-core`](livecall_call_core)): the call
//!   session controller and the polling call-state sync client over the
//!   signaling REST channel.
//!
//! Most applications only need the [`prelude`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use livecall::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signaling = Arc::new(InMemorySignaling::new());
//! let media = Arc::new(MediaDeviceManager::new(Arc::new(MockMediaBackend::new())));
//!
//! let (controller, _events) = CallSessionController::new(
//!     CallClientConfig::new("agent@desk.example", "Agent"),
//!     media,
//!     Arc::new(RingtoneSynthesizer::disabled()),
//!     signaling,
//! );
//! controller.start(PeerInfo::new("jane@customer.example", "Jane Doe")).await?;
//! controller.end().await?;
//! # Ok(())
//! # }
//! ```

/// Device and media layer
pub use livecall_device_core as device;

/// Call lifecycle and sync layer
pub use livecall_call_core as call;

/// The types most integrations need
pub mod prelude {
    pub use livecall_call_core::{
        CallClientConfig, CallError, CallEvent, CallEventReceiver, CallId, CallInfo, CallResult,
        CallSession, CallSessionController, CallState, CallSyncClient, InMemorySignaling,
        PeerInfo, RestSignalingClient, SessionStatus, SignalingTransport, SyncSubscription,
    };
    pub use livecall_device_core::{
        AcquisitionPurpose, AudioRecorder, MediaAcquisition, MediaBackend, MediaConstraints,
        MediaDeviceManager, MediaError, MediaKind, MediaResult, MediaTrack, MicLevelMonitor,
        MockMediaBackend, Recording, RingtoneSynthesizer, VoicePlaybackManager,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
